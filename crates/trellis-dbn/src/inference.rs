use crate::engine::TimeSliceEngine;
use crate::series::{TimeSeries, UncertainSeries};
use trellis_core::domain::random_provider;
use trellis_core::{Potential, VarId};
use trellis_error::{TrellisResult, ensure};

impl TimeSliceEngine {
    /// Filtering: per-step marginals of `targets` from forward sweeps
    /// alone, so the result at step `t` depends only on evidence up to `t`.
    /// Also returns the accumulated log-likelihood of the series, the sum
    /// over steps of the log tree mass before normalization.
    pub fn forward(
        &mut self,
        series: &TimeSeries,
        targets: &[VarId],
    ) -> TrellisResult<(UncertainSeries, f64)> {
        let mut results = UncertainSeries::new(self.model(), targets, series.len());
        let mut loglikelihood = 0.0;
        let mut message: Option<Potential> = None;

        for t in 0..series.len() {
            self.reset(t == 0)?;
            if let Some(msg) = &message {
                self.inject_incoming(msg)?;
            }
            self.insert_step(series, t)?;
            self.make_consistent()?;

            let mass = self.mass();
            ensure!(
                mass > 0.0,
                Inconsistent: "evidence at step {} has zero probability",
                t
            );
            loglikelihood += mass.ln();

            for &var in targets {
                let distribution = self.distribution_of(var)?;
                results.record(t, var, distribution);
            }
            message = Some(self.outgoing_message()?);
            tracing::debug!(step = t, mass, "forward step");
        }

        Ok((results, loglikelihood))
    }

    /// Smoothing: per-step marginals of `targets` where every step sees the
    /// whole series. A forward sweep stores each step's outgoing message;
    /// the backward sweep re-runs each step with the forward message from
    /// `t - 1` and the backward message from `t + 1` folded in.
    pub fn forward_backward(
        &mut self,
        series: &TimeSeries,
        targets: &[VarId],
    ) -> TrellisResult<UncertainSeries> {
        let length = series.len();
        let mut results = UncertainSeries::new(self.model(), targets, length);
        if length == 0 {
            return Ok(results);
        }

        let mut forward_messages: Vec<Potential> = Vec::with_capacity(length);
        for t in 0..length {
            self.reset(t == 0)?;
            if t > 0 {
                self.inject_incoming(&forward_messages[t - 1])?;
            }
            self.insert_step(series, t)?;
            self.make_consistent()?;
            forward_messages.push(self.outgoing_message()?);
        }

        // backward message over the interface, uniform at the last step
        let mut beta: Option<Potential> = None;
        for t in (0..length).rev() {
            self.reset(t == 0)?;
            if t > 0 {
                self.inject_incoming(&forward_messages[t - 1])?;
            }
            if let Some(message) = &beta {
                self.inject_backward(message)?;
            }
            self.insert_step(series, t)?;
            self.make_consistent()?;

            for &var in targets {
                let distribution = self.distribution_of(var)?;
                results.record(t, var, distribution);
            }
            if t > 0 {
                beta = Some(self.backward_message(&forward_messages[t - 1])?);
            }
            tracing::debug!(step = t, "backward step");
        }

        Ok(results)
    }

    /// Sample a synthetic time series from the model: within each slice,
    /// every variable is drawn from its marginal given the values already
    /// fixed, and the slice posterior is carried forward through the
    /// interface message.
    pub fn generate(&mut self, symbols: &[&str], length: usize) -> TrellisResult<TimeSeries> {
        let mut series = TimeSeries::new(self.model(), symbols)?;
        let mut message: Option<Potential> = None;

        for t in 0..length {
            self.reset(t == 0)?;
            if let Some(msg) = &message {
                self.inject_incoming(msg)?;
            }

            let mut sampled = vec![0usize; self.model().len()];
            for index in 0..self.model().len() {
                let var = VarId::from(index);
                self.make_consistent()?;
                let distribution = self.distribution_of(var)?;
                let state = random_provider::roulette(&distribution);
                sampled[index] = state;

                let symbol = self.model().variable(var).symbol().to_string();
                self.observe_index(&symbol, state)?;
            }

            let row: Vec<Option<usize>> = series
                .observed()
                .iter()
                .map(|v| Some(sampled[v.index()]))
                .collect();
            series.push_row(&row)?;

            self.make_consistent()?;
            message = Some(self.outgoing_message()?);
        }

        Ok(series)
    }
}
