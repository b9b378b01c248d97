use trellis_core::{Model, VarId};
use trellis_error::{TrellisResult, ensure, trellis_err};

/// A batch of crisp observations over time: a fixed set of observed
/// variables (columns) and one row of `Option<state index>` per step.
/// `None` is a missing value and enters the model as an all-ones
/// likelihood; in text encodings the missing sentinel is the empty string.
#[derive(Clone, Debug)]
pub struct TimeSeries {
    observed: Vec<VarId>,
    rows: Vec<Vec<Option<usize>>>,
}

impl TimeSeries {
    /// Bind a series to the named observed variables of a model.
    pub fn new(model: &Model, symbols: &[&str]) -> TrellisResult<Self> {
        let observed = symbols
            .iter()
            .map(|s| {
                model
                    .find(s)
                    .ok_or_else(|| trellis_err!(NotFound: "no variable with symbol '{}'", s))
            })
            .collect::<TrellisResult<Vec<VarId>>>()?;
        Ok(TimeSeries {
            observed,
            rows: Vec::new(),
        })
    }

    #[inline]
    pub fn observed(&self) -> &[VarId] {
        &self.observed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one step of state indices, `None` for missing.
    pub fn push_row(&mut self, row: &[Option<usize>]) -> TrellisResult<()> {
        ensure!(
            row.len() == self.observed.len(),
            DimensionMismatch: "row has {} cells, series has {} observed variables",
            row.len(),
            self.observed.len()
        );
        self.rows.push(row.to_vec());
        Ok(())
    }

    /// Append one step of named states; the empty string is missing.
    pub fn push_states(&mut self, model: &Model, states: &[&str]) -> TrellisResult<()> {
        ensure!(
            states.len() == self.observed.len(),
            DimensionMismatch: "row has {} cells, series has {} observed variables",
            states.len(),
            self.observed.len()
        );
        let row = self
            .observed
            .iter()
            .zip(states)
            .map(|(&var, &state)| {
                if state.is_empty() {
                    return Ok(None);
                }
                model
                    .variable(var)
                    .state_index(state)
                    .map(Some)
                    .ok_or_else(|| {
                        trellis_err!(
                            NotFound: "variable '{}' has no state '{}'",
                            model.variable(var).symbol(),
                            state
                        )
                    })
            })
            .collect::<TrellisResult<Vec<Option<usize>>>>()?;
        self.rows.push(row);
        Ok(())
    }

    /// The observation of one variable at one step, if present.
    pub fn value_of(&self, t: usize, var: VarId) -> Option<usize> {
        let column = self.observed.iter().position(|&v| v == var)?;
        self.rows[t][column]
    }

    #[inline]
    pub fn row(&self, t: usize) -> &[Option<usize>] {
        &self.rows[t]
    }
}

/// Per-step probability distributions for a set of tracked variables,
/// the result of a forward or forward-backward sweep.
#[derive(Clone, Debug)]
pub struct UncertainSeries {
    vars: Vec<VarId>,
    data: Vec<Vec<Vec<f64>>>,
}

impl UncertainSeries {
    pub(crate) fn new(model: &Model, vars: &[VarId], length: usize) -> Self {
        let data = (0..length)
            .map(|_| {
                vars.iter()
                    .map(|&v| vec![0.0; model.variable(v).cardinality()])
                    .collect()
            })
            .collect();
        UncertainSeries {
            vars: vars.to_vec(),
            data,
        }
    }

    #[inline]
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The distribution of a tracked variable at one step.
    pub fn distribution(&self, t: usize, var: VarId) -> Option<&[f64]> {
        let column = self.vars.iter().position(|&v| v == var)?;
        Some(&self.data[t][column])
    }

    pub(crate) fn record(&mut self, t: usize, var: VarId, distribution: Vec<f64>) {
        if let Some(column) = self.vars.iter().position(|&v| v == var) {
            self.data[t][column] = distribution;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::Model;

    fn model() -> Model {
        let mut b = Model::builder();
        b.variable("X", "", &["lo", "hi"]).unwrap();
        b.variable("Y", "", &["a", "b", "c"]).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn named_rows_resolve_states() {
        let model = model();
        let mut series = TimeSeries::new(&model, &["Y", "X"]).unwrap();
        series.push_states(&model, &["c", "lo"]).unwrap();
        series.push_states(&model, &["", "hi"]).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.value_of(0, model.find("Y").unwrap()), Some(2));
        assert_eq!(series.value_of(1, model.find("Y").unwrap()), None);
        assert_eq!(series.value_of(1, model.find("X").unwrap()), Some(1));
    }

    #[test]
    fn unknown_symbols_and_states_are_rejected() {
        let model = model();
        assert!(TimeSeries::new(&model, &["Z"]).is_err());

        let mut series = TimeSeries::new(&model, &["X"]).unwrap();
        assert!(series.push_states(&model, &["nope"]).is_err());
        assert!(series.push_row(&[Some(0), Some(1)]).is_err());
    }
}
