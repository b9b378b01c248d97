use crate::series::TimeSeries;
use trellis_core::{
    CliqueId, EvidenceOutcome, JoinTree, Model, Potential, VarId, compile,
};
use trellis_error::{TrellisResult, ensure, trellis_err};
use trellis_utils::SortedBuffer;

/// A compiled two-slice DBN template and the per-step machinery around it:
/// evidence insertion, consistency, and the interface message that carries
/// the state of one slice into the next.
///
/// The engine owns the model and its junction tree. One step of work is:
/// reset to the CPT-initialized state (priors applied), inject the previous
/// slice's outgoing message, insert this slice's evidence, make the tree
/// consistent, read marginals, and extract the next outgoing message.
///
/// Interface messages are carried as joint potentials whose dimensions
/// follow the old-outgoing variables in ascending id order, so the same
/// layout serves extraction, injection and the backward division.
pub struct TimeSliceEngine {
    model: Model,
    tree: JoinTree,
    outgoing: SortedBuffer<VarId>,
    old_outgoing: SortedBuffer<VarId>,
    in_clique: CliqueId,
    out_clique: CliqueId,
    // messages multiplied into the tree this step, replayed after a
    // retraction wipes them
    injected: Vec<(CliqueId, Potential, Vec<usize>)>,
}

impl TimeSliceEngine {
    /// Compile a model and locate the interface cliques. Every parentless
    /// variable must carry a prior; without one the tree mass loses its
    /// likelihood interpretation.
    pub fn new(mut model: Model) -> TrellisResult<Self> {
        for v in model.independent() {
            ensure!(
                model.prior(v.id()).is_some(),
                InvalidArgument: "parentless variable '{}' has no prior",
                v.symbol()
            );
        }

        let tree = compile(&mut model)?;
        let outgoing = model.outgoing_interface();
        let old_outgoing = model.old_outgoing_interface();

        let receivers: SortedBuffer<VarId> = outgoing
            .iter()
            .map(|&v| {
                model.variable(v).next().ok_or_else(|| {
                    trellis_err!(
                        Inconsistent: "outgoing variable '{}' lost its slice link",
                        model.variable(v).symbol()
                    )
                })
            })
            .collect::<TrellisResult<_>>()?;
        ensure!(
            receivers == old_outgoing,
            InvalidArgument: "slice links do not pair the outgoing interface with the old one"
        );

        let out_clique = tree.find_clique_covering(&outgoing).ok_or_else(
            || trellis_err!(Inconsistent: "no clique covers the outgoing interface"),
        )?;
        let in_clique = tree.find_clique_covering(&old_outgoing).ok_or_else(
            || trellis_err!(Inconsistent: "no clique covers the previous outgoing interface"),
        )?;

        tracing::debug!(
            cliques = tree.cliques().len(),
            outgoing = outgoing.len(),
            "time-slice engine ready"
        );

        Ok(TimeSliceEngine {
            model,
            tree,
            outgoing,
            old_outgoing,
            in_clique,
            out_clique,
            injected: Vec::new(),
        })
    }

    #[inline]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[inline]
    pub fn tree(&self) -> &JoinTree {
        &self.tree
    }

    /// Forget all evidence and re-apply priors as soft evidence. On any
    /// step but the first, priors of variables that receive their value
    /// from the previous slice are suppressed: the interface message
    /// replaces them.
    pub fn reset(&mut self, first_step: bool) -> TrellisResult<()> {
        self.tree.reset_evidence(&mut self.model)?;
        self.injected.clear();

        let priors: Vec<(VarId, Vec<f64>)> = self
            .model
            .independent()
            .filter(|v| first_step || v.previous().is_none())
            .filter_map(|v| self.model.prior(v.id()).map(|p| (v.id(), p.to_vec())))
            .collect();
        for (var, prior) in priors {
            self.enter(var, &prior)?;
        }
        Ok(())
    }

    /// Enter a likelihood, replaying any interface messages if the entry
    /// forced a global retraction.
    fn enter(&mut self, var: VarId, likelihood: &[f64]) -> TrellisResult<()> {
        match self.tree.enter_evidence(&mut self.model, var, likelihood)? {
            EvidenceOutcome::Updated => Ok(()),
            EvidenceOutcome::Retracted => {
                for (clique, potential, mapping) in &self.injected {
                    self.tree.inject_potential(*clique, potential, mapping)?;
                }
                Ok(())
            }
        }
    }

    /// Hard evidence by state index.
    pub fn observe_index(&mut self, symbol: &str, state: usize) -> TrellisResult<()> {
        let var = self.resolve(symbol)?;
        let cardinality = self.model.variable(var).cardinality();
        ensure!(
            state < cardinality,
            InvalidArgument: "state {} out of range for '{}' ({} states)",
            state,
            symbol,
            cardinality
        );
        let mut indicator = vec![0.0; cardinality];
        indicator[state] = 1.0;
        self.enter(var, &indicator)
    }

    /// Hard evidence by state name.
    pub fn observe(&mut self, symbol: &str, state: &str) -> TrellisResult<()> {
        let var = self.resolve(symbol)?;
        let index = self.model.variable(var).state_index(state).ok_or_else(
            || trellis_err!(NotFound: "variable '{}' has no state '{}'", symbol, state),
        )?;
        self.observe_index(symbol, index)
    }

    /// Soft evidence: an arbitrary non-negative likelihood vector.
    pub fn observe_soft(&mut self, symbol: &str, likelihood: &[f64]) -> TrellisResult<()> {
        let var = self.resolve(symbol)?;
        self.enter(var, likelihood)
    }

    fn resolve(&self, symbol: &str) -> TrellisResult<VarId> {
        self.model
            .find(symbol)
            .ok_or_else(|| trellis_err!(NotFound: "no variable with symbol '{}'", symbol))
    }

    /// Insert one step of a time series: an indicator for every observed
    /// value, nothing for missing ones (their likelihood stays all-ones).
    pub fn insert_step(&mut self, series: &TimeSeries, t: usize) -> TrellisResult<()> {
        let entries: Vec<(VarId, usize)> = series
            .observed()
            .iter()
            .zip(series.row(t))
            .filter_map(|(&var, &value)| value.map(|state| (var, state)))
            .collect();
        for (var, state) in entries {
            let cardinality = self.model.variable(var).cardinality();
            ensure!(
                state < cardinality,
                InvalidArgument: "state {} out of range for '{}' at step {}",
                state,
                self.model.variable(var).symbol(),
                t
            );
            let mut indicator = vec![0.0; cardinality];
            indicator[state] = 1.0;
            self.enter(var, &indicator)?;
        }
        Ok(())
    }

    pub fn make_consistent(&mut self) -> TrellisResult<()> {
        self.tree.make_consistent()
    }

    /// Normalized marginal of a variable. The tree must be consistent.
    pub fn distribution_of(&self, var: VarId) -> TrellisResult<Vec<f64>> {
        self.tree.distribution_of(&self.model, var)
    }

    /// Normalized marginal by symbol.
    pub fn distribution(&self, symbol: &str) -> TrellisResult<Vec<f64>> {
        self.distribution_of(self.resolve(symbol)?)
    }

    /// Normalized joint over a set of variables that share a clique.
    pub fn joint(&self, symbols: &[&str]) -> TrellisResult<Potential> {
        let vars: SortedBuffer<VarId> = symbols
            .iter()
            .map(|s| self.resolve(s))
            .collect::<TrellisResult<_>>()?;
        let clique = self.tree.find_clique_covering(&vars).ok_or_else(
            || trellis_err!(NotFound: "no clique covers the requested variables"),
        )?;
        let mut joint = self.tree.joint_marginal(clique, &vars, &self.model)?;
        joint.normalize_mass();
        Ok(joint)
    }

    /// Total probability mass of the tree: the likelihood of the evidence
    /// entered this step, read before any normalization.
    pub fn mass(&self) -> f64 {
        self.tree.total_mass()
    }

    /// The normalized joint over the outgoing interface, extracted from the
    /// out-clique and reordered into old-outgoing layout, ready for
    /// injection into the next step.
    pub fn outgoing_message(&self) -> TrellisResult<Potential> {
        if self.outgoing.is_empty() {
            return Ok(Potential::scalar(1.0));
        }
        let joint = self
            .tree
            .joint_marginal(self.out_clique, &self.outgoing, &self.model)?;

        let perm = self
            .old_outgoing
            .iter()
            .map(|&old| {
                let partner = self.partner_of(old)?;
                self.outgoing.position(&partner).ok_or_else(
                    || trellis_err!(Inconsistent: "slice link leaves the outgoing interface"),
                )
            })
            .collect::<TrellisResult<Vec<usize>>>()?;

        let mut message = joint.reorder(&perm)?;
        message.normalize_mass();
        Ok(message)
    }

    /// Multiply a previous slice's outgoing message onto the old-outgoing
    /// variables of the in-clique.
    pub fn inject_incoming(&mut self, message: &Potential) -> TrellisResult<()> {
        if self.old_outgoing.is_empty() {
            return Ok(());
        }
        let mapping = self
            .tree
            .clique(self.in_clique)
            .mapping_of(&self.old_outgoing)?;
        self.tree
            .inject_potential(self.in_clique, message, &mapping)?;
        self.injected
            .push((self.in_clique, message.clone(), mapping));
        Ok(())
    }

    /// Multiply a following slice's backward message onto the outgoing
    /// variables of the out-clique.
    pub fn inject_backward(&mut self, message: &Potential) -> TrellisResult<()> {
        if self.old_outgoing.is_empty() {
            return Ok(());
        }
        let mapping = self
            .old_outgoing
            .iter()
            .map(|&old| {
                let partner = self.partner_of(old)?;
                self.tree
                    .clique(self.out_clique)
                    .dimension_of(partner)
                    .ok_or_else(
                        || trellis_err!(Inconsistent: "out-clique lost an interface variable"),
                    )
            })
            .collect::<TrellisResult<Vec<usize>>>()?;
        self.tree
            .inject_potential(self.out_clique, message, &mapping)?;
        self.injected
            .push((self.out_clique, message.clone(), mapping));
        Ok(())
    }

    /// The backward message for the previous step: the smoothed joint over
    /// the old-outgoing variables divided by the forward message that was
    /// injected onto them, leaving the pure backward likelihood.
    pub fn backward_message(&self, forward: &Potential) -> TrellisResult<Potential> {
        let mut smoothed = self
            .tree
            .joint_marginal(self.in_clique, &self.old_outgoing, &self.model)?;
        smoothed.normalize_mass();

        let identity: Vec<usize> = (0..smoothed.rank()).collect();
        Potential::update(None, Some(forward), &mut smoothed, &identity)?;
        smoothed.normalize_mass();
        Ok(smoothed)
    }

    fn partner_of(&self, old: VarId) -> TrellisResult<VarId> {
        self.model.variable(old).previous().ok_or_else(|| {
            trellis_err!(
                Inconsistent: "'{}' receives no slice link",
                self.model.variable(old).symbol()
            )
        })
    }
}
