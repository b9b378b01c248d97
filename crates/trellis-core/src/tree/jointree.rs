use super::{Clique, CliqueId, Sepset, SepsetId};
use crate::model::Model;
use crate::potential::{Potential, normalize_slice};
use crate::variable::VarId;
use trellis_error::{TrellisResult, ensure, trellis_bail, trellis_err};
use trellis_utils::SortedBuffer;

/// What entering a piece of evidence did to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvidenceOutcome {
    /// The family clique was updated in place by the likelihood ratio.
    Updated,
    /// The new likelihood revived a state that had been ruled out, so the
    /// whole tree was retracted to its CPT-initialized state and every
    /// stored likelihood re-entered.
    Retracted,
}

/// A junction tree: flat clique and sepset arenas connected into an acyclic
/// structure satisfying the running intersection property. Cliques and
/// sepsets address each other by index, never by reference.
///
/// The tree owns every potential in it. Message passing and evidence entry
/// mutate the potentials in place; [global_retraction](JoinTree::global_retraction)
/// rewinds them to the CPT-initialized state.
#[derive(Clone, Debug)]
pub struct JoinTree {
    cliques: Vec<Clique>,
    sepsets: Vec<Sepset>,
}

impl JoinTree {
    pub(crate) fn new(cliques: Vec<Clique>) -> Self {
        JoinTree {
            cliques,
            sepsets: Vec::new(),
        }
    }

    #[inline]
    pub fn cliques(&self) -> &[Clique] {
        &self.cliques
    }

    #[inline]
    pub fn clique(&self, id: CliqueId) -> &Clique {
        &self.cliques[id.0]
    }

    #[inline]
    pub fn sepsets(&self) -> &[Sepset] {
        &self.sepsets
    }

    #[inline]
    pub fn sepset(&self, id: SepsetId) -> &Sepset {
        &self.sepsets[id.0]
    }

    /// The first clique whose variable set covers `set`, in arena order.
    pub fn find_clique_covering(&self, set: &SortedBuffer<VarId>) -> Option<CliqueId> {
        self.cliques
            .iter()
            .position(|c| c.covers(set))
            .map(CliqueId)
    }

    pub(crate) fn add_sepset(
        &mut self,
        a: CliqueId,
        b: CliqueId,
        vars: SortedBuffer<VarId>,
        model: &Model,
    ) -> TrellisResult<SepsetId> {
        let id = SepsetId(self.sepsets.len());
        self.sepsets.push(Sepset::new(vars, (a, b), model)?);
        self.cliques[a.0].add_sepset(id);
        self.cliques[b.0].add_sepset(id);
        Ok(id)
    }

    pub(crate) fn snapshot_originals(&mut self) {
        for clique in self.cliques.iter_mut() {
            clique.snapshot_original();
        }
    }

    fn unmark_all(&mut self) {
        for clique in self.cliques.iter_mut() {
            clique.set_mark(false);
        }
    }

    /// Whether two cliques already lie in the same component of the growing
    /// forest, decided by marking reachable cliques from `a`.
    pub(crate) fn connected(&mut self, a: CliqueId, b: CliqueId) -> bool {
        self.unmark_all();
        let mut stack = vec![a];
        while let Some(c) = stack.pop() {
            if c == b {
                return true;
            }
            if self.cliques[c.0].is_marked() {
                continue;
            }
            self.cliques[c.0].set_mark(true);
            for &s in self.cliques[c.0].sepsets() {
                let other = self.sepsets[s.0].other(c);
                if !self.cliques[other.0].is_marked() {
                    stack.push(other);
                }
            }
        }
        false
    }

    /// Project a clique onto a sepset: the current message becomes the old
    /// one and the new message is the clique marginal over the sepset
    /// variables.
    fn project(&mut self, from: CliqueId, s: SepsetId) -> TrellisResult<()> {
        let mapping = self.cliques[from.0].mapping_of(self.sepsets[s.0].vars())?;
        let sep = &mut self.sepsets[s.0];
        sep.swap_buffers();
        self.cliques[from.0]
            .potential()
            .marginalize_into(sep.new_pot_mut(), &mapping)
    }

    /// Absorb a sepset into a clique: multiply by the new message, divide by
    /// the old one, `0/0 := 0`.
    fn absorb(&mut self, to: CliqueId, s: SepsetId) -> TrellisResult<()> {
        let mapping = self.cliques[to.0].mapping_of(self.sepsets[s.0].vars())?;
        let sep = &self.sepsets[s.0];
        Potential::update(
            Some(sep.new_pot()),
            Some(sep.old_pot()),
            self.cliques[to.0].potential_mut(),
            &mapping,
        )
    }

    /// A single message `from -> to` through their shared sepset.
    fn pass(&mut self, from: CliqueId, s: SepsetId, to: CliqueId) -> TrellisResult<()> {
        self.project(from, s)?;
        self.absorb(to, s)
    }

    fn collect(&mut self, caller: Option<(CliqueId, SepsetId)>, c: CliqueId) -> TrellisResult<()> {
        self.cliques[c.0].set_mark(true);
        let sepsets = self.cliques[c.0].sepsets().to_vec();
        for s in sepsets {
            let other = self.sepsets[s.0].other(c);
            if !self.cliques[other.0].is_marked() {
                self.collect(Some((c, s)), other)?;
            }
        }
        if let Some((parent, via)) = caller {
            self.pass(c, via, parent)?;
        }
        Ok(())
    }

    fn distribute(&mut self, c: CliqueId) -> TrellisResult<()> {
        self.cliques[c.0].set_mark(true);
        let sepsets = self.cliques[c.0].sepsets().to_vec();
        for s in sepsets {
            let other = self.sepsets[s.0].other(c);
            if !self.cliques[other.0].is_marked() {
                self.pass(c, s, other)?;
                self.distribute(other)?;
            }
        }
        Ok(())
    }

    /// Full COLLECT + DISTRIBUTE from `root`. Afterwards every clique and
    /// sepset marginal agrees; the marginals do not depend on the chosen
    /// root.
    pub fn make_consistent_from(&mut self, root: CliqueId) -> TrellisResult<()> {
        ensure!(
            root.0 < self.cliques.len(),
            InvalidArgument: "clique index {} out of range ({} cliques)",
            root.0,
            self.cliques.len()
        );
        self.unmark_all();
        self.collect(None, root)?;
        self.unmark_all();
        self.distribute(root)?;
        tracing::trace!(root = root.0, "join tree made consistent");
        Ok(())
    }

    pub fn make_consistent(&mut self) -> TrellisResult<()> {
        self.make_consistent_from(CliqueId(0))
    }

    /// Enter a likelihood vector for one variable into its family clique.
    ///
    /// When the new likelihood revives a state whose stored likelihood was
    /// zero, the multiplicative update cannot recover the lost mass; the
    /// tree is globally retracted instead and all stored likelihoods are
    /// re-entered, the new one included.
    pub fn enter_evidence(
        &mut self,
        model: &mut Model,
        var: VarId,
        evidence: &[f64],
    ) -> TrellisResult<EvidenceOutcome> {
        let v = model.variable(var);
        ensure!(
            evidence.len() == v.cardinality(),
            DimensionMismatch: "evidence for '{}' has {} entries, variable has {} states",
            v.symbol(),
            evidence.len(),
            v.cardinality()
        );
        ensure!(
            evidence.iter().all(|&e| e >= 0.0) && evidence.iter().sum::<f64>() > 0.0,
            InvalidArgument: "evidence for '{}' must be non-negative with positive mass",
            v.symbol()
        );
        let family = v.family_clique().ok_or_else(
            || trellis_err!(Inconsistent: "variable '{}' has no family clique", v.symbol()),
        )?;

        let retraction = evidence
            .iter()
            .zip(v.likelihood())
            .any(|(&e, &old)| e != 0.0 && old == 0.0);

        if retraction {
            model.variable_mut(var).update_likelihood(evidence)?;
            self.global_retraction(model)?;
            return Ok(EvidenceOutcome::Retracted);
        }

        let dim = self.cliques[family.0].dimension_of(var).ok_or_else(
            || trellis_err!(Inconsistent: "family clique does not contain its variable"),
        )?;
        let old = model.variable(var).likelihood().to_vec();
        Potential::update_evidence(
            evidence,
            Some(&old),
            self.cliques[family.0].potential_mut(),
            dim,
        )?;
        model.variable_mut(var).update_likelihood(evidence)?;
        Ok(EvidenceOutcome::Updated)
    }

    /// Hard evidence: an indicator likelihood at `state`.
    pub fn enter_observation(
        &mut self,
        model: &mut Model,
        var: VarId,
        state: usize,
    ) -> TrellisResult<EvidenceOutcome> {
        let cardinality = model.variable(var).cardinality();
        ensure!(
            state < cardinality,
            InvalidArgument: "state {} out of range for '{}' ({} states)",
            state,
            model.variable(var).symbol(),
            cardinality
        );
        let mut indicator = vec![0.0; cardinality];
        indicator[state] = 1.0;
        self.enter_evidence(model, var, &indicator)
    }

    /// Restore every clique to its CPT-initialized snapshot and every
    /// sepset to all-ones, then re-enter the likelihood currently stored on
    /// each variable (with no denominator; the potentials are pristine).
    pub fn global_retraction(&mut self, model: &Model) -> TrellisResult<()> {
        self.restore_originals()?;
        for v in model.variables() {
            let Some(family) = v.family_clique() else {
                continue;
            };
            if v.likelihood().iter().all(|&l| l == 1.0) {
                continue;
            }
            let dim = self.cliques[family.0].dimension_of(v.id()).ok_or_else(
                || trellis_err!(Inconsistent: "family clique does not contain its variable"),
            )?;
            Potential::update_evidence(
                v.likelihood(),
                None,
                self.cliques[family.0].potential_mut(),
                dim,
            )?;
        }
        tracing::debug!("global retraction performed");
        Ok(())
    }

    /// Forget all evidence: likelihoods back to ones, potentials back to
    /// the CPT-initialized state.
    pub fn reset_evidence(&mut self, model: &mut Model) -> TrellisResult<()> {
        model.reset_likelihoods();
        self.restore_originals()
    }

    fn restore_originals(&mut self) -> TrellisResult<()> {
        for clique in self.cliques.iter_mut() {
            clique.restore()?;
        }
        for sepset in self.sepsets.iter_mut() {
            sepset.reset();
        }
        Ok(())
    }

    /// Multiply a joint potential into a clique under a mapping from the
    /// potential's dimensions to the clique's. This is how a time-slice
    /// message enters the tree.
    pub fn inject_potential(
        &mut self,
        c: CliqueId,
        probs: &Potential,
        mapping: &[usize],
    ) -> TrellisResult<()> {
        self.cliques[c.0]
            .potential_mut()
            .init_with(probs, Some(mapping))
    }

    /// Unnormalized marginal of a variable, read from its family clique.
    /// The tree must be consistent for the result to be a true marginal.
    pub fn marginal_for(&self, model: &Model, var: VarId) -> TrellisResult<Vec<f64>> {
        let v = model.variable(var);
        let family = v.family_clique().ok_or_else(
            || trellis_err!(Inconsistent: "variable '{}' has no family clique", v.symbol()),
        )?;
        let mut result = vec![0.0; v.cardinality()];
        self.cliques[family.0].marginalize(var, &mut result)?;
        Ok(result)
    }

    /// Normalized marginal distribution of a variable.
    pub fn distribution_of(&self, model: &Model, var: VarId) -> TrellisResult<Vec<f64>> {
        let mut result = self.marginal_for(model, var)?;
        normalize_slice(&mut result);
        Ok(result)
    }

    /// Unnormalized joint potential over a variable subset of one clique,
    /// dimensions in ascending id order.
    pub fn joint_marginal(
        &self,
        c: CliqueId,
        vars: &SortedBuffer<VarId>,
        model: &Model,
    ) -> TrellisResult<Potential> {
        let clique = &self.cliques[c.0];
        if !clique.covers(vars) {
            trellis_bail!(NotFound: "clique {} does not cover the requested variables", c.0);
        }
        let cards: Vec<usize> = vars
            .iter()
            .map(|&v| model.variable(v).cardinality())
            .collect();
        let mut joint = Potential::new(&cards, None)?;
        let mapping = clique.mapping_of(vars)?;
        clique.potential().marginalize_into(&mut joint, &mapping)?;
        Ok(joint)
    }

    /// Total probability mass of the tree, read from clique 0. After
    /// consistency this is the likelihood of all entered evidence (relative
    /// to the mass before it was entered).
    pub fn total_mass(&self) -> f64 {
        self.cliques[0].potential().total_mass()
    }
}

impl std::fmt::Display for JoinTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, clique) in self.cliques.iter().enumerate() {
            write!(f, "clique {}: {{", i)?;
            for (j, v) in clique.vars().iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", v.0)?;
            }
            writeln!(f, "}} ({} cells)", clique.potential().size())?;
        }
        for sepset in &self.sepsets {
            let (a, b) = sepset.cliques();
            write!(f, "sepset {} -- {}: {{", a.0, b.0)?;
            for (j, v) in sepset.vars().iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", v.0)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
