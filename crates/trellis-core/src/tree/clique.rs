use super::SepsetId;
use crate::model::Model;
use crate::potential::Potential;
use crate::variable::VarId;
use trellis_error::{TrellisResult, trellis_err};
use trellis_utils::SortedBuffer;

/// A maximal set of variables jointly represented by one potential in the
/// junction tree. The potential accumulates the CPTs assigned to this
/// clique and all evidence entered since; `original` is the CPT-initialized
/// snapshot that global retraction restores.
///
/// The variable set is kept in ascending id order and the potential's
/// dimensions follow it, so the dimension of a member variable is its rank
/// in the set.
#[derive(Clone, Debug)]
pub struct Clique {
    vars: SortedBuffer<VarId>,
    potential: Potential,
    original: Potential,
    sepsets: Vec<SepsetId>,
    mark: bool,
}

impl Clique {
    pub(crate) fn new(vars: SortedBuffer<VarId>, model: &Model) -> TrellisResult<Self> {
        let cards: Vec<usize> = vars
            .iter()
            .map(|&v| model.variable(v).cardinality())
            .collect();
        let potential = Potential::new(&cards, None)?;
        let original = potential.clone();
        Ok(Clique {
            vars,
            potential,
            original,
            sepsets: Vec::new(),
            mark: false,
        })
    }

    #[inline]
    pub fn vars(&self) -> &SortedBuffer<VarId> {
        &self.vars
    }

    #[inline]
    pub fn potential(&self) -> &Potential {
        &self.potential
    }

    #[inline]
    pub(crate) fn potential_mut(&mut self) -> &mut Potential {
        &mut self.potential
    }

    pub(crate) fn snapshot_original(&mut self) {
        self.original = self.potential.clone();
    }

    /// Rewind the working potential to the CPT-initialized snapshot.
    pub(crate) fn restore(&mut self) -> TrellisResult<()> {
        self.potential.copy_from(&self.original)
    }

    #[inline]
    pub fn sepsets(&self) -> &[SepsetId] {
        &self.sepsets
    }

    pub(crate) fn add_sepset(&mut self, sepset: SepsetId) {
        self.sepsets.push(sepset);
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.mark
    }

    #[inline]
    pub(crate) fn set_mark(&mut self, mark: bool) {
        self.mark = mark;
    }

    #[inline]
    pub fn contains(&self, var: VarId) -> bool {
        self.vars.contains(&var)
    }

    pub fn covers(&self, set: &SortedBuffer<VarId>) -> bool {
        set.is_subset_of(&self.vars)
    }

    /// Dimension of a member variable in this clique's potential.
    pub fn dimension_of(&self, var: VarId) -> Option<usize> {
        self.vars.position(&var)
    }

    /// Dimensions of a member subset, in the subset's (ascending) order.
    /// This is the mapping marginalization and absorption run under.
    pub fn mapping_of(&self, set: &SortedBuffer<VarId>) -> TrellisResult<Vec<usize>> {
        set.iter()
            .map(|&v| {
                self.dimension_of(v).ok_or_else(|| {
                    trellis_err!(NotFound: "variable {:?} is not a member of this clique", v)
                })
            })
            .collect()
    }

    /// State-space weight: the product of member cardinalities.
    #[inline]
    pub fn weight(&self) -> u64 {
        self.potential.size() as u64
    }

    /// Unnormalized marginal of one member variable.
    pub fn marginalize(&self, var: VarId, dest: &mut [f64]) -> TrellisResult<()> {
        let dim = self
            .dimension_of(var)
            .ok_or_else(|| trellis_err!(NotFound: "variable {:?} is not a member of this clique", var))?;
        self.potential.total_marginalize_into(dest, dim)
    }
}
