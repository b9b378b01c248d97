use crate::tree::CliqueId;
use trellis_error::{TrellisResult, ensure};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest accepted short symbol for a variable.
pub const MAX_SYMBOL_LEN: usize = 20;
/// Longest accepted verbose name for a variable.
pub const MAX_NAME_LEN: usize = 40;

/// Stable identifier of a random variable within a [Model](crate::Model).
///
/// Ids are assigned monotonically by the model builder and double as the
/// index into the model's variable table. Two variables are equal iff their
/// ids are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct VarId(pub u32);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for VarId {
    fn from(v: usize) -> Self {
        VarId(v as u32)
    }
}

impl From<u32> for VarId {
    fn from(v: u32) -> Self {
        VarId(v)
    }
}

/// Time-slice interface membership of a variable in a two-slice DBN template.
///
/// `Outgoing` variables form the set that separates the current slice from
/// the next one; `OldOutgoing` variables are their stand-ins for the previous
/// slice. The compiler connects each flagged group into a clique so a single
/// joint message can cross the slice boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Interface {
    #[default]
    None,
    Outgoing,
    OldOutgoing,
}

/// A categorical random variable: identity, state space, parent set and the
/// likelihood vector holding the evidence currently entered for it.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variable {
    id: VarId,
    symbol: String,
    name: String,
    states: Vec<String>,
    parents: Vec<VarId>,
    likelihood: Vec<f64>,
    interface: Interface,
    next: Option<VarId>,
    previous: Option<VarId>,
    family_clique: Option<CliqueId>,
}

impl Variable {
    pub(crate) fn new(id: VarId, symbol: String, name: String, states: Vec<String>) -> Self {
        let cardinality = states.len();
        Variable {
            id,
            symbol,
            name,
            states,
            parents: Vec::new(),
            likelihood: vec![1.0; cardinality],
            interface: Interface::None,
            next: None,
            previous: None,
            family_clique: None,
        }
    }

    #[inline]
    pub fn id(&self) -> VarId {
        self.id
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Numerical representation of a named state, or `None` when the
    /// variable has no such state.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    #[inline]
    pub fn parents(&self) -> &[VarId] {
        &self.parents
    }

    pub(crate) fn set_parents(&mut self, parents: Vec<VarId>) {
        self.parents = parents;
    }

    /// The variable itself plus its parents, in ascending id order.
    pub fn family(&self) -> trellis_utils::SortedBuffer<VarId> {
        self.parents
            .iter()
            .copied()
            .chain(std::iter::once(self.id))
            .collect()
    }

    #[inline]
    pub fn likelihood(&self) -> &[f64] {
        &self.likelihood
    }

    pub fn update_likelihood(&mut self, likelihood: &[f64]) -> TrellisResult<()> {
        ensure!(
            likelihood.len() == self.states.len(),
            DimensionMismatch: "likelihood for '{}' has {} entries, variable has {} states",
            self.symbol,
            likelihood.len(),
            self.states.len()
        );
        self.likelihood.copy_from_slice(likelihood);
        Ok(())
    }

    pub fn reset_likelihood(&mut self) {
        self.likelihood.fill(1.0);
    }

    #[inline]
    pub fn interface(&self) -> Interface {
        self.interface
    }

    pub(crate) fn set_interface(&mut self, interface: Interface) {
        self.interface = interface;
    }

    /// The variable substituting this one in the next time slice.
    #[inline]
    pub fn next(&self) -> Option<VarId> {
        self.next
    }

    /// The variable this one substitutes from the previous time slice.
    #[inline]
    pub fn previous(&self) -> Option<VarId> {
        self.previous
    }

    pub(crate) fn set_next(&mut self, next: VarId) {
        self.next = Some(next);
    }

    pub(crate) fn set_previous(&mut self, previous: VarId) {
        self.previous = Some(previous);
    }

    /// Index of the clique holding this variable's family, set at compile
    /// time. Non-owning.
    #[inline]
    pub fn family_clique(&self) -> Option<CliqueId> {
        self.family_clique
    }

    pub(crate) fn set_family_clique(&mut self, clique: CliqueId) {
        self.family_clique = Some(clique);
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}
