mod clique;
mod jointree;
mod sepset;

pub use clique::Clique;
pub use jointree::{EvidenceOutcome, JoinTree};
pub use sepset::Sepset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a clique in its join tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct CliqueId(pub usize);

/// Index of a sepset in its join tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct SepsetId(pub usize);
