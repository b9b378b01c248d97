pub mod compile;
pub mod domain;
pub mod graph;
mod heap;
pub mod model;
pub mod potential;
pub mod tree;
pub mod variable;

pub use compile::compile;
pub use graph::Graph;
pub use trellis_utils::SortedBuffer;
pub use model::{Model, ModelBuilder};
pub use potential::{Potential, normalize_slice};
pub use tree::{Clique, CliqueId, EvidenceOutcome, JoinTree, Sepset, SepsetId};
pub use variable::{Interface, VarId, Variable};

pub mod prelude {
    pub use super::compile::compile;
    pub use super::domain::random_provider;
    pub use super::graph::Graph;
    pub use super::model::{Model, ModelBuilder};
    pub use super::potential::Potential;
    pub use super::tree::{Clique, CliqueId, EvidenceOutcome, JoinTree, Sepset, SepsetId};
    pub use super::variable::{Interface, VarId, Variable};
}
