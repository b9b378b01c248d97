use super::CliqueId;
use crate::model::Model;
use crate::potential::Potential;
use crate::variable::VarId;
use trellis_error::TrellisResult;
use trellis_utils::SortedBuffer;

/// The message channel between two neighboring cliques: their variable
/// intersection and a double-buffered pair of potentials over it.
///
/// Projection swaps the buffers before overwriting `new_pot`, so absorption
/// always sees the message it must divide out in `old_pot`.
#[derive(Clone, Debug)]
pub struct Sepset {
    cliques: (CliqueId, CliqueId),
    vars: SortedBuffer<VarId>,
    new_pot: Potential,
    old_pot: Potential,
}

impl Sepset {
    pub(crate) fn new(
        vars: SortedBuffer<VarId>,
        cliques: (CliqueId, CliqueId),
        model: &Model,
    ) -> TrellisResult<Self> {
        let cards: Vec<usize> = vars
            .iter()
            .map(|&v| model.variable(v).cardinality())
            .collect();
        let new_pot = Potential::new(&cards, None)?;
        let old_pot = new_pot.clone();
        Ok(Sepset {
            cliques,
            vars,
            new_pot,
            old_pot,
        })
    }

    #[inline]
    pub fn cliques(&self) -> (CliqueId, CliqueId) {
        self.cliques
    }

    /// The neighbor on the far side of this sepset.
    pub fn other(&self, clique: CliqueId) -> CliqueId {
        if self.cliques.0 == clique {
            self.cliques.1
        } else {
            self.cliques.0
        }
    }

    #[inline]
    pub fn vars(&self) -> &SortedBuffer<VarId> {
        &self.vars
    }

    #[inline]
    pub fn new_pot(&self) -> &Potential {
        &self.new_pot
    }

    #[inline]
    pub fn old_pot(&self) -> &Potential {
        &self.old_pot
    }

    #[inline]
    pub(crate) fn new_pot_mut(&mut self) -> &mut Potential {
        &mut self.new_pot
    }

    /// Make the current message the previous one. The stale buffer is
    /// overwritten by the projection that follows.
    pub(crate) fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.new_pot, &mut self.old_pot);
    }

    /// Both buffers back to all-ones (the retraction state).
    pub(crate) fn reset(&mut self) {
        self.new_pot.fill(1.0);
        self.old_pot.fill(1.0);
    }
}
