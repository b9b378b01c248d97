use crate::domain::random_provider;
use trellis_error::{TrellisResult, ensure, trellis_bail};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A dense multidimensional table of non-negative reals indexed by an
/// ordered tuple of discrete variables: the stand-in for an unnormalized
/// probability distribution.
///
/// The table is stored row-major with the FIRST dimension least significant:
/// the flat address of `(i_1, ..., i_k)` is `Σ i_j · Π_{m<j} c[m]`. Keeping
/// the first dimension least significant means a conditional distribution
/// whose child is the first dimension occupies contiguous stride-`c[0]`
/// blocks, which is what [normalize_cpd](Potential::normalize_cpd) relies
/// on.
///
/// A rank-0 potential is a scalar of size 1.
///
/// Reshaping operations take explicit mapping arrays instead of broadcasting
/// by position: `mapping[i]` names the dimension of the larger potential
/// that dimension `i` of the smaller one corresponds to.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Potential {
    cardinality: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<f64>,
}

impl Potential {
    /// Build a potential over the given cardinalities. With `data` absent
    /// every cell is initialized to 1.0.
    pub fn new(cardinality: &[usize], data: Option<&[f64]>) -> TrellisResult<Self> {
        ensure!(
            cardinality.iter().all(|&c| c > 0),
            InvalidArgument: "potential cardinalities must be positive, got {:?}",
            cardinality
        );

        let mut strides = vec![1usize; cardinality.len()];
        let mut size = 1usize;
        for (i, &card) in cardinality.iter().enumerate() {
            strides[i] = size;
            size *= card;
        }

        let data = match data {
            Some(values) => {
                ensure!(
                    values.len() == size,
                    DimensionMismatch: "potential over {:?} needs {} cells, got {}",
                    cardinality,
                    size,
                    values.len()
                );
                values.to_vec()
            }
            None => vec![1.0; size],
        };

        Ok(Potential {
            cardinality: cardinality.to_vec(),
            strides,
            data,
        })
    }

    /// A rank-0 potential holding a single value.
    pub fn scalar(value: f64) -> Self {
        Potential {
            cardinality: Vec::new(),
            strides: Vec::new(),
            data: vec![value],
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.cardinality.len()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn cardinality(&self) -> &[usize] {
        &self.cardinality
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn total_mass(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Flat address of an index tuple.
    #[inline]
    pub fn flat_index(&self, indices: &[usize]) -> usize {
        debug_assert_eq!(indices.len(), self.rank());
        indices
            .iter()
            .zip(&self.strides)
            .map(|(i, s)| i * s)
            .sum()
    }

    /// Index tuple of a flat address, written into `indices`. Inverse of
    /// [flat_index](Potential::flat_index): divide and take the remainder
    /// from the most significant dimension down.
    pub fn inverse_mapping(&self, mut flat: usize, indices: &mut [usize]) {
        debug_assert_eq!(indices.len(), self.rank());
        for dim in (0..self.rank()).rev() {
            indices[dim] = flat / self.strides[dim];
            flat %= self.strides[dim];
        }
    }

    #[inline]
    pub fn get(&self, indices: &[usize]) -> f64 {
        self.data[self.flat_index(indices)]
    }

    #[inline]
    pub fn set(&mut self, indices: &[usize], value: f64) {
        let flat = self.flat_index(indices);
        self.data[flat] = value;
    }

    /// Overwrite every cell with `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Overwrite every cell with a uniform random draw from `[0, 1)`.
    pub fn randomize(&mut self) {
        for cell in self.data.iter_mut() {
            *cell = random_provider::random::<f64>();
        }
    }

    /// Sum this potential down onto `dest`. `mapping[j]` is the dimension of
    /// `self` that becomes dimension `j` of `dest`; it must be strictly
    /// increasing. `dest` is zeroed first. A rank-0 `dest` receives the
    /// total sum.
    pub fn marginalize_into(&self, dest: &mut Potential, mapping: &[usize]) -> TrellisResult<()> {
        ensure!(
            dest.rank() <= self.rank(),
            InvalidArgument: "cannot marginalize rank {} into rank {}",
            self.rank(),
            dest.rank()
        );
        ensure!(
            mapping.len() == dest.rank(),
            DimensionMismatch: "mapping has {} entries for a rank {} destination",
            mapping.len(),
            dest.rank()
        );
        ensure!(
            mapping.windows(2).all(|w| w[0] < w[1])
                && mapping.iter().all(|&m| m < self.rank()),
            InvalidArgument: "marginalization mapping {:?} is not strictly increasing within rank {}",
            mapping,
            self.rank()
        );

        if dest.rank() == 0 {
            dest.data[0] = self.total_mass();
            return Ok(());
        }

        dest.fill(0.0);

        let mut src_indices = vec![0usize; self.rank()];
        let mut dst_indices = vec![0usize; dest.rank()];
        for (flat, value) in self.data.iter().enumerate() {
            self.inverse_mapping(flat, &mut src_indices);
            choose_indices(&src_indices, &mut dst_indices, mapping);
            let dst_flat = dest.flat_index(&dst_indices);
            dest.data[dst_flat] += value;
        }
        Ok(())
    }

    /// Single-dimension marginal written into a plain slice. The outcome is
    /// not normalized.
    pub fn total_marginalize_into(&self, dest: &mut [f64], dim: usize) -> TrellisResult<()> {
        if self.rank() == 0 {
            dest[0] = self.data[0];
            return Ok(());
        }
        ensure!(
            dim < self.rank(),
            InvalidArgument: "dimension {} out of range for rank {}",
            dim,
            self.rank()
        );
        ensure!(
            dest.len() == self.cardinality[dim],
            DimensionMismatch: "destination has {} entries, dimension {} has cardinality {}",
            dest.len(),
            dim,
            self.cardinality[dim]
        );

        dest.fill(0.0);
        let stride = self.strides[dim];
        let card = self.cardinality[dim];
        for (flat, value) in self.data.iter().enumerate() {
            dest[(flat / stride) % card] += value;
        }
        Ok(())
    }

    /// Pointwise update of `target` under an index mapping: multiply by the
    /// `numerator` cell and divide by the `denominator` cell. `mapping[i]`
    /// is the dimension of `target` corresponding to dimension `i` of the
    /// sources. At least one source must be given; when both are, their
    /// ranks must agree. Rank-0 sources broadcast across the whole target.
    ///
    /// Division by zero writes 0 into the target (`0/0 := 0`, the HUGIN
    /// message-passing convention).
    pub fn update(
        numerator: Option<&Potential>,
        denominator: Option<&Potential>,
        target: &mut Potential,
        mapping: &[usize],
    ) -> TrellisResult<()> {
        let rank = match (numerator, denominator) {
            (Some(num), Some(den)) => {
                ensure!(
                    num.rank() == den.rank(),
                    DimensionMismatch: "numerator rank {} != denominator rank {}",
                    num.rank(),
                    den.rank()
                );
                num.rank()
            }
            (Some(num), None) => num.rank(),
            (None, Some(den)) => den.rank(),
            (None, None) => {
                trellis_bail!(InvalidArgument: "update requires a numerator or a denominator")
            }
        };

        if rank == 0 {
            // scalar sources broadcast across the target
            for cell in target.data.iter_mut() {
                if let Some(num) = numerator {
                    *cell *= num.data[0];
                }
                if let Some(den) = denominator {
                    if den.data[0] != 0.0 {
                        *cell /= den.data[0];
                    } else {
                        *cell = 0.0;
                    }
                }
            }
            return Ok(());
        }

        ensure!(
            mapping.len() == rank && mapping.iter().all(|&m| m < target.rank()),
            DimensionMismatch: "mapping {:?} does not address rank {} sources within a rank {} target",
            mapping,
            rank,
            target.rank()
        );

        let mut target_indices = vec![0usize; target.rank()];
        let mut source_indices = vec![0usize; rank];
        for flat in 0..target.size() {
            target.inverse_mapping(flat, &mut target_indices);
            choose_indices(&target_indices, &mut source_indices, mapping);

            if let Some(num) = numerator {
                target.data[flat] *= num.data[num.flat_index(&source_indices)];
            }
            if let Some(den) = denominator {
                let divisor = den.data[den.flat_index(&source_indices)];
                if divisor != 0.0 {
                    target.data[flat] /= divisor;
                } else {
                    target.data[flat] = 0.0;
                }
            }
        }
        Ok(())
    }

    /// One-dimensional variant of [update](Potential::update) keyed on a
    /// single target dimension, used for evidence entry. Precondition:
    /// `denominator[i] == 0` implies `numerator[i] == 0`; otherwise a
    /// global retraction is required before calling this.
    pub fn update_evidence(
        numerator: &[f64],
        denominator: Option<&[f64]>,
        target: &mut Potential,
        dim: usize,
    ) -> TrellisResult<()> {
        ensure!(
            dim < target.rank(),
            InvalidArgument: "dimension {} out of range for rank {}",
            dim,
            target.rank()
        );
        ensure!(
            numerator.len() == target.cardinality[dim]
                && denominator.is_none_or(|d| d.len() == numerator.len()),
            DimensionMismatch: "evidence length does not match cardinality {} of dimension {}",
            target.cardinality[dim],
            dim
        );

        let stride = target.strides[dim];
        let card = target.cardinality[dim];
        for flat in 0..target.size() {
            let state = (flat / stride) % card;
            target.data[flat] *= numerator[state];
            if let Some(den) = denominator {
                if den[state] != 0.0 {
                    target.data[flat] /= den[state];
                }
            }
        }
        Ok(())
    }

    /// Multiply this potential by `probs` under a mapping, the operation
    /// that folds a conditional probability table into its host clique at
    /// tree construction. With `mapping` absent the geometries must agree
    /// and the product is elementwise. A rank-0 `probs` is assumed
    /// normalized and leaves the target untouched.
    pub fn init_with(&mut self, probs: &Potential, mapping: Option<&[usize]>) -> TrellisResult<()> {
        let Some(mapping) = mapping else {
            ensure!(
                probs.size() == self.size(),
                DimensionMismatch: "no mapping given but sizes differ ({} vs {})",
                probs.size(),
                self.size()
            );
            for (cell, p) in self.data.iter_mut().zip(&probs.data) {
                *cell *= p;
            }
            return Ok(());
        };

        if probs.rank() == 0 {
            return Ok(());
        }

        Potential::update(Some(probs), None, self, mapping)
    }

    /// A copy with dimensions permuted: `perm[j]` names the dimension of
    /// `self` that becomes dimension `j` of the result.
    pub fn reorder(&self, perm: &[usize]) -> TrellisResult<Potential> {
        let mut seen = vec![false; self.rank()];
        ensure!(
            perm.len() == self.rank()
                && perm.iter().all(|&d| {
                    d < seen.len() && !std::mem::replace(&mut seen[d], true)
                }),
            InvalidArgument: "{:?} is not a permutation of {} dimensions",
            perm,
            self.rank()
        );

        let cards: Vec<usize> = perm.iter().map(|&d| self.cardinality[d]).collect();
        let mut out = Potential::new(&cards, None)?;
        let mut src_indices = vec![0usize; self.rank()];
        let mut dst_indices = vec![0usize; self.rank()];
        for (flat, &value) in self.data.iter().enumerate() {
            self.inverse_mapping(flat, &mut src_indices);
            choose_indices(&src_indices, &mut dst_indices, perm);
            let target = out.flat_index(&dst_indices);
            out.data[target] = value;
        }
        Ok(out)
    }

    /// Divide every cell by the total sum. A no-op when the mass is zero.
    pub fn normalize_mass(&mut self) {
        normalize_slice(&mut self.data);
    }

    /// Normalize each conditional slice of a table whose FIRST dimension is
    /// the child: every contiguous stride-`c[0]` block is scaled to sum
    /// to 1.
    pub fn normalize_cpd(&mut self) -> TrellisResult<()> {
        ensure!(
            self.rank() > 0,
            InvalidArgument: "a scalar has no conditional slices to normalize"
        );
        let child_card = self.cardinality[0];
        for block in self.data.chunks_mut(child_card) {
            normalize_slice(block);
        }
        Ok(())
    }

    /// Normalize along one dimension: marginalize it out and divide by the
    /// result under the complementary mapping.
    pub fn normalize_dimension(&mut self, dim: usize) -> TrellisResult<()> {
        ensure!(
            dim < self.rank(),
            InvalidArgument: "dimension {} out of range for rank {}",
            dim,
            self.rank()
        );

        let kept: Vec<usize> = (0..self.rank()).filter(|&d| d != dim).collect();
        let cards: Vec<usize> = kept.iter().map(|&d| self.cardinality[d]).collect();
        let mut denom = Potential::new(&cards, None)?;
        self.marginalize_into(&mut denom, &kept)?;
        Potential::update(None, Some(&denom), self, &kept)
    }

    /// Restore this potential to a reference state with identical geometry
    /// (the retraction primitive).
    pub fn copy_from(&mut self, reference: &Potential) -> TrellisResult<()> {
        ensure!(
            self.cardinality == reference.cardinality,
            DimensionMismatch: "cannot restore from a potential of different geometry"
        );
        self.data.copy_from_slice(&reference.data);
        Ok(())
    }

    /// Elementwise `self += other`, geometry-checked.
    pub fn add_assign_from(&mut self, other: &Potential) -> TrellisResult<()> {
        ensure!(
            self.size() == other.size(),
            DimensionMismatch: "cannot add potentials of different size ({} vs {})",
            self.size(),
            other.size()
        );
        for (cell, inc) in self.data.iter_mut().zip(&other.data) {
            *cell += inc;
        }
        Ok(())
    }
}

impl std::fmt::Display for Potential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.rank() == 0 {
            return writeln!(f, "P() = {:.6}", self.data[0]);
        }
        let mut indices = vec![0usize; self.rank()];
        for (flat, value) in self.data.iter().enumerate() {
            self.inverse_mapping(flat, &mut indices);
            write!(f, "P(")?;
            for (dim, index) in indices.iter().enumerate() {
                if dim > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", index)?;
            }
            writeln!(f, ") = {:.6}", value)?;
        }
        Ok(())
    }
}

/// Drops the indices of dimensions that are marginalized or multiplied out:
/// `dest[i] = source[mapping[i]]`.
#[inline]
fn choose_indices(source: &[usize], dest: &mut [usize], mapping: &[usize]) {
    for (d, &m) in dest.iter_mut().zip(mapping) {
        *d = source[m];
    }
}

/// Scale a slice so it sums to 1. A no-op when the sum is zero.
pub fn normalize_slice(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum == 0.0 {
        return;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn ab() -> Potential {
        // P over (A, B), both binary, A least significant
        Potential::new(&[2, 2], Some(&[0.1, 0.2, 0.3, 0.4])).unwrap()
    }

    #[test]
    fn geometry_checked_on_creation() {
        assert!(Potential::new(&[2, 0], None).is_err());
        assert!(Potential::new(&[2, 3], Some(&[1.0; 5])).is_err());
        let p = Potential::new(&[2, 3], None).unwrap();
        assert_eq!(p.size(), 6);
        assert!(p.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn get_set_roundtrip() {
        let mut p = Potential::new(&[2, 3, 4], None).unwrap();
        p.set(&[1, 2, 3], 0.25);
        assert_eq!(p.get(&[1, 2, 3]), 0.25);
    }

    #[test]
    fn inverse_mapping_is_a_bijection() {
        let p = Potential::new(&[3, 2, 4], None).unwrap();
        let mut indices = vec![0usize; 3];
        for flat in 0..p.size() {
            p.inverse_mapping(flat, &mut indices);
            assert_eq!(p.flat_index(&indices), flat);
        }
    }

    #[test]
    fn first_dimension_is_least_significant() {
        let p = ab();
        // flat layout: (0,0) (1,0) (0,1) (1,1)
        assert_eq!(p.get(&[1, 0]), 0.2);
        assert_eq!(p.get(&[0, 1]), 0.3);
    }

    #[test]
    fn marginalize_preserves_mass() {
        let p = ab();
        let mut onto_b = Potential::new(&[2], None).unwrap();
        p.marginalize_into(&mut onto_b, &[1]).unwrap();
        assert!((onto_b.get(&[0]) - 0.3).abs() < EPS);
        assert!((onto_b.get(&[1]) - 0.7).abs() < EPS);
        assert!((onto_b.total_mass() - p.total_mass()).abs() < EPS);

        let mut scalar = Potential::scalar(0.0);
        p.marginalize_into(&mut scalar, &[]).unwrap();
        assert!((scalar.data()[0] - 1.0).abs() < EPS);
    }

    #[test]
    fn marginalize_rejects_bad_mapping() {
        let p = ab();
        let mut dest = Potential::new(&[2, 2], None).unwrap();
        assert!(p.marginalize_into(&mut dest, &[1, 0]).is_err());
        let mut too_big = Potential::new(&[2, 2, 2], None).unwrap();
        assert!(p.marginalize_into(&mut too_big, &[0, 1, 2]).is_err());
    }

    #[test]
    fn total_marginalize_sums_out_other_dimensions() {
        let p = ab();
        let mut result = [0.0; 2];
        p.total_marginalize_into(&mut result, 1).unwrap();
        assert!((result[0] - 0.3).abs() < EPS);
        assert!((result[1] - 0.7).abs() < EPS);

        p.total_marginalize_into(&mut result, 0).unwrap();
        assert!((result[0] - 0.4).abs() < EPS);
        assert!((result[1] - 0.6).abs() < EPS);
    }

    #[test]
    fn update_divides_with_zero_convention() {
        let mut target = Potential::new(&[2, 2], Some(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let num = Potential::new(&[2], Some(&[2.0, 0.0])).unwrap();
        let den = Potential::new(&[2], Some(&[4.0, 0.0])).unwrap();

        Potential::update(Some(&num), Some(&den), &mut target, &[0]).unwrap();

        // states where A == 1 hit 0/0 and become 0
        assert_eq!(target.data(), &[0.5, 0.0, 1.5, 0.0]);
    }

    #[test]
    fn update_broadcasts_scalars() {
        let mut target = Potential::new(&[2], Some(&[1.0, 2.0])).unwrap();
        let num = Potential::scalar(3.0);
        Potential::update(Some(&num), None, &mut target, &[]).unwrap();
        assert_eq!(target.data(), &[3.0, 6.0]);

        let zero = Potential::scalar(0.0);
        Potential::update(None, Some(&zero), &mut target, &[]).unwrap();
        assert_eq!(target.data(), &[0.0, 0.0]);
    }

    #[test]
    fn update_requires_a_source() {
        let mut target = Potential::new(&[2], None).unwrap();
        assert!(Potential::update(None, None, &mut target, &[]).is_err());
    }

    #[test]
    fn update_evidence_scales_one_dimension() {
        let mut target = Potential::new(&[2, 2], Some(&[0.25; 4])).unwrap();
        Potential::update_evidence(&[1.0, 0.0], None, &mut target, 1).unwrap();
        assert_eq!(target.data(), &[0.25, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn init_with_maps_cpt_into_larger_table() {
        // clique over (A, B); fold P(B|A) given as (B, A)
        let mut clique = Potential::new(&[2, 2], None).unwrap();
        let cpt = Potential::new(&[2, 2], Some(&[0.9, 0.1, 0.2, 0.8])).unwrap();
        // cpt dim 0 (B) -> clique dim 1, cpt dim 1 (A) -> clique dim 0
        clique.init_with(&cpt, Some(&[1, 0])).unwrap();

        assert!((clique.get(&[0, 0]) - 0.9).abs() < EPS); // P(B=0|A=0)
        assert!((clique.get(&[0, 1]) - 0.1).abs() < EPS); // P(B=1|A=0)
        assert!((clique.get(&[1, 0]) - 0.2).abs() < EPS); // P(B=0|A=1)
        assert!((clique.get(&[1, 1]) - 0.8).abs() < EPS); // P(B=1|A=1)
    }

    #[test]
    fn reorder_preserves_values() {
        let p = ab();
        let swapped = p.reorder(&[1, 0]).unwrap();
        for a in 0..2 {
            for b in 0..2 {
                assert_eq!(swapped.get(&[b, a]), p.get(&[a, b]));
            }
        }
        assert!(p.reorder(&[0, 0]).is_err());
    }

    #[test]
    fn normalize_cpd_normalizes_each_conditional_slice() {
        let mut cpt = Potential::new(&[2, 2], Some(&[3.0, 1.0, 1.0, 1.0])).unwrap();
        cpt.normalize_cpd().unwrap();
        assert!((cpt.get(&[0, 0]) - 0.75).abs() < EPS);
        assert!((cpt.get(&[1, 0]) - 0.25).abs() < EPS);
        assert!((cpt.get(&[0, 1]) - 0.5).abs() < EPS);
        assert!((cpt.get(&[1, 1]) - 0.5).abs() < EPS);
    }

    #[test]
    fn normalize_dimension_divides_by_its_marginal() {
        let mut p = ab();
        p.normalize_dimension(0).unwrap();
        // every (b) slice over A now sums to 1
        for b in 0..2 {
            let total: f64 = (0..2).map(|a| p.get(&[a, b])).sum();
            assert!((total - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn copy_from_restores_reference() {
        let reference = ab();
        let mut p = reference.clone();
        p.fill(0.0);
        p.copy_from(&reference).unwrap();
        assert_eq!(p, reference);

        let mut wrong = Potential::new(&[4], None).unwrap();
        assert!(wrong.copy_from(&reference).is_err());
    }

    #[test]
    fn add_assign_accumulates() {
        let mut acc = Potential::new(&[2], Some(&[1.0, 2.0])).unwrap();
        let inc = Potential::new(&[2], Some(&[0.5, 0.5])).unwrap();
        acc.add_assign_from(&inc).unwrap();
        assert_eq!(acc.data(), &[1.5, 2.5]);
    }
}
