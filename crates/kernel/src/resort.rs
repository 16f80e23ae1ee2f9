//! Applying neighborhood-search permutations to every per-particle array.
//!
//! The search reorders points for cache locality. Each new order carries an
//! epoch; the model remembers the last epoch it applied and ignores repeats,
//! since a permutation is relative to the search's internal ordering and
//! applying it twice silently scrambles the data.

use crate::boundary::BoundaryModel;
use crate::error::{BoundaryError, BoundaryResult};
use crate::fields::FieldData;
use crate::neighbor::NeighborhoodSearch;

/// `data'[k] = data[perm[k]]`.
pub(crate) fn gather<T: Copy>(data: &mut Vec<T>, perm: &[u32]) {
    debug_assert_eq!(data.len(), perm.len());
    let reordered: Vec<T> = perm.iter().map(|&p| data[p as usize]).collect();
    *data = reordered;
}

impl FieldData {
    pub(crate) fn permute(&mut self, perm: &[u32]) {
        match self {
            Self::Scalar(v) => gather(v, perm),
            Self::Vector3(v) => gather(v, perm),
            Self::UInt(v) => gather(v, perm),
        }
    }
}

/// Check that `perm` is a permutation of `[0, n)`.
///
/// Range is always checked; uniqueness only in debug builds.
fn validate_permutation(perm: &[u32], n: usize) -> BoundaryResult<()> {
    if perm.len() != n {
        return Err(BoundaryError::PermutationLength {
            permutation: perm.len(),
            particles: n,
        });
    }
    if let Some((position, &entry)) = perm.iter().enumerate().find(|(_, &p)| p as usize >= n) {
        return Err(BoundaryError::InvalidPermutation { position, entry });
    }
    #[cfg(debug_assertions)]
    {
        let mut seen = vec![false; n];
        for (position, &entry) in perm.iter().enumerate() {
            if std::mem::replace(&mut seen[entry as usize], true) {
                return Err(BoundaryError::InvalidPermutation { position, entry });
            }
        }
    }
    Ok(())
}

impl BoundaryModel {
    /// Apply the search's pending permutation for this model's point set.
    ///
    /// Returns `Ok(true)` if arrays were reordered, `Ok(false)` when there is
    /// nothing new to apply: no order published, its epoch already applied,
    /// or an order sized for a particle count the model no longer has. On
    /// error no array is modified.
    pub fn perform_neighborhood_search_sort<S>(&mut self, search: &S) -> BoundaryResult<bool>
    where
        S: NeighborhoodSearch + ?Sized,
    {
        let Some(set) = self.point_set else {
            return Ok(false);
        };
        let Some(order) = search.sort_order(set) else {
            return Ok(false);
        };
        if self.applied_epoch == Some(order.epoch) {
            return Ok(false);
        }
        if order.permutation.len() != self.number_of_particles() {
            tracing::debug!(
                "Ignoring stale order for point set {}: {} entries, {} particles",
                set.0,
                order.permutation.len(),
                self.number_of_particles()
            );
            return Ok(false);
        }
        self.apply_permutation(order.permutation)?;
        self.applied_epoch = Some(order.epoch);
        tracing::debug!(
            "Boundary point set {} resorted (epoch {})",
            set.0,
            order.epoch
        );
        Ok(true)
    }

    /// Reorder every owned array by `perm` (`arr'[k] = arr[perm[k]]`) and
    /// mark the model sorted.
    ///
    /// Covers rest and current positions, velocities, volumes, allocated
    /// strong-coupling arrays and every extension array.
    pub fn apply_permutation(&mut self, perm: &[u32]) -> BoundaryResult<()> {
        validate_permutation(perm, self.number_of_particles())?;

        gather(&mut self.x0, perm);
        gather(&mut self.x, perm);
        gather(&mut self.v, perm);
        gather(&mut self.volume, perm);
        if let Some(sc) = self.strong_coupling.as_mut() {
            sc.permute(perm);
        }
        for data in self.extensions.iter_mut().flatten() {
            data.permute(perm);
        }
        self.sorted = true;
        Ok(())
    }
}
