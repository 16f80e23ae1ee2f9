//! Boundary volume estimation (Akinci et al. 2012).
//!
//! Each boundary particle gets an artificial volume from the local number
//! density of the surface sampling:
//!
//! ```text
//! V_i = rho_ref / sum_j W(x_i - x_j)
//! ```
//!
//! where `j` runs over all boundary particles within kernel support, `i`
//! included: those of the model itself and those of any other boundary
//! point set passed in, so bodies in contact share the volume at the
//! contact. Used as a weight in the fluid's density and pressure sums, this
//! makes the sampled surface behave like an SPH particle layer at the
//! fluid's rest state regardless of sampling density.

use rayon::prelude::*;

use crate::boundary::BoundaryModel;
use crate::error::{BoundaryError, BoundaryResult};
use crate::math::sub;
use crate::neighbor::{NeighborhoodSearch, PointSetId};
use crate::sph::SmoothingKernel;
use crate::Vec3;

/// Kernel sums at or below this are treated as degenerate.
const MIN_KERNEL_SUM: f32 = 1.0e-12;

/// Outcome of one volume computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSummary {
    /// Particles whose volume was clamped to zero.
    pub clamped: usize,
    /// Smallest non-clamped volume (0 if every particle was clamped).
    pub min_volume: f32,
    /// Largest volume.
    pub max_volume: f32,
}

/// Volume for a kernel sum gathered over `neighbors` particles besides the
/// particle itself. Returns 0 for isolated particles and degenerate sums.
#[inline]
pub fn boundary_volume(reference_density: f32, kernel_sum: f32, neighbors: usize) -> f32 {
    if neighbors == 0 || !kernel_sum.is_finite() || kernel_sum <= MIN_KERNEL_SUM {
        return 0.0;
    }
    let volume = reference_density / kernel_sum;
    if volume.is_finite() {
        volume
    } else {
        0.0
    }
}

impl BoundaryModel {
    /// Recompute `volume(i)` for every particle.
    ///
    /// `search` must hold the current positions of this model's point set
    /// (see [`BoundaryModel::update_neighborhood_search`]) with a radius no
    /// smaller than the kernel support. `others` lists the remaining boundary
    /// point sets of the scene with the positions last pushed for them; their
    /// particles contribute to the kernel sum as well. Runs in parallel over
    /// particles.
    pub fn compute_boundary_volume<K, S>(
        &mut self,
        kernel: &K,
        search: &S,
        others: &[(PointSetId, &[Vec3])],
    ) -> BoundaryResult<VolumeSummary>
    where
        K: SmoothingKernel + ?Sized,
        S: NeighborhoodSearch + ?Sized,
    {
        let n = self.number_of_particles();
        if n == 0 {
            return Ok(VolumeSummary {
                clamped: 0,
                min_volume: 0.0,
                max_volume: 0.0,
            });
        }
        let set = self.point_set.ok_or(BoundaryError::Unregistered)?;
        if search.point_set_len(set) != n {
            tracing::warn!(
                "Point set {} holds {} points but the model has {}; update the search first",
                set.0,
                search.point_set_len(set),
                n
            );
        }
        for &(other, other_positions) in others {
            if other == set {
                tracing::warn!("Point set {} listed as its own neighbor set", set.0);
            } else if search.point_set_len(other) != other_positions.len() {
                tracing::warn!(
                    "Point set {} holds {} points but {} positions were passed",
                    other.0,
                    search.point_set_len(other),
                    other_positions.len()
                );
            }
        }
        if search.radius() < kernel.support_radius() {
            tracing::warn!(
                "Search radius {} is smaller than kernel support {}; volumes will be overestimated",
                search.radius(),
                kernel.support_radius()
            );
        }

        let density0 = self.reference_density;
        let positions = &self.x;
        self.volume
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, volume)| {
                let xi = positions[i];
                let mut kernel_sum = 0.0_f32;
                let mut neighbors = 0usize;
                search.for_each_neighbor(set, xi, positions, &mut |j| {
                    kernel_sum += kernel.w(sub(xi, positions[j]));
                    if j != i {
                        neighbors += 1;
                    }
                });
                for &(other, other_positions) in others {
                    search.for_each_neighbor(other, xi, other_positions, &mut |j| {
                        kernel_sum += kernel.w(sub(xi, other_positions[j]));
                        neighbors += 1;
                    });
                }
                *volume = boundary_volume(density0, kernel_sum, neighbors);
            });

        let mut summary = VolumeSummary {
            clamped: 0,
            min_volume: f32::MAX,
            max_volume: 0.0,
        };
        for &v in &self.volume {
            if v == 0.0 {
                summary.clamped += 1;
            } else {
                summary.min_volume = summary.min_volume.min(v);
                summary.max_volume = summary.max_volume.max(v);
            }
        }
        if summary.clamped == n {
            summary.min_volume = 0.0;
        }

        tracing::debug!(
            "Boundary volumes computed: {} particles, {} clamped, range [{:.3e}, {:.3e}]",
            n,
            summary.clamped,
            summary.min_volume,
            summary.max_volume
        );
        Ok(summary)
    }
}
