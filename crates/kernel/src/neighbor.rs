//! Neighbor search seam and a uniform-grid implementation.
//!
//! Each boundary model registers one point set. The search indexes the
//! positions it is given per point set and can produce a cell-ordered
//! permutation for that set; each new permutation bumps the set's sort
//! epoch so consumers can tell a fresh order from one they already applied.
//!
//! Uses sorted-index + cell-offset arrays rather than `HashMap`, the same
//! layout as the fluid-side grid.

use crate::Vec3;

/// Opaque handle of a point set registered with a [`NeighborhoodSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointSetId(pub usize);

/// Permutation produced by the search for one point set.
///
/// `permutation[k]` is the old index of the particle that moves to slot `k`.
#[derive(Debug, Clone, Copy)]
pub struct SortOrder<'a> {
    /// Monotonic counter, incremented for every new permutation of the set.
    pub epoch: u64,
    /// Gather table, one entry per particle.
    pub permutation: &'a [u32],
}

/// Spatial query structure shared by all boundary models of a scene.
pub trait NeighborhoodSearch: Sync {
    /// Register a point set of `len` points and return its handle.
    fn add_point_set(&mut self, len: usize) -> PointSetId;

    /// Change the number of points of a set. Invalidates its index.
    fn resize_point_set(&mut self, set: PointSetId, len: usize);

    /// Rebuild the index of `set` from `positions`.
    fn update_point_set(&mut self, set: PointSetId, positions: &[Vec3]);

    /// Number of points registered for `set`.
    fn point_set_len(&self, set: PointSetId) -> usize;

    /// Search radius.
    fn radius(&self) -> f32;

    /// Call `f(j)` for every point `j` of `set` within [`radius`] of `point`.
    ///
    /// `positions` must be the array last passed to `update_point_set`.
    /// A point at distance zero (the query particle itself) is reported.
    ///
    /// [`radius`]: NeighborhoodSearch::radius
    fn for_each_neighbor(
        &self,
        set: PointSetId,
        point: Vec3,
        positions: &[Vec3],
        f: &mut dyn FnMut(usize),
    );

    /// Latest permutation of `set`, if one has been computed.
    fn sort_order(&self, set: PointSetId) -> Option<SortOrder<'_>>;
}

/// Per point-set grid index.
#[derive(Debug, Clone, Default)]
struct PointSetIndex {
    len: usize,
    /// Cell index for each particle.
    cell_indices: Vec<u32>,
    /// Particle indices sorted by cell index.
    sorted_indices: Vec<u32>,
    /// Start offset in `sorted_indices` for each cell.
    cell_offsets: Vec<u32>,
    /// Number of particles in each cell.
    cell_counts: Vec<u32>,
    /// Last published permutation.
    permutation: Vec<u32>,
    epoch: u64,
    /// Set by `update_point_set`, cleared when an order is published.
    indexed_since_sort: bool,
}

/// Uniform-grid neighbor search over a fixed axis-aligned domain.
///
/// Cell size equals the search radius, so the 27 (3x3x3) cells around a
/// query contain every candidate. Positions outside the domain are clamped
/// into the border cells and are still found.
#[derive(Debug, Clone)]
pub struct NeighborGrid {
    cell_size: f32,
    grid_min: Vec3,
    grid_dims: [u32; 3],
    sets: Vec<PointSetIndex>,
}

impl NeighborGrid {
    /// Create a grid covering `[domain_min, domain_max]` with the given
    /// search radius.
    pub fn new(radius: f32, domain_min: Vec3, domain_max: Vec3) -> Self {
        assert!(radius > 0.0, "radius must be positive");
        let dims = [
            ((domain_max[0] - domain_min[0]) / radius).ceil().max(1.0) as u32,
            ((domain_max[1] - domain_min[1]) / radius).ceil().max(1.0) as u32,
            ((domain_max[2] - domain_min[2]) / radius).ceil().max(1.0) as u32,
        ];
        Self {
            cell_size: radius,
            grid_min: domain_min,
            grid_dims: dims,
            sets: Vec::new(),
        }
    }

    /// Total number of cells in the grid.
    fn total_cells(&self) -> usize {
        (self.grid_dims[0] as usize)
            * (self.grid_dims[1] as usize)
            * (self.grid_dims[2] as usize)
    }

    /// Map a world-space position to a cell (cx, cy, cz), clamped to grid bounds.
    #[inline]
    fn pos_to_cell(&self, p: Vec3) -> [u32; 3] {
        let mut cell = [0u32; 3];
        for axis in 0..3 {
            cell[axis] = ((p[axis] - self.grid_min[axis]) / self.cell_size)
                .floor()
                .max(0.0)
                .min((self.grid_dims[axis] - 1) as f32) as u32;
        }
        cell
    }

    /// Flat cell index from (cx, cy, cz).
    #[inline]
    fn cell_hash(&self, c: [u32; 3]) -> u32 {
        c[0] + c[1] * self.grid_dims[0] + c[2] * self.grid_dims[0] * self.grid_dims[1]
    }

    /// Publish the current cell order of `set` as a new permutation and
    /// return its epoch.
    ///
    /// A permutation is relative to the positions last passed to
    /// `update_point_set`. Without an update since the previous call the
    /// published order is kept and its epoch returned unchanged.
    pub fn z_sort(&mut self, set: PointSetId) -> u64 {
        let index = &mut self.sets[set.0];
        if !index.indexed_since_sort {
            tracing::debug!(
                "Point set {} not re-indexed since last sort, keeping epoch {}",
                set.0,
                index.epoch
            );
            return index.epoch;
        }
        index.permutation.clear();
        index.permutation.extend_from_slice(&index.sorted_indices);
        index.epoch += 1;
        index.indexed_since_sort = false;
        tracing::debug!(
            "Point set {} sorted into cell order (epoch {}, {} points)",
            set.0,
            index.epoch,
            index.len
        );
        index.epoch
    }

    /// Current sort epoch of `set` (0 before the first [`NeighborGrid::z_sort`]).
    pub fn sort_epoch(&self, set: PointSetId) -> u64 {
        self.sets[set.0].epoch
    }
}

impl NeighborhoodSearch for NeighborGrid {
    fn add_point_set(&mut self, len: usize) -> PointSetId {
        self.sets.push(PointSetIndex {
            len,
            ..PointSetIndex::default()
        });
        PointSetId(self.sets.len() - 1)
    }

    fn resize_point_set(&mut self, set: PointSetId, len: usize) {
        let index = &mut self.sets[set.0];
        index.len = len;
        index.cell_indices.clear();
        index.sorted_indices.clear();
        index.cell_counts.clear();
        index.cell_offsets.clear();
        index.permutation.clear();
        index.indexed_since_sort = false;
    }

    fn update_point_set(&mut self, set: PointSetId, positions: &[Vec3]) {
        let total_cells = self.total_cells();
        let n = positions.len();
        let cells: Vec<u32> = positions
            .iter()
            .map(|&p| self.cell_hash(self.pos_to_cell(p)))
            .collect();

        let index = &mut self.sets[set.0];
        index.len = n;
        index.cell_indices = cells;

        // Count particles per cell
        index.cell_counts.clear();
        index.cell_counts.resize(total_cells, 0);
        for &ci in &index.cell_indices {
            index.cell_counts[ci as usize] += 1;
        }

        // Prefix-sum to get cell offsets
        index.cell_offsets.clear();
        index.cell_offsets.resize(total_cells, 0);
        let mut running = 0u32;
        for c in 0..total_cells {
            index.cell_offsets[c] = running;
            running += index.cell_counts[c];
        }

        // Scatter particle indices into sorted order
        index.sorted_indices.resize(n, 0);
        let mut write_heads = index.cell_offsets.clone();
        for i in 0..n {
            let ci = index.cell_indices[i] as usize;
            let pos = write_heads[ci] as usize;
            index.sorted_indices[pos] = i as u32;
            write_heads[ci] += 1;
        }
        index.indexed_since_sort = true;
    }

    fn point_set_len(&self, set: PointSetId) -> usize {
        self.sets[set.0].len
    }

    fn radius(&self) -> f32 {
        self.cell_size
    }

    fn for_each_neighbor(
        &self,
        set: PointSetId,
        point: Vec3,
        positions: &[Vec3],
        f: &mut dyn FnMut(usize),
    ) {
        let index = &self.sets[set.0];
        if index.cell_counts.is_empty() {
            return;
        }
        let [cx, cy, cz] = self.pos_to_cell(point);
        let radius_sq = self.cell_size * self.cell_size;

        // Iterate over 3x3x3 neighborhood
        for dz in -1i32..=1 {
            let nz = cz as i32 + dz;
            if nz < 0 || nz >= self.grid_dims[2] as i32 {
                continue;
            }
            for dy in -1i32..=1 {
                let ny = cy as i32 + dy;
                if ny < 0 || ny >= self.grid_dims[1] as i32 {
                    continue;
                }
                for dx in -1i32..=1 {
                    let nx = cx as i32 + dx;
                    if nx < 0 || nx >= self.grid_dims[0] as i32 {
                        continue;
                    }
                    let cell = self.cell_hash([nx as u32, ny as u32, nz as u32]) as usize;
                    let start = index.cell_offsets[cell] as usize;
                    let count = index.cell_counts[cell] as usize;

                    for &j in &index.sorted_indices[start..start + count] {
                        let j = j as usize;
                        let q = positions[j];
                        let ddx = point[0] - q[0];
                        let ddy = point[1] - q[1];
                        let ddz = point[2] - q[2];
                        if ddx * ddx + ddy * ddy + ddz * ddz <= radius_sq {
                            f(j);
                        }
                    }
                }
            }
        }
    }

    fn sort_order(&self, set: PointSetId) -> Option<SortOrder<'_>> {
        let index = &self.sets[set.0];
        if index.epoch == 0 || index.permutation.len() != index.len {
            return None;
        }
        Some(SortOrder {
            epoch: index.epoch,
            permutation: &index.permutation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbors_of(grid: &NeighborGrid, set: PointSetId, i: usize, pos: &[Vec3]) -> Vec<usize> {
        let mut out = Vec::new();
        grid.for_each_neighbor(set, pos[i], pos, &mut |j| out.push(j));
        out.sort_unstable();
        out
    }

    #[test]
    fn empty_grid() {
        let grid = NeighborGrid::new(0.1, [0.0; 3], [1.0; 3]);
        assert_eq!(grid.total_cells(), 10 * 10 * 10);
    }

    #[test]
    fn single_particle_finds_itself() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(1);
        let pos = [[0.5, 0.5, 0.5]];
        grid.update_point_set(set, &pos);
        assert_eq!(neighbors_of(&grid, set, 0, &pos), vec![0]);
    }

    #[test]
    fn two_close_particles() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(2);
        let pos = [[0.5, 0.5, 0.5], [0.51, 0.5, 0.5]];
        grid.update_point_set(set, &pos);
        assert_eq!(neighbors_of(&grid, set, 0, &pos), vec![0, 1]);
        assert_eq!(neighbors_of(&grid, set, 1, &pos), vec![0, 1]);
    }

    #[test]
    fn two_far_particles() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(2);
        let pos = [[0.1, 0.1, 0.1], [0.9, 0.9, 0.9]];
        grid.update_point_set(set, &pos);
        assert_eq!(neighbors_of(&grid, set, 0, &pos), vec![0]);
    }

    #[test]
    fn particles_across_cell_boundary() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(2);
        let pos = [[0.19, 0.5, 0.5], [0.21, 0.5, 0.5]];
        grid.update_point_set(set, &pos);
        assert_eq!(neighbors_of(&grid, set, 0, &pos), vec![0, 1]);
    }

    #[test]
    fn point_sets_are_independent() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let a = grid.add_point_set(1);
        let b = grid.add_point_set(1);
        let pos_a = [[0.5, 0.5, 0.5]];
        let pos_b = [[0.5, 0.5, 0.5]];
        grid.update_point_set(a, &pos_a);
        assert_eq!(neighbors_of(&grid, a, 0, &pos_a), vec![0]);
        // b has never been updated
        assert!(neighbors_of(&grid, b, 0, &pos_b).is_empty());
    }

    #[test]
    fn z_sort_publishes_cell_order_and_bumps_epoch() {
        let mut grid = NeighborGrid::new(0.25, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(3);
        // Reverse cell order along x
        let pos = [[0.9, 0.1, 0.1], [0.6, 0.1, 0.1], [0.1, 0.1, 0.1]];
        grid.update_point_set(set, &pos);
        assert!(grid.sort_order(set).is_none());

        assert_eq!(grid.z_sort(set), 1);
        let order = grid.sort_order(set).unwrap();
        assert_eq!(order.epoch, 1);
        assert_eq!(order.permutation, &[2, 1, 0]);

        grid.update_point_set(set, &[pos[2], pos[1], pos[0]]);
        assert_eq!(grid.z_sort(set), 2);
        assert_eq!(grid.sort_epoch(set), 2);
        assert_eq!(grid.sort_order(set).unwrap().permutation, &[0, 1, 2]);
    }

    #[test]
    fn z_sort_without_update_keeps_epoch() {
        let mut grid = NeighborGrid::new(0.25, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(2);
        assert_eq!(grid.z_sort(set), 0);
        assert!(grid.sort_order(set).is_none());

        grid.update_point_set(set, &[[0.9, 0.1, 0.1], [0.1, 0.1, 0.1]]);
        assert_eq!(grid.z_sort(set), 1);
        assert_eq!(grid.z_sort(set), 1);
        assert_eq!(grid.sort_order(set).unwrap().permutation, &[1, 0]);
    }

    #[test]
    fn resize_drops_stale_permutation() {
        let mut grid = NeighborGrid::new(0.25, [0.0; 3], [1.0; 3]);
        let set = grid.add_point_set(2);
        grid.update_point_set(set, &[[0.9, 0.1, 0.1], [0.1, 0.1, 0.1]]);
        grid.z_sort(set);
        grid.resize_point_set(set, 3);
        assert!(grid.sort_order(set).is_none());
        assert_eq!(grid.point_set_len(set), 3);
    }
}
