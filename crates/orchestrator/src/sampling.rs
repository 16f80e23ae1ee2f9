//! Surface sampling of rigid bodies into boundary particles

use boundary_kernel::Vec3;

/// Sample the six faces of the box `[min, max]`.
///
/// Each axis is split into `ceil(extent / spacing)` equal steps, so corners
/// and edges are always sampled and the actual spacing never exceeds the
/// requested one. Every lattice point on the surface appears exactly once.
pub fn sample_box_surface(min: Vec3, max: Vec3, spacing: f32) -> Vec<Vec3> {
    let mut counts = [0usize; 3];
    let mut steps = [0.0f32; 3];
    for axis in 0..3 {
        let extent = max[axis] - min[axis];
        counts[axis] = ((extent / spacing).ceil() as usize).max(1);
        steps[axis] = extent / counts[axis] as f32;
    }
    let [nx, ny, nz] = counts;
    let point = |i: usize, j: usize, k: usize| -> Vec3 {
        [
            min[0] + i as f32 * steps[0],
            min[1] + j as f32 * steps[1],
            min[2] + k as f32 * steps[2],
        ]
    };

    let mut samples = Vec::with_capacity(2 * ((nx + 1) * (ny + 1) + (nx + 1) * nz + ny * nz));
    for k in 0..=nz {
        // Bottom and top layers are full, the layers between only their ring
        let cap = k == 0 || k == nz;
        for j in 0..=ny {
            let side = j == 0 || j == ny;
            if cap || side {
                for i in 0..=nx {
                    samples.push(point(i, j, k));
                }
            } else {
                samples.push(point(0, j, k));
                samples.push(point(nx, j, k));
            }
        }
    }
    samples
}
