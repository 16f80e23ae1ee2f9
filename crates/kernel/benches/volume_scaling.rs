//! Boundary volume and resort throughput at increasing sample counts.
//!
//! Run with: cargo bench -p boundary_kernel --bench volume_scaling

use std::sync::Arc;
use std::time::Instant;

use boundary_kernel::{
    BoundaryModel, CubicSpline, NeighborGrid, RigidBodyObject, SimpleRigidBody,
};

/// Sample the six faces of a unit cube at the given spacing.
fn cube_surface(spacing: f32) -> Vec<[f32; 3]> {
    let n = (1.0 / spacing).round() as usize;
    let mut samples = Vec::new();
    for i in 0..=n {
        for j in 0..=n {
            let (u, v) = (i as f32 * spacing, j as f32 * spacing);
            samples.push([u, v, 0.0]);
            samples.push([u, v, 1.0]);
            if j > 0 && j < n {
                samples.push([u, 0.0, v]);
                samples.push([u, 1.0, v]);
            }
            if i > 0 && i < n && j > 0 && j < n {
                samples.push([0.0, u, v]);
                samples.push([1.0, u, v]);
            }
        }
    }
    samples
}

fn main() {
    println!("=== Boundary Volume Scaling ===\n");

    // (sample spacing, repetitions)
    let configs = [(0.05, 20), (0.025, 10), (0.0125, 5), (0.00625, 2)];

    println!(
        "{:>10} {:>8} {:>12} {:>12} {:>12}",
        "Particles", "Reps", "volume ms", "resort ms", "Mpart/s"
    );

    for &(spacing, reps) in &configs {
        let support = 2.0 * spacing;
        let samples = cube_surface(spacing);
        let kernel = CubicSpline::new(support);
        let mut search = NeighborGrid::new(support, [-0.1; 3], [1.1; 3]);
        let body: Arc<dyn RigidBodyObject> = Arc::new(SimpleRigidBody::fixed());
        let mut model = BoundaryModel::new();
        model
            .init_model(&body, &samples, &mut search)
            .expect("init failed");
        model
            .update_neighborhood_search(&mut search)
            .expect("search update failed");
        let set = model.point_set_id().expect("point set");

        // Warmup
        model
            .compute_boundary_volume(&kernel, &search, &[])
            .expect("volume failed");

        let start = Instant::now();
        for _ in 0..reps {
            model
                .compute_boundary_volume(&kernel, &search, &[])
                .expect("volume failed");
        }
        let volume_ms = start.elapsed().as_secs_f64() * 1000.0 / reps as f64;

        let start = Instant::now();
        for _ in 0..reps {
            search.z_sort(set);
            model
                .perform_neighborhood_search_sort(&search)
                .expect("resort failed");
            model
                .update_neighborhood_search(&mut search)
                .expect("search update failed");
        }
        let resort_ms = start.elapsed().as_secs_f64() * 1000.0 / reps as f64;

        let n = model.number_of_particles();
        let mps = n as f64 / (volume_ms / 1000.0) / 1.0e6;
        println!(
            "{:>10} {:>8} {:>12.3} {:>12.3} {:>12.2}",
            n, reps, volume_ms, resort_ms, mps
        );
    }
}
