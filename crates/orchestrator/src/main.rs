//! `boundary-prep`: sample rigid bodies of a scene, precompute boundary
//! volumes and optionally write the prepared state.
//!
//! Usage: boundary-prep <config.json>

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boundary_orchestrator=info,boundary_kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("Usage: boundary-prep <config.json>");
        return ExitCode::from(2);
    };

    match boundary_orchestrator::prepare_scene_from_file(&config_path) {
        Ok(scene) => {
            for (body, model) in scene.config.rigid_bodies.iter().zip(&scene.models) {
                let volumes = model.volumes();
                let total: f32 = volumes.iter().sum();
                tracing::info!(
                    "{}: {} particles, total boundary volume {:.4e}",
                    body.name,
                    model.number_of_particles(),
                    total
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Scene preparation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
