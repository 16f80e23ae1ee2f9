//! Orchestration Layer
//!
//! This crate prepares boundary models for a scene:
//! - JSON scene configuration and validation
//! - Surface sampling of box-shaped rigid bodies
//! - Boundary model initialization, volume precomputation and resort
//! - Writing and reading the prepared state of a whole scene

#![warn(missing_docs)]

pub mod config;
pub mod sampling;

pub use config::SceneConfig;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use boundary_kernel::{
    kernel_for, length_prefix, BinaryReader, BinaryWriter, BoundaryError, BoundaryModel,
    NeighborGrid, PointSetId, RigidBodyObject, RigidPose, SimpleRigidBody, SmoothingKernel,
    StreamReader, StreamWriter, Vec3, VolumeSummary,
};
use thiserror::Error;

/// Errors raised while preparing or persisting a scene
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Configuration could not be read or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Boundary model operation failed
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    /// State file could not be opened or created
    #[error("cannot access state file {path}: {source}")]
    StateFile {
        /// Path of the state file
        path: String,
        /// Underlying failure
        source: std::io::Error,
    },

    /// State file holds a different number of models than the scene
    #[error("state file holds {found} boundary models, scene has {expected}")]
    ModelCount {
        /// Models in the scene
        expected: usize,
        /// Models in the file
        found: usize,
    },
}

/// Boundary models of a scene together with the objects they depend on.
///
/// `bodies[i]` owns the rigid body that `models[i]` was sampled from; the
/// models only keep weak references, so the bodies must outlive them.
pub struct PreparedScene {
    /// Scene configuration the models were built from
    pub config: SceneConfig,
    /// Rigid bodies, one per configured body
    pub bodies: Vec<Arc<SimpleRigidBody>>,
    /// Boundary models, same order as `bodies`
    pub models: Vec<BoundaryModel>,
    /// Neighbor search holding one point set per model
    pub search: NeighborGrid,
    /// Kernel used for volume estimation
    pub kernel: Box<dyn SmoothingKernel>,
}

impl PreparedScene {
    /// Total number of boundary particles over all models
    pub fn number_of_particles(&self) -> usize {
        self.models.iter().map(BoundaryModel::number_of_particles).sum()
    }

    /// Replay rigid body poses, then recompute volumes and apply any new sort
    /// order the search has published.
    ///
    /// Positions are pushed into the search again after a resort so its
    /// index matches the reordered arrays.
    pub fn refresh(&mut self) -> Result<(), OrchestratorError> {
        for model in &mut self.models {
            model.update_from_rigid_body()?;
            model.update_neighborhood_search(&mut self.search)?;
        }
        compute_scene_volumes(&mut self.models, self.kernel.as_ref(), &self.search)?;
        for model in &mut self.models {
            if model.perform_neighborhood_search_sort(&self.search)? {
                model.update_neighborhood_search(&mut self.search)?;
            }
        }
        Ok(())
    }
}

/// Compute the volumes of every model, each summing over the particles of
/// all boundary point sets so that touching bodies share contact volume.
///
/// The search must hold the current positions of every model.
pub fn compute_scene_volumes<K>(
    models: &mut [BoundaryModel],
    kernel: &K,
    search: &NeighborGrid,
) -> Result<Vec<VolumeSummary>, BoundaryError>
where
    K: SmoothingKernel + ?Sized,
{
    let mut summaries = Vec::with_capacity(models.len());
    for i in 0..models.len() {
        let (before, rest) = models.split_at_mut(i);
        let Some((model, after)) = rest.split_first_mut() else {
            break;
        };
        let others: Vec<(PointSetId, &[Vec3])> = before
            .iter()
            .chain(after.iter())
            .filter_map(|m| m.point_set_id().map(|set| (set, m.positions())))
            .collect();
        summaries.push(model.compute_boundary_volume(kernel, search, &others)?);
    }
    Ok(summaries)
}

/// Build boundary models for every rigid body of a validated configuration.
///
/// This function performs the full preparation pipeline:
/// 1. Build the neighbor grid over the domain with the kernel support radius
/// 2. Sample each body surface at one particle diameter
/// 3. Initialize one boundary model per body
/// 4. Compute boundary volumes
/// 5. Sort every point set into cell order and resort the models
pub fn prepare_scene(config: &SceneConfig) -> Result<PreparedScene, OrchestratorError> {
    config.validate().map_err(OrchestratorError::Config)?;

    let support = config.support_radius();
    let spacing = config.sampling_spacing();
    let mut search = NeighborGrid::new(support, config.domain.min, config.domain.max);
    let kernel = kernel_for(config.kernel, support);

    let mut bodies = Vec::with_capacity(config.rigid_bodies.len());
    let mut models = Vec::with_capacity(config.rigid_bodies.len());

    for body_config in &config.rigid_bodies {
        // Body frame coincides with the world frame, so samples are rest positions.
        let body = Arc::new(if body_config.dynamic {
            SimpleRigidBody::dynamic(RigidPose::default())
        } else {
            SimpleRigidBody::fixed()
        });
        let samples = sampling::sample_box_surface(body_config.min, body_config.max, spacing);

        let mut model = BoundaryModel::new();
        model.set_reference_density(config.reference_density);
        if config.strong_coupling {
            model.enable_strong_coupling();
        }
        let as_object: Arc<dyn RigidBodyObject> = body.clone();
        model.init_model(&as_object, &samples, &mut search)?;
        model.update_neighborhood_search(&mut search)?;

        tracing::info!(
            "Rigid body '{}': {} boundary particles",
            body_config.name,
            model.number_of_particles()
        );
        bodies.push(body);
        models.push(model);
    }

    let summaries = compute_scene_volumes(&mut models, kernel.as_ref(), &search)?;
    for (summary, body_config) in summaries.iter().zip(&config.rigid_bodies) {
        if summary.clamped > 0 {
            tracing::warn!(
                "Rigid body '{}': {} isolated boundary particles have zero volume",
                body_config.name,
                summary.clamped
            );
        }
    }
    for model in &mut models {
        if let Some(set) = model.point_set_id() {
            search.z_sort(set);
            model.perform_neighborhood_search_sort(&search)?;
            model.update_neighborhood_search(&mut search)?;
        }
    }

    let scene = PreparedScene {
        config: config.clone(),
        bodies,
        models,
        search,
        kernel,
    };
    tracing::info!(
        "Scene '{}' prepared: {} models, {} boundary particles",
        config.name,
        scene.models.len(),
        scene.number_of_particles()
    );
    Ok(scene)
}

/// Load a configuration file and prepare its scene.
///
/// Writes the prepared state to `output_state` when the configuration sets
/// one; relative paths are resolved against the configuration file directory.
pub fn prepare_scene_from_file(config_path: &str) -> Result<PreparedScene, OrchestratorError> {
    tracing::info!("Preparing scene from config: {}", config_path);

    let config = SceneConfig::load(config_path).map_err(OrchestratorError::Config)?;
    tracing::info!("Configuration loaded: {}", config.name);

    let scene = prepare_scene(&config)?;

    if let Some(output) = &config.output_state {
        let config_dir = Path::new(config_path)
            .parent()
            .unwrap_or_else(|| Path::new("."));
        save_scene_state(&scene, config_dir.join(output))?;
    }
    Ok(scene)
}

/// Write the state of every model of `scene`, in order, to one file.
///
/// The file starts with the model count (u32) followed by each model's
/// state as written by [`BoundaryModel::save_state`].
pub fn save_scene_state(
    scene: &PreparedScene,
    path: impl AsRef<Path>,
) -> Result<(), OrchestratorError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| OrchestratorError::StateFile {
        path: path.display().to_string(),
        source,
    })?;

    let mut writer = StreamWriter::new(BufWriter::new(file));
    writer.write_u32(length_prefix(scene.models.len(), "model count")?)?;
    for model in &scene.models {
        model.save_state(&mut writer)?;
    }
    writer.into_inner()?;

    tracing::info!(
        "Scene state written to {}: {} models",
        path.display(),
        scene.models.len()
    );
    Ok(())
}

/// Restore model state written by [`save_scene_state`].
///
/// The scene must have been prepared from the same configuration. Each model
/// load is atomic; if a later model fails, earlier ones keep the loaded state.
pub fn load_scene_state(
    scene: &mut PreparedScene,
    path: impl AsRef<Path>,
) -> Result<(), OrchestratorError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| OrchestratorError::StateFile {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = StreamReader::new(BufReader::new(file));
    let found = reader.read_u32()? as usize;
    if found != scene.models.len() {
        return Err(OrchestratorError::ModelCount {
            expected: scene.models.len(),
            found,
        });
    }
    for model in &mut scene.models {
        model.load_state(&mut reader)?;
    }
    for model in &scene.models {
        model.update_neighborhood_search(&mut scene.search)?;
    }

    tracing::info!("Scene state loaded from {}", path.display());
    Ok(())
}
