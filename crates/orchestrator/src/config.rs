//! Scene configuration parsing and validation for boundary preparation

use boundary_kernel::KernelType;
use serde::{Deserialize, Serialize};
use std::fs;

/// Main scene configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Human-readable scene name
    pub name: String,
    /// Fluid particle radius (meters). Boundary samples are spaced at twice this.
    pub particle_radius: f32,
    /// Smoothing kernel used for volume estimation
    #[serde(default = "default_kernel")]
    pub kernel: KernelType,
    /// Density turning kernel sums into volumes
    #[serde(default = "default_reference_density")]
    pub reference_density: f32,
    /// Allocate strong-coupling state on every model
    #[serde(default)]
    pub strong_coupling: bool,
    /// Neighbor search domain bounds
    pub domain: DomainBounds,
    /// Rigid bodies to sample
    pub rigid_bodies: Vec<RigidBodyConfig>,
    /// Where to write the prepared state, if anywhere
    #[serde(default)]
    pub output_state: Option<String>,
}

/// Domain bounding box
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainBounds {
    /// Minimum corner [x, y, z]
    pub min: [f32; 3],
    /// Maximum corner [x, y, z]
    pub max: [f32; 3],
}

/// Axis-aligned box body, sampled on its surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBodyConfig {
    /// Body name, used in log output
    pub name: String,
    /// Minimum corner [x, y, z]
    pub min: [f32; 3],
    /// Maximum corner [x, y, z]
    pub max: [f32; 3],
    /// Whether the body moves under the rigid-body solver
    #[serde(default)]
    pub dynamic: bool,
}

// Default values
fn default_kernel() -> KernelType {
    KernelType::CubicSpline
}

fn default_reference_density() -> f32 {
    1.0
}

const AXES: [&str; 3] = ["x", "y", "z"];

impl SceneConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, String> {
        let config: SceneConfig = serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse config JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Check domain bounds
        for (axis, name) in AXES.iter().enumerate() {
            if self.domain.min[axis] >= self.domain.max[axis] {
                return Err(format!("Domain min.{name} must be less than max.{name}"));
            }
        }

        // Check particle radius
        if self.particle_radius.is_nan() || self.particle_radius <= 0.0 {
            return Err("Particle radius must be positive".to_string());
        }

        // Check reference density
        if self.reference_density.is_nan() || self.reference_density <= 0.0 {
            return Err("Reference density must be positive".to_string());
        }

        if self.rigid_bodies.is_empty() {
            return Err("At least one rigid body is required".to_string());
        }

        for body in &self.rigid_bodies {
            for (axis, name) in AXES.iter().enumerate() {
                if body.min[axis] >= body.max[axis] {
                    return Err(format!(
                        "Rigid body '{}': min.{name} must be less than max.{name}",
                        body.name
                    ));
                }
                if body.min[axis] < self.domain.min[axis] || body.max[axis] > self.domain.max[axis]
                {
                    return Err(format!(
                        "Rigid body '{}' extends outside the domain along {name}",
                        body.name
                    ));
                }
            }
        }

        Ok(())
    }

    /// Kernel support radius, four particle radii
    pub fn support_radius(&self) -> f32 {
        4.0 * self.particle_radius
    }

    /// Spacing of boundary samples on body surfaces, one particle diameter
    pub fn sampling_spacing(&self) -> f32 {
        2.0 * self.particle_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneConfig {
        SceneConfig {
            name: "test".to_string(),
            particle_radius: 0.025,
            kernel: default_kernel(),
            reference_density: default_reference_density(),
            strong_coupling: false,
            domain: DomainBounds {
                min: [0.0, 0.0, 0.0],
                max: [1.0, 1.0, 1.0],
            },
            rigid_bodies: vec![RigidBodyConfig {
                name: "box".to_string(),
                min: [0.2, 0.2, 0.2],
                max: [0.4, 0.4, 0.4],
                dynamic: false,
            }],
            output_state: None,
        }
    }

    #[test]
    fn test_derived_lengths() {
        let config = scene();
        assert!((config.support_radius() - 0.1).abs() < 1e-6);
        assert!((config.sampling_spacing() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_defaults_from_json() {
        let config = SceneConfig::from_json(
            r#"{
                "name": "tank",
                "particle_radius": 0.01,
                "domain": { "min": [0, 0, 0], "max": [1, 1, 1] },
                "rigid_bodies": [ { "name": "floor", "min": [0, 0, 0], "max": [1, 0.1, 1] } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.kernel, KernelType::CubicSpline);
        assert_eq!(config.reference_density, 1.0);
        assert!(!config.strong_coupling);
        assert!(!config.rigid_bodies[0].dynamic);
        assert!(config.output_state.is_none());
    }

    #[test]
    fn test_kernel_selection_from_json() {
        let config = SceneConfig::from_json(
            r#"{
                "name": "tank",
                "particle_radius": 0.01,
                "kernel": "WendlandC2",
                "strong_coupling": true,
                "domain": { "min": [0, 0, 0], "max": [1, 1, 1] },
                "rigid_bodies": [ { "name": "ball", "min": [0.4, 0.4, 0.4], "max": [0.6, 0.6, 0.6], "dynamic": true } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.kernel, KernelType::WendlandC2);
        assert!(config.strong_coupling);
        assert!(config.rigid_bodies[0].dynamic);
    }

    #[test]
    fn test_malformed_json() {
        let err = SceneConfig::from_json("{ not json").unwrap_err();
        assert!(err.contains("parse"), "{err}");
    }

    #[test]
    fn test_validation_domain_bounds() {
        let mut config = scene();
        config.domain.min[1] = 2.0;
        assert!(config.validate().is_err());

        config.domain.min[1] = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_particle_radius() {
        let mut config = scene();
        config.particle_radius = 0.0;
        assert!(config.validate().is_err());
        config.particle_radius = f32::NAN;
        assert!(config.validate().is_err());

        config.particle_radius = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_bodies() {
        let mut config = scene();
        config.rigid_bodies[0].max[2] = 0.2;
        assert!(config.validate().unwrap_err().contains("'box'"));

        config.rigid_bodies[0].max[2] = 1.5;
        assert!(config.validate().unwrap_err().contains("outside"));

        config.rigid_bodies.clear();
        assert!(config.validate().is_err());
    }
}
