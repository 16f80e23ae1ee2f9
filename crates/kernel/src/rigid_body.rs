//! Rigid body seam.
//!
//! The boundary model only reads the pose and velocities of the body it was
//! sampled from. Bodies are owned by the caller (usually behind an `Arc`);
//! the model keeps a `Weak` back-reference for lookup.

use std::sync::RwLock;

use crate::math::{Mat3, IDENTITY};
use crate::Vec3;

/// Read-only view of a rigid body as seen by its boundary model.
pub trait RigidBodyObject: Send + Sync {
    /// Whether the body is integrated by the rigid-body solver.
    fn is_dynamic(&self) -> bool;

    /// Whether the body follows a scripted trajectory.
    fn is_animated(&self) -> bool {
        false
    }

    /// World-space position of the body frame origin.
    fn position(&self) -> Vec3;

    /// Rotation from body frame to world frame (row-major).
    fn rotation(&self) -> Mat3;

    /// Linear velocity of the body frame origin (m/s).
    fn velocity(&self) -> Vec3;

    /// Angular velocity (rad/s).
    fn angular_velocity(&self) -> Vec3;
}

/// Pose and velocity snapshot of a [`SimpleRigidBody`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    /// Frame origin.
    pub position: Vec3,
    /// Body-to-world rotation.
    pub rotation: Mat3,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
}

impl Default for RigidPose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: IDENTITY,
            velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
        }
    }
}

/// Minimal rigid body: a pose behind a lock, updated by whoever drives it.
#[derive(Debug, Default)]
pub struct SimpleRigidBody {
    dynamic: bool,
    animated: bool,
    pose: RwLock<RigidPose>,
}

impl SimpleRigidBody {
    /// Body that never moves.
    pub fn fixed() -> Self {
        Self::default()
    }

    /// Body integrated by an external solver.
    pub fn dynamic(pose: RigidPose) -> Self {
        Self {
            dynamic: true,
            animated: false,
            pose: RwLock::new(pose),
        }
    }

    /// Body following a scripted trajectory.
    pub fn animated(pose: RigidPose) -> Self {
        Self {
            dynamic: false,
            animated: true,
            pose: RwLock::new(pose),
        }
    }

    /// Current pose snapshot.
    pub fn pose(&self) -> RigidPose {
        match self.pose.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replace the pose.
    pub fn set_pose(&self, pose: RigidPose) {
        match self.pose.write() {
            Ok(mut guard) => *guard = pose,
            Err(poisoned) => *poisoned.into_inner() = pose,
        }
    }
}

impl RigidBodyObject for SimpleRigidBody {
    fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn is_animated(&self) -> bool {
        self.animated
    }

    fn position(&self) -> Vec3 {
        self.pose().position
    }

    fn rotation(&self) -> Mat3 {
        self.pose().rotation
    }

    fn velocity(&self) -> Vec3 {
        self.pose().velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.pose().angular_velocity
    }
}
