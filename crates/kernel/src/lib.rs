//! Akinci 2012 Boundary Particle Kernel
//!
//! This crate holds the boundary-particle side of rigid-fluid coupling for
//! SPH: the per-particle data of each sampled rigid body, the artificial
//! volume that lets those samples act as a pressure boundary, and the
//! bookkeeping that keeps every per-particle array consistent when the
//! neighbor search reorders particles.
//!
//! # Modules
//! - [`boundary`] -- `BoundaryModel`, the struct-of-arrays particle store and its lifecycle.
//! - [`fields`] -- Named, typed field descriptors for generic per-particle access.
//! - [`volume`] -- Boundary volume estimation `V_i = rho_ref / sum_j W_ij`.
//! - [`resort`] -- Applying neighbor-search permutations to all arrays in lockstep.
//! - [`persistence`] -- Binary save/load of model state.
//! - [`strong_coupling`] -- Optional state for the strongly coupled pressure solve.
//! - [`neighbor`] -- Neighbor search seam and a uniform-grid implementation.
//! - [`sph`] -- Smoothing kernels (Wendland C2, cubic spline).
//! - [`rigid_body`] -- Rigid body seam seen by the boundary model.

#![warn(missing_docs)]

pub mod boundary;
pub mod error;
pub mod fields;
#[allow(missing_docs)]
pub mod math;
pub mod neighbor;
pub mod persistence;
pub mod resort;
pub mod rigid_body;
pub mod sph;
pub mod strong_coupling;
pub mod volume;

/// Three reals: positions, velocities and other vector fields.
pub type Vec3 = [f32; 3];

pub use boundary::BoundaryModel;
pub use error::{BoundaryError, BoundaryResult};
pub use fields::{FieldDescription, FieldKind, FieldRegistry, FieldSlice, FieldValue};
pub use neighbor::{NeighborGrid, NeighborhoodSearch, PointSetId, SortOrder};
pub use persistence::{length_prefix, BinaryReader, BinaryWriter, StreamReader, StreamWriter};
pub use rigid_body::{RigidBodyObject, RigidPose, SimpleRigidBody};
pub use sph::{kernel_for, CubicSpline, KernelType, SmoothingKernel, WendlandC2};
pub use strong_coupling::StrongCoupling;
pub use volume::VolumeSummary;
