//! Error type shared by the boundary model, its field registry and persistence.

use thiserror::Error;

use crate::fields::FieldKind;

/// Result alias used throughout the crate.
pub type BoundaryResult<T> = Result<T, BoundaryError>;

/// Failures surfaced at the points where user data enters the model
/// (field registration, initialization, resort, load).
///
/// Hot per-particle accessors do not return this type; they only
/// `debug_assert!` their index precondition.
#[derive(Error, Debug)]
pub enum BoundaryError {
    /// A field with this name is already registered.
    #[error("field '{0}' is already registered")]
    DuplicateField(String),

    /// No field with this name is registered.
    #[error("field '{0}' not found")]
    FieldNotFound(String),

    /// Checked access past the end of the particle arrays.
    #[error("particle index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of particles in the model.
        len: usize,
    },

    /// The field exists but holds a different kind of data.
    #[error("field '{name}' holds {actual:?} data, expected {expected:?}")]
    FieldKindMismatch {
        /// Field name.
        name: String,
        /// Kind the caller asked for.
        expected: FieldKind,
        /// Kind actually stored.
        actual: FieldKind,
    },

    /// The permutation does not cover exactly the particles of the model.
    #[error("permutation has {permutation} entries but the model has {particles} particles")]
    PermutationLength {
        /// Entries in the permutation.
        permutation: usize,
        /// Particles in the model.
        particles: usize,
    },

    /// The permutation references an index outside `[0, N)`.
    #[error("permutation entry {entry} at position {position} is out of range")]
    InvalidPermutation {
        /// Position inside the permutation.
        position: usize,
        /// Offending value.
        entry: u32,
    },

    /// Persisted data does not match the layout of the receiving model.
    #[error("state format mismatch in {section}: expected {expected}, found {found}")]
    FormatMismatch {
        /// Which part of the stream was being read.
        section: &'static str,
        /// Value required by the receiving model.
        expected: u64,
        /// Value read from the stream.
        found: u64,
    },

    /// Input position is NaN or infinite.
    #[error("position {index} is not finite")]
    NonFinitePosition {
        /// Index of the offending sample.
        index: usize,
    },

    /// The model has particles but was never registered with a neighbor search.
    #[error("boundary model has no neighborhood search point set")]
    Unregistered,

    /// The rigid body behind the back-reference has been dropped.
    #[error("rigid body of boundary model is no longer alive")]
    DetachedRigidBody,

    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
