//! Error types for fundi.
//!
//! Only conditions that make a whole run meaningless are errors. Per-fold
//! problems (too few anchors, non-convergence) are reported as values on
//! [`FoldResult`](crate::algo::fundi::FoldResult) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`FundiError`].
pub type Result<T> = std::result::Result<T, FundiError>;

/// Errors that can occur while building mesh graphs or extracting fundi.
#[derive(Error, Debug)]
pub enum FundiError {
    /// The mesh has no vertices or no faces.
    #[error("mesh is empty ({vertices} vertices, {faces} faces)")]
    EmptyMesh {
        /// Number of vertices.
        vertices: usize,
        /// Number of faces.
        faces: usize,
    },

    /// A face references a vertex id outside `[0, n_vertices)`.
    #[error("face {face} references invalid vertex index {vertex} (mesh has {n_vertices} vertices)")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
        /// Number of vertices in the mesh.
        n_vertices: usize,
    },

    /// An explicit adjacency was not a valid neighbor list.
    #[error("invalid adjacency at vertex {vertex}: {reason}")]
    InvalidAdjacency {
        /// The offending vertex.
        vertex: usize,
        /// What is wrong with its row.
        reason: &'static str,
    },

    /// A per-vertex field does not have one value per vertex.
    #[error("scalar field '{name}' has {actual} values, expected {expected}")]
    FieldLength {
        /// Field name.
        name: String,
        /// Number of mesh vertices.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A required scalar field is missing from a surface file.
    #[error("surface has no scalar field named '{name}'")]
    MissingField {
        /// Field name.
        name: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a surface or scalar file.
    #[error("failed to load {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving a surface or scalar file.
    #[error("failed to save {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Error reading a configuration file.
    #[error("invalid configuration {path}: {message}")]
    Config {
        /// The configuration path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl FundiError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        FundiError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a field length error.
    pub fn field_length(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        FundiError::FieldLength {
            name: name.into(),
            expected,
            actual,
        }
    }
}
