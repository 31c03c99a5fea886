//! Error types for Tether.
//!
//! Observation itself never fails: guard conditions resolve by returning
//! early. Errors only surface at the edges where data enters or leaves the
//! dynamic value model.

use thiserror::Error;

use crate::value::NodeId;

/// Errors produced while converting data into or out of [`crate::Value`].
#[derive(Error, Debug)]
pub enum Error {
    /// The input was not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A node contains itself and cannot be converted to a tree.
    #[error("Cyclic structure at node {0}")]
    Cycle(NodeId),

    /// A value had a different shape than the caller asked for.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
