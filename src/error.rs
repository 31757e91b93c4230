//! Error types for the reconciliation engine.
//!
//! `SyncError` covers everything that can go wrong while reconciling a single
//! agent declaration; `StoreError` is the persistence adapters' own failure
//! surface and folds into `SyncError` at the reconciler boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reconciling one agent declaration.
///
/// Each value aborts only the declaration being processed; the orchestrator
/// records it against the agent id and moves on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Declaration failed structural validation. No I/O has been attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A relative path resolved outside the configuration base directory.
    #[error("path escapes the configuration directory: {0}")]
    PathTraversal(PathBuf),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("instructions must not be empty")]
    InstructionsEmpty,

    #[error("instructions exceed {limit} characters (got {actual})")]
    InstructionsTooLong { limit: usize, actual: usize },

    /// A resolved action spec is not a usable OpenAPI document.
    #[error("invalid API description: {0}")]
    InvalidApiSpec(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("avatar processing failed: {0}")]
    Avatar(String),
}

/// Errors raised by the persistence adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("backend failure: {0}")]
    Backend(String),
}
