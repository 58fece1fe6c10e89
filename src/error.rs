//! Error types for overlaycache
//!
//! Provides a unified error type for all cache operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for overlaycache operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be deleted during a purge
    #[error("failed to delete cache db {path:?}: {source}")]
    Purge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Database Errors
    // -------------------------------------------------------------------------
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The file failed to open and could not be removed for a fresh start
    #[error("cannot recover corrupted cache db {path:?}: {reason}")]
    CorruptedCache { path: PathBuf, reason: String },

    #[error("cache is not open")]
    NotOpen,

    #[error("invalid table identifier: {0:?}")]
    InvalidIdentifier(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Record decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("attempted to add an exit hook for the cache db while one was already present")]
    HookAlreadyRegistered,

    #[error("cache worker has stopped")]
    WorkerStopped,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
