//! Configuration for overlaycache
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CacheError, Result};
use crate::schema::OverlayKind;

/// Main configuration for a cache store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the SQLite cache file
    pub cache_path: PathBuf,

    /// Milliseconds SQLite waits on a locked database before failing
    pub busy_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Schema Configuration
    // -------------------------------------------------------------------------
    /// Overlay whose table is created on every open, so the store is never
    /// without a table
    pub default_overlay: OverlayKind,

    // -------------------------------------------------------------------------
    // Record Configuration
    // -------------------------------------------------------------------------
    /// Gzip level for record blobs (0 = store, 9 = best)
    pub compression_level: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("./cache.db"),
            busy_timeout_ms: 5000,
            default_overlay: OverlayKind::entity_amount(),
            compression_level: 6,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the cache file path
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = path.into();
        self
    }

    /// Set the SQLite busy timeout (in milliseconds)
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Set the overlay created on every open
    pub fn default_overlay(mut self, overlay: OverlayKind) -> Self {
        self.config.default_overlay = overlay;
        self
    }

    /// Set the gzip compression level
    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    pub fn build(self) -> Result<Config> {
        if self.config.compression_level > 9 {
            return Err(CacheError::Config(format!(
                "compression level must be 0-9, got {}",
                self.config.compression_level
            )));
        }
        self.config.default_overlay.validate()?;
        Ok(self.config)
    }
}
