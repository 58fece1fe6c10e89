//! # overlaycache
//!
//! A persistent cache for per-region overlay rasters with:
//! - One SQLite file holding a table per overlay (or per sub-variant)
//! - Gzip-compressed, fixed-size 1024-value records
//! - Automatic replacement of corrupted cache files
//! - Region-wide invalidation across every overlay ever cached
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CacheWorker (optional)                       │
//! │            (serializes calls from many threads)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     CacheStore                               │
//! │     (open / recover / close / clear, exit hook, CRUD)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────┐
//!          │            │                 │
//!          ▼            ▼                 ▼
//!   ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//!   │   Schema    │ │  CacheKey   │ │ RecordCodec │
//!   │  (tables)   │ │  (x,z→i64)  │ │   (gzip)    │
//!   └─────────────┘ └─────────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod schema;
pub mod store;
pub mod worker;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::Config;
pub use codec::{CacheKey, Record, RecordCodec, RegionCoord, RECORD_LEN};
pub use schema::{OverlayDescriptor, OverlayKind};
pub use store::exit_hook::run_exit_hooks;
pub use store::CacheStore;
pub use worker::CacheWorker;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of overlaycache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
