//! Schema Module
//!
//! Derives cache tables from overlay descriptors and tracks every table the
//! open store contains.
//!
//! ## Table Layout
//! ```text
//! <overlay>            one table for a single-valued overlay
//! <overlay>_<suffix>   one table per sub-variant otherwise
//!
//! ┌──────────────────────┬──────────────────────┐
//! │ p BIGINT PRIMARY KEY │ d BLOB               │
//! │ (CacheKey)           │ (gzip record)        │
//! └──────────────────────┴──────────────────────┘
//! ```

mod manager;
mod overlay;

pub use manager::{quote_identifier, table_name, SchemaManager};
pub use overlay::{validate_identifier, OverlayDescriptor, OverlayKind};
