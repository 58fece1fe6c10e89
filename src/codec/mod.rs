//! Codec Module
//!
//! Maps region coordinates to row keys and overlay rasters to row blobs.
//!
//! ## Key Layout
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │ x: i32 (high 32, signed)     │ z: u32 (low 32, zero-ext)    │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Record Blob
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ gzip(                                                   │
//! │   [v0: i32 BE][v1: i32 BE] ... [v1023: i32 BE]          │
//! │ )                       4096 bytes before compression   │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod key;
mod record;

pub use key::{CacheKey, RegionCoord};
pub use record::{Record, RecordCodec, RECORD_BYTES, RECORD_LEN};
