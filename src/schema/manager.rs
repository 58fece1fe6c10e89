//! Schema Manager
//!
//! Creates overlay tables and keeps the roster of tables in the open store.
//!
//! ## Responsibilities
//! - Resolve `(overlay, suffix)` to a table name
//! - Create missing tables for requested overlays
//! - Re-scan the catalog after every init so the roster includes tables
//!   from overlays this process never asked for

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

use super::overlay::{validate_identifier, OverlayDescriptor};

/// Tracks the tables of the open store
#[derive(Debug, Default)]
pub struct SchemaManager {
    /// Every user table in the catalog as of the last init
    known_tables: Vec<String>,
}

impl SchemaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the tables for `descriptors` and refresh the roster
    ///
    /// Creation is idempotent. The roster is replaced by a full catalog scan,
    /// never appended to.
    pub fn init_tables(
        &mut self,
        conn: &Connection,
        descriptors: &[&dyn OverlayDescriptor],
    ) -> Result<()> {
        for descriptor in descriptors {
            for table in table_names(*descriptor)? {
                conn.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {} (p BIGINT PRIMARY KEY, d BLOB);",
                    quote_identifier(&table)
                ))?;
            }
        }

        self.known_tables = list_tables(conn)?;
        debug!(tables = ?self.known_tables, "cache schema initialized");
        Ok(())
    }

    /// Tables seen by the last init
    pub fn known_tables(&self) -> &[String] {
        &self.known_tables
    }

    /// Forget the roster (store closed)
    pub fn reset(&mut self) {
        self.known_tables.clear();
    }
}

/// Resolve the table holding `overlay` rasters for `suffix`
pub fn table_name(overlay: &dyn OverlayDescriptor, suffix: Option<&str>) -> Result<String> {
    validate_identifier(overlay.name())?;
    match suffix {
        None => Ok(overlay.name().to_string()),
        Some(suffix) => {
            validate_identifier(suffix)?;
            Ok(format!("{}_{}", overlay.name(), suffix))
        }
    }
}

/// Every table an overlay owns
fn table_names(overlay: &dyn OverlayDescriptor) -> Result<Vec<String>> {
    match overlay.sub_variants() {
        None => Ok(vec![table_name(overlay, None)?]),
        Some(suffixes) => suffixes
            .iter()
            .map(|suffix| table_name(overlay, Some(suffix.as_str())))
            .collect(),
    }
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Read every user table from the catalog
fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND substr(name, 1, 7) != 'sqlite_' \
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tables)
}
