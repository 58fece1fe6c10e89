//! Store Module
//!
//! The cache store: one SQLite connection holding every overlay table.
//!
//! ## Responsibilities
//! - Open the cache file, replacing it when it turns out to be corrupted
//! - Close the connection on request, on drop, or at process exit
//! - Purge the whole cache file
//! - Point reads, upserts and deletes of overlay records

pub mod exit_hook;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use tracing::{debug, error, info, warn};

use crate::codec::{CacheKey, Record, RecordCodec, RegionCoord};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::schema::{quote_identifier, table_name, OverlayDescriptor, SchemaManager};

use self::exit_hook::ExitHookId;

/// Connection state shared with the exit hook
#[derive(Default)]
struct Handle {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

/// Persistent cache of overlay records
///
/// ## Ownership
/// - One connection, no statement batching across calls
/// - `switch_to`/`close`/`clear` need `&mut self`; record I/O takes `&self`
///   and is serialized by the handle mutex
/// - The exit hook shares only the handle, and closing is idempotent, so
///   the hook and an explicit `close` can race safely
pub struct CacheStore {
    /// Store configuration
    config: Config,

    /// Record blob codec (compression level from config)
    codec: RecordCodec,

    /// Open connection and its path (shared with the exit hook)
    handle: Arc<Mutex<Handle>>,

    /// Table roster of the open store
    schema: SchemaManager,

    /// Registered close-on-exit hook
    exit_hook: Option<ExitHookId>,
}

impl CacheStore {
    /// Create a closed store
    pub fn new(config: Config) -> Self {
        let codec = RecordCodec::new(config.compression_level);
        Self {
            config,
            codec,
            handle: Arc::new(Mutex::new(Handle::default())),
            schema: SchemaManager::new(),
            exit_hook: None,
        }
    }

    /// Create a store and open `config.cache_path`
    pub fn open(config: Config) -> Result<Self> {
        let path = config.cache_path.clone();
        let mut store = Self::new(config);
        store.switch_to(&path)?;
        Ok(store)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close whatever is open and open the cache at `path`
    ///
    /// A file SQLite rejects as not a database, corrupt, or unopenable is
    /// treated as corrupted: it is deleted and a fresh store is created in
    /// its place. If it cannot be deleted the store stays closed and
    /// `CorruptedCache` is returned. Any other failure (a lock held by
    /// another connection, for one) is returned as is and the file is kept.
    pub fn switch_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        self.remove_close_shutdown_hook();
        self.close();

        let conn = match self.open_connection(path) {
            Ok(conn) => conn,
            Err(e) if !is_corruption(&e, path) => {
                error!(path = %path.display(), error = %e, "failed to open cache db");
                return Err(e.into());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open cache db");
                info!("attempting to create new cache db");

                if let Err(io) = fs::remove_file(path) {
                    error!(path = %path.display(), error = %io, "failed to delete corrupted cache db");
                    return Err(CacheError::CorruptedCache {
                        path: path.to_path_buf(),
                        reason: io.to_string(),
                    });
                }
                info!(path = %path.display(), "deleted corrupted cache db");
                self.open_connection(path)?
            }
        };

        {
            let mut handle = self.handle.lock();
            handle.conn = Some(conn);
            handle.path = Some(path.to_path_buf());
        }
        self.add_close_shutdown_hook()?;

        let default_overlay = self.config.default_overlay.clone();
        self.init_tables(&[&default_overlay])?;

        info!(path = %path.display(), "cache db opened");
        Ok(())
    }

    /// Open `path` and make sure it really is a database
    ///
    /// SQLite opens lazily, so the catalog is read once to surface a
    /// garbage file here rather than on the first query.
    fn open_connection(&self, path: &Path) -> rusqlite::Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(conn)
    }

    /// Close the connection (no-op when nothing is open)
    ///
    /// Close failures are logged, never returned.
    pub fn close(&mut self) {
        close_handle(&mut self.handle.lock());
        self.schema.reset();
    }

    /// Register the hook that closes this store at process exit
    ///
    /// Fails while a hook of this store is still pending. A hook that has
    /// already run does not count.
    pub fn add_close_shutdown_hook(&mut self) -> Result<()> {
        if let Some(id) = self.exit_hook {
            if exit_hook::is_registered(id) {
                return Err(CacheError::HookAlreadyRegistered);
            }
        }

        let handle = Arc::clone(&self.handle);
        self.exit_hook = Some(exit_hook::register(move || {
            close_handle(&mut handle.lock());
        }));
        Ok(())
    }

    /// Remove the exit hook, if any
    pub fn remove_close_shutdown_hook(&mut self) {
        if let Some(id) = self.exit_hook.take() {
            exit_hook::unregister(id);
        }
    }

    /// Delete the cache file and start over with an empty store
    ///
    /// No-op when nothing is open.
    pub fn clear(&mut self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };

        self.close();
        fs::remove_file(&path).map_err(|source| CacheError::Purge {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "deleted cache db");

        self.switch_to(&path)
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Create tables for `descriptors` and refresh the table roster
    ///
    /// Must be called for an overlay before its records are read or written.
    pub fn init_tables(&mut self, descriptors: &[&dyn OverlayDescriptor]) -> Result<()> {
        let handle = self.handle.lock();
        let conn = handle.conn.as_ref().ok_or(CacheError::NotOpen)?;
        self.schema.init_tables(conn, descriptors)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Read a record, `None` on a miss
    ///
    /// A stored blob that fails to decode is an error, never a miss.
    pub fn get_data(
        &self,
        overlay: &dyn OverlayDescriptor,
        suffix: Option<&str>,
        coord: RegionCoord,
    ) -> Result<Option<Record>> {
        let table = table_name(overlay, suffix)?;
        let key = CacheKey::encode(coord);

        let blob: Option<Vec<u8>> = self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT d FROM {} WHERE p = ?1",
                quote_identifier(&table)
            ))?;
            let blob = stmt
                .query_row(params![key.as_i64()], |row| row.get(0))
                .optional()?;
            Ok(blob)
        })?;

        match blob {
            Some(blob) => RecordCodec::decode(&blob).map(Some),
            None => {
                debug!(table = %table, region = %coord, "cache miss");
                Ok(None)
            }
        }
    }

    /// Insert or overwrite a record
    pub fn set_data(
        &self,
        overlay: &dyn OverlayDescriptor,
        suffix: Option<&str>,
        coord: RegionCoord,
        values: &Record,
    ) -> Result<()> {
        let table = table_name(overlay, suffix)?;
        let key = CacheKey::encode(coord);
        let blob = self.codec.encode(values)?;

        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "INSERT INTO {} (p, d) VALUES (?1, ?2) \
                 ON CONFLICT(p) DO UPDATE SET d = excluded.d",
                quote_identifier(&table)
            ))?;
            stmt.execute(params![key.as_i64(), blob])?;
            Ok(())
        })
    }

    /// Delete one record (no-op if absent)
    pub fn delete_data(
        &self,
        overlay: &dyn OverlayDescriptor,
        suffix: Option<&str>,
        coord: RegionCoord,
    ) -> Result<()> {
        let table = table_name(overlay, suffix)?;
        let key = CacheKey::encode(coord);

        self.with_connection(|conn| delete_row(conn, &table, key))
    }

    /// Delete the records of `coord` from every known table
    ///
    /// Covers tables created by earlier sessions too. Runs in one
    /// transaction so a failure leaves every table untouched.
    pub fn delete_region(&self, coord: RegionCoord) -> Result<()> {
        let key = CacheKey::encode(coord);

        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            for table in self.schema.known_tables() {
                delete_row(&tx, table, key)?;
            }
            tx.commit()?;
            Ok(())
        })?;

        debug!(region = %coord, tables = self.schema.known_tables().len(), "region invalidated");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the open cache file
    pub fn path(&self) -> Option<PathBuf> {
        self.handle.lock().path.clone()
    }

    /// Whether a connection is open
    pub fn is_open(&self) -> bool {
        self.handle.lock().conn.is_some()
    }

    /// Every table in the store as of the last schema init
    ///
    /// Empty once the store is closed, including by the exit hook.
    pub fn known_tables(&self) -> &[String] {
        if self.is_open() {
            self.schema.known_tables()
        } else {
            &[]
        }
    }

    /// Whether the table for `overlay`/`suffix` exists in the file
    ///
    /// Reads the catalog, so tables created by other connections count.
    pub fn contains_table(
        &self,
        overlay: &dyn OverlayDescriptor,
        suffix: Option<&str>,
    ) -> Result<bool> {
        let table = table_name(overlay, suffix)?;
        self.with_connection(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let handle = self.handle.lock();
        let conn = handle.conn.as_ref().ok_or(CacheError::NotOpen)?;
        f(conn)
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        self.remove_close_shutdown_hook();
        self.close();
    }
}

/// Whether an open failure means the file itself is unusable
///
/// `CannotOpen` only counts when something is at `path`; a missing parent
/// directory is not the file's fault.
fn is_corruption(err: &rusqlite::Error, path: &Path) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt => true,
            ErrorCode::CannotOpen => path.exists(),
            _ => false,
        },
        _ => false,
    }
}

fn delete_row(conn: &Connection, table: &str, key: CacheKey) -> Result<()> {
    let mut stmt = conn.prepare_cached(&format!(
        "DELETE FROM {} WHERE p = ?1",
        quote_identifier(table)
    ))?;
    stmt.execute(params![key.as_i64()])?;
    Ok(())
}

/// Close and forget the connection; shared by `close` and the exit hook
fn close_handle(handle: &mut Handle) {
    if let Some(conn) = handle.conn.take() {
        match conn.close() {
            Ok(()) => info!("cache db connection closed"),
            Err((_, e)) => error!(error = %e, "failed to close cache db connection"),
        }
    }
    handle.path = None;
}
