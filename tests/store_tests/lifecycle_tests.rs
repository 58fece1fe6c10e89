//! Tests for CacheStore lifecycle
//!
//! These tests verify:
//! - Opening creates the file and the default table
//! - Corrupted files are replaced, locked or unreachable ones are not
//! - close is idempotent
//! - clear purges and leaves the store usable
//! - Exit hook registration rules

use std::fs;
use std::path::{Path, PathBuf};

use overlaycache::{CacheError, CacheStore, Config, OverlayKind, RegionCoord, RECORD_LEN};
use rusqlite::Connection;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn cache_path(dir: &TempDir) -> PathBuf {
    dir.path().join("cache.db")
}

fn open_store(path: &Path) -> CacheStore {
    let config = Config::builder().cache_path(path).build().unwrap();
    CacheStore::open(config).unwrap()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_file_and_default_table() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);

    let store = open_store(&path);

    assert!(path.exists());
    assert!(store.is_open());
    assert_eq!(store.path(), Some(path));
    assert_eq!(store.known_tables(), ["entity_amount"]);
}

#[test]
fn test_configured_default_overlay() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .cache_path(cache_path(&temp))
        .default_overlay(OverlayKind::with_sub_variants("blocks", ["a", "b"]))
        .build()
        .unwrap();

    let store = CacheStore::open(config).unwrap();

    assert_eq!(store.known_tables(), ["blocks_a", "blocks_b"]);
}

#[test]
fn test_new_store_is_closed() {
    let store = CacheStore::new(Config::default());

    assert!(!store.is_open());
    assert_eq!(store.path(), None);
    assert!(store.known_tables().is_empty());
}

#[test]
fn test_corrupted_file_is_replaced() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);
    fs::write(&path, vec![b'x'; 4096]).unwrap();

    let store = open_store(&path);

    assert!(store.is_open());
    assert_eq!(store.known_tables(), ["entity_amount"]);
    let overlay = OverlayKind::entity_amount();
    assert_eq!(
        store.get_data(&overlay, None, RegionCoord::new(0, 0)).unwrap(),
        None
    );
}

#[test]
fn test_unrecoverable_file_leaves_store_closed() {
    let temp = TempDir::new().unwrap();
    // A directory cannot be opened as a database nor removed as a file
    let path = temp.path().join("cache.db");
    fs::create_dir(&path).unwrap();

    let mut store = CacheStore::new(Config::default());
    let result = store.switch_to(&path);

    assert!(matches!(result, Err(CacheError::CorruptedCache { .. })));
    assert!(!store.is_open());
    assert_eq!(store.path(), None);
}

#[test]
fn test_locked_file_is_not_deleted() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);
    let overlay = OverlayKind::entity_amount();
    let store = open_store(&path);
    store
        .set_data(&overlay, None, RegionCoord::new(1, 1), &[9; RECORD_LEN])
        .unwrap();
    drop(store);

    let locker = Connection::open(&path).unwrap();
    locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

    let config = Config::builder()
        .cache_path(&path)
        .busy_timeout_ms(50)
        .build()
        .unwrap();
    let result = CacheStore::open(config);
    assert!(matches!(result, Err(CacheError::Database(_))));
    assert!(path.exists());

    locker.execute_batch("COMMIT").unwrap();
    drop(locker);

    let store = open_store(&path);
    assert_eq!(
        store.get_data(&overlay, None, RegionCoord::new(1, 1)).unwrap(),
        Some([9; RECORD_LEN])
    );
}

#[test]
fn test_missing_directory_is_not_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing").join("cache.db");

    let mut store = CacheStore::new(Config::default());
    let result = store.switch_to(&path);

    assert!(matches!(result, Err(CacheError::Database(_))));
    assert!(!store.is_open());
}

#[test]
fn test_failed_switch_closes_previous_store() {
    let temp = TempDir::new().unwrap();
    let bad = temp.path().join("dir.db");
    fs::create_dir(&bad).unwrap();

    let mut store = open_store(&cache_path(&temp));
    assert!(store.switch_to(&bad).is_err());

    assert!(!store.is_open());
}

#[test]
fn test_switch_between_files() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.db");
    let second = temp.path().join("second.db");
    let overlay = OverlayKind::entity_amount();
    let coord = RegionCoord::new(1, 1);

    let mut store = open_store(&first);
    store.set_data(&overlay, None, coord, &[1; RECORD_LEN]).unwrap();

    store.switch_to(&second).unwrap();
    assert_eq!(store.path(), Some(second.clone()));
    assert_eq!(store.get_data(&overlay, None, coord).unwrap(), None);

    store.switch_to(&first).unwrap();
    assert_eq!(store.get_data(&overlay, None, coord).unwrap(), Some([1; RECORD_LEN]));
}

#[test]
fn test_data_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);
    let overlay = OverlayKind::entity_amount();
    let coord = RegionCoord::new(-3, 9);

    {
        let store = open_store(&path);
        store.set_data(&overlay, None, coord, &[42; RECORD_LEN]).unwrap();
    }

    let store = open_store(&path);
    assert_eq!(store.get_data(&overlay, None, coord).unwrap(), Some([42; RECORD_LEN]));
}

#[test]
fn test_reopen_knows_tables_from_earlier_session() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);

    {
        let mut store = open_store(&path);
        store
            .init_tables(&[&OverlayKind::new("inhabited_time")])
            .unwrap();
    }

    let store = open_store(&path);
    assert_eq!(store.known_tables(), ["entity_amount", "inhabited_time"]);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(&cache_path(&temp));

    store.close();
    store.close();

    assert!(!store.is_open());
    assert_eq!(store.path(), None);
    assert!(store.known_tables().is_empty());
}

#[test]
fn test_operations_after_close_fail() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(&cache_path(&temp));
    let overlay = OverlayKind::entity_amount();
    let coord = RegionCoord::new(0, 0);
    store.close();

    assert!(matches!(store.get_data(&overlay, None, coord), Err(CacheError::NotOpen)));
    assert!(matches!(
        store.set_data(&overlay, None, coord, &[0; RECORD_LEN]),
        Err(CacheError::NotOpen)
    ));
    assert!(matches!(store.delete_data(&overlay, None, coord), Err(CacheError::NotOpen)));
    assert!(matches!(store.delete_region(coord), Err(CacheError::NotOpen)));
    assert!(matches!(store.init_tables(&[&overlay]), Err(CacheError::NotOpen)));
}

#[test]
fn test_drop_releases_file() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);

    let store = open_store(&path);
    drop(store);

    fs::remove_file(&path).unwrap();
    let store = open_store(&path);
    assert!(store.is_open());
}

// =============================================================================
// Clear Tests
// =============================================================================

#[test]
fn test_clear_purges_all_records() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);
    let mut store = open_store(&path);
    let entity = OverlayKind::entity_amount();
    let other = OverlayKind::new("tile_entity_amount");
    store.init_tables(&[&other]).unwrap();

    let coords = [RegionCoord::new(0, 0), RegionCoord::new(-1, 5)];
    for &coord in &coords {
        store.set_data(&entity, None, coord, &[3; RECORD_LEN]).unwrap();
        store.set_data(&other, None, coord, &[4; RECORD_LEN]).unwrap();
    }

    store.clear().unwrap();

    assert!(store.is_open());
    assert_eq!(store.path(), Some(path));
    // Only the default table is recreated
    assert_eq!(store.known_tables(), ["entity_amount"]);
    for &coord in &coords {
        assert_eq!(store.get_data(&entity, None, coord).unwrap(), None);
    }
}

#[test]
fn test_store_usable_after_clear() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(&cache_path(&temp));
    let overlay = OverlayKind::entity_amount();
    let coord = RegionCoord::new(7, 7);

    store.set_data(&overlay, None, coord, &[1; RECORD_LEN]).unwrap();
    store.clear().unwrap();
    store.set_data(&overlay, None, coord, &[2; RECORD_LEN]).unwrap();

    assert_eq!(store.get_data(&overlay, None, coord).unwrap(), Some([2; RECORD_LEN]));
}

#[test]
fn test_clear_on_closed_store_is_noop() {
    let mut store = CacheStore::new(Config::default());
    store.clear().unwrap();
    assert!(!store.is_open());
}

#[test]
fn test_clear_fails_when_file_vanished() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);
    let mut store = open_store(&path);

    fs::remove_file(&path).unwrap();
    let result = store.clear();

    match result {
        Err(CacheError::Purge { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("Expected purge error, got {:?}", other.map(|_| ())),
    }
    assert!(!store.is_open());
}

// =============================================================================
// Exit Hook Tests
// =============================================================================

#[test]
fn test_double_hook_registration_fails() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(&cache_path(&temp));

    assert!(matches!(
        store.add_close_shutdown_hook(),
        Err(CacheError::HookAlreadyRegistered)
    ));
}

#[test]
fn test_hook_can_be_readded_after_removal() {
    let temp = TempDir::new().unwrap();
    let mut store = open_store(&cache_path(&temp));

    store.remove_close_shutdown_hook();
    store.remove_close_shutdown_hook();
    store.add_close_shutdown_hook().unwrap();
}

#[test]
fn test_switch_keeps_hook_registered() {
    let temp = TempDir::new().unwrap();
    let path = cache_path(&temp);
    let mut store = open_store(&path);

    for _ in 0..3 {
        store.switch_to(&path).unwrap();
    }

    assert!(store.is_open());
    assert!(matches!(
        store.add_close_shutdown_hook(),
        Err(CacheError::HookAlreadyRegistered)
    ));
}
