//! Shared fixtures for wheelhouse-ledger integration tests

#![allow(dead_code)]

use camino::Utf8PathBuf;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use wheelhouse_ledger::{FsLedgerStore, LedgerStore, MemoryLedgerStore};

/// Fixed epoch all test timestamps are offset from
pub const EPOCH: i64 = 1_700_000_000;

/// Default lease TTL (6h)
pub const TTL_SECS: i64 = 6 * 3600;

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH + offset_secs, 0).unwrap()
}

pub fn utf8_dir(temp: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join(name)).unwrap()
}

/// Directory-backed store in a fresh temp dir
pub fn fs_store() -> (Arc<dyn LedgerStore>, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = FsLedgerStore::open(utf8_dir(&temp, "ledger")).unwrap();
    (Arc::new(store), temp)
}

/// Both backends, each with the temp dir it depends on (if any)
pub fn all_backends() -> Vec<(&'static str, Arc<dyn LedgerStore>, Option<TempDir>)> {
    let (fs, temp) = fs_store();
    vec![
        ("fs", fs, Some(temp)),
        ("memory", Arc::new(MemoryLedgerStore::new()), None),
    ]
}
