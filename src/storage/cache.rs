//! Per-user snapshot cache.
//!
//! The index remembers how many history items each user had at the last
//! pull. A pull whose reported total matches, and whose snapshot file is
//! still on disk, is served from the snapshot instead of refetching.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{GameTable, NormalizedMatch, UserKey};

/// Cached state for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// History size reported by the source at the last refresh
    pub total_items: u64,

    /// Snapshot filename, relative to the snapshots directory
    pub snapshot_file: String,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(key: &UserKey) -> Self {
        Self {
            total_items: 0,
            snapshot_file: key.snapshot_filename(),
            updated_at: None,
        }
    }
}

/// The cache index file, loaded into memory.
#[derive(Debug)]
pub struct CacheIndex {
    path: PathBuf,
    entries: BTreeMap<UserKey, CacheEntry>,
}

impl CacheIndex {
    /// Load the index, or start an empty one if the file does not exist.
    pub fn load(config: &StorageConfig) -> Result<Self, StorageError> {
        let path = config.cache_index_path();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        debug!("Loaded cache index with {} entries", entries.len());
        Ok(Self { path, entries })
    }

    /// Write the index back to disk.
    pub fn save(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Entry for `key`, created with a zero count if the user is new.
    pub fn lookup(&mut self, key: &UserKey) -> &CacheEntry {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key))
    }

    /// Record the history size seen at this refresh.
    pub fn update_count(&mut self, key: &UserKey, total_items: u64) {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key));
        entry.total_items = total_items;
        entry.updated_at = Some(Utc::now());
    }

    /// Number of users in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no user has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a cached snapshot is stale.
pub fn needs_refresh(fresh_total: u64, cached_total: u64, snapshot_exists: bool) -> bool {
    fresh_total != cached_total || !snapshot_exists
}

/// Where the snapshot for `entry` lives.
pub fn snapshot_path(config: &StorageConfig, entry: &CacheEntry) -> PathBuf {
    config.snapshots_dir().join(&entry.snapshot_file)
}

/// Read a user's normalized table.
///
/// Any unparsable line fails the read with [`StorageError::Json`]; a
/// snapshot is either read whole or not at all.
pub fn read_snapshot(config: &StorageConfig, entry: &CacheEntry) -> Result<GameTable, StorageError> {
    let path = snapshot_path(config, entry);
    if !path.exists() {
        return Err(StorageError::PathNotFound(path));
    }
    let rows: Vec<NormalizedMatch> = JsonlReader::new(path).read_all_strict()?;
    Ok(GameTable::new(rows))
}

/// Replace a user's normalized table.
pub fn write_snapshot(
    config: &StorageConfig,
    entry: &CacheEntry,
    table: &GameTable,
) -> Result<usize, StorageError> {
    let writer = JsonlWriter::new(snapshot_path(config, entry));
    let count = writer.write_all(table.rows())?;
    info!("Saved snapshot {} ({} games)", entry.snapshot_file, count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::test_support::{game, table};
    use crate::models::{GameMode, GameResult, Side};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StorageConfig {
        StorageConfig::new(dir.path().to_path_buf())
    }

    #[test]
    fn test_needs_refresh() {
        assert!(!needs_refresh(40, 40, true));
        assert!(needs_refresh(41, 40, true));
        assert!(needs_refresh(40, 40, false));
        assert!(needs_refresh(0, 0, false));
    }

    #[test]
    fn test_lookup_creates_zero_entry() {
        let dir = TempDir::new().unwrap();
        let mut index = CacheIndex::load(&config(&dir)).unwrap();
        assert!(index.is_empty());

        let key = UserKey::derive("alice", "secret");
        let entry = index.lookup(&key).clone();
        assert_eq!(entry.total_items, 0);
        assert_eq!(entry.snapshot_file, key.snapshot_filename());
        assert_eq!(entry.updated_at, None);
        assert_eq!(index.len(), 1);

        // Second lookup returns the same entry
        index.lookup(&key);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_update_count_persists() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let key = UserKey::derive("alice", "secret");

        let mut index = CacheIndex::load(&cfg).unwrap();
        index.update_count(&key, 42);
        index.save().unwrap();

        let mut reloaded = CacheIndex::load(&cfg).unwrap();
        let entry = reloaded.lookup(&key);
        assert_eq!(entry.total_items, 42);
        assert!(entry.updated_at.is_some());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let key = UserKey::derive("bob", "token");
        let mut index = CacheIndex::load(&cfg).unwrap();
        let entry = index.lookup(&key).clone();

        let t = table(vec![game(
            ("Tempo", "Mage"),
            ("Control", "Warrior"),
            GameMode::Ranked,
            GameResult::Win,
            Some(300),
            &[("Fireball", Side::Me, 4)],
        )]);

        assert_eq!(write_snapshot(&cfg, &entry, &t).unwrap(), 1);
        assert!(snapshot_path(&cfg, &entry).exists());

        let read = read_snapshot(&cfg, &entry).unwrap();
        assert_eq!(read, t);
    }

    #[test]
    fn test_truncated_snapshot_is_error() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let mut index = CacheIndex::load(&cfg).unwrap();
        let entry = index.lookup(&UserKey::derive("dave", "token")).clone();

        let row = game(
            ("Tempo", "Mage"),
            ("Control", "Warrior"),
            GameMode::Ranked,
            GameResult::Win,
            Some(300),
            &[("Fireball", Side::Me, 4)],
        );
        write_snapshot(&cfg, &entry, &table(vec![row.clone(), row])).unwrap();

        let path = snapshot_path(&cfg, &entry);
        let content = std::fs::read_to_string(&path).unwrap();
        let cut = content.len() - content.lines().last().unwrap().len() / 2;
        std::fs::write(&path, &content[..cut]).unwrap();

        let err = read_snapshot(&cfg, &entry).unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[test]
    fn test_missing_snapshot_is_error() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let mut index = CacheIndex::load(&cfg).unwrap();
        let entry = index.lookup(&UserKey::derive("carol", "x")).clone();

        let err = read_snapshot(&cfg, &entry).unwrap_err();
        assert!(matches!(err, StorageError::PathNotFound(_)));
    }
}
