//! JSON snapshot of every upgrade record.
//!
//! Writes are atomic (temp file + rename), so a crash mid-save leaves the
//! previous snapshot intact. Reads tolerate damage: an unreadable file loads
//! as empty, and individual invalid records are skipped.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use reforge_types::{InstanceIdentity, ItemKind, OwnerId, Tier, UpgradeRecord};

use crate::identity::StructuralDigest;
use crate::store::{StoreKey, now_ms};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotDecodeError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot schema version {0:?}")]
    UnsupportedVersion(Option<u32>),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O failed at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode snapshot at {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: SnapshotDecodeError,
    },
}

/// One persisted record with the slot binding it was last seen at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: StoreKey,
    pub record: UpgradeRecord,
    pub slot_digest: Option<StructuralDigest>,
}

#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    pub entries: Vec<SnapshotEntry>,
    /// Records dropped because they failed validation.
    pub skipped: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFileSerde {
    schema_version: u32,
    saved_at: i64,
    records: BTreeMap<String, RecordSerde>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordSerde {
    level: i64,
    item_id: String,
    instance_id: String,
    last_modified: i64,
    owner_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot_digest: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionProbe {
    schema_version: Option<u32>,
}

impl From<&SnapshotEntry> for RecordSerde {
    fn from(entry: &SnapshotEntry) -> Self {
        Self {
            level: i64::from(entry.record.tier.value()),
            item_id: entry.record.kind.as_str().to_string(),
            instance_id: entry.record.instance.to_string(),
            last_modified: entry.record.last_modified_ms,
            owner_tag: entry.key.owner.as_str().to_string(),
            slot_digest: entry.slot_digest.map(|d| d.to_hex()),
        }
    }
}

impl RecordSerde {
    fn into_entry(self, key: &str) -> Result<SnapshotEntry, String> {
        let RecordSerde {
            level,
            item_id,
            instance_id,
            last_modified,
            owner_tag,
            slot_digest,
        } = self;

        if instance_id != key {
            return Err(format!("instanceId {instance_id} does not match key"));
        }
        let tier = Tier::try_from(level).map_err(|e| e.to_string())?;
        let kind = ItemKind::new(item_id).map_err(|e| e.to_string())?;
        let owner = OwnerId::new(owner_tag).map_err(|e| e.to_string())?;
        let instance = InstanceIdentity::parse(&instance_id).map_err(|e| e.to_string())?;
        // A bad digest only loses the slot binding, not the record.
        let slot_digest = slot_digest.as_deref().and_then(StructuralDigest::from_hex);

        Ok(SnapshotEntry {
            key: StoreKey::new(owner, instance),
            record: UpgradeRecord::new(tier, kind, instance, last_modified),
            slot_digest,
        })
    }
}

/// Serialize entries into the snapshot document.
///
/// Records are keyed by instance alone. If one instance appears under more
/// than one owner, the most recently modified record is written and the
/// others are dropped with a warning.
pub fn encode(entries: &[SnapshotEntry], saved_at: i64) -> Result<String, serde_json::Error> {
    let mut records: BTreeMap<String, RecordSerde> = BTreeMap::new();
    for entry in entries {
        match records.entry(entry.record.instance.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RecordSerde::from(entry));
            }
            Entry::Occupied(mut slot) => {
                let kept = slot.get();
                tracing::warn!(
                    instance = %entry.record.instance,
                    first_owner = %kept.owner_tag,
                    second_owner = %entry.key.owner,
                    "Instance recorded under two owners; keeping the newer record"
                );
                if entry.record.last_modified_ms > kept.last_modified {
                    slot.insert(RecordSerde::from(entry));
                }
            }
        }
    }

    let file = SnapshotFileSerde {
        schema_version: SCHEMA_VERSION,
        saved_at,
        records,
    };
    serde_json::to_string_pretty(&file)
}

/// Parse a snapshot document. Invalid records are skipped with a warning; a
/// malformed document or unknown schema version fails as a whole.
pub fn decode(json: &str) -> Result<LoadedSnapshot, SnapshotDecodeError> {
    let probe: VersionProbe = serde_json::from_str(json)?;
    if probe.schema_version != Some(SCHEMA_VERSION) {
        return Err(SnapshotDecodeError::UnsupportedVersion(probe.schema_version));
    }

    let file: SnapshotFileSerde = serde_json::from_str(json)?;
    let mut loaded = LoadedSnapshot::default();
    for (key, raw) in file.records {
        match raw.into_entry(&key) {
            Ok(entry) => loaded.entries.push(entry),
            Err(reason) => {
                tracing::warn!(record = %key, %reason, "Skipping invalid snapshot record");
                loaded.skipped += 1;
            }
        }
    }
    Ok(loaded)
}

/// Snapshot file plus timestamped backups, all in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    file_name: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Read the snapshot. `Ok(None)` means there is none yet.
    pub fn try_load(&self) -> Result<Option<LoadedSnapshot>, PersistenceError> {
        let path = self.path();
        if reforge_utils::recover_bak_file(&path) {
            tracing::info!(path = %path.display(), "Loading snapshot restored from .bak");
        }

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };
        decode(&json)
            .map(Some)
            .map_err(|source| PersistenceError::Decode { path, source })
    }

    /// Read the snapshot, treating any failure as an empty store.
    #[must_use]
    pub fn load(&self) -> LoadedSnapshot {
        match self.try_load() {
            Ok(Some(loaded)) => {
                tracing::info!(
                    records = loaded.entries.len(),
                    skipped = loaded.skipped,
                    "Loaded upgrade snapshot"
                );
                loaded
            }
            Ok(None) => {
                tracing::info!(path = %self.path().display(), "No upgrade snapshot; starting empty");
                LoadedSnapshot::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load upgrade snapshot, starting empty: {e}");
                LoadedSnapshot::default()
            }
        }
    }

    pub fn try_save(&self, entries: &[SnapshotEntry]) -> Result<(), PersistenceError> {
        let path = self.path();
        fs::create_dir_all(&self.dir).map_err(|source| PersistenceError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let json = encode(entries, now_ms()).map_err(PersistenceError::Encode)?;
        reforge_utils::atomic_write(&path, json.as_bytes())
            .map_err(|source| PersistenceError::Io { path, source })
    }

    /// Save all entries.
    /// Returns true if successful, false if save failed (logged but not propagated).
    pub fn save(&self, entries: &[SnapshotEntry]) -> bool {
        match self.try_save(entries) {
            Ok(()) => {
                tracing::debug!(records = entries.len(), "Saved upgrade snapshot");
                true
            }
            Err(e) => {
                tracing::warn!("Snapshot save failed: {e}");
                false
            }
        }
    }

    /// Copy the current snapshot to `<stem>_backup_<millis>.json`.
    ///
    /// Returns `Ok(None)` when there is no snapshot to back up. Never
    /// overwrites an existing backup.
    pub fn backup(&self) -> Result<Option<PathBuf>, PersistenceError> {
        let source = self.path();
        if !source.exists() {
            return Ok(None);
        }

        let stem = Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("snapshot");
        let mut stamp = now_ms();
        loop {
            let dest = self.dir.join(format!("{stem}_backup_{stamp}.json"));
            match reforge_utils::atomic_copy_new(&source, &dest) {
                Ok(bytes) => {
                    tracing::info!(path = %dest.display(), bytes, "Wrote snapshot backup");
                    return Ok(Some(dest));
                }
                // Two backups inside the same millisecond.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
                Err(source) => return Err(PersistenceError::Io { path: dest, source }),
            }
        }
    }
}
