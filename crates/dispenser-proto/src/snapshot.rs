//! The on-disk snapshot file (spec §6.2): one JSON object mapping
//! dispenser name to `{config, current, updated}`, written by
//! write-temp-then-rename so a crash mid-write never corrupts the
//! previous, still-valid snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use dispenser_core::{DispenserConfig, DispenserError, PersistenceHook};
use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEntry {
    config: DispenserConfig,
    current: i128,
    updated_ms: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A [`PersistenceHook`] backed by a single JSON file. Unknown top-level
/// names are ignored on read; an absent file is equivalent to an empty
/// snapshot.
pub struct JsonSnapshot {
    path: PathBuf,
    entries: Mutex<HashMap<String, SnapshotEntry>>,
}

impl JsonSnapshot {
    /// Reads `path` if it exists, or starts from an empty snapshot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProtoError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| ProtoError::Snapshot {
                reason: format!("malformed snapshot at {}: {err}", path.display()),
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(ProtoError::Snapshot {
                    reason: format!("cannot read snapshot at {}: {err}", path.display()),
                })
            }
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    /// Every `(name, config, saved_position)` triple, for [`Registry::load`](dispenser_core::Registry::load)
    /// to replay at startup.
    pub fn entries(&self) -> Vec<(String, DispenserConfig, i128)> {
        self.entries
            .lock()
            .expect("snapshot mutex poisoned")
            .iter()
            .map(|(name, entry)| (name.clone(), entry.config.clone(), entry.current))
            .collect()
    }

    fn write_locked(&self, entries: &HashMap<String, SnapshotEntry>) -> Result<(), ProtoError> {
        let bytes = serde_json::to_vec_pretty(entries).map_err(|err| ProtoError::Snapshot {
            reason: format!("cannot serialize snapshot: {err}"),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes).map_err(|err| ProtoError::Snapshot {
            reason: format!("cannot write {}: {err}", tmp_path.display()),
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|err| ProtoError::Snapshot {
            reason: format!("cannot rename {} to {}: {err}", tmp_path.display(), self.path.display()),
        })
    }
}

impl PersistenceHook for JsonSnapshot {
    fn save(&self, name: &str, config: &DispenserConfig, position: i128) -> dispenser_core::Result<()> {
        let mut entries = self.entries.lock().expect("snapshot mutex poisoned");
        entries.insert(
            name.to_string(),
            SnapshotEntry { config: config.clone(), current: position, updated_ms: now_ms() },
        );
        self.write_locked(&entries)
            .map_err(|err| DispenserError::PersistenceFailed { reason: err.to_string() })
    }

    fn remove(&self, name: &str) -> dispenser_core::Result<()> {
        let mut entries = self.entries.lock().expect("snapshot mutex poisoned");
        if entries.remove(name).is_some() {
            self.write_locked(&entries)
                .map_err(|err| DispenserError::PersistenceFailed { reason: err.to_string() })?;
        }
        Ok(())
    }

    fn flush(&self) -> dispenser_core::Result<()> {
        // Every `save`/`remove` above already writes and renames
        // synchronously; there is no buffered state left to force out.
        Ok(())
    }
}
