//! Durable snapshot of the content store
//!
//! The whole store is written as one pretty JSON document. Writes go to a
//! sibling `.tmp` file which is then renamed over the target, so a crash
//! mid-write leaves the previous snapshot intact.
//!
//! ```json
//! {
//!   "version": 1,
//!   "saved_at": "2024-01-15T00:00:03Z",
//!   "items": [ { "id": "…", "key": "crane", … } ],
//!   "retained": { "crane": ["…", "…"] }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::models::ContentItem;
use crate::utils::error::StoreError;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of the whole store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Every item, retained or not
    pub items: Vec<ContentItem>,
    /// Per-key retained ids, oldest first
    #[serde(default)]
    pub retained: BTreeMap<String, Vec<String>>,
}

impl StoreSnapshot {
    /// Empty snapshot stamped at `now`
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: now,
            items: Vec::new(),
            retained: BTreeMap::new(),
        }
    }

    /// Age of the snapshot relative to `now` (zero if saved in the future)
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.saved_at).max(chrono::Duration::zero())
    }
}

/// Best-effort secondary copy of the snapshot
#[async_trait]
pub trait SnapshotMirror: Send + Sync {
    /// Push the snapshot to the secondary location
    async fn mirror(&self, snapshot: &StoreSnapshot) -> anyhow::Result<()>;

    /// Name used in logs
    fn name(&self) -> &str;
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the snapshot via temp file and rename
pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let temp = temp_path(path);
    let file = File::create(&temp).map_err(|e| StoreError::io(&temp, e))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush().map_err(|e| StoreError::io(&temp, e))?;
    drop(writer);

    fs::rename(&temp, path).map_err(|e| StoreError::io(path, e))?;

    tracing::debug!(path = %path.display(), items = snapshot.items.len(), "Snapshot saved");
    Ok(())
}

/// Read the snapshot; `Ok(None)` when the file does not exist
pub fn load_snapshot(path: &Path) -> Result<Option<StoreSnapshot>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let reader = BufReader::new(file);
    let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;

    tracing::debug!(path = %path.display(), items = snapshot.items.len(), "Snapshot loaded");
    Ok(Some(snapshot))
}

/// Delete the snapshot file; `Ok(false)` when it did not exist
pub fn remove_snapshot(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
