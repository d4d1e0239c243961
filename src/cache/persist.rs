//! Snapshot Persistence
//!
//! Stores the whole entry table as one JSON document. Writes go to a sibling
//! temp file which is then renamed over the snapshot, so a crash mid-write
//! leaves the previous snapshot intact.
//!
//! Every committed mutation re-encodes the full table, and payload bytes are
//! serialised as JSON number arrays (several times their raw size). Both are
//! acceptable for a response cache of a few hundred entries; a larger cache
//! would want an append log and a binary payload encoding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::error::StoreResult;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    entries: Vec<&'a CacheEntry>,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<CacheEntry>,
}

/// Encodes the table. Called under the read lock so the bytes reflect one
/// committed state; the slow disk write happens afterwards in [`write`].
pub(crate) fn encode(entries: &HashMap<String, CacheEntry>) -> StoreResult<Vec<u8>> {
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        entries: entries.values().collect(),
    };
    Ok(serde_json::to_vec(&snapshot)?)
}

pub(crate) async fn write(path: &Path, bytes: Vec<u8>) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Cache snapshot written to {}", path.display());
    Ok(())
}

/// Loads the snapshot at `path`.
///
/// A missing file is an empty cache. An unreadable or foreign-version file is
/// logged and also treated as empty; the next commit overwrites it.
pub(crate) async fn load(path: &Path) -> HashMap<String, CacheEntry> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Cannot read cache snapshot {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    match serde_json::from_slice::<Snapshot>(&bytes) {
        Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => snapshot
            .entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect(),
        Ok(snapshot) => {
            warn!(
                "Ignoring cache snapshot {} with version {}",
                path.display(),
                snapshot.version
            );
            HashMap::new()
        }
        Err(e) => {
            warn!("Ignoring corrupt cache snapshot {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
