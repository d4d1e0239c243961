//! Cache Store Module
//!
//! Persistent keyed response storage with TTL-aware reads.
//!
//! Reads take a shared lock on the in-memory table and never wait on disk.
//! Every mutation (put, delete, reap, bulk clear) is sent to a single background
//! writer task which applies it under the write lock, downgrades to a read lock
//! to encode the snapshot, and then writes the snapshot to disk with no lock
//! held. A mutation call returns once its commit has been applied, so a read
//! that starts after a completed put observes it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{persist, CacheEntry, CacheStats, Clock, StatsRecorder, SystemClock};
use crate::error::{StoreError, StoreResult};

type Entries = Arc<RwLock<HashMap<String, CacheEntry>>>;

// == Clear Method ==
/// Scope of a bulk clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMethod {
    /// Remove every entry
    All,
    /// Remove only entries that fail the freshness check
    Expired,
}

// == Write Path ==
#[derive(Debug)]
enum WriteOp {
    Put(CacheEntry),
    Delete(String),
    /// Delete `key` only if it is still expired at commit time
    Reap(String),
    Clear(ClearMethod),
}

#[derive(Debug)]
struct WriteCommand {
    op: WriteOp,
    done: oneshot::Sender<StoreResult<usize>>,
}

// == Cache Store ==
/// Handle to a response cache. Clones share the same table and writer.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Committed entries, at most one per key
    entries: Entries,
    /// Sender side of the background write path
    writer: mpsc::UnboundedSender<WriteCommand>,
    clock: Arc<dyn Clock>,
    stats: Arc<StatsRecorder>,
    path: Option<Arc<PathBuf>>,
}

impl CacheStore {
    // == Constructors ==
    /// Opens (or creates) a store persisted at `path`, using the system clock.
    ///
    /// Must be called from within a tokio runtime; the writer task is spawned
    /// on it and lives until the last handle is dropped.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_clock(Some(path.into()), Arc::new(SystemClock))
    }

    /// Creates a store that is never written to disk.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_clock(None, Arc::new(SystemClock))
    }

    /// Creates a store with an explicit clock.
    ///
    /// # Arguments
    /// * `path` - Snapshot file, or `None` for a memory-only store
    /// * `clock` - Time source for entry creation and freshness checks
    pub fn with_clock(path: Option<PathBuf>, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

        let entries: Entries = Arc::new(RwLock::new(HashMap::new()));
        // Held until the writer has loaded the snapshot, so early reads wait for it.
        // A fresh lock has no other holders.
        let loading = entries
            .clone()
            .try_write_owned()
            .map_err(|_| StoreError::WriterClosed)?;
        let stats = Arc::new(StatsRecorder::default());
        let path = path.map(Arc::new);
        let (tx, rx) = mpsc::unbounded_channel();

        let writer = Writer {
            entries: entries.clone(),
            clock: clock.clone(),
            stats: stats.clone(),
            path: path.clone(),
            rx,
        };
        runtime.spawn(writer.run(loading));

        Ok(Self {
            entries,
            writer: tx,
            clock,
            stats,
            path,
        })
    }

    /// Snapshot file backing this store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    // == Get ==
    /// Returns the payload stored under `key` if it is still fresh.
    ///
    /// An expired entry is reaped before returning `None`, so stale bytes are
    /// never handed out and re-queried keys clean themselves up.
    pub async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => {
                    self.stats.record_miss();
                    return Ok(None);
                }
                Some(entry) if entry.is_fresh_at(self.clock.now()) => {
                    self.stats.record_hit();
                    debug!("Loading from cache for URL: {}", key);
                    return Ok(Some(entry.payload.clone()));
                }
                Some(_) => {}
            }
        }

        self.stats.record_miss();
        info!("Cache expired for URL: {}", key);
        self.submit(WriteOp::Reap(key.to_string())).await?;
        Ok(None)
    }

    // == Put ==
    /// Stores `payload` under `key`, replacing any previous entry.
    ///
    /// Concurrent puts to one key are committed in arrival order at the writer;
    /// the last commit wins.
    pub async fn put(
        &self,
        key: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> StoreResult<()> {
        let entry = CacheEntry::new(key.into(), payload.into(), ttl, self.clock.now());
        self.submit(WriteOp::Put(entry)).await.map(|_| ())
    }

    // == Delete ==
    /// Removes the entry for `key`. Returns how many entries were removed (0 or 1).
    pub async fn delete(&self, key: &str) -> StoreResult<usize> {
        self.submit(WriteOp::Delete(key.to_string())).await
    }

    // == Bulk Clear ==
    /// Runs a bulk clear and returns the number of entries removed.
    pub async fn clear(&self, method: ClearMethod) -> StoreResult<usize> {
        self.submit(WriteOp::Clear(method)).await
    }

    pub async fn clear_all(&self) -> StoreResult<usize> {
        self.clear(ClearMethod::All).await
    }

    /// Sweeps entries nobody re-requested after they expired.
    pub async fn clear_expired(&self) -> StoreResult<usize> {
        self.clear(ClearMethod::Expired).await
    }

    // == Inspection ==
    /// Checks whether any entry, fresh or not, exists for `key`. Never reaps.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let total = self.len().await;
        self.stats.snapshot(total)
    }

    async fn submit(&self, op: WriteOp) -> StoreResult<usize> {
        let (done, committed) = oneshot::channel();
        self.writer
            .send(WriteCommand { op, done })
            .map_err(|_| StoreError::WriterClosed)?;
        committed.await.map_err(|_| StoreError::WriterClosed)?
    }
}

// == Background Writer ==
struct Writer {
    entries: Entries,
    clock: Arc<dyn Clock>,
    stats: Arc<StatsRecorder>,
    path: Option<Arc<PathBuf>>,
    rx: mpsc::UnboundedReceiver<WriteCommand>,
}

impl Writer {
    async fn run(mut self, mut loading: OwnedRwLockWriteGuard<HashMap<String, CacheEntry>>) {
        if let Some(path) = self.path.as_deref() {
            *loading = persist::load(path).await;
        }
        debug!("Cache store opened with {} entries", loading.len());
        drop(loading);

        while let Some(WriteCommand { op, done }) = self.rx.recv().await {
            let result = self.commit(op).await;
            if let Err(e) = &result {
                warn!("Cache write failed: {}", e);
            }
            // The caller may have been cancelled; the commit stands regardless.
            let _ = done.send(result);
        }
        debug!("Cache writer stopped");
    }

    async fn commit(&self, op: WriteOp) -> StoreResult<usize> {
        let mut entries = self.entries.write().await;
        let affected = apply(&mut entries, op, self.clock.now(), &self.stats);

        let Some(path) = self.path.as_deref() else {
            return Ok(affected);
        };
        if affected == 0 {
            return Ok(0);
        }

        let snapshot = {
            let entries = entries.downgrade();
            persist::encode(&entries)?
        };
        persist::write(path, snapshot).await?;
        Ok(affected)
    }
}

/// Applies one mutation to the table. Returns the number of entries written or removed.
fn apply(
    entries: &mut HashMap<String, CacheEntry>,
    op: WriteOp,
    now: chrono::DateTime<chrono::Utc>,
    stats: &StatsRecorder,
) -> usize {
    match op {
        WriteOp::Put(entry) => {
            info!("Saved to cache for URL: {}", entry.key);
            entries.insert(entry.key.clone(), entry);
            stats.record_write();
            1
        }
        WriteOp::Delete(key) => usize::from(entries.remove(&key).is_some()),
        WriteOp::Reap(key) => {
            let expired = entries
                .get(&key)
                .is_some_and(|entry| entry.is_expired_at(now));
            if expired {
                entries.remove(&key);
                stats.record_reap(1);
                1
            } else {
                0
            }
        }
        WriteOp::Clear(ClearMethod::All) => {
            let removed = entries.len();
            entries.clear();
            info!("Cache cleared: removed {} entries", removed);
            removed
        }
        WriteOp::Clear(ClearMethod::Expired) => {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_fresh_at(now));
            let removed = before - entries.len();
            info!("Deleted {} expired cached responses", removed);
            removed
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn seconds(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn memory_store() -> (CacheStore, ManualClock) {
        let clock = ManualClock::default();
        let store = CacheStore::with_clock(None, Arc::new(clock.clone())).unwrap();
        (store, clock)
    }

    #[tokio::test]
    async fn test_store_new_is_empty() {
        let (store, _) = memory_store();
        assert_eq!(store.len().await, 0);
        assert!(store.is_empty().await);
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_store_put_and_get() {
        let (store, _) = memory_store();

        assert_ok!(store.put("A", b"123".to_vec(), Duration::from_secs(10)).await);

        assert_eq!(store.get("A").await.unwrap(), Some(b"123".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let (store, _) = memory_store();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_ttl_scenario() {
        let (store, clock) = memory_store();
        store.put("A", b"123".to_vec(), Duration::from_secs(10)).await.unwrap();

        clock.advance(seconds(5));
        assert_eq!(store.get("A").await.unwrap(), Some(b"123".to_vec()));

        clock.advance(seconds(10));
        assert_eq!(store.get("A").await.unwrap(), None);
        assert!(!store.contains("A").await, "expired entry should be reaped by the read");
    }

    #[tokio::test]
    async fn test_store_overwrite_keeps_single_entry() {
        let (store, _) = memory_store();

        store.put("A", b"first".to_vec(), Duration::from_secs(10)).await.unwrap();
        store.put("A", b"second".to_vec(), Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.get("A").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_overwrite_resets_creation_time() {
        let (store, clock) = memory_store();
        store.put("A", b"old".to_vec(), Duration::from_secs(10)).await.unwrap();

        clock.advance(seconds(8));
        store.put("A", b"new".to_vec(), Duration::from_secs(10)).await.unwrap();
        clock.advance(seconds(8));

        assert_eq!(store.get("A").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_store_delete() {
        let (store, _) = memory_store();
        store.put("A", b"1".to_vec(), Duration::from_secs(10)).await.unwrap();

        assert_eq!(store.delete("A").await.unwrap(), 1);
        assert_eq!(store.delete("A").await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_clear_all() {
        let (store, _) = memory_store();
        for key in ["a", "b", "c"] {
            store.put(key, key.as_bytes().to_vec(), Duration::from_secs(10)).await.unwrap();
        }

        assert_eq!(store.clear(ClearMethod::All).await.unwrap(), 3);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_clear_expired_keeps_fresh() {
        let (store, clock) = memory_store();
        store.put("short", b"1".to_vec(), Duration::from_secs(1)).await.unwrap();
        store.put("long", b"2".to_vec(), Duration::from_secs(60)).await.unwrap();

        clock.advance(seconds(2));

        assert_eq!(store.clear_expired().await.unwrap(), 1);
        assert!(!store.contains("short").await);
        assert_eq!(store.get("long").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_reap_spares_entry_refreshed_in_between() {
        let (store, clock) = memory_store();
        store.put("A", b"stale".to_vec(), Duration::from_secs(10)).await.unwrap();
        clock.advance(seconds(15));
        store.put("A", b"fresh".to_vec(), Duration::from_secs(10)).await.unwrap();

        let reaped = store.submit(WriteOp::Reap("A".to_string())).await.unwrap();

        assert_eq!(reaped, 0);
        assert_eq!(store.get("A").await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn test_concurrent_puts_leave_one_entry() {
        let (store, _) = memory_store();

        let handles: Vec<_> = (0..32u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.put("race", vec![i], Duration::from_secs(60)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 1);
        let payload = store.get("race").await.unwrap().unwrap();
        assert_eq!(payload.len(), 1);
        assert!(payload[0] < 32);
    }

    #[tokio::test]
    async fn test_store_stats() {
        let (store, clock) = memory_store();
        store.put("A", b"1".to_vec(), Duration::from_secs(1)).await.unwrap();
        store.get("A").await.unwrap();
        store.get("B").await.unwrap();
        clock.advance(seconds(2));
        store.get("A").await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.reaped, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn test_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        {
            let store = CacheStore::open(&path).unwrap();
            store.put("A", b"123".to_vec(), Duration::from_secs(60)).await.unwrap();
            store.put("B", b"456".to_vec(), Duration::from_secs(60)).await.unwrap();
            store.delete("B").await.unwrap();
        }

        let reopened = CacheStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.get("A").await.unwrap(), Some(b"123".to_vec()));
        assert!(!reopened.contains("B").await);
    }

    #[tokio::test]
    async fn test_reads_after_open_wait_for_snapshot_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        {
            let store = CacheStore::open(&path).unwrap();
            store.put("A", b"old".to_vec(), Duration::from_secs(60)).await.unwrap();
            store.put("B", b"kept".to_vec(), Duration::from_secs(60)).await.unwrap();
        }

        let reopened = CacheStore::open(&path).unwrap();
        assert!(reopened.contains("A").await);
        assert_eq!(reopened.len().await, 2);

        let again = CacheStore::open(&path).unwrap();
        // Queued behind the load, so the loaded snapshot cannot clobber it.
        again.put("A", b"new".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(again.get("A").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(again.get("B").await.unwrap(), Some(b"kept".to_vec()));
    }

    #[tokio::test]
    async fn test_store_clear_all_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let store = CacheStore::open(&path).unwrap();
        store.put("A", b"1".to_vec(), Duration::from_secs(60)).await.unwrap();
        store.clear_all().await.unwrap();

        let reopened = CacheStore::open(&path).unwrap();
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_to_unwritable_path_reports_error_but_keeps_memory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // Parent of the snapshot is a regular file, so the directory cannot be created.
        let store = CacheStore::open(blocker.join("cache.json")).unwrap();

        let result = store.put("A", b"1".to_vec(), Duration::from_secs(60)).await;

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(store.get("A").await.unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_open_outside_runtime_fails() {
        let result = CacheStore::in_memory();
        assert!(matches!(result, Err(StoreError::NoRuntime)));
    }
}
