//! Process-wide Store
//!
//! One lazily opened [`CacheStore`] shared by every provider in the process.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::StoreResult;
use crate::tasks::spawn_cleanup_task;

struct Shared {
    store: CacheStore,
    /// Expired-entry sweep, when one was started for this store
    sweep: Option<JoinHandle<()>>,
}

static SHARED: Lazy<Mutex<Option<Shared>>> = Lazy::new(|| Mutex::new(None));

fn slot() -> MutexGuard<'static, Option<Shared>> {
    SHARED.lock().unwrap_or_else(|e| e.into_inner())
}

fn get_or_open(path: PathBuf, cleanup_interval_secs: u64) -> StoreResult<CacheStore> {
    let mut slot = slot();
    if let Some(shared) = slot.as_ref() {
        return Ok(shared.store.clone());
    }

    let store = CacheStore::open(path)?;
    debug!("Opened shared cache store at {:?}", store.path());
    let sweep = (cleanup_interval_secs > 0)
        .then(|| spawn_cleanup_task(store.clone(), cleanup_interval_secs));
    *slot = Some(Shared {
        store: store.clone(),
        sweep,
    });
    Ok(store)
}

/// Returns the process-wide store configured from the environment.
pub fn shared() -> StoreResult<CacheStore> {
    open_shared(&Config::from_env())
}

/// Returns the process-wide store, opening it at `config.cache_path` on first
/// use and starting the expired-entry sweep every `config.cleanup_interval`
/// seconds (0 disables the sweep).
pub fn open_shared(config: &Config) -> StoreResult<CacheStore> {
    get_or_open(config.cache_path.clone(), config.cleanup_interval)
}

/// Returns the process-wide store, opening it at `path` without a sweep if
/// none is open yet.
///
/// Once a store is open, `path` is ignored until [`reset_shared`] is called.
pub fn init_shared(path: impl Into<PathBuf>) -> StoreResult<CacheStore> {
    get_or_open(path.into(), 0)
}

/// Drops the process-wide handle so the next [`shared`] call opens a new store.
/// Any sweep started for it is aborted.
///
/// The writer task is bound to the runtime that opened the store; tests that
/// use a fresh runtime each must reset between uses.
pub fn reset_shared() -> Option<CacheStore> {
    slot().take().map(|shared| {
        if let Some(sweep) = shared.sweep {
            sweep.abort();
        }
        shared.store
    })
}
