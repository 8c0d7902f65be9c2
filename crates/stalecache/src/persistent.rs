//! Snapshot-backed storage
//!
//! Wraps a [`MemoryStorage`] and writes its full contents to one snapshot
//! file:
//! - on the first write and every `threshold` writes after it
//! - on [`PersistentStorage::flush`] / [`PersistentStorage::close`]
//! - on drop, if anything changed since the last snapshot
//!
//! A snapshot that cannot be decoded at startup is deleted and the cache
//! starts empty.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use stalewise::{CacheItem, Headers, Result, Vary};

use crate::config::StorageConfig;
use crate::snapshot;
use crate::stats::CacheStats;
use crate::storage::{CacheStorage, EntryGroup, MemoryStorage};

/// Storage that survives restarts
pub struct PersistentStorage {
    inner: MemoryStorage,
    path: PathBuf,
    threshold: u64,
    /// Writes since open; drives the snapshot schedule
    writes: AtomicU64,
    /// Mutations not yet covered by a snapshot
    unsaved: AtomicU64,
    /// Serializes snapshot writes and file removal
    save_lock: Mutex<()>,
}

impl PersistentStorage {
    /// Open storage, loading the existing snapshot if there is one
    pub fn open(config: StorageConfig) -> Result<Self> {
        config.validate()?;

        let inner = MemoryStorage::new(config.max_entries())?;
        let path = config.snapshot_path();

        if path.exists() {
            match snapshot::read_file(&path) {
                Ok(groups) => {
                    let resources = groups.len();
                    inner.restore(groups);
                    tracing::info!(
                        path = %path.display(),
                        resources,
                        entries = inner.len(),
                        "loaded snapshot"
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding unreadable snapshot");
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::warn!(path = %path.display(), error = %e, "failed to delete snapshot");
                    }
                }
            }
        }

        Ok(Self {
            inner,
            path,
            threshold: config.threshold(),
            writes: AtomicU64::new(0),
            unsaved: AtomicU64::new(0),
            save_lock: Mutex::new(()),
        })
    }

    /// Location of the snapshot file
    pub fn snapshot_path(&self) -> &Path {
        &self.path
    }

    /// Storage statistics
    pub fn stats(&self) -> &CacheStats {
        self.inner.stats()
    }

    /// Copy of every group, least recently used first
    pub fn entries(&self) -> Vec<EntryGroup> {
        self.inner.entries()
    }

    /// Write a snapshot now
    pub fn flush(&self) -> Result<()> {
        let _guard = self.save_lock.lock();

        let pending = self.unsaved.load(Ordering::SeqCst);
        let groups = self.inner.entries();
        snapshot::write_file(&self.path, &groups)?;
        self.unsaved.fetch_sub(pending, Ordering::SeqCst);
        Ok(())
    }

    /// Flush and release the storage
    pub fn close(self) -> Result<()> {
        let result = self.flush();
        // Drop has nothing left to do unless writes raced the flush
        drop(self);
        result
    }

    fn flush_logged(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write snapshot");
        }
    }
}

impl CacheStorage for PersistentStorage {
    fn put(&self, uri: &str, vary: Vary, item: CacheItem) -> Arc<CacheItem> {
        let stored = self.inner.put(uri, vary, item);

        self.unsaved.fetch_add(1, Ordering::SeqCst);
        let count = self.writes.fetch_add(1, Ordering::SeqCst);
        if count % self.threshold == 0 {
            self.flush_logged();
        }
        stored
    }

    fn get(&self, uri: &str, request_headers: &Headers) -> Option<Arc<CacheItem>> {
        self.inner.get(uri, request_headers)
    }

    fn invalidate(&self, uri: &str) {
        self.inner.invalidate(uri);
        self.unsaved.fetch_add(1, Ordering::SeqCst);
    }

    fn clear(&self) {
        let _guard = self.save_lock.lock();

        self.inner.clear();
        self.unsaved.store(0, Ordering::SeqCst);
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "deleted snapshot"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to delete snapshot")
            }
        }
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn resource_count(&self) -> usize {
        self.inner.resource_count()
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl Drop for PersistentStorage {
    fn drop(&mut self) {
        if self.unsaved.load(Ordering::SeqCst) > 0 {
            self.flush_logged();
        }
    }
}
