//! Vary-aware in-memory storage
//!
//! Layout:
//! - resource URI -> group of (Vary selector, item) variants
//! - groups ordered by recency in an [`LruMap`]
//! - capacity counts variants across all groups; eviction drops whole groups

use std::sync::Arc;

use parking_lot::RwLock;
use stalewise::{CacheItem, Error, Headers, HttpRequest, Result, Vary};

use crate::lru::LruMap;
use crate::stats::CacheStats;

/// Common interface of the storage engines
///
/// Implementations: [`MemoryStorage`], [`PersistentStorage`](crate::PersistentStorage).
/// All methods take `&self`; engines synchronize internally.
pub trait CacheStorage: Send + Sync {
    /// Store an item for a URI and Vary selector, replacing any item already
    /// stored under the same pair. May evict least recently used resources.
    fn put(&self, uri: &str, vary: Vary, item: CacheItem) -> Arc<CacheItem>;

    /// Find the variant of `uri` selected by the request headers
    fn get(&self, uri: &str, request_headers: &Headers) -> Option<Arc<CacheItem>>;

    /// Drop every variant stored for a URI
    fn invalidate(&self, uri: &str);

    /// Drop everything
    fn clear(&self);

    /// Number of stored variants across all resources
    fn len(&self) -> usize;

    /// Whether nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct resources
    fn resource_count(&self) -> usize;

    /// Maximum number of variants
    fn capacity(&self) -> usize;

    /// Find the variant answering a request
    fn get_for(&self, request: &HttpRequest) -> Option<Arc<CacheItem>> {
        self.get(request.uri(), request.headers())
    }
}

/// Every variant stored for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryGroup {
    /// Resource identifier
    pub uri: String,
    /// Variants in insertion order
    pub variants: Vec<(Vary, Arc<CacheItem>)>,
}

impl EntryGroup {
    fn release(&self) {
        for (_, item) in &self.variants {
            if let Some(payload) = item.response().payload() {
                payload.release();
            }
        }
    }
}

struct Inner {
    groups: LruMap<String, Vec<(Vary, Arc<CacheItem>)>>,
    entries: usize,
}

/// Bounded in-memory storage with LRU eviction per resource
pub struct MemoryStorage {
    inner: RwLock<Inner>,
    capacity: usize,
    stats: CacheStats,
}

impl MemoryStorage {
    /// Create storage holding at most `capacity` variants
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        Ok(Self {
            inner: RwLock::new(Inner {
                groups: LruMap::new(),
                entries: 0,
            }),
            capacity,
            stats: CacheStats::new(),
        })
    }

    /// Storage statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Copy of every group, least recently used first
    pub fn entries(&self) -> Vec<EntryGroup> {
        let inner = self.inner.read();
        inner
            .groups
            .iter_lru()
            .map(|(uri, variants)| EntryGroup {
                uri: uri.clone(),
                variants: variants.clone(),
            })
            .collect()
    }

    /// Load groups, least recently used first, as if each variant were put
    /// in that order. Statistics are not touched.
    pub fn restore(&self, groups: Vec<EntryGroup>) {
        for group in groups {
            for (vary, item) in group.variants {
                self.store(&group.uri, vary, item);
            }
        }
    }

    fn store(&self, uri: &str, vary: Vary, item: Arc<CacheItem>) {
        let (replaced, evicted) = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;

            let variants = inner.groups.get_or_insert_with(uri.to_string(), Vec::new);
            let replaced = match variants.iter_mut().find(|(existing, _)| *existing == vary) {
                Some(slot) => Some(std::mem::replace(&mut slot.1, Arc::clone(&item))),
                None => {
                    variants.push((vary, Arc::clone(&item)));
                    inner.entries += 1;
                    None
                }
            };

            let mut evicted = Vec::new();
            while inner.entries > self.capacity {
                // The group just written is never its own victim
                match inner.groups.peek_lru() {
                    Some(lru) if lru.as_str() != uri => {}
                    _ => break,
                }
                if let Some((uri, variants)) = inner.groups.pop_lru() {
                    inner.entries -= variants.len();
                    evicted.push(EntryGroup { uri, variants });
                }
            }

            (replaced, evicted)
        };

        if let Some(old) = replaced {
            if old.response().payload() != item.response().payload() {
                if let Some(payload) = old.response().payload() {
                    payload.release();
                }
            }
        }

        for group in evicted {
            tracing::debug!(
                uri = %group.uri,
                variants = group.variants.len(),
                "evicted least recently used resource"
            );
            self.stats.record_eviction();
            group.release();
        }
    }
}

impl CacheStorage for MemoryStorage {
    fn put(&self, uri: &str, vary: Vary, item: CacheItem) -> Arc<CacheItem> {
        let item = Arc::new(item);
        self.store(uri, vary, Arc::clone(&item));
        self.stats.record_insert();
        item
    }

    fn get(&self, uri: &str, request_headers: &Headers) -> Option<Arc<CacheItem>> {
        let mut inner = self.inner.write();

        let hit = inner.groups.peek(uri).and_then(|variants| {
            variants
                .iter()
                .find(|(vary, _)| vary.matches(request_headers))
                .map(|(_, item)| Arc::clone(item))
        });

        if hit.is_some() {
            inner.groups.get_mut(uri);
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        hit
    }

    fn invalidate(&self, uri: &str) {
        let removed = {
            let mut inner = self.inner.write();
            let removed = inner.groups.remove(uri);
            if let Some(variants) = &removed {
                inner.entries -= variants.len();
            }
            removed
        };

        if let Some(variants) = removed {
            tracing::debug!(uri, variants = variants.len(), "invalidated resource");
            self.stats.record_invalidation();
            EntryGroup {
                uri: uri.to_string(),
                variants,
            }
            .release();
        }
    }

    fn clear(&self) {
        let drained = {
            let mut inner = self.inner.write();
            inner.entries = 0;
            inner.groups.drain()
        };

        for (uri, variants) in drained {
            EntryGroup { uri, variants }.release();
        }
        self.stats.reset();
    }

    fn len(&self) -> usize {
        self.inner.read().entries
    }

    fn resource_count(&self) -> usize {
        self.inner.read().groups.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
