//! # stalecache
//!
//! Storage for HTTP responses judged cacheable by `stalewise`.
//!
//! ## Architecture
//! - **MemoryStorage**: URI -> Vary variants, LRU by resource, bounded by
//!   total variant count
//! - **PersistentStorage**: MemoryStorage plus a versioned snapshot file,
//!   rewritten every N writes and on shutdown
//! - **CacheStorage**: the trait both engines implement
//!
//! ```no_run
//! use stalecache::{CacheStorage, PersistentStorage, StorageConfig};
//! use stalewise::{CacheItem, Headers, HttpResponse, Status, Vary};
//!
//! # fn main() -> stalewise::Result<()> {
//! let storage = PersistentStorage::open(StorageConfig::new("/var/cache/app").capacity(500))?;
//! let response = HttpResponse::new(Status::OK, Headers::new().add("ETag", "\"v1\""));
//! storage.put("http://example.com/", Vary::empty(), CacheItem::new(response));
//! assert!(storage.get("http://example.com/", &Headers::new()).is_some());
//! storage.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod lru;
mod persistent;
pub mod snapshot;
mod stats;
mod storage;

pub use config::{StorageConfig, DEFAULT_CAPACITY, DEFAULT_FILE_NAME, DEFAULT_SNAPSHOT_THRESHOLD};
pub use persistent::PersistentStorage;
pub use stats::{CacheStats, StatsSnapshot};
pub use storage::{CacheStorage, EntryGroup, MemoryStorage};

pub use stalewise::{Error, Result};
