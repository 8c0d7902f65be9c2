//! Persistent storage configuration

use std::path::{Path, PathBuf};

use stalewise::{Error, Result};

/// Default snapshot file name
pub const DEFAULT_FILE_NAME: &str = "persistent.snap";

/// Default capacity in stored variants
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default number of writes between snapshots
pub const DEFAULT_SNAPSHOT_THRESHOLD: u64 = 100;

/// Where and how a [`PersistentStorage`](crate::PersistentStorage) keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    dir: PathBuf,
    file_name: String,
    capacity: usize,
    snapshot_threshold: u64,
}

impl StorageConfig {
    /// Configuration rooted at `dir` with default settings
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            snapshot_threshold: DEFAULT_SNAPSHOT_THRESHOLD,
        }
    }

    /// Maximum number of stored variants
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Snapshot file name inside the storage directory
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Write a snapshot every `threshold` writes
    pub fn snapshot_threshold(mut self, threshold: u64) -> Self {
        self.snapshot_threshold = threshold;
        self
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Configured capacity
    pub fn max_entries(&self) -> usize {
        self.capacity
    }

    /// Configured snapshot threshold
    pub fn threshold(&self) -> u64 {
        self.snapshot_threshold
    }

    /// Full path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Check the settings and create the storage directory if needed
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        if self.snapshot_threshold == 0 {
            return Err(Error::InvalidThreshold(self.snapshot_threshold));
        }

        let name = Path::new(&self.file_name);
        let plain = name.file_name().map(|n| n == name.as_os_str()).unwrap_or(false);
        if self.file_name.is_empty() || !plain {
            return Err(Error::InvalidFileName(self.file_name.clone()));
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| Error::StorageDirectory {
            path: self.dir.clone(),
            source,
        })?;
        if !self.dir.is_dir() {
            return Err(Error::StorageDirectory {
                path: self.dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::new("/tmp/cache");

        assert_eq!(config.max_entries(), DEFAULT_CAPACITY);
        assert_eq!(config.threshold(), DEFAULT_SNAPSHOT_THRESHOLD);
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/cache/persistent.snap"));
    }

    #[test]
    fn test_builder() {
        let config = StorageConfig::new("/tmp/cache")
            .capacity(5)
            .file_name("other.snap")
            .snapshot_threshold(2);

        assert_eq!(config.max_entries(), 5);
        assert_eq!(config.threshold(), 2);
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/cache/other.snap"));
    }

    #[test]
    fn test_validate_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        StorageConfig::new(&nested).validate().unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            StorageConfig::new(dir.path()).capacity(0).validate(),
            Err(Error::InvalidCapacity(0))
        ));
        assert!(matches!(
            StorageConfig::new(dir.path()).snapshot_threshold(0).validate(),
            Err(Error::InvalidThreshold(0))
        ));
        for name in ["", "nested/cache.snap", "..", "/abs.snap"] {
            assert!(
                matches!(
                    StorageConfig::new(dir.path()).file_name(name).validate(),
                    Err(Error::InvalidFileName(_))
                ),
                "{:?} accepted",
                name
            );
        }
    }

    #[test]
    fn test_validate_rejects_file_as_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            StorageConfig::new(&file).validate(),
            Err(Error::StorageDirectory { .. })
        ));
    }
}
