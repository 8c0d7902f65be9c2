//! Error types for stalewise

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for stalewise operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache configuration, snapshots and header values
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// Parse error (header value, HTTP date or snapshot contents)
    Parse(String),

    /// Capacity must be at least one entry
    InvalidCapacity(usize),

    /// Snapshot threshold must be at least one write
    InvalidThreshold(u64),

    /// Snapshot file name is empty or not a plain file name
    InvalidFileName(String),

    /// Storage directory is missing and could not be created
    StorageDirectory {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying failure
        source: io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::InvalidCapacity(capacity) => {
                write!(f, "Invalid capacity: {} (must be at least 1 entry)", capacity)
            }
            Error::InvalidThreshold(threshold) => {
                write!(f, "Invalid snapshot threshold: {} (must be at least 1 write)", threshold)
            }
            Error::InvalidFileName(name) => write!(f, "Invalid snapshot file name: {:?}", name),
            Error::StorageDirectory { path, source } => {
                write!(f, "Storage directory {} is unusable: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::StorageDirectory { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        Error::Parse(format!("{:?}", err))
    }
}

impl From<nom::Err<nom::error::Error<&str>>> for Error {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        Error::Parse(format!("{:?}", err))
    }
}
