//! Error types for registry access.
//!
//! Every failure the wrapper can report is a [`RegistryError`]. Errors from the
//! operating system are classified into the variants callers usually match on
//! (missing key, access denied) and everything else is kept as [`io::Error`].

use std::io;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while opening, enumerating or reading registry keys.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The first path segment is not a predefined root hive.
    #[error("Unknown root hive: {name:?}")]
    InvalidRoot {
        /// The segment that failed to resolve.
        name: String,
    },

    /// The key path does not exist.
    #[error("Registry key not found: {path}")]
    NotFound {
        /// Full path of the key, including the hive.
        path: String,
    },

    /// The key exists but cannot be opened for reading.
    #[error("Access denied: {path}")]
    PermissionDenied {
        /// Full path of the key, including the hive.
        path: String,
    },

    /// A name looked up under an open key is neither a value nor a subkey.
    #[error("No value or subkey named {name:?}")]
    KeyNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// A subkey and a value share a name and the export policy forbids it.
    #[error("Subkey and value share the name {name:?} under {path}")]
    NameCollision {
        /// Full path of the parent key.
        path: String,
        /// The shared name.
        name: String,
    },

    /// Value data is shorter than its declared type requires.
    #[error("Truncated data in value {name:?}: expected {expected} bytes, got {actual} bytes")]
    TruncatedData {
        /// Name of the value being decoded.
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Any other error reported by the operating system.
    #[error("OS error: {0}")]
    Os(#[from] io::Error),

    /// Serializing an exported tree failed.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Creates an invalid root error for the given hive segment.
    pub fn invalid_root(name: &str) -> Self {
        Self::InvalidRoot {
            name: name.to_string(),
        }
    }

    /// Creates a not found error for a key path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a lookup error for a child name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use winregal::RegistryError;
    /// let err = RegistryError::key_not_found("DisplayName");
    /// assert!(err.is_key_not_found());
    /// ```
    pub fn key_not_found(name: &str) -> Self {
        Self::KeyNotFound {
            name: name.to_string(),
        }
    }

    /// Classifies an OS error raised while opening `path`.
    ///
    /// `ErrorKind::NotFound` and `ErrorKind::PermissionDenied` become their
    /// dedicated variants, anything else is kept as [`RegistryError::Os`].
    pub fn from_os(err: io::Error, path: impl Into<String>) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path: path.into() },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path.into() },
            _ => Self::Os(err),
        }
    }

    /// Returns true if the error means the key path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the error came from a failed name lookup.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}
