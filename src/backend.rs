//! The seam between the wrapper and the operating system's registry API.
//!
//! [`RegistryBackend`] exposes the handful of native calls the wrapper is built
//! on. [`crate::WindowsRegistry`] forwards them to the real registry and
//! [`crate::MemoryRegistry`] serves them from an in-memory tree for tests.

use crate::error::Result;
use crate::hive::Hive;
use crate::value::RegValue;
use chrono::{DateTime, Utc};

/// Counts and timestamp reported for an open key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyInfo {
    /// Number of direct subkeys.
    pub subkey_count: u32,

    /// Number of values.
    pub value_count: u32,

    /// Last time the key was written, if the backend reports one.
    pub last_written: Option<DateTime<Utc>>,
}

/// Native registry operations.
///
/// Handles are owned values: [`RegistryBackend::close`] consumes them, so a
/// handle cannot be released twice.
pub trait RegistryBackend {
    /// Opaque handle to an open key.
    type Handle;

    /// Opens `path` beneath `hive` with read access.
    ///
    /// Must fail with [`crate::RegistryError::NotFound`] for a missing path and
    /// [`crate::RegistryError::PermissionDenied`] when access is denied.
    fn open(&self, hive: Hive, path: &str) -> Result<Self::Handle>;

    /// Queries subkey and value counts.
    fn info(&self, handle: &Self::Handle) -> Result<KeyInfo>;

    /// Returns the name of the subkey at `index`, or `None` past the end.
    fn enum_key(&self, handle: &Self::Handle, index: u32) -> Result<Option<String>>;

    /// Returns the value at `index`, or `None` past the end.
    fn enum_value(&self, handle: &Self::Handle, index: u32) -> Result<Option<RegValue>>;

    /// Reads the value called `name`, or `None` if there is no such value.
    fn query_value(&self, handle: &Self::Handle, name: &str) -> Result<Option<RegValue>>;

    /// Releases the handle.
    fn close(&self, handle: Self::Handle);
}
