//! In-memory registry backend with handle accounting.
//!
//! [`MemoryRegistry`] behaves like the native registry as far as the wrapper
//! can observe: names match case-insensitively, enumeration follows insertion
//! order and every handle is resolved against the live tree on each call, so
//! changes made while a key is open show up in later calls.
//!
//! The mutators (`create_key`, `set_value`, ...) stand in for other processes
//! editing the registry; the wrapper itself never writes.

use crate::backend::{KeyInfo, RegistryBackend};
use crate::error::{RegistryError, Result};
use crate::hive::{full_path, Hive, PATH_SEPARATOR};
use crate::value::RegValue;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Handle counters collected by [`MemoryRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleStats {
    /// Calls to `open`, successful or not.
    pub open_calls: usize,

    /// Handles successfully acquired.
    pub opened: usize,

    /// Handles released.
    pub closed: usize,

    /// Largest number of handles open at the same time.
    pub peak: usize,
}

impl HandleStats {
    /// Handles acquired but not yet released.
    pub fn live(&self) -> usize {
        self.opened - self.closed
    }
}

/// Handle to a key in a [`MemoryRegistry`].
#[derive(Debug)]
pub struct MemoryHandle {
    id: u64,
    hive: Hive,
    segments: Vec<String>,
}

#[derive(Debug, Default)]
struct Node {
    subkeys: Vec<(String, Node)>,
    values: Vec<RegValue>,
    denied: bool,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.subkeys
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, node)| node)
    }
}

#[derive(Debug, Default)]
struct Inner {
    roots: HashMap<Hive, Node>,
    next_id: u64,
    live: HashSet<u64>,
    stats: HandleStats,
}

impl Inner {
    fn resolve<S: AsRef<str>>(&self, hive: Hive, segments: &[S]) -> Option<&Node> {
        let mut node = self.roots.get(&hive)?;
        for segment in segments {
            node = node.child(segment.as_ref())?;
        }
        Some(node)
    }

    fn resolve_handle(&self, handle: &MemoryHandle) -> Result<&Node> {
        self.resolve(handle.hive, &handle.segments[..]).ok_or_else(|| {
            RegistryError::Os(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "key {} was deleted while open",
                    full_path(handle.hive, &handle.segments.join("\\"))
                ),
            ))
        })
    }

    fn resolve_mut(&mut self, hive: Hive, segments: &[&str]) -> Option<&mut Node> {
        let mut node = self.roots.get_mut(&hive)?;
        for segment in segments {
            node = node
                .subkeys
                .iter_mut()
                .find(|(n, _)| n.eq_ignore_ascii_case(segment))
                .map(|(_, child)| child)?;
        }
        Some(node)
    }

    fn create(&mut self, hive: Hive, segments: &[&str]) -> &mut Node {
        let mut node = self.roots.entry(hive).or_default();
        for segment in segments {
            let pos = match node.subkeys.iter().position(|(n, _)| n.eq_ignore_ascii_case(segment)) {
                Some(pos) => pos,
                None => {
                    node.subkeys.push((segment.to_string(), Node::default()));
                    node.subkeys.len() - 1
                }
            };
            node = &mut node.subkeys[pos].1;
        }
        node
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// An in-memory stand-in for the OS registry.
///
/// # Examples
///
/// ```
/// use winregal::{Hive, MemoryRegistry, RegKey, RegValue};
///
/// # fn main() -> winregal::Result<()> {
/// let registry = MemoryRegistry::new();
/// registry.set_value(Hive::CurrentUser, "SOFTWARE\\Demo", RegValue::new("a", "x"));
///
/// let key: RegKey = "HKEY_CURRENT_USER\\SOFTWARE\\Demo".parse()?;
/// let value = key.with_open(&registry, |open| open.value("a"))?;
/// assert_eq!(value.data().as_str(), Some("x"));
/// assert_eq!(registry.stats().live(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryRegistry {
    inner: Mutex<Inner>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Creates a registry with every predefined hive present and empty.
    pub fn new() -> Self {
        let mut inner = Inner::default();
        for hive in Hive::ALL {
            inner.roots.insert(hive, Node::default());
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory registry lock poisoned")
    }

    /// Creates `path` beneath `hive`, including missing intermediate keys.
    pub fn create_key(&self, hive: Hive, path: &str) {
        self.lock().create(hive, &split(path));
    }

    /// Stores `value` under `path`, creating the key if needed.
    ///
    /// An existing value with the same name (ignoring case) is replaced in place.
    pub fn set_value(&self, hive: Hive, path: &str, value: RegValue) {
        let mut inner = self.lock();
        let node = inner.create(hive, &split(path));
        match node
            .values
            .iter_mut()
            .find(|v| v.name().eq_ignore_ascii_case(value.name()))
        {
            Some(slot) => *slot = value,
            None => node.values.push(value),
        }
    }

    /// Deletes the key at `path` and everything beneath it.
    ///
    /// Returns false if the key did not exist. Hive roots cannot be deleted.
    pub fn delete_key(&self, hive: Hive, path: &str) -> bool {
        let segments = split(path);
        let Some((last, parent)) = segments.split_last() else {
            return false;
        };
        let mut inner = self.lock();
        let Some(parent) = inner.resolve_mut(hive, parent) else {
            return false;
        };
        let before = parent.subkeys.len();
        parent.subkeys.retain(|(n, _)| !n.eq_ignore_ascii_case(last));
        parent.subkeys.len() != before
    }

    /// Deletes the value `name` from the key at `path`.
    pub fn delete_value(&self, hive: Hive, path: &str, name: &str) -> bool {
        let mut inner = self.lock();
        let Some(node) = inner.resolve_mut(hive, &split(path)) else {
            return false;
        };
        let before = node.values.len();
        node.values.retain(|v| !v.name().eq_ignore_ascii_case(name));
        node.values.len() != before
    }

    /// Makes opening the key at `path` fail with access denied.
    pub fn deny_access(&self, hive: Hive, path: &str) {
        self.lock().create(hive, &split(path)).denied = true;
    }

    /// Returns a snapshot of the handle counters.
    pub fn stats(&self) -> HandleStats {
        self.lock().stats
    }
}

impl RegistryBackend for MemoryRegistry {
    type Handle = MemoryHandle;

    fn open(&self, hive: Hive, path: &str) -> Result<MemoryHandle> {
        let mut inner = self.lock();
        inner.stats.open_calls += 1;

        let segments = split(path);
        match inner.resolve(hive, &segments[..]) {
            None => return Err(RegistryError::not_found(full_path(hive, path))),
            Some(node) if node.denied => {
                return Err(RegistryError::PermissionDenied {
                    path: full_path(hive, path),
                })
            }
            Some(_) => {}
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.live.insert(id);
        inner.stats.opened += 1;
        inner.stats.peak = inner.stats.peak.max(inner.live.len());
        trace!(id, hive = %hive, path, "memory handle opened");

        Ok(MemoryHandle {
            id,
            hive,
            segments: segments.into_iter().map(str::to_string).collect(),
        })
    }

    fn info(&self, handle: &MemoryHandle) -> Result<KeyInfo> {
        let inner = self.lock();
        let node = inner.resolve_handle(handle)?;
        Ok(KeyInfo {
            subkey_count: node.subkeys.len() as u32,
            value_count: node.values.len() as u32,
            last_written: None,
        })
    }

    fn enum_key(&self, handle: &MemoryHandle, index: u32) -> Result<Option<String>> {
        let inner = self.lock();
        let node = inner.resolve_handle(handle)?;
        Ok(node.subkeys.get(index as usize).map(|(name, _)| name.clone()))
    }

    fn enum_value(&self, handle: &MemoryHandle, index: u32) -> Result<Option<RegValue>> {
        let inner = self.lock();
        let node = inner.resolve_handle(handle)?;
        Ok(node.values.get(index as usize).cloned())
    }

    fn query_value(&self, handle: &MemoryHandle, name: &str) -> Result<Option<RegValue>> {
        let inner = self.lock();
        let node = inner.resolve_handle(handle)?;
        Ok(node
            .values
            .iter()
            .find(|v| v.name().eq_ignore_ascii_case(name))
            .cloned())
    }

    fn close(&self, handle: MemoryHandle) {
        let mut inner = self.lock();
        if inner.live.remove(&handle.id) {
            inner.stats.closed += 1;
            trace!(id = handle.id, "memory handle closed");
        }
    }
}
