//! Registry keys: addressing, scoped handles, enumeration and lookup.

use crate::backend::{KeyInfo, RegistryBackend};
use crate::error::{RegistryError, Result};
use crate::hive::{full_path, join_path, last_segment, split_root, Hive, PATH_SEPARATOR};
use crate::value::RegValue;
use std::fmt;
use std::iter::FilterMap;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Address of a registry key: a root hive plus the subpath beneath it.
///
/// A `RegKey` holds no OS handle. Call [`RegKey::open`] or
/// [`RegKey::with_open`] to get an [`OpenKey`] that does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegKey {
    hive: Hive,
    path: String,
}

impl RegKey {
    /// Creates a key from an explicit hive and subpath.
    ///
    /// A single leading separator is ignored, so `"\SOFTWARE"` and
    /// `"SOFTWARE"` address the same key.
    pub fn new(hive: Hive, path: &str) -> Self {
        let path = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
        Self {
            hive,
            path: path.to_string(),
        }
    }

    /// Parses a hive-prefixed path such as
    /// `HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Explorer\RunMRU`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRoot`] if the first segment is not a
    /// predefined hive. No registry call is made.
    pub fn parse(path: &str) -> Result<Self> {
        let (hive, rest) = split_root(path)?;
        Ok(Self {
            hive,
            path: rest.to_string(),
        })
    }

    /// Returns the root hive.
    pub fn hive(&self) -> Hive {
        self.hive
    }

    /// Returns the subpath beneath the hive.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the last path segment, or the hive name for a hive root.
    pub fn name(&self) -> &str {
        if self.path.is_empty() {
            self.hive.name()
        } else {
            last_segment(&self.path)
        }
    }

    /// Returns the key addressed by `name` directly beneath this one.
    pub fn child(&self, name: &str) -> RegKey {
        RegKey {
            hive: self.hive,
            path: join_path(&self.path, name),
        }
    }

    /// Returns the key at `sub_path` relative to this one.
    pub fn subkey(&self, sub_path: &str) -> RegKey {
        let sub_path = sub_path.strip_prefix(PATH_SEPARATOR).unwrap_or(sub_path);
        self.child(sub_path)
    }

    /// Opens the key with read access.
    ///
    /// The handle is released when the returned [`OpenKey`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the key does not exist and
    /// [`RegistryError::PermissionDenied`] if it cannot be read.
    #[instrument(skip(self, backend), fields(key = %self))]
    pub fn open<'b, B: RegistryBackend>(&self, backend: &'b B) -> Result<OpenKey<'b, B>> {
        let handle = backend.open(self.hive, &self.path)?;
        debug!("Acquired registry handle");
        Ok(OpenKey {
            key: self.clone(),
            backend,
            handle: Some(handle),
        })
    }

    /// Opens the key, runs `f` on it and releases the handle.
    ///
    /// The handle is released whether `f` returns `Ok`, returns `Err` or panics.
    pub fn with_open<B, T, F>(&self, backend: &B, f: F) -> Result<T>
    where
        B: RegistryBackend,
        F: FnOnce(&OpenKey<'_, B>) -> Result<T>,
    {
        let open = self.open(backend)?;
        f(&open)
    }
}

impl fmt::Display for RegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&full_path(self.hive, &self.path))
    }
}

impl FromStr for RegKey {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parses `path` and opens it in one step.
///
/// # Examples
///
/// ```
/// use winregal::{Hive, MemoryRegistry};
///
/// # fn main() -> winregal::Result<()> {
/// let registry = MemoryRegistry::new();
/// registry.create_key(Hive::LocalMachine, "SOFTWARE\\Vendor");
///
/// let key = winregal::open(&registry, "HKLM\\SOFTWARE\\Vendor")?;
/// assert_eq!(key.key().name(), "Vendor");
/// # Ok(())
/// # }
/// ```
pub fn open<'b, B: RegistryBackend>(backend: &'b B, path: &str) -> Result<OpenKey<'b, B>> {
    RegKey::parse(path)?.open(backend)
}

/// One child of a registry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    /// A subkey, not yet opened.
    Subkey(RegKey),

    /// A value.
    Value(RegValue),
}

impl Child {
    /// Returns the child's name within its parent.
    pub fn name(&self) -> &str {
        match self {
            Child::Subkey(key) => key.name(),
            Child::Value(value) => value.name(),
        }
    }
}

/// Result of [`OpenKey::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The name resolved to a value.
    Value(RegValue),

    /// The name resolved to a subkey; the key is not opened.
    Subkey(RegKey),

    /// The name is neither a value nor a subkey.
    NotFound,
}

impl Lookup {
    /// Converts into a [`Child`], failing with `KeyNotFound` for `NotFound`.
    pub fn into_child(self, name: &str) -> Result<Child> {
        match self {
            Lookup::Value(value) => Ok(Child::Value(value)),
            Lookup::Subkey(key) => Ok(Child::Subkey(key)),
            Lookup::NotFound => Err(RegistryError::key_not_found(name)),
        }
    }
}

/// A registry key with a live OS handle.
///
/// The handle is owned exclusively by this guard and released exactly once,
/// in `Drop`.
pub struct OpenKey<'b, B: RegistryBackend> {
    key: RegKey,
    backend: &'b B,
    handle: Option<B::Handle>,
}

impl<'b, B: RegistryBackend> OpenKey<'b, B> {
    /// Returns the address of this key.
    pub fn key(&self) -> &RegKey {
        &self.key
    }

    /// Returns the backend this key was opened on.
    pub fn backend(&self) -> &'b B {
        self.backend
    }

    fn handle(&self) -> &B::Handle {
        // Only `Drop` takes the handle.
        self.handle.as_ref().expect("registry handle used after release")
    }

    /// Queries subkey and value counts.
    pub fn info(&self) -> Result<KeyInfo> {
        self.backend.info(self.handle())
    }

    /// Enumerates subkeys, then values.
    ///
    /// Bounds are fixed by the counts reported when enumeration starts.
    /// Entries removed by another process in the meantime end the sequence
    /// early; entries added are not picked up. Calling `children` again
    /// re-reads the live key.
    pub fn children(&self) -> Result<Children<'_, 'b, B>> {
        let info = self.info()?;
        debug!(
            key = %self.key,
            subkeys = info.subkey_count,
            values = info.value_count,
            "Enumerating children"
        );
        Ok(Children {
            key: self,
            phase: Phase::Subkeys,
            index: 0,
            subkey_count: info.subkey_count,
            value_count: info.value_count,
            values_wanted: true,
            pending: None,
        })
    }

    /// Enumerates only the subkeys.
    pub fn subkeys(&self) -> Result<Subkeys<'_, 'b, B>> {
        let mut children = self.children()?;
        children.values_wanted = false;
        Ok(children.filter_map(only_subkey as fn(_) -> _))
    }

    /// Enumerates only the values.
    pub fn values(&self) -> Result<Values<'_, 'b, B>> {
        let mut children = self.children()?;
        children.phase = Phase::Values;
        Ok(children.filter_map(only_value as fn(_) -> _))
    }

    /// Reads the value called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyNotFound`] if there is no such value.
    pub fn value(&self, name: &str) -> Result<RegValue> {
        self.backend
            .query_value(self.handle(), name)?
            .ok_or_else(|| RegistryError::key_not_found(name))
    }

    /// Returns the direct subkey called `name`, unopened.
    ///
    /// Use [`RegKey::subkey`] to address a relative path.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyNotFound`] if there is no such subkey,
    /// including for an empty name or one containing a separator.
    pub fn subkey(&self, name: &str) -> Result<RegKey> {
        match self.probe_subkey(name)? {
            Some(key) => Ok(key),
            None => Err(RegistryError::key_not_found(name)),
        }
    }

    fn probe_subkey(&self, name: &str) -> Result<Option<RegKey>> {
        // Only a single path segment names a direct child; the OS would happily
        // open the key itself for "" and a grandchild for "a\b".
        if name.is_empty() || name.contains(PATH_SEPARATOR) {
            return Ok(None);
        }
        let child = self.key.child(name);
        match self.backend.open(child.hive, &child.path) {
            Ok(handle) => {
                self.backend.close(handle);
                Ok(Some(child))
            }
            Err(RegistryError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolves `name` as a value first, then as a subkey.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn lookup(&self, name: &str) -> Result<Lookup> {
        if let Some(value) = self.backend.query_value(self.handle(), name)? {
            debug!("Resolved as value");
            return Ok(Lookup::Value(value));
        }
        match self.probe_subkey(name)? {
            Some(key) => {
                debug!("Resolved as subkey");
                Ok(Lookup::Subkey(key))
            }
            None => Ok(Lookup::NotFound),
        }
    }

    /// Returns the value or subkey called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KeyNotFound`] if `name` is neither.
    pub fn get(&self, name: &str) -> Result<Child> {
        self.lookup(name)?.into_child(name)
    }

    /// Visits every descendant depth-first.
    ///
    /// `visit` receives the depth (1 for direct children) and the child. Each
    /// subkey is opened after it has been visited and closed before its next
    /// sibling, so only the chain of ancestors holds handles.
    #[instrument(skip(self, visit), fields(key = %self.key))]
    pub fn walk<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, &Child) -> Result<()>,
    {
        self.walk_inner(1, &mut visit)
    }

    fn walk_inner<F>(&self, depth: usize, visit: &mut F) -> Result<()>
    where
        F: FnMut(usize, &Child) -> Result<()>,
    {
        for child in self.children()? {
            let child = child?;
            visit(depth, &child)?;
            if let Child::Subkey(key) = &child {
                key.with_open(self.backend, |open| open.walk_inner(depth + 1, visit))?;
            }
        }
        Ok(())
    }
}

impl<B: RegistryBackend> Drop for OpenKey<'_, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.backend.close(handle);
            debug!(key = %self.key, "Released registry handle");
        }
    }
}

impl<B: RegistryBackend> fmt::Debug for OpenKey<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenKey").field("key", &self.key).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Subkeys,
    Values,
    Done,
}

/// Lazy enumeration of an open key's subkeys followed by its values.
///
/// Created by [`OpenKey::children`]. After an error the iterator is exhausted.
pub struct Children<'k, 'b, B: RegistryBackend> {
    key: &'k OpenKey<'b, B>,
    phase: Phase,
    index: u32,
    subkey_count: u32,
    value_count: u32,
    values_wanted: bool,
    pending: Option<RegistryError>,
}

impl<B: RegistryBackend> Children<'_, '_, B> {
    fn finish_subkeys(&mut self) {
        self.phase = if self.values_wanted { Phase::Values } else { Phase::Done };
        self.index = 0;
    }
}

impl<B: RegistryBackend> Iterator for Children<'_, '_, B> {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            self.phase = Phase::Done;
            return Some(Err(e));
        }
        loop {
            match self.phase {
                Phase::Subkeys => {
                    if self.index >= self.subkey_count {
                        self.finish_subkeys();
                        continue;
                    }
                    match self.key.backend.enum_key(self.key.handle(), self.index) {
                        Ok(Some(name)) => {
                            self.index += 1;
                            return Some(Ok(Child::Subkey(self.key.key.child(&name))));
                        }
                        Ok(None) => self.finish_subkeys(),
                        Err(e) => {
                            self.phase = Phase::Done;
                            return Some(Err(e));
                        }
                    }
                }
                Phase::Values => {
                    if self.index >= self.value_count {
                        self.phase = Phase::Done;
                        continue;
                    }
                    match self.key.backend.enum_value(self.key.handle(), self.index) {
                        Ok(Some(value)) => {
                            self.index += 1;
                            return Some(Ok(Child::Value(value)));
                        }
                        Ok(None) => self.phase = Phase::Done,
                        Err(e) => {
                            self.phase = Phase::Done;
                            return Some(Err(e));
                        }
                    }
                }
                Phase::Done => return None,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.pending.is_some() {
            return (1, Some(1));
        }
        let values = if self.values_wanted { self.value_count } else { 0 };
        let remaining = match self.phase {
            Phase::Subkeys => (self.subkey_count - self.index) + values,
            Phase::Values => self.value_count - self.index,
            Phase::Done => 0,
        };
        (0, Some(remaining as usize))
    }
}

/// Subkeys of an open key, created by [`OpenKey::subkeys`].
pub type Subkeys<'k, 'b, B> =
    FilterMap<Children<'k, 'b, B>, fn(Result<Child>) -> Option<Result<RegKey>>>;

/// Values of an open key, created by [`OpenKey::values`].
pub type Values<'k, 'b, B> =
    FilterMap<Children<'k, 'b, B>, fn(Result<Child>) -> Option<Result<RegValue>>>;

fn only_subkey(child: Result<Child>) -> Option<Result<RegKey>> {
    match child {
        Ok(Child::Subkey(key)) => Some(Ok(key)),
        Ok(Child::Value(_)) => None,
        Err(e) => Some(Err(e)),
    }
}

fn only_value(child: Result<Child>) -> Option<Result<RegValue>> {
    match child {
        Ok(Child::Value(value)) => Some(Ok(value)),
        Ok(Child::Subkey(_)) => None,
        Err(e) => Some(Err(e)),
    }
}

impl<'k, 'b, B: RegistryBackend> IntoIterator for &'k OpenKey<'b, B> {
    type Item = Result<Child>;
    type IntoIter = Children<'k, 'b, B>;

    /// Same as [`OpenKey::children`], except that a failure to query the key's
    /// counts is yielded as the first and only item.
    fn into_iter(self) -> Self::IntoIter {
        match self.children() {
            Ok(children) => children,
            Err(e) => Children {
                key: self,
                phase: Phase::Done,
                index: 0,
                subkey_count: 0,
                value_count: 0,
                values_wanted: true,
                pending: Some(e),
            },
        }
    }
}
