//! Recursive export of a key into a plain nested map.
//!
//! The result ([`RegMap`]) holds no handles and no backend reference, so it can
//! be compared, stored or serialized freely.

use crate::backend::RegistryBackend;
use crate::error::{RegistryError, Result};
use crate::key::{Child, OpenKey};
use crate::value::{RegValue, ValueData};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Exported key: child name to subtree or value.
pub type RegMap = BTreeMap<String, Entry>;

/// One entry of an exported key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Entry {
    /// An exported subkey.
    Key(RegMap),

    /// Value data (the default).
    Data(ValueData),

    /// The full value, when [`ExportOptions::keep_type`] is set.
    Typed(RegValue),
}

impl Entry {
    /// Returns the nested map of a subkey entry.
    pub fn as_map(&self) -> Option<&RegMap> {
        match self {
            Entry::Key(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the data of a value entry.
    pub fn as_data(&self) -> Option<&ValueData> {
        match self {
            Entry::Data(data) => Some(data),
            Entry::Typed(value) => Some(value.data()),
            Entry::Key(_) => None,
        }
    }
}

/// What to keep when a subkey and a value share a name under one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCollision {
    /// Keep the subkey.
    #[default]
    PreferSubkey,

    /// Keep the value.
    PreferValue,

    /// Fail with [`RegistryError::NameCollision`].
    Error,
}

/// Options for [`OpenKey::to_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    /// Export whole values ([`Entry::Typed`]) instead of bare data.
    pub keep_type: bool,

    /// Policy for names used by both a subkey and a value.
    pub collisions: NameCollision,
}

impl ExportOptions {
    /// Sets [`ExportOptions::keep_type`].
    pub fn keep_type(mut self, keep_type: bool) -> Self {
        self.keep_type = keep_type;
        self
    }

    /// Sets [`ExportOptions::collisions`].
    pub fn collisions(mut self, collisions: NameCollision) -> Self {
        self.collisions = collisions;
        self
    }
}

impl<'b, B: RegistryBackend> OpenKey<'b, B> {
    /// Exports this key and everything beneath it.
    ///
    /// Each subkey is opened and closed in turn, so at most the chain from
    /// this key to the deepest descendant being read holds handles. A subkey
    /// deleted between enumeration and opening is skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use winregal::{Entry, ExportOptions, Hive, MemoryRegistry, RegValue, ValueData};
    ///
    /// # fn main() -> winregal::Result<()> {
    /// let registry = MemoryRegistry::new();
    /// registry.set_value(Hive::CurrentUser, "SOFTWARE\\Demo", RegValue::new("a", "x"));
    /// registry.create_key(Hive::CurrentUser, "SOFTWARE\\Demo\\Child");
    ///
    /// let map = winregal::open(&registry, "HKEY_CURRENT_USER\\SOFTWARE\\Demo")?
    ///     .to_map(&ExportOptions::default())?;
    /// assert_eq!(map["a"], Entry::Data(ValueData::String("x".into())));
    /// assert!(map["Child"].as_map().unwrap().is_empty());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, options), fields(key = %self.key()))]
    pub fn to_map(&self, options: &ExportOptions) -> Result<RegMap> {
        let mut map = RegMap::new();
        for child in self.children()? {
            match child? {
                Child::Subkey(key) => {
                    let subtree = match key.open(self.backend()) {
                        Ok(open) => open.to_map(options)?,
                        Err(RegistryError::NotFound { path }) => {
                            warn!(%path, "Subkey vanished during export");
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    map.insert(key.name().to_string(), Entry::Key(subtree));
                }
                Child::Value(value) => {
                    let name = value.name().to_string();
                    if matches!(map.get(&name), Some(Entry::Key(_))) {
                        match options.collisions {
                            NameCollision::PreferSubkey => {
                                debug!(%name, "Value shadowed by subkey");
                                continue;
                            }
                            NameCollision::PreferValue => {}
                            NameCollision::Error => {
                                return Err(RegistryError::NameCollision {
                                    path: self.key().to_string(),
                                    name,
                                });
                            }
                        }
                    }
                    let entry = if options.keep_type {
                        Entry::Typed(value)
                    } else {
                        Entry::Data(value.into_parts().1)
                    };
                    map.insert(name, entry);
                }
            }
        }
        Ok(map)
    }

    /// Exports this key as a JSON document.
    #[cfg(feature = "serde")]
    pub fn to_json(&self, options: &ExportOptions) -> Result<String> {
        let map = self.to_map(options)?;
        Ok(serde_json::to_string_pretty(&map)?)
    }
}
