//! # winregal
//!
//! Read the Windows Registry like a map: open a key path, iterate its subkeys
//! and values, look children up by name and export whole subtrees. Handles are
//! acquired and released automatically.
//!
//! ## Features
//!
//! - **Scoped handles**: an [`OpenKey`] owns its OS handle and releases it
//!   exactly once when dropped, on every exit path
//! - **Tagged children**: enumeration yields [`Child::Subkey`] or
//!   [`Child::Value`], lookups return a [`Lookup`]
//! - **Export**: [`OpenKey::to_map`] builds a nested [`RegMap`] that serializes
//!   to plain JSON (feature `serde`, on by default)
//! - **Test double**: [`MemoryRegistry`] serves the same API from memory and
//!   counts handles
//!
//! ## Architecture
//!
//! ```text
//! "HKEY_CURRENT_USER\Software\Demo"
//!         |  RegKey::parse
//!         v
//!      RegKey  (hive + subpath, no handle)
//!         |  open / with_open
//!         v
//!      OpenKey ---- RegistryBackend ----+-- WindowsRegistry (winreg)
//!         |                             +-- MemoryRegistry
//!         +-- children() -> Child::{Subkey, Value}
//!         +-- lookup()   -> Lookup::{Value, Subkey, NotFound}
//!         +-- to_map()   -> RegMap
//! ```
//!
//! ## Examples
//!
//! ### Enumerating a key
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> winregal::Result<()> {
//! use winregal::{Child, RegKey, WindowsRegistry};
//!
//! let key: RegKey =
//!     r"HKEY_CURRENT_USER\Software\Microsoft\Windows\CurrentVersion\Explorer\RunMRU".parse()?;
//! key.with_open(&WindowsRegistry, |open| {
//!     for child in open.children()? {
//!         match child? {
//!             Child::Subkey(sub) => println!("[{}]", sub.name()),
//!             Child::Value(value) => println!("{}", value),
//!         }
//!     }
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ### Looking a name up
//!
//! ```
//! use winregal::{Hive, Lookup, MemoryRegistry, RegValue};
//!
//! # fn main() -> winregal::Result<()> {
//! let registry = MemoryRegistry::new();
//! registry.set_value(Hive::LocalMachine, r"SOFTWARE\Vendor", RegValue::new("Version", 3u32));
//!
//! let open = winregal::open(&registry, r"HKLM\SOFTWARE\Vendor")?;
//! match open.lookup("Version")? {
//!     Lookup::Value(value) => assert_eq!(value.data().as_u32(), Some(3)),
//!     other => panic!("unexpected {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! Read-only. Creating, writing or deleting keys and values, and connecting to
//! remote registries, are not supported.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod export;
pub mod hive;
pub mod key;
pub mod memory;
pub mod utils;
pub mod value;

#[cfg(windows)]
pub mod windows;

// Re-export main types for convenience
pub use backend::{KeyInfo, RegistryBackend};
pub use error::{RegistryError, Result};
pub use export::{Entry, ExportOptions, NameCollision, RegMap};
pub use hive::Hive;
pub use key::{open, Child, Children, Lookup, OpenKey, RegKey, Subkeys, Values};
pub use memory::{HandleStats, MemoryHandle, MemoryRegistry};
pub use value::{RegValue, ValueData, ValueType};

#[cfg(windows)]
pub use windows::WindowsRegistry;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
