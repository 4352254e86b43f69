//! Predefined root hives and registry path splitting.

use crate::error::{RegistryError, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between registry path segments.
pub const PATH_SEPARATOR: char = '\\';

/// One of the predefined registry root keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hive {
    /// `HKEY_CLASSES_ROOT` - file associations and COM registrations.
    ClassesRoot,

    /// `HKEY_CURRENT_USER` - settings of the logged on user.
    CurrentUser,

    /// `HKEY_LOCAL_MACHINE` - machine wide settings.
    LocalMachine,

    /// `HKEY_USERS` - all loaded user profiles.
    Users,

    /// `HKEY_CURRENT_CONFIG` - the current hardware profile.
    CurrentConfig,

    /// `HKEY_PERFORMANCE_DATA` - performance counters.
    PerformanceData,
}

impl Hive {
    /// All predefined hives, in declaration order.
    pub const ALL: [Hive; 6] = [
        Hive::ClassesRoot,
        Hive::CurrentUser,
        Hive::LocalMachine,
        Hive::Users,
        Hive::CurrentConfig,
        Hive::PerformanceData,
    ];

    /// Returns the canonical `HKEY_*` name.
    pub fn name(&self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::Users => "HKEY_USERS",
            Hive::CurrentConfig => "HKEY_CURRENT_CONFIG",
            Hive::PerformanceData => "HKEY_PERFORMANCE_DATA",
        }
    }

    /// Returns the short alias used by `reg.exe` and PowerShell.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKCR",
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
            Hive::Users => "HKU",
            Hive::CurrentConfig => "HKCC",
            Hive::PerformanceData => "HKPD",
        }
    }

    /// Resolves a hive from its full name or short alias, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRoot`] if `name` is not a known hive.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|hive| {
                hive.name().eq_ignore_ascii_case(name) || hive.abbreviation().eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| RegistryError::invalid_root(name))
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hive {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Splits a hive-prefixed path into its hive and the verbatim remainder.
///
/// `"HKEY_CURRENT_USER\Software\Demo"` becomes `(CurrentUser, "Software\Demo")`.
/// A bare hive name yields an empty subpath.
pub fn split_root(path: &str) -> Result<(Hive, &str)> {
    let (root, rest) = match path.split_once(PATH_SEPARATOR) {
        Some((root, rest)) => (root, rest),
        None => (path, ""),
    };
    Ok((Hive::from_name(root)?, rest))
}

/// Joins a parent subpath and a child name with the path separator.
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{}{}{}", parent, PATH_SEPARATOR, child)
    }
}

/// Formats `hive` and `path` as a single hive-prefixed path.
pub fn full_path(hive: Hive, path: &str) -> String {
    join_path(hive.name(), path)
}

/// Returns the last segment of a subpath.
pub fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}
