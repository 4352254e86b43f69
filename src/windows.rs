//! Native backend over the `winreg` crate.

use crate::backend::{KeyInfo, RegistryBackend};
use crate::error::{RegistryError, Result};
use crate::hive::{full_path, Hive};
use crate::utils::filetime_to_datetime;
use crate::value::RegValue;
use std::io;
use winreg::enums::{
    HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    HKEY_PERFORMANCE_DATA, HKEY_USERS, KEY_READ,
};
use winreg::RegKey;

/// `ERROR_NO_MORE_ITEMS`: enumeration index past the last entry.
const ERROR_NO_MORE_ITEMS: i32 = 259;

/// The local machine's registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    fn predef(hive: Hive) -> RegKey {
        match hive {
            Hive::ClassesRoot => RegKey::predef(HKEY_CLASSES_ROOT),
            Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
            Hive::Users => RegKey::predef(HKEY_USERS),
            Hive::CurrentConfig => RegKey::predef(HKEY_CURRENT_CONFIG),
            Hive::PerformanceData => RegKey::predef(HKEY_PERFORMANCE_DATA),
        }
    }
}

fn is_end_of_enumeration(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_NO_MORE_ITEMS)
}

impl RegistryBackend for WindowsRegistry {
    type Handle = RegKey;

    fn open(&self, hive: Hive, path: &str) -> Result<RegKey> {
        Self::predef(hive)
            .open_subkey_with_flags(path, KEY_READ)
            .map_err(|e| RegistryError::from_os(e, full_path(hive, path)))
    }

    fn info(&self, handle: &RegKey) -> Result<KeyInfo> {
        let meta = handle.query_info()?;
        let filetime = (u64::from(meta.last_write_time.dwHighDateTime) << 32)
            | u64::from(meta.last_write_time.dwLowDateTime);
        Ok(KeyInfo {
            subkey_count: meta.sub_keys as u32,
            value_count: meta.values as u32,
            last_written: filetime_to_datetime(filetime),
        })
    }

    fn enum_key(&self, handle: &RegKey, index: u32) -> Result<Option<String>> {
        match handle.enum_keys().nth(index as usize) {
            None => Ok(None),
            Some(Ok(name)) => Ok(Some(name)),
            Some(Err(e)) if is_end_of_enumeration(&e) => Ok(None),
            Some(Err(e)) => Err(e.into()),
        }
    }

    fn enum_value(&self, handle: &RegKey, index: u32) -> Result<Option<RegValue>> {
        match handle.enum_values().nth(index as usize) {
            None => Ok(None),
            Some(Ok((name, raw))) => {
                RegValue::from_raw(name, &raw.bytes[..], raw.vtype.clone() as u32).map(Some)
            }
            Some(Err(e)) if is_end_of_enumeration(&e) => Ok(None),
            Some(Err(e)) => Err(e.into()),
        }
    }

    fn query_value(&self, handle: &RegKey, name: &str) -> Result<Option<RegValue>> {
        match handle.get_raw_value(name) {
            Ok(raw) => RegValue::from_raw(name, &raw.bytes[..], raw.vtype.clone() as u32).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self, handle: RegKey) {
        drop(handle);
    }
}
