//! Registry values: type codes, decoded data and the named value holder.

use crate::error::{RegistryError, Result};
use crate::utils::{read_utf16_multi_string, read_utf16_string};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Cursor;

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value type.
    None,

    /// String (null-terminated).
    String,

    /// String with environment variables.
    ExpandString,

    /// Binary data.
    Binary,

    /// 32-bit little-endian integer.
    Dword,

    /// 32-bit big-endian integer.
    DwordBigEndian,

    /// Symbolic link (Unicode).
    Link,

    /// Multiple strings.
    MultiString,

    /// Resource list.
    ResourceList,

    /// Full resource descriptor.
    FullResourceDescriptor,

    /// Resource requirements list.
    ResourceRequirementsList,

    /// 64-bit little-endian integer.
    Qword,

    /// Non-standard value type, holding the raw code.
    Unknown(u32),
}

impl ValueType {
    /// Maps a raw `REG_*` code to a value type.
    ///
    /// Codes 0-11 are predefined. Applications may store any other code, which
    /// is kept as [`ValueType::Unknown`].
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            _ => ValueType::Unknown(value),
        }
    }

    /// Returns the raw `REG_*` code.
    pub fn code(&self) -> u32 {
        match self {
            ValueType::None => 0,
            ValueType::String => 1,
            ValueType::ExpandString => 2,
            ValueType::Binary => 3,
            ValueType::Dword => 4,
            ValueType::DwordBigEndian => 5,
            ValueType::Link => 6,
            ValueType::MultiString => 7,
            ValueType::ResourceList => 8,
            ValueType::FullResourceDescriptor => 9,
            ValueType::ResourceRequirementsList => 10,
            ValueType::Qword => 11,
            ValueType::Unknown(value) => *value,
        }
    }

    /// Returns the name of this value type.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ValueType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Decoded registry value data.
///
/// Serializes untagged, so an exported tree reads as plain JSON: strings,
/// numbers, arrays of strings and arrays of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum ValueData {
    /// No data.
    None,

    /// String value.
    String(String),

    /// Expandable string value.
    ExpandString(String),

    /// Binary data.
    Binary(Vec<u8>),

    /// 32-bit integer.
    Dword(u32),

    /// 32-bit big-endian integer.
    DwordBigEndian(u32),

    /// Multiple strings.
    MultiString(Vec<String>),

    /// 64-bit integer.
    Qword(u64),

    /// Raw bytes of a type without a dedicated decoding.
    Unknown(Vec<u8>),
}

impl ValueData {
    /// Decodes raw value bytes according to the value type.
    ///
    /// # Arguments
    ///
    /// * `name` - Value name, for error reporting.
    /// * `data` - Raw value bytes as returned by the OS.
    /// * `value_type` - Type of the value.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TruncatedData`] if a numeric value is shorter
    /// than its width. Zero-length data is not truncated: it decodes to the
    /// empty form of its type, and to 0 for the numeric types.
    pub fn parse(name: &str, data: &[u8], value_type: ValueType) -> Result<Self> {
        match value_type {
            ValueType::None => Ok(ValueData::None),

            ValueType::String => Ok(ValueData::String(read_utf16_string(data))),

            ValueType::ExpandString => Ok(ValueData::ExpandString(read_utf16_string(data))),

            ValueType::Binary => Ok(ValueData::Binary(data.to_vec())),

            ValueType::Dword if data.is_empty() => Ok(ValueData::Dword(0)),

            ValueType::Dword => {
                check_width(name, data, 4)?;
                let mut cursor = Cursor::new(data);
                Ok(ValueData::Dword(cursor.read_u32::<LittleEndian>()?))
            }

            ValueType::DwordBigEndian if data.is_empty() => Ok(ValueData::DwordBigEndian(0)),

            ValueType::DwordBigEndian => {
                check_width(name, data, 4)?;
                let mut cursor = Cursor::new(data);
                Ok(ValueData::DwordBigEndian(cursor.read_u32::<BigEndian>()?))
            }

            ValueType::Qword if data.is_empty() => Ok(ValueData::Qword(0)),

            ValueType::Qword => {
                check_width(name, data, 8)?;
                let mut cursor = Cursor::new(data);
                Ok(ValueData::Qword(cursor.read_u64::<LittleEndian>()?))
            }

            ValueType::MultiString => Ok(ValueData::MultiString(read_utf16_multi_string(data))),

            _ => Ok(ValueData::Unknown(data.to_vec())),
        }
    }

    /// Returns the value type this data is naturally stored as.
    ///
    /// [`ValueData::Unknown`] carries no type code and maps to
    /// [`ValueType::Binary`]; build such values with [`RegValue::with_type`]
    /// or [`RegValue::from_raw`] to keep the real code.
    pub fn value_type(&self) -> ValueType {
        match self {
            ValueData::None => ValueType::None,
            ValueData::String(_) => ValueType::String,
            ValueData::ExpandString(_) => ValueType::ExpandString,
            ValueData::Binary(_) => ValueType::Binary,
            ValueData::Dword(_) => ValueType::Dword,
            ValueData::DwordBigEndian(_) => ValueType::DwordBigEndian,
            ValueData::MultiString(_) => ValueType::MultiString,
            ValueData::Qword(_) => ValueType::Qword,
            ValueData::Unknown(_) => ValueType::Binary,
        }
    }

    /// Returns the string for `REG_SZ` and `REG_EXPAND_SZ` data.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueData::String(s) | ValueData::ExpandString(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer for either DWORD flavour.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ValueData::Dword(d) | ValueData::DwordBigEndian(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the integer for QWORD data, widening DWORDs.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ValueData::Qword(q) => Some(*q),
            ValueData::Dword(d) | ValueData::DwordBigEndian(d) => Some(u64::from(*d)),
            _ => None,
        }
    }

    /// Returns the strings of `REG_MULTI_SZ` data.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ValueData::MultiString(strings) => Some(strings),
            _ => None,
        }
    }

    /// Returns the bytes of binary or undecoded data.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ValueData::Binary(b) | ValueData::Unknown(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueData::None => f.write_str("(none)"),
            ValueData::String(s) | ValueData::ExpandString(s) => f.write_str(s),
            ValueData::Binary(b) | ValueData::Unknown(b) => write!(f, "{:02X?}", b),
            ValueData::Dword(d) | ValueData::DwordBigEndian(d) => write!(f, "{} (0x{:08X})", d, d),
            ValueData::Qword(q) => write!(f, "{} (0x{:016X})", q, q),
            ValueData::MultiString(strings) => f.write_str(&strings.join(", ")),
        }
    }
}

impl From<&str> for ValueData {
    fn from(s: &str) -> Self {
        ValueData::String(s.to_string())
    }
}

impl From<String> for ValueData {
    fn from(s: String) -> Self {
        ValueData::String(s)
    }
}

impl From<u32> for ValueData {
    fn from(d: u32) -> Self {
        ValueData::Dword(d)
    }
}

impl From<u64> for ValueData {
    fn from(q: u64) -> Self {
        ValueData::Qword(q)
    }
}

impl From<Vec<String>> for ValueData {
    fn from(strings: Vec<String>) -> Self {
        ValueData::MultiString(strings)
    }
}

impl From<Vec<u8>> for ValueData {
    fn from(bytes: Vec<u8>) -> Self {
        ValueData::Binary(bytes)
    }
}

fn check_width(name: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(RegistryError::TruncatedData {
            name: name.to_string(),
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// A named value read from a registry key.
///
/// Owned by whoever read it; it keeps no reference to the parent key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegValue {
    name: String,
    data: ValueData,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    value_type: ValueType,
}

impl RegValue {
    /// Creates a value whose type follows from the data variant.
    ///
    /// See [`ValueData::value_type`] for the one lossy case,
    /// [`ValueData::Unknown`].
    pub fn new(name: impl Into<String>, data: impl Into<ValueData>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            value_type: data.value_type(),
            data,
        }
    }

    /// Creates a value with an explicit type code.
    pub fn with_type(name: impl Into<String>, data: ValueData, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            data,
            value_type,
        }
    }

    /// Decodes a value from the raw bytes and type code the OS reports.
    pub fn from_raw(name: impl Into<String>, bytes: &[u8], type_code: u32) -> Result<Self> {
        let name = name.into();
        let value_type = ValueType::from_u32(type_code);
        let data = ValueData::parse(&name, bytes, value_type)?;
        Ok(Self {
            name,
            data,
            value_type,
        })
    }

    /// Returns the value name. The default value has an empty name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the decoded data.
    pub fn data(&self) -> &ValueData {
        &self.data
    }

    /// Returns the registry type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Splits the value into name, data and type.
    pub fn into_parts(self) -> (String, ValueData, ValueType) {
        (self.name, self.data, self.value_type)
    }
}

impl fmt::Display for RegValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) = {}", self.name, self.value_type, self.data)
    }
}
