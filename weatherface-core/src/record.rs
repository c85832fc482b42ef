//! Change records received from the companion device
//!
//! The companion writes one postcard-encoded `ChangeRecord` per GATT write
//! to the sync characteristic. A record names the path that changed and
//! carries a small map of named fields.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

/// Maximum length of a record path
pub const PATH_LEN: usize = 16;
/// Maximum length of a field name
pub const KEY_LEN: usize = 16;
/// Maximum length of a text field value
pub const TEXT_LEN: usize = 32;
/// Maximum number of fields per record
pub const MAX_FIELDS: usize = 6;

/// Opaque handle to a blob held by the companion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AssetRef(pub u32);

/// Value stored under a field name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldValue {
    Double(f64),
    Long(i64),
    Text(String<TEXT_LEN>),
    Asset(AssetRef),
    /// Explicitly cleared field
    Null,
}

/// A single "data changed" notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChangeRecord {
    path: String<PATH_LEN>,
    fields: Vec<(String<KEY_LEN>, FieldValue), MAX_FIELDS>,
}

/// Record errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Wire bytes are not a valid record
    Malformed,
    /// Path or key does not fit
    TooLong,
    /// Record already holds `MAX_FIELDS` fields
    TooManyFields,
}

/// Payload asking the companion to write the current record for `path` again
///
/// Sent on connect, so a watch that was reset or out of range shows the
/// latest data without waiting for the next change on the phone.
pub fn sync_request(path: &str) -> Result<Vec<u8, PATH_LEN>, Error> {
    Vec::from_slice(path.as_bytes()).map_err(|_| Error::TooLong)
}

impl ChangeRecord {
    /// Create an empty record for `path`
    pub fn new(path: &str) -> Result<Self, Error> {
        let mut owned = String::new();
        owned.push_str(path).map_err(|_| Error::TooLong)?;
        Ok(Self {
            path: owned,
            fields: Vec::new(),
        })
    }

    /// Decode a record from its postcard wire form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        postcard::from_bytes(bytes).map_err(|_| Error::Malformed)
    }

    /// Encode into `buf`, returning the used prefix
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], Error> {
        postcard::to_slice(self, buf).map_err(|_| Error::TooLong)
    }

    /// Set a field, replacing an existing value with the same name
    pub fn insert(&mut self, key: &str, value: FieldValue) -> Result<(), Error> {
        if let Some((_, slot)) = self.fields.iter_mut().find(|(k, _)| k == key) {
            *slot = value;
            return Ok(());
        }
        let mut owned = String::new();
        owned.push_str(key).map_err(|_| Error::TooLong)?;
        self.fields
            .push((owned, value))
            .map_err(|_| Error::TooManyFields)
    }

    /// Builder form of `insert`
    pub fn with(mut self, key: &str, value: FieldValue) -> Result<Self, Error> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw field lookup
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Numeric field as `f64`; `None` when absent or not numeric
    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            FieldValue::Double(value) => Some(*value),
            FieldValue::Long(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Asset field; `None` when absent, null or of another kind
    pub fn get_asset(&self, key: &str) -> Option<AssetRef> {
        match self.get(key)? {
            FieldValue::Asset(asset) => Some(*asset),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}
