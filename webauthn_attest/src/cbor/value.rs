use std::fmt;

use crate::buffer::ByteBuffer;

use super::errors::CborError;

/// A decoded CBOR data item.
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Unsigned(u64),
    /// Negative integer stored as its raw argument `n`; the value is `-1 - n`.
    Negative(u64),
    Bytes(ByteBuffer),
    Text(String),
    Array(Vec<CborValue>),
    Map(CborMap),
    Bool(bool),
    Null,
    /// Simple values other than false/true/null (including undefined, 23).
    Simple(u8),
    Float(f64),
}

impl CborValue {
    /// Builds an integer item, choosing the major type from the sign.
    pub fn integer(value: i64) -> Self {
        if value >= 0 {
            CborValue::Unsigned(value as u64)
        } else {
            CborValue::Negative((-1 - value) as u64)
        }
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        CborValue::Bytes(ByteBuffer::new(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        CborValue::Text(value.into())
    }

    /// Integer value if it fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CborValue::Unsigned(n) => i64::try_from(*n).ok(),
            CborValue::Negative(n) => i64::try_from(*n).ok().map(|n| -1 - n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CborValue::Unsigned(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&ByteBuffer> {
        match self {
            CborValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&CborMap> {
        match self {
            CborValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CborValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CborValue::Null)
    }

    /// Short human readable name of the item type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CborValue::Unsigned(_) | CborValue::Negative(_) => "integer",
            CborValue::Bytes(_) => "byte string",
            CborValue::Text(_) => "text string",
            CborValue::Array(_) => "array",
            CborValue::Map(_) => "map",
            CborValue::Bool(_) => "boolean",
            CborValue::Null => "null",
            CborValue::Simple(_) => "simple value",
            CborValue::Float(_) => "float",
        }
    }
}

impl From<CborMap> for CborValue {
    fn from(map: CborMap) -> Self {
        CborValue::Map(map)
    }
}

/// Map key. WebAuthn structures only use integer and text keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CborMapKey {
    Int(i64),
    Text(String),
}

impl CborMapKey {
    pub(super) fn from_value(value: CborValue) -> Result<Self, CborError> {
        match value {
            CborValue::Text(s) => Ok(CborMapKey::Text(s)),
            ref v @ (CborValue::Unsigned(_) | CborValue::Negative(_)) => v
                .as_i64()
                .map(CborMapKey::Int)
                .ok_or_else(|| CborError::InvalidMapKey("integer out of range".to_string())),
            other => Err(CborError::InvalidMapKey(other.type_name().to_string())),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborMapKey::Text(s) => Some(s),
            CborMapKey::Int(_) => None,
        }
    }
}

impl fmt::Display for CborMapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CborMapKey::Int(n) => write!(f, "{n}"),
            CborMapKey::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for CborMapKey {
    fn from(value: i64) -> Self {
        CborMapKey::Int(value)
    }
}

impl From<&str> for CborMapKey {
    fn from(value: &str) -> Self {
        CborMapKey::Text(value.to_string())
    }
}

impl From<String> for CborMapKey {
    fn from(value: String) -> Self {
        CborMapKey::Text(value)
    }
}

/// Insertion-ordered CBOR map with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CborMap {
    entries: Vec<(CborMapKey, CborValue)>,
}

impl CborMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value. A replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<CborMapKey>, value: CborValue) -> Option<CborValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<CborMapKey>, value: CborValue) -> Self {
        self.insert(key, value);
        self
    }

    pub(super) fn insert_unique(
        &mut self,
        key: CborMapKey,
        value: CborValue,
    ) -> Result<(), CborError> {
        if self.contains_key(&key) {
            return Err(CborError::DuplicateKey(key.to_string()));
        }
        self.entries.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &CborMapKey) -> Option<&CborValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_int(&self, key: i64) -> Option<&CborValue> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, CborMapKey::Int(n) if *n == key))
            .map(|(_, v)| v)
    }

    pub fn get_text(&self, key: &str) -> Option<&CborValue> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, CborMapKey::Text(s) if s == key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &CborMapKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CborMapKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CborMapKey, &CborValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the map with entries reordered into canonical encoding order.
    pub fn to_canonical(&self) -> CborMap {
        let mut entries: Vec<(Vec<u8>, (CborMapKey, CborValue))> = self
            .entries
            .iter()
            .map(|(k, v)| (super::encoder::encode_key(k), (k.clone(), v.clone())))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        CborMap {
            entries: entries.into_iter().map(|(_, e)| e).collect(),
        }
    }
}
