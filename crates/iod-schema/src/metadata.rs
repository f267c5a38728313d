//! Package metadata record.
//!
//! Metadata is open-ended: producers may add any fields they like. Only a
//! handful of keys carry meaning for the container format itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MetadataError;

/// Mandatory, catalog-unique package name.
pub const NAME_FIELD: &str = "name";
/// Reserved: base64 SPKI bytes of the signer's public key, injected at signing.
pub const PUBLIC_KEY_FIELD: &str = "publicKey";
/// Installer file name (basename).
pub const INSTALLER_FIELD: &str = "installer";
/// Lowercase hex SHA-512 of the installer payload.
pub const INSTALLER_HASH_FIELD: &str = "installerHash";
/// Installer payload size in bytes.
pub const INSTALLER_SIZE_FIELD: &str = "installerSize";
/// Conventional version field (producer-defined, informational only).
pub const VERSION_FIELD: &str = "version";

/// An open key/value record describing one package.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageMetadata(Map<String, Value>);

impl PackageMetadata {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// A record holding only a name.
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(NAME_FIELD.to_string(), Value::String(name.into()));
        Self(map)
    }

    /// Wrap an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Convert a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::NotAnObject`] for any other JSON type.
    pub fn from_value(value: Value) -> Result<Self, MetadataError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(MetadataError::NotAnObject),
        }
    }

    /// Parse a serialized metadata block.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Malformed`] if the bytes are not UTF-8 JSON and
    /// [`MetadataError::NotAnObject`] if the JSON is not an object.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, MetadataError> {
        let value: Value = serde_json::from_slice(bytes).map_err(MetadataError::Malformed)?;
        Self::from_value(value)
    }

    /// Serialize to compact JSON. Key order is deterministic for a given record.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Serialize`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, MetadataError> {
        serde_json::to_vec(&self.0).map_err(MetadataError::Serialize)
    }

    /// The package name, if present as a non-empty string.
    pub fn name(&self) -> Option<&str> {
        self.str_field(NAME_FIELD).filter(|name| !name.is_empty())
    }

    /// The package name.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::MissingName`] if [`Self::name`] is `None`.
    pub fn require_name(&self) -> Result<&str, MetadataError> {
        self.name().ok_or(MetadataError::MissingName)
    }

    /// The embedded signer public key (base64).
    pub fn public_key(&self) -> Option<&str> {
        self.str_field(PUBLIC_KEY_FIELD)
    }

    /// The installer file name.
    pub fn installer(&self) -> Option<&str> {
        self.str_field(INSTALLER_FIELD)
    }

    /// The declared installer hash (hex).
    pub fn installer_hash(&self) -> Option<&str> {
        self.str_field(INSTALLER_HASH_FIELD)
    }

    /// The declared installer size.
    pub fn installer_size(&self) -> Option<u64> {
        self.0.get(INSTALLER_SIZE_FIELD).and_then(Value::as_u64)
    }

    /// The producer-defined version, if it is a string.
    pub fn version(&self) -> Option<&str> {
        self.str_field(VERSION_FIELD)
    }

    /// Look up any field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether `key` holds a value that counts as declared, see [`is_declared_value`].
    pub fn is_declared(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_declared_value)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Whether a field value counts as declared.
///
/// `null`, `false`, `0` and `""` are treated as absent: reconciliation
/// overwrites them with computed values instead of comparing against them.
pub fn is_declared_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<Map<String, Value>> for PackageMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
