//! Key-value persistence backends.
//!
//! The configuration layer only sees [`KeyValueStore`]: typed get/put by
//! namespace and key. Backends:
//!
//! - [`NvsStore`] - ESP32 Non-Volatile Storage (ESP32 only)
//! - [`FileStore`] - one JSON file per namespace (host only)
//! - [`MemoryStore`] - in-process map, used by tests and ephemeral runs

#[cfg(not(target_os = "espidf"))]
mod file;
#[cfg(feature = "esp32")]
mod nvs;

#[cfg(not(target_os = "espidf"))]
pub use file::FileStore;
#[cfg(feature = "esp32")]
pub use nvs::NvsStore;

use std::collections::HashMap;
use std::fmt;

/// Typed key-value storage split into namespaces.
///
/// Getters return `Ok(None)` for a missing key. A key stored with a different
/// type than requested is reported as [`StorageError::TypeMismatch`].
pub trait KeyValueStore {
    fn get_str(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError>;
    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError>;

    fn get_i32(&self, namespace: &str, key: &str) -> Result<Option<i32>, StorageError>;
    fn set_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StorageError>;

    fn get_bool(&self, namespace: &str, key: &str) -> Result<Option<bool>, StorageError>;
    fn set_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError>;

    fn get_f32(&self, namespace: &str, key: &str) -> Result<Option<f32>, StorageError>;
    fn set_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError>;
}

/// Errors reported by storage backends.
#[derive(Debug)]
pub enum StorageError {
    /// Stored value has a different type than requested.
    TypeMismatch { key: String },
    /// Stored data could not be decoded.
    Corrupted(String),
    /// Filesystem error (host backend).
    Io(std::io::Error),
    /// ESP-IDF NVS error.
    #[cfg(feature = "esp32")]
    Nvs(esp_idf_sys::EspError),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { key } => write!(f, "type mismatch for key '{}'", key),
            Self::Corrupted(msg) => write!(f, "corrupted storage: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            #[cfg(feature = "esp32")]
            Self::Nvs(e) => write!(f, "NVS error: {:?}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for StorageError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Nvs(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Str(String),
    I32(i32),
    Bool(bool),
    F32(f32),
}

/// Volatile store keeping everything in a map.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<(String, String), StoredValue>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Whether `key` exists in `namespace`.
    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .contains_key(&(namespace.to_string(), key.to_string()))
    }

    fn get(&self, namespace: &str, key: &str) -> Option<&StoredValue> {
        self.entries.get(&(namespace.to_string(), key.to_string()))
    }

    fn put(&mut self, namespace: &str, key: &str, value: StoredValue) {
        self.entries
            .insert((namespace.to_string(), key.to_string()), value);
        self.writes += 1;
    }
}

fn mismatch(key: &str) -> StorageError {
    StorageError::TypeMismatch {
        key: key.to_string(),
    }
}

impl KeyValueStore for MemoryStore {
    fn get_str(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(namespace, key, StoredValue::Str(value.to_string()));
        Ok(())
    }

    fn get_i32(&self, namespace: &str, key: &str) -> Result<Option<i32>, StorageError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::I32(v)) => Ok(Some(*v)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StorageError> {
        self.put(namespace, key, StoredValue::I32(value));
        Ok(())
    }

    fn get_bool(&self, namespace: &str, key: &str) -> Result<Option<bool>, StorageError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::Bool(v)) => Ok(Some(*v)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError> {
        self.put(namespace, key, StoredValue::Bool(value));
        Ok(())
    }

    fn get_f32(&self, namespace: &str, key: &str) -> Result<Option<f32>, StorageError> {
        match self.get(namespace, key) {
            None => Ok(None),
            Some(StoredValue::F32(v)) => Ok(Some(*v)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError> {
        self.put(namespace, key, StoredValue::F32(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_missing_key() {
        let store = MemoryStore::new();
        assert!(store.get_str("config", "deviceName").unwrap().is_none());
        assert!(store.get_i32("config", "refreshRate").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_namespaces_are_independent() {
        let mut store = MemoryStore::new();
        store.set_str("config", "wifiSSID", "Home").unwrap();
        store.set_str("wifi-config", "ssid", "Office").unwrap();
        assert_eq!(
            store.get_str("config", "wifiSSID").unwrap().as_deref(),
            Some("Home")
        );
        assert!(store.get_str("wifi-config", "wifiSSID").unwrap().is_none());
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_memory_store_type_mismatch() {
        let mut store = MemoryStore::new();
        store.set_i32("config", "refreshRate", 5000).unwrap();
        let result = store.get_str("config", "refreshRate");
        assert!(matches!(result, Err(StorageError::TypeMismatch { .. })));
    }
}
