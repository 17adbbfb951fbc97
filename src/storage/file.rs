//! File-backed store for host (development) builds.
//!
//! Each namespace lives in its own JSON object file so the layout matches the
//! NVS namespaces on the device. Uses `~/.ble-config-esp32/` by default, or the
//! directory named by `BLE_CONFIG_HOME`.

use super::{KeyValueStore, StorageError};
use log::{debug, info};
use serde_json::{Map, Number, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "BLE_CONFIG_HOME";

/// JSON-file key-value store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store in `$BLE_CONFIG_HOME`, falling back to `~/.ble-config-esp32`.
    pub fn default_location() -> io::Result<Self> {
        if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
            return Ok(Self::new(dir));
        }
        let home = std::env::var("HOME")
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self::new(PathBuf::from(home).join(".ble-config-esp32")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.root.join(format!("{}.json", namespace))
    }

    fn read_namespace(&self, namespace: &str) -> Result<Map<String, Value>, StorageError> {
        let path = self.namespace_path(namespace);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No namespace file at {:?}", path);
                return Ok(Map::new());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Corrupted(format!(
                "{:?} is not a JSON object",
                path
            ))),
            Err(e) => Err(StorageError::Corrupted(format!("{:?}: {}", path, e))),
        }
    }

    fn write_value(&mut self, namespace: &str, key: &str, value: Value) -> Result<(), StorageError> {
        let mut map = self.read_namespace(namespace)?;
        map.insert(key.to_string(), value);

        fs::create_dir_all(&self.root)?;
        let path = self.namespace_path(namespace);
        let text = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;
        fs::write(&path, text)?;
        debug!("Stored {}/{} in {:?}", namespace, key, path);
        Ok(())
    }

    fn read_value(&self, namespace: &str, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_namespace(namespace)?.remove(key))
    }

    /// Delete every namespace file.
    pub fn clear(&mut self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                info!("Cleared stored state in {:?}", self.root);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn mismatch(key: &str) -> StorageError {
    StorageError::TypeMismatch {
        key: key.to_string(),
    }
}

impl KeyValueStore for FileStore {
    fn get_str(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        match self.read_value(namespace, key)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_value(namespace, key, Value::String(value.to_string()))
    }

    fn get_i32(&self, namespace: &str, key: &str) -> Result<Option<i32>, StorageError> {
        match self.read_value(namespace, key)? {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| mismatch(key)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StorageError> {
        self.write_value(namespace, key, Value::Number(value.into()))
    }

    fn get_bool(&self, namespace: &str, key: &str) -> Result<Option<bool>, StorageError> {
        match self.read_value(namespace, key)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError> {
        self.write_value(namespace, key, Value::Bool(value))
    }

    fn get_f32(&self, namespace: &str, key: &str) -> Result<Option<f32>, StorageError> {
        match self.read_value(namespace, key)? {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(|v| Some(v as f32))
                .ok_or_else(|| mismatch(key)),
            Some(_) => Err(mismatch(key)),
        }
    }

    fn set_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError> {
        let number = Number::from_f64(f64::from(value)).ok_or_else(|| {
            StorageError::Corrupted(format!("non-finite value for key '{}'", key))
        })?;
        self.write_value(namespace, key, Value::Number(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Counter to ensure unique test directories even in parallel execution
    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_store() -> FileStore {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pid = std::process::id();
        FileStore::new(env::temp_dir().join(format!("ble-config-test-{}-{}", pid, id)))
    }

    #[test]
    fn test_typed_roundtrip() {
        let mut store = unique_store();
        store.set_str("config", "deviceName", "Sensor").unwrap();
        store.set_i32("config", "refreshRate", 10_000).unwrap();
        store.set_bool("config", "ledEnabled", false).unwrap();
        store.set_f32("config", "calFactor", 2.5).unwrap();

        assert_eq!(
            store.get_str("config", "deviceName").unwrap().as_deref(),
            Some("Sensor")
        );
        assert_eq!(store.get_i32("config", "refreshRate").unwrap(), Some(10_000));
        assert_eq!(store.get_bool("config", "ledEnabled").unwrap(), Some(false));
        assert_eq!(store.get_f32("config", "calFactor").unwrap(), Some(2.5));

        store.clear().unwrap();
    }

    #[test]
    fn test_missing_namespace_reads_empty() {
        let store = unique_store();
        assert!(store.get_str("wifi-config", "ssid").unwrap().is_none());
    }

    #[test]
    fn test_namespaces_use_separate_files() {
        let mut store = unique_store();
        store.set_str("config", "wifiSSID", "Home").unwrap();
        store.set_str("wifi-config", "ssid", "Home").unwrap();
        assert!(store.root().join("config.json").exists());
        assert!(store.root().join("wifi-config.json").exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupted_file_is_reported() {
        let store = unique_store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("config.json"), "[1, 2").unwrap();
        let result = store.get_str("config", "deviceName");
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
        let _ = fs::remove_dir_all(store.root());
    }
}
