//! NVS persistence for the configuration record.
//!
//! Values are stored in ESP32's Non-Volatile Storage so they persist across
//! reboots. Each namespace maps to one NVS namespace; keys must stay within
//! the 15-character NVS limit.

use super::{KeyValueStore, StorageError};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

/// NVS-backed store sharing one partition handle across namespaces.
pub struct NvsStore {
    partition: EspNvsPartition<NvsDefault>,
}

impl NvsStore {
    /// Wrap an already-taken default partition.
    ///
    /// The partition is shared with the WiFi driver, so it must be taken once
    /// by the caller and cloned.
    pub fn new(partition: EspNvsPartition<NvsDefault>) -> Self {
        Self { partition }
    }

    fn open(&self, namespace: &str) -> Result<EspNvs<NvsDefault>, StorageError> {
        Ok(EspNvs::new(self.partition.clone(), namespace, true)?)
    }
}

impl KeyValueStore for NvsStore {
    fn get_str(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        let nvs = self.open(namespace)?;
        let Some(len) = nvs.str_len(key)? else {
            return Ok(None);
        };
        // Room for the terminator whether or not `len` counts it.
        let mut buf = vec![0u8; len + 1];
        Ok(nvs.get_str(key, &mut buf)?.map(str::to_string))
    }

    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let mut nvs = self.open(namespace)?;
        nvs.set_str(key, value)?;
        Ok(())
    }

    fn get_i32(&self, namespace: &str, key: &str) -> Result<Option<i32>, StorageError> {
        Ok(self.open(namespace)?.get_i32(key)?)
    }

    fn set_i32(&mut self, namespace: &str, key: &str, value: i32) -> Result<(), StorageError> {
        self.open(namespace)?.set_i32(key, value)?;
        Ok(())
    }

    fn get_bool(&self, namespace: &str, key: &str) -> Result<Option<bool>, StorageError> {
        Ok(self.open(namespace)?.get_u8(key)?.map(|v| v != 0))
    }

    fn set_bool(&mut self, namespace: &str, key: &str, value: bool) -> Result<(), StorageError> {
        self.open(namespace)?.set_u8(key, u8::from(value))?;
        Ok(())
    }

    // NVS has no float type: the IEEE-754 bit pattern is stored as u32.
    fn get_f32(&self, namespace: &str, key: &str) -> Result<Option<f32>, StorageError> {
        Ok(self.open(namespace)?.get_u32(key)?.map(f32::from_bits))
    }

    fn set_f32(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError> {
        self.open(namespace)?.set_u32(key, value.to_bits())?;
        Ok(())
    }
}
