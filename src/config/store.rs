//! Persisted configuration.
//!
//! [`ConfigStore`] owns the live [`ConfigRecord`] and the backend it is
//! persisted to. Two namespaces are written:
//!
//! ```text
//! config       deviceName refreshRate ledEnabled sensorUpdate calFactor wifiSSID wifiPass
//! wifi-config  ssid password
//! ```

use super::record::{ConfigPatch, ConfigRecord, UpdateReport, WireRecord};
use crate::identity;
use crate::storage::{KeyValueStore, StorageError};
use crate::wifi::WifiCredentials;
use log::{debug, info, warn};

/// Namespace holding the configuration record.
pub const CONFIG_NAMESPACE: &str = "config";

/// Namespace holding the WiFi credentials.
pub const WIFI_NAMESPACE: &str = "wifi-config";

// NVS keys are limited to 15 characters.
const KEY_DEVICE_NAME: &str = "deviceName";
const KEY_REFRESH_RATE: &str = "refreshRate";
const KEY_LED_ENABLED: &str = "ledEnabled";
const KEY_SENSOR_INTERVAL: &str = "sensorUpdate";
const KEY_CALIBRATION: &str = "calFactor";
const KEY_WIFI_SSID: &str = "wifiSSID";
const KEY_WIFI_PASSWORD: &str = "wifiPass";
const KEY_SSID: &str = "ssid";
const KEY_PASSWORD: &str = "password";

/// Live configuration plus its persistence backend.
pub struct ConfigStore<S> {
    store: S,
    record: ConfigRecord,
}

/// Read a value, treating backend errors as a missing key.
fn read_or_none<T>(result: Result<Option<T>, StorageError>, key: &str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring stored '{}': {}", key, e);
            None
        }
    }
}

impl<S: KeyValueStore> ConfigStore<S> {
    /// Load persisted values over the defaults and fix the device id.
    ///
    /// Missing or unreadable keys keep their defaults. Stored values go
    /// through the same validation as client updates.
    pub fn load(store: S, mac: [u8; 6]) -> Self {
        let mut record = ConfigRecord::new(identity::format_device_id(&mac));
        let ns = CONFIG_NAMESPACE;

        if let Some(name) = read_or_none(store.get_str(ns, KEY_DEVICE_NAME), KEY_DEVICE_NAME) {
            record.set_device_name(&name);
        }
        if let Some(rate) = read_or_none(store.get_i32(ns, KEY_REFRESH_RATE), KEY_REFRESH_RATE) {
            record.set_refresh_rate(i64::from(rate));
        }
        if let Some(led) = read_or_none(store.get_bool(ns, KEY_LED_ENABLED), KEY_LED_ENABLED) {
            record.set_led_enabled(led);
        }
        if let Some(interval) =
            read_or_none(store.get_i32(ns, KEY_SENSOR_INTERVAL), KEY_SENSOR_INTERVAL)
        {
            record.set_sensor_update_interval(i64::from(interval));
        }
        if let Some(factor) = read_or_none(store.get_f32(ns, KEY_CALIBRATION), KEY_CALIBRATION) {
            record.set_calibration_factor(f64::from(factor));
        }
        if let Some(ssid) = read_or_none(store.get_str(ns, KEY_WIFI_SSID), KEY_WIFI_SSID) {
            record.set_wifi_ssid(&ssid);
        }
        if let Some(password) =
            read_or_none(store.get_str(ns, KEY_WIFI_PASSWORD), KEY_WIFI_PASSWORD)
        {
            record.set_wifi_password(&password);
        }

        // Credentials provisioned over the wire take precedence.
        if let Some(ssid) = read_or_none(store.get_str(WIFI_NAMESPACE, KEY_SSID), KEY_SSID) {
            record.set_wifi_ssid(&ssid);
            let password = read_or_none(store.get_str(WIFI_NAMESPACE, KEY_PASSWORD), KEY_PASSWORD);
            record.set_wifi_password(password.as_deref().unwrap_or(""));
        }

        info!(
            "Configuration loaded: name={}, id={}",
            record.device_name(),
            record.device_id()
        );
        Self { store, record }
    }

    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Backend access (diagnostics and tests).
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Apply a sparse update. Out-of-range fields are dropped and logged.
    ///
    /// Does not persist; callers persist once the whole update is applied.
    pub fn update(&mut self, patch: &ConfigPatch) -> UpdateReport {
        let report = self.record.apply(patch);
        if !report.rejected.is_empty() {
            warn!("Rejected config fields: {:?}", report.rejected);
        }
        debug!("Applied config fields: {:?}", report.applied);
        report
    }

    /// Store new WiFi credentials in the record and persist both namespaces.
    pub fn set_credentials(&mut self, credentials: &WifiCredentials) -> Result<(), StorageError> {
        self.record.set_wifi_ssid(credentials.ssid());
        self.record.set_wifi_password(credentials.password());
        self.persist()
    }

    /// Stored credentials, if an SSID is configured.
    pub fn credentials(&self) -> Option<WifiCredentials> {
        if self.record.wifi_ssid().is_empty() {
            return None;
        }
        Some(WifiCredentials::new(
            self.record.wifi_ssid(),
            self.record.wifi_password(),
        ))
    }

    /// Write every field to the backend. Idempotent.
    pub fn persist(&mut self) -> Result<(), StorageError> {
        let r = &self.record;
        let ns = CONFIG_NAMESPACE;
        self.store.set_str(ns, KEY_DEVICE_NAME, r.device_name())?;
        self.store
            .set_i32(ns, KEY_REFRESH_RATE, r.refresh_rate_ms() as i32)?;
        self.store.set_bool(ns, KEY_LED_ENABLED, r.led_enabled())?;
        self.store
            .set_i32(ns, KEY_SENSOR_INTERVAL, r.sensor_update_interval_secs() as i32)?;
        self.store
            .set_f32(ns, KEY_CALIBRATION, r.calibration_factor())?;
        self.store.set_str(ns, KEY_WIFI_SSID, r.wifi_ssid())?;
        self.store.set_str(ns, KEY_WIFI_PASSWORD, r.wifi_password())?;

        self.store.set_str(WIFI_NAMESPACE, KEY_SSID, r.wifi_ssid())?;
        self.store
            .set_str(WIFI_NAMESPACE, KEY_PASSWORD, r.wifi_password())?;

        debug!("Configuration persisted");
        Ok(())
    }

    /// Restore defaults (keeping the device id) and persist them.
    pub fn reset_to_defaults(&mut self) -> Result<(), StorageError> {
        self.record.reset_to_defaults();
        info!("Configuration reset to defaults");
        self.persist()
    }

    /// Sanitized projection with the password masked.
    pub fn to_wire_record(&self) -> WireRecord {
        self.record.to_wire_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PASSWORD_MASK;
    use crate::storage::MemoryStore;

    const MAC: [u8; 6] = [0x24, 0x6F, 0x28, 0x01, 0x02, 0x03];

    #[test]
    fn test_load_defaults_from_empty_store() {
        let config = ConfigStore::load(MemoryStore::new(), MAC);
        assert_eq!(config.record().device_name(), "ESP32_Device");
        assert_eq!(config.record().device_id(), "24:6F:28:01:02:03");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_load_overlays_persisted_values() {
        let mut store = MemoryStore::new();
        store.set_str(CONFIG_NAMESPACE, "deviceName", "Attic").unwrap();
        store.set_i32(CONFIG_NAMESPACE, "refreshRate", 2_000).unwrap();
        store.set_f32(CONFIG_NAMESPACE, "calFactor", 1.5).unwrap();

        let config = ConfigStore::load(store, MAC);
        assert_eq!(config.record().device_name(), "Attic");
        assert_eq!(config.record().refresh_rate_ms(), 2_000);
        assert_eq!(config.record().calibration_factor(), 1.5);
        assert_eq!(config.record().sensor_update_interval_secs(), 60);
    }

    #[test]
    fn test_load_rejects_out_of_range_persisted_values() {
        let mut store = MemoryStore::new();
        store.set_i32(CONFIG_NAMESPACE, "refreshRate", 10).unwrap();
        let config = ConfigStore::load(store, MAC);
        assert_eq!(config.record().refresh_rate_ms(), 5_000);
    }

    #[test]
    fn test_load_survives_type_mismatch() {
        let mut store = MemoryStore::new();
        store.set_str(CONFIG_NAMESPACE, "ledEnabled", "yes").unwrap();
        let config = ConfigStore::load(store, MAC);
        assert!(config.record().led_enabled());
    }

    #[test]
    fn test_wifi_namespace_takes_precedence() {
        let mut store = MemoryStore::new();
        store.set_str(CONFIG_NAMESPACE, "wifiSSID", "Old").unwrap();
        store.set_str(WIFI_NAMESPACE, "ssid", "New").unwrap();
        store.set_str(WIFI_NAMESPACE, "password", "pw").unwrap();
        let config = ConfigStore::load(store, MAC);
        let creds = config.credentials().unwrap();
        assert_eq!(creds.ssid(), "New");
        assert_eq!(creds.password(), "pw");
    }

    #[test]
    fn test_persist_then_reload() {
        let mut config = ConfigStore::load(MemoryStore::new(), MAC);
        let patch = ConfigPatch {
            device_name: Some("Garage".into()),
            sensor_update_interval: Some(30),
            led_enabled: Some(false),
            ..Default::default()
        };
        config.update(&patch);
        config.persist().unwrap();
        // Idempotent
        config.persist().unwrap();

        let reloaded = ConfigStore::load(config.backend().clone(), MAC);
        assert_eq!(reloaded.record(), config.record());
    }

    #[test]
    fn test_long_values_survive_reload() {
        let name = "n".repeat(300);
        let mut config = ConfigStore::load(MemoryStore::new(), MAC);
        let report = config.update(&ConfigPatch {
            device_name: Some(name.clone()),
            ..Default::default()
        });
        assert!(report.name_changed);
        config
            .set_credentials(&WifiCredentials::new("Home", &"p".repeat(63)))
            .unwrap();
        config.persist().unwrap();

        let reloaded = ConfigStore::load(config.backend().clone(), MAC);
        assert_eq!(reloaded.record().device_name(), name);
        assert_eq!(reloaded.record().wifi_password(), "p".repeat(63));
    }

    #[test]
    fn test_set_credentials_persists_both_namespaces() {
        let mut config = ConfigStore::load(MemoryStore::new(), MAC);
        config
            .set_credentials(&WifiCredentials::new("Home", "secret"))
            .unwrap();

        let store = config.backend();
        assert_eq!(
            store.get_str(WIFI_NAMESPACE, "ssid").unwrap().as_deref(),
            Some("Home")
        );
        assert_eq!(
            store.get_str(CONFIG_NAMESPACE, "wifiPass").unwrap().as_deref(),
            Some("secret")
        );
        let wire = config.to_wire_record();
        assert_eq!(wire.wifi_ssid, "Home");
        assert_eq!(wire.wifi_password, PASSWORD_MASK);
    }

    #[test]
    fn test_reset_to_defaults_persists() {
        let mut config = ConfigStore::load(MemoryStore::new(), MAC);
        config
            .set_credentials(&WifiCredentials::new("Home", "secret"))
            .unwrap();
        config.reset_to_defaults().unwrap();
        assert!(config.credentials().is_none());
        assert_eq!(
            config.backend().get_str(WIFI_NAMESPACE, "ssid").unwrap().as_deref(),
            Some("")
        );
    }
}
