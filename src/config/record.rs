//! Device configuration record and its validation rules.
//!
//! This module contains platform-independent types that can be tested on the
//! host machine.
//!
//! # Example
//!
//! ```
//! use ble_config_esp32::config::ConfigRecord;
//!
//! let mut record = ConfigRecord::new("AA:BB:CC:DD:EE:FF");
//! assert!(record.set_refresh_rate(10_000));
//! assert!(!record.set_refresh_rate(500));
//! assert_eq!(record.refresh_rate_ms(), 10_000);
//! ```

use serde::Serialize;
use std::ops::RangeInclusive;

/// Token sent instead of a non-empty password.
pub const PASSWORD_MASK: &str = "****";

/// Allowed refresh interval in milliseconds.
pub const REFRESH_RATE_RANGE: RangeInclusive<i64> = 1_000..=60_000;

/// Allowed sensor update interval in seconds.
pub const SENSOR_INTERVAL_RANGE: RangeInclusive<i64> = 5..=3_600;

/// Upper bound of the calibration factor (the lower bound is exclusive zero).
pub const MAX_CALIBRATION_FACTOR: f64 = 10.0;

pub const DEFAULT_DEVICE_NAME: &str = "ESP32_Device";
pub const DEFAULT_REFRESH_RATE_MS: u32 = 5_000;
pub const DEFAULT_LED_ENABLED: bool = true;
pub const DEFAULT_SENSOR_INTERVAL_SECS: u32 = 60;
pub const DEFAULT_CALIBRATION_FACTOR: f32 = 1.0;

/// Validated device configuration.
///
/// Every setter validates its input and returns `false`, leaving the prior
/// value untouched, when the input is out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigRecord {
    device_name: String,
    device_id: String,
    refresh_rate_ms: u32,
    led_enabled: bool,
    sensor_update_interval_secs: u32,
    calibration_factor: f32,
    wifi_ssid: String,
    wifi_password: String,
}

impl ConfigRecord {
    /// Record with compiled-in defaults for the given device identifier.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            device_id: device_id.into(),
            refresh_rate_ms: DEFAULT_REFRESH_RATE_MS,
            led_enabled: DEFAULT_LED_ENABLED,
            sensor_update_interval_secs: DEFAULT_SENSOR_INTERVAL_SECS,
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            wifi_ssid: String::new(),
            wifi_password: String::new(),
        }
    }

    /// Reset every field to its default except the device identifier.
    pub fn reset_to_defaults(&mut self) {
        let device_id = std::mem::take(&mut self.device_id);
        *self = Self::new(device_id);
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn refresh_rate_ms(&self) -> u32 {
        self.refresh_rate_ms
    }

    pub fn led_enabled(&self) -> bool {
        self.led_enabled
    }

    pub fn sensor_update_interval_secs(&self) -> u32 {
        self.sensor_update_interval_secs
    }

    pub fn calibration_factor(&self) -> f32 {
        self.calibration_factor
    }

    pub fn wifi_ssid(&self) -> &str {
        &self.wifi_ssid
    }

    pub fn wifi_password(&self) -> &str {
        &self.wifi_password
    }

    /// Rejects an empty name.
    pub fn set_device_name(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.device_name = name.to_string();
        true
    }

    pub fn set_refresh_rate(&mut self, rate_ms: i64) -> bool {
        if !REFRESH_RATE_RANGE.contains(&rate_ms) {
            return false;
        }
        self.refresh_rate_ms = rate_ms as u32;
        true
    }

    pub fn set_led_enabled(&mut self, enabled: bool) -> bool {
        self.led_enabled = enabled;
        true
    }

    pub fn set_sensor_update_interval(&mut self, interval_secs: i64) -> bool {
        if !SENSOR_INTERVAL_RANGE.contains(&interval_secs) {
            return false;
        }
        self.sensor_update_interval_secs = interval_secs as u32;
        true
    }

    /// Accepts `(0, 10]`; NaN is rejected by the comparisons.
    pub fn set_calibration_factor(&mut self, factor: f64) -> bool {
        if !(factor > 0.0 && factor <= MAX_CALIBRATION_FACTOR) {
            return false;
        }
        self.calibration_factor = factor as f32;
        true
    }

    pub fn set_wifi_ssid(&mut self, ssid: &str) -> bool {
        self.wifi_ssid = ssid.to_string();
        true
    }

    pub fn set_wifi_password(&mut self, password: &str) -> bool {
        self.wifi_password = password.to_string();
        true
    }

    /// Sanitized projection served on the read characteristic.
    pub fn to_wire_record(&self) -> WireRecord {
        WireRecord {
            device_name: self.device_name.clone(),
            device_id: self.device_id.clone(),
            refresh_rate: self.refresh_rate_ms,
            led_enabled: self.led_enabled,
            sensor_update_interval: self.sensor_update_interval_secs,
            calibration_factor: self.calibration_factor,
            wifi_ssid: self.wifi_ssid.clone(),
            wifi_password: if self.wifi_password.is_empty() {
                String::new()
            } else {
                PASSWORD_MASK.to_string()
            },
        }
    }
}

/// Sanitized configuration as sent to clients. The password is masked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub device_name: String,
    pub device_id: String,
    pub refresh_rate: u32,
    pub led_enabled: bool,
    pub sensor_update_interval: u32,
    pub calibration_factor: f32,
    #[serde(rename = "wifiSSID")]
    pub wifi_ssid: String,
    pub wifi_password: String,
}

impl WireRecord {
    pub fn to_json(&self) -> Vec<u8> {
        // Plain strings, integers and a finite float: serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Sparse set of field assignments received in a config envelope.
///
/// Values are kept as received; range checks happen when the patch is applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConfigPatch {
    #[serde(rename = "deviceName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "refreshRate", skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<i64>,
    #[serde(rename = "ledEnabled", skip_serializing_if = "Option::is_none")]
    pub led_enabled: Option<bool>,
    #[serde(rename = "sensorUpdateInterval", skip_serializing_if = "Option::is_none")]
    pub sensor_update_interval: Option<i64>,
    #[serde(rename = "calibrationFactor", skip_serializing_if = "Option::is_none")]
    pub calibration_factor: Option<f64>,
    #[serde(rename = "wifiSSID", skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(rename = "wifiPassword", skip_serializing_if = "Option::is_none")]
    pub wifi_password: Option<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of applying a [`ConfigPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Wire names of fields that changed the record.
    pub applied: Vec<&'static str>,
    /// Wire names of fields dropped by validation.
    pub rejected: Vec<&'static str>,
    /// The advertised device name changed.
    pub name_changed: bool,
}

impl ConfigRecord {
    /// Apply each present field independently. Invalid fields are dropped.
    pub fn apply(&mut self, patch: &ConfigPatch) -> UpdateReport {
        let mut report = UpdateReport::default();
        let previous_name = self.device_name.clone();

        let mut record = |name: &'static str, ok: bool| {
            if ok {
                report.applied.push(name);
            } else {
                report.rejected.push(name);
            }
        };

        if let Some(name) = &patch.device_name {
            record("deviceName", self.set_device_name(name));
        }
        if let Some(rate) = patch.refresh_rate {
            record("refreshRate", self.set_refresh_rate(rate));
        }
        if let Some(enabled) = patch.led_enabled {
            record("ledEnabled", self.set_led_enabled(enabled));
        }
        if let Some(interval) = patch.sensor_update_interval {
            record("sensorUpdateInterval", self.set_sensor_update_interval(interval));
        }
        if let Some(factor) = patch.calibration_factor {
            record("calibrationFactor", self.set_calibration_factor(factor));
        }
        if let Some(ssid) = &patch.wifi_ssid {
            record("wifiSSID", self.set_wifi_ssid(ssid));
        }
        // A client echoing the masked value back leaves the stored password alone.
        if let Some(password) = patch.wifi_password.as_deref() {
            if password != PASSWORD_MASK {
                record("wifiPassword", self.set_wifi_password(password));
            }
        }

        report.name_changed = self.device_name != previous_name;
        report
    }
}
