//! Inbound messages written by the companion app.
//!
//! A write carries one flat JSON object. Its keys select the kind:
//!
//! - `{"command": "scan_wifi"}` - a command
//! - `{"wifi_ssid": "...", "wifi_password": "..."}` - WiFi credentials
//! - any subset of the config record's wire names - a config update
//!
//! `command` wins over `wifi_ssid`, which wins over config fields. A `null`
//! value counts as absent.

use crate::config::ConfigPatch;
use crate::wifi::WifiCredentials;
use log::warn;
use serde_json::{json, Map, Value};
use std::fmt;

/// Commands understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Scan for nearby access points.
    ScanWifi,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScanWifi => "scan_wifi",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "scan_wifi" => Some(Self::ScanWifi),
            _ => None,
        }
    }
}

/// A decoded write.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Command(Command),
    Credentials(WifiCredentials),
    Config(ConfigPatch),
}

/// Why a write could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not UTF-8, not JSON, not an object, or not flat.
    Malformed(String),
    /// `command` named something the device does not implement.
    UnknownCommand(String),
    /// A selector field had the wrong type.
    InvalidField { field: &'static str },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed message: {}", reason),
            Self::UnknownCommand(name) => write!(f, "unknown command: {}", name),
            Self::InvalidField { field } => write!(f, "invalid value for '{}'", field),
        }
    }
}

impl std::error::Error for DecodeError {}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

/// Integral JSON number, accepting floats without a fractional part.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Read one config field, dropping it with a warning on a type mismatch.
fn field<T>(
    fields: &Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = present(fields, key)?;
    let converted = convert(value);
    if converted.is_none() {
        warn!("Ignoring '{}': unexpected value {}", key, value);
    }
    converted
}

fn config_patch(fields: &Map<String, Value>) -> ConfigPatch {
    let string = |v: &Value| v.as_str().map(str::to_string);
    ConfigPatch {
        device_name: field(fields, "deviceName", string),
        refresh_rate: field(fields, "refreshRate", as_integer),
        led_enabled: field(fields, "ledEnabled", Value::as_bool),
        sensor_update_interval: field(fields, "sensorUpdateInterval", as_integer),
        calibration_factor: field(fields, "calibrationFactor", Value::as_f64),
        wifi_ssid: field(fields, "wifiSSID", string),
        wifi_password: field(fields, "wifiPassword", string),
    }
}

/// Decode one write into an [`Envelope`].
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::Malformed(format!("not UTF-8: {}", e)))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(DecodeError::Malformed("expected a JSON object".into()));
    };
    if let Some((key, _)) = fields.iter().find(|(_, v)| v.is_array() || v.is_object()) {
        return Err(DecodeError::Malformed(format!("nested value for '{}'", key)));
    }

    if let Some(command) = present(&fields, "command") {
        let name = command
            .as_str()
            .ok_or(DecodeError::InvalidField { field: "command" })?;
        return Command::parse(name)
            .map(Envelope::Command)
            .ok_or_else(|| DecodeError::UnknownCommand(name.to_string()));
    }

    if let Some(ssid) = present(&fields, "wifi_ssid") {
        let ssid = ssid
            .as_str()
            .ok_or(DecodeError::InvalidField { field: "wifi_ssid" })?;
        let password = match present(&fields, "wifi_password") {
            Some(v) => v.as_str().ok_or(DecodeError::InvalidField {
                field: "wifi_password",
            })?,
            None => "",
        };
        return Ok(Envelope::Credentials(WifiCredentials::new(ssid, password)));
    }

    Ok(Envelope::Config(config_patch(&fields)))
}

/// Canonical wire form of an envelope, as the companion app writes it.
pub fn encode_envelope(envelope: &Envelope) -> Vec<u8> {
    let value = match envelope {
        Envelope::Command(command) => json!({ "command": command.as_str() }),
        Envelope::Credentials(creds) => json!({
            "wifi_ssid": creds.ssid(),
            "wifi_password": creds.password(),
        }),
        Envelope::Config(patch) => match serde_json::to_value(patch) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode config patch: {}", e);
                json!({})
            }
        },
    };
    value.to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scan_command() {
        assert_eq!(
            decode(br#"{"command":"scan_wifi"}"#).unwrap(),
            Envelope::Command(Command::ScanWifi)
        );
    }

    #[test]
    fn test_decode_unknown_command() {
        assert_eq!(
            decode(br#"{"command":"reboot"}"#),
            Err(DecodeError::UnknownCommand("reboot".into()))
        );
    }

    #[test]
    fn test_decode_credentials() {
        let env = decode(br#"{"wifi_ssid":"Home","wifi_password":"secret"}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Credentials(WifiCredentials::new("Home", "secret"))
        );
    }

    #[test]
    fn test_decode_credentials_without_password() {
        let env = decode(br#"{"wifi_ssid":"Cafe"}"#).unwrap();
        assert_eq!(env, Envelope::Credentials(WifiCredentials::open("Cafe")));
    }

    #[test]
    fn test_command_takes_priority() {
        let env = decode(br#"{"wifi_ssid":"Home","command":"scan_wifi"}"#).unwrap();
        assert_eq!(env, Envelope::Command(Command::ScanWifi));
    }

    #[test]
    fn test_null_selector_is_absent() {
        let env = decode(br#"{"command":null,"deviceName":"Porch"}"#).unwrap();
        match env {
            Envelope::Config(patch) => assert_eq!(patch.device_name.as_deref(), Some("Porch")),
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_decode_config_subset() {
        let env = decode(br#"{"refreshRate":10000,"ledEnabled":false,"extra":1}"#).unwrap();
        let expected = ConfigPatch {
            refresh_rate: Some(10_000),
            led_enabled: Some(false),
            ..Default::default()
        };
        assert_eq!(env, Envelope::Config(expected));
    }

    #[test]
    fn test_config_type_mismatch_drops_field() {
        let env = decode(br#"{"refreshRate":"fast","calibrationFactor":2}"#).unwrap();
        let expected = ConfigPatch {
            calibration_factor: Some(2.0),
            ..Default::default()
        };
        assert_eq!(env, Envelope::Config(expected));
    }

    #[test]
    fn test_integral_float_accepted() {
        let env = decode(br#"{"sensorUpdateInterval":30.0}"#).unwrap();
        match env {
            Envelope::Config(patch) => assert_eq!(patch.sensor_update_interval, Some(30)),
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_malformed_inputs() {
        let cases: [&[u8]; 5] = [
            b"not json",
            b"[1,2,3]",
            b"\"scan_wifi\"",
            br#"{"deviceName":{"nested":true}}"#,
            &[0xff, 0xfe, 0x7b],
        ];
        for input in cases {
            assert!(
                matches!(decode(input), Err(DecodeError::Malformed(_))),
                "expected malformed for {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_wrong_selector_type() {
        assert_eq!(
            decode(br#"{"wifi_ssid":42}"#),
            Err(DecodeError::InvalidField { field: "wifi_ssid" })
        );
        assert_eq!(
            decode(br#"{"wifi_ssid":"Home","wifi_password":false}"#),
            Err(DecodeError::InvalidField {
                field: "wifi_password"
            })
        );
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelopes = [
            Envelope::Command(Command::ScanWifi),
            Envelope::Credentials(WifiCredentials::new("Home", "secret")),
            Envelope::Credentials(WifiCredentials::open("Cafe")),
            Envelope::Config(ConfigPatch::default()),
            Envelope::Config(ConfigPatch {
                device_name: Some("Greenhouse".into()),
                refresh_rate: Some(500),
                led_enabled: Some(true),
                sensor_update_interval: Some(3_600),
                calibration_factor: Some(0.75),
                wifi_ssid: Some("Home".into()),
                wifi_password: Some("****".into()),
            }),
        ];
        for envelope in envelopes {
            let bytes = encode_envelope(&envelope);
            assert_eq!(decode(&bytes).unwrap(), envelope);
        }
    }
}
