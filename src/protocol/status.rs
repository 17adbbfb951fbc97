//! Outbound notifications.
//!
//! Every event pushed over the notify characteristic is one [`StatusMessage`]
//! variant, serialized as a flat JSON object whose `status` field names the
//! variant.

use crate::wifi::NetworkInfo;
use log::warn;
use serde::Serialize;

/// Fallback payload used if serialization ever fails.
const ENCODE_FAILURE: &[u8] = br#"{"status":"error","message":"encode failed"}"#;

/// Telemetry values pushed with `sensor_update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSnapshot {
    /// Degrees Celsius, calibrated.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Battery level in percent.
    #[serde(rename = "batteryLevel")]
    pub battery: f32,
    pub wifi_connected: bool,
    pub wifi_ssid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    /// Milliseconds since boot.
    pub timestamp: u64,
}

/// The single vocabulary carried over the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum StatusMessage {
    /// Credentials were received and stored.
    #[serde(rename = "credentials_received")]
    Acknowledge { ssid: String },
    #[serde(rename = "wifi_connecting")]
    Connecting { ssid: String },
    #[serde(rename = "wifi_connected")]
    Connected {
        ssid: String,
        #[serde(rename = "ip_address")]
        ip: String,
        rssi: i32,
    },
    #[serde(rename = "wifi_disconnected")]
    Disconnected { ssid: String, message: String },
    #[serde(rename = "scanning")]
    ScanStarted,
    /// One chunk of scan results; `packet` is 1-based.
    #[serde(rename = "scan_results")]
    ScanResultsChunk {
        packet: usize,
        total_packets: usize,
        networks_found: usize,
        networks: Vec<NetworkInfo>,
    },
    #[serde(rename = "scan_complete")]
    ScanComplete { networks_found: usize },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "sensor_update")]
    SensorSnapshot(SensorSnapshot),
}

impl StatusMessage {
    /// Wire name of the variant (the `status` field).
    pub fn status(&self) -> &'static str {
        match self {
            Self::Acknowledge { .. } => "credentials_received",
            Self::Connecting { .. } => "wifi_connecting",
            Self::Connected { .. } => "wifi_connected",
            Self::Disconnected { .. } => "wifi_disconnected",
            Self::ScanStarted => "scanning",
            Self::ScanResultsChunk { .. } => "scan_results",
            Self::ScanComplete { .. } => "scan_complete",
            Self::Error { .. } => "error",
            Self::SensorSnapshot(_) => "sensor_update",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Serialize a status message. Never fails.
pub fn encode(message: &StatusMessage) -> Vec<u8> {
    match serde_json::to_vec(message) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to encode '{}' notification: {}", message.status(), e);
            ENCODE_FAILURE.to_vec()
        }
    }
}
