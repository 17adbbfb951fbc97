//! WiFi data types shared by the provisioner, codec and radio backends.
//!
//! These are platform-independent and can be tested on the host machine.

use serde::Serialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// WiFi credentials for connecting to an access point.
///
/// The provisioner keeps its own copy while an attempt is in flight, so the
/// stored record and the connection attempt never share memory. Both fields
/// are zeroed when the value is dropped.
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct WifiCredentials {
    ssid: String,
    password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Credentials for an open network (no password).
    pub fn open(ssid: impl Into<String>) -> Self {
        Self::new(ssid, String::new())
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &if self.is_open() { "" } else { "****" })
            .finish()
    }
}

/// WiFi connection state owned by the provisioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No attempt made since boot.
    #[default]
    Idle,
    /// Attempting to associate and obtain an address.
    Connecting,
    /// Link is up.
    Connected,
    /// Link is down after an attempt, a timeout or a loss.
    Disconnected,
    /// A network scan owns the radio.
    Scanning,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Scanning => "scanning",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the link went (or stayed) down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Link did not come up within the attempt bound.
    Timeout,
    /// An established link dropped.
    Lost,
    /// Credentials carried an empty SSID; no attempt was made.
    EmptySsid,
    /// The radio refused to start the attempt.
    Failed(String),
}

impl DisconnectReason {
    /// Message carried in the `wifi_disconnected` notification.
    pub fn message(&self) -> String {
        match self {
            Self::Timeout => "timeout".to_string(),
            Self::Lost => "connection_lost".to_string(),
            Self::EmptySsid => "empty_ssid".to_string(),
            Self::Failed(reason) => format!("failed: {}", reason),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// One access point found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// `true` unless the access point is open.
    #[serde(rename = "encryption")]
    pub encrypted: bool,
}

impl NetworkInfo {
    pub fn new(ssid: impl Into<String>, rssi: i32, encrypted: bool) -> Self {
        Self {
            ssid: ssid.into(),
            rssi,
            encrypted,
        }
    }
}

/// Snapshot of the link reported with telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkSummary {
    pub connected: bool,
    pub ssid: String,
    pub ip: Option<String>,
    pub rssi: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_masks_password() {
        let creds = WifiCredentials::new("Home", "secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("Home"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_open_credentials() {
        let creds = WifiCredentials::open("Cafe");
        assert!(creds.is_open());
        assert_eq!(creds.password(), "");
    }

    #[test]
    fn test_credentials_zeroize() {
        let mut creds = WifiCredentials::new("Home", "secret");
        creds.zeroize();
        assert_eq!(creds.ssid(), "");
        assert_eq!(creds.password(), "");
    }

    #[test]
    fn test_disconnect_reason_messages() {
        assert_eq!(DisconnectReason::Timeout.message(), "timeout");
        assert_eq!(DisconnectReason::Lost.message(), "connection_lost");
        assert_eq!(
            DisconnectReason::Failed("radio off".into()).message(),
            "failed: radio off"
        );
    }

    #[test]
    fn test_connection_state_strings() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
        assert_eq!(ConnectionState::Scanning.to_string(), "scanning");
    }

    #[test]
    fn test_network_info_wire_shape() {
        let info = NetworkInfo::new("Home", -42, true);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["ssid"], "Home");
        assert_eq!(json["rssi"], -42);
        assert_eq!(json["encryption"], true);
    }
}
