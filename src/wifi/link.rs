//! WiFi radio abstraction.
//!
//! The provisioner drives the radio only through [`WifiLink`]; every method is
//! non-blocking so the caller owns all waiting and its bounds.

use super::types::{NetworkInfo, WifiCredentials};
use std::fmt;

/// Station-mode WiFi radio.
pub trait WifiLink {
    /// Configure the station and start associating. Returns immediately.
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError>;

    /// Drop the current association (no-op when not associated).
    fn disconnect(&mut self);

    /// Poll whether the link is up with an address assigned.
    fn is_connected(&mut self) -> bool;

    /// Station IP address, if connected.
    fn ip_addr(&self) -> Option<String>;

    /// Signal strength of the current access point in dBm, if connected.
    fn rssi(&self) -> Option<i32>;

    /// Start an asynchronous scan for access points.
    fn start_scan(&mut self) -> Result<(), LinkError>;

    /// Poll whether the running scan has finished.
    fn scan_complete(&mut self) -> bool;

    /// Take the finished scan's results, freeing the driver's buffer.
    fn take_scan_results(&mut self) -> Vec<NetworkInfo>;

    /// Abandon a running scan and discard partial results.
    fn abort_scan(&mut self);
}

/// Errors that can occur during WiFi operations.
#[derive(Debug)]
pub enum LinkError {
    /// SSID is invalid (too long for the driver).
    InvalidSsid,
    /// Password is invalid (too long for the driver).
    InvalidPassword,
    /// Radio could not be started or configured.
    Radio(String),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for LinkError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            Self::Radio(msg) => write!(f, "radio error: {}", msg),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for LinkError {}
