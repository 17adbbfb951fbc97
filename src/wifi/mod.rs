//! WiFi provisioning.
//!
//! # Components
//!
//! - `types` - credentials, connection state, scan results (host-testable)
//! - `link` - the [`WifiLink`] radio trait
//! - `provisioner` - the connection/scan state machine
//! - `scan` - chunking of scan results for notification
//! - `sim` - simulated radio for the host build and tests
//! - `esp` - ESP-IDF station driver (ESP32 only)

#[cfg(feature = "esp32")]
mod esp;
mod link;
mod provisioner;
mod scan;
mod sim;
mod types;

#[cfg(feature = "esp32")]
pub use esp::EspWifiLink;
pub use link::{LinkError, WifiLink};
pub use provisioner::{
    ConnectError, NetworkProvisioner, ScanStart, StatusSink, CHUNK_DELAY_MS,
    CONNECT_POLL_INTERVAL_MS, MAX_CONNECT_POLLS, SCAN_TIMEOUT_MS,
};
pub use scan::{chunk_results, total_packets, NETWORKS_PER_CHUNK};
pub use sim::SimulatedLink;
pub use types::{ConnectionState, DisconnectReason, LinkSummary, NetworkInfo, WifiCredentials};
