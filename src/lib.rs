//! BLE configuration and telemetry firmware library.
//!
//! A companion app connects over BLE to read and update the device
//! configuration, provision WiFi credentials, scan for networks and receive
//! periodic sensor readings.
//!
//! Everything except the radio drivers (`esp32` feature) is
//! platform-independent and tested on the host.

pub mod ble;
pub mod clock;
pub mod config;
pub mod identity;
pub mod protocol;
pub mod storage;
pub mod telemetry;
pub mod wifi;

// Re-export commonly used items
pub use ble::{BleTransport, TransportCallbacks, TransportEvent, TransportService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigPatch, ConfigRecord, ConfigStore};
pub use protocol::{DecodeError, Envelope, StatusMessage};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use telemetry::TelemetryReporter;
pub use wifi::{ConnectionState, NetworkProvisioner, SimulatedLink, WifiCredentials, WifiLink};
