//! BLE transport.
//!
//! The device exposes one GATT service with a single control characteristic
//! (READ | WRITE | NOTIFY):
//!
//! ```text
//! Service 12345678-1234-1234-1234-123456789abc
//! └── Control abcd1234-5678-90ab-cdef-1234567890ab
//!     ├── read   - sanitized config record (JSON)
//!     ├── write  - command / credentials / config update (JSON)
//!     └── notify - status, scan results, telemetry (JSON)
//! ```
//!
//! The radio stack sits behind [`BleTransport`]; its callbacks arrive through
//! [`TransportCallbacks`], usually by way of a queued [`TransportEvent`] so the
//! main loop is the only place that mutates state.

mod attribute;
mod console;
#[cfg(feature = "esp32")]
mod nimble;
mod service;

pub use attribute::ControlAttribute;
pub use console::ConsoleTransport;
#[cfg(feature = "esp32")]
pub use nimble::NimbleTransport;
pub use service::{Outbound, TransportService};

use std::fmt;

pub const SERVICE_UUID: &str = "12345678-1234-1234-1234-123456789abc";
pub const CONTROL_CHAR_UUID: &str = "abcd1234-5678-90ab-cdef-1234567890ab";

/// Largest notification payload the app is expected to receive in one piece.
pub const NOTIFY_BUDGET: usize = 512;

/// Outbound side of the radio stack.
pub trait BleTransport {
    /// Notify the connected client on the control characteristic.
    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Replace the value served on reads of the control characteristic.
    fn set_config_value(&mut self, payload: &[u8]);

    /// Start advertising under `device_name`.
    fn start_advertising(&mut self, device_name: &str) -> Result<(), TransportError>;

    /// Stop advertising, rename, and advertise again.
    fn readvertise(&mut self, device_name: &str) -> Result<(), TransportError>;
}

/// Inbound events from the radio stack.
pub trait TransportCallbacks {
    fn on_connect(&mut self);
    fn on_disconnect(&mut self);
    fn on_write(&mut self, data: &[u8]);
}

/// Radio callback captured for delivery on the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Write(Vec<u8>),
}

impl TransportEvent {
    pub fn dispatch(self, callbacks: &mut impl TransportCallbacks) {
        match self {
            Self::Connected => callbacks.on_connect(),
            Self::Disconnected => callbacks.on_disconnect(),
            Self::Write(data) => callbacks.on_write(&data),
        }
    }
}

/// Errors reported by a transport.
#[derive(Debug)]
pub enum TransportError {
    /// Advertising could not be configured or started.
    Advertising(String),
    /// Notification could not be sent.
    Notify(String),
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advertising(msg) => write!(f, "advertising failed: {}", msg),
            Self::Notify(msg) => write!(f, "notify failed: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        connects: usize,
        disconnects: usize,
        writes: Vec<Vec<u8>>,
    }

    impl TransportCallbacks for Counter {
        fn on_connect(&mut self) {
            self.connects += 1;
        }
        fn on_disconnect(&mut self) {
            self.disconnects += 1;
        }
        fn on_write(&mut self, data: &[u8]) {
            self.writes.push(data.to_vec());
        }
    }

    #[test]
    fn test_dispatch_routes_events() {
        let mut counter = Counter::default();
        TransportEvent::Connected.dispatch(&mut counter);
        TransportEvent::Write(b"{}".to_vec()).dispatch(&mut counter);
        TransportEvent::Disconnected.dispatch(&mut counter);
        assert_eq!(counter.connects, 1);
        assert_eq!(counter.disconnects, 1);
        assert_eq!(counter.writes, vec![b"{}".to_vec()]);
    }
}
