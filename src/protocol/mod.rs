//! JSON message codec for the control characteristic.
//!
//! - `envelope` - inbound writes (commands, credentials, config updates)
//! - `status` - outbound notifications

pub mod envelope;
pub mod status;

pub use envelope::{decode, encode_envelope, Command, DecodeError, Envelope};
pub use status::{encode, SensorSnapshot, StatusMessage};
