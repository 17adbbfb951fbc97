//! Device configuration.
//!
//! - `record` - the validated record and its wire projection (host-testable)
//! - `store` - loading and persisting through a [`KeyValueStore`]
//!
//! [`KeyValueStore`]: crate::storage::KeyValueStore

mod record;
mod store;

pub use record::{
    ConfigPatch, ConfigRecord, UpdateReport, WireRecord, DEFAULT_DEVICE_NAME, PASSWORD_MASK,
    REFRESH_RATE_RANGE, SENSOR_INTERVAL_RANGE,
};
pub use store::{ConfigStore, CONFIG_NAMESPACE, WIFI_NAMESPACE};
