//! Attribute value of the control characteristic.
//!
//! Reads, writes and notifications all go through the one attribute value a
//! GATT characteristic owns. A notification therefore overwrites whatever a
//! client would read next; reads must be answered from the published config
//! record rather than from the attribute as it was left.

/// Published config plus the characteristic's current attribute value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ControlAttribute {
    config: Vec<u8>,
    value: Vec<u8>,
}

impl ControlAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new config record; it becomes the attribute value too.
    pub fn publish(&mut self, config: &[u8]) {
        self.config = config.to_vec();
        self.value.clone_from(&self.config);
    }

    /// Load a notification payload into the attribute and return it.
    pub fn stage_notification(&mut self, payload: &[u8]) -> &[u8] {
        self.value = payload.to_vec();
        &self.value
    }

    /// Answer a client read: the attribute is reset to the config record.
    pub fn read(&mut self) -> &[u8] {
        self.value.clone_from(&self.config);
        &self.value
    }

    /// Last published config record.
    pub fn config(&self) -> &[u8] {
        &self.config
    }

    /// Current attribute value, as a client would see it without a read hook.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_after_notification_serves_config() {
        let mut attr = ControlAttribute::new();
        attr.publish(br#"{"deviceName":"Lab"}"#);
        assert_eq!(
            attr.stage_notification(br#"{"status":"sensor_update"}"#),
            br#"{"status":"sensor_update"}"#
        );
        assert_eq!(attr.value(), br#"{"status":"sensor_update"}"#);

        assert_eq!(attr.read(), br#"{"deviceName":"Lab"}"#);
        assert_eq!(attr.value(), attr.config());
    }

    #[test]
    fn test_republish_replaces_config() {
        let mut attr = ControlAttribute::new();
        attr.publish(b"{\"a\":1}");
        attr.publish(b"{\"a\":2}");
        assert_eq!(attr.read(), b"{\"a\":2}");
    }

    #[test]
    fn test_read_before_publish_is_empty() {
        let mut attr = ControlAttribute::new();
        attr.stage_notification(b"{}");
        assert!(attr.read().is_empty());
    }
}
