//! Line-oriented stand-in for the radio, used by the host simulator.
//!
//! Every outbound action is printed as one line:
//!
//! ```text
//! << {"status":"wifi_connecting","ssid":"Home"}
//! -- advertising as ESP32_Device
//! ```

use super::{BleTransport, ControlAttribute, TransportError};
use log::debug;
use std::io::Write;

pub struct ConsoleTransport<W> {
    out: W,
    attribute: ControlAttribute,
    advertising: Option<String>,
}

impl<W: Write> ConsoleTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            attribute: ControlAttribute::new(),
            advertising: None,
        }
    }

    /// Current value served on reads.
    pub fn config_value(&self) -> &[u8] {
        self.attribute.config()
    }

    /// Name currently advertised, if advertising.
    pub fn advertised_name(&self) -> Option<&str> {
        self.advertising.as_deref()
    }

    /// Print the read value, as a client read would see it.
    pub fn print_config_value(&mut self) -> Result<(), TransportError> {
        let value = String::from_utf8_lossy(self.attribute.read()).into_owned();
        writeln!(self.out, ">> {}", value)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> BleTransport for ConsoleTransport<W> {
    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let staged = self.attribute.stage_notification(payload);
        writeln!(self.out, "<< {}", String::from_utf8_lossy(staged))?;
        self.out.flush()?;
        Ok(())
    }

    fn set_config_value(&mut self, payload: &[u8]) {
        debug!("Read value updated ({} bytes)", payload.len());
        self.attribute.publish(payload);
    }

    fn start_advertising(&mut self, device_name: &str) -> Result<(), TransportError> {
        writeln!(self.out, "-- advertising as {}", device_name)?;
        self.advertising = Some(device_name.to_string());
        Ok(())
    }

    fn readvertise(&mut self, device_name: &str) -> Result<(), TransportError> {
        if self.advertising.take().is_some() {
            writeln!(self.out, "-- advertising stopped")?;
        }
        self.start_advertising(device_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(transport: &ConsoleTransport<Vec<u8>>) -> Vec<String> {
        String::from_utf8(transport.writer().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_notify_writes_one_line() {
        let mut t = ConsoleTransport::new(Vec::new());
        t.notify(br#"{"status":"scanning"}"#).unwrap();
        assert_eq!(lines(&t), [r#"<< {"status":"scanning"}"#]);
    }

    #[test]
    fn test_readvertise_renames() {
        let mut t = ConsoleTransport::new(Vec::new());
        t.start_advertising("ESP32_Device").unwrap();
        t.readvertise("Porch").unwrap();
        assert_eq!(t.advertised_name(), Some("Porch"));
        assert_eq!(
            lines(&t),
            [
                "-- advertising as ESP32_Device",
                "-- advertising stopped",
                "-- advertising as Porch"
            ]
        );
    }

    #[test]
    fn test_config_value_kept_and_printed() {
        let mut t = ConsoleTransport::new(Vec::new());
        t.set_config_value(br#"{"deviceName":"x"}"#);
        assert_eq!(t.config_value(), br#"{"deviceName":"x"}"#);
        t.print_config_value().unwrap();
        assert_eq!(lines(&t), [r#">> {"deviceName":"x"}"#]);
    }

    #[test]
    fn test_read_after_notify_prints_config() {
        let mut t = ConsoleTransport::new(Vec::new());
        t.set_config_value(br#"{"deviceName":"x"}"#);
        t.notify(br#"{"status":"sensor_update"}"#).unwrap();
        t.print_config_value().unwrap();
        assert_eq!(
            lines(&t),
            [r#"<< {"status":"sensor_update"}"#, r#">> {"deviceName":"x"}"#]
        );
    }
}
