//! The control-plane service behind the GATT characteristic.
//!
//! [`TransportService`] owns the connection flag, the config store, the WiFi
//! provisioner and the telemetry reporter. The radio stack calls into it
//! through [`TransportCallbacks`]; the main loop calls [`TransportService::poll`].

use super::{BleTransport, TransportCallbacks, NOTIFY_BUDGET};
use crate::clock::Clock;
use crate::config::{ConfigPatch, ConfigStore};
use crate::protocol::{decode, encode, Command, Envelope, StatusMessage};
use crate::storage::KeyValueStore;
use crate::telemetry::TelemetryReporter;
use crate::wifi::{NetworkProvisioner, StatusSink, WifiCredentials, WifiLink};
use log::{debug, error, info, warn};
use rand_core::RngCore;

/// Notification path to the client. Drops everything while no client is
/// connected.
pub struct Outbound<T> {
    transport: T,
    connected: bool,
}

impl<T> Outbound<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: BleTransport> StatusSink for Outbound<T> {
    fn emit(&mut self, message: StatusMessage) {
        if !self.connected {
            debug!("No client, dropping '{}'", message.status());
            return;
        }
        let payload = encode(&message);
        if payload.len() > NOTIFY_BUDGET {
            warn!(
                "'{}' notification is {} bytes (budget {})",
                message.status(),
                payload.len(),
                NOTIFY_BUDGET
            );
        }
        if let Err(e) = self.transport.notify(&payload) {
            warn!("Failed to notify '{}': {}", message.status(), e);
        }
    }
}

pub struct TransportService<T, S, W, C, R> {
    outbound: Outbound<T>,
    config: ConfigStore<S>,
    provisioner: NetworkProvisioner<W, C>,
    telemetry: TelemetryReporter<R>,
}

impl<T, S, W, C, R> TransportService<T, S, W, C, R>
where
    T: BleTransport,
    S: KeyValueStore,
    W: WifiLink,
    C: Clock,
    R: RngCore,
{
    pub fn new(
        transport: T,
        config: ConfigStore<S>,
        provisioner: NetworkProvisioner<W, C>,
        telemetry: TelemetryReporter<R>,
    ) -> Self {
        Self {
            outbound: Outbound::new(transport),
            config,
            provisioner,
            telemetry,
        }
    }

    /// Publish the config value, join the stored network and start advertising.
    ///
    /// The WiFi join blocks for at most 20 x 500 ms.
    pub fn start(&mut self) {
        self.refresh_config_value();

        match self.config.credentials() {
            Some(credentials) => match self.provisioner.connect_blocking(&credentials) {
                Ok(()) => info!("WiFi connected to '{}'", credentials.ssid()),
                Err(e) => warn!("WiFi connection to '{}' failed: {}", credentials.ssid(), e),
            },
            None => info!("No WiFi credentials stored"),
        }

        let name = self.config.record().device_name().to_string();
        match self.outbound.transport.start_advertising(&name) {
            Ok(()) => info!("BLE service started, advertising as: {}", name),
            Err(e) => error!("Failed to start advertising: {}", e),
        }
    }

    /// One iteration of the main loop.
    pub fn poll(&mut self) {
        let now = self.provisioner.clock().now_ms();
        if self.telemetry.link_poll_due(now) {
            self.provisioner.poll_link(&mut self.outbound);
        }
        self.provisioner.poll_scan(&mut self.outbound);

        if self.outbound.connected {
            // Scan delivery may have advanced the clock.
            let now = self.provisioner.clock().now_ms();
            if self
                .telemetry
                .report_due(now, self.config.record().refresh_rate_ms())
            {
                self.push_snapshot(now);
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.outbound.connected
    }

    pub fn config(&self) -> &ConfigStore<S> {
        &self.config
    }

    pub fn provisioner(&self) -> &NetworkProvisioner<W, C> {
        &self.provisioner
    }

    pub fn provisioner_mut(&mut self) -> &mut NetworkProvisioner<W, C> {
        &mut self.provisioner
    }

    pub fn transport(&self) -> &T {
        self.outbound.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.outbound.transport_mut()
    }

    /// Factory reset of the configuration (the device id is kept).
    pub fn reset_config(&mut self) {
        let previous = self.config.record().device_name().to_string();
        if let Err(e) = self.config.reset_to_defaults() {
            error!("Failed to persist default configuration: {}", e);
        }
        self.refresh_config_value();
        if self.config.record().device_name() != previous {
            self.readvertise();
        }
    }

    fn refresh_config_value(&mut self) {
        let json = self.config.to_wire_record().to_json();
        self.outbound.transport.set_config_value(&json);
    }

    fn readvertise(&mut self) {
        let name = self.config.record().device_name().to_string();
        match self.outbound.transport.readvertise(&name) {
            Ok(()) => info!("Advertising renamed to: {}", name),
            Err(e) => error!("Failed to restart advertising: {}", e),
        }
    }

    fn push_snapshot(&mut self, now: u64) {
        let calibration = self.config.record().calibration_factor();
        let summary = self.provisioner.summary();
        let snapshot = self.telemetry.snapshot(calibration, &summary, now);
        self.outbound.emit(StatusMessage::SensorSnapshot(snapshot));
    }

    fn handle_credentials(&mut self, credentials: WifiCredentials) {
        info!("Received WiFi credentials for '{}'", credentials.ssid());
        self.outbound.emit(StatusMessage::Acknowledge {
            ssid: credentials.ssid().to_string(),
        });
        if let Err(e) = self.config.set_credentials(&credentials) {
            error!("Failed to persist WiFi credentials: {}", e);
        }
        self.refresh_config_value();
        self.provisioner
            .connect_async(&credentials, &mut self.outbound);
    }

    fn handle_config(&mut self, patch: ConfigPatch) {
        if patch.is_empty() {
            debug!("Config write without known fields");
            return;
        }
        let report = self.config.update(&patch);
        if report.applied.is_empty() {
            return;
        }
        if let Err(e) = self.config.persist() {
            error!("Failed to persist configuration: {}", e);
        }
        self.refresh_config_value();
        info!("Configuration updated: {:?}", report.applied);
        if report.name_changed {
            self.readvertise();
        }
    }
}

impl<T, S, W, C, R> TransportCallbacks for TransportService<T, S, W, C, R>
where
    T: BleTransport,
    S: KeyValueStore,
    W: WifiLink,
    C: Clock,
    R: RngCore,
{
    fn on_connect(&mut self) {
        info!("Client connected");
        self.outbound.connected = true;
        let now = self.provisioner.clock().now_ms();
        self.push_snapshot(now);
        self.telemetry.mark_reported(now);
    }

    fn on_disconnect(&mut self) {
        info!("Client disconnected");
        self.outbound.connected = false;
        let name = self.config.record().device_name().to_string();
        if let Err(e) = self.outbound.transport.start_advertising(&name) {
            error!("Failed to restart advertising: {}", e);
        }
    }

    fn on_write(&mut self, data: &[u8]) {
        debug!("Write of {} bytes", data.len());
        match decode(data) {
            Ok(Envelope::Command(Command::ScanWifi)) => {
                self.provisioner.start_scan(&mut self.outbound);
            }
            Ok(Envelope::Credentials(credentials)) => self.handle_credentials(credentials),
            Ok(Envelope::Config(patch)) => self.handle_config(patch),
            Err(e) => {
                warn!("Rejected write: {}", e);
                self.outbound.emit(StatusMessage::error(e.to_string()));
            }
        }
    }
}
