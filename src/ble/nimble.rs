//! NimBLE GATT server.
//!
//! NimBLE delivers callbacks on its own host task, so they are only turned
//! into [`TransportEvent`]s and queued; the main loop dispatches them.
//! Reads are the exception: they are answered in place from the shared
//! [`ControlAttribute`], so a client always reads the config record even
//! right after a notification.

use super::{BleTransport, ControlAttribute, TransportError, TransportEvent};
use esp32_nimble::utilities::mutex::Mutex;
use esp32_nimble::utilities::BleUuid;
use esp32_nimble::{uuid128, BLEAdvertisementData, BLECharacteristic, BLEDevice, NimbleProperties};
use log::{info, warn};
use std::sync::mpsc::Sender;
use std::sync::{Arc, MutexGuard, PoisonError};

const SERVICE_UUID: BleUuid = uuid128!("12345678-1234-1234-1234-123456789abc");
const CONTROL_CHAR_UUID: BleUuid = uuid128!("abcd1234-5678-90ab-cdef-1234567890ab");

/// Writes above this size are dropped before allocating.
const MAX_WRITE_LEN: usize = 512;

fn lock(attribute: &std::sync::Mutex<ControlAttribute>) -> MutexGuard<'_, ControlAttribute> {
    attribute.lock().unwrap_or_else(PoisonError::into_inner)
}

fn queue(events: &Sender<TransportEvent>, event: TransportEvent) {
    if events.send(event).is_err() {
        warn!("Event queue closed, dropping BLE event");
    }
}

/// The single control characteristic on the NimBLE stack.
pub struct NimbleTransport {
    control: Arc<Mutex<BLECharacteristic>>,
    attribute: Arc<std::sync::Mutex<ControlAttribute>>,
}

impl NimbleTransport {
    /// Register the service and route callbacks into `events`.
    pub fn new(events: Sender<TransportEvent>) -> Self {
        let device = BLEDevice::take();
        let server = device.get_server();
        // Advertising restarts from on_disconnect.
        server.advertise_on_disconnect(false);

        let tx = events.clone();
        server.on_connect(move |_server, desc| {
            info!("BLE client connected: {:?}", desc.address());
            queue(&tx, TransportEvent::Connected);
        });

        let tx = events.clone();
        server.on_disconnect(move |_desc, reason| {
            info!("BLE client disconnected: {:?}", reason);
            queue(&tx, TransportEvent::Disconnected);
        });

        let service = server.create_service(SERVICE_UUID);
        let control = service.lock().create_characteristic(
            CONTROL_CHAR_UUID,
            NimbleProperties::READ | NimbleProperties::WRITE | NimbleProperties::NOTIFY,
        );

        let attribute = Arc::new(std::sync::Mutex::new(ControlAttribute::new()));
        let read_attribute = attribute.clone();
        control.lock().on_read(move |char, _conn| {
            char.set_value(lock(&read_attribute).read());
        });

        let tx = events;
        control.lock().on_write(move |args| {
            let data = args.recv_data();
            if data.len() > MAX_WRITE_LEN {
                warn!("Rejected oversized write: {} bytes", data.len());
                return;
            }
            queue(&tx, TransportEvent::Write(data.to_vec()));
        });

        Self { control, attribute }
    }
}

fn advertising_error(e: impl std::fmt::Debug) -> TransportError {
    TransportError::Advertising(format!("{:?}", e))
}

impl BleTransport for NimbleTransport {
    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        // The attribute lock is never held across a characteristic lock;
        // on_read takes them in the opposite order.
        let staged = lock(&self.attribute).stage_notification(payload).to_vec();
        self.control.lock().set_value(&staged).notify();
        // Leave the config record in place for reads that bypass on_read.
        let config = lock(&self.attribute).read().to_vec();
        self.control.lock().set_value(&config);
        Ok(())
    }

    fn set_config_value(&mut self, payload: &[u8]) {
        lock(&self.attribute).publish(payload);
        self.control.lock().set_value(payload);
    }

    fn start_advertising(&mut self, device_name: &str) -> Result<(), TransportError> {
        let advertising = BLEDevice::take().get_advertising();
        advertising
            .lock()
            .set_data(
                BLEAdvertisementData::new()
                    .name(device_name)
                    .add_service_uuid(SERVICE_UUID),
            )
            .map_err(advertising_error)?;
        advertising.lock().start().map_err(advertising_error)?;
        Ok(())
    }

    fn readvertise(&mut self, device_name: &str) -> Result<(), TransportError> {
        let advertising = BLEDevice::take().get_advertising();
        advertising.lock().stop().map_err(advertising_error)?;
        // GAP device name (0x2A00) is read by clients after connecting.
        BLEDevice::set_device_name(device_name).map_err(advertising_error)?;
        self.start_advertising(device_name)
    }
}
