//! BLE configuration firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    use ble_config_esp32::ble::NimbleTransport;
    use ble_config_esp32::storage::NvsStore;
    use ble_config_esp32::wifi::EspWifiLink;
    use ble_config_esp32::{
        identity, ConfigStore, NetworkProvisioner, SystemClock, TelemetryReporter,
        TransportService,
    };
    use esp_idf_hal::gpio::PinDriver;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use log::{info, warn};
    use rand_core::OsRng;
    use std::time::Duration;

    const LOOP_INTERVAL: Duration = Duration::from_millis(20);

    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("=== BLE config device starting ===");

    let peripherals = Peripherals::take().expect("Failed to take peripherals");
    let sysloop = EspSystemEventLoop::take().expect("Failed to take system event loop");
    let nvs = EspDefaultNvsPartition::take().expect("Failed to take NVS partition");

    // Built-in LED on most ESP32 DevKits
    let mut led = PinDriver::output(peripherals.pins.gpio2).expect("Failed to configure LED");

    let mac = identity::read_mac().expect("Failed to read MAC address");
    let config = ConfigStore::load(NvsStore::new(nvs.clone()), mac);
    let link =
        EspWifiLink::new(peripherals.modem, sysloop, nvs).expect("Failed to initialize WiFi");
    let provisioner = NetworkProvisioner::new(link, SystemClock::new());

    let (events_tx, events_rx) = std::sync::mpsc::channel();
    let transport = NimbleTransport::new(events_tx);
    let mut service =
        TransportService::new(transport, config, provisioner, TelemetryReporter::new(OsRng));
    service.start();

    info!("Entering main loop...");
    let mut led_state = None;
    loop {
        while let Ok(event) = events_rx.try_recv() {
            event.dispatch(&mut service);
        }
        service.poll();

        let enabled = service.config().record().led_enabled();
        if led_state != Some(enabled) {
            let result = if enabled {
                led.set_high()
            } else {
                led.set_low()
            };
            match result {
                Ok(()) => led_state = Some(enabled),
                Err(e) => warn!("Failed to drive LED: {:?}", e),
            }
        }

        std::thread::sleep(LOOP_INTERVAL);
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo run --bin host-device' to run the simulator on the host.");
}
