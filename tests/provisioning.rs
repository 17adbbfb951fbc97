//! End-to-end provisioning flows against the simulated radio.

use ble_config_esp32::ble::ConsoleTransport;
use ble_config_esp32::storage::FileStore;
use ble_config_esp32::wifi::{CONNECT_POLL_INTERVAL_MS, MAX_CONNECT_POLLS};
use ble_config_esp32::{
    Clock, ConfigStore, ConnectionState, KeyValueStore, ManualClock, MemoryStore,
    NetworkProvisioner, SimulatedLink, TelemetryReporter, TransportCallbacks, TransportService,
};
use rand_core::OsRng;
use serde_json::Value;

const MAC: [u8; 6] = [0x24, 0x6F, 0x28, 0xAA, 0xBB, 0xCC];

type Service<S> = TransportService<ConsoleTransport<Vec<u8>>, S, SimulatedLink, ManualClock, OsRng>;

fn service<S: KeyValueStore>(store: S, link: SimulatedLink) -> (Service<S>, ManualClock) {
    let clock = ManualClock::new();
    let service = TransportService::new(
        ConsoleTransport::new(Vec::new()),
        ConfigStore::load(store, MAC),
        NetworkProvisioner::new(link, clock.clone()),
        TelemetryReporter::new(OsRng),
    );
    (service, clock)
}

/// Notifications printed so far, parsed.
fn notifications<S>(service: &Service<S>) -> Vec<Value>
where
    S: KeyValueStore,
{
    String::from_utf8_lossy(service.transport().writer())
        .lines()
        .filter_map(|line| line.strip_prefix("<< "))
        .map(|json| serde_json::from_str(json).unwrap())
        .collect()
}

fn statuses<S: KeyValueStore>(service: &Service<S>) -> Vec<String> {
    notifications(service)
        .iter()
        .map(|v| v["status"].as_str().unwrap().to_string())
        .filter(|s| s != "sensor_update")
        .collect()
}

fn run_for<S: KeyValueStore>(service: &mut Service<S>, clock: &ManualClock, ms: u64) {
    let end = clock.now_ms() + ms;
    while clock.now_ms() < end {
        clock.advance(50);
        service.poll();
    }
}

#[test]
fn test_home_credentials_connect() {
    let (mut svc, clock) = service(MemoryStore::new(), SimulatedLink::demo());
    svc.start();
    svc.on_connect();
    svc.on_write(br#"{"wifi_ssid":"Home","wifi_password":"secret"}"#);
    assert_eq!(svc.provisioner().state(), ConnectionState::Connecting);

    run_for(&mut svc, &clock, 10_000);

    assert_eq!(
        statuses(&svc),
        ["credentials_received", "wifi_connecting", "wifi_connected"]
    );
    let connected = notifications(&svc)
        .into_iter()
        .find(|v| v["status"] == "wifi_connected")
        .unwrap();
    assert_eq!(connected["ssid"], "Home");
    assert_eq!(connected["rssi"], -48);

    let record: Value = serde_json::from_slice(svc.transport().config_value()).unwrap();
    assert_eq!(record["wifiSSID"], "Home");
    assert_eq!(record["wifiPassword"], "****");
}

#[test]
fn test_home_credentials_time_out() {
    let (mut svc, clock) = service(MemoryStore::new(), SimulatedLink::new());
    svc.start();
    svc.on_connect();
    svc.on_write(br#"{"wifi_ssid":"Home","wifi_password":"secret"}"#);

    let bound = u64::from(MAX_CONNECT_POLLS) * u64::from(CONNECT_POLL_INTERVAL_MS);
    run_for(&mut svc, &clock, bound);

    assert_eq!(
        statuses(&svc),
        ["credentials_received", "wifi_connecting", "wifi_disconnected"]
    );
    let last = notifications(&svc)
        .into_iter()
        .rfind(|v| v["status"] == "wifi_disconnected")
        .unwrap();
    assert_eq!(last["ssid"], "Home");
    assert_eq!(last["message"], "timeout");
    assert_eq!(svc.provisioner().state(), ConnectionState::Disconnected);
}

#[test]
fn test_scan_delivers_every_network_in_order() {
    let mut link = SimulatedLink::new().with_scan_polls(3);
    for i in 0..12 {
        link = link.with_network(&format!("ap-{:02}", i), "pw123456", -40 - i);
    }
    let (mut svc, clock) = service(MemoryStore::new(), link);
    svc.start();
    svc.on_connect();
    svc.on_write(br#"{"command":"scan_wifi"}"#);
    run_for(&mut svc, &clock, 1_000);

    assert_eq!(
        statuses(&svc),
        ["scanning", "scan_results", "scan_results", "scan_results", "scan_complete"]
    );
    let chunks: Vec<Value> = notifications(&svc)
        .into_iter()
        .filter(|v| v["status"] == "scan_results")
        .collect();
    let mut names = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk["packet"], i + 1);
        assert_eq!(chunk["total_packets"], 3);
        assert_eq!(chunk["networks_found"], 12);
        for network in chunk["networks"].as_array().unwrap() {
            names.push(network["ssid"].as_str().unwrap().to_string());
        }
    }
    let expected: Vec<String> = (0..12).map(|i| format!("ap-{:02}", i)).collect();
    assert_eq!(names, expected);

    let record: Value = serde_json::from_slice(svc.transport().config_value()).unwrap();
    assert!(record.get("status").is_none());
    assert_eq!(record["deviceName"], "ESP32_Device");
}

#[test]
fn test_configuration_survives_restart() {
    let dir = std::env::temp_dir().join(format!("ble-config-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    {
        let (mut svc, _) = service(FileStore::new(&dir), SimulatedLink::demo());
        svc.start();
        svc.on_write(br#"{"deviceName":"Greenhouse","sensorUpdateInterval":120}"#);
        svc.on_write(br#"{"wifi_ssid":"Home","wifi_password":"secret"}"#);
    }

    let (mut svc, clock) = service(FileStore::new(&dir), SimulatedLink::demo());
    svc.start();
    let record = svc.config().record();
    assert_eq!(record.device_name(), "Greenhouse");
    assert_eq!(record.sensor_update_interval_secs(), 120);
    assert_eq!(record.wifi_password(), "secret");
    assert_eq!(svc.transport().advertised_name(), Some("Greenhouse"));
    assert_eq!(svc.provisioner().state(), ConnectionState::Connected);
    assert!(clock.now_ms() <= 10_000);

    let _ = std::fs::remove_dir_all(&dir);
}
