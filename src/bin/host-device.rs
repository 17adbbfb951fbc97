//! Host simulator of the BLE configuration device.
//!
//! Stands in for both the radio and the companion app: notifications are
//! printed to stdout and each stdin line acts as a client action.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin host-device
//! ```
//!
//! ## Input lines
//!
//! - `connect` / `disconnect` - a client connects or disconnects
//! - `read` - read the config characteristic
//! - `reset` - restore the default configuration
//! - `drop-wifi` - the simulated access point goes away
//! - anything else - written to the control characteristic as-is, e.g.
//!   `{"wifi_ssid":"Home","wifi_password":"secret"}`
//!
//! State is kept in `~/.ble-config-esp32/` (override with `BLE_CONFIG_HOME`).

#[cfg(not(target_os = "espidf"))]
mod host {
    use ble_config_esp32::ble::ConsoleTransport;
    use ble_config_esp32::storage::FileStore;
    use ble_config_esp32::{
        identity, ConfigStore, NetworkProvisioner, SimulatedLink, SystemClock, TelemetryReporter,
        TransportEvent, TransportService,
    };
    use log::{error, info, warn};
    use rand_core::OsRng;
    use std::io::Stdout;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    const LOOP_INTERVAL: Duration = Duration::from_millis(50);

    type HostService =
        TransportService<ConsoleTransport<Stdout>, FileStore, SimulatedLink, SystemClock, OsRng>;

    /// One stdin line.
    #[derive(Debug)]
    enum HostInput {
        Event(TransportEvent),
        Read,
        Reset,
        DropWifi,
    }

    impl HostInput {
        fn parse(line: &str) -> Option<Self> {
            let line = line.trim();
            match line {
                "" => None,
                "connect" => Some(Self::Event(TransportEvent::Connected)),
                "disconnect" => Some(Self::Event(TransportEvent::Disconnected)),
                "read" => Some(Self::Read),
                "reset" => Some(Self::Reset),
                "drop-wifi" => Some(Self::DropWifi),
                data => Some(Self::Event(TransportEvent::Write(data.as_bytes().to_vec()))),
            }
        }
    }

    fn handle_input(service: &mut HostService, input: HostInput) {
        match input {
            HostInput::Event(event) => event.dispatch(service),
            HostInput::Read => {
                if !service.is_connected() {
                    warn!("No client connected (type 'connect' first)");
                    return;
                }
                if let Err(e) = service.transport_mut().print_config_value() {
                    error!("Failed to print config: {}", e);
                }
            }
            HostInput::Reset => service.reset_config(),
            HostInput::DropWifi => service.provisioner_mut().link_mut().drop_connection(),
        }
    }

    #[tokio::main(flavor = "current_thread")]
    pub async fn run() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        info!("=== BLE config device (host) starting ===");

        let store = FileStore::default_location().expect("Failed to locate state directory");
        info!("State directory: {}", store.root().display());

        let config = ConfigStore::load(store, identity::host_mac());
        let provisioner = NetworkProvisioner::new(SimulatedLink::demo(), SystemClock::new());
        let mut service: HostService = TransportService::new(
            ConsoleTransport::new(std::io::stdout()),
            config,
            provisioner,
            TelemetryReporter::new(OsRng),
        );
        service.start();

        let cancel = CancellationToken::new();
        let (input_tx, mut input_rx) = mpsc::channel(16);

        let stdin_cancel = cancel.clone();
        let stdin_task = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                tokio::select! {
                    _ = stdin_cancel.cancelled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            if let Some(input) = HostInput::parse(&line) {
                                if input_tx.send(input).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(None) => {
                            info!("stdin closed, still running (Ctrl+C to exit)");
                            break;
                        }
                        Err(e) => {
                            error!("Failed to read stdin: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        info!("Entering main loop (Ctrl+C to exit)...");

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ticker = tokio::time::interval(LOOP_INTERVAL);
        let mut input_open = true;

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Shutting down...");
                    cancel.cancel();
                    break;
                }
                input = input_rx.recv(), if input_open => match input {
                    Some(input) => handle_input(&mut service, input),
                    None => input_open = false,
                },
                _ = ticker.tick() => service.poll(),
            }
        }

        stdin_task.abort();
        info!("Shutdown complete");
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    host::run();
}

#[cfg(target_os = "espidf")]
fn main() {
    println!("host-device runs on the host only; flash the 'ble-config-esp32' binary instead.");
}
