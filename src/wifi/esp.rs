//! ESP-IDF station driver behind [`WifiLink`].
//!
//! All calls are non-blocking; association progress and scan completion are
//! observed by polling.

use super::link::{LinkError, WifiLink};
use super::types::{NetworkInfo, WifiCredentials};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi, ScanConfig};
use esp_idf_sys::EspError;
use log::{debug, info, warn};

/// Station-mode WiFi on the ESP32 radio.
pub struct EspWifiLink {
    wifi: EspWifi<'static>,
}

impl EspWifiLink {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        Ok(Self { wifi })
    }

    /// Make sure the driver runs in station mode (needed before scanning).
    fn ensure_started(&mut self) -> Result<(), EspError> {
        if !self.wifi.is_started()? {
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
            self.wifi.start()?;
        }
        Ok(())
    }
}

impl WifiLink for EspWifiLink {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        let auth_method = if credentials.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid()
                .try_into()
                .map_err(|_| LinkError::InvalidSsid)?,
            password: credentials
                .password()
                .try_into()
                .map_err(|_| LinkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&config)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        self.wifi.connect()?;
        info!("WiFi association started: {}", credentials.ssid());
        Ok(())
    }

    // Also cancels an association still in progress: the driver refuses to
    // scan while connecting, and a stale join must not complete later.
    fn disconnect(&mut self) {
        if !self.wifi.is_started().unwrap_or(false) {
            return;
        }
        if let Err(e) = self.wifi.disconnect() {
            debug!("WiFi disconnect ignored: {:?}", e);
        }
    }

    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn ip_addr(&self) -> Option<String> {
        if !self.wifi.is_connected().unwrap_or(false) {
            return None;
        }
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| format!("{}", info.ip))
    }

    fn rssi(&self) -> Option<i32> {
        if !self.wifi.is_connected().unwrap_or(false) {
            return None;
        }
        self.wifi.driver().get_rssi().ok()
    }

    fn start_scan(&mut self) -> Result<(), LinkError> {
        self.ensure_started()?;
        self.wifi.start_scan(&ScanConfig::default(), false)?;
        Ok(())
    }

    fn scan_complete(&mut self) -> bool {
        self.wifi.is_scan_done().unwrap_or(false)
    }

    fn take_scan_results(&mut self) -> Vec<NetworkInfo> {
        match self.wifi.get_scan_result() {
            Ok(aps) => aps
                .into_iter()
                .map(|ap| {
                    NetworkInfo::new(
                        ap.ssid.as_str(),
                        i32::from(ap.signal_strength),
                        !matches!(ap.auth_method, None | Some(AuthMethod::None)),
                    )
                })
                .collect(),
            Err(e) => {
                warn!("Failed to read scan results: {:?}", e);
                Vec::new()
            }
        }
    }

    fn abort_scan(&mut self) {
        if let Err(e) = self.wifi.stop_scan() {
            warn!("Failed to stop scan: {:?}", e);
        }
    }
}
