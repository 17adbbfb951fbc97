//! In-process WiFi radio used by the host simulator and tests.
//!
//! Association and scanning complete after a configurable number of polls, so
//! timing behaviour can be driven deterministically.

use super::link::{LinkError, WifiLink};
use super::types::{NetworkInfo, WifiCredentials};
use log::debug;

const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;
const SIM_IP: &str = "192.168.4.20";
const DEFAULT_RSSI: i32 = -55;

#[derive(Debug, Clone)]
struct SimNetwork {
    info: NetworkInfo,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Association {
    Down,
    /// Joining; `None` remaining polls means the AP never answers.
    Joining { ssid: String, remaining: Option<u32> },
    Up { ssid: String },
}

/// Simulated station radio.
#[derive(Debug, Clone)]
pub struct SimulatedLink {
    networks: Vec<SimNetwork>,
    connect_polls: u32,
    scan_polls: Option<u32>,
    association: Association,
    last_ssid: Option<String>,
    scan_remaining: Option<Option<u32>>,
    begin_count: usize,
    scan_count: usize,
}

impl SimulatedLink {
    /// Radio with no networks in range. Joins take one poll, scans one poll.
    pub fn new() -> Self {
        Self {
            networks: Vec::new(),
            connect_polls: 1,
            scan_polls: Some(1),
            association: Association::Down,
            last_ssid: None,
            scan_remaining: None,
            begin_count: 0,
            scan_count: 0,
        }
    }

    /// A handful of nearby networks, including `Home` / `secret`.
    pub fn demo() -> Self {
        Self::new()
            .with_network("Home", "secret", -48)
            .with_network("Office-5G", "hunter22", -63)
            .with_network("Cafe", "", -71)
            .with_network("Neighbor", "letmein1", -80)
            .with_network("Printer-Setup", "", -84)
            .with_network("Garage", "tools4all", -88)
            .with_connect_polls(4)
            .with_scan_polls(6)
    }

    /// Add an access point; an empty password makes it open.
    pub fn with_network(mut self, ssid: &str, password: &str, rssi: i32) -> Self {
        self.networks.push(SimNetwork {
            info: NetworkInfo::new(ssid, rssi, !password.is_empty()),
            password: password.to_string(),
        });
        self
    }

    /// Polls of `is_connected` before a valid join completes.
    pub fn with_connect_polls(mut self, polls: u32) -> Self {
        self.connect_polls = polls.max(1);
        self
    }

    /// Polls of `scan_complete` before a scan finishes.
    pub fn with_scan_polls(mut self, polls: u32) -> Self {
        self.scan_polls = Some(polls.max(1));
        self
    }

    /// Scans never finish on their own.
    pub fn with_stuck_scan(mut self) -> Self {
        self.scan_polls = None;
        self
    }

    /// Drop the association as if the AP went away.
    pub fn drop_connection(&mut self) {
        debug!("sim: connection dropped");
        self.association = Association::Down;
    }

    /// Bring the last joined network back up without a `begin` call.
    pub fn restore_connection(&mut self) {
        if let Some(ssid) = self.last_ssid.clone() {
            debug!("sim: connection restored to {}", ssid);
            self.association = Association::Up { ssid };
        }
    }

    pub fn begin_count(&self) -> usize {
        self.begin_count
    }

    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_remaining.is_some()
    }

    /// An association is in progress and has not completed.
    pub fn is_joining(&self) -> bool {
        matches!(self.association, Association::Joining { .. })
    }

    fn find(&self, ssid: &str) -> Option<&SimNetwork> {
        self.networks.iter().find(|n| n.info.ssid == ssid)
    }
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiLink for SimulatedLink {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        if credentials.ssid().len() > MAX_SSID_LEN {
            return Err(LinkError::InvalidSsid);
        }
        if credentials.password().len() > MAX_PASSWORD_LEN {
            return Err(LinkError::InvalidPassword);
        }
        self.begin_count += 1;
        let accepted = self
            .find(credentials.ssid())
            .is_some_and(|n| n.password == credentials.password());
        self.association = Association::Joining {
            ssid: credentials.ssid().to_string(),
            remaining: accepted.then_some(self.connect_polls),
        };
        self.last_ssid = Some(credentials.ssid().to_string());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.association = Association::Down;
    }

    fn is_connected(&mut self) -> bool {
        if let Association::Joining {
            ssid,
            remaining: Some(remaining),
        } = &mut self.association
        {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                let ssid = std::mem::take(ssid);
                self.association = Association::Up { ssid };
            }
        }
        matches!(self.association, Association::Up { .. })
    }

    fn ip_addr(&self) -> Option<String> {
        match self.association {
            Association::Up { .. } => Some(SIM_IP.to_string()),
            _ => None,
        }
    }

    fn rssi(&self) -> Option<i32> {
        match &self.association {
            Association::Up { ssid } => Some(
                self.find(ssid)
                    .map(|n| n.info.rssi)
                    .unwrap_or(DEFAULT_RSSI),
            ),
            _ => None,
        }
    }

    fn start_scan(&mut self) -> Result<(), LinkError> {
        if self.scan_remaining.is_some() {
            return Err(LinkError::Radio("scan already running".into()));
        }
        // Like the real driver, a station still associating cannot scan.
        if matches!(self.association, Association::Joining { .. }) {
            return Err(LinkError::Radio("wifi still connecting".into()));
        }
        self.scan_count += 1;
        self.scan_remaining = Some(self.scan_polls);
        Ok(())
    }

    fn scan_complete(&mut self) -> bool {
        match &mut self.scan_remaining {
            Some(Some(remaining)) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            _ => false,
        }
    }

    fn take_scan_results(&mut self) -> Vec<NetworkInfo> {
        self.scan_remaining = None;
        self.networks.iter().map(|n| n.info.clone()).collect()
    }

    fn abort_scan(&mut self) {
        self.scan_remaining = None;
    }
}
