//! WiFi connection state machine.
//!
//! [`NetworkProvisioner`] is the only owner of [`ConnectionState`]. It never
//! waits on the radio except in [`NetworkProvisioner::connect_blocking`], which
//! runs once at startup before any client can connect. Everything else is
//! driven from the main loop through [`NetworkProvisioner::poll_link`] and
//! [`NetworkProvisioner::poll_scan`].
//!
//! ```text
//! Idle/Disconnected --credentials--> Connecting --link up--> Connected
//!                                    Connecting --20 polls--> Disconnected (timeout)
//!                                    Connected  --link lost--> Disconnected -> Connecting
//! any (not Scanning) --scan--> Scanning --done/10 s--> reconnect or pre-scan state
//! ```

use super::link::{LinkError, WifiLink};
use super::scan::chunk_results;
use super::types::{ConnectionState, DisconnectReason, LinkSummary, NetworkInfo, WifiCredentials};
use crate::clock::Clock;
use crate::protocol::StatusMessage;
use log::{debug, error, info, warn};
use std::fmt;

/// Interval between link polls while connecting.
pub const CONNECT_POLL_INTERVAL_MS: u32 = 500;

/// Link polls before a connection attempt times out.
pub const MAX_CONNECT_POLLS: u32 = 20;

/// Hard deadline for a network scan.
pub const SCAN_TIMEOUT_MS: u64 = 10_000;

/// Pause between consecutive `scan_results` notifications.
pub const CHUNK_DELAY_MS: u32 = 100;

/// Destination for status notifications.
pub trait StatusSink {
    fn emit(&mut self, message: StatusMessage);
}

impl StatusSink for Vec<StatusMessage> {
    fn emit(&mut self, message: StatusMessage) {
        self.push(message);
    }
}

/// Startup connection failure.
#[derive(Debug)]
pub enum ConnectError {
    /// No SSID configured; nothing was attempted.
    EmptySsid,
    /// The radio refused the attempt.
    Link(LinkError),
    /// Link did not come up within the poll bound.
    Timeout { polls: u32 },
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySsid => write!(f, "no SSID configured"),
            Self::Link(e) => write!(f, "link error: {}", e),
            Self::Timeout { polls } => write!(f, "not connected after {} polls", polls),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Link(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LinkError> for ConnectError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// Outcome of a scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStart {
    Started,
    /// A scan is already running; the request was ignored.
    Busy,
}

#[derive(Debug, Clone, Copy)]
struct ScanJob {
    deadline_ms: u64,
    resume: ConnectionState,
}

/// Owns the WiFi connection state and the radio.
pub struct NetworkProvisioner<W, C> {
    link: W,
    clock: C,
    state: ConnectionState,
    credentials: Option<WifiCredentials>,
    attempts: u32,
    scan: Option<ScanJob>,
}

impl<W: WifiLink, C: Clock> NetworkProvisioner<W, C> {
    pub fn new(link: W, clock: C) -> Self {
        Self {
            link,
            clock,
            state: ConnectionState::Idle,
            credentials: None,
            attempts: 0,
            scan: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Credentials of the current or most recent attempt.
    pub fn credentials(&self) -> Option<&WifiCredentials> {
        self.credentials.as_ref()
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    pub fn link(&self) -> &W {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut W {
        &mut self.link
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Link details reported with telemetry.
    pub fn summary(&self) -> LinkSummary {
        let connected = self.state == ConnectionState::Connected;
        LinkSummary {
            connected,
            ssid: self
                .credentials
                .as_ref()
                .map(|c| c.ssid().to_string())
                .unwrap_or_default(),
            ip: if connected { self.link.ip_addr() } else { None },
            rssi: if connected { self.link.rssi() } else { None },
        }
    }

    /// Connect and wait for the link, polling every 500 ms at most 20 times.
    ///
    /// Only used at startup, before notifications can be delivered.
    pub fn connect_blocking(&mut self, credentials: &WifiCredentials) -> Result<(), ConnectError> {
        if credentials.ssid().is_empty() {
            self.state = ConnectionState::Disconnected;
            return Err(ConnectError::EmptySsid);
        }
        self.credentials = Some(credentials.clone());
        self.link.disconnect();
        if let Err(e) = self.link.begin(credentials) {
            self.state = ConnectionState::Disconnected;
            return Err(e.into());
        }
        self.state = ConnectionState::Connecting;
        info!("Connecting to '{}'", credentials.ssid());

        for attempt in 1..=MAX_CONNECT_POLLS {
            self.clock.delay_ms(CONNECT_POLL_INTERVAL_MS);
            if self.link.is_connected() {
                self.state = ConnectionState::Connected;
                info!(
                    "Connected to '{}' ({})",
                    credentials.ssid(),
                    self.link.ip_addr().unwrap_or_default()
                );
                return Ok(());
            }
            debug!("Waiting for link ({}/{})", attempt, MAX_CONNECT_POLLS);
        }

        self.link.disconnect();
        self.state = ConnectionState::Disconnected;
        Err(ConnectError::Timeout {
            polls: MAX_CONNECT_POLLS,
        })
    }

    /// Start a connection attempt and return at once.
    ///
    /// The outcome is reported by [`poll_link`](Self::poll_link). While a scan
    /// is running the credentials are only stored; the scan's completion
    /// reconnects with them.
    pub fn connect_async(&mut self, credentials: &WifiCredentials, sink: &mut impl StatusSink) {
        if self.scan.is_some() {
            info!("Scan in progress, deferring connect to '{}'", credentials.ssid());
            self.credentials = (!credentials.ssid().is_empty()).then(|| credentials.clone());
            return;
        }
        if credentials.ssid().is_empty() {
            warn!("Ignoring credentials with empty SSID");
            self.credentials = None;
            self.link.disconnect();
            self.state = ConnectionState::Disconnected;
            sink.emit(StatusMessage::Disconnected {
                ssid: String::new(),
                message: DisconnectReason::EmptySsid.message(),
            });
            return;
        }
        self.credentials = Some(credentials.clone());
        self.begin_attempt(sink);
    }

    fn begin_attempt(&mut self, sink: &mut impl StatusSink) {
        let Some(credentials) = self.credentials.clone() else {
            return;
        };
        self.link.disconnect();
        self.attempts = 0;
        match self.link.begin(&credentials) {
            Ok(()) => {
                info!("Connecting to '{}'", credentials.ssid());
                self.state = ConnectionState::Connecting;
                sink.emit(StatusMessage::Connecting {
                    ssid: credentials.ssid().to_string(),
                });
            }
            Err(e) => {
                error!("Failed to start connection to '{}': {}", credentials.ssid(), e);
                self.state = ConnectionState::Disconnected;
                sink.emit(StatusMessage::Disconnected {
                    ssid: credentials.ssid().to_string(),
                    message: DisconnectReason::Failed(e.to_string()).message(),
                });
            }
        }
    }

    fn current_ssid(&self) -> String {
        self.credentials
            .as_ref()
            .map(|c| c.ssid().to_string())
            .unwrap_or_default()
    }

    fn report_connected(&mut self, sink: &mut impl StatusSink) {
        self.state = ConnectionState::Connected;
        let ssid = self.current_ssid();
        let ip = self.link.ip_addr().unwrap_or_default();
        let rssi = self.link.rssi().unwrap_or_default();
        info!("Connected to '{}' ip={} rssi={}", ssid, ip, rssi);
        sink.emit(StatusMessage::Connected { ssid, ip, rssi });
    }

    fn report_disconnected(&mut self, reason: DisconnectReason, sink: &mut impl StatusSink) {
        self.state = ConnectionState::Disconnected;
        sink.emit(StatusMessage::Disconnected {
            ssid: self.current_ssid(),
            message: reason.message(),
        });
    }

    /// One link check. Call every [`CONNECT_POLL_INTERVAL_MS`].
    pub fn poll_link(&mut self, sink: &mut impl StatusSink) {
        match self.state {
            ConnectionState::Connecting => {
                if self.link.is_connected() {
                    self.report_connected(sink);
                    return;
                }
                self.attempts += 1;
                if self.attempts >= MAX_CONNECT_POLLS {
                    warn!("Connection to '{}' timed out", self.current_ssid());
                    self.link.disconnect();
                    self.report_disconnected(DisconnectReason::Timeout, sink);
                }
            }
            ConnectionState::Connected => {
                if !self.link.is_connected() {
                    warn!("Lost connection to '{}'", self.current_ssid());
                    self.report_disconnected(DisconnectReason::Lost, sink);
                    self.begin_attempt(sink);
                }
            }
            ConnectionState::Idle | ConnectionState::Disconnected => {
                if self.credentials.is_some() && self.link.is_connected() {
                    info!("Link came back without a new attempt");
                    self.report_connected(sink);
                }
            }
            ConnectionState::Scanning => {}
        }
    }

    /// Start a scan unless one is already running.
    ///
    /// The current link is torn down; it is restored or re-established when
    /// the scan finishes.
    pub fn start_scan(&mut self, sink: &mut impl StatusSink) -> ScanStart {
        if self.scan.is_some() {
            debug!("Scan already running, ignoring request");
            return ScanStart::Busy;
        }
        sink.emit(StatusMessage::ScanStarted);
        let job = ScanJob {
            deadline_ms: self.clock.now_ms() + SCAN_TIMEOUT_MS,
            resume: self.state,
        };
        self.link.disconnect();
        self.state = ConnectionState::Scanning;
        self.scan = Some(job);
        info!("Scanning for networks");

        if let Err(e) = self.link.start_scan() {
            error!("Failed to start scan: {}", e);
            self.finish_scan(Vec::new(), sink);
        }
        ScanStart::Started
    }

    /// Advance a running scan; finishes it on completion or deadline.
    pub fn poll_scan(&mut self, sink: &mut impl StatusSink) {
        let Some(job) = self.scan else {
            return;
        };
        let results = if self.link.scan_complete() {
            self.link.take_scan_results()
        } else if self.clock.now_ms() >= job.deadline_ms {
            warn!("Scan timed out after {} ms", SCAN_TIMEOUT_MS);
            self.link.abort_scan();
            Vec::new()
        } else {
            return;
        };
        self.finish_scan(results, sink);
    }

    fn finish_scan(&mut self, results: Vec<NetworkInfo>, sink: &mut impl StatusSink) {
        let Some(job) = self.scan.take() else {
            return;
        };
        let networks_found = results.len();
        info!("Scan found {} networks", networks_found);

        for (i, chunk) in chunk_results(&results).into_iter().enumerate() {
            if i > 0 {
                self.clock.delay_ms(CHUNK_DELAY_MS);
            }
            sink.emit(chunk);
        }
        sink.emit(StatusMessage::ScanComplete { networks_found });

        if self.credentials.is_some() {
            self.begin_attempt(sink);
        } else {
            self.state = match job.resume {
                ConnectionState::Connected | ConnectionState::Connecting => {
                    ConnectionState::Disconnected
                }
                other => other,
            };
        }
    }
}
