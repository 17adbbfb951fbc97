//! Simulated sensor readings and the reporting cadence.
//!
//! [`TelemetryReporter`] decides when the main loop should poll the WiFi link
//! (every [`LINK_POLL_INTERVAL_MS`]) and when to push a `sensor_update`
//! (every `refreshRate` ms while a client is connected).

use crate::protocol::SensorSnapshot;
use crate::wifi::LinkSummary;
use rand_core::RngCore;

/// Cadence of link status polling.
pub const LINK_POLL_INTERVAL_MS: u64 = 500;

const TEMP_START: f32 = 25.0;
const TEMP_FLOOR: f32 = 18.0;
const TEMP_DRIFT: f32 = 0.02;
const TEMP_JITTER: f32 = 0.3;

const HUMIDITY_START: f32 = 65.0;
const HUMIDITY_FLOOR: f32 = 40.0;
const HUMIDITY_DRIFT: f32 = 0.05;
const HUMIDITY_JITTER: f32 = 1.0;

const BATTERY_FULL: f32 = 100.0;
const BATTERY_FLOOR: f32 = 5.0;
const BATTERY_DRAIN: f32 = 0.1;

/// Round to one decimal, the precision the app displays.
fn tenths(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Produces readings that drift downward with a little noise.
///
/// Temperature and humidity restart from their initial level once they reach
/// their floor; the battery "recharges" to 100 %.
pub struct SensorSimulator<R> {
    rng: R,
    temperature: f32,
    humidity: f32,
    battery: f32,
}

impl<R: RngCore> SensorSimulator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            temperature: TEMP_START,
            humidity: HUMIDITY_START,
            battery: BATTERY_FULL,
        }
    }

    /// Uniform noise in `[-amplitude, amplitude]`.
    fn jitter(&mut self, amplitude: f32) -> f32 {
        let unit = self.rng.next_u32() as f32 / u32::MAX as f32;
        (unit * 2.0 - 1.0) * amplitude
    }

    /// Advance the simulation one step and return (temperature, humidity, battery).
    pub fn sample(&mut self) -> (f32, f32, f32) {
        self.temperature -= TEMP_DRIFT;
        if self.temperature <= TEMP_FLOOR {
            self.temperature = TEMP_START;
        }
        self.humidity -= HUMIDITY_DRIFT;
        if self.humidity <= HUMIDITY_FLOOR {
            self.humidity = HUMIDITY_START;
        }
        self.battery -= BATTERY_DRAIN;
        if self.battery <= BATTERY_FLOOR {
            self.battery = BATTERY_FULL;
        }

        let temperature = self.temperature + self.jitter(TEMP_JITTER);
        let humidity = (self.humidity + self.jitter(HUMIDITY_JITTER)).clamp(0.0, 100.0);
        (temperature, humidity, self.battery)
    }
}

/// Cadence bookkeeping plus snapshot assembly.
pub struct TelemetryReporter<R> {
    sensors: SensorSimulator<R>,
    last_link_poll: Option<u64>,
    last_report: Option<u64>,
}

fn due(last: &mut Option<u64>, now_ms: u64, interval_ms: u64) -> bool {
    match *last {
        Some(at) if now_ms.saturating_sub(at) < interval_ms => false,
        _ => {
            *last = Some(now_ms);
            true
        }
    }
}

impl<R: RngCore> TelemetryReporter<R> {
    pub fn new(rng: R) -> Self {
        Self {
            sensors: SensorSimulator::new(rng),
            last_link_poll: None,
            last_report: None,
        }
    }

    /// True once per link poll interval.
    pub fn link_poll_due(&mut self, now_ms: u64) -> bool {
        due(&mut self.last_link_poll, now_ms, LINK_POLL_INTERVAL_MS)
    }

    /// True once per refresh interval.
    pub fn report_due(&mut self, now_ms: u64, refresh_rate_ms: u32) -> bool {
        due(&mut self.last_report, now_ms, u64::from(refresh_rate_ms))
    }

    /// Restart the refresh interval (after an out-of-cadence snapshot).
    pub fn mark_reported(&mut self, now_ms: u64) {
        self.last_report = Some(now_ms);
    }

    /// Build one snapshot; the temperature is scaled by `calibration`.
    pub fn snapshot(&mut self, calibration: f32, link: &LinkSummary, now_ms: u64) -> SensorSnapshot {
        let (temperature, humidity, battery) = self.sensors.sample();
        SensorSnapshot {
            temperature: tenths(temperature * calibration),
            humidity: tenths(humidity),
            battery: tenths(battery),
            wifi_connected: link.connected,
            wifi_ssid: link.ssid.clone(),
            ip_address: link.ip.clone(),
            rssi: link.rssi,
            timestamp: now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always returns the midpoint, so jitter is (almost exactly) zero.
    struct MidRng;

    impl RngCore for MidRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX / 2
        }
        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0x7f);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn link() -> LinkSummary {
        LinkSummary {
            connected: true,
            ssid: "Home".into(),
            ip: Some("192.168.1.50".into()),
            rssi: Some(-60),
        }
    }

    #[test]
    fn test_readings_drift_downward() {
        let mut sim = SensorSimulator::new(MidRng);
        let (t1, h1, b1) = sim.sample();
        for _ in 0..10 {
            sim.sample();
        }
        let (t2, h2, b2) = sim.sample();
        assert!(t2 < t1);
        assert!(h2 < h1);
        assert!(b2 < b1);
    }

    #[test]
    fn test_battery_wraps_to_full() {
        let mut sim = SensorSimulator::new(MidRng);
        let mut previous = BATTERY_FULL;
        let mut wrapped = false;
        for _ in 0..2_000 {
            let (_, _, battery) = sim.sample();
            assert!(battery > BATTERY_FLOOR);
            if battery > previous {
                assert_eq!(battery, BATTERY_FULL);
                wrapped = true;
                break;
            }
            previous = battery;
        }
        assert!(wrapped);
    }

    #[test]
    fn test_calibration_scales_temperature() {
        let mut plain = TelemetryReporter::new(MidRng);
        let mut doubled = TelemetryReporter::new(MidRng);
        let a = plain.snapshot(1.0, &link(), 0);
        let b = doubled.snapshot(2.0, &link(), 0);
        assert!((b.temperature - 2.0 * a.temperature).abs() < 0.2);
    }

    #[test]
    fn test_snapshot_carries_link_summary() {
        let mut reporter = TelemetryReporter::new(MidRng);
        let snap = reporter.snapshot(1.0, &link(), 4_321);
        assert!(snap.wifi_connected);
        assert_eq!(snap.wifi_ssid, "Home");
        assert_eq!(snap.ip_address.as_deref(), Some("192.168.1.50"));
        assert_eq!(snap.rssi, Some(-60));
        assert_eq!(snap.timestamp, 4_321);
    }

    #[test]
    fn test_cadence() {
        let mut reporter = TelemetryReporter::new(MidRng);
        assert!(reporter.link_poll_due(0));
        assert!(!reporter.link_poll_due(499));
        assert!(reporter.link_poll_due(500));

        reporter.mark_reported(1_000);
        assert!(!reporter.report_due(5_999, 5_000));
        assert!(reporter.report_due(6_000, 5_000));
        assert!(!reporter.report_due(6_001, 5_000));
    }
}
