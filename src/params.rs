//! Scan parameter blob shared by all coordinator clients.
//!
//! Intervals are in BLE controller units of 0.625 ms, matching what the
//! radio driver expects. The coordinator locks the blob once the first
//! client registers, so the values below double as the
//! set-and-forget defaults for firmware that never reconfigures.

/// Duration of one controller scan timing unit in microseconds.
pub const SCAN_UNIT_US: u32 = 625;

/// Smallest interval/window the controller accepts (2.5 ms).
pub const SCAN_TIMING_MIN: u16 = 0x0004;

/// Largest interval/window the controller accepts (10.24 s).
pub const SCAN_TIMING_MAX: u16 = 0x4000;

/// Default scan interval: 0x0060 units = 60 ms.
pub const DEFAULT_INTERVAL: u16 = 0x0060;

/// Default scan window: 0x0030 units = 30 ms.
/// Half the interval leaves the radio free for connections and advertising.
pub const DEFAULT_WINDOW: u16 = 0x0030;

/// Whether the radio sends scan requests for additional advertisement data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Listen only. Cheaper, and invisible to advertisers.
    Passive,
    /// Request scan responses from advertisers.
    Active,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Passive => "passive",
            ScanType::Active => "active",
        }
    }
}

/// Radio scan configuration.
///
/// Mutable only while the coordinator has zero registered clients
/// (`ScanCoordinator::set_parameters`); afterwards the stored copy is
/// what every hardware enable uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    /// Time between scan window starts, in 0.625 ms units.
    pub interval: u16,
    /// Time the receiver is open per interval, in 0.625 ms units.
    pub window: u16,
    pub scan_type: ScanType,
    /// Ask the controller to suppress duplicate advertiser reports.
    pub filter_duplicates: bool,
}

impl ScanParams {
    pub const fn new() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            window: DEFAULT_WINDOW,
            scan_type: ScanType::Passive,
            filter_duplicates: true,
        }
    }

    /// Check the controller timing constraints: both values in range and
    /// the window no longer than the interval.
    pub fn is_valid(&self) -> bool {
        let in_range =
            |v: u16| (SCAN_TIMING_MIN..=SCAN_TIMING_MAX).contains(&v);
        in_range(self.interval) && in_range(self.window) && self.window <= self.interval
    }

    pub fn interval_us(&self) -> u32 {
        self.interval as u32 * SCAN_UNIT_US
    }

    pub fn window_us(&self) -> u32 {
        self.window as u32 * SCAN_UNIT_US
    }
}

impl Default for ScanParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ScanParams::new();
        assert!(params.is_valid());
        assert_eq!(params.interval, DEFAULT_INTERVAL);
        assert_eq!(params.window, DEFAULT_WINDOW);
        assert_eq!(params.scan_type, ScanType::Passive);
        assert!(params.filter_duplicates);
    }

    #[test]
    fn default_trait_matches_new() {
        assert_eq!(ScanParams::default(), ScanParams::new());
    }

    #[test]
    fn unit_conversion() {
        let params = ScanParams::new();
        assert_eq!(params.interval_us(), 60_000);
        assert_eq!(params.window_us(), 30_000);
    }

    #[test]
    fn window_longer_than_interval_is_invalid() {
        let params = ScanParams {
            interval: 0x0010,
            window: 0x0020,
            ..ScanParams::new()
        };
        assert!(!params.is_valid());
    }

    #[test]
    fn timing_range_bounds() {
        let mut params = ScanParams::new();
        params.interval = SCAN_TIMING_MIN - 1;
        params.window = SCAN_TIMING_MIN - 1;
        assert!(!params.is_valid());

        params.interval = SCAN_TIMING_MAX;
        params.window = SCAN_TIMING_MAX;
        assert!(params.is_valid());

        params.interval = SCAN_TIMING_MAX + 1;
        assert!(!params.is_valid());
    }

    #[test]
    fn scan_type_strings() {
        assert_eq!(ScanType::Passive.as_str(), "passive");
        assert_eq!(ScanType::Active.as_str(), "active");
    }
}
