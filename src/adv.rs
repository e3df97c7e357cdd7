//! Advertisement report types and client-side consumption helpers.
//!
//! The coordinator fans raw reports out to every registered
//! [`AdvListener`] synchronously, in registration order, without copying
//! the payload. Clients that want structured data run the report through
//! [`AdvParser`]; clients that live on an async executor can register a
//! [`ChannelSink`] and receive owned [`AdvEvent`]s from a channel instead.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Advertiser address type from the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrKind {
    Public,
    Random,
}

impl AddrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddrKind::Public => "public",
            AddrKind::Random => "random",
        }
    }
}

/// Advertisement event type, mirroring the HCI LE report event codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvKind {
    /// Connectable undirected (ADV_IND).
    ConnectableUndirected,
    /// Connectable directed (ADV_DIRECT_IND).
    ConnectableDirected,
    /// Scannable undirected (ADV_SCAN_IND).
    ScannableUndirected,
    /// Non-connectable undirected (ADV_NONCONN_IND).
    NonconnectableUndirected,
    /// Response to an active scan request (SCAN_RSP).
    ScanResponse,
}

impl AdvKind {
    /// Map an HCI LE Advertising Report event type code.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(AdvKind::ConnectableUndirected),
            0x01 => Some(AdvKind::ConnectableDirected),
            0x02 => Some(AdvKind::ScannableUndirected),
            0x03 => Some(AdvKind::NonconnectableUndirected),
            0x04 => Some(AdvKind::ScanResponse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdvKind::ConnectableUndirected => "adv_ind",
            AdvKind::ConnectableDirected => "adv_direct_ind",
            AdvKind::ScannableUndirected => "adv_scan_ind",
            AdvKind::NonconnectableUndirected => "adv_nonconn_ind",
            AdvKind::ScanResponse => "scan_rsp",
        }
    }
}

/// One inbound advertisement report, exactly as the radio stack delivered
/// it. The payload stays borrowed for the duration of the fan-out call.
#[derive(Debug, Clone, Copy)]
pub struct AdvReport<'a> {
    pub addr: [u8; 6],
    pub addr_kind: AddrKind,
    pub kind: AdvKind,
    pub rssi: i8,
    /// Raw AD structures (length/type/data triplets).
    pub data: &'a [u8],
}

/// Per-client advertisement callback.
///
/// Invoked synchronously from whatever context delivered the report — a
/// stack runner task or an ISR-adjacent context. Implementations must not
/// block; a listener that panics takes the firmware down with it.
pub trait AdvListener: Sync {
    fn on_report(&self, report: &AdvReport<'_>);
}

/// A parsed BLE advertisement event, owned and channel-friendly.
#[derive(Debug, Clone)]
pub struct AdvEvent {
    pub mac: [u8; 6],
    pub kind: AdvKind,
    pub name: heapless::String<33>,
    pub rssi: i8,
    /// 16-bit service UUIDs extracted from AD structures
    pub service_uuids_16: Vec<u16, 8>,
    /// Manufacturer company ID (0 if not present)
    pub manufacturer_id: u16,
}

/// Parse advertisement data (AD structures) to extract the local name,
/// service UUIDs and manufacturer-specific data.
///
/// AD structure format: [length] [type] [data...]
/// Types we care about:
///   0x02/0x03 = Incomplete/Complete list of 16-bit service UUIDs
///   0x08/0x09 = Shortened/Complete local name
///   0xFF      = Manufacturer specific data (first 2 bytes = company ID, little-endian)
pub struct AdvParser;

impl AdvParser {
    /// Parse a raw report into an owned [`AdvEvent`].
    ///
    /// Malformed AD structures terminate the walk; whatever was extracted
    /// up to that point is kept. Safe to call from any context (no
    /// allocation, no blocking).
    pub fn parse(report: &AdvReport<'_>) -> AdvEvent {
        let mut event = AdvEvent {
            mac: report.addr,
            kind: report.kind,
            name: heapless::String::new(),
            rssi: report.rssi,
            service_uuids_16: Vec::new(),
            manufacturer_id: 0,
        };

        let ad_data = report.data;
        let mut pos = 0;
        while pos < ad_data.len() {
            let len = ad_data[pos] as usize;
            if len == 0 || pos + 1 + len > ad_data.len() {
                break;
            }

            let ad_type = ad_data[pos + 1];
            let data = &ad_data[pos + 2..pos + 1 + len];

            match ad_type {
                // 16-bit service UUID lists
                0x02 | 0x03 => {
                    let mut i = 0;
                    while i + 1 < data.len() {
                        let uuid = u16::from_le_bytes([data[i], data[i + 1]]);
                        let _ = event.service_uuids_16.push(uuid);
                        i += 2;
                    }
                }
                // Shortened or Complete local name
                0x08 | 0x09 => {
                    if let Ok(name) = core::str::from_utf8(data) {
                        let _ = event.name.push_str(name);
                    }
                }
                // Manufacturer specific data
                0xFF => {
                    if data.len() >= 2 {
                        event.manufacturer_id = u16::from_le_bytes([data[0], data[1]]);
                    }
                }
                _ => {}
            }

            pos += 1 + len;
        }

        event
    }
}

/// Async channel type for parsed advertisement events.
pub type AdvEventChannel = Channel<CriticalSectionRawMutex, AdvEvent, 16>;

/// Listener that parses each report and forwards it to an async consumer.
///
/// Forwarding is `try_send`: if the consumer falls behind and the channel
/// fills up, events are dropped rather than blocking the fan-out.
pub struct ChannelSink<'a> {
    channel: &'a AdvEventChannel,
}

impl<'a> ChannelSink<'a> {
    pub fn new(channel: &'a AdvEventChannel) -> Self {
        Self { channel }
    }
}

impl AdvListener for ChannelSink<'_> {
    fn on_report(&self, report: &AdvReport<'_>) {
        let _ = self.channel.try_send(AdvParser::parse(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: [u8; 6] = [0x58, 0x8E, 0x81, 0xAA, 0xBB, 0xCC];

    fn report(data: &[u8]) -> AdvReport<'_> {
        AdvReport {
            addr: ADDR,
            addr_kind: AddrKind::Public,
            kind: AdvKind::ConnectableUndirected,
            rssi: -60,
            data,
        }
    }

    // ── AdvKind mapping ─────────────────────────────────────────────

    #[test]
    fn adv_kind_from_raw_codes() {
        assert_eq!(AdvKind::from_raw(0x00), Some(AdvKind::ConnectableUndirected));
        assert_eq!(AdvKind::from_raw(0x01), Some(AdvKind::ConnectableDirected));
        assert_eq!(AdvKind::from_raw(0x02), Some(AdvKind::ScannableUndirected));
        assert_eq!(AdvKind::from_raw(0x03), Some(AdvKind::NonconnectableUndirected));
        assert_eq!(AdvKind::from_raw(0x04), Some(AdvKind::ScanResponse));
        assert_eq!(AdvKind::from_raw(0x05), None);
        assert_eq!(AdvKind::from_raw(0xFF), None);
    }

    // ── AD structure parsing ────────────────────────────────────────

    #[test]
    fn parse_complete_local_name() {
        // len=8, type=0x09 (complete name), "Tracker"
        let data = [0x08, 0x09, b'T', b'r', b'a', b'c', b'k', b'e', b'r'];
        let event = AdvParser::parse(&report(&data));
        assert_eq!(event.mac, ADDR);
        assert_eq!(event.rssi, -60);
        assert_eq!(event.name.as_str(), "Tracker");
    }

    #[test]
    fn parse_service_uuids_16() {
        // len=5, type=0x03 (complete 16-bit UUID list), 0x180F + 0xFE9F
        let data = [0x05, 0x03, 0x0F, 0x18, 0x9F, 0xFE];
        let event = AdvParser::parse(&report(&data));
        assert_eq!(event.service_uuids_16.as_slice(), &[0x180F, 0xFE9F]);
    }

    #[test]
    fn parse_manufacturer_id() {
        // len=4, type=0xFF, company 0x004C (Apple), one payload byte
        let data = [0x04, 0xFF, 0x4C, 0x00, 0x12];
        let event = AdvParser::parse(&report(&data));
        assert_eq!(event.manufacturer_id, 0x004C);
    }

    #[test]
    fn parse_multiple_ad_structures() {
        let data = [
            0x03, 0x02, 0x0F, 0x18, // incomplete UUID list: 0x180F
            0x05, 0x08, b'B', b'e', b'a', b'c', // shortened name
            0x03, 0xFF, 0xE0, 0x00, // manufacturer 0x00E0 (Google)
        ];
        let event = AdvParser::parse(&report(&data));
        assert_eq!(event.service_uuids_16.as_slice(), &[0x180F]);
        assert_eq!(event.name.as_str(), "Beac");
        assert_eq!(event.manufacturer_id, 0x00E0);
    }

    #[test]
    fn parse_stops_on_truncated_structure() {
        // Second structure claims 9 bytes but only 2 remain.
        let data = [0x02, 0x0A, 0x00, 0x09, 0x09, b'X'];
        let event = AdvParser::parse(&report(&data));
        assert!(event.name.is_empty());
        assert!(event.service_uuids_16.is_empty());
    }

    #[test]
    fn parse_zero_length_structure_terminates() {
        let data = [0x00, 0x05, 0x09, b'A', b'B', b'C', b'D'];
        let event = AdvParser::parse(&report(&data));
        assert!(event.name.is_empty());
    }

    #[test]
    fn parse_empty_payload() {
        let event = AdvParser::parse(&report(&[]));
        assert!(event.name.is_empty());
        assert!(event.service_uuids_16.is_empty());
        assert_eq!(event.manufacturer_id, 0);
    }

    #[test]
    fn parse_non_utf8_name_ignored() {
        let data = [0x03, 0x09, 0xFF, 0xFE];
        let event = AdvParser::parse(&report(&data));
        assert!(event.name.is_empty());
    }

    // ── ChannelSink ─────────────────────────────────────────────────

    #[test]
    fn channel_sink_forwards_parsed_events() {
        let channel = AdvEventChannel::new();
        let sink = ChannelSink::new(&channel);

        let data = [0x05, 0x08, b'T', b'a', b'g', b'1'];
        sink.on_report(&report(&data));

        let event = channel.try_receive().expect("event should be queued");
        assert_eq!(event.mac, ADDR);
        assert_eq!(event.name.as_str(), "Tag1");
        assert!(channel.try_receive().is_err());
    }

    #[test]
    fn channel_sink_drops_on_overflow() {
        let channel = AdvEventChannel::new();
        let sink = ChannelSink::new(&channel);

        // Capacity is 16; the 17th report is dropped, not blocked on.
        for _ in 0..20 {
            sink.on_report(&report(&[]));
        }
        let mut received = 0;
        while channel.try_receive().is_ok() {
            received += 1;
        }
        assert_eq!(received, 16);
    }
}
