//! Serializable coordinator status for companion/telemetry transports.
//!
//! Snapshots are framed as newline-delimited JSON so they can ride the
//! same NDJSON stream as the rest of the device's output.

use serde::Serialize;

/// Point-in-time view of the coordinator, taken by
/// [`ScanCoordinator::status`](crate::coordinator::ScanCoordinator::status).
///
/// Counters are observability data only; nothing in the arbitration
/// logic reads them back.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CoordinatorStatus {
    /// Whether the radio is currently enabled.
    pub active: bool,
    /// Number of registered clients.
    pub clients: u8,
    /// Successful hardware enables since boot.
    pub starts: u32,
    /// Successful hardware disables since boot.
    pub stops: u32,
}

/// Maximum size of a serialized status line.
pub const MAX_STATUS_LEN: usize = 128;

/// Serialize a status snapshot to NDJSON bytes.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_status(status: &CoordinatorStatus, buf: &mut [u8]) -> Option<usize> {
    match serde_json_core::to_slice(status, buf) {
        Ok(len) => {
            // Append newline for NDJSON
            if len < buf.len() {
                buf[len] = b'\n';
                Some(len + 1)
            } else {
                Some(len)
            }
        }
        Err(_) => None,
    }
}
