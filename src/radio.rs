//! Hardware scan radio interface.
//!
//! The coordinator never talks to a BLE controller directly; platform
//! binaries hand it something implementing [`ScanRadio`]. Calls are made
//! synchronously from whichever caller context wins the state CAS, so
//! implementations must be safe to invoke from any context and must not
//! block for long.

use crate::params::ScanParams;

/// Errors a radio backend may report from enable/disable.
///
/// The coordinator logs these and moves on — it never retries on its own.
/// A failed enable is retried naturally by the next start/resume/restart
/// call; a failed disable leaves the coordinator assuming the radio is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The controller is mid-operation and cannot take the command now.
    Busy,
    /// The supplied parameters were refused by the controller.
    InvalidParams,
    /// Any other controller failure.
    Failed,
}

impl RadioError {
    pub fn as_str(&self) -> &'static str {
        match self {
            RadioError::Busy => "busy",
            RadioError::InvalidParams => "invalid_params",
            RadioError::Failed => "failed",
        }
    }
}

/// Start/stop primitives of the underlying scanning hardware.
///
/// At most one `enable` and at most one `disable` is ever in flight at a
/// time; the coordinator's compare-and-swap guard guarantees it. `Sync` is
/// required because the winning caller may be on any thread or task.
pub trait ScanRadio: Sync {
    /// Start scanning with the given parameters.
    fn enable(&self, params: &ScanParams) -> Result<(), RadioError>;

    /// Stop scanning.
    fn disable(&self) -> Result<(), RadioError>;
}
