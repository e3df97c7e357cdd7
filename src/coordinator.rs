//! Shared-scan arbitration core.
//!
//! Several independent subsystems (beacon trackers, proximity sensing,
//! companion-app sync) share one scanning radio. Each issues start/stop
//! requests without knowing about the others; the coordinator merges them
//! and guarantees the radio sees at most one enable or disable at a time.
//!
//! The policy is deliberately asymmetric. Enabling requires consensus:
//! someone must want the scan and nobody may be vetoing it. Disabling is
//! unilateral: a single `request_stop` takes the radio down immediately,
//! no matter how many other clients still want it, and keeps it down
//! until that client calls `resume` or `restart`.
//!
//! All shared state is atomics; the only serialization point is a
//! compare-and-swap on the active flag, so callers from any context
//! never block on each other.

use core::cell::{Cell, UnsafeCell};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use critical_section::Mutex;

use crate::adv::{AdvListener, AdvReport};
use crate::params::ScanParams;
use crate::radio::ScanRadio;
use crate::status::CoordinatorStatus;

/// Maximum number of clients that can share the scan resource.
pub const MAX_CLIENTS: usize = 8;

// The wants/vetoes masks hold one bit per client.
const _: () = assert!(MAX_CLIENTS <= u32::BITS as usize);

/// Identifier issued by [`ScanCoordinator::register`], `0..MAX_CLIENTS`.
pub type ClientId = u8;

/// Errors returned by coordinator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorError {
    /// All `MAX_CLIENTS` slots are taken.
    CapacityExceeded,
    /// `set_parameters` was called after a client had already registered.
    ParameterChangeRejected,
}

/// One entry in the append-only client table.
///
/// `listener` is written exactly once, by the single caller that was
/// handed this slot's index, then published through `ready`.
struct ClientSlot<'a> {
    ready: AtomicBool,
    listener: UnsafeCell<Option<&'a dyn AdvListener>>,
}

impl ClientSlot<'_> {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            listener: UnsafeCell::new(None),
        }
    }
}

/// Arbitrates shared access to the scanning radio.
///
/// Owned by the platform binary for the process lifetime and passed by
/// reference to every subsystem that needs the scan; there is no global
/// instance. All methods take `&self` and are safe to call concurrently
/// from any context.
pub struct ScanCoordinator<'a> {
    slots: [ClientSlot<'a>; MAX_CLIENTS],
    /// Monotonic id allocator; doubles as the registered-client count.
    registered: AtomicUsize,
    /// One bit per client that currently wants the scan running.
    wants: AtomicU32,
    /// One bit per client that is currently vetoing the scan.
    vetoes: AtomicU32,
    /// Resource state: `false` = idle, `true` = active. The CAS on this
    /// flag is what makes hardware transitions single-writer.
    active: AtomicBool,
    starts: AtomicU32,
    stops: AtomicU32,
    params: Mutex<Cell<ScanParams>>,
    radio: &'a dyn ScanRadio,
}

// SAFETY: each slot's listener cell has exactly one writer (the caller
// that won that index from `registered.fetch_update`) and is only read
// after the Release store of `ready` is observed with Acquire.
unsafe impl Sync for ScanCoordinator<'_> {}

impl<'a> ScanCoordinator<'a> {
    /// Create a coordinator driving the given radio, with default
    /// parameters and no clients.
    pub fn new(radio: &'a dyn ScanRadio) -> Self {
        Self {
            slots: core::array::from_fn(|_| ClientSlot::new()),
            registered: AtomicUsize::new(0),
            wants: AtomicU32::new(0),
            vetoes: AtomicU32::new(0),
            active: AtomicBool::new(false),
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            params: Mutex::new(Cell::new(ScanParams::new())),
            radio,
        }
    }

    // ── Registration and configuration ──────────────────────────────

    /// Register a client, returning its id.
    ///
    /// Ids are issued in order and never reused; clients live for the
    /// rest of the process. Fails with [`CoordinatorError::CapacityExceeded`]
    /// once all slots are taken, leaving the table untouched.
    pub fn register(&self, listener: &'a dyn AdvListener) -> Result<ClientId, CoordinatorError> {
        let id = self
            .registered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n < MAX_CLIENTS {
                    Some(n + 1)
                } else {
                    None
                }
            })
            .map_err(|_| CoordinatorError::CapacityExceeded)?;

        let slot = &self.slots[id];
        // Sole writer for this slot until `ready` is published below.
        unsafe { *slot.listener.get() = Some(listener) };
        slot.ready.store(true, Ordering::Release);

        log::debug!("scan client {id} registered");
        Ok(id as ClientId)
    }

    /// Replace the scan parameters.
    ///
    /// Only allowed while no client has registered: once subsystems are
    /// attached, changing timing underneath them is rejected so a late
    /// initializer cannot silently alter behavior the others depend on.
    pub fn set_parameters(&self, params: ScanParams) -> Result<(), CoordinatorError> {
        if self.registered.load(Ordering::Acquire) != 0 {
            return Err(CoordinatorError::ParameterChangeRejected);
        }
        critical_section::with(|cs| self.params.borrow(cs).set(params));
        Ok(())
    }

    /// Snapshot of the currently configured scan parameters.
    pub fn parameters(&self) -> ScanParams {
        critical_section::with(|cs| self.params.borrow(cs).get())
    }

    // ── Start/stop arbitration ──────────────────────────────────────

    /// Assert that `id` wants the scan running.
    ///
    /// The radio is enabled if the transition rule is now satisfied.
    /// Idempotent: repeating the call changes nothing and issues no
    /// second hardware enable.
    pub fn request_start(&self, id: ClientId) {
        let Some(bit) = self.client_bit(id, "request_start") else {
            return;
        };
        self.wants.fetch_or(bit, Ordering::AcqRel);
        self.evaluate();
    }

    /// Veto the scan: take the radio down now and keep it down.
    ///
    /// Clears the client's want, records its veto, and disables the
    /// hardware immediately regardless of what other clients want. The
    /// scan stays off until this client calls [`resume`](Self::resume)
    /// or [`restart`](Self::restart).
    ///
    /// A disable failure is logged and the coordinator still reports the
    /// scan as stopped (the veto must win); it is not returned to the
    /// caller.
    pub fn request_stop(&self, id: ClientId) {
        let Some(bit) = self.client_bit(id, "request_stop") else {
            return;
        };
        self.wants.fetch_and(!bit, Ordering::AcqRel);
        self.vetoes.fetch_or(bit, Ordering::AcqRel);

        if self
            .active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Already idle, or another caller is disabling right now.
            return;
        }
        match self.radio.disable() {
            Ok(()) => {
                self.stops.fetch_add(1, Ordering::Relaxed);
                log::debug!("scan disabled (veto from client {id})");
            }
            Err(err) => {
                // Fail open to idle: keep reporting the scan as stopped
                // and let the veto hold. The radio may actually still be
                // running; see the module docs.
                log::error!("scan disable failed: {}, assuming stopped", err.as_str());
            }
        }
    }

    /// Withdraw `id`'s veto without asserting a want.
    ///
    /// The scan comes back only if some client's want is still standing
    /// and no other veto remains.
    pub fn resume(&self, id: ClientId) {
        let Some(bit) = self.client_bit(id, "resume") else {
            return;
        };
        self.vetoes.fetch_and(!bit, Ordering::AcqRel);
        self.evaluate();
    }

    /// Withdraw `id`'s veto and assert its want in one call.
    pub fn restart(&self, id: ClientId) {
        let Some(bit) = self.client_bit(id, "restart") else {
            return;
        };
        self.vetoes.fetch_and(!bit, Ordering::AcqRel);
        self.wants.fetch_or(bit, Ordering::AcqRel);
        self.evaluate();
    }

    /// Validate an id against the issued range and map it to its mask
    /// bit. Out-of-range ids are a caller bug: logged, never acted on.
    fn client_bit(&self, id: ClientId, op: &str) -> Option<u32> {
        if (id as usize) < self.registered.load(Ordering::Acquire) {
            Some(1u32 << id)
        } else {
            log::warn!("{op} from unregistered scan client {id}, ignoring");
            None
        }
    }

    /// Apply the transition rule: enable the radio iff someone wants the
    /// scan and nobody vetoes it.
    ///
    /// The idle→active CAS picks a single winner among concurrent
    /// callers; only the winner touches the hardware. An enable failure
    /// rolls the flag back so the next mutating call re-attempts.
    fn evaluate(&self) {
        let wants = self.wants.load(Ordering::Acquire);
        let vetoes = self.vetoes.load(Ordering::Acquire);
        if wants == 0 || vetoes != 0 {
            return;
        }
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Already active, or another caller is enabling right now.
            return;
        }

        let params = self.parameters();
        match self.radio.enable(&params) {
            Ok(()) => {
                self.starts.fetch_add(1, Ordering::Relaxed);
                log::debug!("scan enabled (wants={wants:#04x})");
            }
            Err(err) => {
                self.active.store(false, Ordering::Release);
                log::error!("scan enable failed: {}", err.as_str());
            }
        }
    }

    // ── Advertisement fan-out ───────────────────────────────────────

    /// Deliver an advertisement report to every registered client, in
    /// registration order.
    ///
    /// Called by the radio stack integration whenever a report arrives.
    /// Listeners run synchronously on the delivering context and receive
    /// the report by reference, unmodified.
    pub fn on_adv_report(&self, report: &AdvReport<'_>) {
        for slot in &self.slots {
            if !slot.ready.load(Ordering::Acquire) {
                continue;
            }
            // SAFETY: `ready` was stored with Release after the one-time
            // listener write, so this read sees the initialized value.
            if let Some(listener) = unsafe { *slot.listener.get() } {
                listener.on_report(report);
            }
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Whether the radio is currently enabled.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Number of successful hardware enables since creation.
    pub fn starts_count(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Number of successful hardware disables since creation.
    pub fn stops_count(&self) -> u32 {
        self.stops.load(Ordering::Relaxed)
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.registered.load(Ordering::Acquire)
    }

    /// Snapshot of the coordinator state for status reporting.
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            active: self.is_active(),
            clients: self.client_count() as u8,
            starts: self.starts_count(),
            stops: self.stops_count(),
        }
    }
}
