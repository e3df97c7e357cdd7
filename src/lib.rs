//! Scanshare — shared BLE scan arbitration.
//!
//! One scanning radio, many independent subsystems. Each subsystem
//! registers once with the [`coordinator::ScanCoordinator`], then issues
//! start/stop requests without coordinating with anyone else; the
//! coordinator merges the requests (consensus to enable, single veto to
//! disable), drives the hardware through exactly one transition at a
//! time, and fans advertisement reports out to every registered client.
//!
//! The crate is the portable layer: `no_std`, no allocator, testable on
//! any host with `cargo test`. Platform binaries are thin consumers that
//! implement [`radio::ScanRadio`] over their BLE stack, feed inbound
//! reports to the fan-out entry point, and wire listeners to the
//! subsystems that consume them.

#![cfg_attr(not(test), no_std)]

pub mod adv;
pub mod coordinator;
pub mod params;
pub mod radio;
pub mod status;
