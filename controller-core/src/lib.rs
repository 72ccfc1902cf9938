#![no_std]

// Shared logic for the BatterBox safety interlock and status indicator.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Time is supplied by the caller as a generic instant and
// blocking waits go through `embedded_hal::delay::DelayNs`, so the same control
// cycle runs against Embassy on the board and a simulated clock on the host.

pub mod config;
pub mod controller;
pub mod events;
pub mod indicator;
pub mod interlock;
pub mod lines;
pub mod status;

pub use config::{ConfigError, IndicatorConfig, InterlockConfig};
pub use controller::{ControllerError, CycleReport, InterlockController};
pub use interlock::{InterlockInputs, InterlockState};
