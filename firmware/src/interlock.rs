//! Binds the shared interlock controller to Embassy's monotonic clock.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::ops::Add;

use controller_core::{InterlockConfig, InterlockController};
use embassy_time::{Duration, Instant};

/// Period of the control cycle.
pub const CYCLE_PERIOD: Duration = Duration::from_millis(1);

/// Controller specialised for the firmware clock.
pub type FirmwareController = InterlockController<FirmwareInstant>;

/// Embassy instant adapted to the `core::time::Duration` arithmetic the
/// shared controller expects.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub const fn into_embassy(self) -> Instant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(value: Instant) -> Self {
        Self(value)
    }
}

impl Add<core::time::Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: core::time::Duration) -> Self::Output {
        Self(self.0 + core_duration_to_embassy(rhs))
    }
}

fn core_duration_to_embassy(duration: core::time::Duration) -> Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

/// Board configuration: default dead-time, warm-up, and blink units.
pub const fn board_config() -> InterlockConfig {
    InterlockConfig::new()
}
