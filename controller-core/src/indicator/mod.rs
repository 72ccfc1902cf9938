//! Status indicator engine.
//!
//! A single indicator light encodes the interlock state as a square wave:
//! high for `on_units` blink units, then low for `off_units`. The engine is
//! cooperative. [`IndicatorEngine::tick`] compares the supplied timestamp
//! against the last unit boundary and never blocks. Boundaries advance by
//! whole units, so uneven call intervals shift an edge by at most one tick.

use core::fmt;
use core::ops::Add;
use core::time::Duration;

pub mod mapper;
pub mod table;

pub use mapper::{StatusPatterns, register_status_patterns};
pub use table::{BlinkPattern, MAX_BLINK_PATTERNS, PatternId, PatternTable, PatternTableError};

use crate::config::IndicatorConfig;

/// Longest stall, in units, bridged by stepping along the unit grid.
const MAX_CATCH_UP_UNITS: u32 = 1_024;

/// Blink unit selection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cadence {
    /// System state known; slow readable blinks.
    Normal,
    /// Controller not yet initialized; fast blinks.
    Unsafe,
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cadence::Normal => "normal",
            Cadence::Unsafe => "unsafe",
        })
    }
}

/// Non-blocking blink sequencer for one indicator output.
#[derive(Clone, Debug)]
pub struct IndicatorEngine<I> {
    units: IndicatorConfig,
    cadence: Cadence,
    active: PatternId,
    last_toggle: Option<I>,
    level: bool,
    phase: u16,
}

impl<I> IndicatorEngine<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates an engine showing `initial` at the unsafe cadence.
    #[must_use]
    pub const fn new(initial: PatternId, units: IndicatorConfig) -> Self {
        Self {
            units,
            cadence: Cadence::Unsafe,
            active: initial,
            last_toggle: None,
            level: false,
            phase: 0,
        }
    }

    /// Swaps the active pattern without touching the phase or timing, so a
    /// switch never produces a double flash or a frozen light.
    ///
    /// Returns `true` when the pattern actually changed.
    pub fn set_pattern(&mut self, id: PatternId) -> bool {
        let changed = self.active != id;
        self.active = id;
        changed
    }

    pub fn set_cadence(&mut self, cadence: Cadence) {
        self.cadence = cadence;
    }

    /// Advances the engine to `now`.
    ///
    /// Returns the new indicator level when the output must be written. The
    /// first call always returns the level for phase zero.
    pub fn tick<const CAPACITY: usize>(
        &mut self,
        now: I,
        table: &PatternTable<CAPACITY>,
    ) -> Option<bool> {
        let pattern = table.get(self.active).copied().unwrap_or(BlinkPattern::DARK);
        let period = pattern.period();

        let Some(last) = self.last_toggle else {
            self.last_toggle = Some(now);
            self.phase = 0;
            self.level = period != 0 && pattern.level_at(0);
            return Some(self.level);
        };

        let unit = self.unit();
        let mut boundary = last + unit;
        if now < boundary {
            return None;
        }

        // Unit boundaries stay on the original grid so tick lateness never
        // accumulates. After a long stall the grid restarts at `now`.
        let mut elapsed: u32 = 0;
        loop {
            elapsed += 1;
            let next = boundary + unit;
            if now < next {
                break;
            }
            if elapsed >= MAX_CATCH_UP_UNITS {
                boundary = now;
                break;
            }
            boundary = next;
        }
        self.last_toggle = Some(boundary);
        if period == 0 {
            self.phase = 0;
        } else {
            let advance = u16::try_from(elapsed % u32::from(period)).unwrap_or(0);
            self.phase = (self.phase + advance) % period;
        }

        let level = period != 0 && pattern.level_at(self.phase);
        if level == self.level {
            None
        } else {
            self.level = level;
            Some(level)
        }
    }

    /// Blink unit for the current cadence.
    #[must_use]
    pub const fn unit(&self) -> Duration {
        match self.cadence {
            Cadence::Normal => self.units.normal_unit,
            Cadence::Unsafe => self.units.unsafe_unit,
        }
    }

    #[must_use]
    pub const fn active_pattern(&self) -> PatternId {
        self.active
    }

    #[must_use]
    pub const fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Level last written to the indicator.
    #[must_use]
    pub const fn level(&self) -> bool {
        self.level
    }

    /// Position within the active pattern, in units.
    #[must_use]
    pub const fn phase(&self) -> u16 {
        self.phase
    }

    #[must_use]
    pub const fn last_toggle(&self) -> Option<I> {
        self.last_toggle
    }
}
