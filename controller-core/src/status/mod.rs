//! Shared status surface.
//!
//! The emulator prints a [`StatusSnapshot`] for its `status` command and the
//! firmware logs one on every control-state change. [`StatusFormatter`] keeps
//! the textual rendering identical across both front-ends.

use core::fmt;

use crate::indicator::{BlinkPattern, Cadence, PatternId};
use crate::interlock::{InterlockState, OutputFrame};
use crate::lines::{ALL_OUTPUTS, OutputLine};

/// Snapshot of everything the interlock exposes after a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: InterlockState,
    pub outputs: OutputFrame,
    pub pattern: PatternId,
    pub blink: BlinkPattern,
    pub cadence: Cadence,
    pub indicator_on: bool,
}

impl StatusSnapshot {
    /// Level of any output line, the indicator included.
    #[must_use]
    pub const fn line_level(&self, line: OutputLine) -> bool {
        match self.outputs.level(line) {
            Some(level) => level,
            None => self.indicator_on,
        }
    }
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    /// Creates a new formatter for the provided snapshot.
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the state line (e.g. `state ctrl=on discharge=enabled ...`).
    pub fn write_state_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let state = &self.snapshot.state;
        write!(
            writer,
            "state ctrl={} discharge={} charge={} charger={} last-charger={}",
            state.ctrl,
            enabled_label(state.discharge.is_enabled()),
            enabled_label(state.charge.is_enabled()),
            state.selector,
            state.last_used_charger,
        )
    }

    /// Writes the output line (e.g. `outputs BMS_READY=asserted ...`).
    pub fn write_outputs_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("outputs")?;
        for info in ALL_OUTPUTS.iter() {
            let level = if self.snapshot.line_level(info.id) {
                "asserted"
            } else {
                "released"
            };
            write!(writer, " {}={}", info.name, level)?;
        }
        Ok(())
    }

    /// Writes the indicator line (e.g. `indicator pattern=#3 (1,3) cadence=normal level=on`).
    pub fn write_indicator_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "indicator pattern={} {} cadence={} level={}",
            self.snapshot.pattern,
            self.snapshot.blink,
            self.snapshot.cadence,
            if self.snapshot.indicator_on { "on" } else { "off" },
        )
    }
}

const fn enabled_label(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}
