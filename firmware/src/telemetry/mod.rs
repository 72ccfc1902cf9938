//! Mirrors the controller's event journal to defmt / the host console.
//!
//! The journal itself lives in `controller-core`; this side only remembers
//! how far it has read so each record is logged once.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::Write;

use controller_core::events::{EventId, EventLog, InterlockEvent, InterlockEventKind};
use controller_core::interlock::CtrlState;
use controller_core::status::{StatusFormatter, StatusSnapshot};
use controller_core::{CycleReport, InterlockInputs};
use heapless::String;

use crate::interlock::FirmwareInstant;

/// Longest status line rendered by [`log_status`].
const STATUS_LINE_CAPACITY: usize = 160;

/// Severity a journal record is logged at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
}

/// Journal records are routine operation, handovers included.
#[must_use]
pub const fn level_for(_kind: &InterlockEventKind) -> LogLevel {
    LogLevel::Info
}

/// Level for the first cycle after boot. A system switch already closed at
/// power-up holds the power path off until it is opened, and is a warning.
#[must_use]
pub fn boot_level(report: &CycleReport, inputs: &InterlockInputs) -> LogLevel {
    if report.state.ctrl == CtrlState::Uninitialized && inputs.system_switch {
        LogLevel::Warn
    } else {
        LogLevel::Info
    }
}

/// Warns that the board powered up with the system switch on.
pub fn warn_switch_closed_at_boot() {
    emit_boot_warning();
}

/// Cursor over the controller journal.
pub struct EventMirror {
    cursor: EventId,
}

impl EventMirror {
    pub const fn new() -> Self {
        Self { cursor: 0 }
    }

    /// Logs every record added since the previous drain and returns how many
    /// were emitted.
    pub fn drain<const CAPACITY: usize>(
        &mut self,
        log: &EventLog<FirmwareInstant, CAPACITY>,
    ) -> usize {
        let mut emitted = 0;
        for event in log.since(self.cursor) {
            emit_event(event);
            emitted += 1;
        }
        self.cursor = log.next_id();
        emitted
    }

    pub const fn cursor(&self) -> EventId {
        self.cursor
    }
}

impl Default for EventMirror {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs the state, output, and indicator lines for a snapshot.
pub fn log_status(snapshot: &StatusSnapshot) {
    let formatter = StatusFormatter::new(snapshot);
    let mut line: String<STATUS_LINE_CAPACITY> = String::new();

    if formatter.write_state_line(&mut line).is_ok() {
        emit_status(line.as_str());
    }
    line.clear();
    if formatter.write_outputs_line(&mut line).is_ok() {
        emit_status(line.as_str());
    }
    line.clear();
    if formatter.write_indicator_line(&mut line).is_ok() {
        emit_status(line.as_str());
    }
}

fn emit_event(event: &InterlockEvent<FirmwareInstant>) {
    let mut line: String<STATUS_LINE_CAPACITY> = String::new();
    if write!(line, "{}", event.kind).is_err() {
        line.clear();
        let _ = line.push_str("<truncated>");
    }
    let timestamp_us = event.timestamp.as_micros();

    match level_for(&event.kind) {
        LogLevel::Info => emit_info(event.id, line.as_str(), timestamp_us),
        LogLevel::Warn => emit_warn(event.id, line.as_str(), timestamp_us),
    }
}

#[cfg(target_os = "none")]
fn emit_info(id: EventId, line: &str, timestamp_us: u64) {
    defmt::info!("interlock:#{} {} t={}us", id, line, timestamp_us);
}

#[cfg(not(target_os = "none"))]
fn emit_info(id: EventId, line: &str, timestamp_us: u64) {
    println!("interlock:#{id} {line} t={timestamp_us}us");
}

#[cfg(target_os = "none")]
fn emit_warn(id: EventId, line: &str, timestamp_us: u64) {
    defmt::warn!("interlock:#{} {} t={}us", id, line, timestamp_us);
}

#[cfg(not(target_os = "none"))]
fn emit_warn(id: EventId, line: &str, timestamp_us: u64) {
    println!("interlock:#{id} WARN {line} t={timestamp_us}us");
}

#[cfg(target_os = "none")]
fn emit_boot_warning() {
    defmt::warn!("interlock: system switch closed at power-up; open it to arm");
}

#[cfg(not(target_os = "none"))]
fn emit_boot_warning() {
    println!("interlock: WARN system switch closed at power-up; open it to arm");
}

#[cfg(target_os = "none")]
fn emit_status(line: &str) {
    defmt::info!("status: {}", line);
}

#[cfg(not(target_os = "none"))]
fn emit_status(line: &str) {
    println!("status: {line}");
}
