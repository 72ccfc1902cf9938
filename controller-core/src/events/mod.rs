//! Local event journal for the interlock.
//!
//! The controller records state transitions, output edges, charger handovers
//! and indicator pattern changes into a fixed-capacity ring. The firmware
//! drains it after every cycle to feed its defmt log; the emulator prints it
//! on request. Nothing here leaves the board.

use core::fmt;
use core::time::Duration;

use heapless::{HistoryBuf, OldestOrdered};

use crate::indicator::PatternId;
use crate::interlock::{ChargerSelector, CtrlState};
use crate::lines::OutputLine;

/// Identifier assigned to each journal record.
pub type EventId = u32;

/// Total number of records retained in memory.
pub const EVENT_RING_CAPACITY: usize = 32;

/// Discriminated interlock events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterlockEventKind {
    /// Outputs released and warm-up hold completed.
    Booted { warm_up: Duration },
    StateChanged { from: CtrlState, to: CtrlState },
    /// A power-path line changed level.
    LineChanged { line: OutputLine, asserted: bool },
    /// Charger source switched after waiting out the dead-time.
    Handover {
        from: ChargerSelector,
        to: ChargerSelector,
        dead_time: Duration,
    },
    PatternChanged { from: PatternId, to: PatternId },
}

impl fmt::Display for InterlockEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterlockEventKind::Booted { warm_up } => {
                write!(f, "booted warm-up={}ms", warm_up.as_millis())
            }
            InterlockEventKind::StateChanged { from, to } => write!(f, "state {from} -> {to}"),
            InterlockEventKind::LineChanged { line, asserted } => {
                let level = if *asserted { "asserted" } else { "released" };
                write!(f, "line {line} {level}")
            }
            InterlockEventKind::Handover {
                from,
                to,
                dead_time,
            } => write!(
                f,
                "handover {from} -> {to} dead-time={}us",
                dead_time.as_micros()
            ),
            InterlockEventKind::PatternChanged { from, to } => write!(f, "pattern {from} -> {to}"),
        }
    }
}

/// Journal record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InterlockEvent<I> {
    pub id: EventId,
    pub timestamp: I,
    pub kind: InterlockEventKind,
}

/// Fixed-capacity journal that overwrites the oldest record when full.
pub struct EventLog<I, const CAPACITY: usize = EVENT_RING_CAPACITY> {
    ring: HistoryBuf<InterlockEvent<I>, CAPACITY>,
    next_event_id: EventId,
}

impl<I: Copy, const CAPACITY: usize> EventLog<I, CAPACITY> {
    /// Creates an empty journal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Appends a record and returns its id.
    pub fn record(&mut self, kind: InterlockEventKind, timestamp: I) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(InterlockEvent {
            id,
            timestamp,
            kind,
        });
        id
    }

    /// Records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, InterlockEvent<I>> {
        self.ring.oldest_ordered()
    }

    /// Records with an id at or after `cursor`, oldest first.
    ///
    /// Callers keep the cursor returned by [`EventLog::next_id`] to drain only
    /// what was added since their last visit.
    pub fn since(&self, cursor: EventId) -> impl Iterator<Item = &InterlockEvent<I>> {
        self.ring
            .oldest_ordered()
            .filter(move |event| event.id.wrapping_sub(cursor) < EventId::MAX / 2)
    }

    /// Id the next record will receive.
    #[must_use]
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }

    /// Returns the most recent record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&InterlockEvent<I>> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<I: Copy, const CAPACITY: usize> Default for EventLog<I, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
