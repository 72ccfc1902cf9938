//! Simulated clock, delay, and output driver shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::ops::Add;
use std::rc::Rc;
use std::time::Duration;

use controller_core::lines::{ALL_OUTPUTS, OutputLine, PowerPathDriver};
use controller_core::{InterlockConfig, InterlockController};
use embedded_hal::delay::DelayNs;

/// Monotonic instant counted in microseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MockInstant(pub u64);

impl MockInstant {
    pub const fn micros(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

/// Shared simulated time source.
#[derive(Clone, Default)]
pub struct SimClock {
    micros: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> MockInstant {
        MockInstant(self.micros.get())
    }

    pub fn advance(&self, micros: u64) {
        self.micros.set(self.micros.get() + micros);
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(millis * 1_000);
    }
}

/// Blocking delay that moves the simulated clock forward instead of sleeping.
pub struct SimDelay {
    clock: SimClock,
    pub waits_us: Vec<u64>,
}

impl SimDelay {
    pub fn new(clock: &SimClock) -> Self {
        Self {
            clock: clock.clone(),
            waits_us: Vec::new(),
        }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let micros = u64::from(ns).div_ceil(1_000);
        self.waits_us.push(micros);
        self.clock.advance(micros);
    }

    fn delay_us(&mut self, us: u32) {
        self.waits_us.push(u64::from(us));
        self.clock.advance(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1_000));
    }
}

/// Single timestamped write issued by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Write {
    pub at: u64,
    pub line: OutputLine,
    pub asserted: bool,
}

/// Driver that records every write with the simulated time it happened at.
pub struct RecordingDriver {
    clock: SimClock,
    levels: [bool; ALL_OUTPUTS.len()],
    pub writes: Vec<Write>,
    /// Set if both charger contactors were ever asserted at the same time.
    pub bridged: bool,
}

impl RecordingDriver {
    pub fn new(clock: &SimClock) -> Self {
        Self {
            clock: clock.clone(),
            levels: [false; ALL_OUTPUTS.len()],
            writes: Vec::new(),
            bridged: false,
        }
    }

    pub fn level(&self, line: OutputLine) -> bool {
        self.levels[line.as_index()]
    }

    /// Writes that actually changed a line's level, in order.
    pub fn edges(&self) -> Vec<Write> {
        let mut levels = [false; ALL_OUTPUTS.len()];
        let mut edges = Vec::new();
        for write in &self.writes {
            let slot = &mut levels[write.line.as_index()];
            if *slot != write.asserted {
                *slot = write.asserted;
                edges.push(*write);
            }
        }
        edges
    }

    pub fn edges_for(&self, line: OutputLine) -> Vec<Write> {
        self.edges()
            .into_iter()
            .filter(|write| write.line == line)
            .collect()
    }
}

impl PowerPathDriver for RecordingDriver {
    fn drive(&mut self, line: OutputLine, asserted: bool) {
        self.levels[line.as_index()] = asserted;
        self.writes.push(Write {
            at: self.clock.now().micros(),
            line,
            asserted,
        });
        if self.level(OutputLine::MpptContactor) && self.level(OutputLine::ExternalContactor) {
            self.bridged = true;
        }
    }
}

/// Controller, clock, driver, and delay wired together.
pub struct Bench {
    pub clock: SimClock,
    pub driver: RecordingDriver,
    pub delay: SimDelay,
    pub controller: InterlockController<MockInstant>,
}

impl Bench {
    pub fn new() -> Self {
        Self::with_config(InterlockConfig::new())
    }

    pub fn with_config(config: InterlockConfig) -> Self {
        let clock = SimClock::new();
        let driver = RecordingDriver::new(&clock);
        let delay = SimDelay::new(&clock);
        let controller = InterlockController::new(config).expect("valid config");
        Self {
            clock,
            driver,
            delay,
            controller,
        }
    }

    pub fn boot(&mut self) {
        let now = self.clock.now();
        self.controller
            .boot(now, &mut self.driver, &mut self.delay);
    }

    /// Runs one cycle at the current simulated time.
    pub fn step(
        &mut self,
        inputs: controller_core::InterlockInputs,
    ) -> controller_core::CycleReport {
        let now = self.clock.now();
        self.controller
            .step(&inputs, now, &mut self.driver, &mut self.delay)
    }

    /// Runs `cycles` cycles one millisecond apart with the same inputs.
    pub fn run_ms(&mut self, inputs: controller_core::InterlockInputs, cycles: u64) {
        for _ in 0..cycles {
            self.step(inputs);
            self.clock.advance_ms(1);
        }
    }
}

/// Input sample helper: switch, discharge inhibit, charge inhibit, charger select.
pub const fn inputs(
    system_switch: bool,
    discharge_inhibit: bool,
    charge_inhibit: bool,
    charger_select: bool,
) -> controller_core::InterlockInputs {
    controller_core::InterlockInputs::new(
        system_switch,
        discharge_inhibit,
        charge_inhibit,
        charger_select,
    )
}
