//! Control-cycle aggregate.
//!
//! [`InterlockController`] owns every piece of mutable state the interlock
//! needs (the interlock state tuple, the blink pattern table, the indicator
//! engine, and the event journal) and advances all of it from a single
//! call per cycle. Hardware stays outside: inputs arrive as an
//! [`InterlockInputs`] sample, outputs leave through a [`PowerPathDriver`],
//! and the dead-time wait goes through an injected [`DelayNs`].

use core::fmt;
use core::ops::Add;
use core::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::{ConfigError, InterlockConfig};
use crate::events::{EventLog, InterlockEventKind};
use crate::indicator::{
    BlinkPattern, Cadence, IndicatorEngine, PatternId, PatternTable, PatternTableError,
    StatusPatterns, register_status_patterns,
};
use crate::interlock::contactors::duration_micros;
use crate::interlock::{
    ChargePathAction, CtrlState, InterlockInputs, InterlockState, OutputFrame, apply_outputs,
};
use crate::lines::{OutputLine, PowerPathDriver};
use crate::status::StatusSnapshot;

/// Errors surfaced while building a controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerError {
    Config(ConfigError),
    Patterns(PatternTableError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Config(err) => write!(f, "invalid configuration: {err}"),
            ControllerError::Patterns(err) => write!(f, "pattern registration failed: {err}"),
        }
    }
}

impl From<ConfigError> for ControllerError {
    fn from(value: ConfigError) -> Self {
        ControllerError::Config(value)
    }
}

impl From<PatternTableError> for ControllerError {
    fn from(value: PatternTableError) -> Self {
        ControllerError::Patterns(value)
    }
}

/// Outcome of one control cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleReport {
    pub state: InterlockState,
    /// `(from, to)` when the control state changed this cycle.
    pub transition: Option<(CtrlState, CtrlState)>,
    pub charge_path: ChargePathAction,
    pub outputs: OutputFrame,
    pub pattern: PatternId,
    /// New indicator level when the line was written this cycle.
    pub indicator: Option<bool>,
}

/// Single owner of all interlock and indicator state.
pub struct InterlockController<I> {
    config: InterlockConfig,
    state: InterlockState,
    patterns: PatternTable,
    status_patterns: StatusPatterns,
    indicator: IndicatorEngine<I>,
    outputs: OutputFrame,
    events: EventLog<I>,
}

impl<I> InterlockController<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Validates `config`, registers the status patterns, and returns a
    /// controller in the uninitialized state.
    pub fn new(config: InterlockConfig) -> Result<Self, ControllerError> {
        config.validate()?;

        let mut patterns = PatternTable::new();
        let status_patterns = register_status_patterns(&mut patterns)?;
        let indicator = IndicatorEngine::new(status_patterns.unsafe_init, config.indicator);

        Ok(Self {
            config,
            state: InterlockState::new(),
            patterns,
            status_patterns,
            indicator,
            outputs: OutputFrame::RELEASED,
            events: EventLog::new(),
        })
    }

    /// Boot sequence: every output inactive, then the warm-up hold.
    ///
    /// Pin direction setup happens in the platform layer between the two; on
    /// the STM32 the outputs are created already driven low.
    pub fn boot<D, T>(&mut self, now: I, driver: &mut D, delay: &mut T)
    where
        D: PowerPathDriver + ?Sized,
        T: DelayNs + ?Sized,
    {
        driver.release_all();
        self.outputs = OutputFrame::RELEASED;

        if !self.config.warm_up.is_zero() {
            delay.delay_us(duration_micros(self.config.warm_up));
        }

        self.events.record(
            InterlockEventKind::Booted {
                warm_up: self.config.warm_up,
            },
            now,
        );
    }

    /// Runs one control cycle.
    ///
    /// Blocks only for the contactor dead-time during a charger handover.
    pub fn step<D, T>(
        &mut self,
        inputs: &InterlockInputs,
        now: I,
        driver: &mut D,
        delay: &mut T,
    ) -> CycleReport
    where
        D: PowerPathDriver + ?Sized,
        T: DelayNs + ?Sized,
    {
        let transition = self
            .state
            .advance(inputs)
            .map(|from| (from, self.state.ctrl));
        if let Some((from, to)) = transition {
            self.events
                .record(InterlockEventKind::StateChanged { from, to }, now);
        }

        let charge_path = apply_outputs(&mut self.state, driver, delay, self.config.dead_time);
        if let ChargePathAction::Handover { from, to } = charge_path {
            self.events.record(
                InterlockEventKind::Handover {
                    from,
                    to,
                    dead_time: self.config.dead_time,
                },
                now,
            );
        }

        let outputs = OutputFrame::from_state(&self.state);
        self.record_output_edges(outputs, now);
        self.outputs = outputs;

        let cadence = match self.state.ctrl {
            CtrlState::Uninitialized => Cadence::Unsafe,
            CtrlState::SystemOff | CtrlState::SystemOn => Cadence::Normal,
        };
        self.indicator.set_cadence(cadence);

        let previous_pattern = self.indicator.active_pattern();
        let pattern = self.status_patterns.for_state(&self.state);
        if self.indicator.set_pattern(pattern) {
            self.events.record(
                InterlockEventKind::PatternChanged {
                    from: previous_pattern,
                    to: pattern,
                },
                now,
            );
        }

        let indicator = self.indicator.tick(now, &self.patterns);
        if let Some(level) = indicator {
            driver.drive(OutputLine::Indicator, level);
        }

        CycleReport {
            state: self.state,
            transition,
            charge_path,
            outputs,
            pattern,
            indicator,
        }
    }

    fn record_output_edges(&mut self, next: OutputFrame, now: I) {
        const POWER_PATH: [OutputLine; 4] = [
            OutputLine::PowerReady,
            OutputLine::DischargeContactor,
            OutputLine::MpptContactor,
            OutputLine::ExternalContactor,
        ];

        for line in POWER_PATH {
            let (Some(before), Some(after)) = (self.outputs.level(line), next.level(line)) else {
                continue;
            };
            if before != after {
                self.events.record(
                    InterlockEventKind::LineChanged {
                        line,
                        asserted: after,
                    },
                    now,
                );
            }
        }
    }

    /// Current status, suitable for [`crate::status::StatusFormatter`].
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let pattern = self.indicator.active_pattern();
        StatusSnapshot {
            state: self.state,
            outputs: self.outputs,
            pattern,
            blink: self.blink_pattern(pattern),
            cadence: self.indicator.cadence(),
            indicator_on: self.indicator.level(),
        }
    }

    /// Units registered for `id`, or the dark pattern if unknown.
    #[must_use]
    pub fn blink_pattern(&self, id: PatternId) -> BlinkPattern {
        self.patterns.get(id).copied().unwrap_or(BlinkPattern::DARK)
    }

    #[must_use]
    pub const fn state(&self) -> &InterlockState {
        &self.state
    }

    #[must_use]
    pub const fn outputs(&self) -> OutputFrame {
        self.outputs
    }

    #[must_use]
    pub const fn config(&self) -> &InterlockConfig {
        &self.config
    }

    #[must_use]
    pub const fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    #[must_use]
    pub const fn status_patterns(&self) -> &StatusPatterns {
        &self.status_patterns
    }

    #[must_use]
    pub const fn indicator(&self) -> &IndicatorEngine<I> {
        &self.indicator
    }

    #[must_use]
    pub const fn events(&self) -> &EventLog<I> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::NoopPowerPathDriver;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct Millis(u64);

    impl Add<Duration> for Millis {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + rhs.as_millis() as u64)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _: u32) {}
    }

    #[test]
    fn rejects_invalid_config() {
        let config = InterlockConfig::new().with_dead_time(Duration::ZERO);
        let result = InterlockController::<Millis>::new(config);
        assert!(matches!(
            result,
            Err(ControllerError::Config(ConfigError::ZeroDeadTime))
        ));
    }

    #[test]
    fn starts_uninitialized_with_unsafe_pattern() {
        let controller = InterlockController::<Millis>::new(InterlockConfig::new())
            .expect("default config is valid");
        assert_eq!(controller.state().ctrl, CtrlState::Uninitialized);
        assert_eq!(
            controller.indicator().active_pattern(),
            controller.status_patterns().unsafe_init
        );
        assert_eq!(controller.indicator().cadence(), Cadence::Unsafe);
        assert_eq!(controller.patterns().len(), 8);
    }

    #[test]
    fn journal_tracks_state_and_line_edges() {
        let mut controller = InterlockController::<Millis>::new(InterlockConfig::new())
            .expect("default config is valid");
        let mut driver = NoopPowerPathDriver::new();

        controller.boot(Millis(0), &mut driver, &mut NoDelay);
        controller.step(&InterlockInputs::idle(), Millis(0), &mut driver, &mut NoDelay);
        controller.step(
            &InterlockInputs::new(true, false, true, true),
            Millis(1),
            &mut driver,
            &mut NoDelay,
        );

        let kinds: heapless::Vec<InterlockEventKind, 8> =
            controller.events().oldest_first().map(|event| event.kind).collect();
        assert_eq!(
            kinds.as_slice(),
            &[
                InterlockEventKind::Booted {
                    warm_up: Duration::from_millis(500),
                },
                InterlockEventKind::StateChanged {
                    from: CtrlState::Uninitialized,
                    to: CtrlState::SystemOff,
                },
                InterlockEventKind::PatternChanged {
                    from: controller.status_patterns().unsafe_init,
                    to: controller.status_patterns().system_off,
                },
                InterlockEventKind::StateChanged {
                    from: CtrlState::SystemOff,
                    to: CtrlState::SystemOn,
                },
                InterlockEventKind::LineChanged {
                    line: OutputLine::PowerReady,
                    asserted: true,
                },
                InterlockEventKind::LineChanged {
                    line: OutputLine::DischargeContactor,
                    asserted: true,
                },
                InterlockEventKind::PatternChanged {
                    from: controller.status_patterns().system_off,
                    to: controller.status_patterns().discharging,
                },
            ]
        );
    }
}
