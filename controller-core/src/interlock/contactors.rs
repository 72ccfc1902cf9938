//! Output application and break-before-make charger sequencing.
//!
//! There is no contactor feedback. When the selected charger changes, the
//! outgoing contactor is commanded open and the cycle blocks for the
//! configured dead-time before the incoming contactor is commanded closed.
//! If the real contactor takes longer than the dead-time to open, both
//! sources can be bridged for the difference and nothing here can detect it;
//! the dead-time must be sized against the slowest contactor fitted.

use core::time::Duration;

use embedded_hal::delay::DelayNs;

use super::{ChargerSelector, InterlockState};
use crate::lines::{OutputLine, PowerPathDriver};

/// Desired level of every power-path output for one cycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OutputFrame {
    pub power_ready: bool,
    pub discharge_contactor: bool,
    pub mppt_contactor: bool,
    pub external_contactor: bool,
}

impl OutputFrame {
    /// Every power-path output deasserted.
    pub const RELEASED: Self = Self {
        power_ready: false,
        discharge_contactor: false,
        mppt_contactor: false,
        external_contactor: false,
    };

    /// Steady-state levels implied by `state` once sequencing completes.
    #[must_use]
    pub const fn from_state(state: &InterlockState) -> Self {
        let charging = state.charge.is_enabled();
        Self {
            power_ready: state.ctrl.is_on(),
            discharge_contactor: state.discharge.is_enabled(),
            mppt_contactor: charging && matches!(state.selector, ChargerSelector::Mppt),
            external_contactor: charging && matches!(state.selector, ChargerSelector::External),
        }
    }

    /// Level of a single power-path line; the indicator is not part of the frame.
    #[must_use]
    pub const fn level(&self, line: OutputLine) -> Option<bool> {
        match line {
            OutputLine::PowerReady => Some(self.power_ready),
            OutputLine::DischargeContactor => Some(self.discharge_contactor),
            OutputLine::MpptContactor => Some(self.mppt_contactor),
            OutputLine::ExternalContactor => Some(self.external_contactor),
            OutputLine::Indicator => None,
        }
    }
}

/// What the charge path did during a cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChargePathAction {
    /// Charging disabled; both charger contactors open.
    Open,
    /// Selected contactor (re)asserted with no change of source.
    Hold(ChargerSelector),
    /// Source changed; the dead-time elapsed between open and close.
    Handover {
        from: ChargerSelector,
        to: ChargerSelector,
    },
}

/// Drives every power-path output for the current state.
///
/// The only blocking call in the control cycle lives here: `delay` is used
/// for the dead-time during a handover and must actually block until it has
/// elapsed.
pub fn apply_outputs<D, T>(
    state: &mut InterlockState,
    driver: &mut D,
    delay: &mut T,
    dead_time: Duration,
) -> ChargePathAction
where
    D: PowerPathDriver + ?Sized,
    T: DelayNs + ?Sized,
{
    driver.drive(OutputLine::PowerReady, state.ctrl.is_on());
    driver.drive(OutputLine::DischargeContactor, state.discharge.is_enabled());

    if !state.charge.is_enabled() {
        driver.drive(OutputLine::MpptContactor, false);
        driver.drive(OutputLine::ExternalContactor, false);
        return ChargePathAction::Open;
    }

    let selected = state.selector;
    driver.drive(selected.other().contactor(), false);

    let action = if selected == state.last_used_charger {
        ChargePathAction::Hold(selected)
    } else {
        delay.delay_us(duration_micros(dead_time));
        ChargePathAction::Handover {
            from: state.last_used_charger,
            to: selected,
        }
    };

    driver.drive(selected.contactor(), true);
    state.last_used_charger = selected;
    action
}

/// Converts a duration to whole microseconds, rounding up so the wait is
/// never shorter than configured.
pub(crate) fn duration_micros(duration: Duration) -> u32 {
    let mut micros = duration.as_micros();
    if !duration.subsec_nanos().is_multiple_of(1_000) {
        micros += 1;
    }
    u32::try_from(micros).unwrap_or(u32::MAX)
}
