//! Interlock state machine shared by firmware and host targets.
//!
//! Raw, non-debounced input levels are folded into a canonical
//! [`InterlockState`] once per cycle. The control state only leaves
//! [`CtrlState::Uninitialized`] after the system switch has been seen low,
//! and every derived power-path decision is forced to its safe default
//! whenever the system is not on.

use core::fmt;

pub mod contactors;

pub use contactors::{ChargePathAction, OutputFrame, apply_outputs};

use crate::lines::OutputLine;

/// Top-level control state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CtrlState {
    /// Entry state. The switch position at power-up is not trusted.
    Uninitialized,
    SystemOff,
    SystemOn,
}

impl CtrlState {
    /// Pure transition function driven by the current switch level.
    ///
    /// `Uninitialized` only moves to `SystemOff`; a cold start must begin from
    /// off even if the switch is already closed.
    #[must_use]
    pub const fn next(self, system_switch: bool) -> Self {
        match self {
            CtrlState::Uninitialized if !system_switch => CtrlState::SystemOff,
            CtrlState::Uninitialized => CtrlState::Uninitialized,
            CtrlState::SystemOff | CtrlState::SystemOn => {
                if system_switch {
                    CtrlState::SystemOn
                } else {
                    CtrlState::SystemOff
                }
            }
        }
    }

    /// Returns `true` when derived states may follow the inputs.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, CtrlState::SystemOn)
    }
}

impl fmt::Display for CtrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CtrlState::Uninitialized => "uninitialized",
            CtrlState::SystemOff => "off",
            CtrlState::SystemOn => "on",
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DischargeState {
    Disabled,
    Enabled,
}

impl DischargeState {
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, DischargeState::Enabled)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChargeState {
    Disabled,
    Enabled,
}

impl ChargeState {
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, ChargeState::Enabled)
    }
}

/// Charge source selection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChargerSelector {
    Mppt,
    External,
}

impl ChargerSelector {
    /// Returns the opposite charge source.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            ChargerSelector::Mppt => ChargerSelector::External,
            ChargerSelector::External => ChargerSelector::Mppt,
        }
    }

    /// Output line closing this charger's contactor.
    #[must_use]
    pub const fn contactor(self) -> OutputLine {
        match self {
            ChargerSelector::Mppt => OutputLine::MpptContactor,
            ChargerSelector::External => OutputLine::ExternalContactor,
        }
    }
}

impl fmt::Display for ChargerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChargerSelector::Mppt => "mppt",
            ChargerSelector::External => "external",
        })
    }
}

/// Raw input levels sampled once per cycle, exactly as read from the pins.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InterlockInputs {
    /// High requests the system on.
    pub system_switch: bool,
    /// High blocks discharge.
    pub discharge_inhibit: bool,
    /// High blocks charging.
    pub charge_inhibit: bool,
    /// High selects MPPT, low selects the external charger.
    pub charger_select: bool,
}

impl InterlockInputs {
    /// Builds a sample from the four raw levels.
    #[must_use]
    pub const fn new(
        system_switch: bool,
        discharge_inhibit: bool,
        charge_inhibit: bool,
        charger_select: bool,
    ) -> Self {
        Self {
            system_switch,
            discharge_inhibit,
            charge_inhibit,
            charger_select,
        }
    }

    /// Levels read with every pull-up input idle and the switch open.
    #[must_use]
    pub const fn idle() -> Self {
        Self::new(false, true, true, true)
    }

    #[must_use]
    pub const fn requested_discharge(&self) -> DischargeState {
        if self.discharge_inhibit {
            DischargeState::Disabled
        } else {
            DischargeState::Enabled
        }
    }

    #[must_use]
    pub const fn requested_charge(&self) -> ChargeState {
        if self.charge_inhibit {
            ChargeState::Disabled
        } else {
            ChargeState::Enabled
        }
    }

    #[must_use]
    pub const fn requested_charger(&self) -> ChargerSelector {
        if self.charger_select {
            ChargerSelector::Mppt
        } else {
            ChargerSelector::External
        }
    }
}

/// Canonical interlock state owned by the control cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InterlockState {
    pub ctrl: CtrlState,
    pub discharge: DischargeState,
    pub charge: ChargeState,
    pub selector: ChargerSelector,
    /// Charger whose contactor was closed most recently. Survives charge
    /// disable/enable so a handover can be detected on re-enable.
    pub last_used_charger: ChargerSelector,
}

impl InterlockState {
    /// Power-up state: uninitialized with every path disabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ctrl: CtrlState::Uninitialized,
            discharge: DischargeState::Disabled,
            charge: ChargeState::Disabled,
            selector: ChargerSelector::Mppt,
            last_used_charger: ChargerSelector::Mppt,
        }
    }

    /// Applies the transition function and recomputes derived states.
    ///
    /// Returns the previous control state when it changed.
    pub fn advance(&mut self, inputs: &InterlockInputs) -> Option<CtrlState> {
        let previous = self.ctrl;
        self.ctrl = previous.next(inputs.system_switch);
        self.derive(inputs);

        if previous == self.ctrl {
            None
        } else {
            Some(previous)
        }
    }

    fn derive(&mut self, inputs: &InterlockInputs) {
        if self.ctrl.is_on() {
            self.discharge = inputs.requested_discharge();
            self.charge = inputs.requested_charge();
            self.selector = inputs.requested_charger();
        } else {
            self.discharge = DischargeState::Disabled;
            self.charge = ChargeState::Disabled;
            self.selector = ChargerSelector::Mppt;
        }
    }

    /// Returns `true` when the forced-off defaults hold for a non-running system.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.ctrl.is_on()
            || (self.discharge == DischargeState::Disabled
                && self.charge == ChargeState::Disabled
                && self.selector == ChargerSelector::Mppt)
    }

    /// Returns `true` when the current selection differs from the last
    /// closed charger while charging is enabled.
    #[must_use]
    pub fn handover_pending(&self) -> bool {
        self.charge.is_enabled() && self.selector != self.last_used_charger
    }
}

impl Default for InterlockState {
    fn default() -> Self {
        Self::new()
    }
}
