//! Maps the interlock state onto a registered blink pattern.
//!
//! The flash count tells the operator which charger is active (one flash for
//! none, two for MPPT, three for external). The gap length tells whether
//! discharge is enabled (two units off without, three with).

use super::table::{PatternId, PatternTable, PatternTableError};
use crate::interlock::{ChargeState, ChargerSelector, CtrlState, DischargeState, InterlockState};

/// Pattern ids for every reachable interlock state, in registration order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusPatterns {
    pub unsafe_init: PatternId,
    pub system_off: PatternId,
    pub idle: PatternId,
    pub discharging: PatternId,
    pub charging_mppt: PatternId,
    pub charging_external: PatternId,
    pub discharging_charging_mppt: PatternId,
    pub discharging_charging_external: PatternId,
}

/// `(on, off)` units registered by [`register_status_patterns`], in order.
pub const STATUS_PATTERN_UNITS: [(u8, u8); 8] = [
    (5, 0),
    (0, 1),
    (1, 2),
    (1, 3),
    (2, 2),
    (3, 2),
    (2, 3),
    (3, 3),
];

/// Registers the status patterns in their fixed order.
pub fn register_status_patterns<const CAPACITY: usize>(
    table: &mut PatternTable<CAPACITY>,
) -> Result<StatusPatterns, PatternTableError> {
    let [
        unsafe_init,
        system_off,
        idle,
        discharging,
        charging_mppt,
        charging_external,
        discharging_charging_mppt,
        discharging_charging_external,
    ] = STATUS_PATTERN_UNITS;

    Ok(StatusPatterns {
        unsafe_init: table.register(unsafe_init.0, unsafe_init.1)?,
        system_off: table.register(system_off.0, system_off.1)?,
        idle: table.register(idle.0, idle.1)?,
        discharging: table.register(discharging.0, discharging.1)?,
        charging_mppt: table.register(charging_mppt.0, charging_mppt.1)?,
        charging_external: table.register(charging_external.0, charging_external.1)?,
        discharging_charging_mppt: table
            .register(discharging_charging_mppt.0, discharging_charging_mppt.1)?,
        discharging_charging_external: table.register(
            discharging_charging_external.0,
            discharging_charging_external.1,
        )?,
    })
}

impl StatusPatterns {
    /// Total mapping from the state tuple to a pattern id.
    ///
    /// Combinations the interlock forces unreachable (anything enabled while
    /// not on) show the system-off pattern.
    #[must_use]
    pub const fn select(
        &self,
        ctrl: CtrlState,
        discharge: DischargeState,
        charge: ChargeState,
        selector: ChargerSelector,
    ) -> PatternId {
        match (ctrl, discharge, charge, selector) {
            (
                CtrlState::Uninitialized,
                DischargeState::Disabled,
                ChargeState::Disabled,
                ChargerSelector::Mppt,
            ) => self.unsafe_init,
            (CtrlState::Uninitialized | CtrlState::SystemOff, _, _, _) => self.system_off,
            (CtrlState::SystemOn, DischargeState::Disabled, ChargeState::Disabled, _) => {
                self.idle
            }
            (CtrlState::SystemOn, DischargeState::Enabled, ChargeState::Disabled, _) => {
                self.discharging
            }
            (
                CtrlState::SystemOn,
                DischargeState::Disabled,
                ChargeState::Enabled,
                ChargerSelector::Mppt,
            ) => self.charging_mppt,
            (
                CtrlState::SystemOn,
                DischargeState::Disabled,
                ChargeState::Enabled,
                ChargerSelector::External,
            ) => self.charging_external,
            (
                CtrlState::SystemOn,
                DischargeState::Enabled,
                ChargeState::Enabled,
                ChargerSelector::Mppt,
            ) => self.discharging_charging_mppt,
            (
                CtrlState::SystemOn,
                DischargeState::Enabled,
                ChargeState::Enabled,
                ChargerSelector::External,
            ) => self.discharging_charging_external,
        }
    }

    /// Convenience wrapper over [`StatusPatterns::select`].
    #[must_use]
    pub const fn for_state(&self, state: &InterlockState) -> PatternId {
        self.select(state.ctrl, state.discharge, state.charge, state.selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::table::BlinkPattern;

    fn registered() -> (PatternTable, StatusPatterns) {
        let mut table = PatternTable::new();
        let patterns = register_status_patterns(&mut table).expect("register status patterns");
        (table, patterns)
    }

    fn units(table: &PatternTable, id: PatternId) -> BlinkPattern {
        *table.get(id).expect("pattern registered")
    }

    #[test]
    fn registration_is_stable() {
        let (table, patterns) = registered();
        assert_eq!(table.len(), STATUS_PATTERN_UNITS.len());
        assert_eq!(patterns.unsafe_init.as_u8(), 0);
        assert_eq!(patterns.system_off.as_u8(), 1);
        assert_eq!(patterns.discharging_charging_external.as_u8(), 7);

        let (_, again) = registered();
        assert_eq!(patterns, again);
    }

    #[test]
    fn reachable_states_map_to_literal_units() {
        let (table, patterns) = registered();
        let on = CtrlState::SystemOn;
        let cases = [
            (
                CtrlState::Uninitialized,
                DischargeState::Disabled,
                ChargeState::Disabled,
                ChargerSelector::Mppt,
                (5, 0),
            ),
            (
                CtrlState::SystemOff,
                DischargeState::Disabled,
                ChargeState::Disabled,
                ChargerSelector::Mppt,
                (0, 1),
            ),
            (on, DischargeState::Disabled, ChargeState::Disabled, ChargerSelector::Mppt, (1, 2)),
            (on, DischargeState::Disabled, ChargeState::Disabled, ChargerSelector::External, (1, 2)),
            (on, DischargeState::Enabled, ChargeState::Disabled, ChargerSelector::Mppt, (1, 3)),
            (on, DischargeState::Disabled, ChargeState::Enabled, ChargerSelector::Mppt, (2, 2)),
            (on, DischargeState::Disabled, ChargeState::Enabled, ChargerSelector::External, (3, 2)),
            (on, DischargeState::Enabled, ChargeState::Enabled, ChargerSelector::Mppt, (2, 3)),
            (on, DischargeState::Enabled, ChargeState::Enabled, ChargerSelector::External, (3, 3)),
        ];

        for (ctrl, discharge, charge, selector, (on_units, off_units)) in cases {
            let id = patterns.select(ctrl, discharge, charge, selector);
            assert_eq!(
                units(&table, id),
                BlinkPattern::new(on_units, off_units),
                "{ctrl:?} {discharge:?} {charge:?} {selector:?}"
            );
        }
    }

    #[test]
    fn forced_off_combinations_fall_back_to_system_off() {
        let (_, patterns) = registered();
        let id = patterns.select(
            CtrlState::SystemOff,
            DischargeState::Enabled,
            ChargeState::Enabled,
            ChargerSelector::External,
        );
        assert_eq!(id, patterns.system_off);

        let id = patterns.select(
            CtrlState::Uninitialized,
            DischargeState::Disabled,
            ChargeState::Enabled,
            ChargerSelector::Mppt,
        );
        assert_eq!(id, patterns.system_off);
    }
}
