//! GPIO adapters for the STM32G0 interlock board.
//!
//! Input and output pins are stored in catalog order (see
//! `controller_core::lines::ALL_INPUTS` / `ALL_OUTPUTS`) so a line id indexes
//! straight into the array.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use controller_core::InterlockInputs;
use controller_core::lines::ALL_INPUTS;

#[cfg(target_os = "none")]
use controller_core::lines::{ALL_OUTPUTS, InputBias, OutputLine, PowerPathDriver};
#[cfg(target_os = "none")]
use embassy_stm32::gpio::{Input, Level, Output, Pull};

/// Folds raw pin levels, in catalog order, into an interlock sample.
pub fn inputs_from_levels(levels: [bool; ALL_INPUTS.len()]) -> InterlockInputs {
    let [system_switch, discharge_inhibit, charge_inhibit, charger_select] = levels;
    InterlockInputs::new(
        system_switch,
        discharge_inhibit,
        charge_inhibit,
        charger_select,
    )
}

/// Pull resistor matching the catalog bias of an input.
#[cfg(target_os = "none")]
pub const fn pull_for(bias: InputBias) -> Pull {
    match bias {
        InputBias::PullUp => Pull::Up,
        InputBias::PullDown => Pull::Down,
    }
}

/// The four operator inputs, sampled raw once per cycle.
#[cfg(target_os = "none")]
pub struct HardwareInputs<'d> {
    pins: [Input<'d>; ALL_INPUTS.len()],
}

#[cfg(target_os = "none")]
impl<'d> HardwareInputs<'d> {
    pub fn new(pins: [Input<'d>; ALL_INPUTS.len()]) -> Self {
        Self { pins }
    }

    pub fn sample(&self) -> InterlockInputs {
        inputs_from_levels(core::array::from_fn(|index| self.pins[index].is_high()))
    }
}

/// Push-pull outputs for the BMS ready signal, the three contactors, and the
/// status indicator. Asserted is always driven high.
#[cfg(target_os = "none")]
pub struct HardwarePowerPath<'d> {
    outputs: [Output<'d>; ALL_OUTPUTS.len()],
}

#[cfg(target_os = "none")]
impl<'d> HardwarePowerPath<'d> {
    /// Takes ownership of outputs that were created already driven low.
    pub fn new(outputs: [Output<'d>; ALL_OUTPUTS.len()]) -> Self {
        Self { outputs }
    }
}

#[cfg(target_os = "none")]
impl PowerPathDriver for HardwarePowerPath<'_> {
    fn drive(&mut self, line: OutputLine, asserted: bool) {
        let level = if asserted { Level::High } else { Level::Low };
        self.outputs[line.as_index()].set_level(level);
    }

    fn release_all(&mut self) {
        for output in &mut self.outputs {
            output.set_low();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_core::interlock::{ChargeState, ChargerSelector, DischargeState};
    use controller_core::lines::{InputBias, InputLine, input_by_id};

    #[test]
    fn levels_follow_catalog_order() {
        let inputs = inputs_from_levels([true, false, true, false]);
        assert!(inputs.system_switch);
        assert_eq!(inputs.requested_discharge(), DischargeState::Enabled);
        assert_eq!(inputs.requested_charge(), ChargeState::Disabled);
        assert_eq!(inputs.requested_charger(), ChargerSelector::External);
    }

    #[test]
    fn floating_inputs_read_as_safe_defaults() {
        // Pulls alone: switch low, inhibits high, selector on MPPT.
        let idle = ALL_INPUTS.map(|info| matches!(info.bias, InputBias::PullUp));
        assert_eq!(inputs_from_levels(idle), InterlockInputs::idle());
        assert_eq!(input_by_id(InputLine::SystemSwitch).bias, InputBias::PullDown);
    }
}
