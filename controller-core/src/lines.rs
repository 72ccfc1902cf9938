//! Digital line catalog and the power-path driver seam.
//!
//! The interlock only ever sees four input levels and drives five outputs.
//! This module names those lines, records how they are wired on the
//! controller board, and defines the [`PowerPathDriver`] trait the firmware
//! and emulator implement to push output levels onto real (or simulated)
//! pins.

use core::fmt;

/// Identifier for the digital inputs sampled every cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputLine {
    SystemSwitch,
    DischargeInhibit,
    ChargeInhibit,
    ChargerSelect,
}

impl InputLine {
    /// Deterministic index for lookups into [`ALL_INPUTS`].
    pub const fn as_index(self) -> usize {
        match self {
            InputLine::SystemSwitch => 0,
            InputLine::DischargeInhibit => 1,
            InputLine::ChargeInhibit => 2,
            InputLine::ChargerSelect => 3,
        }
    }
}

/// Identifier for the digital outputs driven by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputLine {
    PowerReady,
    DischargeContactor,
    MpptContactor,
    ExternalContactor,
    Indicator,
}

impl OutputLine {
    /// Deterministic index for lookups into [`ALL_OUTPUTS`].
    pub const fn as_index(self) -> usize {
        match self {
            OutputLine::PowerReady => 0,
            OutputLine::DischargeContactor => 1,
            OutputLine::MpptContactor => 2,
            OutputLine::ExternalContactor => 3,
            OutputLine::Indicator => 4,
        }
    }

    /// Attempts to construct an [`OutputLine`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(OutputLine::PowerReady),
            1 => Some(OutputLine::DischargeContactor),
            2 => Some(OutputLine::MpptContactor),
            3 => Some(OutputLine::ExternalContactor),
            4 => Some(OutputLine::Indicator),
            _ => None,
        }
    }

    /// Returns `true` for the two charger contactors that must never close together.
    pub const fn is_charger_contactor(self) -> bool {
        matches!(self, OutputLine::MpptContactor | OutputLine::ExternalContactor)
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(output_by_id(*self).name)
    }
}

/// Electrical level that means "active" for a line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinePolarity {
    ActiveHigh,
    ActiveLow,
}

/// Bias applied to an input so an unplugged wire reads a defined level.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputBias {
    PullUp,
    PullDown,
}

/// Metadata describing how an input is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InputLineInfo {
    pub id: InputLine,
    pub name: &'static str,
    pub mcu_pin: &'static str,
    pub terminal: &'static str,
    pub polarity: LinePolarity,
    pub bias: InputBias,
}

/// Metadata describing how an output is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OutputLineInfo {
    pub id: OutputLine,
    pub name: &'static str,
    pub mcu_pin: &'static str,
    pub terminal: &'static str,
}

/// Compile-time catalog of every input line.
pub const ALL_INPUTS: [InputLineInfo; 4] = [
    // Low (or floating) keeps the enclosure off.
    InputLineInfo {
        id: InputLine::SystemSwitch,
        name: "SYS_SW",
        mcu_pin: "PB3",
        terminal: "IN0",
        polarity: LinePolarity::ActiveHigh,
        bias: InputBias::PullDown,
    },
    InputLineInfo {
        id: InputLine::DischargeInhibit,
        name: "DSG_INH",
        mcu_pin: "PB4",
        terminal: "IN1",
        polarity: LinePolarity::ActiveLow,
        bias: InputBias::PullUp,
    },
    InputLineInfo {
        id: InputLine::ChargeInhibit,
        name: "CHG_INH",
        mcu_pin: "PB5",
        terminal: "IN2",
        polarity: LinePolarity::ActiveLow,
        bias: InputBias::PullUp,
    },
    // High selects the MPPT controller, low the external charger.
    InputLineInfo {
        id: InputLine::ChargerSelect,
        name: "CHG_SEL",
        mcu_pin: "PB6",
        terminal: "IN3",
        polarity: LinePolarity::ActiveHigh,
        bias: InputBias::PullUp,
    },
];

/// Compile-time catalog of every output line.
pub const ALL_OUTPUTS: [OutputLineInfo; 5] = [
    OutputLineInfo {
        id: OutputLine::PowerReady,
        name: "BMS_READY",
        mcu_pin: "PA4",
        terminal: "OUT0",
    },
    OutputLineInfo {
        id: OutputLine::DischargeContactor,
        name: "DSG_CONT",
        mcu_pin: "PA5",
        terminal: "OUT1",
    },
    OutputLineInfo {
        id: OutputLine::MpptContactor,
        name: "MPPT_CONT",
        mcu_pin: "PA6",
        terminal: "OUT2",
    },
    OutputLineInfo {
        id: OutputLine::ExternalContactor,
        name: "EXT_CONT",
        mcu_pin: "PA7",
        terminal: "OUT3",
    },
    OutputLineInfo {
        id: OutputLine::Indicator,
        name: "STATUS_LED",
        mcu_pin: "PC6",
        terminal: "LED",
    },
];

/// Retrieve input metadata by identifier.
pub const fn input_by_id(id: InputLine) -> InputLineInfo {
    ALL_INPUTS[id.as_index()]
}

/// Retrieve output metadata by identifier.
pub const fn output_by_id(id: OutputLine) -> OutputLineInfo {
    ALL_OUTPUTS[id.as_index()]
}

/// Abstraction over the physical output drivers.
///
/// `true` always means "asserted" (contactor coil energised, LED lit). Writes
/// must take effect in call order; the break-before-make guarantee relies on
/// it.
pub trait PowerPathDriver {
    /// Drives a single output line.
    fn drive(&mut self, line: OutputLine, asserted: bool);

    /// Deasserts every output line.
    fn release_all(&mut self) {
        for info in ALL_OUTPUTS.iter() {
            self.drive(info.id, false);
        }
    }
}

/// Driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopPowerPathDriver;

impl NoopPowerPathDriver {
    /// Creates a new no-op driver.
    pub const fn new() -> Self {
        Self
    }
}

impl PowerPathDriver for NoopPowerPathDriver {
    fn drive(&mut self, _: OutputLine, _: bool) {}

    fn release_all(&mut self) {}
}
