//! Timing configuration for the interlock and the status indicator.

use core::fmt;
use core::time::Duration;

/// Time given to an opening charger contactor before the other one closes.
pub const DEFAULT_DEAD_TIME: Duration = Duration::from_millis(5);
/// Hold after all outputs are driven low and before the first cycle.
pub const DEFAULT_WARM_UP: Duration = Duration::from_millis(500);
/// Blink unit while the system state is known.
pub const NORMAL_BLINK_UNIT: Duration = Duration::from_millis(500);
/// Blink unit while the controller is still uninitialized.
pub const UNSAFE_BLINK_UNIT: Duration = Duration::from_millis(100);

/// Longest dead-time the microsecond delay capability can express.
pub const MAX_DEAD_TIME: Duration = Duration::from_micros(u32::MAX as u64);
/// Longest warm-up the same delay capability can hold in one wait.
pub const MAX_WARM_UP: Duration = MAX_DEAD_TIME;

/// Blink unit durations for the two indicator cadences.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndicatorConfig {
    pub normal_unit: Duration,
    pub unsafe_unit: Duration,
}

impl IndicatorConfig {
    #[must_use]
    pub const fn new(normal_unit: Duration, unsafe_unit: Duration) -> Self {
        Self {
            normal_unit,
            unsafe_unit,
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self::new(NORMAL_BLINK_UNIT, UNSAFE_BLINK_UNIT)
    }
}

/// Complete controller configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InterlockConfig {
    pub dead_time: Duration,
    pub warm_up: Duration,
    pub indicator: IndicatorConfig,
}

impl InterlockConfig {
    /// Configuration using the board defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dead_time: DEFAULT_DEAD_TIME,
            warm_up: DEFAULT_WARM_UP,
            indicator: IndicatorConfig::new(NORMAL_BLINK_UNIT, UNSAFE_BLINK_UNIT),
        }
    }

    #[must_use]
    pub const fn with_dead_time(mut self, dead_time: Duration) -> Self {
        self.dead_time = dead_time;
        self
    }

    #[must_use]
    pub const fn with_warm_up(mut self, warm_up: Duration) -> Self {
        self.warm_up = warm_up;
        self
    }

    #[must_use]
    pub const fn with_indicator(mut self, indicator: IndicatorConfig) -> Self {
        self.indicator = indicator;
        self
    }

    /// Rejects settings that would void the break-before-make guarantee or
    /// stall the indicator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dead_time.is_zero() {
            return Err(ConfigError::ZeroDeadTime);
        }
        if self.dead_time > MAX_DEAD_TIME {
            return Err(ConfigError::DeadTimeTooLong);
        }
        if self.warm_up > MAX_WARM_UP {
            return Err(ConfigError::WarmUpTooLong);
        }
        if self.indicator.normal_unit.is_zero() || self.indicator.unsafe_unit.is_zero() {
            return Err(ConfigError::ZeroBlinkUnit);
        }
        Ok(())
    }
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Invalid configuration detected at construction time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroDeadTime,
    DeadTimeTooLong,
    WarmUpTooLong,
    ZeroBlinkUnit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigError::ZeroDeadTime => "contactor dead-time must be non-zero",
            ConfigError::DeadTimeTooLong => "contactor dead-time exceeds the delay range",
            ConfigError::WarmUpTooLong => "warm-up exceeds the delay range",
            ConfigError::ZeroBlinkUnit => "blink unit must be non-zero",
        })
    }
}
