use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Speed};
use embassy_time::{Delay, Ticker};

use controller_core::lines::{InputLine, input_by_id};

use crate::hw::{HardwareInputs, HardwarePowerPath, pull_for};
use crate::interlock::{CYCLE_PERIOD, FirmwareController, FirmwareInstant, board_config};
use crate::telemetry::{self, EventMirror, LogLevel};

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA4,
        PA5,
        PA6,
        PA7,
        PC6,
        PB3,
        PB4,
        PB5,
        PB6,
        ..
    } = hal::init(config);

    // Output latches are written low before each pin is switched to output.
    let mut power_path = HardwarePowerPath::new([
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::Low),
        Output::new(PA7, Level::Low, Speed::Low),
        Output::new(PC6, Level::Low, Speed::Low),
    ]);

    let inputs = HardwareInputs::new([
        Input::new(PB3, pull_for(input_by_id(InputLine::SystemSwitch).bias)),
        Input::new(PB4, pull_for(input_by_id(InputLine::DischargeInhibit).bias)),
        Input::new(PB5, pull_for(input_by_id(InputLine::ChargeInhibit).bias)),
        Input::new(PB6, pull_for(input_by_id(InputLine::ChargerSelect).bias)),
    ]);

    let mut controller =
        FirmwareController::new(board_config()).expect("interlock configuration");
    let mut delay = Delay;
    controller.boot(FirmwareInstant::now(), &mut power_path, &mut delay);

    run_interlock(controller, inputs, power_path, delay).await
}

async fn run_interlock(
    mut controller: FirmwareController,
    inputs: HardwareInputs<'static>,
    mut power_path: HardwarePowerPath<'static>,
    mut delay: Delay,
) -> ! {
    let mut mirror = EventMirror::new();
    mirror.drain(controller.events());
    telemetry::log_status(&controller.snapshot());

    let mut ticker = Ticker::every(CYCLE_PERIOD);
    let mut first_cycle = true;
    loop {
        let sample = inputs.sample();
        let report = controller.step(&sample, FirmwareInstant::now(), &mut power_path, &mut delay);
        if first_cycle {
            first_cycle = false;
            if telemetry::boot_level(&report, &sample) == LogLevel::Warn {
                telemetry::warn_switch_closed_at_boot();
            }
        }

        mirror.drain(controller.events());
        if report.transition.is_some() {
            telemetry::log_status(&controller.snapshot());
        }

        ticker.next().await;
    }
}
