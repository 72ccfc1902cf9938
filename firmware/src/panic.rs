// firmware/src/panic.rs
use core::panic::PanicInfo;

use cortex_m::peripheral::SCB;
use defmt::error;

/// Logs the panic and resets the MCU.
///
/// After reset every GPIO returns to its floating input state, so the
/// contactor drivers drop out and the boot sequence runs again from
/// `Uninitialized`.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("interlock halted: {}", defmt::Display2Format(info));
    SCB::sys_reset();
}
