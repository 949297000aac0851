//! Board support for the S9227 acquisition firmware
//!
//! The sensor connects to an STM32H743: CLK on PD4, ST on PD3, EOS on PD2 and the video output
//! on PC0 (ADC1 INP10).
pub use stm32h7xx_hal as hal;

use core::convert::Infallible;

use embedded_hal_compat::{markers::ForwardOutputPin, Forward};
use rtt_target::UpChannel;
use s9227::{OneShotAdc, PinAssignment, SharedSequencer};

pub mod setup;
pub mod timers;

rtic_monotonics::systick_monotonic!(Systick, 1_000);

/// Pin numbers of the sensor lines within their ports.
pub const PINS: PinAssignment = PinAssignment {
    clock: 4,
    trigger: 3,
    video: 0,
    end_of_scan: 2,
};

pub type ClockPin =
    Forward<hal::gpio::ErasedPin<hal::gpio::Output>, ForwardOutputPin>;
pub type TriggerPin =
    Forward<hal::gpio::ErasedPin<hal::gpio::Output>, ForwardOutputPin>;
pub type EndOfScanPin = hal::gpio::gpiod::PD2<hal::gpio::Input>;

pub type VideoInput = OneShotAdc<
    hal::stm32::ADC1,
    u32,
    hal::adc::Adc<hal::stm32::ADC1, hal::adc::Enabled>,
    hal::gpio::gpioc::PC0<hal::gpio::Analog>,
>;

pub type SensorSequencer =
    SharedSequencer<ClockPin, TriggerPin, timers::TickTimer>;

/// RTT up channel receiving the scan dumps.
pub struct ScanChannel(pub UpChannel);

impl embedded_io::ErrorType for ScanChannel {
    type Error = Infallible;
}

impl embedded_io::Write for ScanChannel {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        // The channel blocks when full.
        Ok(self.0.write(buf))
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

#[inline(never)]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::{
        fmt::Write,
        sync::atomic::{AtomicBool, Ordering},
    };
    use cortex_m::asm;
    use rtt_target::ChannelMode;

    cortex_m::interrupt::disable();

    // Recursion protection
    static PANICKED: AtomicBool = AtomicBool::new(false);
    while PANICKED.load(Ordering::Relaxed) {
        asm::bkpt();
    }
    PANICKED.store(true, Ordering::Relaxed);

    // Stop the sensor clock.
    let tim2 = unsafe { &*hal::stm32::TIM2::ptr() };
    tim2.cr1.modify(|_, w| w.cen().clear_bit());

    if let Some(mut channel) = unsafe { UpChannel::conjure(0) } {
        channel.set_mode(ChannelMode::BlockIfFull);
        writeln!(channel, "{}", info).ok();
    }

    // Abort
    asm::udf();
}

#[cortex_m_rt::exception]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
