//! Board configuration
//!
//! Clocks, RTT logging, the sensor lines, the tick timer and the video ADC.
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal_compat::ForwardCompat;
use s9227::{OneShotAdc, PinRole, TimingConfig};
use stm32h7xx_hal::{self as hal, prelude::*};
use strum::IntoEnumIterator;

use super::{
    timers::TickTimer, ClockPin, EndOfScanPin, ScanChannel, Systick,
    TriggerPin, VideoInput, PINS,
};

/// The sensor facing hardware, with the timer stopped and the lines at their idle level.
pub struct SensorDevices {
    pub clock: ClockPin,
    pub trigger: TriggerPin,
    pub timer: TickTimer,
    pub video: VideoInput,
    pub end_of_scan: EndOfScanPin,
    pub scan: ScanChannel,
}

/// Configure the microcontroller.
///
/// # Args
/// * `core` - The cortex-m core peripherals.
/// * `device` - The microcontroller peripherals.
/// * `config` - The timing the tick timer rate is derived from.
pub fn setup(
    core: hal::stm32::CorePeripherals,
    device: hal::stm32::Peripherals,
    config: &TimingConfig,
) -> SensorDevices {
    // Set up RTT: channel 0 for logging, channel 1 for the scan data.
    let scan = {
        // Enable debug during WFE/WFI-induced sleep
        device.DBGMCU.cr.modify(|_, w| w.dbgsleep_d1().set_bit());

        let channels = rtt_target::rtt_init! {
            up: {
                0: {
                    size: 1024
                    name: "Terminal"
                }
                1: {
                    size: 4096
                    mode: BlockIfFull
                    name: "Scan"
                }
            }
        };

        // Note(unsafe): The closure we pass does not establish a critical section
        // as demanded but it does ensure synchronization and implements a lock.
        // Messages logged while the lock is held are dropped, so logging never delays the tick
        // interrupt.
        unsafe {
            rtt_target::set_print_channel_cs(
                channels.up.0,
                &((|arg, f| {
                    static LOCKED: AtomicBool = AtomicBool::new(false);
                    if LOCKED.compare_exchange_weak(
                        false,
                        true,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    ) == Ok(false)
                    {
                        f(arg);
                        LOCKED.store(false, Ordering::Release);
                    }
                }) as rtt_target::CriticalSectionFunc),
            );
        }

        static LOGGER: rtt_logger::RTTLogger =
            rtt_logger::RTTLogger::new(log::LevelFilter::Info);
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(log::LevelFilter::Trace))
            .unwrap();
        log::info!("Starting");

        ScanChannel(channels.up.1)
    };

    let pwr = device.PWR.constrain();
    let vos = pwr.freeze();

    // The internal ADC is clocked from per_ck.
    device.RCC.d3ccipr.modify(|_, w| w.adcsel().per());

    let rcc = device.RCC.constrain();
    let ccdr = rcc
        .use_hse(8.MHz())
        .sysclk(400.MHz())
        .hclk(200.MHz())
        .per_ck(64.MHz())
        .freeze(vos, &device.SYSCFG);

    // The ADC needs a delay for its startup. Borrow SYST before handing it to the monotonic.
    let mut delay = hal::delay::Delay::new(core.SYST, ccdr.clocks);

    let video = {
        let mut adc1 = hal::adc::Adc::adc1(
            device.ADC1,
            4.MHz(),
            &mut delay,
            ccdr.peripheral.ADC12,
            &ccdr.clocks,
        );

        // The conversion runs with interrupts disabled and must fit in a fraction of the clock
        // low half.
        adc1.set_sample_time(hal::adc::AdcSampleTime::T_8);
        adc1.set_resolution(hal::adc::Resolution::SixteenBit);
        adc1.calibrate();

        let gpioc = device.GPIOC.split(ccdr.peripheral.GPIOC);
        OneShotAdc::new(adc1.enable(), gpioc.pc0.into_analog())
    };

    Systick::start(delay.free(), ccdr.clocks.sysclk().to_Hz());

    let gpiod = device.GPIOD.split(ccdr.peripheral.GPIOD);

    // Park the lines at their idle level before the timer can touch them.
    let mut clock = gpiod.pd4.into_push_pull_output();
    clock.set_high();
    let mut trigger = gpiod.pd3.into_push_pull_output();
    trigger.set_low();
    let end_of_scan = gpiod.pd2.into_input();

    PINS.validate().unwrap();
    for role in PinRole::iter() {
        log::info!("{role}: {}", PINS.line(role));
    }

    let timer = {
        // The period is programmed per interval, so the 1 kHz setting here is a dont-care.
        let mut timer2 =
            device
                .TIM2
                .timer(1.kHz(), ccdr.peripheral.TIM2, &ccdr.clocks);

        timer2.pause();
        timer2.set_tick_freq(config.timer_frequency.Hz());

        TickTimer::new(timer2)
    };

    log::info!(
        "Sensor clock {} Hz",
        config.clock_frequency().map_or(0, |f| f.to_Hz())
    );

    SensorDevices {
        clock: clock.erase().forward(),
        trigger: trigger.erase().forward(),
        timer,
        video,
        end_of_scan,
        scan,
    }
}
