//! # S9227
//!
//! Repeatedly acquires scans from a Hamamatsu S9227 linear image sensor.
//!
//! TIM2 generates the sensor clock and start pulse from its update interrupt. A low priority task
//! runs one acquisition cycle per [CYCLE_PERIOD_MS], reading the video output with ADC1, and
//! writes each scan as text to RTT channel 1. Logging goes to RTT channel 0.
#![no_std]
#![no_main]

mod hardware;

/// Pause between two cycles.
const CYCLE_PERIOD_MS: u32 = 1000;

#[rtic::app(device = crate::hardware::hal::stm32, peripherals = true, dispatchers = [DCMI])]
mod app {
    use core::cell::RefCell;

    use critical_section::Mutex;
    use fugit::ExtU32;
    use s9227::{Acquisition, Sequencer, Spin, TimingConfig};

    use super::hardware::{
        setup, timers, ClockPin, EndOfScanPin, ScanChannel, SensorSequencer,
        Systick, TriggerPin, VideoInput,
    };
    use super::CYCLE_PERIOD_MS;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        sequencer: &'static SensorSequencer,
        acquisition: Acquisition<
            'static,
            ClockPin,
            TriggerPin,
            timers::TickTimer,
            VideoInput,
        >,
        config: TimingConfig,
        scan: ScanChannel,
        end_of_scan: EndOfScanPin,
    }

    #[init(local = [sequencer: Option<SensorSequencer> = None])]
    fn init(c: init::Context) -> (Shared, Local) {
        let config = TimingConfig::default();
        if let Err(e) = config.validate() {
            panic!("Invalid timing: {e}");
        }

        let devices = setup::setup(c.core, c.device, &config);

        let sequencer: &'static SensorSequencer =
            c.local.sequencer.insert(Mutex::new(RefCell::new(Sequencer::new(
                devices.clock,
                devices.trigger,
                devices.timer,
            ))));

        acquire::spawn().unwrap();

        (
            Shared {},
            Local {
                sequencer,
                acquisition: Acquisition::new(sequencer, devices.video),
                config,
                scan: devices.scan,
                end_of_scan: devices.end_of_scan,
            },
        )
    }

    #[task(priority = 1, local = [acquisition, config, scan, end_of_scan])]
    async fn acquire(c: acquire::Context) {
        loop {
            match c.local.acquisition.run_cycle(c.local.config, Spin, None) {
                Ok(scan) => {
                    log::debug!(
                        "End of scan line: {}",
                        c.local.end_of_scan.is_high()
                    );
                    scan.dump(c.local.scan).ok();
                }
                Err(e) if !e.is_retryable() => {
                    log::error!("Acquisition stopped: {e}");
                    return;
                }
                Err(_) => {}
            }

            Systick::delay(CYCLE_PERIOD_MS.millis()).await;
        }
    }

    /// Sensor clock generation.
    ///
    /// # Note
    /// This must preempt the acquisition task and complete within the shortest half clock period.
    #[task(binds = TIM2, local = [sequencer], priority = 3)]
    fn tick(c: tick::Context) {
        timers::acknowledge();
        s9227::on_timer_interrupt(*c.local.sequencer);
    }
}
