//! Interrupt-side cycle state
//!
//! # Design
//! Everything touched by the timer interrupt lives in one [Sequencer]: the clock and start pulse
//! lines, the tick source, the waveform and the sample synchronizer. It is shared with the reader
//! through a [SharedSequencer], so every access from either context goes through a critical
//! section.
//!
//! Faults in the interrupt (late ticks, missed samples, pin errors) never stop the waveform. They
//! are accumulated in a [Status] which the reader turns into an error.
use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal_1::digital::{self, Error as _, OutputPin};

use crate::config::TimingConfig;
use crate::synchronizer::SampleSynchronizer;
use crate::timer::{TickSource, Ticker};
use crate::waveform::{Phase, Waveform};
use crate::Error;

/// A [Sequencer] shared between the timer interrupt and the reader.
pub type SharedSequencer<CLK, TRG, T> = Mutex<RefCell<Sequencer<CLK, TRG, T>>>;

/// Fault and progress counters of the current cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    /// Timer firings handled.
    pub ticks: u32,
    /// Firings that found the next compare match already pending.
    pub late_ticks: u32,
    /// Samples issued while the previous one was still unread.
    pub missed_samples: u32,
    /// The first pin error.
    pub pin_fault: Option<digital::ErrorKind>,
}

impl Status {
    /// Convert recorded faults into an error.
    pub fn check(&self) -> Result<(), Error> {
        if let Some(kind) = self.pin_fault {
            return Err(Error::Pin(kind));
        }
        if self.late_ticks > 0 || self.missed_samples > 0 {
            return Err(Error::TimingOverrun {
                missed_samples: self.missed_samples,
                late_ticks: self.late_ticks,
            });
        }
        Ok(())
    }

    fn record<E: digital::Error>(&mut self, result: Result<(), E>) {
        if let Err(e) = result {
            self.pin_fault.get_or_insert(e.kind());
        }
    }
}

pub struct Sequencer<CLK, TRG, T> {
    clock: CLK,
    trigger: TRG,
    ticker: Ticker<T>,
    waveform: Waveform,
    sync: SampleSynchronizer,
    status: Status,
}

impl<CLK, TRG, T> Sequencer<CLK, TRG, T>
where
    CLK: OutputPin,
    TRG: OutputPin,
    T: TickSource,
{
    /// Take ownership of the lines and the timer. The timer is disarmed.
    pub fn new(clock: CLK, trigger: TRG, timer: T) -> Self {
        let config = TimingConfig::default();
        Self {
            clock,
            trigger,
            ticker: Ticker::new(timer),
            waveform: Waveform::new(&config),
            sync: SampleSynchronizer::new(
                config.read_threshold_clock(),
                config.pixel_count as u32,
            ),
            status: Status::default(),
        }
    }

    /// Reset the cycle state, park the lines and arm the timer.
    ///
    /// # Note
    /// The configuration must have been validated.
    pub fn prime(&mut self, config: &TimingConfig) -> Result<(), Error> {
        if self.ticker.is_armed() {
            return Err(Error::Busy);
        }

        self.waveform = Waveform::new(config);
        self.sync = SampleSynchronizer::new(
            config.read_threshold_clock(),
            config.pixel_count as u32,
        );
        self.status = Status::default();

        // The first firing must produce a falling edge.
        self.trigger
            .set_low()
            .map_err(|e| Error::Pin(e.kind()))?;
        self.clock.set_high().map_err(|e| Error::Pin(e.kind()))?;

        self.ticker.arm(self.waveform.first_interval());
        Ok(())
    }

    /// Handle one timer firing.
    pub fn on_tick(&mut self) {
        if !self.ticker.is_armed() {
            return;
        }

        let step = self.waveform.tick();

        match step.trigger {
            Some(true) => self.status.record(self.trigger.set_high()),
            Some(false) => self.status.record(self.trigger.set_low()),
            None => {}
        }

        let result = match step.clock {
            Phase::High => self.clock.set_high(),
            Phase::Low => self.clock.set_low(),
        };
        self.status.record(result);

        if let Some(period) = step.period {
            self.sync.on_period(period);
            self.status.missed_samples = self.sync.missed();
        }

        self.ticker.rearm(step.interval);

        self.status.ticks = self.status.ticks.wrapping_add(1);
        if self.ticker.overrun() {
            self.status.late_ticks = self.status.late_ticks.saturating_add(1);
        }
    }

    /// Consume the sample ready condition.
    pub fn take_sample(&mut self) -> bool {
        self.sync.take()
    }

    /// Stop the timer and drive both lines to their idle level: clock high, start pulse low.
    pub fn finish(&mut self) -> Result<(), Error> {
        self.ticker.disarm();
        self.trigger
            .set_low()
            .map_err(|e| Error::Pin(e.kind()))?;
        self.clock.set_high().map_err(|e| Error::Pin(e.kind()))
    }

    pub fn is_armed(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn clock_count(&self) -> u32 {
        self.waveform.clock_count()
    }

    pub fn read_threshold_clock(&self) -> u32 {
        self.sync.threshold()
    }

    /// Whether the first sample of the cycle has been issued.
    pub fn sampling(&self) -> bool {
        self.sync.issued() > 0
    }

    /// Release the lines and the timer.
    pub fn free(self) -> (CLK, TRG, T) {
        (self.clock, self.trigger, self.ticker.free())
    }
}

/// Timer interrupt entry point.
///
/// Call this from the compare-match interrupt handler of the tick source.
pub fn on_timer_interrupt<CLK, TRG, T>(sequencer: &SharedSequencer<CLK, TRG, T>)
where
    CLK: OutputPin,
    TRG: OutputPin,
    T: TickSource,
{
    critical_section::with(|cs| sequencer.borrow_ref_mut(cs).on_tick());
}

#[cfg(test)]
mod test {
    use super::*;
    use std::vec::Vec;

    /// A line that optionally fails to go high.
    #[derive(Default)]
    struct Line {
        high: bool,
        edges: u32,
        fail: bool,
    }

    #[derive(Debug)]
    struct Broken;

    impl digital::Error for Broken {
        fn kind(&self) -> digital::ErrorKind {
            digital::ErrorKind::Other
        }
    }

    impl digital::ErrorType for Line {
        type Error = Broken;
    }

    impl OutputPin for Line {
        fn set_low(&mut self) -> Result<(), Broken> {
            self.edges += self.high as u32;
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Broken> {
            if self.fail {
                return Err(Broken);
            }
            self.edges += !self.high as u32;
            self.high = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Timer {
        armed: bool,
        intervals: Vec<u32>,
        late: bool,
    }

    impl TickSource for Timer {
        fn arm(&mut self, interval: u32) {
            self.armed = true;
            self.intervals.push(interval);
        }
        fn rearm(&mut self, interval: u32) {
            self.intervals.push(interval);
        }
        fn disarm(&mut self) {
            self.armed = false;
        }
        fn overrun(&mut self) -> bool {
            core::mem::take(&mut self.late)
        }
    }

    fn config() -> TimingConfig {
        TimingConfig {
            trigger_high_clocks: 10,
            pixel_count: 4,
            ..Default::default()
        }
    }

    #[test]
    fn prime_parks_lines() {
        let mut seq =
            Sequencer::new(Line::default(), Line::default(), Timer::default());
        seq.prime(&config()).unwrap();
        assert!(seq.is_armed());
        assert_eq!(seq.read_threshold_clock(), 24);
        assert_eq!(seq.prime(&config()), Err(Error::Busy));

        let (clock, trigger, timer) = seq.free();
        assert!(clock.high);
        assert!(!trigger.high);
        assert!(timer.armed);
        assert_eq!(timer.intervals, [70]);
    }

    #[test]
    fn asymmetric_intervals() {
        let mut seq =
            Sequencer::new(Line::default(), Line::default(), Timer::default());
        seq.prime(&config()).unwrap();
        for _ in 0..4 {
            seq.on_tick();
        }
        let (clock, _, timer) = seq.free();
        assert_eq!(clock.edges, 1 + 4);
        assert_eq!(timer.intervals, [70, 50, 70, 50, 70]);
    }

    #[test]
    fn samples_after_threshold() {
        let mut seq =
            Sequencer::new(Line::default(), Line::default(), Timer::default());
        seq.prime(&config()).unwrap();
        let mut samples = Vec::new();
        for _ in 0..100 {
            seq.on_tick();
            if seq.take_sample() {
                samples.push(seq.clock_count());
            }
        }
        assert_eq!(samples, [24, 25, 26, 27]);
        assert_eq!(seq.status().check(), Ok(()));
    }

    #[test]
    fn ignores_ticks_when_disarmed() {
        let mut seq =
            Sequencer::new(Line::default(), Line::default(), Timer::default());
        seq.on_tick();
        assert_eq!(seq.status().ticks, 0);

        seq.prime(&config()).unwrap();
        seq.on_tick();
        seq.finish().unwrap();
        seq.on_tick();
        assert_eq!(seq.status().ticks, 1);
        assert_eq!(seq.clock_count(), 1);
        let (clock, trigger, timer) = seq.free();
        assert!(clock.high);
        assert!(!trigger.high);
        assert!(!timer.armed);
    }

    #[test]
    fn late_tick_is_overrun() {
        let timer = Timer {
            late: true,
            ..Default::default()
        };
        let mut seq = Sequencer::new(Line::default(), Line::default(), timer);
        seq.prime(&config()).unwrap();
        seq.on_tick();
        seq.on_tick();
        assert_eq!(
            seq.status().check(),
            Err(Error::TimingOverrun {
                missed_samples: 0,
                late_ticks: 1
            })
        );
    }

    #[test]
    fn pin_faults() {
        let clock = Line {
            fail: true,
            ..Default::default()
        };
        let mut seq = Sequencer::new(clock, Line::default(), Timer::default());
        assert_eq!(
            seq.prime(&config()),
            Err(Error::Pin(digital::ErrorKind::Other))
        );
        assert!(!seq.is_armed());

        let trigger = Line {
            fail: true,
            ..Default::default()
        };
        let mut seq = Sequencer::new(Line::default(), trigger, Timer::default());
        seq.prime(&config()).unwrap();
        seq.on_tick();
        assert_eq!(
            seq.status().check(),
            Err(Error::Pin(digital::ErrorKind::Other))
        );
        assert_eq!(seq.clock_count(), 1);
    }
}
