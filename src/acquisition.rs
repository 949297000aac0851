//! Acquisition cycle orchestration
//!
//! # Design
//! A cycle runs in the foreground and progresses through [CyclePhase]s:
//!
//! * `Idle -> Priming`: the configuration is validated (a refused cycle has no side effects), the
//!   buffer and the sequencer are reset, the clock line is parked high and the timer armed.
//! * `Priming -> Integrating`: the first timer firing asserts the start pulse.
//! * `Integrating -> Reading`: the first sample becomes ready.
//! * `Reading -> Complete`: the buffer is full. The timer is disarmed and the lines idled.
//!
//! While reading, the foreground spins on the ready condition. Taking the condition, converting
//! the video level and appending it happen in one critical section. The deadline for each sample
//! is one clock period; a sample not taken in time is reported as a timing overrun by the
//! interrupt side.
//!
//! The spin is bounded: a cancellation flag is checked on each poll and the watchdog limits both
//! the clock count and the number of consecutive polls that see no timer tick at all. A reader
//! that falls behind a running timer always fails the status check with a timing overrun before
//! the clock limit can expire, so for a live timer the stalled-poll bound is the watchdog that
//! fires. The clock limit only trips if the interrupt keeps counting periods without issuing
//! samples.
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal_1::digital::OutputPin;

use crate::adc::VideoAdc;
use crate::buffer::AcquisitionBuffer;
use crate::config::TimingConfig;
use crate::sequencer::SharedSequencer;
use crate::timer::TickSource;
use crate::Error;

/// Progress of the current cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CyclePhase {
    #[default]
    Idle,
    Priming,
    Integrating,
    Reading,
    Complete,
}

/// What the reader does between two polls of the ready condition.
pub trait Idle {
    fn idle(&mut self);
}

/// Busy-wait with a spin loop hint.
#[derive(Copy, Clone, Debug, Default)]
pub struct Spin;

impl Idle for Spin {
    #[inline(always)]
    fn idle(&mut self) {
        core::hint::spin_loop();
    }
}

impl<F: FnMut()> Idle for F {
    fn idle(&mut self) {
        self()
    }
}

/// Summary of a completed cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Clock periods started.
    pub clocks: u32,
    /// Timer firings handled.
    pub ticks: u32,
    /// Clock count of the first sample.
    pub read_threshold_clock: u32,
    /// Samples captured.
    pub samples: usize,
}

#[derive(Copy, Clone, Debug)]
struct Poll {
    ticks: u32,
    clocks: u32,
    sampling: bool,
    full: bool,
}

/// Foreground side of the acquisition.
pub struct Acquisition<'a, CLK, TRG, T, ADC> {
    sequencer: &'a SharedSequencer<CLK, TRG, T>,
    adc: ADC,
    buffer: AcquisitionBuffer,
    phase: CyclePhase,
    report: Option<CycleReport>,
}

impl<'a, CLK, TRG, T, ADC> Acquisition<'a, CLK, TRG, T, ADC>
where
    CLK: OutputPin,
    TRG: OutputPin,
    T: TickSource,
    ADC: VideoAdc,
{
    /// # Args
    /// * `sequencer` - The sequencer also served by the timer interrupt.
    /// * `adc` - The ADC converting the sensor video output.
    pub fn new(sequencer: &'a SharedSequencer<CLK, TRG, T>, adc: ADC) -> Self {
        Self {
            sequencer,
            adc,
            buffer: AcquisitionBuffer::default(),
            phase: CyclePhase::Idle,
            report: None,
        }
    }

    /// Run one acquisition cycle to completion.
    ///
    /// # Args
    /// * `config` - The cycle timing.
    /// * `idle` - Called between polls.
    /// * `cancel` - Aborts the cycle when set.
    ///
    /// # Returns
    /// The full scan. On error, the buffer content is invalid.
    pub fn run_cycle<I: Idle>(
        &mut self,
        config: &TimingConfig,
        mut idle: I,
        cancel: Option<&AtomicBool>,
    ) -> Result<&AcquisitionBuffer, Error> {
        self.phase = CyclePhase::Idle;
        self.report = None;

        config.validate()?;

        self.phase = CyclePhase::Priming;
        self.buffer.resize(config.pixel_count as usize);
        if let Err(e) = critical_section::with(|cs| {
            self.sequencer.borrow_ref_mut(cs).prime(config)
        }) {
            self.phase = CyclePhase::Idle;
            if e != Error::Busy {
                self.finish().ok();
            }
            return Err(e);
        }

        log::debug!(
            "Cycle primed: {} clocks integration, first pixel at clock {}",
            config.integration_clocks(),
            config.read_threshold_clock()
        );

        let result = self.read(config, &mut idle, cancel);
        let finished = self.finish();

        match result.and(finished) {
            Ok(report) => {
                self.phase = CyclePhase::Complete;
                self.report = Some(report);
                log::info!(
                    "Cycle complete: {} samples in {} clocks",
                    report.samples,
                    report.clocks
                );
                Ok(&self.buffer)
            }
            Err(e) => {
                log::warn!("Cycle aborted in {:?}: {}", self.phase, e);
                self.phase = CyclePhase::Idle;
                Err(e)
            }
        }
    }

    fn read(
        &mut self,
        config: &TimingConfig,
        idle: &mut impl Idle,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), Error> {
        let clock_limit = config
            .start_pulse_cycle_clocks
            .saturating_add(config.watchdog.slack_clocks);
        let mut last_ticks = 0;
        let mut stalled = 0;

        loop {
            let poll = critical_section::with(|cs| {
                let mut sequencer = self.sequencer.borrow_ref_mut(cs);
                sequencer.status().check()?;

                if sequencer.take_sample() {
                    let sample = self.adc.sample().map_err(|e| {
                        log::warn!("Video conversion failed: {e:?}");
                        Error::Adc
                    })?;
                    let pushed = self.buffer.push(sample);
                    debug_assert!(pushed.is_ok(), "Sample beyond scan length");
                    pushed?;
                }

                Ok::<_, Error>(Poll {
                    ticks: sequencer.status().ticks,
                    clocks: sequencer.clock_count(),
                    sampling: sequencer.sampling(),
                    full: self.buffer.is_full(),
                })
            })?;

            if poll.full {
                return Ok(());
            }

            if poll.sampling {
                self.phase = CyclePhase::Reading;
            } else if poll.ticks > 0 {
                self.phase = CyclePhase::Integrating;
            }

            // Unreachable while samples are issued every period past the threshold.
            if poll.clocks > clock_limit {
                return Err(Error::Timeout {
                    clocks: poll.clocks,
                });
            }

            if poll.ticks == last_ticks {
                stalled += 1;
                if config.watchdog.stalled_polls != 0
                    && stalled >= config.watchdog.stalled_polls
                {
                    return Err(Error::Timeout {
                        clocks: poll.clocks,
                    });
                }
            } else {
                last_ticks = poll.ticks;
                stalled = 0;
            }

            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled);
            }

            idle.idle();
        }
    }

    fn finish(&mut self) -> Result<CycleReport, Error> {
        critical_section::with(|cs| {
            let mut sequencer = self.sequencer.borrow_ref_mut(cs);
            sequencer.finish()?;
            Ok(CycleReport {
                clocks: sequencer.clock_count(),
                ticks: sequencer.status().ticks,
                read_threshold_clock: sequencer.read_threshold_clock(),
                samples: self.buffer.len(),
            })
        })
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// The summary of the last successful cycle.
    pub fn report(&self) -> Option<CycleReport> {
        self.report
    }

    /// The scan of the last cycle.
    pub fn buffer(&self) -> &AcquisitionBuffer {
        &self.buffer
    }

    pub fn free(self) -> ADC {
        self.adc
    }
}
