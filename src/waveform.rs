//! Clock and start pulse waveform generation
//!
//! # Design
//! The clock period is defined falling edge to falling edge. The clock line is parked high before
//! a cycle begins, so the first timer firing produces a falling edge and opens clock period 0.
//!
//! Each firing toggles the clock line. On a falling edge (the start of a new period) the start
//! pulse transitions are evaluated against the number of periods completed so far: the start
//! pulse rises with period 0 and falls with period `trigger_high_clocks`. The period counter is
//! advanced with every falling edge.
//!
//! The state machine is pure: it only reports what the lines must do and how long until the
//! next firing. Applying that to hardware is the job of the sequencer.
use crate::config::TimingConfig;

/// The half of the clock period currently driven on the clock line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    High,
    Low,
}

/// The outcome of one timer firing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Step {
    /// Level to drive the clock line to.
    pub clock: Phase,

    /// Start pulse transition, `Some(true)` to assert.
    pub trigger: Option<bool>,

    /// The period count after a falling edge.
    pub period: Option<u32>,

    /// Ticks until the next firing.
    pub interval: u32,
}

#[derive(Clone, Debug)]
pub struct Waveform {
    clock_count: u32,
    phase: Phase,
    trigger_high_clocks: u32,
    high_ticks: u32,
    low_ticks: u32,
}

impl Waveform {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            clock_count: 0,
            phase: Phase::High,
            trigger_high_clocks: config.trigger_high_clocks,
            high_ticks: config.clock_high_ticks,
            low_ticks: config.clock_low_ticks,
        }
    }

    /// Number of clock periods started in this cycle.
    pub fn clock_count(&self) -> u32 {
        self.clock_count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ticks from arming to the first firing. The parked high level counts as a high half.
    pub fn first_interval(&self) -> u32 {
        self.high_ticks
    }

    /// Advance by one timer firing.
    pub fn tick(&mut self) -> Step {
        match self.phase {
            Phase::High => {
                // The start pulse only moves on falling edges. Drivers that evaluate it on every
                // firing drop it on the rising edge half a period earlier, which puts the first
                // sample 13.5 periods after the fall instead of 13. The pipeline latency and the
                // simulated sensor in the integration tests are counted from this falling edge,
                // so moving the fall shifts every pixel.
                let trigger = if self.clock_count == 0 {
                    Some(true)
                } else if self.clock_count == self.trigger_high_clocks {
                    Some(false)
                } else {
                    None
                };

                self.clock_count = self.clock_count.saturating_add(1);
                self.phase = Phase::Low;

                Step {
                    clock: Phase::Low,
                    trigger,
                    period: Some(self.clock_count),
                    interval: self.low_ticks,
                }
            }
            Phase::Low => {
                self.phase = Phase::High;

                Step {
                    clock: Phase::High,
                    trigger: None,
                    period: None,
                    interval: self.high_ticks,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TimingConfig {
        TimingConfig {
            trigger_high_clocks: 20,
            ..Default::default()
        }
    }

    #[test]
    fn first_edge_falls() {
        let mut wave = Waveform::new(&config());
        assert_eq!(wave.phase(), Phase::High);
        assert_eq!(wave.first_interval(), 70);
        assert_eq!(
            wave.tick(),
            Step {
                clock: Phase::Low,
                trigger: Some(true),
                period: Some(1),
                interval: 50,
            }
        );
        assert_eq!(
            wave.tick(),
            Step {
                clock: Phase::High,
                trigger: None,
                period: None,
                interval: 70,
            }
        );
        assert_eq!(wave.clock_count(), 1);
    }

    #[test]
    fn clock_toggles_every_tick() {
        let mut wave = Waveform::new(&config());
        let mut level = Phase::High;
        for _ in 0..1000 {
            let step = wave.tick();
            assert_ne!(step.clock, level);
            level = step.clock;
        }
        assert_eq!(wave.clock_count(), 500);
    }

    #[test]
    fn trigger_once_per_cycle() {
        let mut wave = Waveform::new(&config());
        let mut asserted = None;
        let mut deasserted = None;
        for _ in 0..400 {
            let before = wave.clock_count();
            match wave.tick().trigger {
                Some(true) => {
                    assert!(asserted.replace(before).is_none());
                }
                Some(false) => {
                    assert!(deasserted.replace(before).is_none());
                }
                None => {}
            }
        }
        assert_eq!(asserted, Some(0));
        assert_eq!(deasserted, Some(20));
    }

    #[test]
    fn count_is_monotonic() {
        let mut wave = Waveform::new(&config());
        let mut last = 0;
        for _ in 0..100 {
            if let Some(period) = wave.tick().period {
                assert_eq!(period, last + 1);
                last = period;
            }
            assert_eq!(wave.clock_count(), last);
        }
    }
}
