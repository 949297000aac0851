//! Acquisition timing configuration
//!
//! A [TimingConfig] is fixed for the duration of a cycle. It is validated once at cycle start, so
//! nothing downstream of [TimingConfig::validate] needs to re-check ranges.
use fugit::HertzU32;
use serde::{Deserialize, Serialize};

use crate::design_parameters::{
    CLOCK_FREQUENCY_MAX, CLOCK_FREQUENCY_MIN, CLOCK_HIGH_TICKS, CLOCK_LOW_TICKS,
    INTEGRATION_EXTRA_CLOCKS, MIN_START_PULSE_CYCLE_CLOCKS,
    MIN_TRIGGER_HIGH_CLOCKS, PIPELINE_LATENCY_CLOCKS, PIXEL_COUNT,
    TIMER_FREQUENCY, TRIGGER_HIGH_CLOCKS, WATCHDOG_SLACK_CLOCKS,
    WATCHDOG_STALLED_POLLS,
};
use crate::pins::PinRole;

/// Represents the errors that can occur when validating a configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The start pulse is at least as long as the whole cycle.
    #[error("Start pulse of {high} clocks does not fit a {cycle} clock cycle")]
    TriggerExceedsCycle { high: u32, cycle: u32 },
    /// The start pulse is shorter than the sensor accepts.
    #[error("Start pulse of {0} clocks is below the minimum")]
    TriggerTooShort(u32),
    /// The cycle ends before the last pixel has been shifted out.
    #[error("Cycle of {cycle} clocks cannot hold a readout of {required} clocks")]
    CycleTooShort { cycle: u32, required: u32 },
    /// The cycle is shorter than the sensor accepts.
    #[error("Cycle of {0} clocks is below the minimum")]
    CycleBelowMinimum(u32),
    /// The resulting clock frequency is out of range (in Hz).
    #[error("Clock frequency {0} Hz out of range")]
    ClockFrequency(u32),
    /// The pixel count is zero or exceeds the sensor.
    #[error("Invalid pixel count {0}")]
    PixelCount(u16),
    /// Two pin roles were assigned the same line.
    #[error("{0} and {1} share a line")]
    SharedLine(PinRole, PinRole),
}

/// Bounds on the foreground wait of a cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Clock periods tolerated past the configured cycle length.
    pub slack_clocks: u32,

    /// Consecutive polls without any timer tick, 0 to disable.
    pub stalled_polls: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            slack_clocks: WATCHDOG_SLACK_CLOCKS,
            stalled_polls: WATCHDOG_STALLED_POLLS,
        }
    }
}

/// Timing of one acquisition cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Timer ticks the clock line is held high. Need not equal `clock_low_ticks`.
    pub clock_high_ticks: u32,

    /// Timer ticks the clock line is held low.
    pub clock_low_ticks: u32,

    /// Clock periods the start pulse is held high. This sets the integration time.
    pub trigger_high_clocks: u32,

    /// Clock periods from the start pulse falling edge to the first valid pixel.
    pub pipeline_latency_clocks: u32,

    /// Pixels captured per cycle.
    pub pixel_count: u16,

    /// Total clock periods of the start pulse cycle (start pulse high plus low).
    pub start_pulse_cycle_clocks: u32,

    /// Tick rate of the timer in Hz.
    pub timer_frequency: u32,

    pub watchdog: WatchdogConfig,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let mut config = Self {
            clock_high_ticks: CLOCK_HIGH_TICKS,
            clock_low_ticks: CLOCK_LOW_TICKS,
            trigger_high_clocks: TRIGGER_HIGH_CLOCKS,
            pipeline_latency_clocks: PIPELINE_LATENCY_CLOCKS,
            pixel_count: PIXEL_COUNT as u16,
            start_pulse_cycle_clocks: 0,
            timer_frequency: TIMER_FREQUENCY.raw(),
            watchdog: WatchdogConfig::default(),
        };
        config.start_pulse_cycle_clocks = config.readout_end_clock();
        config
    }
}

impl TimingConfig {
    /// Clock count at which the first sample becomes ready.
    pub fn read_threshold_clock(&self) -> u32 {
        self.trigger_high_clocks + self.pipeline_latency_clocks
    }

    /// Clock count one past the last sample of the cycle.
    pub fn readout_end_clock(&self) -> u32 {
        self.read_threshold_clock() + self.pixel_count as u32
    }

    /// Effective integration time in clock periods.
    pub fn integration_clocks(&self) -> u32 {
        self.trigger_high_clocks + INTEGRATION_EXTRA_CLOCKS
    }

    /// Timer ticks per full clock period.
    pub fn clock_period_ticks(&self) -> u32 {
        self.clock_high_ticks.saturating_add(self.clock_low_ticks)
    }

    /// The clock frequency resulting from the tick counts, if any.
    pub fn clock_frequency(&self) -> Option<HertzU32> {
        if self.clock_high_ticks == 0 || self.clock_low_ticks == 0 {
            return None;
        }
        Some(HertzU32::from_raw(
            self.timer_frequency / self.clock_period_ticks(),
        ))
    }

    /// Check the configuration against the sensor limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let frequency = self
            .clock_frequency()
            .ok_or(ConfigError::ClockFrequency(0))?;
        if frequency < CLOCK_FREQUENCY_MIN || frequency > CLOCK_FREQUENCY_MAX {
            return Err(ConfigError::ClockFrequency(frequency.raw()));
        }

        if self.pixel_count == 0 || self.pixel_count as usize > PIXEL_COUNT {
            return Err(ConfigError::PixelCount(self.pixel_count));
        }

        if self.trigger_high_clocks >= self.start_pulse_cycle_clocks {
            return Err(ConfigError::TriggerExceedsCycle {
                high: self.trigger_high_clocks,
                cycle: self.start_pulse_cycle_clocks,
            });
        }

        if self.trigger_high_clocks < MIN_TRIGGER_HIGH_CLOCKS {
            return Err(ConfigError::TriggerTooShort(self.trigger_high_clocks));
        }

        if self.start_pulse_cycle_clocks < MIN_START_PULSE_CYCLE_CLOCKS {
            return Err(ConfigError::CycleBelowMinimum(
                self.start_pulse_cycle_clocks,
            ));
        }

        if self.start_pulse_cycle_clocks < self.readout_end_clock() {
            return Err(ConfigError::CycleTooShort {
                cycle: self.start_pulse_cycle_clocks,
                required: self.readout_end_clock(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TimingConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.read_threshold_clock(), 314);
        assert_eq!(config.start_pulse_cycle_clocks, 826);
        assert_eq!(config.integration_clocks(), 306);
        assert_eq!(config.clock_frequency(), Some(HertzU32::from_raw(133_333)));
    }

    #[test]
    fn threshold_follows_trigger() {
        for high in [8, 15, 100, 300, 1000] {
            let config = TimingConfig {
                trigger_high_clocks: high,
                ..Default::default()
            };
            assert_eq!(
                config.read_threshold_clock(),
                high + PIPELINE_LATENCY_CLOCKS
            );
        }
    }

    #[test]
    fn trigger_longer_than_cycle() {
        let config = TimingConfig {
            trigger_high_clocks: 826,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TriggerExceedsCycle {
                high: 826,
                cycle: 826
            })
        );
    }

    #[test]
    fn cycle_must_hold_readout() {
        let config = TimingConfig {
            trigger_high_clocks: 400,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::CycleTooShort {
                cycle: 826,
                required: 926
            })
        );

        let config = TimingConfig {
            trigger_high_clocks: 10,
            pixel_count: 16,
            start_pulse_cycle_clocks: 100,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::CycleBelowMinimum(100)));
    }

    #[test]
    fn short_trigger() {
        let config = TimingConfig {
            trigger_high_clocks: 7,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TriggerTooShort(7)));
    }

    #[test]
    fn clock_range() {
        // 16 MHz / 2 ticks = 8 MHz
        let fast = TimingConfig {
            clock_high_ticks: 1,
            clock_low_ticks: 1,
            ..Default::default()
        };
        assert_eq!(fast.validate(), Err(ConfigError::ClockFrequency(8_000_000)));

        // 16 MHz / 400 ticks = 40 kHz
        let slow = TimingConfig {
            clock_high_ticks: 200,
            clock_low_ticks: 200,
            ..Default::default()
        };
        assert_eq!(slow.validate(), Err(ConfigError::ClockFrequency(40_000)));

        let zero = TimingConfig {
            clock_low_ticks: 0,
            ..Default::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::ClockFrequency(0)));
    }

    #[test]
    fn pixel_count_limits() {
        for count in [0, PIXEL_COUNT as u16 + 1] {
            let config = TimingConfig {
                pixel_count: count,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::PixelCount(count)));
        }
    }

    #[test]
    fn partial_json() {
        let (config, _) = serde_json_core::from_str::<TimingConfig>(
            r#"{"trigger_high_clocks":100,"watchdog":{"slack_clocks":4}}"#,
        )
        .unwrap();
        assert_eq!(config.trigger_high_clocks, 100);
        assert_eq!(config.watchdog.slack_clocks, 4);
        assert_eq!(config.watchdog.stalled_polls, WATCHDOG_STALLED_POLLS);
        assert_eq!(config.clock_high_ticks, CLOCK_HIGH_TICKS);
        assert_eq!(config.validate(), Ok(()));
    }
}
