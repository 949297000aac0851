use embedded_hal_1::digital;

use crate::config::ConfigError;

/// Reasons an acquisition cycle did not produce a valid scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The cycle was refused before any line or the timer was touched.
    #[error("Configuration: {0}")]
    Configuration(#[from] ConfigError),
    /// The timer interrupt or the reader fell behind. The scan is invalid.
    #[error("Timing overrun: {missed_samples} missed samples, {late_ticks} late ticks")]
    TimingOverrun { missed_samples: u32, late_ticks: u32 },
    /// The scan did not complete within the watchdog bounds.
    #[error("Timeout after {clocks} clocks")]
    Timeout { clocks: u32 },
    /// A sample was pushed into a full buffer.
    #[error("Buffer capacity exceeded")]
    CapacityExceeded,
    /// The cycle was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,
    /// A cycle is already running on the sequencer.
    #[error("Busy")]
    Busy,
    /// Driving the clock or start pulse line failed.
    #[error("Pin: {0:?}")]
    Pin(digital::ErrorKind),
    /// The video conversion failed.
    #[error("ADC")]
    Adc,
}

impl Error {
    /// Whether running another cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TimingOverrun { .. }
                | Self::Timeout { .. }
                | Self::Cancelled
                | Self::Busy
                | Self::Adc
        )
    }
}
