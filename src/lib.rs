//! Acquisition timing engine for Hamamatsu S9227 series linear image sensors
//!
//! # Design
//! The sensor is driven by two lines, CLK and ST (start pulse), and outputs one analog pixel per
//! clock period on its video line. A hardware timer interrupt generates both waveforms through
//! the [Sequencer]. Once the pipeline latency after the start pulse has elapsed, the interrupt
//! flags one sample per clock period. The foreground [Acquisition] spins on that flag, converts
//! the video level and fills an [AcquisitionBuffer] until the scan is complete.
//!
//! The hardware is abstracted behind `embedded-hal` output pins, a [TickSource] and a [VideoAdc],
//! so the whole engine runs against simulated hardware as well.
//!
//! ```text
//! timer IRQ -> on_timer_interrupt -> Sequencer (Waveform, SampleSynchronizer)
//!                                        |  critical section
//! run_cycle  -> Acquisition ------------+-> VideoAdc -> AcquisitionBuffer
//! ```
#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod adc;
pub mod buffer;
pub mod config;
pub mod design_parameters;
mod error;
pub mod pins;
pub mod sequencer;
pub mod synchronizer;
pub mod timer;
pub mod waveform;

pub use acquisition::{Acquisition, CyclePhase, CycleReport, Idle, Spin};
pub use adc::{OneShotAdc, VideoAdc};
pub use buffer::{AcquisitionBuffer, Sample};
pub use config::{ConfigError, TimingConfig, WatchdogConfig};
pub use error::Error;
pub use pins::{PinAssignment, PinRole};
pub use sequencer::{on_timer_interrupt, Sequencer, SharedSequencer, Status};
pub use timer::TickSource;
