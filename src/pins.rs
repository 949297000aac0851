//! Sensor line assignment
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::config::ConfigError;

/// The role of a sensor line.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum PinRole {
    /// CLK, driven by the timer interrupt.
    ClockOutput,
    /// ST, the start pulse.
    TriggerOutput,
    /// Analog video output of the sensor.
    VideoInput,
    /// EOS, high for one clock after the last pixel.
    EndOfScanInput,
}

/// Line numbers of each [PinRole] on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAssignment {
    pub clock: u8,
    pub trigger: u8,
    pub video: u8,
    pub end_of_scan: u8,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            video: 0,
            end_of_scan: 2,
            trigger: 3,
            clock: 4,
        }
    }
}

impl PinAssignment {
    /// The line assigned to a role.
    pub fn line(&self, role: PinRole) -> u8 {
        match role {
            PinRole::ClockOutput => self.clock,
            PinRole::TriggerOutput => self.trigger,
            PinRole::VideoInput => self.video,
            PinRole::EndOfScanInput => self.end_of_scan,
        }
    }

    /// Check that every role owns its line exclusively.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, a) in PinRole::iter().enumerate() {
            if let Some(b) =
                PinRole::iter().skip(i + 1).find(|b| self.line(*b) == self.line(a))
            {
                return Err(ConfigError::SharedLine(a, b));
            }
        }
        Ok(())
    }
}
