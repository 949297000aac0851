//! Scan buffer
use core::fmt::Write as _;

use crate::design_parameters::PIXEL_COUNT;
use crate::Error;

/// A raw video ADC code.
pub type Sample = u16;

/// The samples of one scan in capture order, which is the physical pixel order of the sensor.
#[derive(Clone, Debug)]
pub struct AcquisitionBuffer {
    samples: heapless::Vec<Sample, PIXEL_COUNT>,
    capacity: usize,
}

impl Default for AcquisitionBuffer {
    fn default() -> Self {
        Self::new(PIXEL_COUNT)
    }
}

impl AcquisitionBuffer {
    /// Construct an empty buffer holding `capacity` samples, at most [PIXEL_COUNT].
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: heapless::Vec::new(),
            capacity: capacity.min(PIXEL_COUNT),
        }
    }

    /// Rewind the write cursor.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Change the capacity. This also rewinds the write cursor.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity.min(PIXEL_COUNT);
        self.reset();
    }

    /// Append a sample at the cursor.
    pub fn push(&mut self, sample: Sample) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::CapacityExceeded);
        }
        self.samples
            .push(sample)
            .map_err(|_| Error::CapacityExceeded)
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The write cursor.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Write the samples as comma separated decimals, terminated by `END` and a newline.
    pub fn dump<W: embedded_io::Write>(
        &self,
        sink: &mut W,
    ) -> Result<(), W::Error> {
        let mut text = heapless::String::<8>::new();
        for sample in self.samples.iter() {
            text.clear();
            // A u16 and separator always fit.
            write!(text, "{sample}, ").ok();
            sink.write_all(text.as_bytes())?;
        }
        sink.write_all(b"END\n")?;
        sink.flush()
    }
}

impl<'a> IntoIterator for &'a AcquisitionBuffer {
    type Item = &'a Sample;
    type IntoIter = core::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
