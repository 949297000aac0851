//! Video ADC interface
//!
//! The sensor video output is sampled once per ready condition by the reader. Conversions must
//! complete well within half a clock period since they are performed with interrupts disabled.
use core::fmt::Debug;
use core::marker::PhantomData;

use embedded_hal_02::adc::{Channel, OneShot};

use crate::buffer::Sample;

/// A single-channel ADC wired to the sensor video output.
pub trait VideoAdc {
    type Error: Debug;

    /// Convert the current video level.
    fn sample(&mut self) -> Result<Sample, Self::Error>;
}

/// Adapter for an `embedded-hal` 0.2 one-shot ADC and its video input pin.
pub struct OneShotAdc<A, W, ADC, PIN> {
    adc: ADC,
    pin: PIN,
    _word: PhantomData<(A, W)>,
}

impl<A, W, ADC, PIN> OneShotAdc<A, W, ADC, PIN>
where
    PIN: Channel<A>,
    ADC: OneShot<A, W, PIN>,
{
    pub fn new(adc: ADC, pin: PIN) -> Self {
        Self {
            adc,
            pin,
            _word: PhantomData,
        }
    }

    pub fn free(self) -> (ADC, PIN) {
        (self.adc, self.pin)
    }
}

impl<A, W, ADC, PIN> VideoAdc for OneShotAdc<A, W, ADC, PIN>
where
    PIN: Channel<A>,
    ADC: OneShot<A, W, PIN>,
    ADC::Error: Debug,
    W: Into<u32>,
{
    type Error = ADC::Error;

    fn sample(&mut self) -> Result<Sample, Self::Error> {
        let word: u32 = nb::block!(self.adc.read(&mut self.pin))?.into();
        Ok(word.min(Sample::MAX as u32) as Sample)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Video;
    struct Adc {
        busy: u32,
        code: u32,
    }

    impl Channel<Adc> for Video {
        type ID = u8;
        fn channel() -> u8 {
            0
        }
    }

    impl OneShot<Adc, u32, Video> for Adc {
        type Error = ();
        fn read(&mut self, _pin: &mut Video) -> nb::Result<u32, ()> {
            if self.busy > 0 {
                self.busy -= 1;
                Err(nb::Error::WouldBlock)
            } else {
                Ok(self.code)
            }
        }
    }

    #[test]
    fn blocks_until_converted() {
        let mut adc: OneShotAdc<Adc, u32, _, _> =
            OneShotAdc::new(Adc { busy: 3, code: 617 }, Video);
        assert_eq!(adc.sample(), Ok(617));
        assert_eq!(adc.free().0.busy, 0);
    }

    #[test]
    fn saturates_wide_codes() {
        let mut adc: OneShotAdc<Adc, u32, _, _> = OneShotAdc::new(
            Adc {
                busy: 0,
                code: 1 << 20,
            },
            Video,
        );
        assert_eq!(adc.sample(), Ok(u16::MAX));
    }
}
