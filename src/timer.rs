//! Timer tick source
//!
//! # Design
//! The waveform is generated by a single compare-match interrupt. Every firing reprograms the
//! compare interval for the following half clock period, so the high and low halves of the clock
//! can have different lengths. The counter is zeroed whenever an interval is programmed so that
//! interrupt latency does not accumulate over a cycle.

/// A hardware timer providing a compare-match interrupt after a programmable number of ticks.
///
/// The interrupt handler of the timer must call [crate::on_timer_interrupt].
pub trait TickSource {
    /// Zero the counter, program `interval` ticks and enable the interrupt.
    fn arm(&mut self, interval: u32);

    /// Zero the counter and program `interval` ticks for the next firing.
    ///
    /// # Note
    /// Called from within the interrupt handler.
    fn rearm(&mut self, interval: u32);

    /// Disable the interrupt. Must be idempotent.
    fn disarm(&mut self);

    /// Whether another compare match is already pending, i.e. the handler did not finish within
    /// one interval.
    fn overrun(&mut self) -> bool;
}

/// Ownership wrapper enforcing a single pending callback.
pub(crate) struct Ticker<T> {
    timer: T,
    armed: bool,
}

impl<T: TickSource> Ticker<T> {
    pub fn new(mut timer: T) -> Self {
        timer.disarm();
        Self {
            timer,
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Start ticking. Arming an armed ticker is a logic error: it panics in debug builds and is
    /// ignored otherwise.
    pub fn arm(&mut self, interval: u32) {
        if self.armed {
            debug_assert!(false, "Tick source armed twice");
            return;
        }
        self.armed = true;
        self.timer.arm(interval);
    }

    pub fn rearm(&mut self, interval: u32) {
        if self.armed {
            self.timer.rearm(interval);
        }
    }

    pub fn disarm(&mut self) {
        self.timer.disarm();
        self.armed = false;
    }

    pub fn overrun(&mut self) -> bool {
        self.timer.overrun()
    }

    pub fn free(self) -> T {
        self.timer
    }
}
