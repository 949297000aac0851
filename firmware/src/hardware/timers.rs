///! The tick timer generates the sensor clock and start pulse from its update interrupt.
use super::hal;
use s9227::TickSource;

/// TIM2 counting up at the configured tick rate. The update interrupt fires every programmed
/// interval.
pub struct TickTimer {
    timer: hal::timer::Timer<hal::stm32::TIM2>,
}

impl TickTimer {
    /// Construct the tick timer. The timer must already count at the tick rate.
    pub fn new(mut timer: hal::timer::Timer<hal::stm32::TIM2>) -> Self {
        timer.pause();
        Self { timer }
    }

    fn set_period_ticks(&mut self, interval: u32) {
        // Note(unsafe): ARR is only written while we own the timer.
        let regs = unsafe { &*hal::stm32::TIM2::ptr() };
        regs.arr.write(|w| w.arr().bits(interval.saturating_sub(1)));
    }
}

/// Clear the update flag. Must be called on entry of the TIM2 handler.
#[inline(always)]
pub fn acknowledge() {
    // Note(unsafe): Only the update flag is cleared.
    let regs = unsafe { &*hal::stm32::TIM2::ptr() };
    regs.sr.modify(|_, w| w.uif().clear_bit());
}

impl TickSource for TickTimer {
    fn arm(&mut self, interval: u32) {
        self.timer.pause();
        self.set_period_ticks(interval);

        // Load the prescaler. This raises the update flag, which is cleared below.
        self.timer.apply_freq();
        self.timer.reset_counter();
        self.timer.clear_irq();

        self.timer.listen(hal::timer::Event::TimeOut);
        self.timer.resume();
    }

    fn rearm(&mut self, interval: u32) {
        // The counter wrapped to zero on the update event.
        self.set_period_ticks(interval);
    }

    fn disarm(&mut self) {
        self.timer.pause();
        self.timer.unlisten(hal::timer::Event::TimeOut);
        self.timer.clear_irq();
    }

    fn overrun(&mut self) -> bool {
        // The late update stays pending and is handled as the next tick.
        let regs = unsafe { &*hal::stm32::TIM2::ptr() };
        regs.sr.read().uif().bit_is_set()
    }
}
