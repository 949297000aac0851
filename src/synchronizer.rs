//! Sample synchronization between the timer interrupt and the reader
//!
//! A sample becomes ready at the end of each clock period once the period count reaches the read
//! threshold. The ready flag is edge-armed: it stays set until the reader takes it. If it is still
//! set when the next period completes, the reader has missed a pixel and every following sample
//! would be shifted by one, so the miss is counted instead of silently merged. This holds for the
//! last sample too: periods after the final issue still count a miss until that sample is taken.

#[derive(Clone, Debug)]
pub struct SampleSynchronizer {
    threshold: u32,
    samples: u32,
    remaining: u32,
    ready: bool,
    missed: u32,
}

impl SampleSynchronizer {
    /// # Args
    /// * `threshold` - Clock count of the first valid pixel.
    /// * `samples` - Number of samples to issue in this cycle.
    pub fn new(threshold: u32, samples: u32) -> Self {
        Self {
            threshold,
            samples,
            remaining: samples,
            ready: false,
            missed: 0,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Update at the end of a clock period.
    pub fn on_period(&mut self, clock_count: u32) {
        if clock_count < self.threshold {
            return;
        }
        if self.ready {
            self.missed = self.missed.saturating_add(1);
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            self.ready = true;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Consume the ready condition.
    pub fn take(&mut self) -> bool {
        core::mem::take(&mut self.ready)
    }

    /// Samples the reader failed to consume in time.
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Samples issued so far, consumed or missed.
    pub fn issued(&self) -> u32 {
        self.samples - self.remaining
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn waits_for_threshold() {
        let mut sync = SampleSynchronizer::new(314, 512);
        for clock in 1..314 {
            sync.on_period(clock);
            assert!(!sync.is_ready());
        }
        sync.on_period(314);
        assert!(sync.is_ready());
        assert!(sync.take());
        assert!(!sync.take());
    }

    #[test]
    fn one_sample_per_period() {
        let mut sync = SampleSynchronizer::new(4, 8);
        let mut taken = 0;
        for clock in 1..100 {
            sync.on_period(clock);
            if sync.take() {
                taken += 1;
            }
        }
        assert_eq!(taken, 8);
        assert_eq!(sync.issued(), 8);
        assert_eq!(sync.missed(), 0);
    }

    #[test]
    fn counts_missed() {
        let mut sync = SampleSynchronizer::new(2, 8);
        sync.on_period(2);
        sync.on_period(3);
        assert!(sync.is_ready());
        assert_eq!(sync.missed(), 1);
        assert!(sync.take());
        sync.on_period(4);
        assert_eq!(sync.missed(), 1);
    }

    #[test]
    fn late_last_sample_is_missed() {
        let mut sync = SampleSynchronizer::new(2, 2);
        sync.on_period(2);
        assert!(sync.take());
        sync.on_period(3);
        assert_eq!(sync.issued(), 2);
        sync.on_period(4);
        assert_eq!(sync.missed(), 1);
        assert!(sync.take());
        sync.on_period(5);
        sync.on_period(6);
        assert_eq!(sync.missed(), 1);
        assert!(!sync.is_ready());
    }
}
