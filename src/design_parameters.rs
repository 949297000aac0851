//! S9227 datasheet timing figures and the reference board defaults.
//!
//! See the Hamamatsu S9227 series datasheet (KMPD1122E), "Timing chart" and "Electrical
//! characteristics". The clock is specified falling edge to falling edge.
use fugit::HertzU32;

/// Number of photodiodes read out per scan. One pixel is shifted out per clock period.
pub const PIXEL_COUNT: usize = 512;

/// Clock periods between the falling edge of the start pulse and the first valid video sample.
pub const PIPELINE_LATENCY_CLOCKS: u32 = 14;

/// Extra clock periods of integration beyond the start pulse high time.
///
/// The integration time equals the ST high period plus this many clock cycles.
pub const INTEGRATION_EXTRA_CLOCKS: u32 = 6;

/// Lowest permitted clock frequency.
pub const CLOCK_FREQUENCY_MIN: HertzU32 = HertzU32::kHz(50);

/// Highest permitted clock frequency.
pub const CLOCK_FREQUENCY_MAX: HertzU32 = HertzU32::MHz(5);

/// Minimum start pulse high time in clock periods.
pub const MIN_TRIGGER_HIGH_CLOCKS: u32 = 8;

/// Minimum start pulse cycle (ST high + ST low) in clock periods.
pub const MIN_START_PULSE_CYCLE_CLOCKS: u32 = 530;

// The reference board runs the tick timer unprescaled from a 16 MHz core clock, 62.5 ns per tick.
pub const TIMER_FREQUENCY: HertzU32 = HertzU32::MHz(16);

// 70 + 50 ticks = 7.5 us per clock period, ~133 kHz. The high half is stretched to compensate the
// interrupt entry latency preceding the falling edge.
pub const CLOCK_HIGH_TICKS: u32 = 70;
pub const CLOCK_LOW_TICKS: u32 = 50;

/// Default start pulse high time in clock periods.
pub const TRIGGER_HIGH_CLOCKS: u32 = 300;

/// Clock periods past the expected end of a cycle before the watchdog gives up.
pub const WATCHDOG_SLACK_CLOCKS: u32 = 16;

/// Consecutive polls without a single timer tick before the watchdog gives up.
pub const WATCHDOG_STALLED_POLLS: u32 = 1_000_000;
