//! Reaper Metrics - Bookkeeping primitives for the lifecycle subsystem
//!
//! `RingBuffer` and `Counter` are always available: the resource counter and
//! the diagnostics recorder are built on them. Span timing is instrumentation
//! and completely vanishes in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable span timing (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use reaper_metrics::SpanTimer;
//!
//! let mut spans = SpanTimer::new(60); // Track last 60 samples per span
//! spans.time("eviction_pass", || {
//!     // ... do work ...
//! });
//! println!("pass: {:?}", spans.average("eviction_pass"));
//! ```

mod counter;
mod ring_buffer;
#[cfg(feature = "metrics")]
mod span_timer;

pub use counter::{Counter, Decrement};
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use span_timer::SpanTimer;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct SpanTimer;

#[cfg(not(feature = "metrics"))]
impl SpanTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn time<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn average(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn max(&self, _name: &str) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, std::time::Duration)> + '_ {
        std::iter::empty()
    }
}

#[cfg(not(feature = "metrics"))]
impl Default for SpanTimer {
    fn default() -> Self { Self }
}
