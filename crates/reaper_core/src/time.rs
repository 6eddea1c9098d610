//! Time sources and deferred work
//!
//! Everything in the lifecycle subsystem reads time through a [`Clock`] so
//! tests can drive a [`ManualClock`] and advance virtual time deterministically.
//! Deferred work (escalation restores, periodic sampling) lives in a
//! [`Timers`] queue that is polled by its owner; nothing fires on its own.

use std::cell::Cell;
use std::collections::{BTreeMap, BinaryHeap};
use std::cmp::Reverse;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Monotonic time since an arbitrary, per-clock epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Shared clock handle handed to every component.
pub type SharedClock = Rc<dyn Clock>;

/// Wall clock backed by [`Instant`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock. Clones share the same reading.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Moves the clock to `at`. Going backwards is ignored.
    pub fn set(&self, at: Duration) {
        if at > self.now.get() {
            self.now.set(at);
        }
    }

    pub fn shared(&self) -> SharedClock {
        Rc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Cancellable handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Deterministic timer queue.
///
/// Due timers are drained in due order; timers due at the same instant fire
/// in the order they were scheduled.
pub struct Timers<T> {
    next_id: u64,
    queue: BinaryHeap<Reverse<(Duration, u64)>>,
    pending: BTreeMap<u64, (Duration, T)>,
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            queue: BinaryHeap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, due: Duration, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Reverse((due, id)));
        self.pending.insert(id, (due, payload));
        TimerHandle(id)
    }

    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        // The heap entry is left behind and skipped when it surfaces.
        self.pending.remove(&handle.0).is_some()
    }

    /// Cancels the timer and hands back its payload.
    pub fn take(&mut self, handle: TimerHandle) -> Option<T> {
        self.pending.remove(&handle.0).map(|(_, payload)| payload)
    }

    pub fn due_at(&self, handle: TimerHandle) -> Option<Duration> {
        self.pending.get(&handle.0).map(|(due, _)| *due)
    }

    pub fn get(&self, handle: TimerHandle) -> Option<&T> {
        self.pending.get(&handle.0).map(|(_, payload)| payload)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.values().map(|(due, _)| *due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every timer due at or before `now`.
    pub fn drain_due(&mut self, now: Duration) -> Vec<(TimerHandle, T)> {
        let mut fired = Vec::new();
        while let Some(Reverse((due, id))) = self.queue.peek().copied() {
            if due > now {
                break;
            }
            self.queue.pop();
            if let Some((_, payload)) = self.pending.remove(&id) {
                fired.push((TimerHandle(id), payload));
            }
        }
        fired
    }

    /// Removes every pending timer regardless of due time, in due order.
    pub fn drain_all(&mut self) -> Vec<(TimerHandle, T)> {
        let mut fired = Vec::new();
        while let Some(Reverse((_, id))) = self.queue.pop() {
            if let Some((_, payload)) = self.pending.remove(&id) {
                fired.push((TimerHandle(id), payload));
            }
        }
        fired
    }
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let shared = clock.shared();
        clock.advance(ms(250));
        assert_eq!(shared.now(), ms(250));

        clock.set(ms(100));
        assert_eq!(shared.now(), ms(250));
    }

    #[test]
    fn timers_fire_in_due_then_schedule_order() {
        let mut timers = Timers::new();
        timers.schedule(ms(30), "late");
        timers.schedule(ms(10), "first");
        timers.schedule(ms(10), "second");

        assert!(timers.drain_due(ms(5)).is_empty());

        let fired: Vec<_> = timers.drain_due(ms(10)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["first", "second"]);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_due(), Some(ms(30)));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut timers = Timers::new();
        let handle = timers.schedule(ms(10), 1);
        timers.schedule(ms(20), 2);

        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert_eq!(timers.due_at(handle), None);

        let fired: Vec<_> = timers.drain_due(ms(100)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec![2]);
        assert!(timers.is_empty());
    }
}
