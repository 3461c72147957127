//! Cancellable periodic tick timer.
//!
//! A running timer is never resized in place: changing the period means
//! cancelling the current handle and arming a new one. Every arm gets a fresh
//! generation, so a handle held from before a cancel can never fire again.

use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    generation: u64,
}

#[derive(Debug, Copy, Clone)]
struct Armed {
    handle: TimerHandle,
    interval: Duration,
    next: Instant,
}

#[derive(Debug, Default)]
pub struct TickTimer {
    generation: u64,
    armed: Option<Armed>,
}

impl TickTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a new periodic timer whose first tick is due one `interval` after
    /// `now`. Any previous timer is cancelled first.
    pub fn arm(&mut self, interval: Duration, now: Instant) -> TimerHandle {
        self.cancel();
        self.generation += 1;
        let handle = TimerHandle { generation: self.generation };
        self.armed = Some(Armed { handle, interval, next: now + interval });
        handle
    }

    pub fn cancel(&mut self) -> Option<TimerHandle> {
        self.armed.take().map(|armed| armed.handle)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn handle(&self) -> Option<TimerHandle> {
        self.armed.map(|armed| armed.handle)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.armed.map(|armed| armed.interval)
    }

    /// Time left until the next tick, zero when one is already due.
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.armed.map(|armed| armed.next.saturating_duration_since(now))
    }

    /// Returns the handle if a tick is due at `now`. At most one tick is
    /// delivered per call; ticks missed while the caller was late are dropped
    /// rather than replayed.
    pub fn poll(&mut self, now: Instant) -> Option<TimerHandle> {
        let armed = self.armed.as_mut()?;
        if now < armed.next {
            return None;
        }

        armed.next += armed.interval;
        if armed.next <= now {
            armed.next = now + armed.interval;
        }
        Some(armed.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_once_per_interval() {
        let start = Instant::now();
        let mut timer = TickTimer::new();
        let handle = timer.arm(100 * MS, start);

        assert_eq!(timer.poll(start + 99 * MS), None);
        assert_eq!(timer.poll(start + 100 * MS), Some(handle));
        assert_eq!(timer.poll(start + 150 * MS), None);
        assert_eq!(timer.poll(start + 200 * MS), Some(handle));
    }

    #[test]
    fn late_polls_do_not_replay() {
        let start = Instant::now();
        let mut timer = TickTimer::new();
        timer.arm(100 * MS, start);

        assert!(timer.poll(start + 550 * MS).is_some());
        assert_eq!(timer.poll(start + 600 * MS), None);
        assert!(timer.poll(start + 650 * MS).is_some());
    }

    #[test]
    fn rearm_invalidates_old_handle() {
        let start = Instant::now();
        let mut timer = TickTimer::new();
        let old = timer.arm(100 * MS, start);
        let new = timer.arm(50 * MS, start + 10 * MS);

        assert_ne!(old, new);
        assert_eq!(timer.handle(), Some(new));
        assert_eq!(timer.interval(), Some(50 * MS));
        assert_eq!(timer.poll(start + 60 * MS), Some(new));
    }

    #[test]
    fn cancelled_timer_is_silent() {
        let start = Instant::now();
        let mut timer = TickTimer::new();
        let handle = timer.arm(10 * MS, start);

        assert_eq!(timer.cancel(), Some(handle));
        assert!(!timer.is_armed());
        assert_eq!(timer.poll(start + Duration::from_secs(5)), None);
        assert_eq!(timer.until_next(start), None);
    }
}
