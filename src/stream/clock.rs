use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of monotonic time and blocking sleeps
///
/// Every wait in a session (drop stalls, jitter, camera pacing) goes through
/// this trait so tests can run a whole session without real delays.
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`]
#[derive(Debug, Clone, Copy)]
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

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Simulated clock: sleeping advances time instantly and is recorded
///
/// Clones share the same timeline, so a test can keep one handle and hand
/// another to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Rc<RefCell<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.state.borrow_mut().now += duration;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.borrow().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.state.borrow().sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.borrow().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.borrow_mut();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_records_sleeps() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        clock.sleep(Duration::from_millis(100));
        clock.advance(Duration::from_millis(5));
        clock.sleep(Duration::from_millis(20));

        assert_eq!(handle.now(), Duration::from_millis(125));
        assert_eq!(
            handle.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(20)]
        );
        assert_eq!(handle.total_slept(), Duration::from_millis(120));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() >= first + Duration::from_millis(2));
    }
}
