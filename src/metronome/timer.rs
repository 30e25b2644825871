//! Coarse, cancellable timer deadlines.
//!
//! The event loop has no real timer callbacks: it wakes up at least every
//! few milliseconds and asks each timer whether it has fired. A timer is
//! either one-shot or repeating; cancelling it clears the deadline at once,
//! so a firing that was already due never happens.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Once,
    Every(Duration),
}

/// A timer deadline checked by polling.
#[derive(Debug, Clone)]
pub struct CoarseTimer {
    deadline: Option<Instant>,
    mode: Mode,
}

impl Default for CoarseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CoarseTimer {
    /// Creates a disarmed timer.
    pub fn new() -> Self {
        Self {
            deadline: None,
            mode: Mode::Once,
        }
    }

    /// Arms a one-shot firing `delay` after `now`.
    pub fn arm_once(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
        self.mode = Mode::Once;
    }

    /// Arms a repeating timer whose first firing is `period` after `now`.
    pub fn arm_repeating(&mut self, now: Instant, period: Duration) {
        self.deadline = Some(now + period);
        self.mode = Mode::Every(period);
    }

    /// Disarms the timer.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns true if a firing is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consumes one firing if the deadline has passed.
    ///
    /// A repeating timer moves its deadline forward by one period from the
    /// previous deadline (not from `now`), like a browser interval. Each call
    /// consumes at most one firing.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = match self.mode {
                    Mode::Once => None,
                    Mode::Every(period) => Some(deadline + period),
                };
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_fires_once() {
        let t0 = Instant::now();
        let mut timer = CoarseTimer::new();
        assert!(!timer.fire(t0));

        timer.arm_once(t0, Duration::from_millis(25));
        assert!(!timer.fire(t0 + Duration::from_millis(24)));
        assert!(timer.fire(t0 + Duration::from_millis(25)));
        assert!(!timer.is_armed());
        assert!(!timer.fire(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_repeating_keeps_its_grid() {
        let t0 = Instant::now();
        let period = Duration::from_millis(500);
        let mut timer = CoarseTimer::new();
        timer.arm_repeating(t0, period);

        // Woken late: the next deadline is still one period after the last one
        assert!(timer.fire(t0 + Duration::from_millis(530)));
        assert_eq!(timer.deadline(), Some(t0 + period * 2));
        assert!(!timer.fire(t0 + Duration::from_millis(990)));
        assert!(timer.fire(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_cancel_suppresses_due_firing() {
        let t0 = Instant::now();
        let mut timer = CoarseTimer::new();
        timer.arm_repeating(t0, Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.fire(t0 + Duration::from_secs(1)));
        assert_eq!(timer.deadline(), None);
    }
}
