//! Rate limiting for resize-driven renders.
//!
//! The first event after a quiet period runs immediately. Events that follow
//! within `delay` collapse into a single trailing run, scheduled `delay` after
//! the latest of them.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run the action now.
    RunNow,
    /// A trailing run is pending at this deadline.
    Scheduled(Instant),
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    deadline: Instant,
    event_at: Instant,
}

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    last_run: Option<Instant>,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_run: None,
            pending: None,
        }
    }

    /// Register an event at `now`. Any previously scheduled trailing run is cancelled.
    pub fn call(&mut self, now: Instant) -> Decision {
        self.pending = None;

        let quiet = self
            .last_run
            .map_or(true, |last| now.saturating_duration_since(last) > self.delay);
        if quiet {
            self.last_run = Some(now);
            return Decision::RunNow;
        }

        let deadline = now + self.delay;
        self.pending = Some(Pending {
            deadline,
            event_at: now,
        });
        Decision::Scheduled(deadline)
    }

    /// Deadline of the pending trailing run, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Consume the trailing run if its deadline has passed.
    ///
    /// The run is credited to the event that scheduled it.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending = None;
                self.last_run = Some(pending.event_at);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_event_runs_immediately() {
        let mut debouncer = Debouncer::new(DELAY);
        assert_eq!(debouncer.call(Instant::now()), Decision::RunNow);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_burst_collapses_into_one_trailing_run() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        assert_eq!(debouncer.call(start), Decision::RunNow);
        for i in 1..=9 {
            let at = start + ms(i * 20);
            assert_eq!(debouncer.call(at), Decision::Scheduled(at + DELAY));
        }

        // Only the latest event's deadline survives.
        let last = start + ms(180);
        assert_eq!(debouncer.deadline(), Some(last + DELAY));
        assert!(!debouncer.fire_due(last + ms(499)));
        assert!(debouncer.fire_due(last + DELAY));
        assert!(!debouncer.fire_due(last + ms(2000)));
    }

    #[test]
    fn test_event_after_quiet_period_runs_immediately() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        assert_eq!(debouncer.call(start), Decision::RunNow);
        assert_eq!(debouncer.call(start + ms(501)), Decision::RunNow);
    }

    #[test]
    fn test_exactly_delay_apart_is_not_quiet() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.call(start);
        assert!(matches!(
            debouncer.call(start + DELAY),
            Decision::Scheduled(_)
        ));
    }

    #[test]
    fn test_immediate_run_cancels_pending() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.call(start);
        debouncer.call(start + ms(100));
        assert!(debouncer.deadline().is_some());

        // Quiet relative to last_run even though a trailing run was pending.
        assert_eq!(debouncer.call(start + ms(550)), Decision::RunNow);
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_trailing_run_credits_scheduling_event() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.call(start);
        debouncer.call(start + ms(100));
        assert!(debouncer.fire_due(start + ms(600)));

        // 1ms after the trailing run but 501ms after the event it was credited to.
        assert_eq!(debouncer.call(start + ms(601)), Decision::RunNow);
    }

    #[test]
    fn test_continuous_events_run_at_most_once_per_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        let mut runs = Vec::new();

        // One event every 50ms for 3 seconds.
        for i in 0..60 {
            let at = start + ms(i * 50);
            if debouncer.fire_due(at) {
                runs.push(at);
            }
            if debouncer.call(at) == Decision::RunNow {
                runs.push(at);
            }
        }
        let end = start + ms(60 * 50);
        if let Some(deadline) = debouncer.deadline() {
            assert!(debouncer.fire_due(deadline.max(end)));
            runs.push(deadline);
        }

        assert!(runs.len() >= 2);
        for pair in runs.windows(2) {
            assert!(pair[1] - pair[0] > DELAY, "runs too close: {:?}", pair);
        }
    }
}
