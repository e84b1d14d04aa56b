//! Re-solve scheduling with debouncing and re-entrancy control.

use std::time::{Duration, Instant};

/// Outcome of an update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Enough time has passed; solve immediately.
    SolveNow,
    /// Too soon after the last solve; a deferred solve was scheduled this
    /// far in the future.
    Deferred(Duration),
    /// A deferred solve is already scheduled; the request is dropped.
    AlreadyPending,
    /// A solve is in progress on this thread; the request is dropped.
    Reentrant,
}

/// Coalesces bursts of mutations into at most one solve per minimum
/// interval and guards against reentrant solves.
///
/// The scheduler is a pure state machine over caller-supplied instants, so
/// its behavior is deterministic under test. Deferred work is executed by
/// the simulator's `poll` from the host event loop; there is no timer
/// thread.
#[derive(Debug)]
pub struct UpdateScheduler {
    min_interval: Duration,
    last_solve: Option<Instant>,
    pending_until: Option<Instant>,
    in_progress: bool,
}

impl UpdateScheduler {
    /// Create a scheduler with the given minimum interval between solves.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_solve: None,
            pending_until: None,
            in_progress: false,
        }
    }

    /// Minimum interval between completed solves.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Change the minimum interval.
    pub fn set_min_interval(&mut self, min_interval: Duration) {
        self.min_interval = min_interval;
    }

    /// Request an update at time `now`.
    pub fn request(&mut self, now: Instant) -> Decision {
        if self.in_progress {
            return Decision::Reentrant;
        }
        if self.pending_until.is_some() {
            return Decision::AlreadyPending;
        }
        match self.last_solve {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.min_interval {
                    Decision::SolveNow
                } else {
                    let delay = self.min_interval - elapsed;
                    self.pending_until = Some(now + delay);
                    Decision::Deferred(delay)
                }
            }
            None => Decision::SolveNow,
        }
    }

    /// Whether a deferred solve has come due.
    pub fn due(&self, now: Instant) -> bool {
        !self.in_progress && self.pending_until.is_some_and(|t| t <= now)
    }

    /// Whether a deferred solve is scheduled.
    pub fn pending(&self) -> bool {
        self.pending_until.is_some()
    }

    /// Drop any scheduled deferred solve.
    pub fn cancel_pending(&mut self) {
        self.pending_until = None;
    }

    /// Mark a solve as started; clears the pending slot.
    pub fn begin_solve(&mut self) {
        self.in_progress = true;
        self.pending_until = None;
    }

    /// Mark the solve as completed at time `now`.
    pub fn finish_solve(&mut self, now: Instant) {
        self.in_progress = false;
        self.last_solve = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(10);

    #[test]
    fn test_first_request_solves_now() {
        let mut sched = UpdateScheduler::new(INTERVAL);
        assert_eq!(sched.request(Instant::now()), Decision::SolveNow);
    }

    #[test]
    fn test_reentrant_request_dropped() {
        let mut sched = UpdateScheduler::new(INTERVAL);
        let t0 = Instant::now();
        assert_eq!(sched.request(t0), Decision::SolveNow);
        sched.begin_solve();
        assert_eq!(sched.request(t0), Decision::Reentrant);
        sched.finish_solve(t0);
    }

    #[test]
    fn test_burst_coalesces_to_one_deferred_solve() {
        // Fifty mutations within 5 ms of a completed solve must produce a
        // single deferred solve at the interval boundary.
        let mut sched = UpdateScheduler::new(INTERVAL);
        let t0 = Instant::now();
        sched.begin_solve();
        sched.finish_solve(t0);

        let mut deferred = 0;
        let mut dropped = 0;
        for i in 0..50 {
            let t = t0 + Duration::from_micros(100 * i);
            match sched.request(t) {
                Decision::Deferred(_) => deferred += 1,
                Decision::AlreadyPending => dropped += 1,
                other => panic!("unexpected decision {other:?}"),
            }
        }
        assert_eq!(deferred, 1);
        assert_eq!(dropped, 49);

        // Not due before the boundary, due at it.
        assert!(!sched.due(t0 + Duration::from_millis(9)));
        assert!(sched.due(t0 + INTERVAL));
    }

    #[test]
    fn test_deferred_delay_is_remaining_interval() {
        let mut sched = UpdateScheduler::new(INTERVAL);
        let t0 = Instant::now();
        sched.begin_solve();
        sched.finish_solve(t0);

        let t = t0 + Duration::from_millis(4);
        match sched.request(t) {
            Decision::Deferred(delay) => assert_eq!(delay, Duration::from_millis(6)),
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn test_solve_now_after_interval() {
        let mut sched = UpdateScheduler::new(INTERVAL);
        let t0 = Instant::now();
        sched.begin_solve();
        sched.finish_solve(t0);

        assert_eq!(sched.request(t0 + INTERVAL), Decision::SolveNow);
    }

    #[test]
    fn test_begin_solve_clears_pending() {
        let mut sched = UpdateScheduler::new(INTERVAL);
        let t0 = Instant::now();
        sched.begin_solve();
        sched.finish_solve(t0);

        sched.request(t0 + Duration::from_millis(1));
        assert!(sched.pending());

        sched.begin_solve();
        assert!(!sched.pending());
        sched.finish_solve(t0 + INTERVAL);
    }
}
