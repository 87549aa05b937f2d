use std::time::{Duration, Instant};

/// An absolute point in time by which an answer must exist. All budgeting in
/// the engine passes these around instead of durations so that nested calls
/// cannot accidentally extend their parent's allowance.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self { at: Instant::now() + budget }
    }

    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// A deadline that grants `proportion` of the time still left on this
    /// one. `fraction(1.0)` is the deadline itself, `fraction(0.0)` is now.
    pub fn fraction(&self, proportion: f64) -> Deadline {
        assert!(
            (0.0..=1.0).contains(&proportion),
            "proportion must be in [0, 1], got {proportion}"
        );
        Deadline { at: self.at - self.remaining().mul_f64(1.0 - proportion) }
    }

    /// Splits the remaining time into consecutive slices sized by
    /// `proportions`, returned as the cumulative deadline of each slice.
    pub fn split(&self, proportions: &[f64]) -> Vec<Deadline> {
        let mut cumulated = 0.0;
        proportions
            .iter()
            .map(|p| {
                cumulated += p;
                self.fraction(cumulated.min(1.0))
            })
            .collect()
    }
}

/// Guard for loops whose iterations have roughly comparable cost. Refuses to
/// start another iteration once the remaining time drops below the longest
/// iteration seen so far, scaled by a tolerance.
pub struct TimeoutLoop {
    deadline: Deadline,
    tolerance: f64,
    longest: Duration,
}

impl TimeoutLoop {
    pub const DEFAULT_TOLERANCE: f64 = 1.2;

    pub fn new(deadline: Deadline) -> Self {
        Self::with_tolerance(deadline, Self::DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(deadline: Deadline, tolerance: f64) -> Self {
        Self { deadline, tolerance, longest: Duration::ZERO }
    }

    /// Runs one guarded iteration. Returns false, without running the body,
    /// when the next iteration would likely overshoot the deadline.
    pub fn run(&mut self, body: impl FnOnce()) -> bool {
        if self.deadline.remaining() <= self.longest.mul_f64(self.tolerance) {
            return false;
        }
        let start = Instant::now();
        body();
        self.longest = self.longest.max(start.elapsed());
        true
    }
}

#[cfg(test)]
mod deadline_tests {
    use super::*;

    #[test]
    fn fraction_shrinks_the_budget() {
        let deadline = Deadline::after(Duration::from_millis(400));
        let half = deadline.fraction(0.5);
        assert!(half.remaining() <= Duration::from_millis(200));
        assert!(half.remaining() > Duration::from_millis(100));
        assert!(deadline.fraction(0.0).has_passed());
    }

    #[test]
    fn split_deadlines_are_monotone() {
        let deadline = Deadline::after(Duration::from_millis(300));
        let slices = deadline.split(&[0.2, 0.3, 0.5]);
        assert_eq!(slices.len(), 3);
        assert!(slices[0].remaining() <= slices[1].remaining());
        assert!(slices[1].remaining() <= slices[2].remaining());
        assert!(slices[2].remaining() <= deadline.remaining() + Duration::from_millis(1));
    }

    #[test]
    fn exhausted_loop_refuses_to_run() {
        let mut guard = TimeoutLoop::new(Deadline::after(Duration::ZERO));
        let mut ran = false;
        assert!(!guard.run(|| ran = true));
        assert!(!ran);
    }

    #[test]
    fn slow_iterations_stop_the_loop() {
        let mut guard = TimeoutLoop::new(Deadline::after(Duration::from_millis(40)));
        let mut iterations = 0;
        loop {
            let ran = guard.run(|| {
                iterations += 1;
                std::thread::sleep(Duration::from_millis(30));
            });
            if !ran {
                break;
            }
            assert!(iterations < 10, "the guard never tripped");
        }
        // One 30 ms iteration fits a 40 ms budget; a second cannot.
        assert_eq!(iterations, 1);
    }
}
