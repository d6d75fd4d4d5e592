use std::time::{Duration, Instant};

/// A single-outstanding one-shot timer.
///
/// Scheduling always replaces the pending deadline, so a stale deadline can
/// never fire after the timer was re-armed.
#[derive(Debug, Clone, Default)]
pub struct OneShot {
    deadline: Option<Instant>,
}

impl OneShot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending deadline and arm a new one `after` from `now`
    pub fn schedule(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once when the deadline has passed, disarming the timer
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once() {
        let t0 = Instant::now();
        let mut timer = OneShot::new();
        timer.schedule(t0, Duration::from_millis(500));

        assert!(!timer.fire_if_due(t0 + Duration::from_millis(499)));
        assert!(timer.fire_if_due(t0 + Duration::from_millis(500)));
        assert!(!timer.fire_if_due(t0 + Duration::from_millis(600)));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let t0 = Instant::now();
        let mut timer = OneShot::new();
        timer.schedule(t0, Duration::from_millis(500));
        timer.schedule(t0 + Duration::from_millis(400), Duration::from_millis(500));

        // The first deadline is gone
        assert!(!timer.fire_if_due(t0 + Duration::from_millis(500)));
        assert!(timer.fire_if_due(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut timer = OneShot::new();
        timer.schedule(t0, Duration::from_millis(10));
        timer.cancel();
        assert!(!timer.fire_if_due(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_earliest() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(earliest([None, Some(t1), Some(t0)]), Some(t0));
        assert_eq!(earliest([None, None]), None);
    }
}
