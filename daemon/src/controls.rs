use std::time::{Duration, Instant};

use crate::timers::OneShot;

/// Auto-hiding control bar.
///
/// Starts visible with no pending hide. Every activity shows the bar and
/// re-arms the single hide timer; the bar hides once the timer fires.
#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    visible: bool,
    hide_after: Duration,
    hide_timer: OneShot,
}

impl ControlsVisibility {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            visible: true,
            hide_after,
            hide_timer: OneShot::new(),
        }
    }

    /// Record user activity. Returns true if the bar was hidden.
    pub fn activity(&mut self, now: Instant) -> bool {
        let was_hidden = !self.visible;
        self.visible = true;
        self.hide_timer.schedule(now, self.hide_after);
        was_hidden
    }

    /// Apply a due hide. Returns true on the Visible to Hidden transition.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.hide_timer.fire_if_due(now) && self.visible {
            self.visible = false;
            log::debug!("Controls hidden after {:?} idle", self.hide_after);
            return true;
        }
        false
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.hide_timer.deadline()
    }

    pub fn cancel(&mut self) {
        self.hide_timer.cancel();
    }
}
