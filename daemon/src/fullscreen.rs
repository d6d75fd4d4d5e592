use anyhow::Result;
use common::FullscreenRequest;

/// The environment hosting the player container.
///
/// Requests are fire-and-forget; the outcome arrives later as an environment
/// notification, routed to [`FullscreenController::environment_changed`].
pub trait FullscreenSurface: Send {
    fn request(&mut self, request: FullscreenRequest) -> Result<()>;
}

/// Surface driven by a remote front end.
///
/// Requests are only logged here; the front end reads the pending request
/// from the status snapshot and confirms with a `FullscreenChanged` input.
#[derive(Debug, Default)]
pub struct RemoteSurface;

impl FullscreenSurface for RemoteSurface {
    fn request(&mut self, request: FullscreenRequest) -> Result<()> {
        log::info!("Fullscreen {:?} requested from front end", request);
        Ok(())
    }
}

/// Mirrors the environment's fullscreen flag and issues enter/exit requests
pub struct FullscreenController {
    surface: Box<dyn FullscreenSurface>,
    /// Last state confirmed by the environment
    active: bool,
    /// Request issued but not confirmed yet
    pending: Option<FullscreenRequest>,
}

impl FullscreenController {
    pub fn new(surface: Box<dyn FullscreenSurface>) -> Self {
        Self {
            surface,
            active: false,
            pending: None,
        }
    }

    /// Enter fullscreen if nothing is fullscreen, otherwise exit.
    ///
    /// The flag itself does not change until the environment confirms.
    pub fn toggle(&mut self) -> Result<FullscreenRequest> {
        let request = if self.active {
            FullscreenRequest::Exit
        } else {
            FullscreenRequest::Enter
        };
        self.surface.request(request)?;
        self.pending = Some(request);
        Ok(request)
    }

    /// Environment notification, whatever caused the change
    pub fn environment_changed(&mut self, active: bool) {
        if self.active != active {
            log::info!(
                "Fullscreen {}",
                if active { "entered" } else { "exited" }
            );
        }
        self.active = active;
        self.pending = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending(&self) -> Option<FullscreenRequest> {
        self.pending
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Surface that records every request
    #[derive(Clone, Default)]
    pub struct RecordingSurface {
        pub requests: Arc<Mutex<Vec<FullscreenRequest>>>,
    }

    impl RecordingSurface {
        pub fn requests(&self) -> Vec<FullscreenRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl FullscreenSurface for RecordingSurface {
        fn request(&mut self, request: FullscreenRequest) -> Result<()> {
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;

    #[test]
    fn test_toggle_waits_for_confirmation() {
        let surface = RecordingSurface::default();
        let mut fullscreen = FullscreenController::new(Box::new(surface.clone()));

        assert_eq!(fullscreen.toggle().unwrap(), FullscreenRequest::Enter);
        assert!(!fullscreen.is_active());
        assert_eq!(fullscreen.pending(), Some(FullscreenRequest::Enter));

        fullscreen.environment_changed(true);
        assert!(fullscreen.is_active());
        assert_eq!(fullscreen.pending(), None);

        assert_eq!(fullscreen.toggle().unwrap(), FullscreenRequest::Exit);
        assert_eq!(
            surface.requests(),
            vec![FullscreenRequest::Enter, FullscreenRequest::Exit]
        );
    }

    #[test]
    fn test_external_exit_updates_flag() {
        let mut fullscreen = FullscreenController::new(Box::new(RecordingSurface::default()));
        fullscreen.toggle().unwrap();
        fullscreen.environment_changed(true);

        // Escape pressed outside the player
        fullscreen.environment_changed(false);
        assert!(!fullscreen.is_active());

        // The next toggle enters again
        assert_eq!(fullscreen.toggle().unwrap(), FullscreenRequest::Enter);
    }
}
