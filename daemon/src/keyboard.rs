use common::Key;

/// Playback action a key press maps to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    TogglePlay,
    SeekBy(f64),
    /// Volume change relative to the current volume
    VolumeBy(f64),
    ToggleFullscreen,
}

/// Routes key presses to playback actions while the pointer is over the player.
///
/// The router only delivers while its session subscription is attached.
#[derive(Debug, Clone)]
pub struct KeyboardRouter {
    attached: bool,
    pointer_over: bool,
    seek_step: f64,
    volume_step: f64,
}

impl KeyboardRouter {
    pub fn new(seek_step: f64, volume_step: f64) -> Self {
        Self {
            attached: false,
            pointer_over: false,
            seek_step,
            volume_step,
        }
    }

    /// Subscribe for the lifetime of a session
    pub fn attach(&mut self) {
        self.attached = true;
        log::debug!("Keyboard routing attached");
    }

    /// Unsubscribe; also drops the focus gate
    pub fn detach(&mut self) {
        self.attached = false;
        self.pointer_over = false;
        log::debug!("Keyboard routing detached");
    }

    pub fn set_pointer_over(&mut self, over: bool) {
        self.pointer_over = over;
    }

    pub fn pointer_over(&self) -> bool {
        self.pointer_over
    }

    /// Map a key to an action, if the gate is open and the key is bound
    pub fn dispatch(&self, key: Key) -> Option<KeyAction> {
        if !self.attached || !self.pointer_over {
            return None;
        }

        match key {
            Key::Space => Some(KeyAction::TogglePlay),
            Key::ArrowLeft => Some(KeyAction::SeekBy(-self.seek_step)),
            Key::ArrowRight => Some(KeyAction::SeekBy(self.seek_step)),
            Key::ArrowUp => Some(KeyAction::VolumeBy(self.volume_step)),
            Key::ArrowDown => Some(KeyAction::VolumeBy(-self.volume_step)),
            Key::Char('f') => Some(KeyAction::ToggleFullscreen),
            Key::Char(_) => None,
        }
    }
}
