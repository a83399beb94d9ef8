use crate::keysyms::Keysym;
use crate::modifiers::{RealModifiers, MODIFIER_SLOTS};

/// A hardware keycode as reported by the X server.
pub type Keycode = u8;

/// Server timestamp of an input event, in milliseconds.
pub type Timestamp = u32;

/// Keycodes bound to each real modifier slot, Shift first.
pub type ModifierKeycodes = [Vec<Keycode>; MODIFIER_SLOTS];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("window system connection failed: {0}")]
    Connection(String),
    #[error("X protocol error: {0}")]
    Protocol(String),
}

/// Keyboard events the grab manager cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardEvent {
    KeyPress {
        keycode: Keycode,
        state: u16,
        time: Timestamp,
    },
    KeyRelease {
        keycode: Keycode,
        state: u16,
        time: Timestamp,
    },
    /// The keyboard or modifier mapping changed.
    MappingChanged,
}

/// The window-system operations needed to resolve and grab global hotkeys.
pub trait KeyboardBackend {
    /// Changes whenever the keyboard mapping is reloaded.
    fn keymap_serial(&self) -> u64;

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes, BackendError>;

    /// Keysyms produced by `keycode` across its shift levels, `NoSymbol` omitted.
    fn keysyms_for_keycode(&self, keycode: Keycode) -> Vec<Keysym>;

    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode>;

    /// Grab `keycode` on the root window once per mask. Every grab is attempted
    /// before any error is reported.
    fn grab_keys(&self, keycode: Keycode, masks: &[RealModifiers]) -> Result<(), BackendError>;

    fn ungrab_keys(&self, keycode: Keycode, masks: &[RealModifiers]) -> Result<(), BackendError>;

    /// Reload the keyboard mapping after a mapping change.
    fn refresh_keymap(&mut self) -> Result<(), BackendError>;
}
