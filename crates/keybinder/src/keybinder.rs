//! Global hotkeys for X11.
//!
//! - [`Accelerator`]: `<Control><Alt>t`-style strings, parsed and formatted
//! - [`VirtualModifierResolver`]: maps Super/NumLock/... onto the real modifier
//!   bits of the current keyboard mapping
//! - [`KeyGrabManager`]: binds accelerators to handlers, grabs them on the root
//!   window and dispatches key presses
//! - [`X11Keyboard`]: the x11rb implementation of [`KeyboardBackend`]

mod accelerator;
mod backend;
mod grab;
pub mod keysyms;
mod modifiers;
mod modmap;
mod x11;

#[cfg(test)]
mod testing;

pub use accelerator::{
    is_unset, validate_shortcut, Accelerator, ParseAcceleratorError, UNSET_SHORTCUT,
};
pub use backend::{
    BackendError, KeyboardBackend, KeyboardEvent, Keycode, ModifierKeycodes, Timestamp,
};
pub use grab::{BindError, EventClock, Handler, KeyGrabManager};
pub use keysyms::Keysym;
pub use modifiers::{IgnorableModifiers, RealModifiers, VirtualModifiers, MODIFIER_SLOTS};
pub use modmap::{ModifierMap, VirtualModifierResolver};
pub use x11::{keyboard_event, X11Keyboard};
