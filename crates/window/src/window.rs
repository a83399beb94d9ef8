//! The drop-down window: where it rests, how it slides, and when it is
//! pulled up or down.

pub mod animation;
pub mod geometry;
mod pull;
mod x11_window;

pub use geometry::{Orientation, Placement, Rect, ScreenSize};
pub use pull::{DropDownWindow, PullAction, PullAnimationController, PullSettings, WindowState};
pub use x11_window::X11Window;
