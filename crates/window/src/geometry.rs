use settings::constants::window::{
    DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, DEFAULT_X_POS, DEFAULT_Y_POS,
};
use settings::ConfigStore;

/// A window rectangle in root window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn with_origin(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Screen edge the window slides in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

impl Orientation {
    /// Decode the `animation_orientation` config value.
    pub fn from_config(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Top),
            1 => Some(Self::Bottom),
            2 => Some(Self::Left),
            3 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// Configured size and position of the pulled-down window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub centered_horizontally: bool,
    pub centered_vertically: bool,
}

impl Placement {
    /// Read the placement keys, taking the default for any that are missing.
    pub fn from_config(config: &dyn ConfigStore) -> Self {
        let int = |key: &str, default: i64| config.get_int(key).unwrap_or(default);
        Self {
            x: clamp_i32(int("x_pos", DEFAULT_X_POS)),
            y: clamp_i32(int("y_pos", DEFAULT_Y_POS)),
            width: clamp_size(int("max_width", DEFAULT_MAX_WIDTH)),
            height: clamp_size(int("max_height", DEFAULT_MAX_HEIGHT)),
            centered_horizontally: config.get_bool("centered_horizontally").unwrap_or(false),
            centered_vertically: config.get_bool("centered_vertically").unwrap_or(false),
        }
    }

    /// Where the window rests when fully down.
    pub fn final_rect(&self, screen: ScreenSize) -> Rect {
        let x = if self.centered_horizontally {
            centered(screen.width, self.width)
        } else {
            self.x
        };
        let y = if self.centered_vertically {
            centered(screen.height, self.height)
        } else {
            self.y
        };
        Rect::new(x, y, self.width, self.height)
    }
}

fn centered(screen: u32, size: u32) -> i32 {
    (i64::from(screen) - i64::from(size)).div_euclid(2) as i32
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Sizes are at least one pixel, the smallest window X accepts.
fn clamp_size(value: i64) -> u32 {
    value.clamp(1, i64::from(u16::MAX)) as u32
}
