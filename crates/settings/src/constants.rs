//! Defaults and limits shared by the Tilda crates, grouped by component.

/// Drop-down window geometry and appearance.
pub mod window {
    pub const DEFAULT_MAX_WIDTH: i64 = 600;
    pub const DEFAULT_MAX_HEIGHT: i64 = 150;
    pub const DEFAULT_X_POS: i64 = 0;
    pub const DEFAULT_Y_POS: i64 = 0;
    pub const DEFAULT_TITLE: &str = "Tilda";
}

/// Slide animation.
pub mod animation {
    use std::time::Duration;

    /// Frames per slide.
    pub const STEPS: usize = 32;
    /// Pause between frames, in microseconds.
    pub const DEFAULT_SLIDE_SLEEP_USEC: i64 = 20_000;
    /// Pulls arriving sooner than this after the previous one are dropped.
    pub const PULL_GUARD: Duration = Duration::from_millis(150);
    /// Highest valid `animation_orientation` (0 top, 1 bottom, 2 left, 3 right).
    pub const MAX_ORIENTATION: i64 = 3;
}

/// Main loop timing.
pub mod timing {
    use std::time::Duration;

    /// Longest wait for X events before config changes are checked again.
    pub const IDLE_WAIT: Duration = Duration::from_millis(100);
    /// Quiet period before a config file change is reported.
    pub const CONFIG_DEBOUNCE: Duration = Duration::from_millis(100);
}

/// Config file validation limits.
pub mod settings {
    /// Maximum config file size in bytes (64 KB).
    /// Config files should be tiny; anything larger is suspicious.
    pub const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Maximum length for string values (title, key).
    pub const MAX_STRING_LENGTH: usize = 256;

    /// Written to `tilda_config_version` on save.
    pub const CONFIG_VERSION: &str = env!("CARGO_PKG_VERSION");
}
