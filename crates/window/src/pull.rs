//! Show/hide state machine for the drop-down window.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use settings::constants::animation::{DEFAULT_SLIDE_SLEEP_USEC, PULL_GUARD};
use settings::ConfigStore;
use x11rb::protocol::xproto::Timestamp;

use crate::animation::{self, Slide};
use crate::geometry::{Orientation, Placement, Rect, ScreenSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    /// Hidden.
    #[default]
    Up,
    /// Shown.
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullAction {
    Up,
    Down,
    Toggle,
}

/// Window-system operations the controller needs.
pub trait DropDownWindow {
    fn screen_size(&self) -> ScreenSize;
    fn show(&mut self) -> Result<()>;
    fn hide(&mut self) -> Result<()>;
    fn move_resize(&mut self, rect: Rect) -> Result<()>;
    /// Keep the window on every workspace.
    fn stick(&mut self) -> Result<()>;
    fn set_keep_above(&mut self, above: bool) -> Result<()>;
    /// Raise and focus. `None` means the server's current time.
    fn activate(&mut self, time: Option<Timestamp>) -> Result<()>;
    fn is_active(&self) -> Result<bool>;
    fn flush(&mut self) -> Result<()>;
}

/// The config values that drive pulling.
#[derive(Debug, Clone, PartialEq)]
pub struct PullSettings {
    pub placement: Placement,
    pub animation: bool,
    pub slide_sleep: Duration,
    pub orientation: Orientation,
    pub pinned: bool,
    pub above: bool,
    pub auto_hide_on_focus_lost: bool,
}

impl PullSettings {
    pub fn from_config(config: &dyn ConfigStore) -> Self {
        let flag = |key: &str, default: bool| config.get_bool(key).unwrap_or(default);
        let code = config.get_int("animation_orientation").unwrap_or(0);
        let orientation = Orientation::from_config(code).unwrap_or_else(|| {
            tracing::warn!("Unknown animation_orientation {}, sliding from the top", code);
            Orientation::Top
        });
        let slide_sleep = config
            .get_int("slide_sleep_usec")
            .unwrap_or(DEFAULT_SLIDE_SLEEP_USEC);
        Self {
            placement: Placement::from_config(config),
            animation: flag("animation", false),
            slide_sleep: Duration::from_micros(slide_sleep.max(0) as u64),
            orientation,
            pinned: flag("pinned", true),
            above: flag("above", true),
            auto_hide_on_focus_lost: flag("auto_hide_on_focus_lost", false),
        }
    }
}

pub struct PullAnimationController<W> {
    window: W,
    settings: PullSettings,
    state: WindowState,
    guard: Duration,
    last_action: Option<Instant>,
    /// Focus was requested and the window manager has not confirmed it yet.
    focus_pending: bool,
}

impl<W: DropDownWindow> PullAnimationController<W> {
    /// Starts in [`WindowState::Up`]; the window is assumed unmapped.
    pub fn new(window: W, settings: PullSettings) -> Self {
        Self {
            window,
            settings,
            state: WindowState::Up,
            guard: PULL_GUARD,
            last_action: None,
            focus_pending: false,
        }
    }

    /// Minimum spacing between two pulls; closer ones are dropped.
    pub fn with_guard(mut self, guard: Duration) -> Self {
        self.guard = guard;
        self
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn settings(&self) -> &PullSettings {
        &self.settings
    }

    /// Takes effect at the next pull.
    pub fn set_settings(&mut self, settings: PullSettings) {
        self.settings = settings;
    }

    /// Record that the window received input focus.
    pub fn window_focused(&mut self) {
        self.focus_pending = false;
    }

    /// Where the window rests when down.
    pub fn final_rect(&self) -> Rect {
        self.settings.placement.final_rect(self.window.screen_size())
    }

    /// Returns whether the pull did anything.
    pub fn pull(&mut self, action: PullAction, force_hide: bool, time: Option<Timestamp>) -> Result<bool> {
        self.pull_at(Instant::now(), action, force_hide, time)
    }

    pub fn pull_at(
        &mut self,
        now: Instant,
        action: PullAction,
        force_hide: bool,
        time: Option<Timestamp>,
    ) -> Result<bool> {
        if let Some(last) = self.last_action {
            if now.saturating_duration_since(last) < self.guard {
                tracing::trace!(?action, "Pull ignored, too soon after the previous one");
                return Ok(false);
            }
        }

        if self.state == WindowState::Down
            && !force_hide
            && !self.settings.auto_hide_on_focus_lost
            && !self.focus_pending
            && !self.window.is_active()?
        {
            tracing::debug!("Window is down but unfocused, focusing it instead of pulling up");
            self.window.activate(time)?;
            self.window.flush()?;
            self.focus_pending = true;
            return Ok(true);
        }

        let acted = match (self.state, action) {
            (WindowState::Up, PullAction::Down | PullAction::Toggle) => {
                self.pull_down(time)?;
                true
            }
            (WindowState::Down, PullAction::Up | PullAction::Toggle) => {
                self.pull_up()?;
                true
            }
            _ => false,
        };
        self.last_action = Some(now);
        Ok(acted)
    }

    fn pull_down(&mut self, time: Option<Timestamp>) -> Result<()> {
        let target = self.final_rect();
        let frames = if self.settings.animation {
            animation::frames(
                Slide::In,
                self.settings.orientation,
                target,
                self.window.screen_size(),
            )
        } else {
            vec![target]
        };

        // Position before mapping so the window never flashes at its old spot.
        let (first, rest) = match frames.split_first() {
            Some((first, rest)) => (*first, rest),
            None => (target, &[][..]),
        };
        self.window.move_resize(first)?;
        self.window.show()?;
        if self.settings.pinned {
            self.window.stick()?;
        }
        self.window.set_keep_above(self.settings.above)?;
        self.window.flush()?;
        self.play(rest)?;

        self.window.activate(time)?;
        self.window.flush()?;
        self.focus_pending = true;
        self.state = WindowState::Down;
        tracing::info!(x = target.x, y = target.y, "Pulled down");
        Ok(())
    }

    fn pull_up(&mut self) -> Result<()> {
        if self.settings.animation {
            let frames = animation::frames(
                Slide::Out,
                self.settings.orientation,
                self.final_rect(),
                self.window.screen_size(),
            );
            self.play(&frames)?;
        }
        self.window.hide()?;
        self.window.flush()?;
        self.focus_pending = false;
        self.state = WindowState::Up;
        tracing::info!("Pulled up");
        Ok(())
    }

    fn play(&mut self, frames: &[Rect]) -> Result<()> {
        for frame in frames {
            self.window.move_resize(*frame)?;
            self.window.flush()?;
            if !self.settings.slide_sleep.is_zero() {
                thread::sleep(self.settings.slide_sleep);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use settings::Config;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1280,
        height: 800,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Show,
        Hide,
        Move(Rect),
        Stick,
        KeepAbove(bool),
        Activate(Option<Timestamp>),
    }

    #[derive(Default)]
    struct RecordingWindow {
        ops: Vec<Op>,
        active: bool,
        /// Activation requests are ignored, as by a window manager with
        /// focus stealing prevention.
        refuses_focus: bool,
    }

    impl RecordingWindow {
        fn moves(&self) -> Vec<Rect> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Move(rect) => Some(*rect),
                    _ => None,
                })
                .collect()
        }
    }

    impl DropDownWindow for RecordingWindow {
        fn screen_size(&self) -> ScreenSize {
            SCREEN
        }
        fn show(&mut self) -> Result<()> {
            self.ops.push(Op::Show);
            Ok(())
        }
        fn hide(&mut self) -> Result<()> {
            self.active = false;
            self.ops.push(Op::Hide);
            Ok(())
        }
        fn move_resize(&mut self, rect: Rect) -> Result<()> {
            self.ops.push(Op::Move(rect));
            Ok(())
        }
        fn stick(&mut self) -> Result<()> {
            self.ops.push(Op::Stick);
            Ok(())
        }
        fn set_keep_above(&mut self, above: bool) -> Result<()> {
            self.ops.push(Op::KeepAbove(above));
            Ok(())
        }
        fn activate(&mut self, time: Option<Timestamp>) -> Result<()> {
            self.active |= !self.refuses_focus;
            self.ops.push(Op::Activate(time));
            Ok(())
        }
        fn is_active(&self) -> Result<bool> {
            Ok(self.active)
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn config() -> Config {
        Config {
            x_pos: 20,
            y_pos: 10,
            slide_sleep_usec: 0,
            ..Config::default()
        }
    }

    fn controller(config: &Config) -> PullAnimationController<RecordingWindow> {
        PullAnimationController::new(RecordingWindow::default(), PullSettings::from_config(config))
            .with_guard(Duration::ZERO)
    }

    const FINAL: Rect = Rect {
        x: 20,
        y: 10,
        width: 600,
        height: 150,
    };

    #[test]
    fn pull_down_without_animation_jumps_to_final_rect() {
        let mut ctl = controller(&config());
        assert!(ctl.pull(PullAction::Down, false, Some(77)).unwrap());

        assert_eq!(ctl.state(), WindowState::Down);
        assert_eq!(
            ctl.window().ops,
            vec![
                Op::Move(FINAL),
                Op::Show,
                Op::Stick,
                Op::KeepAbove(true),
                Op::Activate(Some(77)),
            ]
        );
    }

    #[test]
    fn pull_down_with_animation_slides_monotonically_to_final_rect() {
        let mut ctl = controller(&Config {
            animation: true,
            ..config()
        });
        ctl.pull(PullAction::Down, false, None).unwrap();

        let moves = ctl.window().moves();
        assert!(moves.len() > 2);
        assert_eq!(moves.first().map(|r| r.y), Some(-150));
        assert_eq!(moves.last(), Some(&FINAL));
        assert!(moves.windows(2).all(|w| w[0].y < w[1].y));
        assert_eq!(ctl.state(), WindowState::Down);
    }

    #[test]
    fn pull_up_with_animation_slides_out_then_hides() {
        let mut ctl = controller(&Config {
            animation: true,
            animation_orientation: 3,
            ..config()
        });
        ctl.pull(PullAction::Down, false, None).unwrap();
        ctl.window.ops.clear();

        ctl.pull(PullAction::Up, false, None).unwrap();
        let moves = ctl.window().moves();
        assert_eq!(moves.first(), Some(&FINAL));
        assert_eq!(moves.last().map(|r| r.x), Some(1280));
        assert!(moves.windows(2).all(|w| w[0].x < w[1].x));
        assert_eq!(ctl.window().ops.last(), Some(&Op::Hide));
        assert_eq!(ctl.state(), WindowState::Up);
    }

    #[test]
    fn toggle_alternates() {
        let mut ctl = controller(&config());
        ctl.pull(PullAction::Toggle, false, None).unwrap();
        assert_eq!(ctl.state(), WindowState::Down);
        ctl.pull(PullAction::Toggle, false, None).unwrap();
        assert_eq!(ctl.state(), WindowState::Up);
        assert_eq!(ctl.window().ops.last(), Some(&Op::Hide));
    }

    #[test]
    fn repeated_direction_is_a_no_op() {
        let mut ctl = controller(&config());
        assert!(!ctl.pull(PullAction::Up, false, None).unwrap());
        assert!(ctl.window().ops.is_empty());

        ctl.pull(PullAction::Down, false, None).unwrap();
        let ops = ctl.window().ops.len();
        assert!(!ctl.pull(PullAction::Down, false, None).unwrap());
        assert_eq!(ctl.window().ops.len(), ops);
    }

    #[test]
    fn unpinned_window_is_not_stuck() {
        let mut ctl = controller(&Config {
            pinned: false,
            above: false,
            ..config()
        });
        ctl.pull(PullAction::Down, false, None).unwrap();
        assert!(!ctl.window().ops.contains(&Op::Stick));
        assert!(ctl.window().ops.contains(&Op::KeepAbove(false)));
    }

    #[test]
    fn unfocused_window_is_focused_before_hiding() {
        let mut ctl = controller(&config());
        ctl.pull(PullAction::Down, false, None).unwrap();
        ctl.window_focused();
        ctl.window.active = false;
        ctl.window.ops.clear();

        assert!(ctl.pull(PullAction::Toggle, false, Some(5)).unwrap());
        assert_eq!(ctl.window().ops, vec![Op::Activate(Some(5))]);
        assert_eq!(ctl.state(), WindowState::Down);

        ctl.pull(PullAction::Toggle, false, None).unwrap();
        assert_eq!(ctl.state(), WindowState::Up);
    }

    #[test]
    fn window_refused_focus_still_pulls_up() {
        let mut ctl = controller(&config());
        ctl.window.refuses_focus = true;
        ctl.pull(PullAction::Down, false, Some(1)).unwrap();
        assert!(!ctl.window().active);

        ctl.pull(PullAction::Toggle, false, Some(2)).unwrap();
        assert_eq!(ctl.state(), WindowState::Up);
        assert_eq!(ctl.window().ops.last(), Some(&Op::Hide));
    }

    #[test]
    fn focus_is_requested_once_per_focus_loss() {
        let mut ctl = controller(&config());
        ctl.pull(PullAction::Down, false, None).unwrap();
        ctl.window_focused();
        ctl.window.active = false;
        ctl.window.refuses_focus = true;
        ctl.window.ops.clear();

        ctl.pull(PullAction::Toggle, false, Some(3)).unwrap();
        assert_eq!(ctl.window().ops, vec![Op::Activate(Some(3))]);
        ctl.pull(PullAction::Toggle, false, Some(4)).unwrap();
        assert_eq!(ctl.state(), WindowState::Up);

        ctl.window.refuses_focus = false;
        ctl.pull(PullAction::Toggle, false, None).unwrap();
        ctl.window_focused();
        ctl.window.active = false;
        ctl.window.ops.clear();
        ctl.pull(PullAction::Toggle, false, Some(5)).unwrap();
        assert_eq!(ctl.window().ops, vec![Op::Activate(Some(5))]);
        assert_eq!(ctl.state(), WindowState::Down);
    }

    #[test]
    fn force_hide_skips_focusing() {
        let mut ctl = controller(&config());
        ctl.pull(PullAction::Down, false, None).unwrap();
        ctl.window.active = false;

        ctl.pull(PullAction::Up, true, None).unwrap();
        assert_eq!(ctl.state(), WindowState::Up);
    }

    #[test]
    fn auto_hide_skips_focusing() {
        let mut ctl = controller(&Config {
            auto_hide_on_focus_lost: true,
            ..config()
        });
        ctl.pull(PullAction::Down, false, None).unwrap();
        ctl.window.active = false;

        ctl.pull(PullAction::Toggle, false, None).unwrap();
        assert_eq!(ctl.state(), WindowState::Up);
    }

    #[test]
    fn pulls_inside_the_guard_are_dropped() {
        let mut ctl = controller(&config()).with_guard(Duration::from_millis(150));
        let start = Instant::now();

        assert!(ctl.pull_at(start, PullAction::Toggle, false, None).unwrap());
        assert!(!ctl
            .pull_at(start + Duration::from_millis(100), PullAction::Toggle, false, None)
            .unwrap());
        assert_eq!(ctl.state(), WindowState::Down);

        assert!(ctl
            .pull_at(start + Duration::from_millis(200), PullAction::Toggle, false, None)
            .unwrap());
        assert_eq!(ctl.state(), WindowState::Up);
    }

    #[test]
    fn centered_window_uses_screen_size() {
        let mut ctl = controller(&Config {
            centered_horizontally: true,
            ..config()
        });
        ctl.pull(PullAction::Down, false, None).unwrap();
        assert_eq!(ctl.window().moves(), vec![Rect::new(340, 10, 600, 150)]);
    }

    #[test]
    fn new_settings_apply_to_the_next_pull() {
        let mut ctl = controller(&config());
        ctl.set_settings(PullSettings::from_config(&Config {
            y_pos: 300,
            ..config()
        }));
        ctl.pull(PullAction::Down, false, None).unwrap();
        assert_eq!(ctl.window().moves(), vec![FINAL.with_origin(20, 300)]);
    }

    #[test]
    fn bad_orientation_falls_back_to_top() {
        let settings = PullSettings::from_config(&Config {
            animation_orientation: 9,
            ..config()
        });
        assert_eq!(settings.orientation, Orientation::Top);
    }
}
