//! Slide animation frames.
//!
//! The window keeps its size while sliding; only the coordinate along the
//! slide axis changes. Frames run from the off-screen edge to the resting
//! rectangle (pull-down) or back (pull-up).

use settings::constants::animation::STEPS;

use crate::geometry::{Orientation, Rect, ScreenSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slide {
    /// Off-screen edge to resting position.
    In,
    /// Resting position to off-screen edge.
    Out,
}

/// Ease-out quintic, `1 - (1 - t)^5`.
fn ease_in(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(5)
}

/// `1 - t^2`, read backwards: fraction of the way still covered.
fn ease_out(t: f64) -> f64 {
    1.0 - t * t
}

/// Where the window sits just outside the screen edge it slides from.
pub fn offscreen_rect(orientation: Orientation, target: Rect, screen: ScreenSize) -> Rect {
    match orientation {
        Orientation::Top => target.with_origin(target.x, -(target.height as i32)),
        Orientation::Bottom => target.with_origin(target.x, screen.height as i32),
        Orientation::Left => target.with_origin(-(target.width as i32), target.y),
        Orientation::Right => target.with_origin(screen.width as i32, target.y),
    }
}

/// Rectangles to show, in order, for one slide.
///
/// The first frame of a slide in is the off-screen rectangle and the last is
/// `target`. A slide out mirrors that. Consecutive duplicates are dropped so
/// the moving coordinate changes strictly monotonically.
pub fn frames(slide: Slide, orientation: Orientation, target: Rect, screen: ScreenSize) -> Vec<Rect> {
    let start = offscreen_rect(orientation, target, screen);
    let along = |progress: f64| -> Rect {
        let lerp = |from: i32, to: i32| -> i32 {
            (f64::from(from) + (f64::from(to) - f64::from(from)) * progress).round() as i32
        };
        target.with_origin(lerp(start.x, target.x), lerp(start.y, target.y))
    };

    let mut frames = Vec::with_capacity(STEPS + 1);
    let mut push = |rect: Rect| {
        if frames.last() != Some(&rect) {
            frames.push(rect);
        }
    };

    for step in 0..STEPS {
        let t = step as f64 / STEPS as f64;
        match slide {
            Slide::In => push(along(ease_in(t))),
            Slide::Out => push(along(ease_out(t))),
        }
    }
    push(match slide {
        Slide::In => target,
        Slide::Out => start,
    });
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };
    const TARGET: Rect = Rect {
        x: 100,
        y: 40,
        width: 600,
        height: 150,
    };

    fn axis(orientation: Orientation, rect: &Rect) -> i32 {
        if orientation.is_vertical() {
            rect.y
        } else {
            rect.x
        }
    }

    #[test_case(Orientation::Top, Rect::new(100, -150, 600, 150))]
    #[test_case(Orientation::Bottom, Rect::new(100, 1080, 600, 150))]
    #[test_case(Orientation::Left, Rect::new(-600, 40, 600, 150))]
    #[test_case(Orientation::Right, Rect::new(1920, 40, 600, 150))]
    fn offscreen_start_per_edge(orientation: Orientation, expected: Rect) {
        assert_eq!(offscreen_rect(orientation, TARGET, SCREEN), expected);
    }

    #[test_case(Orientation::Top)]
    #[test_case(Orientation::Bottom)]
    #[test_case(Orientation::Left)]
    #[test_case(Orientation::Right)]
    fn slide_in_ends_exactly_on_target(orientation: Orientation) {
        let frames = frames(Slide::In, orientation, TARGET, SCREEN);
        assert_eq!(frames.first(), Some(&offscreen_rect(orientation, TARGET, SCREEN)));
        assert_eq!(frames.last(), Some(&TARGET));
        assert!(frames.len() > 2 && frames.len() <= STEPS + 1);
    }

    #[test_case(Orientation::Top)]
    #[test_case(Orientation::Right)]
    fn slide_out_leaves_the_screen(orientation: Orientation) {
        let frames = frames(Slide::Out, orientation, TARGET, SCREEN);
        assert_eq!(frames.first(), Some(&TARGET));
        assert_eq!(frames.last(), Some(&offscreen_rect(orientation, TARGET, SCREEN)));
    }

    #[test]
    fn only_the_slide_axis_moves() {
        for rect in frames(Slide::In, Orientation::Top, TARGET, SCREEN) {
            assert_eq!((rect.x, rect.width, rect.height), (100, 600, 150));
        }
        for rect in frames(Slide::Out, Orientation::Left, TARGET, SCREEN) {
            assert_eq!((rect.y, rect.width, rect.height), (40, 600, 150));
        }
    }

    #[test]
    fn slide_in_decelerates() {
        let frames = frames(Slide::In, Orientation::Top, TARGET, SCREEN);
        let first_step = frames[1].y - frames[0].y;
        let last_step = frames[frames.len() - 1].y - frames[frames.len() - 2].y;
        assert!(first_step > last_step);
    }

    #[test]
    fn no_distance_collapses_to_one_frame() {
        let target = Rect::new(0, -150, 600, 150);
        assert_eq!(frames(Slide::In, Orientation::Top, target, SCREEN), vec![target]);
    }

    fn orientation() -> impl Strategy<Value = Orientation> {
        prop_oneof![
            Just(Orientation::Top),
            Just(Orientation::Bottom),
            Just(Orientation::Left),
            Just(Orientation::Right),
        ]
    }

    proptest! {
        #[test]
        fn frames_move_strictly_monotonically(
            orientation in orientation(),
            x in -500i32..2000,
            y in -500i32..1200,
            width in 1u32..2000,
            height in 1u32..1200,
            slide_in in any::<bool>(),
        ) {
            let target = Rect::new(x, y, width, height);
            let slide = if slide_in { Slide::In } else { Slide::Out };
            let frames = frames(slide, orientation, target, SCREEN);
            let positions: Vec<i32> = frames.iter().map(|r| axis(orientation, r)).collect();
            let rising = positions.windows(2).all(|w| w[0] < w[1]);
            let falling = positions.windows(2).all(|w| w[0] > w[1]);
            prop_assert!(rising || falling, "not monotonic: {:?}", positions);
        }
    }
}
