//! Pointer and keyboard events plus double-click detection.

use crate::geometry::distance;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS; treated like ctrl for shortcuts.
    pub meta: bool,
}

impl Modifiers {
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Default::default()
        }
    }

    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer events in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Move { position: Point },
    Up { position: Point, button: MouseButton },
    DoubleClick { position: Point },
}

impl PointerEvent {
    pub fn down(x: f64, y: f64) -> Self {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    pub fn moved(x: f64, y: f64) -> Self {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    pub fn up(x: f64, y: f64) -> Self {
        PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    pub fn double_click(x: f64, y: f64) -> Self {
        PointerEvent::DoubleClick {
            position: Point::new(x, y),
        }
    }

    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position, .. }
            | PointerEvent::DoubleClick { position } => position,
        }
    }
}

/// A key press with its modifiers. Keys use DOM-style names (`"z"`, `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    pub fn plain(key: impl Into<String>) -> Self {
        Self::new(key, Modifiers::default())
    }
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
pub const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Turns pairs of nearby, quick left-button presses into a double click.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last_click: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a left press at `at`. Returns `true` when it completes a double click.
    pub fn press(&mut self, position: Point, at: Instant) -> bool {
        let is_double = self.last_click.is_some_and(|(last_time, last_pos)| {
            at.saturating_duration_since(last_time) < DOUBLE_CLICK_TIME
                && distance(position, last_pos) < DOUBLE_CLICK_DISTANCE
        });
        if is_double {
            // A third click starts a new pair.
            self.last_click = None;
            return true;
        }
        self.last_click = Some((at, position));
        false
    }

    /// Expand a raw event into the events the canvas should see.
    pub fn process(&mut self, event: PointerEvent, at: Instant) -> Vec<PointerEvent> {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } if self.press(position, at) => vec![event, PointerEvent::DoubleClick { position }],
            _ => vec![event],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_click_detection() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        assert!(!tracker.press(Point::new(10.0, 10.0), t0));
        assert!(tracker.press(Point::new(12.0, 11.0), t0 + Duration::from_millis(200)));
        // Third click does not chain.
        assert!(!tracker.press(Point::new(12.0, 11.0), t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_slow_or_distant_clicks() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        tracker.press(Point::ZERO, t0);
        assert!(!tracker.press(Point::ZERO, t0 + Duration::from_millis(600)));
        assert!(!tracker.press(Point::new(20.0, 0.0), t0 + Duration::from_millis(700)));
    }

    #[test]
    fn test_process_appends_double_click() {
        let mut tracker = ClickTracker::new();
        let t0 = Instant::now();
        assert_eq!(tracker.process(PointerEvent::down(1.0, 1.0), t0).len(), 1);
        let events = tracker.process(PointerEvent::down(1.0, 1.0), t0 + Duration::from_millis(100));
        assert_eq!(events, vec![PointerEvent::down(1.0, 1.0), PointerEvent::double_click(1.0, 1.0)]);
        assert_eq!(tracker.process(PointerEvent::moved(3.0, 3.0), t0).len(), 1);
    }
}
