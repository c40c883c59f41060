//! Straight arrows on the annotation layer.

use super::{Element, ElementId, SerializableColor};
use crate::geometry::{distance, normalized_rect, point_to_segment_dist};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pick distance for the shaft and both endpoints.
pub const ARROW_HIT_TOLERANCE: f64 = 25.0;
/// Head length for committed arrows.
pub const ARROW_HEAD_LENGTH: f64 = 20.0;
/// Head length for interactive previews.
pub const ARROW_PREVIEW_HEAD_LENGTH: f64 = 12.0;
/// Half-angle between the shaft and each head side, in degrees.
pub const ARROW_HEAD_HALF_ANGLE: f64 = 30.0;

/// Arrow from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
    pub(crate) id: ElementId,
    pub name: String,
    pub start: Point,
    pub end: Point,
    pub color: SerializableColor,
    pub width: f64,
    pub visible: bool,
}

impl Arrow {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Arrow".to_string(),
            start,
            end,
            color: SerializableColor::rgb(255, 0, 0),
            width: 3.0,
            visible: true,
        }
    }

    /// The two base corners of the arrow head for a given head length.
    pub fn head_points(start: Point, end: Point, head_length: f64) -> [Point; 2] {
        let angle = (end.y - start.y).atan2(end.x - start.x);
        let spread = ARROW_HEAD_HALF_ANGLE.to_radians();
        [angle - spread, angle + spread].map(|a| {
            Point::new(end.x - head_length * a.cos(), end.y - head_length * a.sin())
        })
    }
}

impl Element for Arrow {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        Some(normalized_rect(self.start, self.end))
    }

    fn hit_test(&self, point: Point) -> bool {
        if !self.visible {
            return false;
        }
        point_to_segment_dist(point, self.start, self.end) <= ARROW_HIT_TOLERANCE
            || distance(point, self.start) <= ARROW_HIT_TOLERANCE
            || distance(point, self.end) <= ARROW_HIT_TOLERANCE
    }

    fn translate(&mut self, delta: Vec2) {
        self.start += delta;
        self.end += delta;
    }

    fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_near_shaft() {
        let arrow = Arrow::new(Point::new(100.0, 100.0), Point::new(300.0, 100.0));
        assert!(arrow.hit_test(Point::new(200.0, 124.0)));
        assert!(!arrow.hit_test(Point::new(200.0, 126.0)));
    }

    #[test]
    fn test_hidden_arrow_is_not_hit() {
        let mut arrow = Arrow::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        arrow.visible = false;
        assert!(!arrow.hit_test(Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_head_points_symmetric() {
        let [a, b] = Arrow::head_points(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 20.0);
        assert!((a.x - b.x).abs() < 1e-9);
        assert!((a.y + b.y).abs() < 1e-9);
        assert!((a.x - (100.0 - 20.0 * 30f64.to_radians().cos())).abs() < 1e-9);
    }
}
