//! Rectangle and circle shapes.

use super::{Element, ElementId, SerializableColor};
use crate::geometry::{distance, normalized_rect, rect_contains};
use crate::selection::Corner;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which primitive a [`Shape`] draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    /// `start` and `end` are opposite corners.
    Rectangle,
    /// `start` is the center, the radius is the distance to `end`.
    Circle,
}

/// A committed rectangle or circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub(crate) id: ElementId,
    pub kind: ShapeKind,
    pub start: Point,
    pub end: Point,
    pub color: SerializableColor,
    pub stroke_width: f64,
    /// Opacity in percent (0..=100).
    pub opacity: f64,
    #[serde(default)]
    pub fill: Option<SerializableColor>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Shape {
    pub fn new(kind: ShapeKind, start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            start,
            end,
            color: SerializableColor::from_hex("#e4915c"),
            stroke_width: 3.0,
            opacity: 100.0,
            fill: None,
            visible: true,
        }
    }

    pub fn rectangle(start: Point, end: Point) -> Self {
        Self::new(ShapeKind::Rectangle, start, end)
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self::new(ShapeKind::Circle, center, Point::new(center.x + radius, center.y))
    }

    pub fn with_style(mut self, color: SerializableColor, stroke_width: f64, opacity: f64) -> Self {
        self.color = color;
        self.stroke_width = stroke_width;
        self.opacity = opacity;
        self
    }

    /// Circle radius (distance from center to the stored end point).
    pub fn radius(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Rectangle spanned by start/end after min/max normalization.
    pub fn normalized(&self) -> Rect {
        normalized_rect(self.start, self.end)
    }

    /// Corner positions used for resize handles (normalized min/max box).
    pub fn corner(&self, corner: Corner) -> Point {
        let r = self.normalized();
        match corner {
            Corner::NorthWest => Point::new(r.x0, r.y0),
            Corner::NorthEast => Point::new(r.x1, r.y0),
            Corner::SouthWest => Point::new(r.x0, r.y1),
            Corner::SouthEast => Point::new(r.x1, r.y1),
        }
    }

    /// Corner resize: each corner adjusts its own start/end coordinates.
    pub fn resize_corner(&mut self, corner: Corner, delta: Vec2) {
        match corner {
            Corner::SouthEast => {
                self.end.x += delta.x;
                self.end.y += delta.y;
            }
            Corner::NorthWest => {
                self.start.x += delta.x;
                self.start.y += delta.y;
            }
            Corner::NorthEast => {
                self.end.x += delta.x;
                self.start.y += delta.y;
            }
            Corner::SouthWest => {
                self.start.x += delta.x;
                self.end.y += delta.y;
            }
        }
    }
}

impl Element for Shape {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        Some(match self.kind {
            ShapeKind::Rectangle => self.normalized(),
            ShapeKind::Circle => {
                let r = self.radius();
                Rect::new(self.start.x - r, self.start.y - r, self.start.x + r, self.start.y + r)
            }
        })
    }

    fn hit_test(&self, point: Point) -> bool {
        match self.kind {
            ShapeKind::Rectangle => rect_contains(self.normalized(), point),
            ShapeKind::Circle => distance(point, self.start) <= self.radius(),
        }
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
    fn test_rectangle_hit_with_reversed_corners() {
        let shape = Shape::rectangle(Point::new(100.0, 100.0), Point::new(0.0, 0.0));
        assert!(shape.hit_test(Point::new(50.0, 50.0)));
        assert!(shape.hit_test(Point::new(0.0, 100.0)));
        assert!(!shape.hit_test(Point::new(101.0, 50.0)));
    }

    #[test]
    fn test_circle_hit() {
        let shape = Shape::new(ShapeKind::Circle, Point::new(50.0, 50.0), Point::new(80.0, 90.0));
        assert!((shape.radius() - 50.0).abs() < f64::EPSILON);
        assert!(shape.hit_test(Point::new(50.0, 100.0)));
        assert!(!shape.hit_test(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_corner_resize() {
        let mut shape = Shape::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        shape.resize_corner(Corner::SouthEast, Vec2::new(10.0, 20.0));
        assert_eq!(shape.end, Point::new(110.0, 120.0));
        assert_eq!(shape.start, Point::new(0.0, 0.0));

        shape.resize_corner(Corner::NorthEast, Vec2::new(5.0, -5.0));
        assert_eq!(shape.end, Point::new(115.0, 120.0));
        assert_eq!(shape.start, Point::new(0.0, -5.0));

        shape.resize_corner(Corner::SouthWest, Vec2::new(3.0, 4.0));
        assert_eq!(shape.start, Point::new(3.0, -5.0));
        assert_eq!(shape.end, Point::new(115.0, 124.0));
    }

    #[test]
    fn test_translate() {
        let mut shape = Shape::circle(Point::new(10.0, 10.0), 5.0);
        shape.translate(Vec2::new(1.0, -1.0));
        assert_eq!(shape.start, Point::new(11.0, 9.0));
        assert_eq!(shape.end, Point::new(16.0, 9.0));
    }
}
