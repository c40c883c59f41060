//! Polyline vector paths built with the pen tool.

use super::{Element, ElementId, SerializableColor};
use crate::geometry::point_to_polyline_dist;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extra hit slop added to a path's stroke width.
pub const PATH_HIT_SLOP: f64 = 5.0;

/// A vertex of a vector path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub id: ElementId,
    pub position: Point,
}

impl AnchorPoint {
    pub fn new(position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
        }
    }
}

/// An ordered, non-empty polyline with an optional closing segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorPath {
    pub(crate) id: ElementId,
    pub points: Vec<AnchorPoint>,
    pub closed: bool,
    pub stroke: SerializableColor,
    pub stroke_width: f64,
    #[serde(default)]
    pub fill: Option<SerializableColor>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl VectorPath {
    /// Start a path at `first`.
    pub fn new(first: Point, stroke: SerializableColor, stroke_width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: vec![AnchorPoint::new(first)],
            closed: false,
            stroke,
            stroke_width,
            fill: None,
            visible: true,
        }
    }

    /// Build a path from a list of positions. Returns `None` for an empty list.
    pub fn from_points(points: &[Point], stroke: SerializableColor, stroke_width: f64) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut path = Self::new(*first, stroke, stroke_width);
        for p in rest {
            path.push(*p);
        }
        Some(path)
    }

    pub fn push(&mut self, position: Point) {
        self.points.push(AnchorPoint::new(position));
    }

    pub fn positions(&self) -> Vec<Point> {
        self.points.iter().map(|p| p.position).collect()
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().map(|p| p.position)
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().map(|p| p.position)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Element for VectorPath {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        let first = self.first()?;
        Some(
            self.points
                .iter()
                .fold(Rect::from_points(first, first), |r, p| r.union_pt(p.position)),
        )
    }

    fn hit_test(&self, point: Point) -> bool {
        if self.points.len() < 2 {
            return false;
        }
        point_to_polyline_dist(point, &self.positions(), self.closed)
            <= self.stroke_width + PATH_HIT_SLOP
    }

    fn translate(&mut self, delta: Vec2) {
        for anchor in &mut self.points {
            anchor.position += delta;
        }
    }

    /// Anchor points get fresh ids as well.
    fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
        for anchor in &mut self.points {
            anchor.id = Uuid::new_v4();
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(closed: bool) -> VectorPath {
        let mut path = VectorPath::from_points(
            &[Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 100.0)],
            SerializableColor::black(),
            3.0,
        )
        .unwrap();
        path.closed = closed;
        path
    }

    #[test]
    fn test_hit_within_stroke_tolerance() {
        let path = triangle(false);
        assert!(path.hit_test(Point::new(50.0, 7.9)));
        assert!(!path.hit_test(Point::new(50.0, 8.5)));
    }

    #[test]
    fn test_closing_segment_only_when_closed() {
        let probe = Point::new(50.0, 50.0);
        assert!(!triangle(false).hit_test(probe));
        assert!(triangle(true).hit_test(probe));
    }

    #[test]
    fn test_regenerate_ids_replaces_anchor_ids() {
        let mut path = triangle(false);
        let old_ids: Vec<_> = path.points.iter().map(|p| p.id).collect();
        let old_id = path.id();
        path.regenerate_id();
        assert_ne!(path.id(), old_id);
        for (anchor, old) in path.points.iter().zip(old_ids) {
            assert_ne!(anchor.id, old);
        }
    }

    #[test]
    fn test_translate_moves_all_anchors() {
        let mut path = triangle(false);
        path.translate(Vec2::new(5.0, 5.0));
        assert_eq!(path.positions()[2], Point::new(105.0, 105.0));
    }

    #[test]
    fn test_empty_points_rejected() {
        assert!(VectorPath::from_points(&[], SerializableColor::black(), 1.0).is_none());
    }
}
