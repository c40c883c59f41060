//! Distance and area measurements with real-world calibration.

use super::{Element, ElementId, SerializableColor};
use crate::geometry::{self, point_to_polyline_dist, round_to};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const FEET_TO_METERS: f64 = 0.3048;
const SQ_FEET_TO_SQ_METERS: f64 = 0.092903;
const SQ_FEET_PER_ACRE: f64 = 43560.0;
/// Square-foot areas above this are reported in acres.
const ACRES_THRESHOLD: f64 = 4000.0;
/// Pick distance for measurement lines.
const MEASUREMENT_HIT_TOLERANCE: f64 = 8.0;

/// Length unit used for reporting measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit {
    #[default]
    Feet,
    Meters,
    Yards,
}

impl MeasurementUnit {
    pub fn name(self) -> &'static str {
        match self {
            MeasurementUnit::Feet => "feet",
            MeasurementUnit::Meters => "meters",
            MeasurementUnit::Yards => "yards",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "feet" | "ft" => Some(MeasurementUnit::Feet),
            "meters" | "m" => Some(MeasurementUnit::Meters),
            "yards" | "yd" => Some(MeasurementUnit::Yards),
            _ => None,
        }
    }
}

/// A computed value in both pixel and real-world space.
#[derive(Debug, Clone, PartialEq)]
pub struct RealWorldValue {
    pub pixels: f64,
    pub real_world: f64,
    pub unit: String,
}

/// Distance between two points in the given calibration.
pub fn calculate_distance(a: Point, b: Point, pixels_per_foot: f64, unit: MeasurementUnit) -> RealWorldValue {
    let pixels = geometry::distance(a, b);
    let feet = pixels / pixels_per_foot;
    let real = match unit {
        MeasurementUnit::Feet => feet,
        MeasurementUnit::Meters => feet * FEET_TO_METERS,
        MeasurementUnit::Yards => feet / 3.0,
    };
    RealWorldValue {
        pixels,
        real_world: round_to(real, 2),
        unit: unit.name().to_string(),
    }
}

/// Polygon area in the given calibration; large square-foot areas switch to acres.
pub fn calculate_area(points: &[Point], pixels_per_foot: f64, unit: MeasurementUnit) -> RealWorldValue {
    let pixels = geometry::polygon_area(points);
    let sq_feet = pixels / (pixels_per_foot * pixels_per_foot);
    let (real, unit_name) = match unit {
        MeasurementUnit::Feet if sq_feet > ACRES_THRESHOLD => (sq_feet / SQ_FEET_PER_ACRE, "acres".to_string()),
        MeasurementUnit::Feet => (sq_feet, format!("sq {}", unit.name())),
        MeasurementUnit::Meters => (sq_feet * SQ_FEET_TO_SQ_METERS, format!("sq {}", unit.name())),
        MeasurementUnit::Yards => (sq_feet / 9.0, format!("sq {}", unit.name())),
    };
    RealWorldValue {
        pixels,
        real_world: round_to(real, 2),
        unit: unit_name,
    }
}

/// Measurement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementKind {
    /// Two points.
    Distance,
    /// Three or more points forming a polygon.
    Area,
}

/// A calibrated measurement overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub(crate) id: ElementId,
    pub kind: MeasurementKind,
    pub points: Vec<Point>,
    pub value: f64,
    pub unit: String,
    pub label: String,
    pub visible: bool,
    pub color: SerializableColor,
}

impl Measurement {
    /// Build a measurement whose label is derived from a computed value.
    pub fn from_value(kind: MeasurementKind, points: Vec<Point>, value: &RealWorldValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            points,
            value: value.real_world,
            unit: value.unit.clone(),
            label: format!("{} {}", value.real_world, value.unit),
            visible: true,
            color: SerializableColor::from_hex("#ff6b35"),
        }
    }

    /// Whether the measurement has enough points to be drawn.
    pub fn is_complete(&self) -> bool {
        match self.kind {
            MeasurementKind::Distance => self.points.len() >= 2,
            MeasurementKind::Area => self.points.len() >= 3,
        }
    }

    /// Label anchor: segment midpoint for distances, centroid for areas.
    pub fn label_anchor(&self) -> Option<Point> {
        match self.kind {
            MeasurementKind::Distance => match self.points.as_slice() {
                [a, b, ..] => Some(a.midpoint(*b)),
                _ => None,
            },
            MeasurementKind::Area => geometry::centroid(&self.points),
        }
    }
}

impl Element for Measurement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p)),
        )
    }

    fn hit_test(&self, point: Point) -> bool {
        self.visible
            && point_to_polyline_dist(point, &self.points, self.kind == MeasurementKind::Area)
                <= MEASUREMENT_HIT_TOLERANCE
    }

    fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
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
    fn test_distance_in_feet() {
        let v = calculate_distance(Point::new(0.0, 0.0), Point::new(300.0, 400.0), 100.0, MeasurementUnit::Feet);
        assert!((v.pixels - 500.0).abs() < 1e-9);
        assert!((v.real_world - 5.0).abs() < 1e-9);
        assert_eq!(v.unit, "feet");
    }

    #[test]
    fn test_distance_unit_conversion() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(300.0, 400.0);
        let meters = calculate_distance(a, b, 100.0, MeasurementUnit::Meters);
        assert!((meters.real_world - 1.52).abs() < 1e-9);
        let yards = calculate_distance(a, b, 100.0, MeasurementUnit::Yards);
        assert!((yards.real_world - 1.67).abs() < 1e-9);
    }

    #[test]
    fn test_area_in_square_feet() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 150.0),
            Point::new(0.0, 150.0),
        ];
        let v = calculate_area(&pts, 100.0, MeasurementUnit::Feet);
        assert!((v.pixels - 30_000.0).abs() < 1e-9);
        assert!((v.real_world - 3.0).abs() < 1e-9);
        assert_eq!(v.unit, "sq feet");
    }

    #[test]
    fn test_large_area_switches_to_acres() {
        // 100 ft x 50 ft = 5000 sq ft at 1 px/ft
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(0.0, 50.0),
        ];
        let v = calculate_area(&pts, 1.0, MeasurementUnit::Feet);
        assert_eq!(v.unit, "acres");
        assert!((v.real_world - 0.11).abs() < 1e-9);

        let threshold = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 40.0),
            Point::new(0.0, 40.0),
        ];
        let at_threshold = calculate_area(&threshold, 1.0, MeasurementUnit::Feet);
        assert_eq!(at_threshold.unit, "sq feet");
        let m = calculate_area(&threshold, 1.0, MeasurementUnit::Meters);
        assert_eq!(m.unit, "sq meters");
        assert!((m.real_world - 371.61).abs() < 1e-9);
    }

    #[test]
    fn test_label_and_anchor() {
        let value = calculate_distance(Point::new(0.0, 0.0), Point::new(200.0, 0.0), 100.0, MeasurementUnit::Feet);
        let m = Measurement::from_value(MeasurementKind::Distance, vec![Point::new(0.0, 0.0), Point::new(200.0, 0.0)], &value);
        assert_eq!(m.label, "2 feet");
        assert_eq!(m.label_anchor(), Some(Point::new(100.0, 0.0)));
        assert!(m.is_complete());
    }
}
