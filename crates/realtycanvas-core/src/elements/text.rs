//! Text annotations.

use super::{Element, ElementId, SerializableColor};
use crate::geometry::{rect_contains, rotate_point};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Font size bounds enforced by corner resizing.
pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 72.0;

/// Horizontal padding added around measured text.
const TEXT_PAD_X: f64 = 8.0;
/// Vertical padding added to the font size.
const TEXT_PAD_Y: f64 = 6.0;

/// Measures rendered text width in pixels.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font_size: f64, font_family: &str) -> f64;
}

/// Font-less fallback: every character is 0.6 em wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMeasurer;

impl TextMeasurer for ApproximateMeasurer {
    fn measure(&self, text: &str, font_size: f64, _font_family: &str) -> f64 {
        text.chars().count() as f64 * font_size * 0.6
    }
}

/// A text label placed on the photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub(crate) id: ElementId,
    pub text: String,
    /// Top-left corner.
    pub position: Point,
    /// Measured width including padding.
    pub width: f64,
    /// Font size plus padding.
    pub height: f64,
    pub font_size: f64,
    pub font_family: String,
    pub color: SerializableColor,
    pub background_color: SerializableColor,
    pub has_background: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Rotation in degrees, about the center.
    #[serde(default)]
    pub rotation: f64,
    /// Mirrors membership in the canvas selection list.
    #[serde(default)]
    pub selected: bool,
}

fn default_visible() -> bool {
    true
}

impl TextAnnotation {
    pub fn new(text: impl Into<String>, position: Point, font_size: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            position,
            width: 0.0,
            height: font_size + TEXT_PAD_Y,
            font_size,
            font_family: "Inter".to_string(),
            color: SerializableColor::black(),
            background_color: SerializableColor::white(),
            has_background: false,
            visible: true,
            rotation: 0.0,
            selected: false,
        }
    }

    /// Recompute `width`/`height` from the current text and font.
    pub fn remeasure(&mut self, measurer: &dyn TextMeasurer) {
        self.width = measurer.measure(&self.text, self.font_size, &self.font_family) + TEXT_PAD_X;
        self.height = self.font_size + TEXT_PAD_Y;
    }

    /// Unrotated box at the stored position.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Scale the font by `factor`, rounded and clamped to the supported range.
    pub fn scale_font(&mut self, factor: f64) {
        self.font_size = (self.font_size * factor).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE).round();
    }
}

impl Element for TextAnnotation {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        Some(self.rect())
    }

    /// Inverse-rotates the query point about the center before the box test.
    fn hit_test(&self, point: Point) -> bool {
        let local = if self.rotation != 0.0 {
            rotate_point(point, self.center(), -self.rotation)
        } else {
            point
        };
        rect_contains(self.rect(), local)
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
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

    fn label() -> TextAnnotation {
        let mut text = TextAnnotation::new("Kitchen", Point::new(100.0, 100.0), 20.0);
        text.width = 100.0;
        text.height = 20.0;
        text
    }

    #[test]
    fn test_remeasure_adds_padding() {
        let mut text = TextAnnotation::new("abcd", Point::ZERO, 10.0);
        text.remeasure(&ApproximateMeasurer);
        assert!((text.width - (4.0 * 6.0 + 8.0)).abs() < 1e-9);
        assert!((text.height - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_unrotated() {
        let text = label();
        assert!(text.hit_test(Point::new(150.0, 110.0)));
        assert!(!text.hit_test(Point::new(150.0, 130.0)));
    }

    #[test]
    fn test_hit_rotated_quarter_turn() {
        let mut text = label();
        text.rotation = 90.0;
        // Center is (150, 110); rotated box spans x 140..160, y 60..160.
        assert!(text.hit_test(Point::new(150.0, 65.0)));
        assert!(!text.hit_test(Point::new(105.0, 110.0)));
    }

    #[test]
    fn test_font_clamp() {
        let mut text = label();
        text.scale_font(100.0);
        assert!((text.font_size - MAX_FONT_SIZE).abs() < f64::EPSILON);
        text.scale_font(0.01);
        assert!((text.font_size - MIN_FONT_SIZE).abs() < f64::EPSILON);
    }
}
