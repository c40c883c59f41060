//! Drawable element definitions.

mod arrow;
mod logo;
mod measurement;
mod path;
mod shape;
mod text;

pub use arrow::{ARROW_HEAD_LENGTH, ARROW_PREVIEW_HEAD_LENGTH, Arrow};
pub use logo::{Logo, LogoLoad, MAX_LOGO_SCALE};
pub use measurement::{
    Measurement, MeasurementKind, MeasurementUnit, RealWorldValue, calculate_area, calculate_distance,
};
pub use path::{AnchorPoint, PATH_HIT_SLOP, VectorPath};
pub use shape::{Shape, ShapeKind};
pub use text::{ApproximateMeasurer, MAX_FONT_SIZE, MIN_FONT_SIZE, TextAnnotation, TextMeasurer};

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for elements and anchor points.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. Anything else falls back to black.
    pub fn from_hex(color: &str) -> Self {
        let Some(hex) = color.trim().strip_prefix('#') else {
            return Self::black();
        };
        if !hex.is_ascii() {
            return Self::black();
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let parsed = match hex.len() {
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                match (short(0), short(1), short(2)) {
                    (Some(r), Some(g), Some(b)) => Some(Self::rgb(r, g, b)),
                    _ => None,
                }
            }
            6 | 8 => {
                let a = if hex.len() == 8 { channel(&hex[6..8]) } else { Some(255) };
                match (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6]), a) {
                    (Some(r), Some(g), Some(b), Some(a)) => Some(Self::new(r, g, b, a)),
                    _ => None,
                }
            }
            _ => None,
        };
        parsed.unwrap_or_else(Self::black)
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Same color with its alpha multiplied by `factor` (0.0..=1.0).
    pub fn with_alpha_factor(&self, factor: f64) -> Self {
        let alpha = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self::new(self.r, self.g, self.b, alpha)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Discriminant over the element collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    Shape,
    VectorPath,
    Text,
    Logo,
    Arrow,
    Measurement,
}

/// Typed reference into one of the element collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: ElementId,
}

impl ElementRef {
    pub fn new(kind: ElementKind, id: ElementId) -> Self {
        Self { kind, id }
    }

    pub fn shape(id: ElementId) -> Self {
        Self::new(ElementKind::Shape, id)
    }

    pub fn path(id: ElementId) -> Self {
        Self::new(ElementKind::VectorPath, id)
    }

    pub fn text(id: ElementId) -> Self {
        Self::new(ElementKind::Text, id)
    }

    pub fn logo(id: ElementId) -> Self {
        Self::new(ElementKind::Logo, id)
    }

    pub fn arrow(id: ElementId) -> Self {
        Self::new(ElementKind::Arrow, id)
    }

    pub fn measurement(id: ElementId) -> Self {
        Self::new(ElementKind::Measurement, id)
    }
}

/// Behavior common to all drawable elements.
pub trait Element {
    /// Get the unique identifier.
    fn id(&self) -> ElementId;

    /// Axis-aligned bounding box, `None` while the element has no extent
    /// (e.g. a logo whose image has not resolved yet).
    fn bounds(&self) -> Option<Rect>;

    /// Check if a point hits this element.
    fn hit_test(&self, point: Point) -> bool;

    /// Move every positional field by `delta`.
    fn translate(&mut self, delta: Vec2);

    /// Replace the identifier with a fresh one (used when duplicating).
    fn regenerate_id(&mut self);

    fn is_visible(&self) -> bool;
}
