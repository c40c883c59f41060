//! Logo overlays (branding images placed on the annotation layer).

use super::{Element, ElementId, SerializableColor};
use crate::files::{ImportError, ImportResult, RasterImage};
use crate::geometry::rect_contains;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound for logo scale, in percent.
pub const MAX_LOGO_SCALE: f64 = 500.0;

/// A pending image load for a logo.
///
/// The ticket remembers the logo generation it was issued for; resolving a
/// ticket whose logo was deleted or whose source changed afterwards is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoLoad {
    pub logo_id: ElementId,
    pub generation: u64,
    pub src: String,
}

impl LogoLoad {
    /// Decode the source (`data:` URL or bare base64) into pixels.
    pub fn decode(&self) -> ImportResult<RasterImage> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let payload = match self.src.split_once(',') {
            Some((header, data)) if header.starts_with("data:") => data,
            _ => self.src.as_str(),
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ImportError::Decode(format!("logo source is not base64: {e}")))?;
        RasterImage::decode(&bytes)
    }
}

/// A logo placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Logo {
    pub(crate) id: ElementId,
    pub name: String,
    /// Encoded image source (data URL or base64).
    pub src: String,
    /// Present once the load for the current generation resolved.
    #[serde(skip)]
    pub image: Option<RasterImage>,
    pub position: Point,
    /// Scale in percent.
    pub scale: f64,
    /// Opacity in percent.
    pub opacity: f64,
    pub visible: bool,
    /// Rotation in degrees, about the center.
    pub rotation: f64,
    pub has_background: bool,
    pub background_color: SerializableColor,
    pub background_padding: f64,
    pub background_radius: f64,
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl Logo {
    pub fn new(name: impl Into<String>, src: impl Into<String>, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            src: src.into(),
            image: None,
            position,
            scale: 100.0,
            opacity: 100.0,
            visible: true,
            rotation: 0.0,
            has_background: false,
            background_color: SerializableColor::white(),
            background_padding: 10.0,
            background_radius: 8.0,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Ticket for loading the current source.
    pub fn load_ticket(&self) -> LogoLoad {
        LogoLoad {
            logo_id: self.id,
            generation: self.generation,
            src: self.src.clone(),
        }
    }

    /// Drawn size: image dimensions times scale.
    pub fn scaled_size(&self) -> Option<(f64, f64)> {
        self.image.as_ref().map(|img| {
            let factor = self.scale / 100.0;
            (img.width as f64 * factor, img.height as f64 * factor)
        })
    }

    pub fn rect(&self) -> Option<Rect> {
        let (w, h) = self.scaled_size()?;
        Some(Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + w,
            self.position.y + h,
        ))
    }

    /// Multiply the scale, capped at [`MAX_LOGO_SCALE`].
    pub fn apply_scale_factor(&mut self, factor: f64) {
        self.scale = (self.scale * factor).min(MAX_LOGO_SCALE);
    }
}

impl Element for Logo {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        self.rect()
    }

    fn hit_test(&self, point: Point) -> bool {
        self.visible && self.rect().is_some_and(|r| rect_contains(r, point))
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
