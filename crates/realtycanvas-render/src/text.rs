//! Glyph metrics and rasterisation with ab_glyph.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use realtycanvas_core::{SerializableColor, TextMeasurer};
use std::sync::Once;
use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::renderer::{RenderResult, RendererError};

static MISSING_FONT: Once = Once::new();

/// Parse a TrueType/OpenType font.
pub fn load_font(bytes: Vec<u8>) -> RenderResult<FontArc> {
    FontArc::try_from_vec(bytes).map_err(|e| RendererError::InitFailed(format!("invalid font: {e}")))
}

/// Scale at which one em equals `font_size` pixels, like a CSS `px` size.
fn em_scale(font: &FontArc, font_size: f32) -> PxScale {
    match font.units_per_em() {
        Some(upem) if upem > 0.0 => PxScale::from(font_size * font.height_unscaled() / upem),
        _ => PxScale::from(font_size),
    }
}

fn advance_width(font: &FontArc, text: &str, font_size: f32) -> f32 {
    let scaled = font.as_scaled(em_scale(font, font_size));
    let mut width = 0.0;
    let mut previous: Option<GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// [`TextMeasurer`] backed by real glyph advances.
#[derive(Clone)]
pub struct GlyphMeasurer {
    font: FontArc,
}

impl GlyphMeasurer {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }
}

impl TextMeasurer for GlyphMeasurer {
    fn measure(&self, text: &str, font_size: f64, _font_family: &str) -> f64 {
        f64::from(advance_width(&self.font, text, font_size as f32))
    }
}

/// Draws text runs into pixmaps.
///
/// One face serves every font family. Without a face, glyphs are skipped and
/// only the surrounding plates are drawn.
#[derive(Clone, Default)]
pub struct TextRasterizer {
    font: Option<FontArc>,
}

impl TextRasterizer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// Measurer matching what this rasterizer draws.
    pub fn measurer(&self) -> Option<GlyphMeasurer> {
        self.font.clone().map(GlyphMeasurer::new)
    }

    /// Advance width of `text`; falls back to 0.6 em per character.
    pub fn width(&self, text: &str, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => advance_width(font, text, font_size),
            None => text.chars().count() as f32 * font_size * 0.6,
        }
    }

    /// Distance from the top of the line to the baseline.
    pub fn ascent(&self, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => font.as_scaled(em_scale(font, font_size)).ascent(),
            None => font_size * 0.8,
        }
    }

    /// Draw `text` with its baseline starting at (`x`, `baseline`).
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        x: f32,
        baseline: f32,
        font_size: f32,
        color: SerializableColor,
    ) {
        let Some(font) = &self.font else {
            if !text.is_empty() {
                MISSING_FONT.call_once(|| log::warn!("No font loaded, text glyphs are not drawn"));
            }
            return;
        };

        let scale = em_scale(font, font_size);
        let scaled = font.as_scaled(scale);
        let mut caret = point(x, baseline);
        let mut previous: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret.x += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, caret);
            caret.x += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i32 + gx as i32;
                    let py = bounds.min.y as i32 + gy as i32;
                    blend_pixel(pixmap, px, py, color, coverage);
                });
            }
        }
    }
}

/// Source-over one pixel of `color` at `coverage`.
fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: SerializableColor, coverage: f32) {
    if x < 0 || y < 0 || x >= pixmap.width() as i32 || y >= pixmap.height() as i32 {
        return;
    }
    let index = y as usize * pixmap.width() as usize + x as usize;
    let pixels = pixmap.pixels_mut();
    let dst = pixels[index];

    let src_alpha = f32::from(color.a) / 255.0 * coverage.clamp(0.0, 1.0);
    let inv = 1.0 - src_alpha;
    let alpha = (255.0 * src_alpha + f32::from(dst.alpha()) * inv).round().min(255.0) as u8;
    let channel = |src: u8, dst: u8| -> u8 {
        let value = (f32::from(src) * src_alpha + f32::from(dst) * inv).round();
        (value as u8).min(alpha)
    };
    let r = channel(color.r, dst.red());
    let g = channel(color.g, dst.green());
    let b = channel(color.b, dst.blue());

    if let Some(blended) = PremultipliedColorU8::from_rgba(r, g, b, alpha) {
        pixels[index] = blended;
    }
}
