//! RealtyCanvas Render Library
//!
//! Renderer abstraction plus a CPU implementation for RealtyCanvas.
//! The raster renderer uses tiny-skia for paths and ab_glyph for text.

mod export;
mod raster;
mod renderer;
mod session;
mod text;

pub use export::{ExportedImage, encode_png, export};
pub use raster::{RasterRenderer, pixmap_to_rgba};
pub use renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
pub use session::Session;
pub use text::{GlyphMeasurer, TextRasterizer, load_font};

pub use ab_glyph::FontArc;
