//! Flattening the canvas into an encoded image.

use image::{DynamicImage, RgbaImage};
use peniko::Color;
use realtycanvas_core::canvas::Canvas;
use realtycanvas_core::files::{self, ImageFormat};
use realtycanvas_core::settings::{CanvasSize, NewExportRecord};
use realtycanvas_core::ExportFormat;
use std::time::{Duration, Instant};

use crate::raster::{RasterRenderer, pixmap_to_rgba};
use crate::renderer::{RenderContext, RenderResult, RendererError};

/// An encoded export plus the facts recorded in the export history.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub quality: f64,
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
    pub includes_logos: bool,
    pub includes_measurements: bool,
    pub includes_annotations: bool,
}

impl ExportedImage {
    /// Export-history entry for this image.
    pub fn record(&self, filename: impl Into<String>) -> NewExportRecord {
        NewExportRecord {
            filename: filename.into(),
            format: self.format,
            quality: self.quality,
            file_size: self.bytes.len() as u64,
            thumbnail: None,
            duration: self.duration.as_millis() as u64,
            canvas_size: CanvasSize {
                width: self.width,
                height: self.height,
            },
            includes_logos: self.includes_logos,
            includes_measurements: self.includes_measurements,
            includes_annotations: self.includes_annotations,
        }
    }
}

/// Compose every visible layer (no grid, previews or selection) at the
/// canvas size and encode it. `quality` is in `0.0..=1.0` and only affects JPEG.
pub fn export(
    canvas: &Canvas,
    renderer: &mut RasterRenderer,
    format: ExportFormat,
    quality: f64,
) -> RenderResult<ExportedImage> {
    let started = Instant::now();
    let mut ctx = RenderContext::export(canvas);
    if format == ExportFormat::Jpg {
        // JPEG has no alpha; flatten onto white.
        ctx = ctx.with_background(Color::WHITE);
    }
    let frame = renderer.compose(&ctx)?;
    let (width, height) = (frame.width(), frame.height());
    let rgba = pixmap_to_rgba(&frame);

    let bytes = match format {
        ExportFormat::Png => encode_png(&rgba, width, height)?,
        ExportFormat::Jpg => encode_with_image(rgba, width, height, ImageFormat::Jpeg, quality)?,
        ExportFormat::Webp => encode_with_image(rgba, width, height, ImageFormat::WebP, quality)?,
    };

    let document = canvas.document();
    let exported = ExportedImage {
        format,
        quality,
        width,
        height,
        duration: started.elapsed(),
        includes_logos: !document.logos.is_empty(),
        includes_measurements: canvas.show_measurements && !document.measurements.is_empty(),
        includes_annotations: !document.texts.is_empty() || !document.arrows.is_empty(),
        bytes,
    };
    log::info!(
        "Exported {}x{} {} ({} bytes) in {:?}",
        width,
        height,
        format.extension(),
        exported.bytes.len(),
        exported.duration
    );
    Ok(exported)
}

/// Encode straight RGBA8 as PNG.
pub fn encode_png(rgba: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(e.to_string()))?;
        writer
            .write_image_data(rgba)
            .map_err(|e| RendererError::Encode(e.to_string()))?;
        writer.finish().map_err(|e| RendererError::Encode(e.to_string()))?;
    }
    Ok(bytes)
}

fn encode_with_image(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    format: ImageFormat,
    quality: f64,
) -> RenderResult<Vec<u8>> {
    let buffer = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| RendererError::Encode("pixel buffer does not match the frame size".to_string()))?;
    files::encode_image(&DynamicImage::ImageRgba8(buffer), format, quality)
        .map_err(|e| RendererError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use realtycanvas_core::{RasterImage, Settings, Shape};

    fn canvas_with_photo() -> Canvas {
        let mut canvas = Canvas::new(Settings::default());
        canvas.set_background(RasterImage::new(8, 6, [10, 20, 30, 255].repeat(48)));
        canvas
    }

    #[test]
    fn test_png_export_round_trip() {
        let mut canvas = canvas_with_photo();
        canvas.add_shape(Shape::rectangle(Point::new(1.0, 1.0), Point::new(6.0, 4.0)));
        let mut renderer = RasterRenderer::default();

        let exported = export(&canvas, &mut renderer, ExportFormat::Png, 0.9).unwrap();
        assert_eq!((exported.width, exported.height), (8, 6));
        assert!(!exported.includes_logos);

        let decoded = image::load_from_memory(&exported.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(7, 5).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_export_has_no_selection_overlay() {
        let mut canvas = canvas_with_photo();
        let id = canvas.add_shape(Shape::rectangle(Point::new(3.0, 3.0), Point::new(4.0, 4.0)));
        canvas.select(realtycanvas_core::ElementRef::shape(id));
        let exported = export(&canvas, &mut RasterRenderer::default(), ExportFormat::Png, 1.0).unwrap();
        let decoded = image::load_from_memory(&exported.bytes).unwrap().to_rgba8();
        // Outline would sit 5px outside the rectangle.
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_jpeg_and_webp_export() {
        let canvas = canvas_with_photo();
        let mut renderer = RasterRenderer::default();

        let jpeg = export(&canvas, &mut renderer, ExportFormat::Jpg, 0.8).unwrap();
        assert_eq!(&jpeg.bytes[..2], &[0xFF, 0xD8]);

        let webp = export(&canvas, &mut renderer, ExportFormat::Webp, 0.8).unwrap();
        assert_eq!(&webp.bytes[..4], b"RIFF");
    }

    #[test]
    fn test_export_record() {
        let canvas = canvas_with_photo();
        let exported = export(&canvas, &mut RasterRenderer::default(), ExportFormat::Png, 0.9).unwrap();
        let record = exported.record("listing.png");
        assert_eq!(record.filename, "listing.png");
        assert_eq!(record.file_size, exported.bytes.len() as u64);
        assert_eq!(record.canvas_size, CanvasSize { width: 8, height: 6 });

        let mut settings = Settings::default();
        assert!(settings.add_export_record(record).is_some());
        assert_eq!(settings.export_history.len(), 1);
    }
}
