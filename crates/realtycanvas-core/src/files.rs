//! Image file validation, decoding and re-encoding helpers.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::Arc;
use thiserror::Error;

/// MIME types accepted for photo import.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
    "image/tiff",
    "image/tif",
];

/// Largest accepted file (50 MB).
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const RECOMMENDED_MAX_WIDTH: u32 = 1920;
pub const RECOMMENDED_MAX_HEIGHT: u32 = 1080;
/// Hard cap applied even when the original size is preserved (16K).
pub const ABSOLUTE_MAX_WIDTH: u32 = 15360;
pub const ABSOLUTE_MAX_HEIGHT: u32 = 8640;
/// Default thumbnail edge length.
pub const THUMBNAIL_SIZE: u32 = 150;

/// Image import errors.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Not an image: {0}")]
    InvalidType(String),
    #[error("Unsupported file format '{0}'. Please use: JPG, PNG, WebP, HEIC, or TIFF")]
    Unsupported(String),
    #[error("File too large ({0} bytes). Maximum size is {max}MB", max = MAX_FILE_SIZE / (1024 * 1024))]
    TooLarge(u64),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Decoded pixels (straight RGBA8, row major), shared cheaply between snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: Arc::new(pixels),
        }
    }

    /// Decode any supported encoded image.
    pub fn decode(bytes: &[u8]) -> ImportResult<Self> {
        let (width, height, pixels) = decode_rgba(bytes)?;
        Ok(Self::new(width, height, pixels))
    }

    /// Resident size of the decoded pixels.
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

/// Output format for re-encoded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }
}

/// Decode encoded bytes into straight RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> ImportResult<(u32, u32, Vec<u8>)> {
    let img = image::load_from_memory(bytes).map_err(|e| ImportError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

/// MIME type guessed from a file name's extension.
pub fn mime_from_filename(name: &str) -> Option<&'static str> {
    let mime = match file_extension(name).to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "tif" | "tiff" => "image/tiff",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// Check type and size before any decoding is attempted.
pub fn validate_image_file(mime: &str, size: u64) -> ImportResult<()> {
    let mime = mime.to_ascii_lowercase();
    if !SUPPORTED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ImportError::Unsupported(mime));
    }
    if size > MAX_FILE_SIZE {
        return Err(ImportError::TooLarge(size));
    }
    if mime.contains("heic") || mime.contains("heif") {
        log::warn!("HEIC format detected - decoding may not be supported");
    }
    Ok(())
}

/// Fit `(width, height)` inside the bounds keeping the aspect ratio. Never upscales.
pub fn calculate_optimal_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    (
        (width as f64 * scale).round() as u32,
        (height as f64 * scale).round() as u32,
    )
}

/// Options for [`process_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality in `0.0..=1.0` (ignored for PNG and lossless WebP).
    pub quality: f64,
    pub format: ImageFormat,
    pub preserve_original_size: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            max_width: RECOMMENDED_MAX_WIDTH,
            max_height: RECOMMENDED_MAX_HEIGHT,
            quality: 0.9,
            format: ImageFormat::Jpeg,
            preserve_original_size: false,
        }
    }
}

/// Result of [`process_image`].
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub original_size: (u32, u32),
    pub processed_size: (u32, u32),
    /// Percent saved relative to the input bytes (negative when the output grew).
    pub compression_ratio: i64,
}

/// Decode, resize and re-encode an imported photo.
pub fn process_image(bytes: &[u8], options: &ProcessOptions) -> ImportResult<ProcessedImage> {
    let img = image::load_from_memory(bytes).map_err(|e| ImportError::Decode(e.to_string()))?;
    let original = (img.width(), img.height());

    let (mut width, mut height) = if options.preserve_original_size {
        original
    } else {
        calculate_optimal_dimensions(original.0, original.1, options.max_width, options.max_height)
    };

    if options.preserve_original_size && (width > ABSOLUTE_MAX_WIDTH || height > ABSOLUTE_MAX_HEIGHT) {
        let scale = (ABSOLUTE_MAX_WIDTH as f64 / width as f64).min(ABSOLUTE_MAX_HEIGHT as f64 / height as f64);
        width = (width as f64 * scale).round() as u32;
        height = (height as f64 * scale).round() as u32;
        log::warn!(
            "Image too large ({}x{}), scaled down to {}x{} for memory safety",
            original.0,
            original.1,
            width,
            height
        );
    }

    let resized = if (width, height) == original {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };
    let encoded = encode_image(&resized, options.format, options.quality)?;
    let ratio = if bytes.is_empty() {
        0
    } else {
        ((1.0 - encoded.len() as f64 / bytes.len() as f64) * 100.0).round() as i64
    };

    log::debug!(
        "Processed image {}x{} -> {}x{} ({} -> {} bytes)",
        original.0,
        original.1,
        width,
        height,
        bytes.len(),
        encoded.len()
    );

    Ok(ProcessedImage {
        bytes: encoded,
        format: options.format,
        original_size: original,
        processed_size: (width, height),
        compression_ratio: ratio,
    })
}

/// Encode a decoded image. `quality` is in `0.0..=1.0`.
pub fn encode_image(img: &DynamicImage, format: ImageFormat, quality: f64) -> ImportResult<Vec<u8>> {
    let mut out = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality)))
        }
        ImageFormat::Png => img.write_with_encoder(PngEncoder::new(&mut out)),
        ImageFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))
        }
    };
    result.map_err(|e| ImportError::Encode(e.to_string()))?;
    Ok(out)
}

/// Map a `0.0..=1.0` quality onto the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Basic facts about an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub format: String,
    pub has_exif: bool,
}

pub fn image_metadata(bytes: &[u8], mime: &str) -> ImportResult<ImageMetadata> {
    let img = image::load_from_memory(bytes).map_err(|e| ImportError::Decode(e.to_string()))?;
    Ok(ImageMetadata {
        width: img.width(),
        height: img.height(),
        file_size: bytes.len() as u64,
        format: mime.to_string(),
        has_exif: mime.contains("jpeg") || mime.contains("jpg") || mime.contains("tiff"),
    })
}

/// Square, cover-scaled JPEG thumbnail as a `data:` URL.
pub fn create_thumbnail(bytes: &[u8], size: u32) -> ImportResult<String> {
    let img = image::load_from_memory(bytes).map_err(|e| ImportError::Decode(e.to_string()))?;
    let size = size.max(1);
    let min_dim = img.width().min(img.height()).max(1);
    let scale = size as f64 / min_dim as f64;
    let scaled_w = ((img.width() as f64 * scale).round() as u32).max(1);
    let scaled_h = ((img.height() as f64 * scale).round() as u32).max(1);
    let scaled = img.resize_exact(scaled_w, scaled_h, FilterType::Triangle).to_rgba8();

    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([0xf3, 0xf4, 0xf6, 0xff]));
    let offset_x = (size as i64 - scaled_w as i64) / 2;
    let offset_y = (size as i64 - scaled_h as i64) / 2;
    image::imageops::overlay(&mut canvas, &scaled, offset_x, offset_y);

    let jpeg = encode_image(&DynamicImage::ImageRgba8(canvas), ImageFormat::Jpeg, 0.8)?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)))
}

/// Human-readable size with at most two decimals (`"1.5 KB"`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Text after the last dot, or empty for dot-less and dot-file names.
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx + 1..],
        _ => "",
    }
}

/// `{prefix}-{timestamp}.{ext}` with `:` and `.` in the timestamp replaced by `-`.
pub fn generate_filename(prefix: &str, extension: &str) -> String {
    generate_filename_at(prefix, extension, Utc::now())
}

pub fn generate_filename_at(prefix: &str, extension: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("{prefix}-{stamp}.{extension}")
}
