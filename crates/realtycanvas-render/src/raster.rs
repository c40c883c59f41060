//! CPU raster renderer built on tiny-skia.
//!
//! Every frame is redrawn from scratch: each visible layer is painted into
//! its own pixmap and composited with the layer opacity, then the grid, tool
//! previews and the selection overlay go on top.

use kurbo::{BezPath, Circle, Line, PathEl, Point, Rect, RoundedRect, Shape as KurboShape};
use realtycanvas_core::canvas::Canvas;
use realtycanvas_core::elements::{ARROW_HEAD_LENGTH, ARROW_PREVIEW_HEAD_LENGTH};
use realtycanvas_core::layer::LayerId;
use realtycanvas_core::selection::{HandleKind, ROTATION_HANDLE_RADIUS, get_handles};
use realtycanvas_core::{
    Arrow, CanvasDocument, Element, ElementId, ElementKind, Logo, Measurement, MeasurementKind, Preview, RasterImage,
    SerializableColor, Shape, ShapeKind, TextAnnotation, VectorPath,
};
use std::sync::Arc;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    StrokeDash, Transform,
};

use crate::renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
use crate::text::TextRasterizer;

const SELECTION_COLOR: SerializableColor = SerializableColor::rgb(0x00, 0x66, 0xff);
const HANDLE_COLOR: SerializableColor = SerializableColor::rgb(0x00, 0x7a, 0xcc);
const CLOSE_HINT_COLOR: SerializableColor = SerializableColor::rgb(0x00, 0xff, 0x00);
const MEASUREMENT_COLOR: SerializableColor = SerializableColor::rgb(0xff, 0x6b, 0x35);

const MEASUREMENT_FONT_SIZE: f32 = 12.0;
const GUIDE_FONT_SIZE: f32 = 11.0;
/// Guides shorter than this get no length label.
const GUIDE_LABEL_MIN_LENGTH: f64 = 20.0;
/// Horizontal and vertical padding of a text annotation's plate.
const TEXT_PLATE_PAD: (f64, f64) = (4.0, 2.0);

/// An image converted to premultiplied pixels, kept while its source is on the canvas.
struct CachedImage {
    pixels: Arc<Vec<u8>>,
    pixmap: Pixmap,
    used: bool,
}

#[derive(Default)]
struct ImageCache {
    entries: Vec<CachedImage>,
}

impl ImageCache {
    fn get(&mut self, image: &RasterImage) -> Option<&Pixmap> {
        let index = match self.entries.iter().position(|e| Arc::ptr_eq(&e.pixels, &image.pixels)) {
            Some(index) => index,
            None => {
                let pixmap = image_to_pixmap(image)?;
                self.entries.push(CachedImage {
                    pixels: Arc::clone(&image.pixels),
                    pixmap,
                    used: false,
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];
        entry.used = true;
        Some(&entry.pixmap)
    }

    /// Drop images that were not drawn since the last sweep.
    fn sweep(&mut self) {
        self.entries.retain(|e| e.used);
        for entry in &mut self.entries {
            entry.used = false;
        }
    }
}

/// Software renderer producing a [`Pixmap`] per frame.
#[derive(Default)]
pub struct RasterRenderer {
    text: TextRasterizer,
    images: ImageCache,
    frame: Option<Pixmap>,
}

impl RasterRenderer {
    pub fn new(text: TextRasterizer) -> Self {
        Self {
            text,
            images: ImageCache::default(),
            frame: None,
        }
    }

    pub fn text(&self) -> &TextRasterizer {
        &self.text
    }

    /// The last rendered frame.
    pub fn frame(&self) -> Option<&Pixmap> {
        self.frame.as_ref()
    }

    /// The last frame as straight (non-premultiplied) RGBA8.
    pub fn frame_rgba(&self) -> Option<Vec<u8>> {
        self.frame.as_ref().map(pixmap_to_rgba)
    }

    /// Draw a complete frame sized to the canvas document.
    pub fn compose(&mut self, ctx: &RenderContext) -> RenderResult<Pixmap> {
        let canvas = ctx.canvas;
        let document = canvas.document();
        let (width, height) = (document.width, document.height);
        let mut frame = new_surface(width, height)?;

        let background = SerializableColor::from(self.background_color(ctx));
        frame.fill(tiny_skia::Color::from_rgba8(
            background.r,
            background.g,
            background.b,
            background.a,
        ));

        for layer in canvas.layers().iter() {
            if !layer.visible {
                continue;
            }
            let mut target = new_surface(width, height)?;
            match layer.id {
                LayerId::Background => {
                    if let Some(image) = document.background.as_ref().and_then(|bg| self.images.get(bg)) {
                        target.draw_pixmap(0, 0, image.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
                    }
                }
                LayerId::PropertyLines => {
                    let hidden = if ctx.show_overlay { canvas.editing_text() } else { None };
                    draw_property_lines(&mut target, canvas, hidden, &self.text);
                }
                LayerId::Annotations => draw_annotations(&mut target, document, &mut self.images),
            }
            let paint = PixmapPaint {
                opacity: (layer.opacity / 100.0).clamp(0.0, 1.0) as f32,
                ..PixmapPaint::default()
            };
            frame.draw_pixmap(0, 0, target.as_ref(), &paint, Transform::identity(), None);
        }
        self.images.sweep();

        draw_grid(&mut frame, ctx.grid_style, ctx.grid_size);

        if ctx.show_overlay {
            for preview in canvas.preview() {
                draw_preview(&mut frame, canvas, &preview, &self.text);
            }
            if let Some((start, end)) = ctx.arrow_preview {
                let color = SerializableColor::from_hex(&canvas.color);
                draw_arrow(&mut frame, start, end, color, canvas.brush_size, ARROW_PREVIEW_HEAD_LENGTH);
            }
            draw_selection(&mut frame, canvas);
        }

        Ok(frame)
    }
}

impl Renderer for RasterRenderer {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let frame = self.compose(ctx)?;
        self.frame = Some(frame);
        Ok(())
    }
}

fn new_surface(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| RendererError::Surface(format!("cannot allocate {width}x{height} surface")))
}

/// Straight RGBA8 copy of a premultiplied pixmap.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect()
}

fn image_to_pixmap(image: &RasterImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width, image.height)?;
    if image.pixels.len() != pixmap.data().len() {
        log::warn!(
            "Image buffer has {} bytes, expected {} for {}x{}",
            image.pixels.len(),
            pixmap.data().len(),
            image.width,
            image.height
        );
        return None;
    }
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels.chunks_exact(4)) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}

// --- Primitive helpers ---

fn paint(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn skia_path(shape: &impl KurboShape) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in shape.path_elements(0.1) {
        match el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(a, b) => pb.quad_to(a.x as f32, a.y as f32, b.x as f32, b.y as f32),
            PathEl::CurveTo(a, b, c) => {
                pb.cubic_to(a.x as f32, a.y as f32, b.x as f32, b.y as f32, c.x as f32, c.y as f32)
            }
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn polyline(points: &[Point], closed: bool) -> BezPath {
    let mut path = BezPath::new();
    for (i, p) in points.iter().enumerate() {
        if i == 0 {
            path.move_to(*p);
        } else {
            path.line_to(*p);
        }
    }
    if closed && points.len() > 2 {
        path.close_path();
    }
    path
}

fn plain_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        ..Default::default()
    }
}

fn round_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

fn dashed_stroke(width: f64, on: f32, off: f32) -> Stroke {
    Stroke {
        width: width as f32,
        dash: StrokeDash::new(vec![on, off], 0.0),
        ..Default::default()
    }
}

fn fill_shape(target: &mut Pixmap, shape: &impl KurboShape, color: SerializableColor, transform: Transform) {
    if let Some(path) = skia_path(shape) {
        target.fill_path(&path, &paint(color), FillRule::Winding, transform, None);
    }
}

fn stroke_shape(
    target: &mut Pixmap,
    shape: &impl KurboShape,
    color: SerializableColor,
    stroke: &Stroke,
    transform: Transform,
) {
    if let Some(path) = skia_path(shape) {
        target.stroke_path(&path, &paint(color), stroke, transform, None);
    }
}

fn dot(target: &mut Pixmap, center: Point, radius: f64, color: SerializableColor) {
    fill_shape(target, &Circle::new(center, radius), color, Transform::identity());
}

/// Square of side `size` centred on `center`.
fn square(center: Point, size: f64) -> Rect {
    Rect::from_center_size(center, (size, size))
}

fn rotation_about(degrees: f64, pivot: Point) -> Transform {
    if degrees == 0.0 {
        Transform::identity()
    } else {
        Transform::from_rotate_at(degrees as f32, pivot.x as f32, pivot.y as f32)
    }
}

/// Draw an offscreen `layer` placed at `origin`, rotated about `pivot`.
fn composite(target: &mut Pixmap, layer: &Pixmap, origin: Point, degrees: f64, pivot: Point, opacity: f64) {
    let transform =
        Transform::from_translate(origin.x as f32, origin.y as f32).post_concat(rotation_about(degrees, pivot));
    let paint = PixmapPaint {
        opacity: opacity.clamp(0.0, 1.0) as f32,
        quality: if degrees == 0.0 {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        },
        ..PixmapPaint::default()
    };
    target.draw_pixmap(0, 0, layer.as_ref(), &paint, transform, None);
}

/// Offscreen surface of at least one pixel.
fn scratch(width: f64, height: f64) -> Option<Pixmap> {
    Pixmap::new(width.ceil().max(1.0) as u32, height.ceil().max(1.0) as u32)
}

// --- Layers ---

/// Shapes, paths, measurements (when shown) and text, in that order. The
/// annotation open in the text input (`hidden`) is drawn by the overlay instead.
fn draw_property_lines(target: &mut Pixmap, canvas: &Canvas, hidden: Option<ElementId>, text: &TextRasterizer) {
    let document = canvas.document();
    for shape in document.shapes.iter().filter(|s| s.visible) {
        draw_shape(target, shape);
    }
    for path in document.paths.iter().filter(|p| p.visible) {
        draw_path(target, path);
    }
    if canvas.show_measurements {
        for measurement in document.measurements.iter().filter(|m| m.visible && m.is_complete()) {
            draw_measurement(target, measurement, text);
        }
    }
    for annotation in document.texts.iter().filter(|t| t.visible && Some(t.id()) != hidden) {
        draw_text_annotation(target, annotation, text);
    }
}

/// Logos, then arrows.
fn draw_annotations(target: &mut Pixmap, document: &CanvasDocument, images: &mut ImageCache) {
    for logo in document.logos.iter().filter(|l| l.visible) {
        draw_logo(target, logo, images);
    }
    for arrow in document.arrows.iter().filter(|a| a.visible) {
        draw_arrow(target, arrow.start, arrow.end, arrow.color, arrow.width, ARROW_HEAD_LENGTH);
    }
}

fn draw_shape(target: &mut Pixmap, shape: &Shape) {
    let factor = shape.opacity / 100.0;
    let color = shape.color.with_alpha_factor(factor);
    let stroke = plain_stroke(shape.stroke_width);
    match shape.kind {
        ShapeKind::Rectangle => {
            let rect = shape.normalized();
            if let Some(fill) = shape.fill {
                fill_shape(target, &rect, fill.with_alpha_factor(factor), Transform::identity());
            }
            stroke_shape(target, &rect, color, &stroke, Transform::identity());
        }
        ShapeKind::Circle => {
            let circle = Circle::new(shape.start, shape.radius());
            if let Some(fill) = shape.fill {
                fill_shape(target, &circle, fill.with_alpha_factor(factor), Transform::identity());
            }
            stroke_shape(target, &circle, color, &stroke, Transform::identity());
        }
    }
}

fn draw_path(target: &mut Pixmap, path: &VectorPath) {
    let points = path.positions();
    if points.len() < 2 {
        return;
    }
    let outline = polyline(&points, path.closed);
    stroke_shape(target, &outline, path.stroke, &round_stroke(path.stroke_width), Transform::identity());
    if path.closed {
        if let Some(fill) = path.fill {
            fill_shape(target, &outline, fill, Transform::identity());
        }
    }
}

/// White plate with a label; `text_at` is the baseline start.
#[allow(clippy::too_many_arguments)]
fn draw_label(
    target: &mut Pixmap,
    text: &TextRasterizer,
    label: &str,
    plate: Rect,
    text_at: Point,
    size: f32,
    plate_color: SerializableColor,
    color: SerializableColor,
) {
    fill_shape(target, &plate, plate_color, Transform::identity());
    text.draw(target, label, text_at.x as f32, text_at.y as f32, size, color);
}

fn draw_measurement(target: &mut Pixmap, measurement: &Measurement, text: &TextRasterizer) {
    let color = measurement.color;
    let points = &measurement.points;
    match measurement.kind {
        MeasurementKind::Distance => {
            let (a, b) = (points[0], points[1]);
            stroke_shape(target, &Line::new(a, b), color, &plain_stroke(2.0), Transform::identity());
            dot(target, a, 4.0, color);
            dot(target, b, 4.0, color);
            let mid = a.midpoint(b);
            draw_label(
                target,
                text,
                &measurement.label,
                Rect::new(mid.x - 30.0, mid.y - 12.0, mid.x + 30.0, mid.y + 8.0),
                Point::new(mid.x - 25.0, mid.y + 2.0),
                MEASUREMENT_FONT_SIZE,
                SerializableColor::white(),
                color,
            );
        }
        MeasurementKind::Area => {
            let outline = polyline(points, true);
            stroke_shape(target, &outline, color, &plain_stroke(2.0), Transform::identity());
            fill_shape(target, &outline, color.with_alpha_factor(0.1), Transform::identity());
            for point in points {
                dot(target, *point, 4.0, color);
            }
            if let Some(c) = measurement.label_anchor() {
                draw_label(
                    target,
                    text,
                    &measurement.label,
                    Rect::new(c.x - 35.0, c.y - 12.0, c.x + 35.0, c.y + 8.0),
                    Point::new(c.x - 30.0, c.y + 2.0),
                    MEASUREMENT_FONT_SIZE,
                    SerializableColor::white(),
                    color,
                );
            }
        }
    }
}

/// Rotation pivot of a text annotation: the middle of the glyph run.
fn text_pivot(annotation: &TextAnnotation) -> Point {
    let glyph_width = (annotation.width - 2.0 * TEXT_PLATE_PAD.0).max(0.0);
    Point::new(
        annotation.position.x + glyph_width / 2.0,
        annotation.position.y + annotation.font_size / 2.0,
    )
}

fn draw_text_annotation(target: &mut Pixmap, annotation: &TextAnnotation, text: &TextRasterizer) {
    let (pad_x, pad_y) = TEXT_PLATE_PAD;
    // One pixel of margin so the plate border is not clipped.
    let margin = 1.0;
    let Some(mut local) = scratch(annotation.width + 2.0 * margin, annotation.height + 2.0 * margin) else {
        return;
    };

    if annotation.has_background {
        let plate = Rect::new(margin, margin, margin + annotation.width, margin + annotation.height);
        fill_shape(&mut local, &plate, annotation.background_color, Transform::identity());
        stroke_shape(&mut local, &plate, annotation.color, &plain_stroke(1.0), Transform::identity());
    }

    let size = annotation.font_size as f32;
    let x = (margin + pad_x) as f32;
    let top = (margin + pad_y) as f32;
    text.draw(&mut local, &annotation.text, x, top + text.ascent(size), size, annotation.color);

    let origin = Point::new(
        annotation.position.x - pad_x - margin,
        annotation.position.y - pad_y - margin,
    );
    composite(target, &local, origin, annotation.rotation, text_pivot(annotation), 1.0);
}

fn draw_logo(target: &mut Pixmap, logo: &Logo, images: &mut ImageCache) {
    // Unresolved logos are not drawn.
    let (Some(image), Some(rect)) = (logo.image.as_ref(), logo.rect()) else {
        return;
    };
    let Some(source) = images.get(image) else {
        return;
    };
    let pad = if logo.has_background {
        logo.background_padding.max(0.0)
    } else {
        0.0
    };
    let Some(mut local) = scratch(rect.width() + 2.0 * pad, rect.height() + 2.0 * pad) else {
        return;
    };

    if logo.has_background {
        let panel = RoundedRect::new(
            0.0,
            0.0,
            rect.width() + 2.0 * pad,
            rect.height() + 2.0 * pad,
            logo.background_radius,
        );
        fill_shape(&mut local, &panel, logo.background_color, Transform::identity());
    }

    let scale = (logo.scale / 100.0) as f32;
    let placement = Transform::from_scale(scale, scale).post_translate(pad as f32, pad as f32);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    local.draw_pixmap(0, 0, source.as_ref(), &paint, placement, None);

    let origin = Point::new(rect.x0 - pad, rect.y0 - pad);
    composite(target, &local, origin, logo.rotation, rect.center(), logo.opacity / 100.0);
}

fn draw_arrow(target: &mut Pixmap, start: Point, end: Point, color: SerializableColor, width: f64, head_length: f64) {
    stroke_shape(target, &Line::new(start, end), color, &round_stroke(width), Transform::identity());
    let [left, right] = Arrow::head_points(start, end, head_length);
    fill_shape(target, &polyline(&[end, left, right], true), color, Transform::identity());
}

fn draw_grid(frame: &mut Pixmap, style: GridStyle, size: f64) {
    if size < 2.0 {
        return;
    }
    let (width, height) = (f64::from(frame.width()), f64::from(frame.height()));
    let columns = (width / size).floor() as usize;
    let rows = (height / size).floor() as usize;

    match style {
        GridStyle::None => {}
        GridStyle::Lines => {
            let mut path = BezPath::new();
            for i in 0..=columns {
                let x = i as f64 * size;
                path.move_to((x, 0.0));
                path.line_to((x, height));
            }
            for j in 0..=rows {
                let y = j as f64 * size;
                path.move_to((0.0, y));
                path.line_to((width, y));
            }
            stroke_shape(
                frame,
                &path,
                SerializableColor::new(200, 200, 200, 100),
                &plain_stroke(0.5),
                Transform::identity(),
            );
        }
        GridStyle::Dots => {
            let mut path = BezPath::new();
            for i in 0..=columns {
                for j in 0..=rows {
                    path.extend(Circle::new((i as f64 * size, j as f64 * size), 1.0).path_elements(0.1));
                }
            }
            fill_shape(frame, &path, SerializableColor::new(180, 180, 180, 160), Transform::identity());
        }
    }
}

// --- Overlay ---

fn draw_preview(frame: &mut Pixmap, canvas: &Canvas, preview: &Preview, text: &TextRasterizer) {
    let brush = SerializableColor::from_hex(&canvas.color);
    match preview {
        Preview::Shape { kind, start, end } => {
            let shape = Shape::new(*kind, *start, *end).with_style(brush, canvas.brush_size, canvas.opacity);
            draw_shape(frame, &shape);
        }
        Preview::Path(path) => {
            draw_path(frame, path);
            let anchors = path.positions();
            for anchor in &anchors {
                dot(frame, *anchor, 4.0, SerializableColor::white());
                stroke_shape(
                    frame,
                    &Circle::new(*anchor, 4.0),
                    SerializableColor::black(),
                    &plain_stroke(1.0),
                    Transform::identity(),
                );
            }
            // Clicking the first anchor closes the path.
            if anchors.len() > 2 {
                dot(frame, anchors[0], 6.0, CLOSE_HINT_COLOR);
            }
        }
        Preview::Guide { from, to, length } => draw_guide(frame, canvas, *from, *to, *length, text),
        Preview::PenStart(at) => {
            dot(frame, *at, 4.0, brush.with_alpha_factor(0.7));
            stroke_shape(
                frame,
                &Circle::new(*at, 8.0),
                brush.with_alpha_factor(0.5),
                &plain_stroke(1.0),
                Transform::identity(),
            );
        }
        Preview::Ruler { start, end, .. } => {
            if let Some(measurement) = canvas.build_measurement(MeasurementKind::Distance, vec![*start, *end]) {
                draw_measurement(frame, &measurement, text);
            }
        }
        Preview::AreaOutline(points) => {
            stroke_shape(
                frame,
                &polyline(points, false),
                MEASUREMENT_COLOR,
                &plain_stroke(2.0),
                Transform::identity(),
            );
            for point in points {
                dot(frame, *point, 4.0, MEASUREMENT_COLOR);
            }
        }
        Preview::TextCursor { position, text: typed } => {
            // An edited annotation keeps its own style; new text uses the current settings.
            let edited = canvas.editing_text().and_then(|id| canvas.document().text(id));
            let mut annotation = match edited {
                Some(original) => {
                    let mut annotation = original.clone();
                    annotation.text = typed.clone();
                    annotation
                }
                None => {
                    let mut annotation = TextAnnotation::new(typed.clone(), *position, canvas.font_size);
                    annotation.font_family = canvas.font_family.clone();
                    annotation.color = SerializableColor::from_hex(&canvas.text_color);
                    annotation.background_color = SerializableColor::from_hex(&canvas.text_background_color);
                    annotation.has_background = canvas.text_background;
                    annotation
                }
            };
            annotation.remeasure(canvas.measurer());
            if !typed.is_empty() {
                draw_text_annotation(frame, &annotation, text);
            }
            let caret_x = position.x + annotation.width - 2.0 * TEXT_PLATE_PAD.0;
            stroke_shape(
                frame,
                &Line::new((caret_x, position.y), (caret_x, position.y + annotation.font_size)),
                annotation.color,
                &plain_stroke(1.0),
                Transform::identity(),
            );
        }
    }
}

/// Dashed rubber band from the last vertex to the pointer, labelled with its length.
fn draw_guide(frame: &mut Pixmap, canvas: &Canvas, from: Point, to: Point, length: f64, text: &TextRasterizer) {
    let brush = SerializableColor::from_hex(&canvas.color);
    let width = (canvas.brush_size * 0.7).max(1.0);
    stroke_shape(
        frame,
        &Line::new(from, to),
        brush.with_alpha_factor(0.8),
        &dashed_stroke(width, 6.0, 4.0),
        Transform::identity(),
    );
    dot(frame, to, 3.0, brush.with_alpha_factor(0.6));

    if length > GUIDE_LABEL_MIN_LENGTH {
        let label = format!("{}px", length.round());
        let label_width = f64::from(text.width(&label, GUIDE_FONT_SIZE));
        let mid = from.midpoint(to);
        let plate = Rect::new(
            mid.x - label_width / 2.0 - 4.0,
            mid.y - 7.0,
            mid.x + label_width / 2.0 + 4.0,
            mid.y + 7.0,
        );
        let baseline = mid.y + f64::from(text.ascent(GUIDE_FONT_SIZE)) / 2.0 - 1.0;
        draw_label(
            frame,
            text,
            &label,
            plate,
            Point::new(mid.x - label_width / 2.0, baseline),
            GUIDE_FONT_SIZE,
            SerializableColor::white().with_alpha_factor(0.9),
            SerializableColor::black().with_alpha_factor(0.8),
        );
    }
}

fn draw_handle_square(frame: &mut Pixmap, center: Point, size: f64, color: SerializableColor, transform: Transform) {
    fill_shape(frame, &square(center, size), color, transform);
}

/// Dashed outlines and handles for every selected element. Drawn regardless
/// of layer visibility.
fn draw_selection(frame: &mut Pixmap, canvas: &Canvas) {
    let document = canvas.document();
    let handles = get_handles(document, canvas.selection());
    let identity = Transform::identity();

    for target in canvas.selection() {
        let own_handles = handles.iter().filter(|h| h.target == *target);
        match target.kind {
            ElementKind::Shape => {
                let Some(shape) = document.shape(target.id) else { continue };
                let outline = dashed_stroke(2.0, 5.0, 5.0);
                match shape.kind {
                    ShapeKind::Rectangle => {
                        stroke_shape(frame, &shape.normalized().inflate(5.0, 5.0), SELECTION_COLOR, &outline, identity)
                    }
                    ShapeKind::Circle => stroke_shape(
                        frame,
                        &Circle::new(shape.start, shape.radius() + 5.0),
                        SELECTION_COLOR,
                        &outline,
                        identity,
                    ),
                }
                for handle in own_handles {
                    draw_handle_square(frame, handle.point, handle.size, SELECTION_COLOR, identity);
                }
            }
            ElementKind::VectorPath => {
                let Some(path) = document.path(target.id) else { continue };
                let points = path.positions();
                stroke_shape(
                    frame,
                    &polyline(&points, path.closed),
                    SELECTION_COLOR,
                    &dashed_stroke(3.0, 8.0, 4.0),
                    identity,
                );
                for point in &points {
                    dot(frame, *point, 4.0, SELECTION_COLOR);
                    stroke_shape(
                        frame,
                        &Circle::new(*point, 4.0),
                        SerializableColor::white(),
                        &plain_stroke(1.0),
                        identity,
                    );
                }
            }
            ElementKind::Arrow => {
                let Some(arrow) = document.arrow(target.id) else { continue };
                stroke_shape(
                    frame,
                    &Line::new(arrow.start, arrow.end),
                    HANDLE_COLOR,
                    &dashed_stroke(3.0, 5.0, 5.0),
                    identity,
                );
                for handle in own_handles {
                    draw_handle_square(frame, handle.point, handle.size, HANDLE_COLOR, identity);
                }
            }
            ElementKind::Logo => {
                let Some(rect) = document.logo(target.id).and_then(Logo::rect) else { continue };
                stroke_shape(frame, &rect, HANDLE_COLOR, &dashed_stroke(2.0, 5.0, 5.0), identity);
                for handle in own_handles {
                    draw_handle_square(frame, handle.point, handle.size, HANDLE_COLOR, identity);
                }
            }
            ElementKind::Text => {
                let Some(annotation) = document.text(target.id) else { continue };
                let (x, y) = (annotation.position.x, annotation.position.y);
                let (pad_x, pad_y) = TEXT_PLATE_PAD;
                let transform = rotation_about(annotation.rotation, text_pivot(annotation));
                let outline = Rect::new(x - pad_x, y - pad_y, x - pad_x + annotation.width, y - pad_y + annotation.height);
                stroke_shape(frame, &outline, SELECTION_COLOR, &dashed_stroke(2.0, 5.0, 5.0), transform);

                for handle in own_handles {
                    match handle.kind() {
                        HandleKind::Corner => {
                            draw_handle_square(frame, handle.point, handle.size, SELECTION_COLOR, transform)
                        }
                        HandleKind::Rotation => {
                            let anchor = Point::new(x + annotation.width / 2.0, y - pad_y);
                            stroke_shape(
                                frame,
                                &Line::new(anchor, handle.point),
                                SELECTION_COLOR,
                                &plain_stroke(1.0),
                                transform,
                            );
                            let knob = Circle::new(handle.point, ROTATION_HANDLE_RADIUS);
                            fill_shape(frame, &knob, SELECTION_COLOR, transform);
                            stroke_shape(frame, &knob, SerializableColor::white(), &plain_stroke(2.0), transform);
                        }
                        HandleKind::Endpoint => {}
                    }
                }
            }
            // Measurements are not selectable.
            ElementKind::Measurement => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realtycanvas_core::{ElementRef, Settings};

    fn blank_canvas(width: u32, height: u32) -> Canvas {
        let mut canvas = Canvas::new(Settings::default());
        canvas.set_background(RasterImage::new(width, height, vec![0; (width * height * 4) as usize]));
        canvas
    }

    fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> RasterImage {
        RasterImage::new(width, height, rgba.repeat((width * height) as usize))
    }

    fn pixel(frame: &Pixmap, x: u32, y: u32) -> ColorU8 {
        frame.pixel(x, y).unwrap().demultiply()
    }

    fn render_export(canvas: &Canvas) -> Pixmap {
        RasterRenderer::default().compose(&RenderContext::export(canvas)).unwrap()
    }

    #[test]
    fn test_background_layer() {
        let mut canvas = Canvas::new(Settings::default());
        canvas.set_background(solid_image(4, 4, [255, 0, 0, 255]));

        let frame = render_export(&canvas);
        assert_eq!((frame.width(), frame.height()), (4, 4));
        let p = pixel(&frame, 0, 0);
        assert_eq!((p.red(), p.green(), p.blue(), p.alpha()), (255, 0, 0, 255));

        canvas.set_layer_opacity(LayerId::Background, 50.0);
        let p = pixel(&render_export(&canvas), 1, 1);
        assert!((127..=129).contains(&p.alpha()));

        canvas.toggle_layer_visibility(LayerId::Background);
        assert_eq!(pixel(&render_export(&canvas), 1, 1).alpha(), 0);
    }

    #[test]
    fn test_rectangle_stroke() {
        let mut canvas = blank_canvas(40, 40);
        canvas.add_shape(Shape::rectangle(Point::new(10.0, 10.0), Point::new(30.0, 30.0)));

        let frame = render_export(&canvas);
        assert!(pixel(&frame, 10, 20).alpha() > 200);
        assert_eq!(pixel(&frame, 20, 20).alpha(), 0);
    }

    #[test]
    fn test_selection_overlay_only_when_requested() {
        let mut canvas = blank_canvas(40, 40);
        let id = canvas.add_shape(Shape::rectangle(Point::new(10.0, 10.0), Point::new(30.0, 30.0)));
        canvas.select(ElementRef::shape(id));

        assert_eq!(pixel(&render_export(&canvas), 7, 5).alpha(), 0);

        let mut renderer = RasterRenderer::default();
        let ctx = RenderContext::new(&canvas).with_grid(GridStyle::None);
        renderer.render(&ctx).unwrap();
        let p = pixel(renderer.frame().unwrap(), 7, 5);
        assert!(p.blue() > 200 && p.red() < 60);
    }

    #[test]
    fn test_measurements_toggle() {
        let mut canvas = blank_canvas(40, 40);
        canvas
            .add_measurement(MeasurementKind::Distance, vec![Point::new(5.0, 35.0), Point::new(35.0, 35.0)])
            .unwrap();
        assert!(pixel(&render_export(&canvas), 6, 35).alpha() > 0);

        canvas.toggle_measurements();
        assert_eq!(pixel(&render_export(&canvas), 6, 35).alpha(), 0);
    }

    #[test]
    fn test_logo_drawn_once_resolved() {
        let mut canvas = blank_canvas(20, 20);
        let ticket = canvas.add_logo("brand", "data:image/png;base64,", Point::new(10.0, 10.0));
        assert_eq!(pixel(&render_export(&canvas), 10, 10).alpha(), 0);

        assert!(canvas.resolve_logo(&ticket, solid_image(2, 2, [0, 0, 255, 255])));
        let p = pixel(&render_export(&canvas), 10, 10);
        // Default logo opacity is 90%.
        assert!(p.alpha() > 200 && p.alpha() < 255);
        assert!(p.blue() > 240);
        assert_eq!(pixel(&render_export(&canvas), 13, 13).alpha(), 0);
    }

    #[test]
    fn test_arrow_and_grid() {
        let mut canvas = blank_canvas(60, 60);
        canvas.add_arrow(Point::new(5.0, 30.0), Point::new(55.0, 30.0));
        let frame = render_export(&canvas);
        assert!(pixel(&frame, 20, 30).alpha() > 200);
        // Arrow head spreads beyond the shaft near the tip.
        assert!(pixel(&frame, 45, 33).alpha() > 0);

        let ctx = RenderContext::export(&canvas).with_grid(GridStyle::Lines);
        let frame = RasterRenderer::default().compose(&ctx).unwrap();
        assert!(pixel(&frame, 19, 10).alpha() > 0 || pixel(&frame, 20, 10).alpha() > 0);
    }

    #[test]
    fn test_image_cache_sweep() {
        let mut cache = ImageCache::default();
        let image = solid_image(1, 1, [1, 2, 3, 255]);
        assert!(cache.get(&image).is_some());
        assert!(cache.get(&image).is_some());
        assert_eq!(cache.entries.len(), 1);
        cache.sweep();
        assert_eq!(cache.entries.len(), 1);
        cache.sweep();
        assert!(cache.entries.is_empty());

        let broken = RasterImage::new(2, 2, vec![0; 3]);
        assert!(cache.get(&broken).is_none());
    }

    #[test]
    fn test_frame_rgba_is_straight_alpha() {
        let mut canvas = Canvas::new(Settings::default());
        canvas.set_background(solid_image(2, 1, [200, 100, 50, 255]));
        let mut renderer = RasterRenderer::default();
        assert!(renderer.frame_rgba().is_none());
        renderer.render(&RenderContext::export(&canvas)).unwrap();
        assert_eq!(renderer.frame_rgba().unwrap(), vec![200, 100, 50, 255, 200, 100, 50, 255]);
    }
}
