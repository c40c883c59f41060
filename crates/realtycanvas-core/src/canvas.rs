//! The editing session: document, tools, selection, history and layers.

use crate::document::{CanvasDocument, DocumentSnapshot};
use crate::elements::{
    ApproximateMeasurer, Arrow, Element, ElementId, ElementKind, ElementRef, Logo, LogoLoad, MAX_FONT_SIZE,
    MIN_FONT_SIZE, Measurement, MeasurementKind, MeasurementUnit, RealWorldValue, SerializableColor, Shape,
    TextAnnotation, TextMeasurer, VectorPath, calculate_area, calculate_distance,
};
use crate::files::{ImportError, ImportResult, RasterImage};
use crate::history::History;
use crate::input::{KeyEvent, MouseButton, PointerEvent};
use crate::layer::{LayerId, LayerStack};
use crate::selection::{get_handles, hit_test_handles};
use crate::settings::Settings;
use crate::shortcuts::{Command, ShortcutRegistry};
use crate::storage::{ProjectData, ProjectState};
use crate::tools::{PenOutcome, Preview, TextInput, ToolKind, ToolManager, ToolState};
use crate::transform::{apply_handle, move_elements};
use kurbo::{Point, Vec2};

pub const MIN_ZOOM: f64 = 25.0;
pub const MAX_ZOOM: f64 = 200.0;
pub const ZOOM_STEP: f64 = 25.0;
/// Offset applied to duplicated elements.
pub const DUPLICATE_OFFSET: Vec2 = Vec2::new(20.0, 20.0);

const DEFAULT_PIXELS_PER_FOOT: f64 = 100.0;

/// Quick text labels for common listing annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyLabel {
    SquareFootage,
    PropertyLine,
    Feature,
}

impl PropertyLabel {
    /// Default text, font size and colour.
    fn style(self) -> (&'static str, f64, &'static str) {
        match self {
            PropertyLabel::SquareFootage => ("1,200 sq ft", 14.0, "#0066cc"),
            PropertyLabel::PropertyLine => ("Property Line", 12.0, "#cc0000"),
            PropertyLabel::Feature => ("Feature", 13.0, "#009900"),
        }
    }
}

/// A photo being annotated plus all interaction state around it.
pub struct Canvas {
    document: CanvasDocument,
    layers: LayerStack,
    tools: ToolManager,
    selection: Vec<ElementRef>,
    history: History<DocumentSnapshot>,
    settings: Settings,
    measurer: Box<dyn TextMeasurer>,
    needs_redraw: bool,

    pub brush_size: f64,
    /// Stroke colour as hex.
    pub color: String,
    /// Shape opacity in percent.
    pub opacity: f64,
    pub font_size: f64,
    pub font_family: String,
    pub text_color: String,
    pub text_background_color: String,
    pub text_background: bool,
    zoom: f64,

    pixels_per_foot: f64,
    pub unit: MeasurementUnit,
    pub show_measurements: bool,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.document.width)
            .field("height", &self.document.height)
            .field("tool", &self.tools.current_tool())
            .field("selection", &self.selection)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

macro_rules! tracked_update {
    ($name:ident, $doc_fn:ident, $ty:ty) => {
        /// Apply `f` to the element and redraw. Unknown ids are ignored.
        pub fn $name(&mut self, id: ElementId, f: impl FnOnce(&mut $ty)) -> bool {
            let updated = self.document.$doc_fn(id, f);
            if updated {
                self.request_redraw();
            }
            updated
        }
    };
}

impl Canvas {
    /// Create an initialised canvas whose tool defaults come from `settings`.
    pub fn new(settings: Settings) -> Self {
        let mut canvas = Self {
            document: CanvasDocument::default(),
            layers: LayerStack::default(),
            tools: ToolManager::new(),
            selection: Vec::new(),
            history: History::new(settings.max_history_steps),
            measurer: Box::new(ApproximateMeasurer),
            needs_redraw: true,
            brush_size: settings.default_brush_size,
            color: settings.default_color.clone(),
            opacity: 100.0,
            font_size: 16.0,
            font_family: "Inter".to_string(),
            text_color: "#000000".to_string(),
            text_background_color: "#ffffff".to_string(),
            text_background: false,
            zoom: 100.0,
            pixels_per_foot: DEFAULT_PIXELS_PER_FOOT,
            unit: MeasurementUnit::Feet,
            show_measurements: true,
            settings,
        };
        canvas.init();
        canvas
    }

    /// Reset layers and history, keeping the document, and take the initial snapshot.
    pub fn init(&mut self) {
        self.layers = LayerStack::default();
        self.history = History::new(self.settings.max_history_steps);
        self.save_history();
        self.request_redraw();
    }

    /// Use a different text measurer (for example one backed by a real font).
    /// Existing annotations are remeasured.
    pub fn set_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
        for text in &mut self.document.texts {
            text.remeasure(self.measurer.as_ref());
        }
        self.request_redraw();
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    pub fn document(&self) -> &CanvasDocument {
        &self.document
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn selection(&self) -> &[ElementRef] {
        &self.selection
    }

    pub fn history(&self) -> &History<DocumentSnapshot> {
        &self.history
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Change settings; the history cap follows `maxHistorySteps`.
    pub fn update_settings(&mut self, f: impl FnOnce(&mut Settings)) {
        self.settings.update(f);
        self.history.set_capacity(self.settings.max_history_steps);
        self.request_redraw();
    }

    // --- Redraw signalling ---

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Clear the redraw flag, returning whether it was set.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    // --- History ---

    pub fn save_history(&mut self) {
        self.history.save(self.document.snapshot());
    }

    /// Step back one snapshot. No-op at the oldest entry.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    /// Step forward one snapshot. No-op at the newest entry.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    /// Replace the elements with a snapshot. A pending text input is discarded.
    fn restore(&mut self, snapshot: &DocumentSnapshot) {
        self.discard_text_input();
        self.document.restore(snapshot);
        self.prune_selection();
        self.request_redraw();
    }

    /// Run a batch of document edits as one undoable step.
    pub fn edit_document<R>(&mut self, f: impl FnOnce(&mut CanvasDocument) -> R) -> R {
        let result = f(&mut self.document);
        self.prune_selection();
        self.save_history();
        self.request_redraw();
        result
    }

    // --- Tool state ---

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current_tool()
    }

    /// Switch tools. Pending text is committed; other constructions are dropped.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != ToolKind::Text && self.tools.text_input().is_some() {
            self.finish_text_input();
        }
        self.tools.set_tool(tool);
        self.request_redraw();
    }

    pub fn set_brush_size(&mut self, size: f64) {
        self.brush_size = size.max(1.0);
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 100.0);
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) {
        self.font_family = family.into();
    }

    pub fn set_text_color(&mut self, color: impl Into<String>) {
        self.text_color = color.into();
    }

    pub fn set_text_background(&mut self, enabled: bool) {
        self.text_background = enabled;
    }

    pub fn set_text_background_color(&mut self, color: impl Into<String>) {
        self.text_background_color = color.into();
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.request_redraw();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Transient drawing for the active gesture.
    pub fn preview(&self) -> Vec<Preview> {
        self.tools.preview()
    }

    // --- Measurement calibration ---

    pub fn pixels_per_foot(&self) -> f64 {
        self.pixels_per_foot
    }

    /// Set the calibration. Non-positive values are ignored.
    pub fn set_pixels_per_foot(&mut self, pixels: f64) {
        if pixels > 0.0 && pixels.is_finite() {
            self.pixels_per_foot = pixels;
        } else {
            log::warn!("Ignoring invalid pixels-per-foot value {}", pixels);
        }
    }

    pub fn set_unit(&mut self, unit: MeasurementUnit) {
        self.unit = unit;
    }

    pub fn toggle_measurements(&mut self) {
        self.show_measurements = !self.show_measurements;
        self.request_redraw();
    }

    pub fn calculate_distance(&self, a: Point, b: Point) -> RealWorldValue {
        calculate_distance(a, b, self.pixels_per_foot, self.unit)
    }

    pub fn calculate_area(&self, points: &[Point]) -> RealWorldValue {
        calculate_area(points, self.pixels_per_foot, self.unit)
    }

    /// A measurement valued with the current calibration, or `None` if the
    /// point count does not fit the kind.
    pub fn build_measurement(&self, kind: MeasurementKind, points: Vec<Point>) -> Option<Measurement> {
        let value = match (kind, points.as_slice()) {
            (MeasurementKind::Distance, [a, b]) => self.calculate_distance(*a, *b),
            (MeasurementKind::Area, pts) if pts.len() >= 3 => self.calculate_area(pts),
            _ => return None,
        };
        Some(Measurement::from_value(kind, points, &value))
    }

    // --- Element creation ---

    fn stroke_color(&self) -> SerializableColor {
        SerializableColor::from_hex(&self.color)
    }

    fn commit<T>(&mut self, f: impl FnOnce(&mut CanvasDocument) -> T) -> T {
        let result = f(&mut self.document);
        self.save_history();
        self.request_redraw();
        result
    }

    pub fn add_shape(&mut self, shape: Shape) -> ElementId {
        self.commit(|doc| doc.add_shape(shape))
    }

    pub fn add_path(&mut self, path: VectorPath) -> ElementId {
        self.commit(|doc| doc.add_path(path))
    }

    pub fn add_arrow(&mut self, start: Point, end: Point) -> ElementId {
        self.commit(|doc| doc.add_arrow(Arrow::new(start, end)))
    }

    pub fn add_measurement(&mut self, kind: MeasurementKind, points: Vec<Point>) -> Option<ElementId> {
        let measurement = self.build_measurement(kind, points)?;
        log::debug!("Measurement {}", measurement.label);
        Some(self.commit(|doc| doc.add_measurement(measurement)))
    }

    /// Add a text annotation as given, measuring it first.
    pub fn add_text_annotation(&mut self, mut annotation: TextAnnotation) -> ElementId {
        annotation.remeasure(self.measurer.as_ref());
        self.commit(|doc| doc.add_text(annotation))
    }

    /// Drop a preset label at `(x, y)`; `value` replaces the default text.
    pub fn add_property_template(&mut self, label: PropertyLabel, x: f64, y: f64, value: Option<&str>) -> ElementId {
        let (text, font_size, color) = label.style();
        let mut annotation = TextAnnotation::new(value.unwrap_or(text), Point::new(x, y), font_size);
        annotation.color = SerializableColor::from_hex(color);
        annotation.has_background = true;
        annotation.background_color = SerializableColor::white();
        self.add_text_annotation(annotation)
    }

    tracked_update!(update_shape, update_shape, Shape);
    tracked_update!(update_path, update_path, VectorPath);
    tracked_update!(update_logo, update_logo, Logo);
    tracked_update!(update_arrow, update_arrow, Arrow);
    tracked_update!(update_measurement, update_measurement, Measurement);

    /// Update a text annotation and remeasure it.
    pub fn update_text(&mut self, id: ElementId, f: impl FnOnce(&mut TextAnnotation)) -> bool {
        let measurer = self.measurer.as_ref();
        let updated = self.document.update_text(id, |text| {
            f(text);
            text.remeasure(measurer);
        });
        if updated {
            self.request_redraw();
        }
        updated
    }

    /// Remove any element. Unknown ids are a no-op.
    pub fn remove(&mut self, target: ElementRef) -> bool {
        if !self.document.remove(target) {
            return false;
        }
        self.prune_selection();
        self.save_history();
        self.request_redraw();
        true
    }

    // --- Logos ---

    /// Append a logo that is not loaded yet. Decode the returned ticket and
    /// hand the image to [`Canvas::resolve_logo`].
    pub fn add_logo(&mut self, name: impl Into<String>, src: impl Into<String>, position: Point) -> LogoLoad {
        let mut logo = Logo::new(name, src, position);
        logo.opacity = self.settings.default_logo_opacity;
        logo.scale = self.settings.default_logo_scale;
        let ticket = logo.load_ticket();
        self.commit(|doc| doc.add_logo(logo));
        ticket
    }

    /// Attach a decoded image. Stale tickets (logo deleted or source changed) are ignored.
    pub fn resolve_logo(&mut self, ticket: &LogoLoad, image: RasterImage) -> bool {
        match self.document.logo(ticket.logo_id) {
            Some(logo) if logo.generation() == ticket.generation => {}
            Some(_) => {
                log::warn!("Discarding stale image for logo {}", ticket.logo_id);
                return false;
            }
            None => {
                log::warn!("Discarding image for removed logo {}", ticket.logo_id);
                return false;
            }
        }
        self.update_logo(ticket.logo_id, |logo| logo.image = Some(image))
    }

    /// Point a logo at a new source; the old image is dropped until the new ticket resolves.
    pub fn set_logo_src(&mut self, id: ElementId, src: impl Into<String>) -> Option<LogoLoad> {
        let src = src.into();
        let updated = self.update_logo(id, |logo| {
            logo.src = src;
            logo.image = None;
            logo.generation += 1;
        });
        if !updated {
            return None;
        }
        self.document.logo(id).map(Logo::load_ticket)
    }

    // --- Background image ---

    /// Load the photo. Rejects non-image MIME types and undecodable bytes
    /// without touching the canvas.
    pub fn import_image(&mut self, mime: &str, bytes: &[u8]) -> ImportResult<()> {
        if !mime.starts_with("image/") {
            return Err(ImportError::InvalidType(mime.to_string()));
        }
        let image = RasterImage::decode(bytes)?;
        self.set_background(image);
        Ok(())
    }

    /// Use an already decoded photo; the canvas adopts its size.
    pub fn set_background(&mut self, image: RasterImage) {
        log::info!("Background image {}x{}", image.width, image.height);
        self.document.set_background(image);
        self.request_redraw();
    }

    /// Approximate pixel memory in MB (canvas plus loaded logos), one decimal.
    pub fn memory_usage_mb(&self) -> f64 {
        let canvas = u64::from(self.document.width) * u64::from(self.document.height) * 4;
        let logos: u64 = self
            .document
            .logos
            .iter()
            .filter_map(|l| l.image.as_ref())
            .map(|img| u64::from(img.width) * u64::from(img.height) * 4)
            .sum();
        ((canvas + logos) as f64 / (1024.0 * 1024.0) * 10.0).round() / 10.0
    }

    // --- Selection ---

    fn sync_text_flags(&mut self) {
        let selection = &self.selection;
        for text in &mut self.document.texts {
            text.selected = selection.contains(&ElementRef::text(text.id));
        }
    }

    fn prune_selection(&mut self) {
        let document = &self.document;
        self.selection.retain(|target| document.contains(*target));
        self.sync_text_flags();
    }

    /// Replace the selection with one element.
    pub fn select(&mut self, target: ElementRef) -> bool {
        if !self.document.contains(target) {
            return false;
        }
        self.selection = vec![target];
        self.sync_text_flags();
        self.request_redraw();
        true
    }

    pub fn add_to_selection(&mut self, target: ElementRef) -> bool {
        if !self.document.contains(target) {
            return false;
        }
        if !self.selection.contains(&target) {
            self.selection.push(target);
        }
        self.sync_text_flags();
        self.request_redraw();
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.sync_text_flags();
        self.request_redraw();
    }

    pub fn select_text(&mut self, id: ElementId) -> bool {
        self.select(ElementRef::text(id))
    }

    pub fn is_selected(&self, target: ElementRef) -> bool {
        self.selection.contains(&target)
    }

    /// Update the first selected text annotation.
    pub fn update_selected_text(&mut self, f: impl FnOnce(&mut TextAnnotation)) -> bool {
        let Some(id) = self.document.texts.iter().find(|t| t.selected).map(|t| t.id) else {
            return false;
        };
        self.update_text(id, f)
    }

    /// Delete every selected element. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let targets = std::mem::take(&mut self.selection);
        let removed = targets.into_iter().filter(|t| self.document.remove(*t)).count();
        self.sync_text_flags();
        if removed > 0 {
            log::debug!("Deleted {} elements", removed);
            self.save_history();
        }
        self.request_redraw();
        removed
    }

    /// Copy every selected element (fresh ids, offset by 20px) and select the copies.
    pub fn duplicate_selected(&mut self) -> Vec<ElementRef> {
        let copies: Vec<ElementRef> = self
            .selection
            .clone()
            .into_iter()
            .filter_map(|target| self.document.duplicate(target, DUPLICATE_OFFSET))
            .collect();
        if copies.is_empty() {
            return copies;
        }
        self.selection = copies.clone();
        self.sync_text_flags();
        self.save_history();
        self.request_redraw();
        copies
    }

    // --- Layers ---

    pub fn toggle_layer_visibility(&mut self, layer: LayerId) {
        self.layers.toggle_visibility(layer);
        self.request_redraw();
    }

    pub fn set_layer_opacity(&mut self, layer: LayerId, opacity: f64) {
        self.layers.set_opacity(layer, opacity);
        self.request_redraw();
    }

    pub fn set_active_layer(&mut self, layer: LayerId) {
        self.layers.set_active(layer);
    }

    /// Remove shapes, paths, measurements and text. Logos, arrows and the photo stay.
    pub fn clear(&mut self) {
        self.tools.cancel();
        self.discard_text_input();
        self.document.shapes.clear();
        self.document.paths.clear();
        self.document.measurements.clear();
        self.document.texts.clear();
        self.prune_selection();
        self.save_history();
        self.request_redraw();
    }

    // --- Text input ---

    /// Open a new text input at `position`, committing any pending one first.
    pub fn start_text_input(&mut self, position: Point) {
        if self.tools.text_input().is_some() {
            self.finish_text_input();
        }
        self.tools.begin_text_input(TextInput {
            position,
            text: String::new(),
            editing: None,
        });
        self.request_redraw();
    }

    pub fn update_text_input(&mut self, text: impl Into<String>) {
        if let Some(input) = self.tools.text_input_mut() {
            input.text = text.into();
            self.request_redraw();
        }
    }

    /// Commit the pending text. Blank text is dropped; an edited annotation is then deleted.
    ///
    /// An edit is written back in place. If the annotation disappeared while
    /// the input was open, the text becomes a new annotation.
    pub fn finish_text_input(&mut self) -> Option<ElementId> {
        let input = self.tools.take_text_input()?;
        self.request_redraw();
        let edited = input.editing.filter(|id| self.document.text(*id).is_some());

        if input.text.trim().is_empty() {
            if let Some(id) = edited {
                self.remove(ElementRef::text(id));
            }
            return None;
        }

        let id = match edited {
            Some(id) => {
                let changed = self.document.text(id).is_some_and(|t| t.text != input.text);
                if changed {
                    self.update_text(id, |t| t.text = input.text);
                    self.save_history();
                }
                id
            }
            None => {
                let mut annotation = TextAnnotation::new(input.text, input.position, self.font_size);
                annotation.font_family = self.font_family.clone();
                annotation.color = SerializableColor::from_hex(&self.text_color);
                annotation.background_color = SerializableColor::from_hex(&self.text_background_color);
                annotation.has_background = self.text_background;
                self.add_text_annotation(annotation)
            }
        };
        self.select_text(id);
        Some(id)
    }

    /// Drop the pending text. An annotation being edited keeps its text.
    pub fn cancel_text_input(&mut self) {
        if self.discard_text_input() {
            self.request_redraw();
        }
    }

    fn discard_text_input(&mut self) -> bool {
        self.tools.take_text_input().is_some()
    }

    /// The annotation open in the text input, if an existing one is being edited.
    pub fn editing_text(&self) -> Option<ElementId> {
        self.tools.text_input().and_then(|input| input.editing)
    }

    /// Open an existing annotation in the text input. It stays in place (and
    /// in the z-order) until the edit is committed.
    pub fn start_editing_text(&mut self, id: ElementId) -> bool {
        if self.tools.text_input().is_some() {
            self.finish_text_input();
        }
        let Some(original) = self.document.text(id) else {
            return false;
        };
        let input = TextInput {
            position: original.position,
            text: original.text.clone(),
            editing: Some(id),
        };
        self.tools.begin_text_input(input);
        self.clear_selection();
        self.request_redraw();
        true
    }

    // --- Pen / polygon / area ---

    fn commit_path(&mut self, path: VectorPath) {
        log::debug!("Committing path with {} anchors (closed: {})", path.len(), path.closed);
        self.add_path(path);
    }

    /// Commit the path under construction. The polygon tool always closes it.
    pub fn finish_path(&mut self) -> bool {
        let closed = self.tools.current_tool() == ToolKind::Polygon;
        match self.tools.pen_mut().finish(closed) {
            Some(path) => {
                self.commit_path(path);
                true
            }
            None => false,
        }
    }

    pub fn close_path(&mut self) -> bool {
        match self.tools.pen_mut().finish(true) {
            Some(path) => {
                self.commit_path(path);
                true
            }
            None => false,
        }
    }

    pub fn cancel_path(&mut self) {
        self.tools.pen_mut().cancel();
        self.request_redraw();
    }

    /// Commit the area vertices collected so far as an area measurement.
    pub fn finish_area(&mut self) -> Option<ElementId> {
        let points = self.tools.finish_area()?;
        self.request_redraw();
        self.add_measurement(MeasurementKind::Area, points)
    }

    // --- Pointer dispatch ---

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => self.pointer_down(position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => self.pointer_up(position),
            PointerEvent::DoubleClick { position } => self.double_click(position),
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => {}
        }
    }

    fn pointer_down(&mut self, point: Point) {
        match self.tools.current_tool() {
            ToolKind::Move => self.move_tool_down(point),
            ToolKind::Pen | ToolKind::Polygon => {
                let stroke = self.stroke_color();
                let outcome = self.tools.pen_mut().click(point, stroke, self.brush_size);
                if let PenOutcome::Closed(path) = outcome {
                    self.commit_path(path);
                }
                self.request_redraw();
            }
            tool @ (ToolKind::Square | ToolKind::Circle | ToolKind::Ruler) => {
                if tool != ToolKind::Ruler {
                    self.clear_selection();
                }
                self.tools.state = ToolState::Drawing {
                    start: point,
                    current: point,
                };
            }
            ToolKind::Text => {
                let hit = self.document.text_at(point).map(|t| t.id());
                match hit {
                    Some(id) => {
                        self.start_editing_text(id);
                    }
                    None => self.start_text_input(point),
                }
            }
            ToolKind::Area => {
                if let Some(points) = self.tools.area_click(point) {
                    self.add_measurement(MeasurementKind::Area, points);
                }
                self.request_redraw();
            }
        }
    }

    /// Text first, then handles of the selection, then shapes, paths, logos, arrows.
    fn move_tool_down(&mut self, point: Point) {
        if let Some(id) = self.document.text_at(point).map(|t| t.id()) {
            self.select_text(id);
            self.tools.state = ToolState::Moving {
                last: point,
                moved: false,
            };
            return;
        }

        let handles = get_handles(&self.document, &self.selection);
        if let Some(handle) = hit_test_handles(&handles, point) {
            log::debug!("Grabbed {:?} handle of {:?}", handle.position, handle.target.kind);
            self.tools.state = ToolState::Resizing {
                handle,
                last: point,
                changed: false,
            };
            return;
        }

        let doc = &self.document;
        let hit = doc
            .shape_at(point)
            .map(|e| ElementRef::new(ElementKind::Shape, e.id()))
            .or_else(|| doc.path_at(point).map(|e| ElementRef::new(ElementKind::VectorPath, e.id())))
            .or_else(|| doc.logo_at(point).map(|e| ElementRef::new(ElementKind::Logo, e.id())))
            .or_else(|| doc.arrow_at(point).map(|e| ElementRef::new(ElementKind::Arrow, e.id())));

        match hit {
            Some(target) => {
                self.select(target);
                self.tools.state = ToolState::Moving {
                    last: point,
                    moved: false,
                };
            }
            None => {
                self.clear_selection();
                self.tools.state = ToolState::Idle;
            }
        }
    }

    fn pointer_move(&mut self, point: Point) {
        match self.tools.state {
            ToolState::Drawing { start, .. } => {
                self.tools.state = ToolState::Drawing { start, current: point };
                self.request_redraw();
            }
            ToolState::Moving { last, moved } => {
                let delta = point - last;
                let did_move = delta != Vec2::ZERO && move_elements(&mut self.document, &self.selection, delta);
                self.tools.state = ToolState::Moving {
                    last: point,
                    moved: moved || did_move,
                };
                if did_move {
                    self.request_redraw();
                }
            }
            ToolState::Resizing { handle, last, changed } => {
                let delta = point - last;
                let did_change = apply_handle(&mut self.document, &handle, point, delta, self.measurer.as_ref());
                self.tools.state = ToolState::Resizing {
                    handle,
                    last: point,
                    changed: changed || did_change,
                };
                if did_change {
                    self.request_redraw();
                }
            }
            ToolState::Idle => {
                let tool = self.tools.current_tool();
                if tool.builds_path() || tool == ToolKind::Area {
                    self.tools.set_hover(point);
                    self.request_redraw();
                }
            }
        }
    }

    fn pointer_up(&mut self, point: Point) {
        match std::mem::take(&mut self.tools.state) {
            ToolState::Drawing { start, .. } => {
                self.request_redraw();
                if start == point {
                    return;
                }
                let tool = self.tools.current_tool();
                if let Some(kind) = tool.shape_kind() {
                    let shape = Shape::new(kind, start, point).with_style(self.stroke_color(), self.brush_size, self.opacity);
                    self.add_shape(shape);
                } else if tool == ToolKind::Ruler {
                    self.add_measurement(MeasurementKind::Distance, vec![start, point]);
                }
            }
            ToolState::Moving { moved: true, .. } | ToolState::Resizing { changed: true, .. } => {
                self.save_history();
            }
            ToolState::Moving { .. } | ToolState::Resizing { .. } | ToolState::Idle => {}
        }
    }

    fn double_click(&mut self, _point: Point) {
        match self.tools.current_tool() {
            ToolKind::Pen | ToolKind::Polygon => {
                self.finish_path();
            }
            ToolKind::Area => {
                self.finish_area();
            }
            _ => {}
        }
    }

    // --- Keyboard ---

    /// Apply a canvas-level command. Returns `false` for commands the host
    /// must handle (save, export, open, new, fit to window).
    pub fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::Undo => {
                self.undo();
            }
            Command::Redo => {
                self.redo();
            }
            Command::DeleteSelected => {
                self.delete_selected();
            }
            Command::Deselect => {
                self.cancel_text_input();
                self.tools.cancel();
                self.clear_selection();
            }
            Command::SelectTool(tool) => self.set_tool(tool),
            Command::ToggleGrid => self.update_settings(|s| s.grid_visible = !s.grid_visible),
            Command::ZoomIn => self.zoom_in(),
            Command::ZoomOut => self.zoom_out(),
            Command::Save | Command::Export | Command::Open | Command::New | Command::FitToWindow => return false,
        }
        true
    }

    /// Route a key press. While text is being typed keys edit the buffer;
    /// otherwise shortcuts run. Returns the shortcut command the host must handle.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<Command> {
        if let Some(input) = self.tools.text_input() {
            let mut text = input.text.clone();
            match event.key.as_str() {
                "Enter" => {
                    self.finish_text_input();
                }
                "Escape" => self.cancel_text_input(),
                "Backspace" => {
                    text.pop();
                    self.update_text_input(text);
                }
                key if key.chars().count() == 1 && !event.modifiers.command() => {
                    text.push_str(key);
                    self.update_text_input(text);
                }
                _ => {}
            }
            return None;
        }

        let command = ShortcutRegistry::find(event)?;
        if self.execute(command) { None } else { Some(command) }
    }

    // --- Projects ---

    /// Everything a project file stores (the photo pixels are not included).
    pub fn project_state(&self) -> ProjectState {
        let mut document = self.document.clone();
        document.background = None;
        ProjectState {
            document,
            layers: self.layers.clone(),
            active_tool: self.tools.current_tool(),
            brush_size: self.brush_size,
            color: self.color.clone(),
            opacity: self.opacity,
            font_size: self.font_size,
            font_family: self.font_family.clone(),
            text_color: self.text_color.clone(),
            text_background_color: self.text_background_color.clone(),
            text_background: self.text_background,
            zoom: self.zoom,
            pixels_per_foot: self.pixels_per_foot,
            unit: self.unit,
            show_measurements: self.show_measurements,
        }
    }

    /// Replace the session with a saved project. The current photo is kept.
    /// History restarts from the loaded state. Returns load tickets for every logo.
    pub fn apply_project(&mut self, data: &ProjectData) -> Vec<LogoLoad> {
        let state = &data.canvas_state;
        let background = self.document.background.take();
        self.document = state.document.clone();
        if let Some(image) = background {
            self.document.set_background(image);
        }
        self.layers = state.layers.clone();
        self.discard_text_input();
        self.tools.set_tool(state.active_tool);
        self.brush_size = state.brush_size;
        self.color = state.color.clone();
        self.opacity = state.opacity;
        self.font_size = state.font_size;
        self.font_family = state.font_family.clone();
        self.text_color = state.text_color.clone();
        self.text_background_color = state.text_background_color.clone();
        self.text_background = state.text_background;
        self.zoom = state.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if state.pixels_per_foot > 0.0 {
            self.pixels_per_foot = state.pixels_per_foot;
        }
        self.unit = state.unit;
        self.show_measurements = state.show_measurements;

        self.selection.clear();
        self.sync_text_flags();
        self.history.clear();
        self.save_history();
        self.request_redraw();
        log::info!("Applied project saved at {}", data.timestamp);

        self.document.logos.iter().map(Logo::load_ticket).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{MAX_LOGO_SCALE, ShapeKind};
    use crate::input::Modifiers;

    fn canvas() -> Canvas {
        Canvas::new(Settings::default())
    }

    fn click(canvas: &mut Canvas, x: f64, y: f64) {
        canvas.handle_pointer(PointerEvent::down(x, y));
        canvas.handle_pointer(PointerEvent::up(x, y));
    }

    fn drag(canvas: &mut Canvas, from: (f64, f64), to: (f64, f64)) {
        canvas.handle_pointer(PointerEvent::down(from.0, from.1));
        canvas.handle_pointer(PointerEvent::moved(to.0, to.1));
        canvas.handle_pointer(PointerEvent::up(to.0, to.1));
    }

    #[test]
    fn test_new_canvas_defaults() {
        let canvas = canvas();
        assert_eq!(canvas.current_tool(), ToolKind::Move);
        assert_eq!(canvas.layers().active(), LayerId::PropertyLines);
        assert_eq!(canvas.history().len(), 1);
        assert!((canvas.brush_size - 3.0).abs() < f64::EPSILON);
        assert_eq!(canvas.color, "#e4915c");
        assert!(canvas.needs_redraw());
    }

    #[test]
    fn test_zoom_clamps() {
        let mut canvas = canvas();
        for _ in 0..10 {
            canvas.zoom_in();
        }
        assert!((canvas.zoom() - MAX_ZOOM).abs() < f64::EPSILON);
        canvas.set_zoom(5.0);
        assert!((canvas.zoom() - MIN_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_calibrated_values() {
        let canvas = canvas();
        let d = canvas.calculate_distance(Point::new(0.0, 0.0), Point::new(300.0, 400.0));
        assert!((d.pixels - 500.0).abs() < 1e-9);
        assert!((d.real_world - 5.0).abs() < 1e-9);
        let square = [
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 150.0),
            Point::new(0.0, 150.0),
        ];
        let a = canvas.calculate_area(&square);
        assert!((a.pixels - 30_000.0).abs() < 1e-9);
        assert!((a.real_world - 3.0).abs() < 1e-9);
        assert_eq!(a.unit, "sq feet");
    }

    #[test]
    fn test_move_tool_selects_topmost_shape() {
        let mut canvas = canvas();
        canvas.add_shape(Shape::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 100.0)));
        let top = canvas.add_shape(Shape::rectangle(Point::new(50.0, 50.0), Point::new(150.0, 150.0)));
        click(&mut canvas, 75.0, 75.0);
        assert_eq!(canvas.selection(), &[ElementRef::shape(top)]);

        click(&mut canvas, 500.0, 500.0);
        assert!(canvas.selection().is_empty());
    }

    #[test]
    fn test_drag_moves_and_snapshots_once() {
        let mut canvas = canvas();
        let id = canvas.add_shape(Shape::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 100.0)));
        let before = canvas.history().len();
        canvas.handle_pointer(PointerEvent::down(50.0, 50.0));
        canvas.handle_pointer(PointerEvent::moved(60.0, 50.0));
        canvas.handle_pointer(PointerEvent::moved(70.0, 55.0));
        canvas.handle_pointer(PointerEvent::up(70.0, 55.0));
        let shape = canvas.document().shape(id).unwrap();
        assert_eq!(shape.start, Point::new(20.0, 5.0));
        assert_eq!(canvas.history().len(), before + 1);

        // A click without movement adds no snapshot.
        click(&mut canvas, 60.0, 60.0);
        assert_eq!(canvas.history().len(), before + 1);
    }

    #[test]
    fn test_square_commits_on_pointer_up() {
        let mut canvas = canvas();
        canvas.set_tool(ToolKind::Square);
        drag(&mut canvas, (10.0, 10.0), (60.0, 40.0));
        let shape = &canvas.document().shapes[0];
        assert_eq!(shape.kind, ShapeKind::Rectangle);
        assert_eq!(shape.end, Point::new(60.0, 40.0));

        click(&mut canvas, 5.0, 5.0);
        assert_eq!(canvas.document().shapes.len(), 1);
    }

    #[test]
    fn test_pen_closing_rule() {
        let mut canvas = canvas();
        canvas.set_tool(ToolKind::Pen);
        click(&mut canvas, 0.0, 0.0);
        click(&mut canvas, 100.0, 0.0);
        click(&mut canvas, 100.0, 100.0);
        click(&mut canvas, 3.0, 4.0);
        assert_eq!(canvas.document().paths.len(), 1);
        assert!(canvas.document().paths[0].closed);
        assert!(!canvas.tools().pen().is_creating());
    }

    #[test]
    fn test_pen_double_click_finishes_open_path() {
        let mut canvas = canvas();
        canvas.set_tool(ToolKind::Pen);
        click(&mut canvas, 0.0, 0.0);
        click(&mut canvas, 50.0, 0.0);
        canvas.handle_pointer(PointerEvent::double_click(50.0, 0.0));
        assert_eq!(canvas.document().paths.len(), 1);
        assert!(!canvas.document().paths[0].closed);

        canvas.set_tool(ToolKind::Polygon);
        click(&mut canvas, 0.0, 0.0);
        click(&mut canvas, 50.0, 0.0);
        assert!(canvas.finish_path());
        assert!(canvas.document().paths[1].closed);
    }

    #[test]
    fn test_ruler_and_area_measurements() {
        let mut canvas = canvas();
        canvas.set_tool(ToolKind::Ruler);
        drag(&mut canvas, (0.0, 0.0), (300.0, 400.0));
        let ruler = &canvas.document().measurements[0];
        assert_eq!(ruler.kind, MeasurementKind::Distance);
        assert_eq!(ruler.label, "5 feet");

        canvas.set_tool(ToolKind::Area);
        click(&mut canvas, 0.0, 0.0);
        click(&mut canvas, 200.0, 0.0);
        click(&mut canvas, 200.0, 150.0);
        click(&mut canvas, 0.0, 150.0);
        click(&mut canvas, 2.0, 2.0);
        let area = &canvas.document().measurements[1];
        assert_eq!(area.kind, MeasurementKind::Area);
        assert!((area.value - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_lifecycle() {
        let mut canvas = canvas();
        canvas.set_tool(ToolKind::Text);
        click(&mut canvas, 10.0, 10.0);
        canvas.update_text_input("Pool");
        let id = canvas.finish_text_input().unwrap();
        let text = canvas.document().text(id).unwrap();
        assert!(text.selected);
        assert!((text.width - (4.0 * 16.0 * 0.6 + 8.0)).abs() < 1e-9);
        assert!((text.height - 22.0).abs() < 1e-9);

        // Blank input commits nothing.
        canvas.start_text_input(Point::new(300.0, 300.0));
        canvas.update_text_input("   ");
        assert!(canvas.finish_text_input().is_none());
        assert_eq!(canvas.document().texts.len(), 1);
    }

    #[test]
    fn test_cancel_editing_keeps_text() {
        let mut canvas = canvas();
        let id = canvas.add_property_template(PropertyLabel::Feature, 20.0, 20.0, None);
        assert!(canvas.start_editing_text(id));
        assert_eq!(canvas.editing_text(), Some(id));
        assert_eq!(canvas.document().texts.len(), 1);
        canvas.update_text_input("Changed");
        canvas.cancel_text_input();
        assert_eq!(canvas.editing_text(), None);
        let kept = canvas.document().text(id).unwrap();
        assert_eq!(kept.text, "Feature");
        assert!(kept.has_background);
    }

    fn assert_unique_ids(canvas: &Canvas) {
        fn unique<T: Element>(items: &[T]) -> bool {
            let ids: std::collections::HashSet<_> = items.iter().map(|e| e.id()).collect();
            ids.len() == items.len()
        }
        let doc = canvas.document();
        assert!(unique(&doc.shapes));
        assert!(unique(&doc.paths));
        assert!(unique(&doc.texts));
        assert!(unique(&doc.logos));
        assert!(unique(&doc.arrows));
        assert!(unique(&doc.measurements));
    }

    fn label(canvas: &mut Canvas, text: &str, y: f64) -> ElementId {
        canvas.add_text_annotation(TextAnnotation::new(text, Point::new(10.0, y), 16.0))
    }

    #[test]
    fn test_edit_commits_in_place() {
        let mut canvas = canvas();
        let pool = label(&mut canvas, "Pool", 10.0);
        let deck = label(&mut canvas, "Deck", 60.0);
        let steps = canvas.history().len();

        assert!(canvas.start_editing_text(pool));
        canvas.update_text_input("Pool 2");
        assert_eq!(canvas.finish_text_input(), Some(pool));

        let texts = &canvas.document().texts;
        assert_eq!(texts.iter().map(|t| t.id()).collect::<Vec<_>>(), vec![pool, deck]);
        assert_eq!(texts[0].text, "Pool 2");
        assert!(texts[0].selected);
        assert_eq!(canvas.history().len(), steps + 1);

        // Unchanged text adds no history step.
        canvas.start_editing_text(deck);
        canvas.finish_text_input();
        assert_eq!(canvas.history().len(), steps + 1);
        assert_unique_ids(&canvas);
    }

    #[test]
    fn test_blank_edit_deletes_text() {
        let mut canvas = canvas();
        let pool = label(&mut canvas, "Pool", 10.0);
        canvas.start_editing_text(pool);
        canvas.update_text_input("  ");
        assert!(canvas.finish_text_input().is_none());
        assert!(canvas.document().texts.is_empty());
        assert!(canvas.undo());
        assert!(canvas.document().text(pool).is_some());
    }

    #[test]
    fn test_undo_redo_during_text_edit() {
        let mut canvas = canvas();
        let pool = label(&mut canvas, "Pool", 10.0);
        label(&mut canvas, "Deck", 60.0);

        canvas.start_editing_text(pool);
        assert!(canvas.undo());
        assert_eq!(canvas.editing_text(), None);
        canvas.update_text_input("Pool 2");
        assert!(canvas.finish_text_input().is_none());
        assert_eq!(canvas.document().texts.len(), 1);
        assert_eq!(canvas.document().text(pool).unwrap().text, "Pool");
        assert_unique_ids(&canvas);

        canvas.start_editing_text(pool);
        assert!(canvas.redo());
        canvas.update_text_input("Pool 3");
        canvas.finish_text_input();
        assert_eq!(canvas.document().texts.len(), 2);
        assert_unique_ids(&canvas);

        canvas.start_editing_text(pool);
        assert!(canvas.execute(Command::Undo));
        assert!(canvas.tools().text_input().is_none());
        assert_unique_ids(&canvas);
    }

    #[test]
    fn test_edited_text_removed_while_open() {
        let mut canvas = canvas();
        let pool = label(&mut canvas, "Pool", 10.0);
        canvas.start_editing_text(pool);
        assert!(canvas.remove(ElementRef::text(pool)));
        canvas.update_text_input("Pool 2");
        let id = canvas.finish_text_input().unwrap();
        assert_ne!(id, pool);
        assert_eq!(canvas.document().texts.len(), 1);
        assert_eq!(canvas.document().texts[0].text, "Pool 2");
    }

    #[test]
    fn test_clear_and_tool_switch_during_text_edit() {
        let mut canvas = canvas();
        let pool = label(&mut canvas, "Pool", 10.0);
        canvas.start_editing_text(pool);
        canvas.clear();
        assert!(canvas.tools().text_input().is_none());
        assert!(canvas.finish_text_input().is_none());
        assert!(canvas.document().texts.is_empty());

        let deck = label(&mut canvas, "Deck", 60.0);
        canvas.set_tool(ToolKind::Text);
        canvas.start_editing_text(deck);
        canvas.update_text_input("Deck 2");
        canvas.set_tool(ToolKind::Move);
        assert_eq!(canvas.document().texts.len(), 1);
        assert_eq!(canvas.document().text(deck).unwrap().text, "Deck 2");
        assert_unique_ids(&canvas);
    }

    #[test]
    fn test_apply_project_during_text_edit() {
        let mut source = canvas();
        label(&mut source, "Garage", 10.0);
        let data = ProjectData::capture(source.project_state());

        let mut canvas = canvas();
        let pool = label(&mut canvas, "Pool", 10.0);
        canvas.start_editing_text(pool);
        canvas.apply_project(&data);
        canvas.update_text_input("Pool 2");
        assert!(canvas.finish_text_input().is_none());

        let texts = &canvas.document().texts;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].text, "Garage");
        assert!(canvas.document().text(pool).is_none());
        assert_unique_ids(&canvas);
    }

    #[test]
    fn test_double_click_adds_no_extra_vertex() {
        use crate::input::ClickTracker;
        use std::time::{Duration, Instant};

        fn press(canvas: &mut Canvas, clicks: &mut ClickTracker, x: f64, y: f64, at: Instant) {
            for event in clicks.process(PointerEvent::down(x, y), at) {
                canvas.handle_pointer(event);
            }
            canvas.handle_pointer(PointerEvent::up(x, y));
        }

        let mut canvas = canvas();
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();
        canvas.set_tool(ToolKind::Pen);
        press(&mut canvas, &mut clicks, 0.0, 0.0, t0);
        press(&mut canvas, &mut clicks, 80.0, 0.0, t0 + Duration::from_secs(1));
        press(&mut canvas, &mut clicks, 80.0, 0.0, t0 + Duration::from_millis(1200));
        assert_eq!(canvas.document().paths.len(), 1);
        assert_eq!(canvas.document().paths[0].len(), 2);

        // Double click right after starting: nothing to commit.
        press(&mut canvas, &mut clicks, 200.0, 200.0, t0 + Duration::from_secs(3));
        press(&mut canvas, &mut clicks, 200.0, 200.0, t0 + Duration::from_millis(3200));
        assert_eq!(canvas.document().paths.len(), 1);
        canvas.cancel_path();

        canvas.set_tool(ToolKind::Area);
        press(&mut canvas, &mut clicks, 0.0, 0.0, t0 + Duration::from_secs(5));
        press(&mut canvas, &mut clicks, 200.0, 0.0, t0 + Duration::from_secs(6));
        press(&mut canvas, &mut clicks, 200.0, 150.0, t0 + Duration::from_secs(7));
        press(&mut canvas, &mut clicks, 200.0, 150.0, t0 + Duration::from_millis(7200));
        let area = &canvas.document().measurements[0];
        assert_eq!(area.points.len(), 3);
    }

    #[test]
    fn test_text_flags_follow_selection() {
        let mut canvas = canvas();
        let a = canvas.add_property_template(PropertyLabel::SquareFootage, 0.0, 0.0, None);
        let b = canvas.add_property_template(PropertyLabel::PropertyLine, 0.0, 100.0, Some("North line"));
        canvas.select_text(a);
        canvas.add_to_selection(ElementRef::text(b));
        assert!(canvas.document().texts.iter().all(|t| t.selected));
        canvas.select_text(b);
        assert!(!canvas.document().text(a).unwrap().selected);
        canvas.clear_selection();
        assert!(canvas.document().texts.iter().all(|t| !t.selected));
    }

    #[test]
    fn test_undo_redo_restores_elements() {
        let mut canvas = canvas();
        assert!(!canvas.undo());
        let id = canvas.add_shape(Shape::rectangle(Point::ZERO, Point::new(10.0, 10.0)));
        canvas.select(ElementRef::shape(id));
        assert!(canvas.undo());
        assert!(canvas.document().shapes.is_empty());
        assert!(canvas.selection().is_empty());
        assert!(canvas.redo());
        assert_eq!(canvas.document().shapes.len(), 1);
        assert!(!canvas.redo());
    }

    #[test]
    fn test_history_respects_cap() {
        let settings = Settings {
            max_history_steps: 5,
            ..Default::default()
        };
        let mut canvas = Canvas::new(settings);
        for i in 0..10 {
            canvas.add_arrow(Point::ZERO, Point::new(f64::from(i), 10.0));
        }
        assert_eq!(canvas.history().len(), 5);
    }

    #[test]
    fn test_delete_and_duplicate() {
        let mut canvas = canvas();
        let shape = canvas.add_shape(Shape::rectangle(Point::ZERO, Point::new(10.0, 10.0)));
        assert!(!canvas.remove(ElementRef::path(shape)));

        canvas.select(ElementRef::shape(shape));
        let copies = canvas.duplicate_selected();
        assert_eq!(copies.len(), 1);
        let copy = canvas.document().shape(copies[0].id).unwrap();
        assert_eq!(copy.start, Point::new(20.0, 20.0));
        assert_ne!(copies[0].id, shape);
        assert_eq!(canvas.selection(), copies.as_slice());

        assert_eq!(canvas.delete_selected(), 1);
        assert_eq!(canvas.document().shapes.len(), 1);
        assert_eq!(canvas.delete_selected(), 0);
    }

    #[test]
    fn test_logo_resize_clamps_at_max_scale() {
        let mut canvas = canvas();
        let ticket = canvas.add_logo("Agency", "", Point::ZERO);
        assert!(canvas.resolve_logo(&ticket, RasterImage::new(100, 50, vec![0; 100 * 50 * 4])));
        canvas.update_logo(ticket.logo_id, |l| l.scale = 100.0);
        canvas.select(ElementRef::logo(ticket.logo_id));

        drag(&mut canvas, (100.0, 50.0), (700.0, 50.0));
        let logo = canvas.document().logo(ticket.logo_id).unwrap();
        assert!((logo.scale - MAX_LOGO_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stale_logo_loads_are_ignored() {
        let mut canvas = canvas();
        let ticket = canvas.add_logo("Agency", "old", Point::ZERO);
        let fresh = canvas.set_logo_src(ticket.logo_id, "new").unwrap();
        assert_eq!(fresh.generation, ticket.generation + 1);
        let image = RasterImage::new(1, 1, vec![0; 4]);
        assert!(!canvas.resolve_logo(&ticket, image.clone()));
        assert!(canvas.resolve_logo(&fresh, image.clone()));

        canvas.remove(ElementRef::logo(fresh.logo_id));
        assert!(!canvas.resolve_logo(&fresh, image));
    }

    #[test]
    fn test_import_rejects_non_images() {
        let mut canvas = canvas();
        let result = canvas.import_image("text/plain", b"hello");
        assert!(matches!(result, Err(ImportError::InvalidType(_))));
        assert!(canvas.import_image("image/png", b"not a png").is_err());
        assert_eq!(canvas.document().width, 1200);
        assert!(canvas.document().background.is_none());
    }

    #[test]
    fn test_memory_usage() {
        let mut canvas = canvas();
        // 1200 * 800 * 4 bytes
        assert!((canvas.memory_usage_mb() - 3.7).abs() < 1e-9);
        canvas.set_background(RasterImage::new(1024, 1024, vec![0; 1024 * 1024 * 4]));
        assert!((canvas.memory_usage_mb() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_keeps_logos_and_arrows() {
        let mut canvas = canvas();
        canvas.add_shape(Shape::rectangle(Point::ZERO, Point::new(10.0, 10.0)));
        canvas.add_arrow(Point::ZERO, Point::new(10.0, 10.0));
        canvas.add_property_template(PropertyLabel::Feature, 0.0, 0.0, None);
        canvas.clear();
        assert!(canvas.document().shapes.is_empty());
        assert!(canvas.document().texts.is_empty());
        assert_eq!(canvas.document().arrows.len(), 1);
    }

    #[test]
    fn test_keyboard_commands() {
        let mut canvas = canvas();
        assert_eq!(canvas.handle_key(&KeyEvent::plain("1")), None);
        assert_eq!(canvas.current_tool(), ToolKind::Pen);
        assert_eq!(
            canvas.handle_key(&KeyEvent::new("s", Modifiers::ctrl())),
            Some(Command::Save)
        );
        let grid = canvas.settings().grid_visible;
        canvas.handle_key(&KeyEvent::plain("g"));
        assert_ne!(canvas.settings().grid_visible, grid);

        canvas.set_tool(ToolKind::Text);
        click(&mut canvas, 10.0, 10.0);
        for key in ["H", "i", "!"] {
            canvas.handle_key(&KeyEvent::plain(key));
        }
        canvas.handle_key(&KeyEvent::plain("Backspace"));
        canvas.handle_key(&KeyEvent::plain("Enter"));
        assert_eq!(canvas.document().texts[0].text, "Hi");
    }

    #[test]
    fn test_project_round_trip() {
        let mut canvas = canvas();
        canvas.set_pixels_per_foot(50.0);
        canvas.add_measurement(MeasurementKind::Distance, vec![Point::ZERO, Point::new(100.0, 0.0)]);
        canvas.add_logo("Agency", "abc", Point::new(5.0, 5.0));
        let data = ProjectData::capture(canvas.project_state());

        let mut other = Canvas::default();
        let tickets = other.apply_project(&data);
        assert_eq!(tickets.len(), 1);
        assert!((other.pixels_per_foot() - 50.0).abs() < f64::EPSILON);
        assert_eq!(other.document().measurements[0].label, "2 feet");
        assert_eq!(other.history().len(), 1);
        assert!(!other.undo());
    }
}
