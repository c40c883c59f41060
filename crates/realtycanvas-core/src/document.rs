//! The element collections behind a canvas.

use crate::elements::{
    Arrow, Element, ElementId, ElementKind, ElementRef, Logo, Measurement, Shape, TextAnnotation, VectorPath,
};
use crate::files::RasterImage;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CANVAS_WIDTH: u32 = 1200;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 800;

/// All committed elements, each collection in insertion (z) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasDocument {
    pub width: u32,
    pub height: u32,
    pub shapes: Vec<Shape>,
    #[serde(rename = "completedVectorPaths")]
    pub paths: Vec<VectorPath>,
    #[serde(rename = "textAnnotations")]
    pub texts: Vec<TextAnnotation>,
    pub logos: Vec<Logo>,
    pub arrows: Vec<Arrow>,
    pub measurements: Vec<Measurement>,
    /// Decoded photo drawn on the background layer.
    #[serde(skip)]
    pub background: Option<RasterImage>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            shapes: Vec::new(),
            paths: Vec::new(),
            texts: Vec::new(),
            logos: Vec::new(),
            arrows: Vec::new(),
            measurements: Vec::new(),
            background: None,
        }
    }
}

/// Element collections captured for undo/redo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
    shapes: Vec<Shape>,
    paths: Vec<VectorPath>,
    texts: Vec<TextAnnotation>,
    logos: Vec<Logo>,
    arrows: Vec<Arrow>,
    measurements: Vec<Measurement>,
}

impl DocumentSnapshot {
    pub fn element_count(&self) -> usize {
        self.shapes.len()
            + self.paths.len()
            + self.texts.len()
            + self.logos.len()
            + self.arrows.len()
            + self.measurements.len()
    }
}

fn find_in<T: Element>(items: &[T], id: ElementId) -> Option<&T> {
    items.iter().find(|e| e.id() == id)
}

fn update_in<T: Element>(items: &mut [T], id: ElementId, f: impl FnOnce(&mut T)) -> bool {
    match items.iter_mut().find(|e| e.id() == id) {
        Some(element) => {
            f(element);
            true
        }
        None => false,
    }
}

fn remove_in<T: Element>(items: &mut Vec<T>, id: ElementId) -> bool {
    let before = items.len();
    items.retain(|e| e.id() != id);
    items.len() != before
}

/// Most recently added visible element under `point`.
fn topmost<T: Element>(items: &[T], point: Point) -> Option<&T> {
    items.iter().rev().find(|e| e.is_visible() && e.hit_test(point))
}

fn duplicate_in<T: Element + Clone>(items: &mut Vec<T>, id: ElementId, offset: Vec2) -> Option<ElementId> {
    let mut copy = find_in(items, id)?.clone();
    copy.regenerate_id();
    copy.translate(offset);
    let new_id = copy.id();
    items.push(copy);
    Some(new_id)
}

macro_rules! element_accessors {
    ($ty:ty, $field:ident, $add:ident, $get:ident, $update:ident, $remove:ident, $at:ident) => {
        pub fn $add(&mut self, element: $ty) -> ElementId {
            let id = element.id();
            self.$field.push(element);
            id
        }

        pub fn $get(&self, id: ElementId) -> Option<&$ty> {
            find_in(&self.$field, id)
        }

        /// Apply `f` to the element. Returns `false` if the id is unknown.
        pub fn $update(&mut self, id: ElementId, f: impl FnOnce(&mut $ty)) -> bool {
            update_in(&mut self.$field, id, f)
        }

        /// Remove the element. Unknown ids are ignored.
        pub fn $remove(&mut self, id: ElementId) -> bool {
            remove_in(&mut self.$field, id)
        }

        pub fn $at(&self, point: Point) -> Option<&$ty> {
            topmost(&self.$field, point)
        }
    };
}

impl CanvasDocument {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    element_accessors!(Shape, shapes, add_shape, shape, update_shape, remove_shape, shape_at);
    element_accessors!(VectorPath, paths, add_path, path, update_path, remove_path, path_at);
    element_accessors!(TextAnnotation, texts, add_text, text, update_text, remove_text, text_at);
    element_accessors!(Logo, logos, add_logo, logo, update_logo, remove_logo, logo_at);
    element_accessors!(Arrow, arrows, add_arrow, arrow, update_arrow, remove_arrow, arrow_at);
    element_accessors!(
        Measurement,
        measurements,
        add_measurement,
        measurement,
        update_measurement,
        remove_measurement,
        measurement_at
    );

    /// Replace the photo and adopt its native size.
    pub fn set_background(&mut self, image: RasterImage) {
        self.width = image.width;
        self.height = image.height;
        self.background = Some(image);
    }

    pub fn element(&self, target: ElementRef) -> Option<&dyn Element> {
        let id = target.id;
        match target.kind {
            ElementKind::Shape => self.shape(id).map(|e| e as &dyn Element),
            ElementKind::VectorPath => self.path(id).map(|e| e as &dyn Element),
            ElementKind::Text => self.text(id).map(|e| e as &dyn Element),
            ElementKind::Logo => self.logo(id).map(|e| e as &dyn Element),
            ElementKind::Arrow => self.arrow(id).map(|e| e as &dyn Element),
            ElementKind::Measurement => self.measurement(id).map(|e| e as &dyn Element),
        }
    }

    fn element_mut(&mut self, target: ElementRef) -> Option<&mut dyn Element> {
        let id = target.id;
        match target.kind {
            ElementKind::Shape => self.shapes.iter_mut().find(|e| e.id == id).map(|e| e as &mut dyn Element),
            ElementKind::VectorPath => self.paths.iter_mut().find(|e| e.id == id).map(|e| e as &mut dyn Element),
            ElementKind::Text => self.texts.iter_mut().find(|e| e.id == id).map(|e| e as &mut dyn Element),
            ElementKind::Logo => self.logos.iter_mut().find(|e| e.id == id).map(|e| e as &mut dyn Element),
            ElementKind::Arrow => self.arrows.iter_mut().find(|e| e.id == id).map(|e| e as &mut dyn Element),
            ElementKind::Measurement => self
                .measurements
                .iter_mut()
                .find(|e| e.id == id)
                .map(|e| e as &mut dyn Element),
        }
    }

    pub fn contains(&self, target: ElementRef) -> bool {
        self.element(target).is_some()
    }

    pub fn bounds(&self, target: ElementRef) -> Option<Rect> {
        self.element(target)?.bounds()
    }

    /// Move an element by `delta`. Returns `false` if it no longer exists.
    pub fn translate(&mut self, target: ElementRef, delta: Vec2) -> bool {
        match self.element_mut(target) {
            Some(element) => {
                element.translate(delta);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, target: ElementRef) -> bool {
        let id = target.id;
        match target.kind {
            ElementKind::Shape => self.remove_shape(id),
            ElementKind::VectorPath => self.remove_path(id),
            ElementKind::Text => self.remove_text(id),
            ElementKind::Logo => self.remove_logo(id),
            ElementKind::Arrow => self.remove_arrow(id),
            ElementKind::Measurement => self.remove_measurement(id),
        }
    }

    /// Append an offset copy with fresh ids. Returns a reference to the copy.
    pub fn duplicate(&mut self, target: ElementRef, offset: Vec2) -> Option<ElementRef> {
        let id = target.id;
        let new_id = match target.kind {
            ElementKind::Shape => duplicate_in(&mut self.shapes, id, offset),
            ElementKind::VectorPath => duplicate_in(&mut self.paths, id, offset),
            ElementKind::Text => duplicate_in(&mut self.texts, id, offset),
            ElementKind::Logo => duplicate_in(&mut self.logos, id, offset),
            ElementKind::Arrow => duplicate_in(&mut self.arrows, id, offset),
            ElementKind::Measurement => duplicate_in(&mut self.measurements, id, offset),
        }?;
        Some(ElementRef::new(target.kind, new_id))
    }

    /// Whether the document holds no elements (the background is ignored).
    pub fn is_empty(&self) -> bool {
        self.snapshot().element_count() == 0
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            shapes: self.shapes.clone(),
            paths: self.paths.clone(),
            texts: self.texts.clone(),
            logos: self.logos.clone(),
            arrows: self.arrows.clone(),
            measurements: self.measurements.clone(),
        }
    }

    /// Replace the collections with a snapshot.
    ///
    /// Logos that were still loading when the snapshot was taken pick up the
    /// image resolved since, as long as the generation matches.
    pub fn restore(&mut self, snapshot: &DocumentSnapshot) {
        let mut logos = snapshot.logos.clone();
        for logo in logos.iter_mut().filter(|l| l.image.is_none()) {
            if let Some(live) = self
                .logos
                .iter()
                .find(|l| l.id == logo.id && l.generation == logo.generation)
            {
                logo.image = live.image.clone();
            }
        }

        self.shapes = snapshot.shapes.clone();
        self.paths = snapshot.paths.clone();
        self.texts = snapshot.texts.clone();
        self.logos = logos;
        self.arrows = snapshot.arrows.clone();
        self.measurements = snapshot.measurements.clone();
    }
}
