//! RealtyCanvas Core Library
//!
//! Scene model, hit-testing, transforms, tools and persistence for annotating
//! real-estate photos. Rendering lives in `realtycanvas-render`.

pub mod canvas;
pub mod document;
pub mod elements;
pub mod files;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layer;
pub mod selection;
pub mod settings;
pub mod shortcuts;
pub mod storage;
pub mod templates;
pub mod tools;
pub mod transform;

pub use canvas::{Canvas, PropertyLabel};
pub use document::{CanvasDocument, DocumentSnapshot};
pub use elements::{
    Arrow, Element, ElementId, ElementKind, ElementRef, Logo, LogoLoad, Measurement, MeasurementKind,
    MeasurementUnit, SerializableColor, Shape, ShapeKind, TextAnnotation, TextMeasurer, VectorPath,
};
pub use files::{ImportError, ImportResult, RasterImage};
pub use history::History;
pub use input::{ClickTracker, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use layer::{Layer, LayerId, LayerStack};
pub use selection::{Corner, HandleKind, HandlePosition, ResizeHandle};
pub use settings::{ExportFormat, Settings};
pub use shortcuts::{Command, Shortcut, ShortcutRegistry};
pub use storage::{FileStorage, MemoryStorage, ProjectData, ProjectState, Storage, StorageError, StorageResult};
pub use templates::{PropertyTemplate, TemplateCatalog, TemplateCategory, TemplateError};
pub use tools::{Preview, ToolKind, ToolManager, ToolState};
