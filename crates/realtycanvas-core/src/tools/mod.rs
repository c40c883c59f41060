//! Tool system: the active tool, drag state and in-progress constructions.

mod pen;

pub use pen::{CLOSE_DISTANCE, PathBuilder, PenOutcome};

use crate::elements::{ElementId, ShapeKind, VectorPath};
use crate::geometry::distance;
use crate::input::DOUBLE_CLICK_DISTANCE;
use crate::selection::ResizeHandle;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Move,
    Pen,
    Square,
    Circle,
    Polygon,
    Text,
    Ruler,
    Area,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Move,
        ToolKind::Pen,
        ToolKind::Square,
        ToolKind::Circle,
        ToolKind::Polygon,
        ToolKind::Text,
        ToolKind::Ruler,
        ToolKind::Area,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Move => "move",
            ToolKind::Pen => "pen",
            ToolKind::Square => "square",
            ToolKind::Circle => "circle",
            ToolKind::Polygon => "polygon",
            ToolKind::Text => "text",
            ToolKind::Ruler => "ruler",
            ToolKind::Area => "area",
        }
    }

    /// Shape drawn by drag tools.
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Square => Some(ShapeKind::Rectangle),
            ToolKind::Circle => Some(ShapeKind::Circle),
            _ => None,
        }
    }

    /// Tools that build a polyline click by click.
    pub fn builds_path(self) -> bool {
        matches!(self, ToolKind::Pen | ToolKind::Polygon)
    }
}

/// State of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ToolState {
    #[default]
    Idle,
    /// Square/circle/ruler drag.
    Drawing { start: Point, current: Point },
    /// Dragging the selection; `moved` records whether any delta was applied.
    Moving { last: Point, moved: bool },
    /// Dragging a resize or rotation handle.
    Resizing { handle: ResizeHandle, last: Point, changed: bool },
}

/// Text being typed before it becomes an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInput {
    pub position: Point,
    pub text: String,
    /// Annotation being edited. It stays in the document until the edit is committed.
    pub editing: Option<ElementId>,
}

/// What the renderer draws transiently on top of the committed scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Shape { kind: ShapeKind, start: Point, end: Point },
    /// Path under construction.
    Path(VectorPath),
    /// Dashed guide from the last anchor (or area vertex) to the pointer with its pixel length.
    Guide { from: Point, to: Point, length: f64 },
    /// Dot where the next pen path would start.
    PenStart(Point),
    Ruler { start: Point, end: Point, length: f64 },
    /// Area vertices collected so far.
    AreaOutline(Vec<Point>),
    TextCursor { position: Point, text: String },
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    current_tool: ToolKind,
    pub state: ToolState,
    pen: PathBuilder,
    area_points: Vec<Point>,
    hover: Option<Point>,
    text_input: Option<TextInput>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    /// Switch tools, dropping any in-progress gesture or construction.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != self.current_tool {
            log::debug!("Tool {} -> {}", self.current_tool.name(), tool.name());
        }
        self.current_tool = tool;
        self.state = ToolState::Idle;
        self.pen.cancel();
        self.area_points.clear();
        self.hover = None;
    }

    pub fn pen(&self) -> &PathBuilder {
        &self.pen
    }

    pub fn pen_mut(&mut self) -> &mut PathBuilder {
        &mut self.pen
    }

    pub fn area_points(&self) -> &[Point] {
        &self.area_points
    }

    /// Add an area vertex. Returns the finished polygon when the click closes it.
    pub fn area_click(&mut self, point: Point) -> Option<Vec<Point>> {
        let closes = self.area_points.len() > 2
            && self
                .area_points
                .first()
                .is_some_and(|first| distance(point, *first) < CLOSE_DISTANCE);
        if closes {
            return self.finish_area();
        }
        let repeated = self
            .area_points
            .last()
            .is_some_and(|last| distance(point, *last) < DOUBLE_CLICK_DISTANCE);
        if !repeated {
            self.area_points.push(point);
        }
        None
    }

    /// Take the area vertices if they form a polygon.
    pub fn finish_area(&mut self) -> Option<Vec<Point>> {
        if self.area_points.len() < 3 {
            return None;
        }
        self.hover = None;
        Some(std::mem::take(&mut self.area_points))
    }

    pub fn set_hover(&mut self, point: Point) {
        self.hover = Some(point);
        self.pen.hover(point);
    }

    pub fn text_input(&self) -> Option<&TextInput> {
        self.text_input.as_ref()
    }

    pub fn text_input_mut(&mut self) -> Option<&mut TextInput> {
        self.text_input.as_mut()
    }

    pub fn begin_text_input(&mut self, input: TextInput) -> Option<TextInput> {
        self.text_input.replace(input)
    }

    pub fn take_text_input(&mut self) -> Option<TextInput> {
        self.text_input.take()
    }

    /// Cancel every in-progress construction (Esc).
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.pen.cancel();
        self.area_points.clear();
    }

    /// Transient drawing for the current state.
    pub fn preview(&self) -> Vec<Preview> {
        let mut previews = Vec::new();

        if let ToolState::Drawing { start, current } = self.state {
            match self.current_tool {
                ToolKind::Ruler => previews.push(Preview::Ruler {
                    start,
                    end: current,
                    length: distance(start, current),
                }),
                tool => {
                    if let Some(kind) = tool.shape_kind() {
                        previews.push(Preview::Shape {
                            kind,
                            start,
                            end: current,
                        });
                    }
                }
            }
        }

        if let Some(path) = self.pen.current() {
            previews.push(Preview::Path(path.clone()));
            if let (Some(from), Some(to)) = (path.last(), self.pen.preview()) {
                previews.push(Preview::Guide {
                    from,
                    to,
                    length: distance(from, to),
                });
            }
        } else if self.current_tool.builds_path() {
            if let Some(hover) = self.hover {
                previews.push(Preview::PenStart(hover));
            }
        }

        if !self.area_points.is_empty() {
            previews.push(Preview::AreaOutline(self.area_points.clone()));
            if let (Some(from), Some(to)) = (self.area_points.last(), self.hover) {
                previews.push(Preview::Guide {
                    from: *from,
                    to,
                    length: distance(*from, to),
                });
            }
        }

        if let Some(input) = &self.text_input {
            previews.push(Preview::TextCursor {
                position: input.position,
                text: input.text.clone(),
            });
        }

        previews
    }
}
