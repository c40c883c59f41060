//! Selection handles: geometry and hit-testing.

use crate::document::CanvasDocument;
use crate::elements::{ElementKind, ElementRef};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Handle square size in pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Extra pick slop around a handle.
pub const HANDLE_HIT_TOLERANCE: f64 = 4.0;
/// Radius of the text rotation knob.
pub const ROTATION_HANDLE_RADIUS: f64 = 6.0;
/// Distance of the rotation knob above the text box.
pub const ROTATION_HANDLE_OFFSET: f64 = 30.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthWest,
        Corner::SouthEast,
    ];

    /// Short position code (`nw`, `ne`, `sw`, `se`).
    pub fn code(self) -> &'static str {
        match self {
            Corner::NorthWest => "nw",
            Corner::NorthEast => "ne",
            Corner::SouthWest => "sw",
            Corner::SouthEast => "se",
        }
    }

    pub fn is_west(self) -> bool {
        matches!(self, Corner::NorthWest | Corner::SouthWest)
    }
}

/// Where a handle sits on its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlePosition {
    Corner(Corner),
    /// Arrow start point.
    Start,
    /// Arrow end point.
    End,
    /// Text rotation knob.
    Rotation,
}

/// Broad handle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner,
    Endpoint,
    Rotation,
}

/// A transient handle computed for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeHandle {
    pub position: HandlePosition,
    pub target: ElementRef,
    /// Handle center in canvas coordinates.
    pub point: Point,
    pub size: f64,
}

impl ResizeHandle {
    pub fn new(position: HandlePosition, target: ElementRef, point: Point) -> Self {
        Self {
            position,
            target,
            point,
            size: HANDLE_SIZE,
        }
    }

    pub fn kind(&self) -> HandleKind {
        match self.position {
            HandlePosition::Corner(_) => HandleKind::Corner,
            HandlePosition::Start | HandlePosition::End => HandleKind::Endpoint,
            HandlePosition::Rotation => HandleKind::Rotation,
        }
    }

    /// Check if a point hits this handle.
    pub fn hit_test(&self, point: Point) -> bool {
        let dx = (point.x - self.point.x).abs();
        let dy = (point.y - self.point.y).abs();
        match self.position {
            HandlePosition::Rotation => {
                let reach = ROTATION_HANDLE_RADIUS + HANDLE_HIT_TOLERANCE;
                dx * dx + dy * dy <= reach * reach
            }
            _ => {
                let reach = self.size / 2.0 + HANDLE_HIT_TOLERANCE;
                dx <= reach && dy <= reach
            }
        }
    }
}

/// All handles for the current selection, in hit-test priority order.
///
/// Selected text annotations come first (corners plus rotation knob), then
/// the handles of every other selected element in selection order.
pub fn get_handles(document: &CanvasDocument, selection: &[ElementRef]) -> Vec<ResizeHandle> {
    let mut handles = Vec::new();

    for text in document.texts.iter().filter(|t| t.selected && t.visible) {
        let target = ElementRef::text(text.id);
        let (x, y, w, h) = (text.position.x, text.position.y, text.width, text.height);
        handles.push(ResizeHandle::new(
            HandlePosition::Rotation,
            target,
            Point::new(x + w / 2.0, y - ROTATION_HANDLE_OFFSET),
        ));
        // Aligned with the padded outline drawn at (x - 4, y - 2).
        for (corner, point) in [
            (Corner::NorthWest, Point::new(x - 4.0, y - 2.0)),
            (Corner::NorthEast, Point::new(x + w - 4.0, y - 2.0)),
            (Corner::SouthWest, Point::new(x - 4.0, y + h - 2.0)),
            (Corner::SouthEast, Point::new(x + w - 4.0, y + h - 2.0)),
        ] {
            handles.push(ResizeHandle::new(HandlePosition::Corner(corner), target, point));
        }
    }

    for target in selection {
        match target.kind {
            ElementKind::Arrow => {
                if let Some(arrow) = document.arrow(target.id) {
                    handles.push(ResizeHandle::new(HandlePosition::Start, *target, arrow.start));
                    handles.push(ResizeHandle::new(HandlePosition::End, *target, arrow.end));
                }
            }
            ElementKind::Logo => {
                if let Some(rect) = document.logo(target.id).and_then(|l| l.rect()) {
                    for (corner, point) in [
                        (Corner::NorthWest, Point::new(rect.x0, rect.y0)),
                        (Corner::NorthEast, Point::new(rect.x1, rect.y0)),
                        (Corner::SouthWest, Point::new(rect.x0, rect.y1)),
                        (Corner::SouthEast, Point::new(rect.x1, rect.y1)),
                    ] {
                        handles.push(ResizeHandle::new(HandlePosition::Corner(corner), *target, point));
                    }
                }
            }
            ElementKind::Shape => {
                if let Some(shape) = document.shape(target.id) {
                    for corner in Corner::ALL {
                        handles.push(ResizeHandle::new(
                            HandlePosition::Corner(corner),
                            *target,
                            shape.corner(corner),
                        ));
                    }
                }
            }
            // Text handles were added above; paths and measurements have none.
            ElementKind::Text | ElementKind::VectorPath | ElementKind::Measurement => {}
        }
    }

    handles
}

/// First handle under `point`.
pub fn hit_test_handles(handles: &[ResizeHandle], point: Point) -> Option<ResizeHandle> {
    handles.iter().find(|h| h.hit_test(point)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Arrow, Shape, TextAnnotation};

    #[test]
    fn test_corner_hit_box() {
        let handle = ResizeHandle::new(
            HandlePosition::Corner(Corner::SouthEast),
            ElementRef::shape(uuid::Uuid::new_v4()),
            Point::new(100.0, 100.0),
        );
        assert_eq!(handle.kind(), HandleKind::Corner);
        assert!(handle.hit_test(Point::new(108.0, 92.0)));
        assert!(!handle.hit_test(Point::new(108.5, 100.0)));
    }

    #[test]
    fn test_shape_handles_use_normalized_corners() {
        let mut doc = CanvasDocument::default();
        let id = doc.add_shape(Shape::rectangle(Point::new(100.0, 100.0), Point::new(0.0, 0.0)));
        let handles = get_handles(&doc, &[ElementRef::shape(id)]);
        assert_eq!(handles.len(), 4);
        let nw = handles
            .iter()
            .find(|h| h.position == HandlePosition::Corner(Corner::NorthWest))
            .unwrap();
        assert_eq!(nw.point, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_selected_text_handles_come_first() {
        let mut doc = CanvasDocument::default();
        let arrow_id = doc.add_arrow(Arrow::new(Point::new(0.0, 0.0), Point::new(50.0, 50.0)));
        let mut text = TextAnnotation::new("Lot", Point::new(200.0, 200.0), 16.0);
        text.width = 40.0;
        text.selected = true;
        let text_id = doc.add_text(text);

        let handles = get_handles(&doc, &[ElementRef::arrow(arrow_id), ElementRef::text(text_id)]);
        assert_eq!(handles.len(), 7);
        assert_eq!(handles[0].position, HandlePosition::Rotation);
        assert_eq!(handles[0].point, Point::new(220.0, 170.0));
        assert_eq!(handles[5].position, HandlePosition::Start);

        let hit = hit_test_handles(&handles, Point::new(226.0, 172.0)).unwrap();
        assert_eq!(hit.kind(), HandleKind::Rotation);
    }

    #[test]
    fn test_unloaded_logo_has_no_handles() {
        let mut doc = CanvasDocument::default();
        let id = doc.add_logo(crate::elements::Logo::new("Brand", "", Point::ZERO));
        assert!(get_handles(&doc, &[ElementRef::logo(id)]).is_empty());
    }
}
