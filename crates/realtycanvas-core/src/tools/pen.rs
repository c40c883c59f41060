//! Click-by-click polyline construction for the pen and polygon tools.

use crate::elements::{SerializableColor, VectorPath};
use crate::geometry::distance;
use crate::input::DOUBLE_CLICK_DISTANCE;
use kurbo::Point;

/// Clicking closer than this to the first anchor closes the path.
pub const CLOSE_DISTANCE: f64 = 10.0;

/// What a click did to the path under construction.
#[derive(Debug, Clone, PartialEq)]
pub enum PenOutcome {
    /// A new path was started with one anchor.
    Started,
    /// An anchor was appended.
    Appended,
    /// The click landed on the first anchor; the closed path is returned for commit.
    Closed(VectorPath),
    /// The click repeated the last anchor (the second press of a double click); nothing was added.
    Repeated,
}

/// A path under construction plus its transient preview segment.
///
/// The path only becomes part of a document when [`PathBuilder::finish`] or a
/// closing click hands it out.
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    path: Option<VectorPath>,
    preview: Option<Point>,
}

impl PathBuilder {
    pub fn is_creating(&self) -> bool {
        self.path.is_some()
    }

    pub fn current(&self) -> Option<&VectorPath> {
        self.path.as_ref()
    }

    /// Pointer position the guide segment is drawn to.
    pub fn preview(&self) -> Option<Point> {
        self.preview
    }

    /// Handle a click.
    pub fn click(&mut self, point: Point, stroke: SerializableColor, stroke_width: f64) -> PenOutcome {
        let Some(path) = self.path.as_mut() else {
            self.path = Some(VectorPath::new(point, stroke, stroke_width));
            return PenOutcome::Started;
        };

        let near_first = path.first().is_some_and(|first| distance(point, first) < CLOSE_DISTANCE);
        if near_first && path.len() > 2 {
            if let Some(closed) = self.finish(true) {
                return PenOutcome::Closed(closed);
            }
        }

        let Some(path) = self.path.as_mut() else {
            return PenOutcome::Repeated;
        };
        if path.last().is_some_and(|last| distance(point, last) < DOUBLE_CLICK_DISTANCE) {
            return PenOutcome::Repeated;
        }
        path.push(point);
        PenOutcome::Appended
    }

    /// Update the guide segment while creating.
    pub fn hover(&mut self, point: Point) {
        if self.path.is_some() {
            self.preview = Some(point);
        }
    }

    /// Hand out the path if it has at least two anchors. Otherwise nothing changes.
    pub fn finish(&mut self, closed: bool) -> Option<VectorPath> {
        if self.path.as_ref().is_none_or(|p| p.len() < 2) {
            return None;
        }
        let mut path = self.path.take()?;
        path.closed = closed;
        self.preview = None;
        Some(path)
    }

    /// Drop the path and preview without committing.
    pub fn cancel(&mut self) {
        self.path = None;
        self.preview = None;
    }
}
