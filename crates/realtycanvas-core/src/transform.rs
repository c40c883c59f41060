//! Move, resize and rotate driven by pointer deltas.
//!
//! Deltas are incremental: each call receives the offset since the previous
//! pointer position, not since the start of the gesture.

use crate::document::CanvasDocument;
use crate::elements::{ElementKind, ElementRef, TextMeasurer};
use crate::selection::{Corner, HandlePosition, ResizeHandle};
use kurbo::{Point, Vec2};

/// Pointer travel (dx + dy) that doubles a text's font size.
const TEXT_SCALE_DIVISOR: f64 = 200.0;
/// Lower bound on a single resize step factor.
const MIN_STEP_FACTOR: f64 = 0.1;

/// Translate every target by `delta`. Returns `true` if anything moved.
pub fn move_elements(document: &mut CanvasDocument, targets: &[ElementRef], delta: Vec2) -> bool {
    let mut moved = false;
    for target in targets {
        moved |= document.translate(*target, delta);
    }
    moved
}

/// Angle of `pointer` around `center`, measured so that straight up is 0°,
/// normalised to `[0, 360)` and rounded to whole degrees.
pub fn rotation_angle(center: Point, pointer: Point) -> f64 {
    let radians = (pointer.y - center.y).atan2(pointer.x - center.x);
    (radians.to_degrees() + 90.0).rem_euclid(360.0).round() % 360.0
}

/// Font-scale factor for a text corner drag.
pub fn text_scale_factor(corner: Corner, delta: Vec2) -> f64 {
    let travel = match corner {
        Corner::SouthEast => delta.x + delta.y,
        Corner::NorthWest => -(delta.x + delta.y),
        Corner::NorthEast => delta.x - delta.y,
        Corner::SouthWest => -delta.x + delta.y,
    };
    (1.0 + travel / TEXT_SCALE_DIVISOR).max(MIN_STEP_FACTOR)
}

/// Scale factor for a logo corner drag; west handles invert the x delta.
pub fn logo_scale_factor(corner: Corner, delta: Vec2, scaled_width: f64) -> f64 {
    if scaled_width <= 0.0 {
        return 1.0;
    }
    let dx = if corner.is_west() { -delta.x } else { delta.x };
    (1.0 + dx / scaled_width).max(MIN_STEP_FACTOR)
}

/// Apply one step of a handle drag.
///
/// `pointer` is the absolute pointer position (used by arrow endpoints and the
/// rotation knob); `delta` is the offset since the previous step.
pub fn apply_handle(
    document: &mut CanvasDocument,
    handle: &ResizeHandle,
    pointer: Point,
    delta: Vec2,
    measurer: &dyn TextMeasurer,
) -> bool {
    let id = handle.target.id;
    match (handle.target.kind, handle.position) {
        (ElementKind::Text, HandlePosition::Rotation) => document.update_text(id, |text| {
            text.rotation = rotation_angle(text.center(), pointer);
        }),
        (ElementKind::Text, HandlePosition::Corner(corner)) => document.update_text(id, |text| {
            text.scale_font(text_scale_factor(corner, delta));
            match corner {
                Corner::NorthWest => text.position += delta,
                Corner::NorthEast => text.position.y += delta.y,
                Corner::SouthWest => text.position.x += delta.x,
                Corner::SouthEast => {}
            }
            text.remeasure(measurer);
        }),
        (ElementKind::Logo, HandlePosition::Corner(corner)) => {
            let Some((width, _)) = document.logo(id).and_then(|l| l.scaled_size()) else {
                return false;
            };
            let factor = logo_scale_factor(corner, delta, width);
            document.update_logo(id, |logo| {
                logo.apply_scale_factor(factor);
                match corner {
                    Corner::NorthWest => logo.position += delta,
                    Corner::NorthEast => logo.position.y += delta.y,
                    Corner::SouthWest => logo.position.x += delta.x,
                    Corner::SouthEast => {}
                }
            })
        }
        (ElementKind::Arrow, HandlePosition::Start) => document.update_arrow(id, |a| a.start = pointer),
        (ElementKind::Arrow, HandlePosition::End) => document.update_arrow(id, |a| a.end = pointer),
        (ElementKind::Shape, HandlePosition::Corner(corner)) => {
            document.update_shape(id, |shape| shape.resize_corner(corner, delta))
        }
        (kind, position) => {
            log::debug!("Ignoring handle {:?} on {:?}", position, kind);
            false
        }
    }
}
