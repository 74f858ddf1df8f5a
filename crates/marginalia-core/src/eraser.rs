//! Proximity eraser: removes whole strokes near the pointer.

use crate::ink::Stroke;
use kurbo::Point;

/// Remove every stroke with a point closer than `radius` to `position`.
/// Returns how many strokes were removed.
pub fn erase_at(strokes: &mut Vec<Stroke>, position: Point, radius: f64) -> usize {
    let before = strokes.len();
    strokes.retain(|stroke| !stroke.touches_circle(position, radius));
    before - strokes.len()
}
