//! Ruler: straight lines snapped to fixed angle increments.

use crate::ink::{InkPoint, InkTool, Stroke};
use crate::tools::ToolManager;
use kurbo::Point;

/// Snap `cursor` to the nearest multiple of `increment` (radians) around
/// `start`, keeping the true cursor distance.
pub fn snap_endpoint(start: Point, cursor: Point, increment: f64) -> Point {
    let delta = cursor - start;
    let length = delta.hypot();
    if length < f64::EPSILON {
        return start;
    }
    let angle = delta.y.atan2(delta.x);
    let snapped = (angle / increment).round() * increment;
    Point::new(start.x + length * snapped.cos(), start.y + length * snapped.sin())
}

/// Build the committed two-point stroke, or `None` if the segment is not
/// longer than `min_length`.
pub fn commit(tools: &ToolManager, tool: InkTool, start: Point, end: Point, min_length: f64) -> Option<Stroke> {
    if start.distance(end) <= min_length {
        return None;
    }
    let stroke = Stroke::new(tool, tools.color, tools.size).with_points(vec![
        InkPoint::new(start.x, start.y),
        InkPoint::new(end.x, end.y),
    ]);
    Some(stroke)
}
