//! Summaries of persisted ink, for the inspection binary.

use kurbo::Rect;
use marginalia_core::ink::union_bounds;
use marginalia_core::{InkTool, ViewId, ViewMap};
use std::fmt;

/// Per-view statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSummary {
    pub view: ViewId,
    pub strokes: usize,
    pub points: usize,
    pub pen: usize,
    pub highlighter: usize,
    /// Union of the stroke bounds in document units.
    pub bounds: Option<Rect>,
}

pub fn summarize(views: &ViewMap) -> Vec<ViewSummary> {
    views
        .iter()
        .map(|(view, strokes)| ViewSummary {
            view: view.clone(),
            strokes: strokes.len(),
            points: strokes.iter().map(|s| s.len()).sum(),
            pen: strokes.iter().filter(|s| s.tool == InkTool::Pen).count(),
            highlighter: strokes.iter().filter(|s| s.tool == InkTool::Highlighter).count(),
            bounds: union_bounds(strokes),
        })
        .collect()
}

impl fmt::Display for ViewSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} {:>5} strokes ({} pen, {} highlighter), {:>6} points",
            self.view.as_str(),
            self.strokes,
            self.pen,
            self.highlighter,
            self.points
        )?;
        if let Some(b) = self.bounds {
            write!(f, ", bounds ({:.0}, {:.0})-({:.0}, {:.0})", b.x0, b.y0, b.x1, b.y1)?;
        }
        Ok(())
    }
}
