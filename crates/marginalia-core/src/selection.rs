//! Marquee selection and move/resize of ink groups.

use crate::ink::{Stroke, StrokeId, union_bounds};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Corner of the selection box carrying a resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Position of this corner on `rect`.
    pub fn of(self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }
}

/// A resize handle in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub corner: Corner,
    pub position: Point,
}

impl Handle {
    /// Square hit target of side `size` centred on the corner.
    pub fn hit_rect(&self, size: f64) -> Rect {
        Rect::from_center_size(self.position, (size, size))
    }

    pub fn hit_test(&self, point: Point, size: f64) -> bool {
        let half = size / 2.0;
        (point.x - self.position.x).abs() <= half && (point.y - self.position.y).abs() <= half
    }
}

/// Normalised rectangle spanned by a marquee drag.
pub fn marquee_rect(start: Point, end: Point) -> Rect {
    Rect::from_points(start, end)
}

/// A group of selected strokes and the padded box shown around them.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub ids: Vec<StrokeId>,
    pub rect: Rect,
}

impl Selection {
    /// Select every stroke with at least one point inside `marquee`.
    /// Returns `None` when nothing is touched.
    pub fn from_marquee(strokes: &[Stroke], marquee: Rect, padding: f64) -> Option<Self> {
        let ids: Vec<StrokeId> = strokes
            .iter()
            .filter(|s| s.touches_rect(marquee))
            .map(|s| s.id)
            .collect();
        let rect = padded_bounds(strokes, &ids, padding)?;
        Some(Self { ids, rect })
    }

    pub fn contains_stroke(&self, id: StrokeId) -> bool {
        self.ids.contains(&id)
    }

    /// Recompute the box from the strokes' current positions. Returns false
    /// if none of the selected strokes remain.
    pub fn refresh(&mut self, strokes: &[Stroke], padding: f64) -> bool {
        self.ids.retain(|id| strokes.iter().any(|s| s.id == *id));
        match padded_bounds(strokes, &self.ids, padding) {
            Some(rect) => {
                self.rect = rect;
                true
            }
            None => false,
        }
    }

    pub fn handles(&self) -> [Handle; 4] {
        Corner::ALL.map(|corner| Handle {
            corner,
            position: corner.of(self.rect),
        })
    }

    /// The handle under `point`, if any.
    pub fn hit_handle(&self, point: Point, handle_size: f64) -> Option<Corner> {
        self.handles()
            .into_iter()
            .find(|h| h.hit_test(point, handle_size))
            .map(|h| h.corner)
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rect.contains(point)
    }

    /// Top-left of the box, the reference for move grab offsets.
    pub fn origin(&self) -> Point {
        self.rect.origin()
    }

    /// Translate the selected strokes and the box together.
    pub fn translate(&mut self, strokes: &mut [Stroke], delta: Vec2) {
        for stroke in strokes.iter_mut().filter(|s| self.ids.contains(&s.id)) {
            stroke.translate(delta);
        }
        self.rect = self.rect + delta;
    }
}

fn padded_bounds(strokes: &[Stroke], ids: &[StrokeId], padding: f64) -> Option<Rect> {
    union_bounds(strokes.iter().filter(|s| ids.contains(&s.id))).map(|r| r.inflate(padding, padding))
}

/// New box for a handle dragged to `pointer`. The opposite corner stays
/// fixed and neither side may shrink below `min_size`.
pub fn resize_rect(original: Rect, corner: Corner, pointer: Point, min_size: f64) -> Rect {
    let Rect { x0, y0, x1, y1 } = original;
    match corner {
        Corner::TopLeft => Rect::new(pointer.x.min(x1 - min_size), pointer.y.min(y1 - min_size), x1, y1),
        Corner::TopRight => Rect::new(x0, pointer.y.min(y1 - min_size), pointer.x.max(x0 + min_size), y1),
        Corner::BottomLeft => Rect::new(pointer.x.min(x1 - min_size), y0, x1, pointer.y.max(y0 + min_size)),
        Corner::BottomRight => Rect::new(x0, y0, pointer.x.max(x0 + min_size), pointer.y.max(y0 + min_size)),
    }
}

/// Rescale `stroke` from its pre-resize snapshot. Point offsets from the
/// original box's centre are multiplied by the width and height ratios.
pub fn rescale_from(stroke: &mut Stroke, original: &Stroke, original_rect: Rect, new_rect: Rect) {
    let sx = new_rect.width() / original_rect.width().max(f64::EPSILON);
    let sy = new_rect.height() / original_rect.height().max(f64::EPSILON);
    let center = original_rect.center();
    stroke.points.clone_from(&original.points);
    stroke.scale_about(center, sx, sy);
}
