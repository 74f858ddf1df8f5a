//! Incremental and full-redraw ink rendering.

use crate::surface::{InkSurface, line_style};
use kurbo::{Affine, BezPath, Point, Rect, Shape};
use marginalia_core::engine::{RulerPreview, Scene, SelectionOverlay};
use marginalia_core::{EngineConfig, InkColor, InkPoint, InkTool, Stroke, ToolConfig};
use peniko::Color;

const DASH: f64 = 4.0;
const RULER_DASH: [f64; 2] = [8.0, 6.0];
/// Outline and handle color for the selection box.
pub const SELECTION_COLOR: Color = Color::from_rgba8(59, 130, 246, 255);

fn midpoint(a: &InkPoint, b: &InkPoint) -> Point {
    a.position().midpoint(b.position())
}

/// Smoothed path through all of `points`: quadratic curves through
/// consecutive midpoints, or a straight segment for exactly two points.
pub fn stroke_path(points: &[InkPoint]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = points.split_first() else {
        return path;
    };
    path.move_to(first.position());
    match rest {
        [] => {}
        [only] => path.line_to(only.position()),
        _ => {
            for pair in points[1..].windows(2) {
                path.quad_to(pair[0].position(), midpoint(&pair[0], &pair[1]));
            }
            if let Some(last) = points.last() {
                path.line_to(last.position());
            }
        }
    }
    path
}

/// Path of the newest segment only: a line while the stroke has two
/// points, then a curve from the previous midpoint through the previous
/// point to the new midpoint.
pub fn segment_path(points: &[InkPoint]) -> Option<BezPath> {
    let mut path = BezPath::new();
    match points {
        [] | [_] => return None,
        [a, b] => {
            path.move_to(a.position());
            path.line_to(b.position());
        }
        [.., a, b, c] => {
            path.move_to(midpoint(a, b));
            path.quad_to(b.position(), midpoint(b, c));
        }
    }
    Some(path)
}

fn paint(color: InkColor, opacity: f64) -> Color {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color::from_rgba8(color.r, color.g, color.b, alpha)
}

/// Paints strokes and selection UI using the engine's tool settings.
#[derive(Debug, Clone)]
pub struct InkRenderer {
    pen: ToolConfig,
    highlighter: ToolConfig,
    handle_size: f64,
}

impl InkRenderer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            pen: config.pen,
            highlighter: config.highlighter,
            handle_size: config.handle_size,
        }
    }

    fn tool(&self, tool: InkTool) -> &ToolConfig {
        match tool {
            InkTool::Pen => &self.pen,
            InkTool::Highlighter => &self.highlighter,
        }
    }

    /// Uniform width used once a stroke is committed: average pressure,
    /// no velocity modulation.
    pub fn final_width(&self, stroke: &Stroke) -> f64 {
        self.tool(stroke.tool)
            .width(stroke.average_pressure(), stroke.size, 1.0)
    }

    /// Width of the newest segment while drawing, from the newest point's
    /// pressure and velocity.
    pub fn live_width(&self, stroke: &Stroke) -> Option<f64> {
        let point = stroke.points.last()?;
        Some(self.tool(stroke.tool).width(
            point.pressure,
            stroke.size,
            point.velocity_factor.unwrap_or(1.0),
        ))
    }

    fn paint(&self, stroke: &Stroke) -> Color {
        paint(stroke.color, self.tool(stroke.tool).opacity)
    }

    /// Incremental path: paint only the newest segment of `stroke` on top
    /// of what is already there.
    pub fn draw_segment(&self, surface: &mut impl InkSurface, stroke: &Stroke, transform: Affine) {
        let (Some(path), Some(width)) = (segment_path(&stroke.points), self.live_width(stroke)) else {
            return;
        };
        surface.stroke(&line_style(width), transform, self.paint(stroke), &path);
    }

    /// Paint one whole stroke at its final width.
    pub fn draw_stroke(&self, surface: &mut impl InkSurface, stroke: &Stroke, transform: Affine) {
        if stroke.len() < 2 {
            return;
        }
        let style = line_style(self.final_width(stroke));
        surface.stroke(&style, transform, self.paint(stroke), &stroke_path(&stroke.points));
    }

    /// Full-redraw path: clear, repaint every stroke, then the overlays.
    pub fn redraw(&self, surface: &mut impl InkSurface, scene: &Scene<'_>, transform: Affine) {
        log::trace!("Full redraw of {} stroke(s)", scene.strokes.len());
        surface.clear();
        for stroke in scene.strokes {
            self.draw_stroke(surface, stroke, transform);
        }
        if let Some(live) = scene.live {
            self.draw_stroke(surface, live, transform);
        }

        let overlay = &scene.overlay;
        if let Some(selection) = &overlay.selection {
            self.draw_selection(surface, selection, transform);
        }
        if let Some(marquee) = overlay.marquee {
            self.draw_marquee(surface, marquee, transform);
        }
        if let Some(ruler) = &overlay.ruler {
            self.draw_ruler(surface, ruler, transform);
        }
    }

    fn draw_selection(&self, surface: &mut impl InkSurface, selection: &SelectionOverlay, transform: Affine) {
        let style = line_style(1.5).with_dashes(0.0, [DASH, DASH]);
        surface.stroke(&style, transform, SELECTION_COLOR, &selection.rect.to_path(0.1));

        for handle in &selection.handles {
            let rect = handle.hit_rect(self.handle_size).to_path(0.1);
            surface.fill(transform, Color::WHITE, &rect);
            surface.stroke(&line_style(1.5), transform, SELECTION_COLOR, &rect);
        }
    }

    fn draw_marquee(&self, surface: &mut impl InkSurface, marquee: Rect, transform: Affine) {
        let path = marquee.to_path(0.1);
        surface.fill(transform, SELECTION_COLOR.with_alpha(0.1), &path);
        let style = line_style(1.0).with_dashes(0.0, [DASH, DASH]);
        surface.stroke(&style, transform, SELECTION_COLOR, &path);
    }

    fn draw_ruler(&self, surface: &mut impl InkSurface, ruler: &RulerPreview, transform: Affine) {
        let tool = self.tool(ruler.tool);
        let width = tool.width(marginalia_core::ink::DEFAULT_PRESSURE, ruler.size, 1.0);
        let mut path = BezPath::new();
        path.move_to(ruler.start);
        path.line_to(ruler.end);
        let style = line_style(width).with_dashes(0.0, RULER_DASH);
        surface.stroke(&style, transform, paint(ruler.color, tool.opacity), &path);
    }
}
