//! Painting backend abstraction.

use kurbo::{Affine, BezPath, Cap, Join, Stroke as LineStyle};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// A 2D target the renderer paints into.
///
/// Paths are in document coordinates; `transform` maps them to the
/// surface's pixels.
pub trait InkSurface {
    /// Erase the whole surface to transparent.
    fn clear(&mut self);

    fn stroke(&mut self, style: &LineStyle, transform: Affine, color: Color, path: &BezPath);

    fn fill(&mut self, transform: Affine, color: Color, path: &BezPath);
}

/// Round-capped, round-joined line of the given width, as used for ink.
pub fn line_style(width: f64) -> LineStyle {
    LineStyle::new(width).with_caps(Cap::Round).with_join(Join::Round)
}
