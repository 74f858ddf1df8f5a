//! Display-list surface.

use crate::surface::InkSurface;
use kurbo::{Affine, BezPath, Stroke as LineStyle};
use marginalia_core::InkColor;
use peniko::Color;

/// One recorded paint operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Stroke {
        width: f64,
        dashes: Vec<f64>,
        transform: Affine,
        color: InkColor,
        path: BezPath,
    },
    Fill {
        transform: Affine,
        color: InkColor,
        path: BezPath,
    },
}

/// Records paint operations instead of rasterising them. Since a clear
/// discards everything before it, two recordings that compare equal after
/// a clear paint identical pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Commands since the last clear, i.e. what is currently visible.
    pub fn visible(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear))
            .map_or(0, |i| i + 1);
        &self.commands[start..]
    }

    /// Widths of every stroke command, in order.
    pub fn stroke_widths(&self) -> Vec<f64> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Stroke { width, .. } => Some(*width),
                _ => None,
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.commands.clear();
    }
}

impl InkSurface for RecordingSurface {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke(&mut self, style: &LineStyle, transform: Affine, color: Color, path: &BezPath) {
        self.commands.push(DrawCommand::Stroke {
            width: style.width,
            dashes: style.dash_pattern.iter().copied().collect(),
            transform,
            color: color.into(),
            path: path.clone(),
        });
    }

    fn fill(&mut self, transform: Affine, color: Color, path: &BezPath) {
        self.commands.push(DrawCommand::Fill {
            transform,
            color: color.into(),
            path: path.clone(),
        });
    }
}
