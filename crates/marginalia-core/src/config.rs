//! Engine configuration, loaded once at start-up.

use crate::ink::{InkColor, InkTool};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Width range and paint opacity for an inking tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub min_width: f64,
    pub max_width: f64,
    pub opacity: f64,
}

impl ToolConfig {
    pub const PEN: Self = Self {
        min_width: 1.0,
        max_width: 4.0,
        opacity: 1.0,
    };

    pub const HIGHLIGHTER: Self = Self {
        min_width: 12.0,
        max_width: 24.0,
        opacity: 0.3,
    };

    /// `(min + pressure * (max - min)) * size * velocity`.
    pub fn width(&self, pressure: f64, size: f64, velocity_factor: f64) -> f64 {
        let pressure = pressure.clamp(0.0, 1.0);
        (self.min_width + pressure * (self.max_width - self.min_width)) * size * velocity_factor
    }
}

/// All tunables of the annotation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub pen: ToolConfig,
    pub highlighter: ToolConfig,
    /// Eraser hit radius in document units.
    pub eraser_radius: f64,
    /// Contacts with a larger radius are treated as a resting palm.
    pub palm_radius: f64,
    /// Move samples closer than this to the last accepted point are dropped.
    pub min_point_distance: f64,
    /// Speed (document units per millisecond) at which width modulation saturates.
    pub max_velocity: f64,
    /// How much fast motion narrows the line, `0.0..=1.0`.
    pub velocity_weight: f64,
    /// Hard cap on the drawing surface's backing-store height in device
    /// pixels, kept under the browsers' canvas size limit.
    pub max_surface_height: f64,
    pub resize_debounce_ms: u64,
    pub extent_poll_ms: u64,
    pub persist_debounce_ms: u64,
    /// Ruler segments this short or shorter are dropped.
    pub ruler_min_length: f64,
    /// Ruler angle snap increment in radians.
    pub ruler_snap_increment: f64,
    pub selection_padding: f64,
    pub handle_size: f64,
    pub min_selection_size: f64,
    pub clear_long_press_ms: u64,
    pub palette: Vec<InkColor>,
    pub size_presets: [f64; 5],
    /// Whether the overlay takes pointer input on load. Off leaves the
    /// page clickable and scrollable until ink is switched on.
    pub start_inking: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pen: ToolConfig::PEN,
            highlighter: ToolConfig::HIGHLIGHTER,
            eraser_radius: 20.0,
            palm_radius: 25.0,
            min_point_distance: 2.0,
            max_velocity: 3.0,
            velocity_weight: 0.3,
            max_surface_height: 32_000.0,
            resize_debounce_ms: 200,
            extent_poll_ms: 1_000,
            persist_debounce_ms: 500,
            ruler_min_length: 5.0,
            ruler_snap_increment: std::f64::consts::FRAC_PI_4,
            selection_padding: 10.0,
            handle_size: 12.0,
            min_selection_size: 20.0,
            clear_long_press_ms: 1_500,
            palette: vec![
                InkColor::rgb(0x21, 0x21, 0x21),
                InkColor::rgb(0xe5, 0x39, 0x35),
                InkColor::rgb(0x1e, 0x88, 0xe5),
                InkColor::rgb(0x43, 0xa0, 0x47),
                InkColor::rgb(0xfb, 0x8c, 0x00),
                InkColor::rgb(0x8e, 0x24, 0xaa),
            ],
            size_presets: [0.5, 0.75, 1.0, 1.5, 2.0],
            start_inking: false,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, tool) in [("pen", &self.pen), ("highlighter", &self.highlighter)] {
            if tool.min_width < 0.0 || tool.max_width < tool.min_width {
                return Err(ConfigError::Invalid(format!(
                    "{name} width range {}..{} is empty",
                    tool.min_width, tool.max_width
                )));
            }
            if !(0.0..=1.0).contains(&tool.opacity) {
                return Err(ConfigError::Invalid(format!("{name} opacity out of range")));
            }
        }
        if !(0.0..=1.0).contains(&self.velocity_weight) {
            return Err(ConfigError::Invalid("velocityWeight must be within 0..=1".into()));
        }
        if self.max_velocity <= 0.0 || self.max_surface_height <= 0.0 {
            return Err(ConfigError::Invalid("maxVelocity and maxSurfaceHeight must be positive".into()));
        }
        if self.ruler_snap_increment <= 0.0 {
            return Err(ConfigError::Invalid("rulerSnapIncrement must be positive".into()));
        }
        if self.palette.is_empty() {
            return Err(ConfigError::Invalid("palette is empty".into()));
        }
        Ok(())
    }

    pub fn tool(&self, tool: InkTool) -> &ToolConfig {
        match tool {
            InkTool::Pen => &self.pen,
            InkTool::Highlighter => &self.highlighter,
        }
    }
}
