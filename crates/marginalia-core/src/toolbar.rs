//! Toolbar model: control parsing and the clear button's tap/long-press logic.

use crate::config::EngineConfig;
use crate::ink::InkColor;
use crate::timing::{Duration, Instant};
use crate::tools::ToolKind;

/// A toolbar control activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    /// Switch ink input on or off.
    ToggleInk,
    Tool(ToolKind),
    ToggleRuler,
    /// Index into the configured palette.
    Color(usize),
    /// Index into the size presets.
    Size(usize),
}

impl ToolbarAction {
    /// Parse a control from its `data-ink-*` attribute name and value,
    /// e.g. `("tool", "eraser")` or `("size", "3")`.
    pub fn parse(control: &str, value: &str) -> Option<Self> {
        match control {
            "inking" => Some(ToolbarAction::ToggleInk),
            "tool" => ToolKind::from_name(value).map(ToolbarAction::Tool),
            "ruler" => Some(ToolbarAction::ToggleRuler),
            "color" => value.parse().ok().map(ToolbarAction::Color),
            "size" => value.parse().ok().map(ToolbarAction::Size),
            _ => None,
        }
    }
}

/// Palette entry at `index`.
pub fn palette_color(config: &EngineConfig, index: usize) -> Option<InkColor> {
    config.palette.get(index).copied()
}

/// Size multiplier of preset `index`.
pub fn size_preset(config: &EngineConfig, index: usize) -> Option<f64> {
    config.size_presets.get(index).copied()
}

/// Index of the preset closest to `size`, for highlighting the active button.
pub fn nearest_size_preset(config: &EngineConfig, size: f64) -> usize {
    config
        .size_presets
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - size).abs().total_cmp(&(*b - size).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// What a clear-button press resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearAction {
    /// Tap: clear the active view only.
    CurrentView,
    /// Long press: ask for confirmation, then clear every view.
    ConfirmAll,
}

/// Tells a tap from a long press on the clear control.
#[derive(Debug, Clone)]
pub struct ClearButton {
    hold: Duration,
    pressed_at: Option<Instant>,
    fired: bool,
}

impl ClearButton {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            hold: Duration::from_millis(config.clear_long_press_ms),
            pressed_at: None,
            fired: false,
        }
    }

    pub fn hold_duration(&self) -> Duration {
        self.hold
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub fn press(&mut self, now: Instant) {
        self.pressed_at = Some(now);
        self.fired = false;
    }

    /// Called from a timer while pressed; yields [`ClearAction::ConfirmAll`]
    /// once the hold duration is reached, so the prompt shows without
    /// waiting for release.
    pub fn poll(&mut self, now: Instant) -> Option<ClearAction> {
        let pressed_at = self.pressed_at?;
        if !self.fired && now.saturating_duration_since(pressed_at) >= self.hold {
            self.fired = true;
            return Some(ClearAction::ConfirmAll);
        }
        None
    }

    pub fn release(&mut self, now: Instant) -> Option<ClearAction> {
        let pressed_at = self.pressed_at.take()?;
        if std::mem::take(&mut self.fired) {
            return None;
        }
        if now.saturating_duration_since(pressed_at) >= self.hold {
            Some(ClearAction::ConfirmAll)
        } else {
            Some(ClearAction::CurrentView)
        }
    }

    /// Pointer left the button: forget the press without acting.
    pub fn cancel(&mut self) {
        self.pressed_at = None;
        self.fired = false;
    }
}
