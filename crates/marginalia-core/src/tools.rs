//! Tool selection and per-gesture state.

use crate::ink::{InkColor, InkTool, Stroke, StrokeId};
use crate::selection::Corner;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Pen,
    Highlighter,
    Eraser,
    Select,
}

impl ToolKind {
    /// The ink tool this tool lays down, if it draws at all.
    pub fn ink_tool(self) -> Option<InkTool> {
        match self {
            ToolKind::Pen => Some(InkTool::Pen),
            ToolKind::Highlighter => Some(InkTool::Highlighter),
            ToolKind::Eraser | ToolKind::Select => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Pen => "pen",
            ToolKind::Highlighter => "highlighter",
            ToolKind::Eraser => "eraser",
            ToolKind::Select => "select",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pen" => Some(ToolKind::Pen),
            "highlighter" => Some(ToolKind::Highlighter),
            "eraser" => Some(ToolKind::Eraser),
            "select" => Some(ToolKind::Select),
            _ => None,
        }
    }
}

/// The in-flight gesture, owned by whichever tool started it.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Freehand pen or highlighter stroke.
    Drawing { pointer_id: i32, stroke: Stroke },
    Erasing { pointer_id: i32 },
    /// Straight line; `end` is the snapped candidate end point.
    Ruler {
        pointer_id: i32,
        tool: InkTool,
        start: Point,
        end: Point,
    },
    Marquee {
        pointer_id: i32,
        start: Point,
        current: Point,
    },
    Moving {
        pointer_id: i32,
        /// Pointer offset from the selection's top-left at grab time.
        grab_offset: Vec2,
        moved: bool,
    },
    Resizing {
        pointer_id: i32,
        corner: Corner,
        original_rect: Rect,
        originals: Vec<(StrokeId, Stroke)>,
        moved: bool,
    },
}

impl Gesture {
    pub fn is_active(&self) -> bool {
        !matches!(self, Gesture::Idle)
    }

    pub fn pointer_id(&self) -> Option<i32> {
        match self {
            Gesture::Idle => None,
            Gesture::Drawing { pointer_id, .. }
            | Gesture::Erasing { pointer_id }
            | Gesture::Ruler { pointer_id, .. }
            | Gesture::Marquee { pointer_id, .. }
            | Gesture::Moving { pointer_id, .. }
            | Gesture::Resizing { pointer_id, .. } => Some(*pointer_id),
        }
    }

    /// Whether this gesture belongs to `pointer_id`.
    pub fn owned_by(&self, pointer_id: i32) -> bool {
        self.pointer_id() == Some(pointer_id)
    }
}

/// Current tool and styling chosen on the toolbar.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Ink input on. When off, pointer input belongs to the page.
    pub inking: bool,
    pub current_tool: ToolKind,
    /// Ruler toggle; only affects pen and highlighter.
    pub ruler: bool,
    pub color: InkColor,
    /// Size multiplier from the presets.
    pub size: f64,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            inking: false,
            current_tool: ToolKind::default(),
            ruler: false,
            color: InkColor::default(),
            size: 1.0,
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch tools. Returns the previous tool.
    pub fn set_tool(&mut self, tool: ToolKind) -> ToolKind {
        std::mem::replace(&mut self.current_tool, tool)
    }

    /// True when pen/highlighter input should be captured as a ruler line.
    pub fn ruler_active(&self) -> bool {
        self.ruler && self.current_tool.ink_tool().is_some()
    }

    /// A fresh stroke in the current styling, if the tool draws.
    pub fn new_stroke(&self) -> Option<Stroke> {
        self.current_tool
            .ink_tool()
            .map(|tool| Stroke::new(tool, self.color, self.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_selection() {
        let mut tm = ToolManager::new();
        assert_eq!(tm.current_tool, ToolKind::Pen);
        assert_eq!(tm.set_tool(ToolKind::Select), ToolKind::Pen);
        assert_eq!(tm.current_tool, ToolKind::Select);
    }

    #[test]
    fn test_ruler_only_modifies_ink_tools() {
        let mut tm = ToolManager::new();
        tm.ruler = true;
        assert!(tm.ruler_active());
        tm.set_tool(ToolKind::Highlighter);
        assert!(tm.ruler_active());
        tm.set_tool(ToolKind::Eraser);
        assert!(!tm.ruler_active());
    }

    #[test]
    fn test_new_stroke_styling() {
        let mut tm = ToolManager::new();
        tm.set_tool(ToolKind::Highlighter);
        tm.color = InkColor::rgb(255, 235, 59);
        tm.size = 1.5;
        let stroke = tm.new_stroke().unwrap();
        assert_eq!(stroke.tool, InkTool::Highlighter);
        assert_eq!(stroke.color, tm.color);
        assert_eq!(stroke.size, 1.5);

        tm.set_tool(ToolKind::Select);
        assert!(tm.new_stroke().is_none());
    }

    #[test]
    fn test_tool_names_roundtrip() {
        for tool in [ToolKind::Pen, ToolKind::Highlighter, ToolKind::Eraser, ToolKind::Select] {
            assert_eq!(ToolKind::from_name(tool.name()), Some(tool));
        }
        assert_eq!(ToolKind::from_name("lasso"), None);
    }
}
