//! Marginalia Core Library
//!
//! Platform-agnostic engine for free-hand ink annotations over long,
//! scrollable lesson documents.

pub mod config;
pub mod engine;
pub mod eraser;
pub mod ink;
pub mod input;
pub mod ruler;
pub mod selection;
pub mod storage;
pub mod surface;
pub mod timing;
pub mod toolbar;
pub mod tools;
pub mod view;

pub use config::{ConfigError, EngineConfig, ToolConfig};
pub use engine::{Capture, Effects, InkEngine, Overlay, Redraw, RulerPreview, Scene, SelectionOverlay};
pub use ink::{InkColor, InkPoint, InkTool, Stroke, StrokeId};
pub use input::{PointerEvent, PointerKind, PointerSample};
pub use selection::{Corner, Handle, Selection};
pub use storage::{InkStore, Storage, StorageError, StorageResult};
pub use surface::{HostMetrics, SurfaceLayout, SurfaceManager};
pub use toolbar::{ClearAction, ClearButton, ToolbarAction};
pub use tools::{Gesture, ToolKind, ToolManager};
pub use view::{ViewId, ViewMap, ViewPartitions};
