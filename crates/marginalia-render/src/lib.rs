//! Marginalia Render Library
//!
//! Paints ink onto anything implementing [`InkSurface`]. The browser host
//! provides a 2D canvas surface; [`RecordingSurface`] keeps a display list
//! for tests and offline inspection.

mod recording;
mod renderer;
mod surface;

pub use recording::{DrawCommand, RecordingSurface};
pub use renderer::{InkRenderer, SELECTION_COLOR, segment_path, stroke_path};
pub use surface::{InkSurface, RenderResult, RendererError, line_style};
