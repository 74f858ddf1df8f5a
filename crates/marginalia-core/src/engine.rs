//! The annotation engine: one instance per page, fed by host callbacks.
//!
//! Every handler runs synchronously and returns [`Effects`] describing what
//! the host must do next (repaint, arm the save timer, manage pointer
//! capture). The engine never touches the DOM or storage itself.

use crate::config::EngineConfig;
use crate::eraser::erase_at;
use crate::ink::{InkColor, InkTool, Stroke};
use crate::input::{InputCapture, PointerEvent, PointerSample};
use crate::ruler;
use crate::selection::{Handle, Selection, marquee_rect, rescale_from, resize_rect};
use crate::surface::{HostMetrics, SurfaceManager};
use crate::timing::{Debounce, Duration, Instant};
use crate::toolbar::{self, ToolbarAction};
use crate::tools::{Gesture, ToolKind, ToolManager};
use crate::view::{ViewId, ViewMap, ViewPartitions};
use kurbo::{Point, Rect};

/// How much of the surface needs repainting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Redraw {
    #[default]
    None,
    /// Draw only the newest segment of the live stroke.
    Segment,
    /// Clear and repaint everything.
    Full,
}

/// Pointer capture change requested of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    #[default]
    Keep,
    Acquire(i32),
    Release(i32),
}

/// Host-side consequences of an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effects {
    pub redraw: Redraw,
    /// A save was (re)scheduled; the host should arm its timer for
    /// [`InkEngine::persist_remaining`].
    pub persist: bool,
    /// All stored views for the page must be removed.
    pub wipe_store: bool,
    pub capture: Capture,
    /// Suppress the browser's default action (scroll, zoom) for this event.
    pub prevent_default: bool,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn full_redraw() -> Self {
        Self {
            redraw: Redraw::Full,
            ..Self::default()
        }
    }

    /// Combine two outcomes; the later capture request wins.
    pub fn merge(self, other: Effects) -> Effects {
        Effects {
            redraw: self.redraw.max(other.redraw),
            persist: self.persist || other.persist,
            wipe_store: self.wipe_store || other.wipe_store,
            capture: match other.capture {
                Capture::Keep => self.capture,
                capture => capture,
            },
            prevent_default: self.prevent_default || other.prevent_default,
        }
    }
}

/// Selection box and its handles, drawn over the ink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionOverlay {
    pub rect: Rect,
    pub handles: [Handle; 4],
}

/// Dashed preview of a ruler line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerPreview {
    pub tool: InkTool,
    pub color: InkColor,
    pub size: f64,
    pub start: Point,
    pub end: Point,
}

/// Transient UI painted on top of the strokes by a full redraw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Overlay {
    pub selection: Option<SelectionOverlay>,
    pub marquee: Option<Rect>,
    pub ruler: Option<RulerPreview>,
}

/// Everything a full redraw paints.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub strokes: &'a [Stroke],
    /// Freehand stroke still being drawn.
    pub live: Option<&'a Stroke>,
    pub overlay: Overlay,
}

pub struct InkEngine {
    config: EngineConfig,
    surface: SurfaceManager,
    input: InputCapture,
    tools: ToolManager,
    views: ViewPartitions,
    gesture: Gesture,
    selection: Option<Selection>,
    /// View signalled while a gesture was in flight.
    pending_view: Option<ViewId>,
    persist: Debounce,
    /// Pointer we asked the host to capture.
    captured: Option<i32>,
}

impl InkEngine {
    pub fn new(config: EngineConfig, view: ViewId) -> Self {
        let mut tools = ToolManager::new();
        tools.inking = config.start_inking;
        if let Some(color) = config.palette.first() {
            tools.color = *color;
        }
        Self {
            surface: SurfaceManager::new(&config),
            input: InputCapture::new(&config),
            tools,
            views: ViewPartitions::new(view),
            gesture: Gesture::Idle,
            selection: None,
            pending_view: None,
            persist: Debounce::from_millis(config.persist_debounce_ms),
            captured: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut SurfaceManager {
        &mut self.surface
    }

    pub fn active_view(&self) -> &ViewId {
        self.views.active_id()
    }

    /// Strokes of the active view.
    pub fn strokes(&self) -> &[Stroke] {
        self.views.strokes()
    }

    pub fn snapshot(&self) -> ViewMap {
        self.views.snapshot()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_active()
    }

    pub fn pending_view(&self) -> Option<&ViewId> {
        self.pending_view.as_ref()
    }

    /// The freehand stroke being drawn, if any.
    pub fn live_stroke(&self) -> Option<&Stroke> {
        match &self.gesture {
            Gesture::Drawing { stroke, .. } => Some(stroke),
            _ => None,
        }
    }

    pub fn overlay(&self) -> Overlay {
        let selection = self
            .selection
            .as_ref()
            .filter(|_| self.tools.current_tool == ToolKind::Select)
            .map(|s| SelectionOverlay {
                rect: s.rect,
                handles: s.handles(),
            });
        let (marquee, ruler) = match &self.gesture {
            Gesture::Marquee { start, current, .. } => (Some(marquee_rect(*start, *current)), None),
            Gesture::Ruler { tool, start, end, .. } => (
                None,
                Some(RulerPreview {
                    tool: *tool,
                    color: self.tools.color,
                    size: self.tools.size,
                    start: *start,
                    end: *end,
                }),
            ),
            _ => (None, None),
        };
        Overlay {
            selection,
            marquee,
            ruler,
        }
    }

    pub fn scene(&self) -> Scene<'_> {
        Scene {
            strokes: self.views.strokes(),
            live: self.live_stroke(),
            overlay: self.overlay(),
        }
    }

    // --- pointer input ---

    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Effects {
        match event {
            PointerEvent::Down(sample) => self.pointer_down(&sample, now),
            PointerEvent::Move(sample) => self.pointer_move(&sample, now),
            PointerEvent::Up(sample) | PointerEvent::Cancel(sample) => self.pointer_up(&sample, now),
            PointerEvent::Leave(sample) => self.pointer_leave(&sample, now),
        }
    }

    fn pointer_down(&mut self, sample: &PointerSample, now: Instant) -> Effects {
        if !self.tools.inking {
            return Effects::none();
        }
        if self.input.is_rejected(sample) {
            return Effects::none();
        }
        if self.input.touch_down(sample) {
            log::debug!("Multi-touch detected, abandoning gesture");
            return self.abort_gesture(now);
        }
        if self.gesture.is_active() {
            return Effects::none();
        }
        let position = sample.position;
        if self.surface.layout().is_some_and(|layout| !layout.contains(position)) {
            return Effects::none();
        }

        let pointer_id = sample.pointer_id;
        let mut effects = Effects::none();
        match self.tools.current_tool {
            ToolKind::Eraser => {
                self.gesture = Gesture::Erasing { pointer_id };
                effects = self.erase(position, now);
            }
            ToolKind::Select => {
                effects = self.begin_select(pointer_id, position);
            }
            ToolKind::Pen | ToolKind::Highlighter if self.tools.ruler => {
                let Some(tool) = self.tools.current_tool.ink_tool() else {
                    return Effects::none();
                };
                self.gesture = Gesture::Ruler {
                    pointer_id,
                    tool,
                    start: position,
                    end: position,
                };
            }
            ToolKind::Pen | ToolKind::Highlighter => {
                let Some(mut stroke) = self.tools.new_stroke() else {
                    return Effects::none();
                };
                stroke.push(self.input.begin(sample));
                self.gesture = Gesture::Drawing { pointer_id, stroke };
            }
        }

        self.captured = Some(pointer_id);
        effects.merge(Effects {
            capture: Capture::Acquire(pointer_id),
            prevent_default: true,
            ..Effects::none()
        })
    }

    fn begin_select(&mut self, pointer_id: i32, position: Point) -> Effects {
        if let Some(selection) = &self.selection {
            if let Some(corner) = selection.hit_handle(position, self.config.handle_size) {
                let originals = self
                    .views
                    .strokes()
                    .iter()
                    .filter(|s| selection.contains_stroke(s.id))
                    .map(|s| (s.id, s.clone()))
                    .collect();
                self.gesture = Gesture::Resizing {
                    pointer_id,
                    corner,
                    original_rect: selection.rect,
                    originals,
                    moved: false,
                };
                return Effects::none();
            }
            if selection.contains(position) {
                self.gesture = Gesture::Moving {
                    pointer_id,
                    grab_offset: position - selection.origin(),
                    moved: false,
                };
                return Effects::none();
            }
        }

        let had_selection = self.selection.take().is_some();
        self.gesture = Gesture::Marquee {
            pointer_id,
            start: position,
            current: position,
        };
        if had_selection {
            Effects::full_redraw()
        } else {
            Effects::none()
        }
    }

    fn pointer_move(&mut self, sample: &PointerSample, now: Instant) -> Effects {
        if !self.gesture.owned_by(sample.pointer_id) || self.input.is_rejected(sample) {
            return Effects::none();
        }
        let position = sample.position;
        let mut effects = Effects {
            prevent_default: true,
            ..Effects::none()
        };

        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Drawing { stroke, .. } => {
                if let Some(point) = self.input.accept(sample) {
                    stroke.push(point);
                    effects.redraw = Redraw::Segment;
                }
            }
            Gesture::Erasing { .. } => {
                effects = effects.merge(self.erase(position, now));
            }
            Gesture::Ruler { start, end, .. } => {
                *end = ruler::snap_endpoint(*start, position, self.config.ruler_snap_increment);
                effects.redraw = Redraw::Full;
            }
            Gesture::Marquee { current, .. } => {
                *current = position;
                effects.redraw = Redraw::Full;
            }
            Gesture::Moving { grab_offset, moved, .. } => {
                if let Some(selection) = self.selection.as_mut() {
                    let delta = (position - *grab_offset) - selection.origin();
                    selection.translate(self.views.strokes_mut(), delta);
                    *moved = true;
                    effects.redraw = Redraw::Full;
                }
            }
            Gesture::Resizing {
                corner,
                original_rect,
                originals,
                moved,
                ..
            } => {
                let new_rect =
                    resize_rect(*original_rect, *corner, position, self.config.min_selection_size);
                for stroke in self.views.strokes_mut() {
                    if let Some((_, original)) = originals.iter().find(|(id, _)| *id == stroke.id) {
                        rescale_from(stroke, original, *original_rect, new_rect);
                    }
                }
                if let Some(selection) = self.selection.as_mut() {
                    selection.refresh(self.views.strokes(), self.config.selection_padding);
                }
                *moved = true;
                effects.redraw = Redraw::Full;
            }
        }
        effects
    }

    fn pointer_up(&mut self, sample: &PointerSample, now: Instant) -> Effects {
        self.input.touch_up(sample);
        if !self.gesture.owned_by(sample.pointer_id) {
            return Effects::none();
        }
        // The release position counts as a final sample for two-point gestures.
        match &mut self.gesture {
            Gesture::Ruler { start, end, .. } => {
                *end = ruler::snap_endpoint(*start, sample.position, self.config.ruler_snap_increment);
            }
            Gesture::Marquee { current, .. } => *current = sample.position,
            _ => {}
        }
        self.finish_gesture(now)
    }

    /// Leaving the surface only ends a gesture when capture was not held.
    fn pointer_leave(&mut self, sample: &PointerSample, now: Instant) -> Effects {
        if !self.gesture.owned_by(sample.pointer_id) || self.captured == Some(sample.pointer_id) {
            return Effects::none();
        }
        self.input.touch_up(sample);
        self.finish_gesture(now)
    }

    /// The host reports that pointer capture was lost or refused.
    pub fn lost_capture(&mut self, pointer_id: i32) {
        if self.captured == Some(pointer_id) {
            self.captured = None;
        }
    }

    /// Drop all contact tracking, e.g. when the page loses focus.
    pub fn reset_input(&mut self, now: Instant) -> Effects {
        let effects = self.abort_gesture(now);
        self.input.reset();
        effects
    }

    fn finish_gesture(&mut self, now: Instant) -> Effects {
        let gesture = std::mem::take(&mut self.gesture);
        self.input.end();

        let effects = match gesture {
            Gesture::Idle | Gesture::Erasing { .. } => Effects::none(),
            Gesture::Drawing { stroke, .. } => {
                if stroke.is_committable() {
                    self.views.strokes_mut().push(stroke);
                    self.schedule_persist(now).merge(Effects::full_redraw())
                } else {
                    Effects::none()
                }
            }
            Gesture::Ruler { tool, start, end, .. } => {
                match ruler::commit(&self.tools, tool, start, end, self.config.ruler_min_length) {
                    Some(stroke) => {
                        self.views.strokes_mut().push(stroke);
                        self.schedule_persist(now).merge(Effects::full_redraw())
                    }
                    // Still repaint to remove the preview.
                    None => Effects::full_redraw(),
                }
            }
            Gesture::Marquee { start, current, .. } => {
                self.selection = Selection::from_marquee(
                    self.views.strokes(),
                    marquee_rect(start, current),
                    self.config.selection_padding,
                );
                Effects::full_redraw()
            }
            Gesture::Moving { moved, .. } | Gesture::Resizing { moved, .. } => {
                if moved {
                    self.schedule_persist(now).merge(Effects::full_redraw())
                } else {
                    Effects::none()
                }
            }
        };
        effects.merge(self.end_gesture(now))
    }

    /// Abandon the in-flight gesture without committing new ink.
    fn abort_gesture(&mut self, now: Instant) -> Effects {
        let gesture = std::mem::take(&mut self.gesture);
        self.input.end();

        let effects = match gesture {
            Gesture::Idle => return Effects::none(),
            Gesture::Erasing { .. } => Effects::none(),
            Gesture::Drawing { .. } | Gesture::Ruler { .. } | Gesture::Marquee { .. } => Effects::full_redraw(),
            // Transforms already applied stay applied.
            Gesture::Moving { moved, .. } | Gesture::Resizing { moved, .. } => {
                if moved {
                    self.schedule_persist(now).merge(Effects::full_redraw())
                } else {
                    Effects::none()
                }
            }
        };
        effects.merge(self.end_gesture(now))
    }

    /// Release capture and apply any view switch that was held back.
    fn end_gesture(&mut self, now: Instant) -> Effects {
        let mut effects = Effects::none();
        if let Some(pointer_id) = self.captured.take() {
            effects.capture = Capture::Release(pointer_id);
        }
        if let Some(view) = self.pending_view.take() {
            effects = effects.merge(self.apply_view(view, now));
        }
        effects
    }

    fn erase(&mut self, position: Point, now: Instant) -> Effects {
        let removed = erase_at(self.views.strokes_mut(), position, self.config.eraser_radius);
        if removed == 0 {
            return Effects::none();
        }
        log::debug!("Erased {} stroke(s)", removed);
        self.schedule_persist(now).merge(Effects::full_redraw())
    }

    // --- tools & toolbar ---

    pub fn set_tool(&mut self, tool: ToolKind) -> Effects {
        let previous = self.tools.set_tool(tool);
        if previous == ToolKind::Select && tool != ToolKind::Select {
            self.selection = None;
            return Effects::full_redraw();
        }
        Effects::none()
    }

    pub fn is_inking(&self) -> bool {
        self.tools.inking
    }

    /// Switch ink input on or off. Turning it off ends any gesture and
    /// drops the selection; the strokes stay on screen.
    pub fn set_inking(&mut self, on: bool, now: Instant) -> Effects {
        if self.tools.inking == on {
            return Effects::none();
        }
        self.tools.inking = on;
        log::debug!("Ink input {}", if on { "on" } else { "off" });
        if on {
            return Effects::none();
        }
        let aborted = self.abort_gesture(now);
        if self.selection.take().is_some() {
            aborted.merge(Effects::full_redraw())
        } else {
            aborted
        }
    }

    pub fn set_ruler(&mut self, enabled: bool) {
        self.tools.ruler = enabled;
    }

    pub fn set_color(&mut self, color: InkColor) {
        self.tools.color = color;
    }

    /// Select size preset `index`. Returns false for an unknown preset.
    pub fn set_size_preset(&mut self, index: usize) -> bool {
        match toolbar::size_preset(&self.config, index) {
            Some(size) => {
                self.tools.size = size;
                true
            }
            None => false,
        }
    }

    pub fn apply_toolbar(&mut self, action: ToolbarAction, now: Instant) -> Effects {
        match action {
            ToolbarAction::ToggleInk => self.set_inking(!self.tools.inking, now),
            // Picking a tool implies wanting to use it.
            ToolbarAction::Tool(tool) => self.set_inking(true, now).merge(self.set_tool(tool)),
            ToolbarAction::ToggleRuler => {
                self.tools.ruler = !self.tools.ruler;
                Effects::none()
            }
            ToolbarAction::Color(index) => {
                match toolbar::palette_color(&self.config, index) {
                    Some(color) => self.set_color(color),
                    None => log::warn!("Unknown palette entry {}", index),
                }
                Effects::none()
            }
            ToolbarAction::Size(index) => {
                if !self.set_size_preset(index) {
                    log::warn!("Unknown size preset {}", index);
                }
                Effects::none()
            }
        }
    }

    /// Remove every stroke in the active view.
    pub fn clear_view(&mut self, now: Instant) -> Effects {
        let aborted = self.abort_gesture(now);
        self.views.clear_active();
        self.selection = None;
        log::info!("Cleared view {}", self.views.active_id());
        aborted
            .merge(self.schedule_persist(now))
            .merge(Effects::full_redraw())
    }

    /// Remove every stroke in every view and wipe the stored page.
    pub fn clear_all(&mut self, now: Instant) -> Effects {
        let aborted = self.abort_gesture(now);
        self.views.clear_all();
        self.selection = None;
        self.persist.cancel();
        log::info!("Cleared all views");
        Effects {
            persist: false,
            wipe_store: true,
            ..aborted.merge(Effects::full_redraw())
        }
    }

    // --- views ---

    /// The host's view signal changed. Switching waits for the in-flight
    /// gesture to end.
    pub fn view_changed(&mut self, view: ViewId, now: Instant) -> Effects {
        if self.gesture.is_active() {
            if &view == self.views.active_id() {
                self.pending_view = None;
            } else {
                log::debug!("Deferring switch to view {} until the gesture ends", view);
                self.pending_view = Some(view);
            }
            return Effects::none();
        }
        self.apply_view(view, now)
    }

    fn apply_view(&mut self, view: ViewId, now: Instant) -> Effects {
        let outgoing = self.views.active_id().clone();
        if !self.views.switch_to(view) {
            return Effects::none();
        }
        log::info!("Switched view {} -> {}", outgoing, self.views.active_id());
        self.selection = None;
        self.schedule_persist(now).merge(Effects::full_redraw())
    }

    /// Install the stored views once loaded. Ink drawn before the load
    /// finished is kept on top of the stored ink.
    pub fn load_views(&mut self, stored: ViewMap, now: Instant) -> Effects {
        let drawn = self.views.snapshot();
        let active = self.views.active_id().clone();
        let mut merged = stored;
        let mut dirty = false;
        for (view, strokes) in drawn {
            if !strokes.is_empty() {
                dirty = true;
                merged.entry(view).or_default().extend(strokes);
            }
        }
        self.views = ViewPartitions::from_map(merged, active);
        self.selection = None;
        log::info!("Loaded ink: {} stroke(s) across all views", self.views.total_strokes());

        if dirty {
            self.schedule_persist(now).merge(Effects::full_redraw())
        } else {
            Effects::full_redraw()
        }
    }

    // --- surface ---

    /// Apply fresh host metrics; always ends in a full redraw.
    pub fn apply_metrics(&mut self, metrics: HostMetrics) -> Effects {
        self.surface.apply(metrics);
        Effects::full_redraw()
    }

    // --- persistence ---

    fn schedule_persist(&mut self, now: Instant) -> Effects {
        self.persist.schedule(now);
        Effects {
            persist: true,
            ..Effects::none()
        }
    }

    pub fn persist_delay(&self) -> Duration {
        self.persist.delay()
    }

    pub fn persist_remaining(&self, now: Instant) -> Option<Duration> {
        self.persist.remaining(now)
    }

    pub fn has_pending_save(&self) -> bool {
        self.persist.is_pending()
    }

    /// The map to write if the save debounce has elapsed.
    pub fn take_due_save(&mut self, now: Instant) -> Option<ViewMap> {
        self.persist.take_due(now).then(|| self.views.snapshot())
    }

    /// The map to write right away if any save is pending, e.g. on page hide.
    pub fn take_pending_save(&mut self) -> Option<ViewMap> {
        if !self.persist.is_pending() {
            return None;
        }
        self.persist.cancel();
        Some(self.views.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::InkPoint;
    use crate::input::PointerKind;
    use crate::selection::Corner;
    use kurbo::Size;

    fn engine() -> InkEngine {
        let config = EngineConfig {
            start_inking: true,
            ..EngineConfig::default()
        };
        InkEngine::new(config, ViewId::default())
    }

    fn at(x: f64, y: f64) -> PointerSample {
        PointerSample::mouse(Point::new(x, y))
    }

    fn stroke(points: &[(f64, f64)]) -> Stroke {
        Stroke::new(InkTool::Pen, InkColor::black(), 1.0)
            .with_points(points.iter().map(|&(x, y)| InkPoint::new(x, y)).collect())
    }

    fn drag(engine: &mut InkEngine, points: &[(f64, f64)], now: Instant) -> Effects {
        let (first, rest) = points.split_first().unwrap();
        let mut effects = engine.handle_pointer(PointerEvent::Down(at(first.0, first.1)), now);
        for &(x, y) in rest {
            effects = effects.merge(engine.handle_pointer(PointerEvent::Move(at(x, y)), now));
        }
        let last = points.last().unwrap();
        effects.merge(engine.handle_pointer(PointerEvent::Up(at(last.0, last.1)), now))
    }

    #[test]
    fn test_effects_merge() {
        let a = Effects {
            redraw: Redraw::Segment,
            capture: Capture::Acquire(1),
            ..Effects::none()
        };
        let b = Effects {
            persist: true,
            ..Effects::full_redraw()
        };
        let merged = a.merge(b);
        assert_eq!(merged.redraw, Redraw::Full);
        assert!(merged.persist);
        assert_eq!(merged.capture, Capture::Acquire(1));
    }

    #[test]
    fn test_down_acquires_capture_and_up_releases() {
        let mut engine = engine();
        let now = Instant::now();
        let down = engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
        assert_eq!(down.capture, Capture::Acquire(1));
        assert!(down.prevent_default);

        let up = engine.handle_pointer(PointerEvent::Up(at(0.0, 0.0)), now);
        assert_eq!(up.capture, Capture::Release(1));
    }

    #[test]
    fn test_moves_draw_segments() {
        let mut engine = engine();
        let now = Instant::now();
        engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
        let first = engine.handle_pointer(PointerEvent::Move(at(10.0, 0.0)), now);
        assert_eq!(first.redraw, Redraw::Segment);
        // Decimated sample: nothing new to paint.
        let skipped = engine.handle_pointer(PointerEvent::Move(at(11.0, 0.0)), now);
        assert_eq!(skipped.redraw, Redraw::None);
        assert_eq!(engine.live_stroke().unwrap().len(), 2);
    }

    #[test]
    fn test_hover_moves_ignored() {
        let mut engine = engine();
        let effects = engine.handle_pointer(PointerEvent::Move(at(10.0, 0.0)), Instant::now());
        assert_eq!(effects, Effects::none());
    }

    #[test]
    fn test_leave_ignored_while_captured() {
        let mut engine = engine();
        let now = Instant::now();
        engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
        engine.handle_pointer(PointerEvent::Move(at(10.0, 0.0)), now);
        engine.handle_pointer(PointerEvent::Leave(at(10.0, 0.0)), now);
        assert!(engine.is_gesture_active());

        engine.lost_capture(1);
        let effects = engine.handle_pointer(PointerEvent::Leave(at(10.0, 0.0)), now);
        assert!(!engine.is_gesture_active());
        assert_eq!(engine.strokes().len(), 1);
        assert!(effects.persist);
    }

    #[test]
    fn test_cancel_acts_like_up() {
        let mut engine = engine();
        let now = Instant::now();
        engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
        engine.handle_pointer(PointerEvent::Move(at(10.0, 0.0)), now);
        engine.handle_pointer(PointerEvent::Cancel(at(10.0, 0.0)), now);
        assert_eq!(engine.strokes().len(), 1);
    }

    #[test]
    fn test_palm_contact_ignored() {
        let mut engine = engine();
        let palm = PointerSample {
            kind: PointerKind::Touch,
            contact: Size::new(70.0, 70.0),
            ..at(0.0, 0.0)
        };
        assert_eq!(engine.handle_pointer(PointerEvent::Down(palm), Instant::now()), Effects::none());
        assert!(!engine.is_gesture_active());
    }

    #[test]
    fn test_down_outside_capped_surface_ignored() {
        let mut engine = engine();
        engine.apply_metrics(HostMetrics {
            content_width: 100.0,
            content_height: 100.0,
            device_pixel_ratio: 1.0,
        });
        let effects = engine.handle_pointer(PointerEvent::Down(at(50.0, 150.0)), Instant::now());
        assert_eq!(effects, Effects::none());
    }

    #[test]
    fn test_switching_away_from_select_clears_selection() {
        let mut engine = engine();
        let now = Instant::now();
        drag(&mut engine, &[(10.0, 10.0), (50.0, 50.0)], now);
        engine.set_tool(ToolKind::Select);
        drag(&mut engine, &[(0.0, 0.0), (60.0, 60.0)], now);
        assert!(engine.selection().is_some());
        assert!(engine.overlay().selection.is_some());

        let effects = engine.set_tool(ToolKind::Pen);
        assert_eq!(effects.redraw, Redraw::Full);
        assert!(engine.selection().is_none());
        assert!(engine.overlay().selection.is_none());
    }

    #[test]
    fn test_move_selection_keeps_grab_offset() {
        let mut engine = engine();
        let now = Instant::now();
        engine.views.strokes_mut().push(stroke(&[(10.0, 10.0), (50.0, 50.0)]));
        engine.set_tool(ToolKind::Select);
        drag(&mut engine, &[(0.0, 0.0), (60.0, 60.0)], now);
        // Box is (0,0)-(60,60) with padding 10.
        assert_eq!(engine.selection().unwrap().rect, Rect::new(0.0, 0.0, 60.0, 60.0));

        let effects = drag(&mut engine, &[(30.0, 30.0), (40.0, 35.0), (50.0, 45.0)], now);
        assert!(effects.persist);
        assert_eq!(engine.strokes()[0].points[0].position(), Point::new(30.0, 25.0));
        assert_eq!(engine.selection().unwrap().rect, Rect::new(20.0, 15.0, 80.0, 75.0));
    }

    #[test]
    fn test_click_in_selection_without_motion_is_not_a_mutation() {
        let mut engine = engine();
        let now = Instant::now();
        engine.views.strokes_mut().push(stroke(&[(10.0, 10.0), (50.0, 50.0)]));
        engine.set_tool(ToolKind::Select);
        drag(&mut engine, &[(0.0, 0.0), (60.0, 60.0)], now);
        let effects = drag(&mut engine, &[(30.0, 30.0)], now);
        assert!(!effects.persist);
    }

    #[test]
    fn test_resize_from_handle() {
        let mut engine = engine();
        let now = Instant::now();
        engine.views.strokes_mut().push(stroke(&[(20.0, 20.0), (40.0, 40.0)]));
        engine.set_tool(ToolKind::Select);
        drag(&mut engine, &[(15.0, 15.0), (45.0, 45.0)], now);
        let rect = engine.selection().unwrap().rect;
        assert_eq!(rect, Rect::new(10.0, 10.0, 50.0, 50.0));
        assert_eq!(
            engine.selection().unwrap().hit_handle(Point::new(50.0, 50.0), 12.0),
            Some(Corner::BottomRight)
        );

        let effects = drag(&mut engine, &[(50.0, 50.0), (90.0, 90.0)], now);
        assert!(effects.persist);
        // Offsets from (30,30) doubled.
        let points: Vec<Point> = engine.strokes()[0].points.iter().map(|p| p.position()).collect();
        assert_eq!(points, vec![Point::new(10.0, 10.0), Point::new(50.0, 50.0)]);
    }

    #[test]
    fn test_new_marquee_drops_old_selection() {
        let mut engine = engine();
        let now = Instant::now();
        engine.views.strokes_mut().push(stroke(&[(10.0, 10.0), (50.0, 50.0)]));
        engine.set_tool(ToolKind::Select);
        drag(&mut engine, &[(0.0, 0.0), (60.0, 60.0)], now);

        let down = engine.handle_pointer(PointerEvent::Down(at(300.0, 300.0)), now);
        assert_eq!(down.redraw, Redraw::Full);
        assert!(engine.selection().is_none());
        assert!(engine.overlay().marquee.is_some());
    }

    #[test]
    fn test_ruler_preview_and_commit() {
        let mut engine = engine();
        let now = Instant::now();
        engine.set_ruler(true);
        engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
        let effects = engine.handle_pointer(PointerEvent::Move(at(100.0, 40.0)), now);
        assert_eq!(effects.redraw, Redraw::Full);
        let preview = engine.overlay().ruler.unwrap();
        assert!(preview.end.y.abs() < 1e-9);

        engine.handle_pointer(PointerEvent::Up(at(100.0, 40.0)), now);
        assert_eq!(engine.strokes().len(), 1);
        assert_eq!(engine.strokes()[0].len(), 2);
        assert!(engine.overlay().ruler.is_none());
    }

    #[test]
    fn test_short_ruler_dropped() {
        let mut engine = engine();
        let now = Instant::now();
        engine.set_ruler(true);
        let effects = drag(&mut engine, &[(0.0, 0.0), (3.0, 4.0)], now);
        assert!(engine.strokes().is_empty());
        assert!(!effects.persist);
    }

    #[test]
    fn test_eraser_on_down_and_move() {
        let mut engine = engine();
        let now = Instant::now();
        engine.views.strokes_mut().push(stroke(&[(100.0, 100.0), (120.0, 100.0)]));
        engine.views.strokes_mut().push(stroke(&[(300.0, 100.0), (320.0, 100.0)]));
        engine.set_tool(ToolKind::Eraser);

        let down = engine.handle_pointer(PointerEvent::Down(at(110.0, 105.0)), now);
        assert!(down.persist);
        assert_eq!(down.redraw, Redraw::Full);
        assert_eq!(engine.strokes().len(), 1);

        let miss = engine.handle_pointer(PointerEvent::Move(at(200.0, 100.0)), now);
        assert_eq!(miss.redraw, Redraw::None);
        let hit = engine.handle_pointer(PointerEvent::Move(at(305.0, 100.0)), now);
        assert!(hit.persist);
        assert!(engine.strokes().is_empty());
    }

    #[test]
    fn test_clear_view_keeps_other_views() {
        let mut engine = engine();
        let now = Instant::now();
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);
        engine.view_changed("other".into(), now);
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);

        let effects = engine.clear_view(now);
        assert!(effects.persist);
        assert!(!effects.wipe_store);
        assert!(engine.strokes().is_empty());
        assert_eq!(engine.snapshot()[&ViewId::default()].len(), 1);
    }

    #[test]
    fn test_clear_all_wipes_store() {
        let mut engine = engine();
        let now = Instant::now();
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);
        engine.view_changed("other".into(), now);
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);

        let effects = engine.clear_all(now);
        assert!(effects.wipe_store);
        assert!(!engine.has_pending_save());
        assert!(engine.snapshot().values().all(Vec::is_empty));
    }

    #[test]
    fn test_toolbar_actions() {
        let mut engine = engine();
        let now = Instant::now();
        engine.apply_toolbar(ToolbarAction::Tool(ToolKind::Highlighter), now);
        engine.apply_toolbar(ToolbarAction::ToggleRuler, now);
        engine.apply_toolbar(ToolbarAction::Color(1), now);
        engine.apply_toolbar(ToolbarAction::Size(4), now);
        engine.apply_toolbar(ToolbarAction::Size(9), now);

        let tools = engine.tools();
        assert_eq!(tools.current_tool, ToolKind::Highlighter);
        assert!(tools.ruler_active());
        assert_eq!(tools.color, engine.config().palette[1]);
        assert_eq!(tools.size, 2.0);
    }

    #[test]
    fn test_ink_off_by_default_passes_input_through() {
        let mut engine = InkEngine::new(EngineConfig::default(), ViewId::default());
        let now = Instant::now();
        assert!(!engine.is_inking());
        assert_eq!(drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now), Effects::none());
        assert!(engine.strokes().is_empty());

        engine.apply_toolbar(ToolbarAction::ToggleInk, now);
        assert!(engine.is_inking());
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);
        assert_eq!(engine.strokes().len(), 1);
    }

    #[test]
    fn test_picking_a_tool_turns_ink_on() {
        let mut engine = InkEngine::new(EngineConfig::default(), ViewId::default());
        engine.apply_toolbar(ToolbarAction::Tool(ToolKind::Eraser), Instant::now());
        assert!(engine.is_inking());
        assert_eq!(engine.tools().current_tool, ToolKind::Eraser);
    }

    #[test]
    fn test_ink_off_mid_stroke_releases_and_discards() {
        let mut engine = engine();
        let now = Instant::now();
        engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
        engine.handle_pointer(PointerEvent::Move(at(10.0, 10.0)), now);

        let effects = engine.apply_toolbar(ToolbarAction::ToggleInk, now);
        assert!(!engine.is_inking());
        assert!(!engine.is_gesture_active());
        assert_eq!(effects.capture, Capture::Release(1));
        assert_eq!(effects.redraw, Redraw::Full);
        assert!(engine.strokes().is_empty());

        // Further input belongs to the page.
        let up = engine.handle_pointer(PointerEvent::Up(at(10.0, 10.0)), now);
        assert_eq!(up, Effects::none());
    }

    #[test]
    fn test_ink_off_drops_selection() {
        let mut engine = engine();
        let now = Instant::now();
        drag(&mut engine, &[(10.0, 10.0), (50.0, 50.0)], now);
        engine.set_tool(ToolKind::Select);
        drag(&mut engine, &[(0.0, 0.0), (60.0, 60.0)], now);
        assert!(engine.selection().is_some());

        let effects = engine.set_inking(false, now);
        assert!(engine.selection().is_none());
        assert_eq!(effects.redraw, Redraw::Full);
        assert_eq!(engine.set_inking(false, now), Effects::none());
    }

    #[test]
    fn test_load_keeps_ink_drawn_before_load() {
        let mut engine = engine();
        let now = Instant::now();
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);
        engine.take_pending_save();

        let mut stored = ViewMap::new();
        stored.insert(ViewId::default(), vec![stroke(&[(5.0, 5.0), (6.0, 6.0)])]);
        stored.insert("other".into(), vec![stroke(&[(5.0, 5.0), (6.0, 6.0)])]);
        let effects = engine.load_views(stored, now);
        assert!(effects.persist);
        assert_eq!(engine.strokes().len(), 2);
        assert_eq!(engine.snapshot().len(), 2);
    }

    #[test]
    fn test_take_pending_save() {
        let mut engine = engine();
        assert!(engine.take_pending_save().is_none());
        drag(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], Instant::now());
        let saved = engine.take_pending_save().unwrap();
        assert_eq!(saved[&ViewId::default()].len(), 1);
        assert!(!engine.has_pending_save());
    }
}
