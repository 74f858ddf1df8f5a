//! Page wiring: owns the engine and turns DOM events into engine calls and
//! engine effects into canvas, capture and storage work.

use crate::canvas::CanvasSurface;
use crate::host::{self, HostError};
use crate::toolbar::{self, ToolbarView};
use marginalia_core::storage::{InkStore, PlatformStorage, create_default_storage};
use marginalia_core::timing::{Duration, Instant};
use marginalia_core::{
    Capture, ClearAction, ClearButton, Effects, HostMetrics, InkEngine, PointerEvent, PointerSample, Redraw, ViewId,
};
use marginalia_render::InkRenderer;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, Document, EventTarget, HtmlCanvasElement, Window};

type Shared = Rc<RefCell<Annotator>>;

/// Clear-button long-press polling interval.
const CLEAR_POLL_MS: i32 = 100;

/// Everything the page needs to drive the engine.
pub struct Annotator {
    engine: InkEngine,
    renderer: InkRenderer,
    surface: CanvasSurface,
    store: InkStore<PlatformStorage>,
    window: Window,
    document: Document,
    toolbar: ToolbarView,
    clear_button: ClearButton,
    persist_timer: Option<i32>,
    resize_timer: Option<i32>,
    clear_timer: Option<i32>,
}

impl Annotator {
    fn canvas(&self) -> &HtmlCanvasElement {
        self.surface.canvas()
    }

    /// Carry out what the engine asked for.
    fn apply(&mut self, effects: Effects, event: Option<&web_sys::Event>) {
        match effects.redraw {
            Redraw::None => {}
            Redraw::Segment => self.draw_segment(),
            Redraw::Full => self.redraw(),
        }
        match effects.capture {
            Capture::Keep => {}
            Capture::Acquire(id) => {
                if let Err(e) = self.canvas().set_pointer_capture(id) {
                    log::debug!("Pointer capture refused: {:?}", e);
                    self.engine.lost_capture(id);
                }
            }
            Capture::Release(id) => {
                let _ = self.canvas().release_pointer_capture(id);
            }
        }
        if let (true, Some(event)) = (effects.prevent_default, event) {
            event.prevent_default();
        }
        if effects.wipe_store {
            let store = self.store.clone();
            wasm_bindgen_futures::spawn_local(async move { store.wipe().await });
        }
    }

    fn draw_segment(&mut self) {
        let Some(layout) = self.engine.surface().layout().copied() else {
            return;
        };
        if let Some(stroke) = self.engine.live_stroke() {
            self.renderer
                .draw_segment(&mut self.surface, stroke, layout.transform());
        }
    }

    fn redraw(&mut self) {
        let Some(layout) = self.engine.surface().layout().copied() else {
            return;
        };
        let scene = self.engine.scene();
        self.renderer.redraw(&mut self.surface, &scene, layout.transform());
    }

    /// Re-measure the page and resize the canvas to match.
    fn refresh_surface(&mut self) {
        let metrics = self.measure();
        let effects = self.engine.apply_metrics(metrics);
        if let Some(layout) = self.engine.surface().layout().copied() {
            if let Err(e) = self.surface.resize(&layout) {
                log::error!("Failed to resize ink surface: {}", e);
            }
        }
        self.apply(effects, None);
    }

    /// Write now if a save is pending.
    fn flush_now(&mut self) {
        if let Some(timer) = self.persist_timer.take() {
            self.window.clear_timeout_with_handle(timer);
        }
        if let Some(views) = self.engine.take_pending_save() {
            let store = self.store.clone();
            wasm_bindgen_futures::spawn_local(async move { store.flush(&views).await });
        }
    }

    /// Measure the page without the overlay, which would otherwise hold the
    /// document at least as tall as the last layout.
    fn measure(&self) -> HostMetrics {
        self.surface.collapse();
        let metrics = host::metrics(&self.window, &self.document);
        if let Some(layout) = self.engine.surface().layout() {
            if let Err(e) = self.surface.set_css_size(layout) {
                log::warn!("Failed to restore ink surface size: {}", e);
            }
        }
        metrics
    }

    fn sync_toolbar(&self) {
        self.toolbar.sync(self.engine.tools(), self.engine.config());
        self.surface.set_interactive(self.engine.is_inking());
    }
}

/// Run an engine call against the shared state, then arm any timers its
/// effects need.
fn dispatch(shared: &Shared, event: Option<&web_sys::Event>, call: impl FnOnce(&mut InkEngine, Instant) -> Effects) {
    let persist = {
        let mut app = shared.borrow_mut();
        let effects = call(&mut app.engine, Instant::now());
        app.apply(effects, event);
        effects.persist
    };
    if persist {
        arm_persist(shared);
    }
}

fn set_timeout(window: &Window, delay: Duration, callback: impl FnOnce() + 'static) -> Option<i32> {
    let callback = Closure::once_into_js(callback);
    let ms = delay.as_millis().min(i32::MAX as u128) as i32;
    match window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), ms) {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("setTimeout failed: {:?}", e);
            None
        }
    }
}

/// (Re)arm the save timer for the engine's debounce deadline.
fn arm_persist(shared: &Shared) {
    let mut app = shared.borrow_mut();
    if let Some(timer) = app.persist_timer.take() {
        app.window.clear_timeout_with_handle(timer);
    }
    let Some(delay) = app.engine.persist_remaining(Instant::now()) else {
        return;
    };
    let weak = Rc::downgrade(shared);
    app.persist_timer = set_timeout(&app.window, delay, move || {
        if let Some(shared) = weak.upgrade() {
            on_persist_timer(&shared);
        }
    });
}

fn on_persist_timer(shared: &Shared) {
    let save = {
        let mut app = shared.borrow_mut();
        app.persist_timer = None;
        app.engine
            .take_due_save(Instant::now())
            .map(|views| (app.store.clone(), views))
    };
    match save {
        Some((store, views)) => {
            wasm_bindgen_futures::spawn_local(async move { store.flush(&views).await });
        }
        // Rescheduled after the timer was armed.
        None => arm_persist(shared),
    }
}

fn arm_resize(shared: &Shared) {
    let mut app = shared.borrow_mut();
    let now = Instant::now();
    app.engine.surface_mut().request_resize(now);
    if let Some(timer) = app.resize_timer.take() {
        app.window.clear_timeout_with_handle(timer);
    }
    let Some(delay) = app.engine.surface().resize_remaining(now) else {
        return;
    };
    let weak = Rc::downgrade(shared);
    app.resize_timer = set_timeout(&app.window, delay, move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut app = shared.borrow_mut();
        app.resize_timer = None;
        if app.engine.surface_mut().take_resize_due(Instant::now()) {
            app.refresh_surface();
        }
    });
}

fn listen<E: JsCast + 'static>(
    target: &EventTarget,
    name: &str,
    shared: &Shared,
    handler: fn(&Shared, E),
) -> Result<(), HostError> {
    let shared = Rc::clone(shared);
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        if let Ok(event) = event.dyn_into::<E>() {
            handler(&shared, event);
        }
    });
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn on_pointer(shared: &Shared, event: web_sys::PointerEvent, wrap: fn(PointerSample) -> PointerEvent) {
    let origin = host::surface_origin(shared.borrow().canvas());
    let sample = host::pointer_sample(&event, origin);
    let dom: &web_sys::Event = &event;
    dispatch(shared, Some(dom), |engine, now| engine.handle_pointer(wrap(sample), now));
}

fn on_lost_capture(shared: &Shared, event: web_sys::PointerEvent) {
    shared.borrow_mut().engine.lost_capture(event.pointer_id());
}

/// Block page scrolling only while a single finger is inking.
fn on_touch_move(shared: &Shared, event: web_sys::TouchEvent) {
    if event.touches().length() == 1 && shared.borrow().engine.is_gesture_active() {
        event.prevent_default();
    }
}

fn on_toolbar_click(shared: &Shared, event: web_sys::MouseEvent) {
    let Some(action) = toolbar::action_for(&event) else {
        return;
    };
    dispatch(shared, None, |engine, now| engine.apply_toolbar(action, now));
    shared.borrow().sync_toolbar();
}

fn on_clear_down(shared: &Shared, event: web_sys::PointerEvent) {
    event.prevent_default();
    let mut app = shared.borrow_mut();
    app.clear_button.press(Instant::now());
    if let Some(timer) = app.clear_timer.take() {
        app.window.clear_interval_with_handle(timer);
    }
    let weak = Rc::downgrade(shared);
    let poll = Closure::<dyn FnMut()>::new(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let action = shared.borrow_mut().clear_button.poll(Instant::now());
        if let Some(action) = action {
            stop_clear_poll(&shared);
            run_clear(&shared, action);
        }
    });
    match app
        .window
        .set_interval_with_callback_and_timeout_and_arguments_0(poll.as_ref().unchecked_ref(), CLEAR_POLL_MS)
    {
        Ok(handle) => app.clear_timer = Some(handle),
        Err(e) => log::error!("setInterval failed: {:?}", e),
    }
    poll.forget();
}

fn on_clear_up(shared: &Shared, _event: web_sys::PointerEvent) {
    stop_clear_poll(shared);
    let action = shared.borrow_mut().clear_button.release(Instant::now());
    if let Some(action) = action {
        run_clear(shared, action);
    }
}

fn on_clear_leave(shared: &Shared, _event: web_sys::PointerEvent) {
    stop_clear_poll(shared);
    shared.borrow_mut().clear_button.cancel();
}

fn stop_clear_poll(shared: &Shared) {
    let mut app = shared.borrow_mut();
    if let Some(timer) = app.clear_timer.take() {
        app.window.clear_interval_with_handle(timer);
    }
}

fn run_clear(shared: &Shared, action: ClearAction) {
    match action {
        ClearAction::CurrentView => dispatch(shared, None, |engine, now| engine.clear_view(now)),
        ClearAction::ConfirmAll => {
            let confirmed = {
                let app = shared.borrow();
                app.window
                    .confirm_with_message("Erase the ink on every view of this page?")
                    .unwrap_or(false)
            };
            if confirmed {
                dispatch(shared, None, |engine, now| engine.clear_all(now));
            }
        }
    }
}

fn on_page_hidden(shared: &Shared, _event: web_sys::Event) {
    shared.borrow_mut().flush_now();
}

fn on_visibility(shared: &Shared, _event: web_sys::Event) {
    let hidden = shared.borrow().document.hidden();
    if hidden {
        shared.borrow_mut().flush_now();
    }
}

fn on_blur(shared: &Shared, _event: web_sys::Event) {
    dispatch(shared, None, |engine, now| engine.reset_input(now));
}

fn on_resize(shared: &Shared, _event: web_sys::Event) {
    arm_resize(shared);
}

/// Build the overlay, attach every listener and start loading stored ink.
pub fn start() -> Result<(), HostError> {
    let window = host::window()?;
    let document = host::document(&window)?;
    let config = host::load_config(&document);
    let view = host::current_view(&document);
    let page = host::page_path(&window);

    let canvas = host::create_canvas(&document)?;
    let surface = CanvasSurface::new(canvas).map_err(|e| HostError::Canvas(e.to_string()))?;
    let toolbar = ToolbarView::build(&document, &config)?;
    let storage = create_default_storage().map_err(|e| HostError::Js(e.to_string()))?;
    let store = InkStore::new(storage, &page);
    let renderer = InkRenderer::new(&config);
    let clear_button = ClearButton::new(&config);
    let engine = InkEngine::new(config, view.clone());
    log::info!("Annotating {} (view {})", page, view);

    let shared: Shared = Rc::new(RefCell::new(Annotator {
        engine,
        renderer,
        surface,
        store,
        window: window.clone(),
        document: document.clone(),
        toolbar,
        clear_button,
        persist_timer: None,
        resize_timer: None,
        clear_timer: None,
    }));
    {
        let mut app = shared.borrow_mut();
        app.refresh_surface();
        app.sync_toolbar();
    }

    let canvas: EventTarget = shared.borrow().canvas().clone().into();
    listen::<web_sys::PointerEvent>(&canvas, "pointerdown", &shared, |s, e| on_pointer(s, e, PointerEvent::Down))?;
    listen::<web_sys::PointerEvent>(&canvas, "pointermove", &shared, |s, e| on_pointer(s, e, PointerEvent::Move))?;
    listen::<web_sys::PointerEvent>(&canvas, "pointerup", &shared, |s, e| on_pointer(s, e, PointerEvent::Up))?;
    listen::<web_sys::PointerEvent>(&canvas, "pointercancel", &shared, |s, e| on_pointer(s, e, PointerEvent::Cancel))?;
    listen::<web_sys::PointerEvent>(&canvas, "pointerleave", &shared, |s, e| on_pointer(s, e, PointerEvent::Leave))?;
    listen(&canvas, "lostpointercapture", &shared, on_lost_capture)?;

    let touch_shared = Rc::clone(&shared);
    let touch_move = Closure::<dyn FnMut(web_sys::TouchEvent)>::new(move |event: web_sys::TouchEvent| {
        on_touch_move(&touch_shared, event);
    });
    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    canvas.add_event_listener_with_callback_and_add_event_listener_options(
        "touchmove",
        touch_move.as_ref().unchecked_ref(),
        &options,
    )?;
    touch_move.forget();

    let (toolbar_root, clear): (EventTarget, EventTarget) = {
        let app = shared.borrow();
        (
            app.toolbar.root().clone().into(),
            app.toolbar.clear_button().clone().into(),
        )
    };
    listen(&toolbar_root, "click", &shared, on_toolbar_click)?;
    listen(&clear, "pointerdown", &shared, on_clear_down)?;
    listen(&clear, "pointerup", &shared, on_clear_up)?;
    listen(&clear, "pointerleave", &shared, on_clear_leave)?;
    listen(&clear, "pointercancel", &shared, on_clear_leave)?;

    let window_target: EventTarget = window.clone().into();
    listen(&window_target, "resize", &shared, on_resize)?;
    listen(&window_target, "pagehide", &shared, on_page_hidden)?;
    listen(&window_target, "blur", &shared, on_blur)?;
    let document_target: EventTarget = document.clone().into();
    listen(&document_target, "visibilitychange", &shared, on_visibility)?;

    start_extent_poll(&shared)?;

    let view_shared = Rc::clone(&shared);
    host::observe_view(&document, move |view: ViewId| {
        dispatch(&view_shared, None, |engine, now| engine.view_changed(view, now));
    })?;

    let load_shared = Rc::clone(&shared);
    let store = shared.borrow().store.clone();
    wasm_bindgen_futures::spawn_local(async move {
        let stored = store.load(&view).await;
        dispatch(&load_shared, None, |engine, now| engine.load_views(stored, now));
    });
    Ok(())
}

/// Catch content that grows without a resize event.
fn start_extent_poll(shared: &Shared) -> Result<(), HostError> {
    let app = shared.borrow();
    let interval = app.engine.surface().poll_interval();
    let weak = Rc::downgrade(shared);
    let poll = Closure::<dyn FnMut()>::new(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut app = shared.borrow_mut();
        let height = app.measure().content_height;
        if app.engine.surface().extent_changed(height) {
            log::debug!("Document extent changed to {}", height);
            app.refresh_surface();
        }
    });
    let ms = interval.as_millis().min(i32::MAX as u128) as i32;
    app.window
        .set_interval_with_callback_and_timeout_and_arguments_0(poll.as_ref().unchecked_ref(), ms)?;
    poll.forget();
    Ok(())
}
