//! End-to-end engine scenarios driven through the public API.

use kurbo::Point;
use marginalia_core::storage::{MemoryStorage, decode, encode};
use marginalia_core::timing::{Duration, Instant};
use marginalia_core::{
    EngineConfig, InkColor, InkEngine, InkStore, InkTool, PointerEvent, PointerKind, PointerSample,
    Redraw, ToolKind, ViewId, ViewMap,
};
use std::sync::Arc;

fn config() -> EngineConfig {
    EngineConfig {
        start_inking: true,
        ..EngineConfig::default()
    }
}

fn engine() -> InkEngine {
    InkEngine::new(config(), ViewId::default())
}

fn at(x: f64, y: f64) -> PointerSample {
    PointerSample::mouse(Point::new(x, y))
}

fn touch(id: i32, x: f64, y: f64) -> PointerSample {
    PointerSample {
        pointer_id: id,
        kind: PointerKind::Touch,
        ..PointerSample::mouse(Point::new(x, y))
    }
}

fn draw(engine: &mut InkEngine, points: &[(f64, f64)], now: Instant) {
    let (&(x, y), rest) = points.split_first().unwrap();
    engine.handle_pointer(PointerEvent::Down(at(x, y)), now);
    for &(x, y) in rest {
        engine.handle_pointer(PointerEvent::Move(at(x, y)), now);
    }
    let &(x, y) = points.last().unwrap();
    engine.handle_pointer(PointerEvent::Up(at(x, y)), now);
}

/// What must survive a save/load cycle. Velocity factors are live-only.
type Fingerprint = Vec<(String, Vec<(InkTool, InkColor, f64, Vec<(f64, f64, f64)>)>)>;

fn fingerprint(views: &ViewMap) -> Fingerprint {
    views
        .iter()
        .map(|(view, strokes)| {
            let strokes = strokes
                .iter()
                .map(|s| {
                    let points = s.points.iter().map(|p| (p.x, p.y, p.pressure)).collect();
                    (s.tool, s.color, s.size, points)
                })
                .collect();
            (view.to_string(), strokes)
        })
        .collect()
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);
    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

#[test]
fn tap_leaves_no_ink() {
    let mut engine = engine();
    let now = Instant::now();
    engine.handle_pointer(PointerEvent::Down(at(40.0, 40.0)), now);
    let up = engine.handle_pointer(PointerEvent::Up(at(40.0, 40.0)), now);
    assert!(engine.strokes().is_empty());
    assert!(!up.persist);

    // Jitter below the decimation threshold is still a tap.
    draw(&mut engine, &[(40.0, 40.0), (41.0, 40.5), (40.5, 41.0)], now);
    assert!(engine.strokes().is_empty());
}

#[test]
fn completed_stroke_is_committed_and_redrawn() {
    let mut engine = engine();
    let now = Instant::now();
    engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
    engine.handle_pointer(PointerEvent::Move(at(10.0, 0.0)), now);
    engine.handle_pointer(PointerEvent::Move(at(20.0, 5.0)), now);
    let up = engine.handle_pointer(PointerEvent::Up(at(20.0, 5.0)), now);

    assert_eq!(up.redraw, Redraw::Full);
    assert!(up.persist);
    assert_eq!(engine.strokes().len(), 1);
    assert_eq!(engine.strokes()[0].len(), 3);
    assert!(engine.live_stroke().is_none());
}

#[test]
fn view_switch_mid_stroke_is_deferred() {
    let mut engine = engine();
    let now = Instant::now();
    engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
    engine.handle_pointer(PointerEvent::Move(at(10.0, 10.0)), now);

    let effects = engine.view_changed(ViewId::from("part-2"), now);
    assert_eq!(effects.redraw, Redraw::None);
    assert_eq!(engine.active_view(), &ViewId::default());
    assert_eq!(engine.pending_view(), Some(&ViewId::from("part-2")));

    engine.handle_pointer(PointerEvent::Move(at(20.0, 20.0)), now);
    let up = engine.handle_pointer(PointerEvent::Up(at(20.0, 20.0)), now);
    assert_eq!(up.redraw, Redraw::Full);

    // The stroke landed in the view it was started in, then the switch applied.
    assert_eq!(engine.active_view(), &ViewId::from("part-2"));
    assert!(engine.strokes().is_empty());
    assert_eq!(engine.snapshot()[&ViewId::default()].len(), 1);
}

#[test]
fn view_switch_back_during_gesture_cancels_pending() {
    let mut engine = engine();
    let now = Instant::now();
    engine.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), now);
    engine.view_changed(ViewId::from("part-2"), now);
    engine.view_changed(ViewId::default(), now);
    engine.handle_pointer(PointerEvent::Up(at(0.0, 0.0)), now);
    assert_eq!(engine.active_view(), &ViewId::default());
}

#[test]
fn views_keep_separate_ink() {
    let mut engine = engine();
    let now = Instant::now();
    draw(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);

    let effects = engine.view_changed(ViewId::from("answers"), now);
    assert_eq!(effects.redraw, Redraw::Full);
    assert!(effects.persist);
    assert!(engine.strokes().is_empty());

    draw(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], now);
    draw(&mut engine, &[(50.0, 0.0), (60.0, 10.0)], now);

    engine.view_changed(ViewId::default(), now);
    assert_eq!(engine.strokes().len(), 1);
}

#[test]
fn second_touch_abandons_stroke() {
    let mut engine = engine();
    let now = Instant::now();
    let down = engine.handle_pointer(PointerEvent::Down(touch(1, 0.0, 0.0)), now);
    assert!(down.prevent_default);
    engine.handle_pointer(PointerEvent::Move(touch(1, 10.0, 0.0)), now);

    let pinch = engine.handle_pointer(PointerEvent::Down(touch(2, 100.0, 0.0)), now);
    assert_eq!(pinch.redraw, Redraw::Full);
    assert!(!pinch.prevent_default);
    assert!(!engine.is_gesture_active());

    // The rest of the pinch is left to the browser.
    let moved = engine.handle_pointer(PointerEvent::Move(touch(1, 20.0, 0.0)), now);
    assert!(!moved.prevent_default);
    engine.handle_pointer(PointerEvent::Up(touch(1, 20.0, 0.0)), now);
    engine.handle_pointer(PointerEvent::Up(touch(2, 100.0, 0.0)), now);
    assert!(engine.strokes().is_empty());

    // A single touch draws again afterwards.
    engine.handle_pointer(PointerEvent::Down(touch(3, 0.0, 0.0)), now);
    engine.handle_pointer(PointerEvent::Move(touch(3, 10.0, 0.0)), now);
    engine.handle_pointer(PointerEvent::Up(touch(3, 10.0, 0.0)), now);
    assert_eq!(engine.strokes().len(), 1);
}

#[test]
fn marquee_over_empty_space_clears_selection() {
    let mut engine = engine();
    let now = Instant::now();
    draw(&mut engine, &[(10.0, 10.0), (50.0, 50.0)], now);
    engine.set_tool(ToolKind::Select);

    draw(&mut engine, &[(0.0, 0.0), (60.0, 60.0)], now);
    assert!(engine.selection().is_some());

    draw(&mut engine, &[(300.0, 300.0), (400.0, 400.0)], now);
    assert!(engine.selection().is_none());
    assert!(engine.overlay().selection.is_none());
}

#[test]
fn rapid_mutations_coalesce_into_one_save() {
    let mut engine = engine();
    let t0 = Instant::now();
    draw(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], t0);
    draw(&mut engine, &[(0.0, 20.0), (10.0, 30.0)], t0 + Duration::from_millis(100));
    draw(&mut engine, &[(0.0, 40.0), (10.0, 50.0)], t0 + Duration::from_millis(300));

    let delay = engine.persist_delay();
    assert!(engine.take_due_save(t0 + delay).is_none());
    let saved = engine
        .take_due_save(t0 + Duration::from_millis(300) + delay)
        .unwrap();
    assert_eq!(saved[&ViewId::default()].len(), 3);
    assert!(engine.take_due_save(t0 + Duration::from_secs(10)).is_none());
}

#[test]
fn saved_views_reload_identically() {
    let mut engine = engine();
    let now = Instant::now();
    draw(&mut engine, &[(0.0, 0.0), (10.0, 10.0), (20.0, 5.0)], now);
    engine.set_tool(ToolKind::Highlighter);
    engine.set_size_preset(4);
    engine.view_changed(ViewId::from("part-2"), now);
    draw(&mut engine, &[(0.0, 0.0), (30.0, 0.0)], now);

    let store = InkStore::new(Arc::new(MemoryStorage::new()), "/lessons/7.html");
    let saved = engine.take_pending_save().unwrap();
    block_on(store.save(&saved)).unwrap();

    let mut reloaded = InkEngine::new(config(), ViewId::from("part-2"));
    let stored = block_on(store.load(reloaded.active_view()));
    reloaded.load_views(stored, now);
    assert_eq!(fingerprint(&reloaded.snapshot()), fingerprint(&engine.snapshot()));
    let ids = |views: &ViewMap| views.values().flatten().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids(&reloaded.snapshot()), ids(&engine.snapshot()));
    assert_eq!(reloaded.strokes()[0].size, 2.0);
}

#[test]
fn codec_accepts_engine_output() {
    let mut engine = engine();
    draw(&mut engine, &[(0.0, 0.0), (10.0, 10.0)], Instant::now());
    let json = encode(&engine.snapshot()).unwrap();
    let decoded = decode(&json, &ViewId::default());
    assert_eq!(fingerprint(&decoded), fingerprint(&engine.snapshot()));
    assert!(decoded.values().flatten().flat_map(|s| &s.points).all(|p| p.velocity_factor.is_none()));
}
