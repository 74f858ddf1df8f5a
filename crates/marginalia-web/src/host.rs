//! Reading the host page: layout, view signal, config and pointer samples.

use kurbo::{Point, Size};
use marginalia_core::{EngineConfig, HostMetrics, PointerKind, PointerSample, ViewId};
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlCanvasElement, MutationObserver, MutationObserverInit, Window};

/// Attribute carrying the active view's id.
pub const VIEW_ATTRIBUTE: &str = "data-active-view";
/// Optional JSON engine config on the root element.
pub const CONFIG_ATTRIBUTE: &str = "data-marginalia-config";

/// Host page errors.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("No window object")]
    MissingWindow,
    #[error("No document")]
    MissingDocument,
    #[error("Missing element: {0}")]
    MissingElement(String),
    #[error("Canvas error: {0}")]
    Canvas(String),
    #[error("DOM error: {0}")]
    Js(String),
}

impl From<JsValue> for HostError {
    fn from(value: JsValue) -> Self {
        HostError::Js(format!("{:?}", value))
    }
}

impl From<HostError> for JsValue {
    fn from(err: HostError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub fn window() -> Result<Window, HostError> {
    web_sys::window().ok_or(HostError::MissingWindow)
}

pub fn document(window: &Window) -> Result<Document, HostError> {
    window.document().ok_or(HostError::MissingDocument)
}

/// Full scrollable extent of the document and the pixel density.
pub fn metrics(window: &Window, document: &Document) -> HostMetrics {
    let (mut width, mut height) = (0.0_f64, 0.0_f64);
    if let Some(root) = document.document_element() {
        width = width.max(root.scroll_width() as f64);
        height = height.max(root.scroll_height() as f64);
    }
    if let Some(body) = document.body() {
        width = width.max(body.scroll_width() as f64);
        height = height.max(body.scroll_height() as f64);
    }
    HostMetrics {
        content_width: width,
        content_height: height,
        device_pixel_ratio: window.device_pixel_ratio(),
    }
}

/// The view the page currently shows.
pub fn current_view(document: &Document) -> ViewId {
    let signal = document
        .query_selector(&format!("[{VIEW_ATTRIBUTE}]"))
        .ok()
        .flatten()
        .and_then(|el| el.get_attribute(VIEW_ATTRIBUTE));
    ViewId::from_signal(signal.as_deref())
}

/// Engine config from the root element, defaults when absent or invalid.
pub fn load_config(document: &Document) -> EngineConfig {
    let Some(json) = document
        .document_element()
        .and_then(|root| root.get_attribute(CONFIG_ATTRIBUTE))
    else {
        return EngineConfig::default();
    };
    match EngineConfig::from_json(&json) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring {}: {}", CONFIG_ATTRIBUTE, e);
            EngineConfig::default()
        }
    }
}

pub fn page_path(window: &Window) -> String {
    window
        .location()
        .pathname()
        .unwrap_or_else(|_| "/".to_string())
}

/// Insert the overlay canvas at the document origin.
pub fn create_canvas(document: &Document) -> Result<HtmlCanvasElement, HostError> {
    let body = document
        .body()
        .ok_or_else(|| HostError::MissingElement("body".to_string()))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| HostError::Canvas("created element is not a canvas".to_string()))?;
    canvas.set_class_name("marginalia-ink");
    let style = canvas.style();
    style.set_property("position", "absolute")?;
    style.set_property("left", "0")?;
    style.set_property("top", "0")?;
    style.set_property("z-index", "1000")?;
    body.append_child(&canvas)?;
    Ok(canvas)
}

/// Call `on_change` with the new view whenever the view signal changes.
/// The observer lives as long as the page.
pub fn observe_view(
    document: &Document,
    mut on_change: impl FnMut(ViewId) + 'static,
) -> Result<MutationObserver, HostError> {
    let root = document
        .document_element()
        .ok_or(HostError::MissingDocument)?;
    let doc = document.clone();
    let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |_records: js_sys::Array, _observer: MutationObserver| {
            on_change(current_view(&doc));
        },
    );
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    callback.forget();

    let init = MutationObserverInit::new();
    init.set_attributes(true);
    init.set_subtree(true);
    init.set_attribute_filter(&js_sys::Array::of1(&JsValue::from_str(VIEW_ATTRIBUTE)));
    observer.observe_with_options(&root, &init)?;
    Ok(observer)
}

/// Convert a DOM pointer event to a document-space sample.
pub fn pointer_sample(event: &web_sys::PointerEvent, surface_origin: Point) -> PointerSample {
    let client = Point::new(event.client_x() as f64, event.client_y() as f64);
    PointerSample {
        pointer_id: event.pointer_id(),
        kind: PointerKind::from_dom(&event.pointer_type()),
        position: marginalia_core::SurfaceManager::client_to_document(client, surface_origin),
        pressure: event.pressure() as f64,
        tilt_x: event.tilt_x() as f64,
        tilt_y: event.tilt_y() as f64,
        contact: Size::new(event.width() as f64, event.height() as f64),
        timestamp_ms: Some(event.time_stamp()),
    }
}

/// Client-space top-left of the canvas.
pub fn surface_origin(canvas: &HtmlCanvasElement) -> Point {
    let rect = canvas.get_bounding_client_rect();
    Point::new(rect.left(), rect.top())
}
