//! WebAssembly entry point.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Initialize and run the annotation layer.
#[wasm_bindgen(start)]
pub fn run_wasm() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger unavailable: {e}").into());
    }

    log::info!("Starting Marginalia (WASM)");

    // The overlay needs a body; wait for it if the script runs in <head>.
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        log::error!("No document, annotations disabled");
        return;
    };
    if document.ready_state() == "loading" {
        let start = Closure::once_into_js(launch);
        if let Err(e) = document.add_event_listener_with_callback("DOMContentLoaded", start.unchecked_ref()) {
            log::error!("Failed to wait for DOMContentLoaded: {:?}", e);
        }
    } else {
        launch();
    }
}

fn launch() {
    if let Err(e) = crate::app::start() {
        log::error!("Annotations disabled: {}", e);
    }
}
