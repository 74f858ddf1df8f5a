//! Marginalia Web Host
//!
//! Binds the annotation engine to a live page: a canvas overlay covering
//! the whole document, pointer and resize listeners, the toolbar, the view
//! signal and IndexedDB persistence. The inspection helpers build natively
//! too and back the `marginalia-inspect` binary.

pub mod inspect;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod canvas;
#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod toolbar;
#[cfg(target_arch = "wasm32")]
mod web;

pub use inspect::{ViewSummary, summarize};

#[cfg(target_arch = "wasm32")]
pub use web::run_wasm;
