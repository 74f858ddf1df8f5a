//! Drawing surface sizing and document-space mapping.
//!
//! The surface covers the whole scrollable extent of the host document (not
//! just the viewport), so ink is stored in document coordinates and stays in
//! place under scrolling and zooming. The price is that very tall documents
//! have to be capped.

use crate::config::EngineConfig;
use crate::timing::{Debounce, Duration, Instant};
use kurbo::{Affine, Point, Size};

/// Measurements read from the host layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostMetrics {
    /// Full scrollable content width in CSS pixels.
    pub content_width: f64,
    /// Full scrollable content height in CSS pixels.
    pub content_height: f64,
    pub device_pixel_ratio: f64,
}

/// Resolved size and scale of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    /// Size in CSS pixels (== document units).
    pub css_size: Size,
    /// Backing store size in device pixels.
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Device pixels per document unit.
    pub scale: f64,
    /// Whether the content was taller than the supported maximum.
    pub capped: bool,
}

impl SurfaceLayout {
    /// Document space to device pixels.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.scale)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x <= self.css_size.width
            && point.y <= self.css_size.height
    }
}

/// Keeps the surface in step with the host document's extent.
#[derive(Debug, Clone)]
pub struct SurfaceManager {
    max_height: f64,
    layout: Option<SurfaceLayout>,
    last_content_height: Option<f64>,
    resize: Debounce,
    poll_interval: Duration,
}

impl SurfaceManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_height: config.max_surface_height,
            layout: None,
            last_content_height: None,
            resize: Debounce::from_millis(config.resize_debounce_ms),
            poll_interval: Duration::from_millis(config.extent_poll_ms),
        }
    }

    pub fn layout(&self) -> Option<&SurfaceLayout> {
        self.layout.as_ref()
    }

    /// Interval at which the host should call [`SurfaceManager::extent_changed`].
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Resolve a layout for the given metrics without applying it.
    pub fn compute(&self, metrics: HostMetrics) -> SurfaceLayout {
        let dpr = if metrics.device_pixel_ratio.is_finite() && metrics.device_pixel_ratio > 0.0 {
            metrics.device_pixel_ratio
        } else {
            1.0
        };
        let width = metrics.content_width.max(0.0);
        // The cap is on device pixels; in document units it shrinks as the
        // density grows.
        let max_css_height = self.max_height / dpr;
        let capped = metrics.content_height > max_css_height;
        let height = metrics.content_height.clamp(0.0, max_css_height);
        SurfaceLayout {
            css_size: Size::new(width, height),
            pixel_width: (width * dpr).round() as u32,
            pixel_height: ((height * dpr).round() as u32).min(self.max_height as u32),
            scale: dpr,
            capped,
        }
    }

    /// Apply new host metrics. The caller must follow up with a full redraw,
    /// since resizing the backing store discards its contents.
    pub fn apply(&mut self, metrics: HostMetrics) -> SurfaceLayout {
        let layout = self.compute(metrics);
        if layout.capped {
            log::warn!(
                "Document height {}px at {}x exceeds the {}px surface limit; ink below {}px cannot be captured",
                metrics.content_height,
                layout.scale,
                self.max_height,
                layout.css_size.height
            );
        }
        self.last_content_height = Some(metrics.content_height);
        self.layout = Some(layout);
        layout
    }

    /// Record a window resize; the actual resize happens once it settles.
    pub fn request_resize(&mut self, now: Instant) {
        self.resize.schedule(now);
    }

    /// Remaining wait before a requested resize should run.
    pub fn resize_remaining(&self, now: Instant) -> Option<Duration> {
        self.resize.remaining(now)
    }

    /// True exactly once after a requested resize has settled.
    pub fn take_resize_due(&mut self, now: Instant) -> bool {
        self.resize.take_due(now)
    }

    /// Periodic check for content that grew or shrank without a resize event.
    pub fn extent_changed(&self, content_height: f64) -> bool {
        match self.last_content_height {
            Some(last) => (last - content_height).abs() > f64::EPSILON,
            None => true,
        }
    }

    /// Map a client-space pointer position to document space, given the
    /// surface's client-space origin (its bounding rect's top-left).
    pub fn client_to_document(client: Point, surface_origin: Point) -> Point {
        Point::new(client.x - surface_origin.x, client.y - surface_origin.y)
    }
}
