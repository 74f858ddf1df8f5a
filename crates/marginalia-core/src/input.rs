//! Pointer input: palm rejection, decimation and velocity modulation.

use crate::config::EngineConfig;
use crate::ink::{DEFAULT_PRESSURE, InkPoint};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of device behind a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

impl PointerKind {
    /// Map a DOM `pointerType` string.
    pub fn from_dom(pointer_type: &str) -> Self {
        match pointer_type {
            "pen" => PointerKind::Pen,
            "touch" => PointerKind::Touch,
            _ => PointerKind::Mouse,
        }
    }
}

/// A raw pointer sample, already mapped to document space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pointer_id: i32,
    pub kind: PointerKind,
    pub position: Point,
    /// Pressure as reported by the device.
    pub pressure: f64,
    pub tilt_x: f64,
    pub tilt_y: f64,
    /// Contact geometry (width/height) in CSS pixels.
    pub contact: Size,
    /// Event timestamp in milliseconds, if the platform provides one.
    pub timestamp_ms: Option<f64>,
}

impl PointerSample {
    /// A mouse sample with no timing, mostly useful for tests and replays.
    pub fn mouse(position: Point) -> Self {
        Self {
            pointer_id: 1,
            kind: PointerKind::Mouse,
            position,
            pressure: DEFAULT_PRESSURE,
            tilt_x: 0.0,
            tilt_y: 0.0,
            contact: Size::new(1.0, 1.0),
            timestamp_ms: None,
        }
    }

    pub fn with_time(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }

    /// Radius of the contact area.
    pub fn contact_radius(&self) -> f64 {
        self.contact.width.max(self.contact.height) / 2.0
    }

    /// Pressure clamped to `0..=1`, with the default substituted when a
    /// non-touch device reports none.
    pub fn normalized_pressure(&self) -> f64 {
        if self.kind != PointerKind::Touch && self.pressure <= 0.0 {
            DEFAULT_PRESSURE
        } else {
            self.pressure.clamp(0.0, 1.0)
        }
    }
}

/// Pointer event stream consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(PointerSample),
    Move(PointerSample),
    Up(PointerSample),
    Leave(PointerSample),
    Cancel(PointerSample),
}

impl PointerEvent {
    pub fn sample(&self) -> &PointerSample {
        match self {
            PointerEvent::Down(s)
            | PointerEvent::Move(s)
            | PointerEvent::Up(s)
            | PointerEvent::Leave(s)
            | PointerEvent::Cancel(s) => s,
        }
    }
}

/// Turns samples of the active gesture into filtered, enriched ink points.
#[derive(Debug, Clone)]
pub struct InputCapture {
    palm_radius: f64,
    min_distance: f64,
    max_velocity: f64,
    velocity_weight: f64,
    /// Touch contacts currently on the surface.
    touches: HashSet<i32>,
    /// Last accepted point and its timestamp.
    last: Option<(InkPoint, Option<f64>)>,
}

impl InputCapture {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            palm_radius: config.palm_radius,
            min_distance: config.min_point_distance,
            max_velocity: config.max_velocity,
            velocity_weight: config.velocity_weight,
            touches: HashSet::new(),
            last: None,
        }
    }

    /// Palm or accidental contact: oversized contact area, or a touch
    /// reporting no pressure at all.
    pub fn is_rejected(&self, sample: &PointerSample) -> bool {
        sample.contact_radius() > self.palm_radius
            || (sample.kind == PointerKind::Touch && sample.pressure <= 0.0)
    }

    /// Track a touch contact going down. Returns true if more than one
    /// contact is now on the surface.
    pub fn touch_down(&mut self, sample: &PointerSample) -> bool {
        if sample.kind == PointerKind::Touch {
            self.touches.insert(sample.pointer_id);
        }
        self.is_multi_touch()
    }

    pub fn touch_up(&mut self, sample: &PointerSample) {
        if sample.kind == PointerKind::Touch {
            self.touches.remove(&sample.pointer_id);
        }
    }

    /// Two or more simultaneous contacts: a pinch or pan, never ink.
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }

    /// Start a new point sequence at `sample`.
    pub fn begin(&mut self, sample: &PointerSample) -> InkPoint {
        let point = Self::to_point(sample, Some(1.0));
        self.last = Some((point, sample.timestamp_ms));
        point
    }

    /// Accept a move sample if it is far enough from the last accepted one.
    pub fn accept(&mut self, sample: &PointerSample) -> Option<InkPoint> {
        let (last, last_time) = self.last?;
        let distance = last.distance_to(sample.position);
        if distance <= self.min_distance {
            return None;
        }
        let factor = self.velocity_factor(distance, last_time, sample.timestamp_ms);
        let point = Self::to_point(sample, Some(factor));
        self.last = Some((point, sample.timestamp_ms));
        Some(point)
    }

    pub fn end(&mut self) {
        self.last = None;
    }

    /// Forget every tracked contact, e.g. after the page lost focus.
    pub fn reset(&mut self) {
        self.touches.clear();
        self.last = None;
    }

    /// `1 - weight * min(speed / max_speed, 1)`; 1 when timing is missing.
    fn velocity_factor(&self, distance: f64, from: Option<f64>, to: Option<f64>) -> f64 {
        let (Some(from), Some(to)) = (from, to) else {
            return 1.0;
        };
        let dt = to - from;
        if dt <= 0.0 {
            return 1.0;
        }
        let normalized = (distance / dt / self.max_velocity).min(1.0);
        1.0 - normalized * self.velocity_weight
    }

    fn to_point(sample: &PointerSample, velocity_factor: Option<f64>) -> InkPoint {
        InkPoint {
            x: sample.position.x,
            y: sample.position.y,
            pressure: sample.normalized_pressure(),
            tilt_x: sample.tilt_x,
            tilt_y: sample.tilt_y,
            velocity_factor,
        }
    }
}
