//! Ink data model: points, strokes and their styling.

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a stroke.
pub type StrokeId = Uuid;

/// Pressure used when the input device does not report any.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// A stroke needs at least this many points to be kept.
pub const MIN_STROKE_POINTS: usize = 2;

/// Which inking tool produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InkTool {
    #[default]
    Pen,
    Highlighter,
}

/// RGBA8 color, persisted as a CSS hex string (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InkColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl InkColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
                Some(Self::rgb(nib(0)?, nib(1)?, nib(2)?))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// CSS representation, as accepted by a 2D canvas context.
    pub fn to_css(self) -> String {
        self.to_string()
    }
}

impl Default for InkColor {
    fn default() -> Self {
        Self::black()
    }
}

impl fmt::Display for InkColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for InkColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<InkColor> for String {
    fn from(color: InkColor) -> Self {
        color.to_string()
    }
}

impl From<Color> for InkColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<InkColor> for Color {
    fn from(color: InkColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

fn default_pressure() -> f64 {
    DEFAULT_PRESSURE
}

/// A single captured ink point in document space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InkPoint {
    pub x: f64,
    pub y: f64,
    /// Normalised pressure in `0.0..=1.0`.
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    #[serde(default)]
    pub tilt_x: f64,
    #[serde(default)]
    pub tilt_y: f64,
    /// Width modulation from drawing speed. Only present on live points.
    #[serde(skip)]
    pub velocity_factor: Option<f64>,
}

impl InkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_pressure(x, y, DEFAULT_PRESSURE)
    }

    pub fn with_pressure(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            x,
            y,
            pressure,
            tilt_x: 0.0,
            tilt_y: 0.0,
            velocity_factor: None,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn distance_to(&self, point: Point) -> f64 {
        self.position().distance(point)
    }
}

/// One continuous ink gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(default = "Uuid::new_v4")]
    pub id: StrokeId,
    pub tool: InkTool,
    pub color: InkColor,
    /// Width multiplier from the size presets.
    #[serde(alias = "sizeMultiplier")]
    pub size: f64,
    pub points: Vec<InkPoint>,
}

impl Stroke {
    pub fn new(tool: InkTool, color: InkColor, size: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool,
            color,
            size,
            points: Vec::new(),
        }
    }

    pub fn with_points(mut self, points: Vec<InkPoint>) -> Self {
        self.points = points;
        self
    }

    pub fn push(&mut self, point: InkPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the stroke has enough points to be committed.
    pub fn is_committable(&self) -> bool {
        self.points.len() >= MIN_STROKE_POINTS
    }

    /// Mean pressure over all points, used for the uniform finished width.
    pub fn average_pressure(&self) -> f64 {
        if self.points.is_empty() {
            return DEFAULT_PRESSURE;
        }
        self.points.iter().map(|p| p.pressure).sum::<f64>() / self.points.len() as f64
    }

    /// Tight bounding box of the points.
    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(Rect::from_points(first.position(), first.position()), |r, p| {
            r.union_pt(p.position())
        })
    }

    /// True if any point lies within `radius` of `center`.
    pub fn touches_circle(&self, center: Point, radius: f64) -> bool {
        self.points.iter().any(|p| p.distance_to(center) < radius)
    }

    /// True if any point lies inside `rect` (edges included).
    pub fn touches_rect(&self, rect: Rect) -> bool {
        self.points.iter().any(|p| {
            p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
        })
    }

    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            p.x += delta.x;
            p.y += delta.y;
        }
    }

    /// Scale point offsets from `center` independently along each axis.
    pub fn scale_about(&mut self, center: Point, sx: f64, sy: f64) {
        for p in &mut self.points {
            p.x = center.x + (p.x - center.x) * sx;
            p.y = center.y + (p.y - center.y) * sy;
        }
    }
}

/// Union of the bounds of every stroke, or `None` for an empty set.
pub fn union_bounds<'a>(strokes: impl IntoIterator<Item = &'a Stroke>) -> Option<Rect> {
    strokes
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(Stroke::bounds)
        .reduce(|a, b| a.union(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(f64, f64)]) -> Stroke {
        Stroke::new(InkTool::Pen, InkColor::black(), 1.0)
            .with_points(points.iter().map(|&(x, y)| InkPoint::new(x, y)).collect())
    }

    #[test]
    fn test_color_parse_and_format() {
        assert_eq!(InkColor::parse("#e53935"), Some(InkColor::rgb(0xe5, 0x39, 0x35)));
        assert_eq!(InkColor::parse("#fff"), Some(InkColor::rgb(255, 255, 255)));
        assert_eq!(InkColor::parse("#11223380"), Some(InkColor::new(0x11, 0x22, 0x33, 0x80)));
        assert_eq!(InkColor::parse("red"), None);
        assert_eq!(InkColor::parse("#12345"), None);
        assert_eq!(InkColor::rgb(1, 2, 3).to_css(), "#010203");
        assert_eq!(InkColor::new(1, 2, 3, 4).to_css(), "#01020304");
    }

    #[test]
    fn test_bounds() {
        let s = stroke(&[(10.0, 20.0), (50.0, 5.0), (30.0, 40.0)]);
        assert_eq!(s.bounds(), Rect::new(10.0, 5.0, 50.0, 40.0));
        assert_eq!(stroke(&[]).bounds(), Rect::ZERO);
    }

    #[test]
    fn test_average_pressure() {
        let mut s = stroke(&[]);
        s.push(InkPoint::with_pressure(0.0, 0.0, 0.2));
        s.push(InkPoint::with_pressure(1.0, 0.0, 0.6));
        assert!((s.average_pressure() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_committable() {
        assert!(!stroke(&[(0.0, 0.0)]).is_committable());
        assert!(stroke(&[(0.0, 0.0), (1.0, 1.0)]).is_committable());
    }

    #[test]
    fn test_touches_rect_includes_partial_overlap() {
        let s = stroke(&[(0.0, 0.0), (100.0, 100.0)]);
        assert!(s.touches_rect(Rect::new(90.0, 90.0, 120.0, 120.0)));
        assert!(!s.touches_rect(Rect::new(40.0, 40.0, 60.0, 60.0)));
    }

    #[test]
    fn test_scale_about_center() {
        let mut s = stroke(&[(10.0, 10.0), (50.0, 50.0)]);
        s.scale_about(Point::new(30.0, 30.0), 2.0, 2.0);
        assert_eq!(s.points[0].position(), Point::new(-10.0, -10.0));
        assert_eq!(s.points[1].position(), Point::new(70.0, 70.0));
    }

    #[test]
    fn test_velocity_factor_not_persisted() {
        let mut p = InkPoint::new(1.0, 2.0);
        p.velocity_factor = Some(0.5);
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("velocity"));
        let back: InkPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.velocity_factor, None);
    }

    #[test]
    fn test_stroke_without_id_gets_one() {
        let json = r##"{"tool":"highlighter","color":"#ffeb3b","sizeMultiplier":1.5,"points":[{"x":1,"y":2}]}"##;
        let s: Stroke = serde_json::from_str(json).unwrap();
        assert_eq!(s.tool, InkTool::Highlighter);
        assert_eq!(s.size, 1.5);
        assert_eq!(s.points[0].pressure, DEFAULT_PRESSURE);
        assert!(!s.id.is_nil());
    }
}
