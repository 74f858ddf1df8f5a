//! `InkSurface` over a 2D canvas context.

use kurbo::{Affine, BezPath, Cap, Join, PathEl, Stroke as LineStyle};
use marginalia_core::{InkColor, SurfaceLayout};
use marginalia_render::{InkSurface, RenderResult, RendererError};
use peniko::Color;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

fn css(color: Color) -> String {
    let c = InkColor::from(color);
    format!("rgba({}, {}, {}, {:.3})", c.r, c.g, c.b, c.a as f64 / 255.0)
}

fn cap_name(cap: Cap) -> &'static str {
    match cap {
        Cap::Butt => "butt",
        Cap::Square => "square",
        Cap::Round => "round",
    }
}

fn join_name(join: Join) -> &'static str {
    match join {
        Join::Bevel => "bevel",
        Join::Miter => "miter",
        Join::Round => "round",
    }
}

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> RenderResult<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| RendererError::InitFailed(format!("{:?}", e)))?
            .ok_or_else(|| RendererError::InitFailed("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RendererError::InitFailed("not a 2d context".to_string()))?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Resize the backing store; this wipes the canvas.
    pub fn resize(&self, layout: &SurfaceLayout) -> RenderResult<()> {
        self.canvas.set_width(layout.pixel_width);
        self.canvas.set_height(layout.pixel_height);
        self.set_css_size(layout)
    }

    /// Lay the canvas out at `layout`'s document size, leaving the pixels alone.
    pub fn set_css_size(&self, layout: &SurfaceLayout) -> RenderResult<()> {
        let style = self.canvas.style();
        style
            .set_property("width", &format!("{}px", layout.css_size.width))
            .and_then(|_| style.set_property("height", &format!("{}px", layout.css_size.height)))
            .map_err(|e| RendererError::Surface(format!("{:?}", e)))
    }

    /// While not inking the overlay lets pointer input through to the page.
    pub fn set_interactive(&self, on: bool) {
        let value = if on { "auto" } else { "none" };
        if let Err(err) = self.canvas.style().set_property("pointer-events", value) {
            log::warn!("pointer-events update failed: {:?}", err);
        }
    }

    /// Take the overlay out of layout so it does not count toward the
    /// document extent being measured. `set_css_size` puts it back.
    pub fn collapse(&self) {
        let style = self.canvas.style();
        if let Err(err) = style
            .set_property("width", "0px")
            .and_then(|_| style.set_property("height", "0px"))
        {
            log::warn!("collapsing surface failed: {:?}", err);
        }
    }

    fn set_transform(&self, transform: Affine) {
        let [a, b, c, d, e, f] = transform.as_coeffs();
        if let Err(err) = self.ctx.set_transform(a, b, c, d, e, f) {
            log::warn!("setTransform failed: {:?}", err);
        }
    }

    fn trace(&self, path: &BezPath) {
        self.ctx.begin_path();
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => self.ctx.move_to(p.x, p.y),
                PathEl::LineTo(p) => self.ctx.line_to(p.x, p.y),
                PathEl::QuadTo(c, p) => self.ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
                PathEl::CurveTo(c1, c2, p) => self.ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
                PathEl::ClosePath => self.ctx.close_path(),
            }
        }
    }
}

impl InkSurface for CanvasSurface {
    fn clear(&mut self) {
        self.set_transform(Affine::IDENTITY);
        self.ctx.clear_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
    }

    fn stroke(&mut self, style: &LineStyle, transform: Affine, color: Color, path: &BezPath) {
        self.set_transform(transform);
        self.trace(path);
        self.ctx.set_line_width(style.width);
        self.ctx.set_line_cap(cap_name(style.start_cap));
        self.ctx.set_line_join(join_name(style.join));
        let dashes: js_sys::Array = style.dash_pattern.iter().map(|d| JsValue::from_f64(*d)).collect();
        if let Err(err) = self.ctx.set_line_dash(&dashes) {
            log::warn!("setLineDash failed: {:?}", err);
        }
        self.ctx.set_stroke_style_str(&css(color));
        self.ctx.stroke();
    }

    fn fill(&mut self, transform: Affine, color: Color, path: &BezPath) {
        self.set_transform(transform);
        self.trace(path);
        self.ctx.set_fill_style_str(&css(color));
        self.ctx.fill();
    }
}
