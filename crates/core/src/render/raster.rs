//! tiny-skia backed surface used for offscreen rendering.

use std::path::Path;

use tiny_skia as skia;

use crate::{palette::Rgba, PulseVizError, Result};

use super::{Paint, Surface};

/// Number of expanding layers used to fake a blurred glow.
const GLOW_LAYERS: u32 = 3;
/// Opacity of the outermost glow layer relative to the glow color.
const GLOW_OPACITY: f32 = 0.12;

/// CPU raster surface over a [`tiny_skia::Pixmap`].
pub struct RasterSurface {
    pixmap: skia::Pixmap,
    transform: skia::Transform,
    alpha: f32,
    shadow: Option<(f32, Rgba)>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            pixmap: new_pixmap(width, height)?,
            transform: skia::Transform::identity(),
            alpha: 1.0,
            shadow: None,
        })
    }

    pub fn pixmap(&self) -> &skia::Pixmap {
        &self.pixmap
    }

    /// Straight (non-premultiplied) color of one device pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let pixel = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba {
            r: pixel.red(),
            g: pixel.green(),
            b: pixel.blue(),
            a: pixel.alpha() as f32 / 255.0,
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|err| PulseVizError::Surface(err.to_string()))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixmap
            .save_png(path)
            .map_err(|err| PulseVizError::Surface(err.to_string()))
    }

    fn skia_paint(&self, paint: &Paint, extra_alpha: f32) -> Option<skia::Paint<'static>> {
        let alpha = (self.alpha * extra_alpha).clamp(0.0, 1.0);
        let mut out = skia::Paint {
            anti_alias: true,
            ..Default::default()
        };

        match paint {
            Paint::Solid(color) => out.set_color(to_skia_color(*color, alpha)),
            Paint::LinearGradient { start, end, stops } => {
                let stops: Vec<skia::GradientStop> = stops
                    .iter()
                    .map(|stop| {
                        skia::GradientStop::new(stop.offset, to_skia_color(stop.color, alpha))
                    })
                    .collect();
                out.shader = skia::LinearGradient::new(
                    skia::Point::from_xy(start.0, start.1),
                    skia::Point::from_xy(end.0, end.1),
                    stops,
                    skia::SpreadMode::Pad,
                    skia::Transform::identity(),
                )?;
            }
        }

        Some(out)
    }

    fn fill_path_with_glow(
        &mut self,
        path: &skia::Path,
        bounds: skia::Rect,
        radius: f32,
        paint: &Paint,
    ) {
        if let Some((blur, color)) = self.shadow {
            self.draw_glow(bounds, radius, blur, color);
        }
        if let Some(paint) = self.skia_paint(paint, 1.0) {
            self.pixmap
                .fill_path(path, &paint, skia::FillRule::Winding, self.transform, None);
        }
    }

    fn draw_glow(&mut self, bounds: skia::Rect, radius: f32, blur: f32, color: Rgba) {
        for layer in (1..=GLOW_LAYERS).rev() {
            let spread = blur * 0.5 * layer as f32 / GLOW_LAYERS as f32;
            let opacity = GLOW_OPACITY * color.a / layer as f32;
            let Some(rect) = skia::Rect::from_xywh(
                bounds.x() - spread,
                bounds.y() - spread,
                bounds.width() + spread * 2.0,
                bounds.height() + spread * 2.0,
            ) else {
                continue;
            };
            let Some(path) = rounded_rect_path(rect, radius + spread) else {
                continue;
            };
            if let Some(paint) = self.skia_paint(&Paint::Solid(color.with_alpha(1.0)), opacity) {
                self.pixmap
                    .fill_path(&path, &paint, skia::FillRule::Winding, self.transform, None);
            }
        }
    }
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("alpha", &self.alpha)
            .finish()
    }
}

impl Surface for RasterSurface {
    fn backing_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn resize_backing(&mut self, width: u32, height: u32) -> Result<()> {
        self.pixmap = new_pixmap(width, height)?;
        Ok(())
    }

    fn reset_transform(&mut self) {
        self.transform = skia::Transform::identity();
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform = self.transform.pre_scale(sx, sy);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_shadow(&mut self, blur: f32, color: Rgba) {
        self.shadow = (blur > 0.0 && color.a > 0.0).then_some((blur, color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, paint: &Paint) {
        let Some(rect) = skia::Rect::from_xywh(x, y, width, height) else {
            return;
        };
        let path = skia::PathBuilder::from_rect(rect);
        self.fill_path_with_glow(&path, rect, 0.0, paint);
    }

    fn fill_round_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        paint: &Paint,
    ) -> bool {
        let Some(rect) = skia::Rect::from_xywh(x, y, width, height) else {
            // Nothing to draw, but the primitive itself is supported.
            return true;
        };
        if let Some(path) = rounded_rect_path(rect, radius) {
            self.fill_path_with_glow(&path, rect, radius, paint);
        }
        true
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint) {
        let Some(path) = skia::PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };
        if let Some(paint) = self.skia_paint(paint, 1.0) {
            self.pixmap
                .fill_path(&path, &paint, skia::FillRule::Winding, self.transform, None);
        }
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<skia::Pixmap> {
    skia::Pixmap::new(width.max(1), height.max(1))
        .ok_or_else(|| PulseVizError::Surface(format!("cannot allocate {width}x{height} pixmap")))
}

fn to_skia_color(color: Rgba, alpha: f32) -> skia::Color {
    let a = (color.a * alpha).clamp(0.0, 1.0);
    skia::Color::from_rgba8(color.r, color.g, color.b, (a * 255.0).round() as u8)
}

fn rounded_rect_path(rect: skia::Rect, radius: f32) -> Option<skia::Path> {
    let radius = radius.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    if radius <= 0.0 {
        return Some(skia::PathBuilder::from_rect(rect));
    }

    let (x, y, w, h) = (rect.x(), rect.y(), rect.width(), rect.height());
    let mut pb = skia::PathBuilder::new();
    pb.move_to(x + radius, y);
    pb.line_to(x + w - radius, y);
    pb.quad_to(x + w, y, x + w, y + radius);
    pb.line_to(x + w, y + h - radius);
    pb.quad_to(x + w, y + h, x + w - radius, y + h);
    pb.line_to(x + radius, y + h);
    pb.quad_to(x, y + h, x, y + h - radius);
    pb.line_to(x, y + radius);
    pb.quad_to(x, y, x + radius, y);
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{GradientStop, Viewport};

    #[test]
    fn fills_rects_in_logical_units_after_scaling() {
        let mut surface = RasterSurface::new(1, 1).unwrap();
        let viewport = Viewport::new(10.0, 10.0, 2.0);
        assert!(viewport.apply(&mut surface).unwrap());
        assert_eq!(surface.backing_size(), (20, 20));

        surface.fill_rect(0.0, 0.0, 5.0, 5.0, &Paint::Solid(Rgba::opaque(255, 0, 0)));
        assert_eq!(surface.pixel(8, 8), Some(Rgba::opaque(255, 0, 0)));
        assert_eq!(surface.pixel(12, 12).map(|p| p.a), Some(0.0));
    }

    #[test]
    fn global_alpha_applies_to_fills() {
        let mut surface = RasterSurface::new(4, 4).unwrap();
        surface.set_alpha(0.5);
        surface.fill_rect(0.0, 0.0, 4.0, 4.0, &Paint::Solid(Rgba::opaque(0, 0, 255)));

        let pixel = surface.pixel(2, 2).unwrap();
        assert!((pixel.a - 0.5).abs() < 0.01);
        assert_eq!(pixel.b, 255);
    }

    #[test]
    fn vertical_gradient_blends_top_to_bottom() {
        let mut surface = RasterSurface::new(2, 100).unwrap();
        let paint = Paint::LinearGradient {
            start: (0.0, 0.0),
            end: (0.0, 100.0),
            stops: vec![
                GradientStop::new(0.0, Rgba::opaque(0, 0, 0)),
                GradientStop::new(1.0, Rgba::opaque(255, 255, 255)),
            ],
        };
        surface.fill_rect(0.0, 0.0, 2.0, 100.0, &paint);

        let top = surface.pixel(1, 1).unwrap();
        let bottom = surface.pixel(1, 98).unwrap();
        assert!(top.r < 20);
        assert!(bottom.r > 235);
    }

    #[test]
    fn supports_rounded_rects_and_circles() {
        let mut surface = RasterSurface::new(20, 20).unwrap();
        let white = Paint::Solid(Rgba::opaque(255, 255, 255));
        assert!(surface.fill_round_rect(2.0, 2.0, 16.0, 16.0, 4.0, &white));
        assert_eq!(surface.pixel(10, 10), Some(Rgba::opaque(255, 255, 255)));
        // The very corner stays clear of a radius-4 curve.
        assert!(surface.pixel(2, 2).map(|p| p.a).unwrap() < 0.1);

        let mut dots = RasterSurface::new(10, 10).unwrap();
        dots.fill_circle(5.0, 5.0, 2.0, &white);
        assert_eq!(dots.pixel(5, 5), Some(Rgba::opaque(255, 255, 255)));
        assert_eq!(dots.pixel(0, 0).map(|p| p.a), Some(0.0));
    }

    #[test]
    fn encodes_png() {
        let surface = RasterSurface::new(3, 3).unwrap();
        let bytes = surface.encode_png().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
