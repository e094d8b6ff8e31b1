//! Drawing surface abstraction and the painters that turn one frame of
//! engine state into draw calls.

use crate::{
    palette::{palette_color, Rgba},
    BarLayout, BarShape, Particle, Result, ShapeName, VisualStyle,
};

mod raster;
mod recording;

pub use raster::RasterSurface;
pub use recording::{DrawOp, RecordingSurface};

/// Corner radius of rounded bars.
pub const BAR_RADIUS: f32 = 4.0;
/// Gap between a bar and its reflection.
pub const REFLECTION_GAP: f32 = 4.0;
/// Share of the frame width taken by one band's bar.
const BAR_FILL: f32 = 0.8;
/// Share of the frame height a full-scale band reaches.
const BAR_HEIGHT_SCALE: f32 = 0.4;
/// Lowest intensity factor, so bars never vanish at zero intensity.
const MIN_INTENSITY_FACTOR: f32 = 0.08;
const GLOW_BASE: f32 = 15.0;
const GLOW_PULSE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// Fill used by the surface primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    LinearGradient {
        start: (f32, f32),
        end: (f32, f32),
        stops: Vec<GradientStop>,
    },
}

/// Resizable 2D raster target.
///
/// Coordinates passed to the fill methods are in logical pixels; the surface
/// applies whatever scale was set with [`Surface::scale`].
pub trait Surface {
    /// Size of the backing store in device pixels.
    fn backing_size(&self) -> (u32, u32);

    /// Reallocates the backing store. Previous contents are discarded.
    fn resize_backing(&mut self, width: u32, height: u32) -> Result<()>;

    fn reset_transform(&mut self);

    fn scale(&mut self, sx: f32, sy: f32);

    /// Global alpha multiplied into every following fill.
    fn set_alpha(&mut self, alpha: f32);

    /// Soft glow drawn behind following fills; a zero blur turns it off.
    fn set_shadow(&mut self, blur: f32, color: Rgba);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, paint: &Paint);

    /// Fills a rounded rectangle. Surfaces without the primitive return
    /// `false` and draw nothing.
    fn fill_round_rect(
        &mut self,
        _x: f32,
        _y: f32,
        _width: f32,
        _height: f32,
        _radius: f32,
        _paint: &Paint,
    ) -> bool {
        false
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint);
}

/// Logical size and device pixel ratio the surface should match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            device_pixel_ratio: dpr,
        }
    }

    /// Backing store size in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.width * self.device_pixel_ratio).round() as u32,
            (self.height * self.device_pixel_ratio).round() as u32,
        )
    }

    /// Brings `surface` in line with this viewport.
    ///
    /// The backing store is only reallocated when its size disagrees, but the
    /// transform is always reset and scaled to the ratio. Returns whether the
    /// backing store was reallocated.
    pub fn apply<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<bool> {
        let (width, height) = self.backing_size();
        let reallocate = surface.backing_size() != (width, height);
        if reallocate {
            surface.resize_backing(width, height)?;
        }
        surface.reset_transform();
        surface.scale(self.device_pixel_ratio, self.device_pixel_ratio);
        Ok(reallocate)
    }
}

/// Everything the painters need for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameScene<'a> {
    pub width: f32,
    pub height: f32,
    pub bands: &'a [f32],
    pub particles: &'a [Particle],
    pub pulse: f32,
    /// Host intensity, 0–100.
    pub intensity: f32,
}

/// Paints background, particles and bars, in that order.
pub fn paint_frame<S: Surface + ?Sized>(
    surface: &mut S,
    style: &VisualStyle,
    scene: &FrameScene<'_>,
) {
    paint_background(surface, style, scene.width, scene.height);
    paint_particles(surface, scene.particles);
    paint_bars(surface, style, scene);
}

pub fn paint_background<S: Surface + ?Sized>(
    surface: &mut S,
    style: &VisualStyle,
    width: f32,
    height: f32,
) {
    let gradient = &style.background_gradient;
    let paint = Paint::LinearGradient {
        start: (0.0, 0.0),
        end: (0.0, height),
        stops: vec![
            GradientStop::new(0.0, Rgba::parse_or_fallback(&gradient.top)),
            GradientStop::new(0.5, Rgba::parse_or_fallback(&gradient.middle)),
            GradientStop::new(1.0, Rgba::parse_or_fallback(&gradient.bottom)),
        ],
    };
    surface.fill_rect(0.0, 0.0, width, height, &paint);
}

pub fn paint_particles<S: Surface + ?Sized>(surface: &mut S, particles: &[Particle]) {
    if particles.is_empty() {
        return;
    }
    for particle in particles {
        surface.set_alpha(particle.life);
        surface.fill_circle(
            particle.x,
            particle.y,
            crate::particles::PARTICLE_RADIUS,
            &Paint::Solid(particle.color),
        );
    }
    surface.set_alpha(1.0);
}

/// Axis-aligned bar in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BarRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

pub fn paint_bars<S: Surface + ?Sized>(
    surface: &mut S,
    style: &VisualStyle,
    scene: &FrameScene<'_>,
) {
    let count = scene.bands.len();
    if count == 0 {
        return;
    }

    let bar_width = scene.width / count as f32 * BAR_FILL;
    let max_height = scene.height * BAR_HEIGHT_SCALE;
    let intensity_factor = (scene.intensity / 100.0).max(MIN_INTENSITY_FACTOR);
    let step = bar_width + style.bar_spacing;
    let center_x = scene.width / 2.0;
    let center_y = scene.height / 2.0;
    let layout = style.layout();
    let shape = style.bar_shape();
    let glow = GLOW_BASE + scene.pulse * GLOW_PULSE;

    for (index, band) in scene.bands.iter().enumerate() {
        let color = palette_color(&style.colors, index as f32 / count as f32);
        let height = band * max_height * (0.5 + intensity_factor);
        let y = center_y - height / 2.0;
        let (slots, used) = bar_slots(layout, index, count, center_x, bar_width, step);

        surface.set_shadow(glow, color);
        for &x in &slots[..used] {
            let bar = BarRect {
                x,
                y,
                width: bar_width,
                height,
            };
            draw_bar(surface, shape, bar, color);
        }

        if style.reflection_strength > 0.0 {
            surface.set_alpha(0.2 * style.reflection_strength);
            for &x in &slots[..used] {
                let reflection = BarRect {
                    x,
                    y: y + height + REFLECTION_GAP,
                    width: bar_width,
                    height: height * 0.5,
                };
                draw_reflection(surface, style.shape, reflection, color);
            }
            surface.set_alpha(1.0);
        }
    }

    surface.set_shadow(0.0, Rgba::opaque(0, 0, 0).with_alpha(0.0));
}

/// Left edges of the bar(s) drawn for one band.
fn bar_slots(
    layout: BarLayout,
    index: usize,
    count: usize,
    center_x: f32,
    bar_width: f32,
    step: f32,
) -> ([f32; 2], usize) {
    let offset = index as f32 * step;
    match layout {
        BarLayout::Mirrored => ([center_x - offset - bar_width, center_x + offset], 2),
        BarLayout::SingleRow => {
            let start = center_x - count as f32 * step / 2.0;
            ([start + offset, 0.0], 1)
        }
    }
}

fn draw_bar<S: Surface + ?Sized>(surface: &mut S, shape: BarShape, bar: BarRect, color: Rgba) {
    let solid = Paint::Solid(color);
    match shape {
        BarShape::Sharp => surface.fill_rect(bar.x, bar.y, bar.width, bar.height, &solid),
        BarShape::Cylindrical => {
            let highlight = Paint::LinearGradient {
                start: (bar.x, bar.y),
                end: (bar.x + bar.width, bar.y),
                stops: vec![
                    GradientStop::new(0.0, color),
                    GradientStop::new(0.5, Rgba::opaque(255, 255, 255)),
                    GradientStop::new(1.0, color),
                ],
            };
            surface.fill_rect(bar.x, bar.y, bar.width, bar.height, &highlight);
        }
        BarShape::Rounded => fill_rounded_or_rect(surface, bar, &solid),
        BarShape::Segmented(segments) => {
            let segment_height = bar.height / segments as f32;
            // Every segment would be swallowed by its gap.
            if segment_height <= 1.0 {
                return;
            }
            for segment in 0..segments {
                let height = segment_height - 1.0;
                if height > 0.0 {
                    let y = bar.y + segment as f32 * segment_height;
                    surface.fill_rect(bar.x, y, bar.width, height, &solid);
                }
            }
        }
    }
}

fn draw_reflection<S: Surface + ?Sized>(
    surface: &mut S,
    shape: ShapeName,
    bar: BarRect,
    color: Rgba,
) {
    let solid = Paint::Solid(color);
    match shape {
        ShapeName::Sharp => surface.fill_rect(bar.x, bar.y, bar.width, bar.height, &solid),
        ShapeName::Rounded | ShapeName::Cylindrical => fill_rounded_or_rect(surface, bar, &solid),
    }
}

fn fill_rounded_or_rect<S: Surface + ?Sized>(surface: &mut S, bar: BarRect, paint: &Paint) {
    if !surface.fill_round_rect(bar.x, bar.y, bar.width, bar.height, BAR_RADIUS, paint) {
        surface.fill_rect(bar.x, bar.y, bar.width, bar.height, paint);
    }
}
