//! Color parsing and multi-stop palette interpolation.
//!
//! Everything here is pure. Malformed color strings never fail a frame, they
//! resolve to [`FALLBACK_COLOR`] instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Color used when a palette is empty or a stop cannot be parsed.
pub const FALLBACK_COLOR: Rgba = Rgba::opaque(255, 255, 255);

/// Palette the engine uses when a style supplies no colors.
pub const DEFAULT_PALETTE: [&str; 4] = ["#7c3aed", "#ec4899", "#06b6d4", "#facc15"];

/// 8-bit RGB color with a floating point alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    /// Fully opaque color from 8-bit channels.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Returns the same color with its alpha replaced.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Parses any CSS color (`#rgb`, `#rrggbb`, `rgb()`, `rgba()`, `hsl()`,
    /// named colors). Bare `rgb`/`rrggbb` hex without the `#` is accepted too.
    ///
    /// Returns `None` for anything else; callers decide on the fallback.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let color = if is_bare_hex(value) {
            csscolorparser::parse(&format!("#{value}"))
        } else {
            csscolorparser::parse(value)
        }
        .ok()?;
        let [r, g, b, _] = color.to_rgba8();
        Some(Self {
            r,
            g,
            b,
            a: (color.a as f32).clamp(0.0, 1.0),
        })
    }

    /// Parses a color, substituting [`FALLBACK_COLOR`] when it is malformed.
    pub fn parse_or_fallback(value: &str) -> Self {
        Self::parse(value).unwrap_or(FALLBACK_COLOR)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

fn is_bare_hex(value: &str) -> bool {
    matches!(value.len(), 3 | 6) && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Linearly blends two colors, `t` clamped to `[0, 1]`.
///
/// If either stop is malformed the first parseable one wins, and if neither
/// parses the fallback color is returned.
pub fn mix(a: &str, b: &str, t: f32) -> Rgba {
    match (Rgba::parse(a), Rgba::parse(b)) {
        (Some(a), Some(b)) => mix_rgba(a, b, t),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => FALLBACK_COLOR,
    }
}

/// Channel-wise interpolation between two parsed colors.
pub fn mix_rgba(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let t = clamp_unit(t);
    let lerp = |x: u8, y: u8| -> u8 {
        let x = x as f32;
        let y = y as f32;
        (x + (y - x) * t).round().clamp(0.0, 255.0) as u8
    };
    Rgba {
        r: lerp(a.r, b.r),
        g: lerp(a.g, b.g),
        b: lerp(a.b, b.b),
        a: a.a + (b.a - a.a) * t,
    }
}

/// Looks up the color at position `t` along an ordered list of stops.
pub fn palette_color<S: AsRef<str>>(colors: &[S], t: f32) -> Rgba {
    match colors {
        [] => FALLBACK_COLOR,
        [only] => Rgba::parse_or_fallback(only.as_ref()),
        _ => {
            let last = colors.len() - 1;
            let scaled = clamp_unit(t) * last as f32;
            let index = (scaled.floor() as usize).min(last);
            let next = (index + 1).min(last);
            let local = scaled - index as f32;
            mix(colors[index].as_ref(), colors[next].as_ref(), local)
        }
    }
}

fn clamp_unit(t: f32) -> f32 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}
