use serde::{Deserialize, Serialize};

use crate::palette::DEFAULT_PALETTE;

mod presets;

pub use presets::{builtin_preset, builtin_presets};

/// Engine-level settings that do not vary between visual styles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Analysis window in samples. The spectrum holds half as many bins.
    pub fft_size: usize,
    /// Lower bound of the analyser's decibel range.
    pub min_decibels: f32,
    /// Upper bound of the analyser's decibel range.
    pub max_decibels: f32,
    /// Capacity of the PCM ring shared between a media source and its analyser.
    pub tap_capacity: usize,
    /// Intensity used until the host supplies one (0–100).
    pub default_intensity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            min_decibels: -100.0,
            max_decibels: -30.0,
            tap_capacity: 4096 * 4,
            default_intensity: 70.0,
        }
    }
}

/// Three stop vertical background gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundGradient {
    pub top: String,
    pub middle: String,
    pub bottom: String,
}

impl Default for BackgroundGradient {
    fn default() -> Self {
        Self {
            top: "#050312".to_string(),
            middle: "#080d1f".to_string(),
            bottom: "#020109".to_string(),
        }
    }
}

/// Partial gradient as it appears in a preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientPreset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
}

/// Bar outline as named in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeName {
    #[default]
    Rounded,
    Sharp,
    Cylindrical,
}

/// How bars are drawn, after `barSegments` has been folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarShape {
    Sharp,
    Cylindrical,
    Rounded,
    /// Stacked blocks with a one pixel gap. Overrides the named shape.
    Segmented(u32),
}

/// Horizontal arrangement of the bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarLayout {
    /// Each band is drawn twice, growing outwards from the centre.
    Mirrored,
    /// All bands side by side, centred as one row.
    SingleRow,
}

/// Caller-supplied style. Every field is optional and missing ones fall back
/// to [`VisualStyle::default`] during [`VisualStyle::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_gradient: Option<GradientPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glow_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_segments: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_spacing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_time_constant: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle_density: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub particle_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_strength: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_intensity: Option<f32>,
}

impl StylePreset {
    /// Parses a preset from JSON text.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Fully resolved style consumed by the render pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualStyle {
    pub colors: Vec<String>,
    pub background_gradient: BackgroundGradient,
    /// Host UI accent carried with the preset. The engine does not paint it.
    pub accent_color: String,
    /// Host UI glow carried with the preset. Bar glow is tinted by each bar's
    /// own color instead.
    pub glow_color: String,
    pub bar_count: usize,
    pub bar_segments: u32,
    pub bar_spacing: f32,
    pub mirror: bool,
    pub shape: ShapeName,
    pub smoothing_time_constant: f32,
    pub particle_density: usize,
    pub particle_color: Option<String>,
    pub reflection_strength: f32,
}

impl Default for VisualStyle {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            background_gradient: BackgroundGradient::default(),
            accent_color: "#e0f2fe".to_string(),
            glow_color: "#fef9ff".to_string(),
            bar_count: 64,
            bar_segments: 0,
            bar_spacing: 2.0,
            mirror: true,
            shape: ShapeName::Rounded,
            smoothing_time_constant: 0.85,
            particle_density: 50,
            particle_color: None,
            reflection_strength: 0.0,
        }
    }
}

impl VisualStyle {
    /// Merges `preset` over the fallback style.
    ///
    /// Absent fields keep their defaults, an empty palette keeps the default
    /// palette and a zero bar count or density is treated as absent.
    pub fn resolve(preset: Option<&StylePreset>) -> Self {
        let base = Self::default();
        let Some(preset) = preset else {
            return base;
        };

        let gradient = preset.background_gradient.clone().unwrap_or_default();
        let smoothing = preset
            .smoothing_time_constant
            .filter(|value| value.is_finite() && *value > 0.0)
            .map(|value| value.min(1.0));

        Self {
            colors: preset
                .colors
                .clone()
                .filter(|colors| !colors.is_empty())
                .unwrap_or(base.colors),
            background_gradient: BackgroundGradient {
                top: gradient.top.unwrap_or(base.background_gradient.top),
                middle: gradient.middle.unwrap_or(base.background_gradient.middle),
                bottom: gradient.bottom.unwrap_or(base.background_gradient.bottom),
            },
            accent_color: preset.accent_color.clone().unwrap_or(base.accent_color),
            glow_color: preset.glow_color.clone().unwrap_or(base.glow_color),
            bar_count: preset
                .bar_count
                .filter(|count| *count > 0)
                .unwrap_or(base.bar_count),
            bar_segments: preset.bar_segments.unwrap_or(base.bar_segments),
            bar_spacing: preset
                .bar_spacing
                .filter(|spacing| spacing.is_finite())
                .unwrap_or(base.bar_spacing),
            mirror: preset.mirror.unwrap_or(base.mirror),
            shape: preset.shape.unwrap_or(base.shape),
            smoothing_time_constant: smoothing.unwrap_or(base.smoothing_time_constant),
            particle_density: preset
                .particle_density
                .filter(|density| *density > 0)
                .unwrap_or(base.particle_density),
            particle_color: preset.particle_color.clone().or(base.particle_color),
            reflection_strength: preset
                .reflection_strength
                .filter(|strength| strength.is_finite())
                .unwrap_or(base.reflection_strength),
        }
    }

    pub fn layout(&self) -> BarLayout {
        if self.mirror {
            BarLayout::Mirrored
        } else {
            BarLayout::SingleRow
        }
    }

    pub fn bar_shape(&self) -> BarShape {
        if self.bar_segments > 0 {
            return BarShape::Segmented(self.bar_segments);
        }
        match self.shape {
            ShapeName::Sharp => BarShape::Sharp,
            ShapeName::Cylindrical => BarShape::Cylindrical,
            ShapeName::Rounded => BarShape::Rounded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_preset_yields_defaults() {
        let style = VisualStyle::resolve(None);
        assert_eq!(style, VisualStyle::default());
        assert_eq!(style.bar_count, 64);
        assert_eq!(style.bar_shape(), BarShape::Rounded);
        assert_eq!(style.layout(), BarLayout::Mirrored);
    }

    #[test]
    fn empty_palette_falls_back_to_default_palette() {
        let preset = StylePreset {
            colors: Some(Vec::new()),
            ..Default::default()
        };
        let style = VisualStyle::resolve(Some(&preset));
        assert_eq!(style.colors, VisualStyle::default().colors);
        assert_eq!(style.colors.len(), 4);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let preset = StylePreset::from_json(
            r##"{
                "barCount": 32,
                "shape": "sharp",
                "mirror": false,
                "backgroundGradient": { "top": "#000000" },
                "particleColor": "rgba(255, 180, 120, 0.9)"
            }"##,
        )
        .unwrap();
        let style = VisualStyle::resolve(Some(&preset));

        assert_eq!(style.bar_count, 32);
        assert_eq!(style.bar_shape(), BarShape::Sharp);
        assert_eq!(style.layout(), BarLayout::SingleRow);
        assert_eq!(style.background_gradient.top, "#000000");
        assert_eq!(style.background_gradient.middle, "#080d1f");
        assert_eq!(style.smoothing_time_constant, 0.85);
        assert_eq!(style.particle_color.as_deref(), Some("rgba(255, 180, 120, 0.9)"));
    }

    #[test]
    fn segments_override_the_named_shape() {
        let preset = StylePreset {
            bar_segments: Some(6),
            shape: Some(ShapeName::Cylindrical),
            ..Default::default()
        };
        assert_eq!(
            VisualStyle::resolve(Some(&preset)).bar_shape(),
            BarShape::Segmented(6)
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(StylePreset::from_json("{ barCount: ").is_err());
    }
}
