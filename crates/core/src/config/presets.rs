//! Mix presets shipped with the player.

use super::{GradientPreset, StylePreset};

fn gradient(top: &str, middle: &str, bottom: &str) -> Option<GradientPreset> {
    Some(GradientPreset {
        top: Some(top.to_string()),
        middle: Some(middle.to_string()),
        bottom: Some(bottom.to_string()),
    })
}

fn colors(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|c| c.to_string()).collect())
}

/// All built-in presets, in display order.
pub fn builtin_presets() -> Vec<StylePreset> {
    vec![
        StylePreset {
            id: Some("chillwave".to_string()),
            title: Some("Chillwave".to_string()),
            colors: colors(&["#a855f7", "#ec4899", "#22d3ee"]),
            background_gradient: gradient("#04050b", "#091433", "#05030a"),
            accent_color: Some("#f0abfc".to_string()),
            glow_color: Some("#f0abfc".to_string()),
            bar_count: Some(46),
            particle_density: Some(55),
            particle_color: Some("rgba(244, 244, 255, 0.85)".to_string()),
            reflection_strength: Some(0.7),
            default_intensity: Some(62.0),
            ..Default::default()
        },
        StylePreset {
            id: Some("pulse-drive".to_string()),
            title: Some("Pulse Drive".to_string()),
            colors: colors(&["#f97316", "#fb7185", "#fcd34d"]),
            background_gradient: gradient("#070200", "#1c0c05", "#030102"),
            accent_color: Some("#ffd166".to_string()),
            glow_color: Some("#ffb347".to_string()),
            bar_count: Some(54),
            particle_density: Some(70),
            particle_color: Some("rgba(255, 180, 120, 0.9)".to_string()),
            reflection_strength: Some(0.82),
            default_intensity: Some(82.0),
            ..Default::default()
        },
        StylePreset {
            id: Some("lunar-echoes".to_string()),
            title: Some("Lunar Echoes".to_string()),
            colors: colors(&["#38bdf8", "#22d3ee", "#a5f3fc"]),
            background_gradient: gradient("#010812", "#021427", "#000307"),
            accent_color: Some("#8be9fd".to_string()),
            glow_color: Some("#8dd7ff".to_string()),
            bar_count: Some(40),
            particle_density: Some(40),
            particle_color: Some("rgba(148, 197, 255, 0.85)".to_string()),
            reflection_strength: Some(0.58),
            default_intensity: Some(48.0),
            ..Default::default()
        },
    ]
}

/// Looks up a built-in preset by id.
pub fn builtin_preset(id: &str) -> Option<StylePreset> {
    builtin_presets()
        .into_iter()
        .find(|preset| preset.id.as_deref() == Some(id))
}
