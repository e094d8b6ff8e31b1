//! Maps spectrum snapshots onto a fixed number of smoothed bands.

use std::f32::consts::PI;

/// Fraction of the distance to the target a band covers per frame.
pub const BAND_SMOOTHING: f32 = 0.2;
/// Exponent of the index curve; values above one give bass more bands.
const INDEX_CURVE: f32 = 1.5;
/// Share of the spectrum the bands are spread over.
const SPECTRUM_SPAN: f32 = 0.4;
/// How much the previous frame's beat pulse lifts band targets.
const PULSE_BOOST: f32 = 0.2;

/// Spectrum bin read by band `index` out of `band_count`.
pub fn band_bin(index: usize, band_count: usize, bin_count: usize) -> usize {
    if bin_count == 0 || band_count == 0 {
        return 0;
    }
    let position = (index as f32 / band_count as f32).powf(INDEX_CURVE);
    let bin = (position * bin_count as f32 * SPECTRUM_SPAN).floor();
    (bin.max(0.0) as usize).min(bin_count - 1)
}

/// Idle animation value for one band at `seconds` of elapsed time.
///
/// Pure in its arguments, so the same inputs always produce the same value.
pub fn idle_target(seconds: f32, index: usize, band_count: usize) -> f32 {
    if band_count == 0 {
        return 0.0;
    }
    let t = index as f32 / band_count as f32;
    let wave = (seconds * 2.0 + t * PI * 2.0).sin() * 0.3 + (seconds * 1.5 - t * PI).cos() * 0.2;
    wave.max(0.0) * 0.5
}

/// Produces and smooths the band set once per frame.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    bands: Vec<f32>,
    targets: Vec<f32>,
}

impl FrameSampler {
    pub fn new(band_count: usize) -> Self {
        Self {
            bands: vec![0.0; band_count],
            targets: vec![0.0; band_count],
        }
    }

    /// Current smoothed band values.
    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    /// Raw targets computed by the last [`FrameSampler::sample`].
    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Reseeds with zeros when the band count changed. Never resizes in place.
    pub fn ensure_band_count(&mut self, band_count: usize) {
        if self.bands.len() != band_count {
            tracing::debug!(from = self.bands.len(), to = band_count, "reallocating band set");
            self.bands = vec![0.0; band_count];
            self.targets = vec![0.0; band_count];
        }
    }

    /// Computes targets from `spectrum` (or the idle animation when it is
    /// `None`) and moves every band a fixed fraction toward its target.
    ///
    /// The step is per frame, not per second, so animation speed follows the
    /// refresh rate.
    pub fn sample(
        &mut self,
        spectrum: Option<&[f32]>,
        band_count: usize,
        seconds: f32,
        previous_pulse: f32,
    ) -> &[f32] {
        self.ensure_band_count(band_count);

        match spectrum {
            Some(frame) if !frame.is_empty() => {
                for (index, target) in self.targets.iter_mut().enumerate() {
                    *target = frame[band_bin(index, band_count, frame.len())];
                }
            }
            _ => {
                for (index, target) in self.targets.iter_mut().enumerate() {
                    *target = idle_target(seconds, index, band_count);
                }
            }
        }

        let boost = 1.0 + previous_pulse * PULSE_BOOST;
        for (value, target) in self.bands.iter_mut().zip(self.targets.iter()) {
            *value += (target * boost - *value) * BAND_SMOOTHING;
        }

        &self.bands
    }

    /// Mean of the smoothed bands; zero for an empty set.
    pub fn mean_energy(&self) -> f32 {
        if self.bands.is_empty() {
            return 0.0;
        }
        self.bands.iter().sum::<f32>() / self.bands.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_bins_follow_the_log_curve() {
        assert_eq!(band_bin(0, 64, 2048), 0);
        // (32/64)^1.5 * 2048 * 0.4 = 289.6
        assert_eq!(band_bin(32, 64, 2048), 289);
        assert_eq!(band_bin(63, 64, 2048), 800);
        assert_eq!(band_bin(5, 8, 1), 0);
    }

    #[test]
    fn idle_animation_is_deterministic() {
        for index in 0..16 {
            assert_eq!(idle_target(12.5, index, 16), idle_target(12.5, index, 16));
        }
        assert_ne!(idle_target(1.0, 0, 16), idle_target(2.0, 0, 16));
        assert!((0..64).all(|i| (0.0..=0.25).contains(&idle_target(3.3, i, 64))));
    }

    #[test]
    fn idle_value_matches_the_closed_form() {
        // t = 0, band 0: max(0, sin(0)*0.3 + cos(0)*0.2) * 0.5
        assert!((idle_target(0.0, 0, 64) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn bands_move_a_fifth_of_the_way_per_frame() {
        let mut sampler = FrameSampler::new(2);
        let spectrum = [1.0; 16];

        sampler.sample(Some(&spectrum), 2, 0.0, 0.0);
        assert!((sampler.bands()[0] - 0.2).abs() < 1e-6);

        sampler.sample(Some(&spectrum), 2, 0.0, 0.0);
        assert!((sampler.bands()[0] - 0.36).abs() < 1e-6);
    }

    #[test]
    fn previous_pulse_lifts_targets() {
        let mut sampler = FrameSampler::new(1);
        sampler.sample(Some(&[0.5]), 1, 0.0, 1.0);
        // 0.5 * 1.2 * 0.2
        assert!((sampler.bands()[0] - 0.12).abs() < 1e-6);
    }

    #[test]
    fn changing_band_count_reseeds_instead_of_resizing() {
        let mut sampler = FrameSampler::new(64);
        sampler.sample(Some(&[1.0; 128]), 64, 0.0, 0.0);
        assert!(sampler.bands().iter().all(|value| *value > 0.0));

        sampler.sample(None, 32, 0.0, 0.0);
        assert_eq!(sampler.bands().len(), 32);
        // Freshly seeded bands hold exactly one smoothing step of the target.
        for (index, value) in sampler.bands().iter().enumerate() {
            assert!((value - idle_target(0.0, index, 32) * BAND_SMOOTHING).abs() < 1e-6);
        }
    }

    #[test]
    fn mean_energy_of_empty_set_is_zero() {
        assert_eq!(FrameSampler::default().mean_energy(), 0.0);
    }
}
