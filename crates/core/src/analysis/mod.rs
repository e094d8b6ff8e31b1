use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{EngineConfig, PulseVizError, Result};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32_768;

/// Frequency analyser sitting between a media source and the spectrum reader.
///
/// Each pass windows the most recent block of samples, runs a forward FFT,
/// blends the magnitudes with the previous pass using the smoothing time
/// constant and maps the result from the configured decibel range onto
/// `[0, 1]`. Values are quantised to 1/255 steps, so a full-scale bin reads
/// exactly `1.0`.
pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    fft: FftResources,
}

impl Analyser {
    /// Creates an analyser using the engine's window size and decibel range.
    pub fn with_config(config: &EngineConfig, smoothing: f32) -> Result<Self> {
        Self::new(
            config.fft_size,
            smoothing,
            config.min_decibels,
            config.max_decibels,
        )
    }

    pub fn new(
        fft_size: usize,
        smoothing: f32,
        min_decibels: f32,
        max_decibels: f32,
    ) -> Result<Self> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(PulseVizError::InvalidInput(
                "analysis window must be a power of two between 32 and 32768",
            ));
        }
        if min_decibels >= max_decibels {
            return Err(PulseVizError::InvalidInput(
                "analyser decibel range must be increasing",
            ));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(fft_size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            fft_size,
            smoothing: clamp_smoothing(smoothing),
            min_decibels,
            max_decibels,
            window: (0..fft_size).map(|n| blackman_value(n, fft_size)).collect(),
            smoothed: vec![0.0; fft_size / 2],
            fft,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins written by [`Analyser::process`].
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = clamp_smoothing(smoothing);
    }

    /// Analyses the newest `fft_size` samples of `samples` and writes one
    /// normalised magnitude per bin into `out`.
    ///
    /// Shorter inputs are treated as if preceded by silence. `out` must hold
    /// exactly [`Analyser::frequency_bin_count`] values.
    pub fn process(&mut self, samples: &[f32], out: &mut [f32]) -> Result<()> {
        if out.len() != self.frequency_bin_count() {
            return Err(PulseVizError::InvalidInput(
                "spectrum buffer does not match the analyser bin count",
            ));
        }

        let size = self.fft_size;
        let recent = &samples[samples.len().saturating_sub(size)..];
        let pad = size - recent.len();
        self.fft.input[..pad].fill(0.0);
        for (index, sample) in recent.iter().enumerate() {
            let slot = pad + index;
            self.fft.input[slot] = sample * self.window[slot];
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let scale = 1.0 / size as f32;
        let range = self.max_decibels - self.min_decibels;
        let tau = self.smoothing;
        for ((value, bin), slot) in self
            .smoothed
            .iter_mut()
            .zip(self.fft.spectrum.iter())
            .zip(out.iter_mut())
        {
            let magnitude = bin.norm() * scale;
            *value = tau * *value + (1.0 - tau) * magnitude;
            if !value.is_finite() {
                *value = 0.0;
            }

            let decibels = if *value > 0.0 {
                20.0 * value.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = (255.0 / range) * (decibels - self.min_decibels);
            *slot = scaled.floor().clamp(0.0, 255.0) / 255.0;
        }

        Ok(())
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

fn clamp_smoothing(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;

    let phase = 2.0 * PI * index as f32 / len as f32;
    A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_at_bin(bin: usize, size: usize) -> Vec<f32> {
        (0..size)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / size as f32).sin())
            .collect()
    }

    fn analyser(smoothing: f32) -> Analyser {
        Analyser::new(1024, smoothing, -100.0, -30.0).unwrap()
    }

    #[test]
    fn rejects_bad_window_sizes() {
        assert!(Analyser::new(1000, 0.8, -100.0, -30.0).is_err());
        assert!(Analyser::new(16, 0.8, -100.0, -30.0).is_err());
        assert!(Analyser::new(1024, 0.8, -30.0, -100.0).is_err());
    }

    #[test]
    fn silence_reads_as_zero() {
        let mut analyser = analyser(0.0);
        let mut out = vec![1.0; analyser.frequency_bin_count()];
        analyser.process(&vec![0.0; 1024], &mut out).unwrap();
        assert!(out.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn full_scale_tone_peaks_at_its_bin() {
        let mut analyser = analyser(0.0);
        let mut out = vec![0.0; analyser.frequency_bin_count()];
        analyser.process(&sine_at_bin(64, 1024), &mut out).unwrap();

        assert_eq!(out[64], 1.0);
        assert!(out[300] < 0.05, "far bin leaked: {}", out[300]);
    }

    #[test]
    fn smoothing_carries_energy_into_silent_frames() {
        let tone = sine_at_bin(32, 1024);
        let silence = vec![0.0; 1024];

        let mut smoothed = analyser(0.85);
        let mut out = vec![0.0; smoothed.frequency_bin_count()];
        smoothed.process(&tone, &mut out).unwrap();
        smoothed.process(&silence, &mut out).unwrap();
        assert!(out[32] > 0.5);

        let mut raw = analyser(0.0);
        raw.process(&tone, &mut out).unwrap();
        raw.process(&silence, &mut out).unwrap();
        assert_eq!(out[32], 0.0);
    }

    #[test]
    fn short_input_is_padded_and_wrong_buffer_rejected() {
        let mut analyser = analyser(0.5);
        let mut out = vec![0.0; analyser.frequency_bin_count()];
        assert!(analyser.process(&[0.25; 10], &mut out).is_ok());

        let mut wrong = vec![0.0; 3];
        assert!(analyser.process(&[0.0; 1024], &mut wrong).is_err());
    }
}
