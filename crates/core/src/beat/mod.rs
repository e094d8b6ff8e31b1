/// Mean band energy above which a beat can trigger.
pub const BEAT_THRESHOLD: f32 = 0.4;
/// Frames to wait after a trigger before the next one is allowed.
pub const BEAT_COOLDOWN_FRAMES: i32 = 20;
/// Per-frame decay factor applied to the pulse on non-trigger frames.
pub const PULSE_DECAY: f32 = 0.9;

/// Pulse and cooldown of the beat envelope.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeatState {
    pub pulse: f32,
    pub cooldown: i32,
}

/// Single-scalar beat detector driven by mean band energy.
#[derive(Debug, Clone, Default)]
pub struct BeatEnvelope {
    state: BeatState,
}

impl BeatEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: BeatState) -> Self {
        let pulse = if state.pulse.is_finite() {
            state.pulse.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            state: BeatState { pulse, ..state },
        }
    }

    pub fn state(&self) -> BeatState {
        self.state
    }

    pub fn pulse(&self) -> f32 {
        self.state.pulse
    }

    /// Advances one frame and returns the new pulse.
    ///
    /// A trigger frame sets the pulse to 1.0 without decaying it; decay starts
    /// on the following frame. The cooldown keeps counting down below zero.
    pub fn update(&mut self, mean_energy: f32) -> f32 {
        if mean_energy > BEAT_THRESHOLD && self.state.cooldown <= 0 {
            self.state.pulse = 1.0;
            self.state.cooldown = BEAT_COOLDOWN_FRAMES;
        } else {
            self.state.cooldown = self.state.cooldown.saturating_sub(1);
            self.state.pulse *= PULSE_DECAY;
        }
        self.state.pulse
    }

    pub fn reset(&mut self) {
        self.state = BeatState::default();
    }
}
