//! The visualizer object: per-instance animation state, lifecycle and the
//! frame step.

use crate::{
    paint_frame, AnimationLoop, AudioGraphRegistry, BeatEnvelope, BeatState, EngineConfig,
    FrameSampler, FrameScene, MediaHandle, Particle, ParticleSystem, Result, SpectrumSource,
    StylePreset, Surface, Viewport, VisualStyle,
};

/// Asynchronous notifications delivered between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualizerEvent {
    Play,
    Pause,
    PointerDown,
    KeyDown,
    TouchStart,
    /// The container changed size or moved to a display with another ratio.
    Resize(Viewport),
}

/// Container that can be toggled into fullscreen.
pub trait FullscreenHost {
    fn is_fullscreen(&self) -> bool;

    fn request_fullscreen(&mut self) -> Result<()>;

    fn exit_fullscreen(&mut self) -> Result<()>;
}

/// Lifecycle of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Turns a live (or idle) signal into frames drawn on `S`.
///
/// All mutation of bands, beat state and particles happens inside
/// [`Visualizer::tick`]. Events only flip flags or attempt an idempotent
/// resume.
#[derive(Debug)]
pub struct Visualizer<S: Surface> {
    surface: S,
    style: VisualStyle,
    intensity: f32,
    viewport: Viewport,
    observe_resize: bool,
    resize_pending: bool,
    spectrum: SpectrumSource,
    sampler: FrameSampler,
    beat: BeatEnvelope,
    particles: ParticleSystem,
    animation: AnimationLoop,
    state: LoopState,
    playing: bool,
    gesture_listening: bool,
    frames_rendered: u64,
}

impl<S: Surface> Visualizer<S> {
    /// Creates an idle visualizer drawing onto `surface`. Nothing is drawn
    /// until [`Visualizer::start`].
    pub fn new(surface: S, viewport: Viewport, style: VisualStyle) -> Self {
        let sampler = FrameSampler::new(style.bar_count);
        Self {
            surface,
            style,
            intensity: EngineConfig::default().default_intensity,
            viewport,
            observe_resize: true,
            resize_pending: true,
            spectrum: SpectrumSource::unavailable(),
            sampler,
            beat: BeatEnvelope::new(),
            particles: ParticleSystem::new(),
            animation: AnimationLoop::new(),
            state: LoopState::Idle,
            playing: false,
            gesture_listening: false,
            frames_rendered: 0,
        }
    }

    /// Uses a seeded generator for particles so frames are reproducible.
    pub fn with_particle_seed(mut self, seed: u64) -> Self {
        self.particles = ParticleSystem::with_seed(seed);
        self
    }

    /// Declares whether the host can deliver resize notifications. Without
    /// them the surface is sized once on [`Visualizer::start`] and never again.
    pub fn with_resize_observation(mut self, supported: bool) -> Self {
        self.observe_resize = supported;
        self
    }

    /// Connects the visualizer to `media` through the shared registry.
    ///
    /// Returns `false` when capture is unavailable; the visualizer then keeps
    /// animating with the idle fallback.
    pub fn attach_media(
        &mut self,
        registry: &mut AudioGraphRegistry,
        media: &dyn MediaHandle,
    ) -> bool {
        let smoothing = self.style.smoothing_time_constant;
        match registry.get_or_create(media, smoothing) {
            Ok(graph) => {
                if let Err(err) = graph.set_smoothing(smoothing) {
                    tracing::warn!(%err, "could not update analyser smoothing");
                }
                tracing::debug!(media = %graph.media_id(), "visualizer attached to audio graph");
                self.spectrum = SpectrumSource::new(graph);
                self.gesture_listening = self.state != LoopState::Stopped;
                true
            }
            Err(err) => {
                tracing::warn!(
                    media = %media.media_id(),
                    %err,
                    "audio capture unavailable, using idle animation"
                );
                self.spectrum = SpectrumSource::unavailable();
                self.gesture_listening = false;
                false
            }
        }
    }

    /// Drops the audio graph reference. The registry keeps the graph.
    pub fn detach_media(&mut self) {
        self.spectrum = SpectrumSource::unavailable();
        self.gesture_listening = false;
    }

    /// Starts the frame loop. Calling it while running does nothing.
    pub fn start(&mut self) {
        if self.state == LoopState::Running {
            return;
        }
        self.apply_resize();
        self.animation.request();
        if self.spectrum.is_available() {
            self.gesture_listening = true;
        }
        self.state = LoopState::Running;
        tracing::debug!(bars = self.style.bar_count, "visualizer started");
    }

    /// Stops the frame loop and drops input listeners. Idempotent.
    pub fn stop(&mut self) {
        let cancelled = self.animation.cancel_all();
        self.gesture_listening = false;
        if self.state == LoopState::Running || cancelled {
            tracing::debug!(frames = self.frames_rendered, "visualizer stopped");
        }
        self.state = LoopState::Stopped;
    }

    /// Runs the pending frame, if any, at `seconds` since the clock epoch.
    /// Returns whether a frame was drawn.
    pub fn tick(&mut self, seconds: f32) -> bool {
        if self.animation.take_due().is_none() {
            return false;
        }
        self.render_frame(seconds);
        self.animation.request();
        true
    }

    /// Reacts to an event delivered between frames.
    ///
    /// Play and the first successful gesture retry resuming capture. Resize
    /// events are deferred to the next frame.
    pub fn handle_event(&mut self, event: VisualizerEvent) {
        match event {
            VisualizerEvent::Play => {
                self.playing = true;
                self.resume_capture();
            }
            VisualizerEvent::Pause => self.playing = false,
            VisualizerEvent::PointerDown
            | VisualizerEvent::KeyDown
            | VisualizerEvent::TouchStart => {
                if self.gesture_listening && self.resume_capture() {
                    tracing::debug!("capture resumed by user gesture, dropping input listeners");
                    self.gesture_listening = false;
                }
            }
            VisualizerEvent::Resize(viewport) => {
                if self.observe_resize {
                    self.viewport = viewport;
                    self.resize_pending = true;
                }
            }
        }
    }

    /// Requests fullscreen, or leaves it when already fullscreen. Failures are
    /// logged and otherwise ignored.
    pub fn toggle_fullscreen(&self, host: &mut dyn FullscreenHost) {
        let result = if host.is_fullscreen() {
            host.exit_fullscreen()
        } else {
            host.request_fullscreen()
        };
        if let Err(err) = result {
            tracing::error!(%err, "error toggling fullscreen mode");
        }
    }

    /// Replaces the style. A new bar count takes effect on the next frame.
    pub fn set_style(&mut self, style: VisualStyle) {
        if let Some(graph) = self.spectrum.graph() {
            if let Err(err) = graph.set_smoothing(style.smoothing_time_constant) {
                tracing::warn!(%err, "could not update analyser smoothing");
            }
        }
        self.style = style;
    }

    /// Resolves `preset` against the defaults and applies it.
    pub fn set_preset(&mut self, preset: Option<&StylePreset>) {
        self.set_style(VisualStyle::resolve(preset));
    }

    /// Sets the host intensity, clamped to 0–100.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = if intensity.is_finite() {
            intensity.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Returns the resolved style in use.
    pub fn style(&self) -> &VisualStyle {
        &self.style
    }

    /// Returns the host intensity, 0–100.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Smoothed band values after the last frame.
    pub fn bands(&self) -> &[f32] {
        self.sampler.bands()
    }

    /// Pulse and cooldown after the last frame.
    pub fn beat_state(&self) -> BeatState {
        self.beat.state()
    }

    /// Live particles.
    pub fn particles(&self) -> &[Particle] {
        self.particles.particles()
    }

    /// Returns the lifecycle state of the frame loop.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Returns `true` between [`Visualizer::start`] and [`Visualizer::stop`].
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Whether the media last reported play rather than pause.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True while no audio graph feeds the visualizer.
    pub fn is_idle_fallback(&self) -> bool {
        !self.spectrum.is_available()
    }

    /// Whether pointer, key and touch input still trigger a resume attempt.
    pub fn is_listening_for_gestures(&self) -> bool {
        self.gesture_listening
    }

    /// Number of frames drawn since construction.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Latest viewport, applied on the next frame if it changed.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Returns the drawing surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Returns the drawing surface mutably.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Consumes the visualizer and hands back its surface.
    pub fn into_surface(self) -> S {
        self.surface
    }

    fn resume_capture(&self) -> bool {
        let Some(graph) = self.spectrum.graph() else {
            return false;
        };
        match graph.resume() {
            Ok(running) => running,
            Err(err) => {
                tracing::debug!(%err, "capture resume failed");
                false
            }
        }
    }

    fn apply_resize(&mut self) {
        if !self.resize_pending {
            return;
        }
        self.resize_pending = false;
        match self.viewport.apply(&mut self.surface) {
            Ok(true) => {
                let (width, height) = self.surface.backing_size();
                let dpr = self.viewport.device_pixel_ratio;
                tracing::debug!(width, height, dpr, "resized surface");
            }
            Ok(false) => {}
            Err(err) => tracing::warn!(%err, "surface resize failed"),
        }
    }

    fn render_frame(&mut self, seconds: f32) {
        self.apply_resize();

        let dpr = self.viewport.device_pixel_ratio;
        let (backing_width, backing_height) = self.surface.backing_size();
        let width = backing_width as f32 / dpr;
        let height = backing_height as f32 / dpr;

        let previous_pulse = self.beat.pulse();
        let spectrum = self.spectrum.snapshot(self.playing);
        self.sampler
            .sample(spectrum, self.style.bar_count, seconds, previous_pulse);
        let pulse = self.beat.update(self.sampler.mean_energy());
        self.particles.update(&self.style, width, height, pulse);

        let scene = FrameScene {
            width,
            height,
            bands: self.sampler.bands(),
            particles: self.particles.particles(),
            pulse,
            intensity: self.intensity,
        };
        paint_frame(&mut self.surface, &self.style, &scene);
        self.frames_rendered += 1;
    }
}
