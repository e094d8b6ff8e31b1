//! Core library for the pulse visualiser.
//!
//! Each module owns one stage of the pipeline: audio graphs are captured once
//! per media element, spectrum snapshots are folded into smoothed bands, the
//! band energy drives a beat envelope and a particle system, and the painters
//! draw a frame onto any [`Surface`] implementation.

pub mod analysis;
pub mod audio;
pub mod beat;
pub mod config;
pub mod error;
pub mod palette;
pub mod particles;
pub mod render;
pub mod sampler;
pub mod spectrum;
pub mod timeline;
pub mod visualizer;

pub use analysis::Analyser;
pub use audio::{
    AudioGraphHandle, AudioGraphRegistry, CaptureBackend, CaptureContext, ContextState,
    MediaHandle, MediaId, MediaStream, SampleTap, SoftwareBackend, UnsupportedBackend,
};
pub use beat::{BeatEnvelope, BeatState};
pub use config::{
    builtin_preset, builtin_presets, BackgroundGradient, BarLayout, BarShape, EngineConfig,
    GradientPreset, ShapeName, StylePreset, VisualStyle,
};
pub use error::{PulseVizError, Result};
pub use palette::Rgba;
pub use particles::{Particle, ParticleSystem};
pub use render::{
    paint_frame, DrawOp, FrameScene, GradientStop, Paint, RasterSurface, RecordingSurface,
    Surface, Viewport,
};
pub use sampler::FrameSampler;
pub use spectrum::SpectrumSource;
pub use timeline::{AnimationLoop, FrameClock, FrameRequest};
pub use visualizer::{FullscreenHost, LoopState, Visualizer, VisualizerEvent};
