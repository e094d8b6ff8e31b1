use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pulse_visualiser_core::{
    builtin_preset, builtin_presets, AudioGraphRegistry, EngineConfig, FrameClock, MediaStream,
    PulseVizError, RasterSurface, SoftwareBackend, StylePreset, Viewport, VisualStyle, Visualizer,
    VisualizerEvent,
};
use tracing_subscriber::EnvFilter;

const FRAME_RATE: f32 = 60.0;
const SAMPLE_RATE: f32 = 44_100.0;
const KICK_INTERVAL: f32 = 0.5;

fn main() -> pulse_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => run_render(&args),
        Commands::Presets => run_presets(),
    }
}

fn run_render(args: &RenderArgs) -> pulse_visualiser_core::Result<()> {
    let engine = EngineConfig::default();
    let preset = load_preset(&args.preset)?;
    let style = VisualStyle::resolve(Some(&preset));
    let intensity = args
        .intensity
        .or(preset.default_intensity)
        .unwrap_or(engine.default_intensity);
    tracing::info!(preset = %args.preset, frames = args.frames, intensity, "rendering frames");

    std::fs::create_dir_all(&args.out)?;

    let viewport = Viewport::new(args.width, args.height, args.dpr);
    let (backing_width, backing_height) = viewport.backing_size();
    let surface = RasterSurface::new(backing_width, backing_height)?;
    let mut visualizer = Visualizer::new(surface, viewport, style);
    if let Some(seed) = args.seed {
        visualizer = visualizer.with_particle_seed(seed);
    }
    visualizer.set_intensity(intensity);

    let media = MediaStream::with_config("demo", &engine);
    let mut registry = AudioGraphRegistry::with_config(Arc::new(SoftwareBackend::new()), engine);
    let mut signal = DemoSignal::new(args.seed.unwrap_or(7));
    if !args.idle {
        visualizer.attach_media(&mut registry, &media);
        visualizer.handle_event(VisualizerEvent::Play);
    }

    let mut clock = FrameClock::simulated();
    visualizer.start();
    for frame in 0..args.frames {
        if !args.idle {
            media.push_samples(&signal.next_block((SAMPLE_RATE / FRAME_RATE) as usize))?;
        }
        visualizer.tick(clock.seconds());
        let path = args.out.join(format!("frame_{frame:05}.png"));
        visualizer.surface().save_png(&path)?;
        clock.advance(1.0 / FRAME_RATE);
    }
    visualizer.stop();

    tracing::info!(
        frames = visualizer.frames_rendered(),
        out = %args.out.display(),
        "finished rendering"
    );
    Ok(())
}

fn run_presets() -> pulse_visualiser_core::Result<()> {
    let presets = builtin_presets();
    println!("{}", serde_json::to_string_pretty(&presets)?);
    Ok(())
}

/// Resolves a built-in preset id, or reads a preset JSON file.
fn load_preset(name: &str) -> pulse_visualiser_core::Result<StylePreset> {
    if let Some(preset) = builtin_preset(name) {
        return Ok(preset);
    }
    let path = Path::new(name);
    if !path.is_file() {
        return Err(PulseVizError::Message(format!("unknown preset `{name}`")));
    }
    let text = std::fs::read_to_string(path)?;
    StylePreset::from_json(&text)
}

/// Kick drum on every half second over a soft tone and a little noise.
struct DemoSignal {
    rng: fastrand::Rng,
    position: u64,
}

impl DemoSignal {
    fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            position: 0,
        }
    }

    fn next_block(&mut self, len: usize) -> Vec<f32> {
        let mut block = Vec::with_capacity(len);
        for _ in 0..len {
            let t = self.position as f32 / SAMPLE_RATE;
            let since_kick = t % KICK_INTERVAL;
            let envelope = (-since_kick * 18.0).exp();
            let kick = (2.0 * std::f32::consts::PI * 60.0 * since_kick).sin() * envelope;
            let burst = (self.rng.f32() * 2.0 - 1.0) * envelope * 0.8;
            let tone = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.2;
            let hiss = (self.rng.f32() * 2.0 - 1.0) * 0.02;
            block.push((kick + burst + tone + hiss).clamp(-1.0, 1.0));
            self.position += 1;
        }
        block
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive spectrum visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render frames offscreen and write them as PNG files.
    Render(RenderArgs),
    /// Print the built-in presets as JSON.
    Presets,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Built-in preset id or path to a preset JSON file.
    #[arg(short, long, default_value = "chillwave")]
    preset: String,
    /// Number of frames to render.
    #[arg(short, long, default_value_t = 120)]
    frames: u32,
    /// Logical width in CSS pixels.
    #[arg(long, default_value_t = 640.0)]
    width: f32,
    /// Logical height in CSS pixels.
    #[arg(long, default_value_t = 360.0)]
    height: f32,
    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    dpr: f32,
    /// Intensity from 0 to 100. Defaults to the preset's value.
    #[arg(short, long)]
    intensity: Option<f32>,
    /// Output directory for the PNG frames.
    #[arg(short, long, default_value = "frames")]
    out: PathBuf,
    /// Skip the demo signal and render the idle animation.
    #[arg(long)]
    idle: bool,
    /// Seed for particles and the demo signal.
    #[arg(long)]
    seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_builtin_preset_by_name() {
        let preset = load_preset("lunar-echoes").unwrap();
        assert_eq!(preset.bar_count, Some(40));
    }

    #[test]
    fn loads_preset_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"barCount": 24, "colors": ["#ff0000", "#0000ff"], "mirror": false}}"##
        )
        .unwrap();

        let preset = load_preset(file.path().to_str().unwrap()).unwrap();
        let style = VisualStyle::resolve(Some(&preset));
        assert_eq!(style.bar_count, 24);
        assert!(!style.mirror);
        assert_eq!(style.colors, vec!["#ff0000".to_string(), "#0000ff".to_string()]);
    }

    #[test]
    fn rejects_unknown_preset() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(load_preset(missing.to_str().unwrap()).is_err());
        assert!(load_preset("no-such-preset").is_err());
    }

    #[test]
    fn demo_signal_is_bounded_and_seeded() {
        let mut first = DemoSignal::new(3);
        let mut second = DemoSignal::new(3);
        let block = first.next_block(2048);
        assert_eq!(block, second.next_block(2048));
        assert!(block.iter().all(|sample| (-1.0..=1.0).contains(sample)));
    }

    #[test]
    fn renders_frames_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let args = RenderArgs {
            preset: "pulse-drive".to_string(),
            frames: 3,
            width: 64.0,
            height: 36.0,
            dpr: 2.0,
            intensity: None,
            out: dir.path().to_path_buf(),
            idle: false,
            seed: Some(1),
        };
        run_render(&args).unwrap();
        for frame in 0..3 {
            assert!(dir.path().join(format!("frame_{frame:05}.png")).is_file());
        }
    }
}
