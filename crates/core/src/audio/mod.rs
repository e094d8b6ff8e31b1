use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use crate::{Analyser, EngineConfig, PulseVizError, Result};

/// Stable identifier of a playable media source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(String);

impl MediaId {
    /// Wraps any string-like identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounded PCM history shared between a media source and its analyser.
#[derive(Debug)]
struct SampleRing {
    samples: VecDeque<f32>,
    capacity: usize,
}

/// Thread-safe handle on the PCM ring a media source writes into.
///
/// Producers (a decoder thread, an audio callback) call [`SampleTap::push`];
/// the frame step reads the newest window with [`SampleTap::copy_latest`].
#[derive(Clone)]
pub struct SampleTap {
    shared: Arc<Mutex<SampleRing>>,
}

impl SampleTap {
    /// Creates an empty tap holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Mutex::new(SampleRing {
                samples: VecDeque::with_capacity(capacity),
                capacity,
            })),
        }
    }

    /// Appends samples, discarding the oldest ones beyond capacity.
    pub fn push(&self, samples: &[f32]) -> Result<()> {
        let mut ring = self.lock()?;
        let capacity = ring.capacity;
        let incoming = &samples[samples.len().saturating_sub(capacity)..];
        let overflow = (ring.samples.len() + incoming.len()).saturating_sub(capacity);
        ring.samples.drain(..overflow);
        ring.samples.extend(incoming.iter().copied());
        Ok(())
    }

    /// Replaces the contents of `out` with at most `len` of the newest samples.
    pub fn copy_latest(&self, len: usize, out: &mut Vec<f32>) -> Result<()> {
        let ring = self.lock()?;
        let skip = ring.samples.len().saturating_sub(len);
        out.clear();
        out.extend(ring.samples.iter().skip(skip).copied());
        Ok(())
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.samples.len())
    }

    /// Returns `true` when no samples have been buffered yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SampleRing>> {
        self.shared
            .lock()
            .map_err(|_| PulseVizError::msg("sample tap has been poisoned"))
    }
}

impl fmt::Debug for SampleTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleTap").finish()
    }
}

/// A playable source the engine can listen to.
///
/// Attaching is one-way: once a source has handed out its tap it must refuse
/// every further attempt with [`PulseVizError::AlreadyCaptured`].
pub trait MediaHandle {
    fn media_id(&self) -> MediaId;

    fn attach(&self) -> Result<SampleTap>;
}

/// In-memory media source fed by whoever decodes or synthesises the audio.
#[derive(Debug)]
pub struct MediaStream {
    id: MediaId,
    tap: SampleTap,
    attached: AtomicBool,
}

impl MediaStream {
    /// Creates a stream whose tap keeps the newest `capacity` samples.
    pub fn new(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: MediaId::new(id),
            tap: SampleTap::new(capacity),
            attached: AtomicBool::new(false),
        }
    }

    /// Creates a stream sized by [`EngineConfig::tap_capacity`].
    pub fn with_config(id: impl Into<String>, config: &EngineConfig) -> Self {
        Self::new(id, config.tap_capacity)
    }

    /// Feeds decoded PCM into the stream.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.tap.push(samples)
    }

    /// Returns `true` once a graph has captured this stream.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl MediaHandle for MediaStream {
    fn media_id(&self) -> MediaId {
        self.id.clone()
    }

    fn attach(&self) -> Result<SampleTap> {
        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(PulseVizError::AlreadyCaptured(self.id.to_string()));
        }
        Ok(self.tap.clone())
    }
}

/// Lifecycle of a capture context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Processing context that owns an audio graph's clock.
pub trait CaptureContext: Send {
    fn state(&self) -> ContextState;

    /// Attempts to move a suspended context to running.
    fn resume(&mut self) -> Result<()>;

    fn close(&mut self);
}

/// Environment able to create capture contexts.
pub trait CaptureBackend: Send + Sync {
    fn create_context(&self) -> Result<Box<dyn CaptureContext>>;
}

/// In-process backend. Contexts start suspended, like a freshly created
/// context waiting for a user gesture, and resume on request.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareBackend {
    start_running: bool,
}

impl SoftwareBackend {
    /// Backend whose contexts start suspended.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose contexts are running from creation.
    pub fn running() -> Self {
        Self {
            start_running: true,
        }
    }
}

impl CaptureBackend for SoftwareBackend {
    fn create_context(&self) -> Result<Box<dyn CaptureContext>> {
        let state = if self.start_running {
            ContextState::Running
        } else {
            ContextState::Suspended
        };
        Ok(Box::new(SoftwareContext { state }))
    }
}

#[derive(Debug)]
struct SoftwareContext {
    state: ContextState,
}

impl CaptureContext for SoftwareContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        match self.state {
            ContextState::Closed => Err(PulseVizError::msg("cannot resume a closed context")),
            _ => {
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        self.state = ContextState::Closed;
    }
}

/// Backend for environments without audio capture.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl CaptureBackend for UnsupportedBackend {
    fn create_context(&self) -> Result<Box<dyn CaptureContext>> {
        Err(PulseVizError::CaptureUnavailable(
            "no capture backend in this environment".to_string(),
        ))
    }
}

/// Analyser plus the time-domain scratch it reads from.
#[derive(Debug)]
struct AnalyserNode {
    analyser: Analyser,
    time_domain: Vec<f32>,
}

/// Capture context, analyser and source for one media id.
pub struct AudioGraphHandle {
    media_id: MediaId,
    context: Mutex<Box<dyn CaptureContext>>,
    analyser: Mutex<AnalyserNode>,
    source: SampleTap,
    bin_count: usize,
}

impl AudioGraphHandle {
    /// Media this graph listens to.
    pub fn media_id(&self) -> &MediaId {
        &self.media_id
    }

    /// Length of the spectrum written by [`AudioGraphHandle::read_frequency_data`].
    pub fn frequency_bin_count(&self) -> usize {
        self.bin_count
    }

    /// Current state of the capture context.
    pub fn context_state(&self) -> Result<ContextState> {
        Ok(self.lock_context()?.state())
    }

    /// Resumes the context if it is suspended. Returns whether it is running
    /// afterwards; a failed resume is not an error.
    pub fn resume(&self) -> Result<bool> {
        let mut context = self.lock_context()?;
        if context.state() == ContextState::Suspended {
            if let Err(err) = context.resume() {
                tracing::debug!(media = %self.media_id, %err, "capture context resume failed");
            }
        }
        Ok(context.state() == ContextState::Running)
    }

    /// Updates the analyser's smoothing time constant.
    pub fn set_smoothing(&self, smoothing: f32) -> Result<()> {
        self.lock_analyser()?.analyser.set_smoothing(smoothing);
        Ok(())
    }

    /// Returns the analyser's smoothing time constant.
    pub fn smoothing(&self) -> Result<f32> {
        Ok(self.lock_analyser()?.analyser.smoothing())
    }

    /// Runs the analyser over the newest source samples and fills `out` with
    /// normalised magnitudes.
    pub fn read_frequency_data(&self, out: &mut [f32]) -> Result<()> {
        let mut node = self.lock_analyser()?;
        let AnalyserNode {
            analyser,
            time_domain,
        } = &mut *node;
        self.source.copy_latest(analyser.fft_size(), time_domain)?;
        analyser.process(time_domain.as_slice(), out)
    }

    fn close(&self) {
        match self.lock_context() {
            Ok(mut context) => context.close(),
            Err(err) => tracing::warn!(media = %self.media_id, %err, "could not close context"),
        }
    }

    fn lock_context(&self) -> Result<MutexGuard<'_, Box<dyn CaptureContext>>> {
        self.context
            .lock()
            .map_err(|_| PulseVizError::msg("capture context has been poisoned"))
    }

    fn lock_analyser(&self) -> Result<MutexGuard<'_, AnalyserNode>> {
        self.analyser
            .lock()
            .map_err(|_| PulseVizError::msg("analyser has been poisoned"))
    }
}

impl fmt::Debug for AudioGraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioGraphHandle")
            .field("media_id", &self.media_id)
            .field("bin_count", &self.bin_count)
            .finish()
    }
}

/// Owns at most one [`AudioGraphHandle`] per media id.
///
/// The registry outlives visualizers: a visualizer built again for the same
/// media gets the cached graph instead of trying to capture the source twice.
pub struct AudioGraphRegistry {
    backend: Arc<dyn CaptureBackend>,
    config: EngineConfig,
    graphs: HashMap<MediaId, Arc<AudioGraphHandle>>,
}

impl AudioGraphRegistry {
    /// Registry using the default [`EngineConfig`].
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    /// Registry whose graphs are built from `config`.
    pub fn with_config(backend: Arc<dyn CaptureBackend>, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            graphs: HashMap::new(),
        }
    }

    /// Returns the graph for `media`, building it on first request.
    ///
    /// Errors mean capture is unavailable for this media; callers are expected
    /// to fall back to idle animation rather than fail.
    pub fn get_or_create(
        &mut self,
        media: &dyn MediaHandle,
        smoothing: f32,
    ) -> Result<Arc<AudioGraphHandle>> {
        let media_id = media.media_id();
        if let Some(graph) = self.graphs.get(&media_id) {
            return Ok(graph.clone());
        }

        let mut context = self.backend.create_context()?;
        let analyser = match Analyser::with_config(&self.config, smoothing) {
            Ok(analyser) => analyser,
            Err(err) => {
                context.close();
                return Err(err);
            }
        };
        let source = match media.attach() {
            Ok(source) => source,
            Err(err) => {
                context.close();
                return Err(err);
            }
        };

        let bin_count = analyser.frequency_bin_count();
        let graph = Arc::new(AudioGraphHandle {
            media_id: media_id.clone(),
            context: Mutex::new(context),
            analyser: Mutex::new(AnalyserNode {
                time_domain: Vec::with_capacity(analyser.fft_size()),
                analyser,
            }),
            source,
            bin_count,
        });

        tracing::debug!(media = %media_id, bin_count, "built audio graph");
        self.graphs.insert(media_id, graph.clone());
        Ok(graph)
    }

    /// Returns the cached graph for `media_id` without building one.
    pub fn get(&self, media_id: &MediaId) -> Option<Arc<AudioGraphHandle>> {
        self.graphs.get(media_id).cloned()
    }

    /// Drops the graph for `media_id` and closes its context.
    ///
    /// The media source stays attached, so it cannot be captured again.
    pub fn dispose(&mut self, media_id: &MediaId) -> bool {
        match self.graphs.remove(media_id) {
            Some(graph) => {
                graph.close();
                tracing::debug!(media = %media_id, "disposed audio graph");
                true
            }
            None => false,
        }
    }

    /// Resumes the context of a cached graph. Returns whether it is running.
    pub fn resume(&self, media_id: &MediaId) -> Result<bool> {
        match self.graphs.get(media_id) {
            Some(graph) => graph.resume(),
            None => Ok(false),
        }
    }

    /// Number of cached graphs.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Returns `true` when no graph has been built.
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

impl fmt::Debug for AudioGraphRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioGraphRegistry")
            .field("config", &self.config)
            .field("graphs", &self.graphs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        created: AtomicUsize,
    }

    impl CaptureBackend for CountingBackend {
        fn create_context(&self) -> Result<Box<dyn CaptureContext>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            SoftwareBackend::new().create_context()
        }
    }

    fn small_config() -> EngineConfig {
        EngineConfig {
            fft_size: 256,
            tap_capacity: 1024,
            ..EngineConfig::default()
        }
    }

    fn software_registry(backend: SoftwareBackend) -> AudioGraphRegistry {
        AudioGraphRegistry::with_config(Arc::new(backend), small_config())
    }

    #[test]
    fn tap_keeps_only_the_newest_samples() {
        let tap = SampleTap::new(4);
        tap.push(&[1.0, 2.0, 3.0]).unwrap();
        tap.push(&[4.0, 5.0, 6.0]).unwrap();

        let mut out = Vec::new();
        tap.copy_latest(3, &mut out).unwrap();
        assert_eq!(out, vec![4.0, 5.0, 6.0]);
        assert_eq!(tap.len().unwrap(), 4);
    }

    #[test]
    fn second_request_returns_the_same_graph() {
        let backend = Arc::new(CountingBackend::default());
        let mut registry = AudioGraphRegistry::with_config(backend.clone(), small_config());
        let media = MediaStream::with_config("track-1", &small_config());

        let first = registry.get_or_create(&media, 0.85).unwrap();
        let second = registry.get_or_create(&media, 0.5).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(first.frequency_bin_count(), 128);
    }

    #[test]
    fn media_cannot_be_captured_twice() {
        let media = MediaStream::with_config("track-2", &small_config());
        let mut first = software_registry(SoftwareBackend::new());
        let mut second = software_registry(SoftwareBackend::new());

        first.get_or_create(&media, 0.85).unwrap();
        let err = second.get_or_create(&media, 0.85).unwrap_err();
        assert!(matches!(err, PulseVizError::AlreadyCaptured(_)));
        assert!(second.is_empty());
    }

    #[test]
    fn unsupported_backend_reports_unavailability() {
        let mut registry = AudioGraphRegistry::new(Arc::new(UnsupportedBackend));
        let media = MediaStream::with_config("track-3", &small_config());

        let err = registry.get_or_create(&media, 0.85).unwrap_err();
        assert!(matches!(err, PulseVizError::CaptureUnavailable(_)));
        assert!(!media.is_attached());
    }

    #[test]
    fn resume_moves_suspended_context_to_running() {
        let mut registry = software_registry(SoftwareBackend::new());
        let media = MediaStream::with_config("track-4", &small_config());
        let graph = registry.get_or_create(&media, 0.85).unwrap();

        assert_eq!(graph.context_state().unwrap(), ContextState::Suspended);
        assert!(registry.resume(&media.media_id()).unwrap());
        assert_eq!(graph.context_state().unwrap(), ContextState::Running);
    }

    #[test]
    fn dispose_closes_the_context() {
        let mut registry = software_registry(SoftwareBackend::running());
        let media = MediaStream::with_config("track-5", &small_config());
        let graph = registry.get_or_create(&media, 0.85).unwrap();

        assert!(registry.dispose(&media.media_id()));
        assert!(!registry.dispose(&media.media_id()));
        assert_eq!(graph.context_state().unwrap(), ContextState::Closed);
        assert!(!graph.resume().unwrap());
    }

    #[test]
    fn reads_spectrum_from_pushed_samples() {
        let mut registry = software_registry(SoftwareBackend::running());
        let media = MediaStream::with_config("track-6", &small_config());
        let graph = registry.get_or_create(&media, 0.0).unwrap();

        let tone: Vec<f32> = (0..256)
            .map(|n| (2.0 * std::f32::consts::PI * 16.0 * n as f32 / 256.0).sin())
            .collect();
        media.push_samples(&tone).unwrap();

        let mut out = vec![0.0; graph.frequency_bin_count()];
        graph.read_frequency_data(&mut out).unwrap();
        assert_eq!(out[16], 1.0);
    }
}
