use std::sync::Arc;

use crate::{AudioGraphHandle, ContextState};

/// Reads normalised spectrum snapshots from an audio graph.
///
/// The snapshot buffer is allocated once per graph and refilled in place on
/// every call.
#[derive(Debug, Default)]
pub struct SpectrumSource {
    graph: Option<Arc<AudioGraphHandle>>,
    buffer: Vec<f32>,
}

impl SpectrumSource {
    /// Source with no graph attached; every snapshot is unavailable.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn new(graph: Arc<AudioGraphHandle>) -> Self {
        let buffer = vec![0.0; graph.frequency_bin_count()];
        Self {
            graph: Some(graph),
            buffer,
        }
    }

    pub fn graph(&self) -> Option<&Arc<AudioGraphHandle>> {
        self.graph.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.graph.is_some()
    }

    /// Returns this frame's spectrum, or `None` when no graph is attached or
    /// the analyser could not be read.
    ///
    /// While `playing`, a suspended context gets a resume attempt first.
    pub fn snapshot(&mut self, playing: bool) -> Option<&[f32]> {
        let graph = self.graph.as_ref()?;

        if playing && matches!(graph.context_state(), Ok(ContextState::Suspended)) {
            let _ = graph.resume();
        }

        match graph.read_frequency_data(&mut self.buffer) {
            Ok(()) => Some(self.buffer.as_slice()),
            Err(err) => {
                tracing::debug!(media = %graph.media_id(), %err, "spectrum snapshot unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioGraphRegistry, EngineConfig, MediaStream, SoftwareBackend};

    fn registry() -> AudioGraphRegistry {
        AudioGraphRegistry::with_config(
            Arc::new(SoftwareBackend::new()),
            EngineConfig {
                fft_size: 256,
                ..EngineConfig::default()
            },
        )
    }

    #[test]
    fn unavailable_source_returns_none() {
        let mut source = SpectrumSource::unavailable();
        assert!(source.snapshot(true).is_none());
        assert!(!source.is_available());
    }

    #[test]
    fn snapshot_has_half_window_length() {
        let mut registry = registry();
        let media = MediaStream::new("snap", 1024);
        let mut source = SpectrumSource::new(registry.get_or_create(&media, 0.85).unwrap());

        let frame = source.snapshot(false).expect("graph attached");
        assert_eq!(frame.len(), 128);
        assert!(frame.iter().all(|value| (0.0..=1.0).contains(value)));
    }

    #[test]
    fn playing_snapshot_resumes_suspended_context() {
        let mut registry = registry();
        let media = MediaStream::new("resume", 1024);
        let graph = registry.get_or_create(&media, 0.85).unwrap();
        let mut source = SpectrumSource::new(graph.clone());

        source.snapshot(false);
        assert_eq!(graph.context_state().unwrap(), ContextState::Suspended);

        source.snapshot(true);
        assert_eq!(graph.context_state().unwrap(), ContextState::Running);
    }
}
