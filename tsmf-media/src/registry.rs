//! Process-wide presentation registry and media backends

use crate::audio::AudioSinkRegistry;
use crate::codecs::DecoderRegistry;
use crate::error::MediaResult;
use crate::events::EventSink;
use crate::presentation::Presentation;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tsmf_core::{PlaybackConfig, PresentationId, TsmfError};

/// Decoder and audio backends available to presentations
#[derive(Debug, Clone, Default)]
pub struct MediaBackends {
    /// Decoder backends, selected per stream
    pub decoders: DecoderRegistry,
    /// Audio output backends, selected per presentation
    pub audio: AudioSinkRegistry,
}

impl MediaBackends {
    /// Bundle the given registries
    pub fn new(decoders: DecoderRegistry, audio: AudioSinkRegistry) -> Self {
        Self { decoders, audio }
    }

    /// Built-in decoders and no audio output
    pub fn with_defaults() -> Self {
        Self::new(DecoderRegistry::with_defaults(), AudioSinkRegistry::new())
    }
}

/// Lookup table of live presentations keyed by id.
///
/// Dropping the registry stops every presentation still in it.
pub struct PresentationRegistry {
    config: PlaybackConfig,
    backends: Arc<MediaBackends>,
    presentations: DashMap<PresentationId, Arc<Presentation>>,
}

impl PresentationRegistry {
    /// Create a registry. Fails if `config` is invalid.
    pub fn new(config: PlaybackConfig, backends: MediaBackends) -> MediaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backends: Arc::new(backends),
            presentations: DashMap::new(),
        })
    }

    /// Playback configuration shared by new presentations
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Backends shared by new presentations
    pub fn backends(&self) -> &MediaBackends {
        &self.backends
    }

    /// Create and register a presentation. Fails if the id is taken.
    pub fn create(
        &self,
        id: PresentationId,
        events: Arc<dyn EventSink>,
    ) -> MediaResult<Arc<Presentation>> {
        match self.presentations.entry(id) {
            Entry::Occupied(_) => {
                warn!(presentation = %id, "duplicate presentation id");
                Err(TsmfError::DuplicatePresentation { id }.into())
            }
            Entry::Vacant(slot) => {
                let presentation = Presentation::new(
                    id,
                    self.config.clone(),
                    Arc::clone(&self.backends),
                    events,
                );
                slot.insert(Arc::clone(&presentation));
                info!(presentation = %id, "presentation created");
                Ok(presentation)
            }
        }
    }

    /// Look up a presentation by id
    pub fn find(&self, id: &PresentationId) -> Option<Arc<Presentation>> {
        self.presentations.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a presentation, failing if it is not registered
    pub fn get(&self, id: &PresentationId) -> MediaResult<Arc<Presentation>> {
        self.find(id)
            .ok_or_else(|| TsmfError::PresentationNotFound { id: *id }.into())
    }

    /// Stop a presentation, unregister it and release its streams
    pub fn remove(&self, id: PresentationId) -> MediaResult<()> {
        let (_, presentation) = self
            .presentations
            .remove(&id)
            .ok_or(TsmfError::PresentationNotFound { id })?;

        presentation.stop();
        presentation.remove_all_streams();
        info!(presentation = %id, "presentation removed");
        Ok(())
    }

    /// Ids of all registered presentations
    pub fn ids(&self) -> Vec<PresentationId> {
        self.presentations.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of registered presentations
    pub fn len(&self) -> usize {
        self.presentations.len()
    }

    /// Whether no presentation is registered
    pub fn is_empty(&self) -> bool {
        self.presentations.is_empty()
    }

    /// Remove every presentation
    pub fn shutdown(&self) {
        let ids = self.ids();
        debug!(count = ids.len(), "shutting down presentations");
        for id in ids {
            // A concurrent remove may have won; nothing left to do then
            let _ = self.remove(id);
        }
    }
}

impl Drop for PresentationRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
