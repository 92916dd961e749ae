//! Presentations: a set of synchronized streams and their playback state
//!
//! Producers and the playback thread meet here. Stream queues, geometry,
//! playback time and end-of-stream flags live behind one mutex; the audio
//! sink sits behind its own lock so a slow `play` never blocks producers.
//! Lock order is always state, then audio.

use crate::audio::AudioSink;
use crate::error::MediaResult;
use crate::events::{EventSink, PlaybackEvent, VideoFrameEvent};
use crate::format::{AudioFormat, MajorType, MediaType};
use crate::playback::{self, PlaybackState, PlaybackThread};
use crate::registry::MediaBackends;
use crate::sample::Sample;
use crate::scheduler::{Scheduler, Selected, StreamQueue};
use crate::stream::Stream;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};
use tsmf_core::{PlaybackConfig, PresentationId, Rect, StreamId, TsmfError};

/// Audio backend and device requested for a presentation
#[derive(Debug, Clone, Default)]
struct AudioDevice {
    backend: Option<String>,
    device: Option<String>,
}

/// Everything guarded by the presentation lock
struct PresentationState {
    /// Registration order; the scheduler breaks ties by it
    streams: Vec<StreamQueue>,
    handles: HashMap<StreamId, Arc<Stream>>,
    playback_time: u64,
    eos: bool,
    output: Rect,
    last_rendered: Rect,
    audio_format: AudioFormat,
    audio_device: AudioDevice,
}

impl PresentationState {
    fn queue_mut(&mut self, stream_id: StreamId) -> Option<&mut StreamQueue> {
        self.streams.iter_mut().find(|q| q.id == stream_id)
    }

    fn queue(&self, stream_id: StreamId) -> Option<&StreamQueue> {
        self.streams.iter().find(|q| q.id == stream_id)
    }

    /// Region to repaint because the last frame is no longer there
    fn take_last_rendered(&mut self) -> Option<Rect> {
        if self.last_rendered.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.last_rendered))
    }
}

/// A synchronized audio/video playback session
pub struct Presentation {
    id: PresentationId,
    config: PlaybackConfig,
    backends: Arc<MediaBackends>,
    events: Arc<dyn EventSink>,
    scheduler: Scheduler,
    state: Mutex<PresentationState>,
    /// Signalled when a sample is queued, a stream ends, or stop is requested
    wake: Condvar,
    audio: Mutex<Option<Box<dyn AudioSink>>>,
    playback: PlaybackThread,
}

impl Presentation {
    pub(crate) fn new(
        id: PresentationId,
        config: PlaybackConfig,
        backends: Arc<MediaBackends>,
        events: Arc<dyn EventSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            scheduler: Scheduler::new(config.audio_queue_threshold),
            config,
            backends,
            events,
            state: Mutex::new(PresentationState {
                streams: Vec::new(),
                handles: HashMap::new(),
                playback_time: 0,
                eos: false,
                output: Rect::default(),
                last_rendered: Rect::default(),
                audio_format: AudioFormat::default(),
                audio_device: AudioDevice::default(),
            }),
            wake: Condvar::new(),
            audio: Mutex::new(None),
            playback: PlaybackThread::new(),
        })
    }

    /// Presentation identifier
    pub fn id(&self) -> PresentationId {
        self.id
    }

    pub(crate) fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub(crate) fn backends(&self) -> &MediaBackends {
        &self.backends
    }

    // ------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------

    /// Register a new stream. Fails if the id is already in use.
    pub fn create_stream(self: &Arc<Self>, stream_id: StreamId) -> MediaResult<Arc<Stream>> {
        let mut state = self.state.lock();
        if state.handles.contains_key(&stream_id) {
            warn!(presentation = %self.id, stream_id, "duplicate stream id");
            return Err(TsmfError::DuplicateStream {
                presentation: self.id,
                stream_id,
            }
            .into());
        }

        let stream = Arc::new(Stream::new(stream_id, Arc::downgrade(self)));
        state.handles.insert(stream_id, Arc::clone(&stream));
        state.streams.push(StreamQueue::new(stream_id));
        debug!(presentation = %self.id, stream_id, "stream created");
        Ok(stream)
    }

    /// Look up a stream by id
    pub fn find_stream(&self, stream_id: StreamId) -> Option<Arc<Stream>> {
        self.state.lock().handles.get(&stream_id).cloned()
    }

    /// Unregister a stream, discarding its queued samples without
    /// acknowledgment and releasing its decoder
    pub fn remove_stream(&self, stream_id: StreamId) -> MediaResult<()> {
        let (stream, discarded) = {
            let mut state = self.state.lock();
            let stream =
                state
                    .handles
                    .remove(&stream_id)
                    .ok_or(TsmfError::StreamNotFound {
                        presentation: self.id,
                        stream_id,
                    })?;
            let discarded = state.queue(stream_id).map_or(0, |q| q.samples.len());
            state.streams.retain(|q| q.id != stream_id);
            (stream, discarded)
        };

        stream.release_decoder();
        debug!(presentation = %self.id, stream_id, discarded, "stream removed");
        Ok(())
    }

    /// Unregister every stream
    pub(crate) fn remove_all_streams(&self) {
        let handles: Vec<Arc<Stream>> = {
            let mut state = self.state.lock();
            state.streams.clear();
            state.handles.drain().map(|(_, stream)| stream).collect()
        };
        for stream in handles {
            stream.release_decoder();
        }
    }

    /// Stream ids in registration order
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.state.lock().streams.iter().map(|q| q.id).collect()
    }

    /// Number of samples waiting in a stream's queue
    pub fn queued_samples(&self, stream_id: StreamId) -> usize {
        self.state
            .lock()
            .queue(stream_id)
            .map_or(0, |q| q.samples.len())
    }

    pub(crate) fn configure_stream(
        &self,
        stream_id: StreamId,
        media_type: &MediaType,
    ) -> MediaResult<()> {
        let mut state = self.state.lock();
        let queue = state
            .queue_mut(stream_id)
            .ok_or(TsmfError::StreamNotFound {
                presentation: self.id,
                stream_id,
            })?;
        queue.major_type = media_type.major_type;
        queue.width = media_type.width;
        queue.height = media_type.height;

        if media_type.major_type == MajorType::Audio {
            state.audio_format = AudioFormat::from_media_type(media_type);
        }
        Ok(())
    }

    pub(crate) fn enqueue(&self, sample: Sample) -> MediaResult<()> {
        let stream_id = sample.stream_id;
        {
            let mut state = self.state.lock();
            let queue = state
                .queue_mut(stream_id)
                .ok_or(TsmfError::StreamNotFound {
                    presentation: self.id,
                    stream_id,
                })?;
            queue.samples.push_back(sample);
        }
        self.wake.notify_one();
        Ok(())
    }

    pub(crate) fn end_stream(&self, stream_id: StreamId) -> MediaResult<()> {
        {
            let mut state = self.state.lock();
            let queue = state
                .queue_mut(stream_id)
                .ok_or(TsmfError::StreamNotFound {
                    presentation: self.id,
                    stream_id,
                })?;
            queue.eos = true;
            state.eos = true;
        }
        debug!(presentation = %self.id, stream_id, "end of stream");
        self.wake.notify_one();
        Ok(())
    }

    pub(crate) fn stream_major_type(&self, stream_id: StreamId) -> MajorType {
        self.state
            .lock()
            .queue(stream_id)
            .map_or(MajorType::Unknown, |q| q.major_type)
    }

    pub(crate) fn stream_eos(&self, stream_id: StreamId) -> bool {
        self.state.lock().queue(stream_id).map_or(false, |q| q.eos)
    }

    // ------------------------------------------------------------------
    // Session-wide settings
    // ------------------------------------------------------------------

    /// Set where video should be drawn. Takes effect with the next frame.
    pub fn set_geometry(&self, output: Rect) {
        self.state.lock().output = output;
    }

    /// Requested output rectangle
    pub fn geometry(&self) -> Rect {
        self.state.lock().output
    }

    /// Choose the audio backend and device opened when playback starts
    pub fn set_audio_device(&self, backend: Option<&str>, device: Option<&str>) {
        let mut state = self.state.lock();
        state.audio_device = AudioDevice {
            backend: backend.filter(|s| !s.is_empty()).map(str::to_string),
            device: device.filter(|s| !s.is_empty()).map(str::to_string),
        };
    }

    /// Audio format negotiated by the audio stream, if any
    pub fn audio_format(&self) -> AudioFormat {
        self.state.lock().audio_format
    }

    /// End time of the latest released sample
    pub fn playback_time(&self) -> u64 {
        self.state.lock().playback_time
    }

    /// Whether any stream has signalled end of stream since the last flush
    pub fn is_eos(&self) -> bool {
        self.state.lock().eos
    }

    // ------------------------------------------------------------------
    // Playback control
    // ------------------------------------------------------------------

    /// Start the playback thread. Does nothing if it is already running.
    pub fn start(self: &Arc<Self>) -> MediaResult<()> {
        let presentation = Arc::clone(self);
        let started = self.playback.start(
            format!("tsmf-playback-{}", self.id),
            || self.state.lock().playback_time = 0,
            move || playback::run(presentation),
        );
        let started = started.map_err(|e| {
            error!(presentation = %self.id, error = %e, "failed to spawn playback thread");
            e
        })?;
        if started {
            info!(presentation = %self.id, "playback thread spawned");
        }
        Ok(())
    }

    /// Stop the playback thread and wait for it to finish.
    ///
    /// If end of stream was reached the remaining samples are played out
    /// first. Afterwards the last video region is repainted. Calling this
    /// on a stopped presentation does nothing.
    pub fn stop(&self) {
        self.playback.request_exit();
        self.wake.notify_all();
        self.playback.wait_stopped(self.config.stop_poll_interval);
        self.restore_last_video_frame();
    }

    /// Discard every queued sample and clear end-of-stream state. Safe while
    /// the playback thread runs.
    pub fn flush(&self) {
        let discarded: usize = {
            let mut state = self.state.lock();
            let discarded = state
                .streams
                .iter_mut()
                .map(|queue| {
                    let count = queue.samples.len();
                    queue.samples.clear();
                    queue.eos = false;
                    count
                })
                .sum();
            state.eos = false;
            discarded
        };

        if let Some(sink) = self.audio.lock().as_mut() {
            sink.flush();
        }
        debug!(presentation = %self.id, discarded, "presentation flushed");
    }

    /// Current thread lifecycle state
    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Whether the playback thread is running or draining
    pub fn is_running(&self) -> bool {
        self.playback.state().is_active()
    }

    pub(crate) fn playback_thread(&self) -> &PlaybackThread {
        &self.playback
    }

    // ------------------------------------------------------------------
    // Playback thread internals
    // ------------------------------------------------------------------

    pub(crate) fn next_sample(&self) -> Option<Selected> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.scheduler
            .select(&mut state.streams, &mut state.playback_time, || {
                self.audio.lock().as_ref().map(|sink| sink.queue_length())
            })
    }

    pub(crate) fn next_sample_unpaced(&self) -> Option<Selected> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        self.scheduler
            .select_unpaced(&mut state.streams, &mut state.playback_time)
    }

    /// Wait up to the idle interval for new work
    pub(crate) fn idle_wait(&self) {
        let mut state = self.state.lock();
        if self.playback.exit_requested() {
            return;
        }
        self.wake.wait_for(&mut state, self.config.idle_interval);
    }

    /// Deliver a released sample and acknowledge it
    pub(crate) fn dispatch(&self, selected: Selected) {
        let Selected {
            mut sample,
            major_type,
            width,
            height,
        } = selected;

        trace!(
            presentation = %self.id,
            stream_id = sample.stream_id,
            sample_id = sample.sample_id,
            end_time = sample.end_time,
            "dispatching sample"
        );

        match major_type {
            MajorType::Video => self.play_video(&mut sample, width, height),
            MajorType::Audio => self.play_audio(&mut sample),
            MajorType::Unknown => {}
        }

        // Anything not handed off is freed with the sample
        sample.acknowledge();
    }

    fn play_video(&self, sample: &mut Sample, width: u32, height: u32) {
        let Some(payload) = sample.take_payload() else {
            return;
        };

        let (stale, output) = {
            let mut state = self.state.lock();
            let stale = if state.last_rendered != state.output {
                state.take_last_rendered()
            } else {
                None
            };
            state.last_rendered = state.output;
            (stale, state.output)
        };

        if let Some(region) = stale {
            self.push_event(PlaybackEvent::Redraw(region));
        }
        self.push_event(PlaybackEvent::VideoFrame(VideoFrameEvent {
            payload,
            pixel_format: sample.pixel_format,
            frame_width: width,
            frame_height: height,
            output,
        }));
    }

    fn play_audio(&self, sample: &mut Sample) {
        let mut audio = self.audio.lock();
        let Some(sink) = audio.as_mut() else {
            return;
        };
        let Some(payload) = sample.take_payload() else {
            return;
        };
        if let Err(e) = sink.play(payload) {
            warn!(
                presentation = %self.id,
                sample_id = sample.sample_id,
                error = %e,
                "audio sink rejected sample"
            );
        }
    }

    fn push_event(&self, event: PlaybackEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.events.push_event(event) {
            warn!(presentation = %self.id, event_type, error = %e, "event dropped");
        }
    }

    /// Repaint the area of the last frame, if one is on screen
    fn restore_last_video_frame(&self) {
        let region = self.state.lock().take_last_rendered();
        if let Some(region) = region {
            self.push_event(PlaybackEvent::Redraw(region));
        }
    }

    /// Open the audio sink for the negotiated format, if there is one
    pub(crate) fn open_audio_sink(&self) {
        let (format, requested) = {
            let state = self.state.lock();
            (state.audio_format, state.audio_device.clone())
        };
        if !format.is_complete() {
            return;
        }

        let Some(backend) = requested
            .backend
            .or_else(|| self.config.default_audio_sink.clone())
        else {
            debug!(presentation = %self.id, "no audio backend configured, audio will be discarded");
            return;
        };

        match self
            .backends
            .audio
            .open(&backend, requested.device.as_deref(), format)
        {
            Ok(sink) => {
                info!(presentation = %self.id, backend = %backend, "audio sink ready");
                *self.audio.lock() = Some(sink);
            }
            Err(e) => {
                warn!(presentation = %self.id, backend = %backend, error = %e, "failed to open audio sink");
            }
        }
    }

    /// Wait, with a bounded poll, for the audio sink to play out its queue
    pub(crate) fn wait_audio_drained(&self) {
        let deadline = Instant::now() + self.config.audio_drain_timeout;
        loop {
            let pending = self
                .audio
                .lock()
                .as_ref()
                .map_or(0, |sink| sink.queue_length());
            if pending == 0 {
                return;
            }
            if Instant::now() >= deadline {
                warn!(presentation = %self.id, pending, "audio sink did not drain in time");
                return;
            }
            std::thread::sleep(self.config.audio_drain_poll_interval);
        }
    }

    pub(crate) fn release_audio_sink(&self) {
        if self.audio.lock().take().is_some() {
            debug!(presentation = %self.id, "audio sink released");
        }
    }
}

impl std::fmt::Debug for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presentation")
            .field("id", &self.id)
            .field("state", &self.playback.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::events::AckSink;
    use crate::format::{PixelFormat, SubType};
    use crate::sample::Payload;

    #[derive(Default)]
    struct RecordingEvents(Mutex<Vec<PlaybackEvent>>);

    impl EventSink for RecordingEvents {
        fn push_event(&self, event: PlaybackEvent) -> MediaResult<()> {
            self.0.lock().push(event);
            Ok(())
        }
    }

    struct NoAck;

    impl AckSink for NoAck {
        fn ack(&self, _sample_id: u32, _duration: u64, _size: u32) {}
    }

    fn presentation() -> (Arc<Presentation>, Arc<RecordingEvents>) {
        let events = Arc::new(RecordingEvents::default());
        let presentation = Presentation::new(
            PresentationId::new_v4(),
            PlaybackConfig::testing(),
            Arc::new(MediaBackends::with_defaults()),
            events.clone(),
        );
        (presentation, events)
    }

    fn video_sample(stream_id: StreamId, sample_id: u32) -> Selected {
        Selected {
            sample: Sample::new(
                stream_id,
                Arc::new(NoAck),
                sample_id,
                0,
                10,
                10,
                Some(Payload::new(vec![0; 6])),
                PixelFormat::I420,
            ),
            major_type: MajorType::Video,
            width: 2,
            height: 2,
        }
    }

    fn redraws(events: &RecordingEvents) -> Vec<Rect> {
        events
            .0
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Redraw(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_duplicate_stream_rejected() {
        let (presentation, _) = presentation();
        presentation.create_stream(1).unwrap();

        let result = presentation.create_stream(1);
        assert!(matches!(
            result,
            Err(MediaError::Core(TsmfError::DuplicateStream { stream_id: 1, .. }))
        ));
        assert_eq!(presentation.stream_ids(), vec![1]);
    }

    #[test]
    fn test_audio_format_recorded_from_stream() {
        let (presentation, _) = presentation();
        let stream = presentation.create_stream(2).unwrap();
        stream
            .set_format(None, &MediaType::audio(SubType::Pcm, 22050, 1, 0))
            .unwrap();

        assert_eq!(
            presentation.audio_format(),
            AudioFormat {
                sample_rate: 22050,
                channels: 1,
                bits_per_sample: 16
            }
        );
    }

    #[test]
    fn test_geometry_change_repaints_previous_region_once() {
        let (presentation, events) = presentation();
        presentation.set_geometry(Rect::new(0, 0, 100, 100));

        presentation.dispatch(video_sample(1, 1));
        // First frame: nothing was on screen before
        assert!(redraws(&events).is_empty());

        presentation.dispatch(video_sample(1, 2));
        assert!(redraws(&events).is_empty());

        presentation.set_geometry(Rect::new(50, 50, 200, 200));
        // Moving alone does not repaint until the next frame
        assert!(redraws(&events).is_empty());

        presentation.dispatch(video_sample(1, 3));
        assert_eq!(redraws(&events), vec![Rect::new(0, 0, 100, 100)]);

        let frames: Vec<Rect> = events
            .0
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::VideoFrame(f) => Some(f.output),
                _ => None,
            })
            .collect();
        assert_eq!(frames.last(), Some(&Rect::new(50, 50, 200, 200)));
    }

    #[test]
    fn test_stop_repaints_last_frame_once() {
        let (presentation, events) = presentation();
        presentation.set_geometry(Rect::new(5, 5, 40, 30));
        presentation.dispatch(video_sample(1, 1));

        presentation.stop();
        presentation.stop();

        assert_eq!(redraws(&events), vec![Rect::new(5, 5, 40, 30)]);
    }

    #[test]
    fn test_remove_stream_discards_queue() {
        let (presentation, _) = presentation();
        let stream = presentation.create_stream(1).unwrap();
        stream
            .set_format(None, &MediaType::video(SubType::Unknown, 2, 2))
            .unwrap();
        stream
            .push_sample(Arc::new(NoAck), 1, 0, 10, 10, Default::default(), &[1; 6])
            .unwrap();
        assert_eq!(presentation.queued_samples(1), 1);

        presentation.remove_stream(1).unwrap();
        assert!(presentation.find_stream(1).is_none());
        assert_eq!(presentation.queued_samples(1), 0);
        assert!(matches!(
            presentation.remove_stream(1),
            Err(MediaError::Core(TsmfError::StreamNotFound { .. }))
        ));

        // The handle outlives the registration but can no longer decode
        assert!(matches!(
            stream.push_sample(Arc::new(NoAck), 2, 10, 20, 10, Default::default(), &[1; 6]),
            Err(MediaError::DecoderNotConfigured { stream_id: 1 })
        ));
    }
}
