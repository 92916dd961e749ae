//! Recording sinks shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tsmf_core::{PlaybackConfig, PresentationId, Rect, StreamId};
use tsmf_media::*;

pub const MOCK_AUDIO: &str = "mock";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records every event pushed by the playback thread
#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<PlaybackEvent>>,
}

impl RecordingEvents {
    pub fn frames(&self) -> Vec<(usize, Rect)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::VideoFrame(frame) => Some((frame.size(), frame.output)),
                _ => None,
            })
            .collect()
    }

    pub fn redraws(&self) -> Vec<Rect> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Redraw(region) => Some(*region),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingEvents {
    fn push_event(&self, event: PlaybackEvent) -> MediaResult<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Records acknowledgments in arrival order
#[derive(Default)]
pub struct RecordingAcks {
    pub acks: Mutex<Vec<SampleAck>>,
}

impl RecordingAcks {
    pub fn ids(&self) -> Vec<u32> {
        self.acks.lock().iter().map(|a| a.sample_id).collect()
    }

    pub fn count(&self) -> usize {
        self.acks.lock().len()
    }
}

impl AckSink for RecordingAcks {
    fn ack(&self, sample_id: u32, duration: u64, size: u32) {
        self.acks.lock().push(SampleAck {
            sample_id,
            duration,
            size,
        });
    }
}

/// Shared view of a mock audio device
#[derive(Default)]
pub struct AudioProbe {
    /// Reported queue depth
    pub depth: AtomicUsize,
    pub played: Mutex<Vec<usize>>,
    pub flushes: AtomicUsize,
    pub opened: Mutex<Vec<(Option<String>, AudioFormat)>>,
}

impl AudioProbe {
    pub fn set_depth(&self, depth: usize) {
        self.depth.store(depth, Ordering::SeqCst);
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

struct MockAudioSink {
    device: Option<String>,
    probe: Arc<AudioProbe>,
}

impl AudioSink for MockAudioSink {
    fn set_format(&mut self, format: AudioFormat) -> MediaResult<()> {
        self.probe.opened.lock().push((self.device.clone(), format));
        Ok(())
    }

    fn play(&mut self, payload: Payload) -> MediaResult<()> {
        self.probe.played.lock().push(payload.len());
        Ok(())
    }

    fn flush(&mut self) {
        self.probe.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn queue_length(&self) -> usize {
        self.probe.depth.load(Ordering::SeqCst)
    }
}

/// Default backends plus a mock audio output reporting into `probe`
pub fn backends(probe: Arc<AudioProbe>) -> MediaBackends {
    let mut backends = MediaBackends::with_defaults();
    backends.audio.register(
        MOCK_AUDIO,
        move |device: Option<&str>| -> MediaResult<Box<dyn AudioSink>> {
            Ok(Box::new(MockAudioSink {
                device: device.map(str::to_string),
                probe: probe.clone(),
            }))
        },
    );
    backends
}

pub struct Harness {
    pub registry: PresentationRegistry,
    pub presentation: Arc<Presentation>,
    pub events: Arc<RecordingEvents>,
    pub acks: Arc<RecordingAcks>,
    pub audio: Arc<AudioProbe>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let audio = Arc::new(AudioProbe::default());
        let registry =
            PresentationRegistry::new(PlaybackConfig::testing(), backends(audio.clone())).unwrap();
        let events = Arc::new(RecordingEvents::default());
        let presentation = registry
            .create(PresentationId::new_v4(), events.clone())
            .unwrap();
        presentation.set_audio_device(Some(MOCK_AUDIO), None);
        Self {
            registry,
            presentation,
            events,
            acks: Arc::new(RecordingAcks::default()),
            audio,
        }
    }

    pub fn video_stream(&self, id: StreamId, width: u32, height: u32) -> Arc<Stream> {
        let stream = self.presentation.create_stream(id).unwrap();
        stream
            .set_format(None, &MediaType::video(SubType::Unknown, width, height))
            .unwrap();
        stream
    }

    pub fn audio_stream(&self, id: StreamId) -> Arc<Stream> {
        let stream = self.presentation.create_stream(id).unwrap();
        stream
            .set_format(None, &MediaType::audio(SubType::Pcm, 44100, 2, 16))
            .unwrap();
        stream
    }

    /// Push a sample whose payload is `len` bytes
    pub fn push(&self, stream: &Stream, sample_id: u32, start: u64, end: u64, len: usize) {
        stream
            .push_sample(
                self.acks.clone(),
                sample_id,
                start,
                end,
                end - start,
                SampleFlags::CLEANPOINT,
                &vec![0xAB; len],
            )
            .unwrap();
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
