//! Sample selection across the streams of a presentation
//!
//! Streams are fed independently, so the queue heads are only ordered within
//! each stream. Every tick the playback thread asks the scheduler for the
//! next sample to release:
//!
//! 1. The candidate is the head with the smallest start time among non-empty
//!    queues. Ties go to the stream registered first.
//! 2. Audio candidates are released while the audio sink holds fewer than
//!    `audio_queue_threshold` buffers, so the device can buffer ahead without
//!    unbounded pre-roll.
//! 3. Video candidates are released when no other stream is waiting for
//!    data, when nothing has played yet, or when playback time has already
//!    reached the candidate's start. Otherwise an empty stream might still
//!    deliver an earlier sample and the frame is held back.
//!
//! Releasing a sample advances the playback time to its end time if later.

use crate::format::MajorType;
use crate::sample::Sample;
use std::collections::VecDeque;
use tracing::trace;
use tsmf_core::StreamId;

/// Queue and rendering attributes of one stream, kept under the
/// presentation lock
#[derive(Debug)]
pub(crate) struct StreamQueue {
    pub id: StreamId,
    pub major_type: MajorType,
    pub width: u32,
    pub height: u32,
    pub eos: bool,
    pub samples: VecDeque<Sample>,
}

impl StreamQueue {
    pub fn new(id: StreamId) -> Self {
        Self {
            id,
            major_type: MajorType::Unknown,
            width: 0,
            height: 0,
            eos: false,
            samples: VecDeque::new(),
        }
    }

    fn head_start(&self) -> Option<u64> {
        self.samples.front().map(|s| s.start_time)
    }
}

/// A sample released by the scheduler with the attributes of its stream
#[derive(Debug)]
pub(crate) struct Selected {
    pub sample: Sample,
    pub major_type: MajorType,
    pub width: u32,
    pub height: u32,
}

/// Sample selection policy
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scheduler {
    audio_queue_threshold: usize,
}

impl Scheduler {
    pub fn new(audio_queue_threshold: usize) -> Self {
        Self {
            audio_queue_threshold,
        }
    }

    /// Pick the next sample to release, if any is eligible.
    ///
    /// `audio_queue_length` is only consulted when the candidate is audio and
    /// returns `None` when no audio sink is bound.
    pub fn select<F>(
        &self,
        streams: &mut [StreamQueue],
        playback_time: &mut u64,
        audio_queue_length: F,
    ) -> Option<Selected>
    where
        F: FnOnce() -> Option<usize>,
    {
        let mut earliest: Option<usize> = None;
        let mut has_pending = false;

        for (index, stream) in streams.iter().enumerate() {
            match stream.head_start() {
                None if !stream.eos => has_pending = true,
                None => {}
                Some(start) => {
                    let earlier = earliest
                        .and_then(|e| streams[e].head_start())
                        .map_or(true, |best| start < best);
                    if earlier {
                        earliest = Some(index);
                    }
                }
            }
        }

        let index = earliest?;
        let candidate = &streams[index];
        let start_time = candidate.head_start()?;

        let release = if candidate.major_type == MajorType::Audio {
            audio_queue_length().map_or(true, |depth| depth < self.audio_queue_threshold)
        } else {
            !has_pending || *playback_time == 0 || *playback_time >= start_time
        };

        if !release {
            trace!(
                stream_id = candidate.id,
                start_time,
                playback_time = *playback_time,
                has_pending,
                "holding back sample"
            );
            return None;
        }

        Self::pop(&mut streams[index], playback_time)
    }

    /// Pick the earliest queued sample regardless of pacing, used to drain
    /// the queues once the presentation has ended
    pub fn select_unpaced(
        &self,
        streams: &mut [StreamQueue],
        playback_time: &mut u64,
    ) -> Option<Selected> {
        let mut earliest: Option<(usize, u64)> = None;
        for (index, stream) in streams.iter().enumerate() {
            if let Some(start) = stream.head_start() {
                if earliest.map_or(true, |(_, best)| start < best) {
                    earliest = Some((index, start));
                }
            }
        }
        let (index, _) = earliest?;
        Self::pop(&mut streams[index], playback_time)
    }

    fn pop(stream: &mut StreamQueue, playback_time: &mut u64) -> Option<Selected> {
        let sample = stream.samples.pop_front()?;
        if sample.end_time > *playback_time {
            *playback_time = sample.end_time;
        }
        Some(Selected {
            sample,
            major_type: stream.major_type,
            width: stream.width,
            height: stream.height,
        })
    }
}
