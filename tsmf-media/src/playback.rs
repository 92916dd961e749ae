//! Per-presentation playback thread
//!
//! The thread repeatedly asks the scheduler for the next sample, hands it to
//! the audio sink or the display, and acknowledges it. When nothing is ready
//! it parks on the presentation's wake condition for the idle interval.

use crate::error::{MediaError, MediaResult};
use crate::presentation::Presentation;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle of a presentation's playback thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Never started
    #[default]
    Idle,
    /// Releasing samples
    Running,
    /// Stop requested after end of stream; playing out what is left
    Draining,
    /// Thread has exited
    Stopped,
}

impl PlaybackState {
    /// Whether a playback thread exists for this state
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Running | PlaybackState::Draining)
    }
}

/// Lifecycle bookkeeping for one playback thread
pub(crate) struct PlaybackThread {
    state: Mutex<PlaybackState>,
    changed: Condvar,
    exit: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackThread {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(PlaybackState::Idle),
            changed: Condvar::new(),
            exit: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, next: PlaybackState) {
        *self.state.lock() = next;
        self.changed.notify_all();
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    pub(crate) fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    /// Spawn `body` unless a thread is already active. `prepare` runs first,
    /// while no thread can observe the presentation. Returns whether a
    /// thread was spawned.
    pub(crate) fn start<P, B>(&self, name: String, prepare: P, body: B) -> MediaResult<bool>
    where
        P: FnOnce(),
        B: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.is_active() {
            debug!(state = ?*state, "playback thread already active");
            return Ok(false);
        }

        prepare();
        self.exit.store(false, Ordering::SeqCst);

        let previous = *state;
        *state = PlaybackState::Running;
        let handle = match thread::Builder::new().name(name).spawn(body) {
            Ok(handle) => handle,
            Err(e) => {
                *state = previous;
                return Err(MediaError::Io { source: e });
            }
        };

        *self.handle.lock() = Some(handle);
        Ok(true)
    }

    /// Block until the thread has stopped, re-checking every
    /// `poll_interval`, then join it
    pub(crate) fn wait_stopped(&self, poll_interval: Duration) {
        let handle = {
            let mut slot = self.handle.lock();
            let on_playback_thread = slot
                .as_ref()
                .map_or(false, |h| h.thread().id() == thread::current().id());
            if on_playback_thread {
                // Called from a sink callback; the thread sees the exit flag
                // once the callback returns.
                warn!("stop requested from the playback thread, not waiting");
                return;
            }
            slot.take()
        };

        let mut state = self.state.lock();
        while state.is_active() {
            self.changed.wait_for(&mut state, poll_interval);
        }
        drop(state);

        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("playback thread panicked");
            }
        }
    }
}

/// Marks the thread stopped when the body returns or unwinds
struct StoppedGuard<'a>(&'a PlaybackThread);

impl Drop for StoppedGuard<'_> {
    fn drop(&mut self) {
        self.0.set_state(PlaybackState::Stopped);
    }
}

/// Body of the playback thread
pub(crate) fn run(presentation: Arc<Presentation>) {
    let _stopped = StoppedGuard(presentation.playback_thread());
    let id = presentation.id();
    info!(presentation = %id, "playback started");

    presentation.open_audio_sink();

    let mut dispatched: u64 = 0;
    while !presentation.playback_thread().exit_requested() {
        match presentation.next_sample() {
            Some(selected) => {
                presentation.dispatch(selected);
                dispatched += 1;
            }
            None => presentation.idle_wait(),
        }
    }

    if presentation.is_eos() {
        presentation
            .playback_thread()
            .set_state(PlaybackState::Draining);

        let mut drained: u64 = 0;
        while let Some(selected) = presentation.next_sample_unpaced() {
            presentation.dispatch(selected);
            drained += 1;
        }
        debug!(presentation = %id, drained, "queues drained after end of stream");
        dispatched += drained;

        presentation.wait_audio_drained();
    }

    presentation.release_audio_sink();
    info!(presentation = %id, dispatched, "playback stopped");
}
