//! Playback adapter.
//!
//! A [`PlaybackDevice`] is the pull side of audio output: the session pushes
//! decoded samples into the ring buffer the device hands out, and the device
//! drains it from its own audio callback. [`StreamedPlayback`] is a ready-made
//! device that keeps the bookkeeping needed to tell when a buffered fragment
//! has finished playing.

use crate::audio::AudioRingBuffer;
use crate::dispatch::{ListenerId, ListenerResult};
use crate::error::Result;
use crate::events::{InteractionReceived, TurnComplete};
use crate::session::LiveSession;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Default length of the playback buffer.
pub const DEFAULT_BUFFER_SECONDS: u32 = 240;

/// An audio output that consumes samples at its own pace.
pub trait PlaybackDevice: Send + Sync {
    /// Open the output at `sample_rate` and return the buffer to write into.
    fn connect(&self, sample_rate: u32) -> Result<Arc<AudioRingBuffer>>;

    /// Whether [`connect`](Self::connect) has been called and not undone.
    fn is_connected(&self) -> bool;
}

/// Callback fired when a buffered fragment finishes playing.
pub type FragmentCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle for a registered [`FragmentCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentCallbackId(u64);

struct PlaybackState {
    stream: Option<Arc<AudioRingBuffer>>,
    sample_rate: u32,
    samples_remaining: usize,
}

/// Pull-based playback over an [`AudioRingBuffer`].
///
/// The host audio driver calls [`on_audio_read`](Self::on_audio_read) from its
/// fixed-size callback and [`advance`](Self::advance) with the number of
/// samples it actually played since the last call.
pub struct StreamedPlayback {
    buffer_seconds: u32,
    state: Mutex<PlaybackState>,
    callbacks: RwLock<Vec<(FragmentCallbackId, FragmentCallback)>>,
    next_id: AtomicU64,
}

impl Default for StreamedPlayback {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SECONDS)
    }
}

impl StreamedPlayback {
    /// Create a disconnected playback with room for `buffer_seconds` of audio.
    pub fn new(buffer_seconds: u32) -> Self {
        Self {
            buffer_seconds,
            state: Mutex::new(PlaybackState { stream: None, sample_rate: 0, samples_remaining: 0 }),
            callbacks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Sample rate of the current connection, or 0 when disconnected.
    pub fn sample_rate(&self) -> u32 {
        self.state.lock().sample_rate
    }

    /// Samples written but not yet reported as played.
    pub fn samples_remaining(&self) -> usize {
        self.state.lock().samples_remaining
    }

    /// Fixed-size pull callback. Always fills `out` completely.
    ///
    /// Returns the number of real samples delivered; the rest is silence.
    pub fn on_audio_read(&self, out: &mut [f32]) -> usize {
        let mut state = self.state.lock();
        let Some(stream) = state.stream.clone() else {
            out.fill(0.0);
            return 0;
        };
        let delivered = stream.read(out);
        state.samples_remaining += stream.drain_delta();
        delivered
    }

    /// Report `played` samples as heard.
    ///
    /// Returns `true` when this call finished the buffered fragment, in which
    /// case the fragment callbacks have been invoked.
    pub fn advance(&self, played: usize) -> bool {
        let finished = {
            let mut state = self.state.lock();
            if state.stream.is_none() || state.samples_remaining == 0 {
                return false;
            }
            state.samples_remaining = state.samples_remaining.saturating_sub(played);
            state.samples_remaining == 0
        };

        if finished {
            tracing::debug!("Audio fragment finished playing");
            let callbacks: Vec<FragmentCallback> =
                self.callbacks.read().iter().map(|(_, cb)| Arc::clone(cb)).collect();
            for callback in callbacks {
                callback();
            }
        }
        finished
    }

    /// Drop the buffer and go back to the disconnected state.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.stream = None;
        state.sample_rate = 0;
        state.samples_remaining = 0;
    }

    /// Register a callback for finished fragments.
    pub fn add_fragment_callback(&self, callback: FragmentCallback) -> FragmentCallbackId {
        let id = FragmentCallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().push((id, callback));
        id
    }

    /// Remove a fragment callback. Returns `false` if it was not registered.
    pub fn remove_fragment_callback(&self, id: FragmentCallbackId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }
}

impl PlaybackDevice for StreamedPlayback {
    fn connect(&self, sample_rate: u32) -> Result<Arc<AudioRingBuffer>> {
        let stream = Arc::new(AudioRingBuffer::with_duration(sample_rate, self.buffer_seconds)?);
        let mut state = self.state.lock();
        state.stream = Some(Arc::clone(&stream));
        state.sample_rate = sample_rate;
        state.samples_remaining = 0;
        tracing::info!(sample_rate, buffer_seconds = self.buffer_seconds, "Playback connected");
        Ok(stream)
    }

    fn is_connected(&self) -> bool {
        self.state.lock().stream.is_some()
    }
}

impl std::fmt::Debug for StreamedPlayback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StreamedPlayback")
            .field("buffer_seconds", &self.buffer_seconds)
            .field("connected", &state.stream.is_some())
            .field("sample_rate", &state.sample_rate)
            .field("samples_remaining", &state.samples_remaining)
            .finish()
    }
}

/// Handles returned by [`LiveSession::add_playback_finished_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackFinishedHandle {
    listener: ListenerId,
    callback: FragmentCallbackId,
}

fn write_audio(
    device: &dyn PlaybackDevice,
    slot: &Mutex<Option<Arc<AudioRingBuffer>>>,
    event: &InteractionReceived,
) -> ListenerResult {
    let mut slot = slot.lock();
    for audio in event.interaction.audio() {
        if !device.is_connected() || slot.is_none() {
            *slot = Some(device.connect(audio.sample_rate)?);
        }
        if let Some(stream) = slot.as_ref() {
            stream.write(&audio.samples);
        }
    }
    Ok(())
}

impl LiveSession {
    /// Route every audio part the model sends into `device`.
    ///
    /// The device is connected lazily at the sample rate of the first audio
    /// part. Remove the routing again with [`LiveSession::remove_listener`].
    pub fn add_playback(&self, device: Arc<dyn PlaybackDevice>) -> ListenerId {
        let slot = Arc::new(Mutex::new(None));
        self.add_listener(move |event: InteractionReceived, _cancel| {
            let result = write_audio(device.as_ref(), &slot, &event);
            async move { result }
        })
    }

    /// Call `handler` once playback of a completed turn has finished.
    ///
    /// A turn-complete event arms the handler; the next finished fragment on
    /// `playback` fires it and disarms it again.
    pub fn add_playback_finished_handler<F>(
        &self,
        playback: &StreamedPlayback,
        handler: F,
    ) -> PlaybackFinishedHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let turn_ended = Arc::new(AtomicBool::new(false));

        let armed = Arc::clone(&turn_ended);
        let listener = self.add_listener(move |_: TurnComplete, _cancel| {
            armed.store(true, Ordering::SeqCst);
            async { Ok(()) }
        });

        let callback = playback.add_fragment_callback(Arc::new(move || {
            if turn_ended.swap(false, Ordering::SeqCst) {
                handler();
            }
        }));

        PlaybackFinishedHandle { listener, callback }
    }

    /// Undo [`add_playback_finished_handler`](Self::add_playback_finished_handler).
    pub fn remove_playback_finished_handler(
        &self,
        playback: &StreamedPlayback,
        handle: PlaybackFinishedHandle,
    ) -> bool {
        let removed_listener = self.remove_listener(handle.listener);
        let removed_callback = playback.remove_fragment_callback(handle.callback);
        removed_listener && removed_callback
    }
}
