//! # gemini-live
//!
//! Client for the Gemini Live bidirectional streaming API.
//!
//! A [`LiveSession`] opens one websocket connection, sends the setup frame
//! built from a [`LiveConfig`], streams text prompts, and decodes every
//! inbound frame into typed events that fan out to registered listeners.
//!
//! ## Architecture
//!
//! ```text
//!   prompt ──► SanitizerPipeline ──► encode ──► send mutex ──► websocket
//!                                                                  │
//!   listeners ◄── EventBus ◄── decode_frame ◄── receive loop ◄─────┘
//!       │
//!       └──► add_playback ──► AudioRingBuffer ──► device pull callback
//! ```
//!
//! ## Features
//!
//! - **Typed events**: subscribe to one event type or to all of them
//! - **Tolerant decoding**: unknown keys are ignored, malformed parts surface as
//!   [`InteractionPart::Invalid`] instead of aborting the frame
//! - **Pluggable sanitizers**: filters can rewrite or veto prompts before they
//!   are sent
//! - **Audio playback**: decoded PCM is pushed into a bounded ring buffer that an
//!   audio device drains at its own pace
//!
//! ## Example
//!
//! ```rust,ignore
//! use gemini_live::{AccessToken, LiveConfig, LiveSession, Transcription};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let session = Arc::new(LiveSession::new(AccessToken::new(api_key), LiveConfig::default()));
//! session.add_listener(|evt: Transcription, _cancel| async move {
//!     println!("{}", evt.text);
//!     Ok(())
//! });
//!
//! let cancel = CancellationToken::new();
//! let receiver = tokio::spawn({
//!     let (session, cancel) = (session.clone(), cancel.clone());
//!     async move { session.start_session(&cancel).await }
//! });
//!
//! session.prompt("Tell me a joke", &cancel).await?;
//! ```

pub mod audio;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod playback;
pub mod protocol;
pub mod sanitize;
pub mod session;

// Re-exports
pub use audio::AudioRingBuffer;
pub use config::{GenerationConfig, LiveConfig, Modality, SpeechConfig, ThinkingConfig};
pub use credential::AccessToken;
pub use dispatch::{EventBus, ListenerError, ListenerId, ListenerResult};
pub use error::{LiveError, Result};
pub use events::{
    AudioPart, EventKind, FrameReceived, GenerationComplete, Interaction, InteractionPart,
    InteractionReceived, InteractionRole, LiveEvent, LiveEventType, PromptSubmitted,
    ServerClosedSession, SessionEnded, SessionReady, SessionStarted, TokenDetail, Transcription,
    TranscriptionDirection, TurnComplete, UsageMetrics,
};
pub use playback::{PlaybackDevice, PlaybackFinishedHandle, StreamedPlayback};
pub use sanitize::{FilterId, PromptFilter, SanitizerPipeline, Verdict, json_escape};
pub use session::{ExceptionHandler, LiveSession, PromptOutcome, SessionState};
