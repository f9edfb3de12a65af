//! Event types emitted by a live session.
//!
//! Every concrete event is its own struct so listeners can subscribe to one
//! kind with a strongly typed callback. [`LiveEvent`] is the closed union of
//! all of them and is what wildcard listeners receive.

use crate::config::Modality;
use std::sync::Arc;

// ── Interactions ────────────────────────────────────────────────────────

/// Author of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionRole {
    /// System instruction.
    System,
    /// End user.
    User,
    /// The model.
    Model,
}

/// Decoded audio payload: mono samples normalized to roughly `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPart {
    /// Sample rate in Hz, taken from the `rate=` MIME parameter.
    pub sample_rate: u32,
    /// Normalized samples.
    pub samples: Arc<[f32]>,
}

impl AudioPart {
    /// Duration of the audio in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// One typed unit of content within a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionPart {
    /// UTF-8 text.
    Text(String),
    /// PCM audio.
    Audio(AudioPart),
    /// A payload that could not be understood. Kept so protocol drift is visible.
    Invalid {
        /// Why the part was rejected.
        reason: String,
    },
}

impl InteractionPart {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid { reason: reason.into() }
    }

    /// Text content, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Audio content, if this is an audio part.
    pub fn as_audio(&self) -> Option<&AudioPart> {
        match self {
            Self::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    /// Whether this part failed to decode.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// A role-tagged, ordered sequence of parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Who produced the content.
    pub role: InteractionRole,
    /// Parts in wire order.
    pub parts: Vec<InteractionPart>,
}

impl Interaction {
    /// Create a new interaction.
    pub fn new(role: InteractionRole, parts: Vec<InteractionPart>) -> Self {
        Self { role, parts }
    }

    /// Concatenation of all text parts.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(InteractionPart::as_text).collect()
    }

    /// Iterate over the audio parts.
    pub fn audio(&self) -> impl Iterator<Item = &AudioPart> {
        self.parts.iter().filter_map(InteractionPart::as_audio)
    }
}

/// Which side of the conversation a transcript belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptionDirection {
    /// Transcript of the model's audio output.
    Output,
    /// Transcript of the user's audio input.
    Input,
}

/// Token count for one modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDetail {
    /// Modality the tokens were spent on.
    pub modality: Modality,
    /// Number of tokens.
    pub token_count: u64,
}

// ── Concrete events ─────────────────────────────────────────────────────

/// The transport is open and the setup frame was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStarted {
    /// Identifier of this connection, unique per start.
    pub session_id: String,
}

/// The server acknowledged the setup frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReady;

/// The session was ended and the transport released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnded;

/// The server sent a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerClosedSession {
    /// Close status code, if the frame carried one.
    pub code: Option<u16>,
    /// Close reason reported by the server.
    pub reason: String,
}

/// A complete inbound frame, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReceived {
    /// Raw JSON text.
    pub json: String,
}

/// A prompt passed sanitization and was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSubmitted {
    /// Prompt as given by the caller.
    pub raw: String,
    /// Prompt after the sanitizer pipeline ran.
    pub sanitized: String,
}

/// The model produced content.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionReceived {
    /// Decoded content.
    pub interaction: Interaction,
}

/// A transcript fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    /// Input or output side.
    pub direction: TranscriptionDirection,
    /// Transcript text.
    pub text: String,
}

/// The model finished generating for the current turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationComplete;

/// The current turn is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnComplete;

/// Token accounting reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsageMetrics {
    /// Tokens in the prompt.
    pub prompt_token_count: u64,
    /// Tokens in the response.
    pub response_token_count: u64,
    /// Total tokens.
    pub total_token_count: u64,
    /// Per-modality prompt tokens.
    pub prompt_details: Vec<TokenDetail>,
    /// Per-modality response tokens.
    pub response_details: Vec<TokenDetail>,
}

// ── Union + type tags ───────────────────────────────────────────────────

/// Runtime tag identifying the concrete event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`SessionStarted`]
    SessionStarted,
    /// [`SessionReady`]
    SessionReady,
    /// [`SessionEnded`]
    SessionEnded,
    /// [`ServerClosedSession`]
    ServerClosedSession,
    /// [`FrameReceived`]
    FrameReceived,
    /// [`PromptSubmitted`]
    PromptSubmitted,
    /// [`InteractionReceived`]
    InteractionReceived,
    /// [`Transcription`]
    Transcription,
    /// [`GenerationComplete`]
    GenerationComplete,
    /// [`TurnComplete`]
    TurnComplete,
    /// [`UsageMetrics`]
    UsageMetrics,
}

/// Any event emitted by a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// See [`SessionStarted`].
    SessionStarted(SessionStarted),
    /// See [`SessionReady`].
    SessionReady(SessionReady),
    /// See [`SessionEnded`].
    SessionEnded(SessionEnded),
    /// See [`ServerClosedSession`].
    ServerClosedSession(ServerClosedSession),
    /// See [`FrameReceived`].
    FrameReceived(FrameReceived),
    /// See [`PromptSubmitted`].
    PromptSubmitted(PromptSubmitted),
    /// See [`InteractionReceived`].
    InteractionReceived(InteractionReceived),
    /// See [`Transcription`].
    Transcription(Transcription),
    /// See [`GenerationComplete`].
    GenerationComplete(GenerationComplete),
    /// See [`TurnComplete`].
    TurnComplete(TurnComplete),
    /// See [`UsageMetrics`].
    UsageMetrics(UsageMetrics),
}

/// Implemented by every concrete event struct.
pub trait LiveEventType: Clone + Send + Sync + 'static {
    /// Tag of this event type.
    const KIND: EventKind;

    /// Borrow the concrete event out of the union, if the kinds match.
    fn from_event(event: &LiveEvent) -> Option<&Self>;

    /// Wrap into the union.
    fn into_event(self) -> LiveEvent;
}

macro_rules! live_event_types {
    ($($name:ident),* $(,)?) => {
        impl LiveEvent {
            /// Tag of the wrapped event.
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Self::$name(_) => EventKind::$name,)*
                }
            }
        }

        $(
            impl LiveEventType for $name {
                const KIND: EventKind = EventKind::$name;

                fn from_event(event: &LiveEvent) -> Option<&Self> {
                    match event {
                        LiveEvent::$name(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn into_event(self) -> LiveEvent {
                    LiveEvent::$name(self)
                }
            }

            impl From<$name> for LiveEvent {
                fn from(event: $name) -> Self {
                    LiveEvent::$name(event)
                }
            }
        )*
    };
}

live_event_types!(
    SessionStarted,
    SessionReady,
    SessionEnded,
    ServerClosedSession,
    FrameReceived,
    PromptSubmitted,
    InteractionReceived,
    Transcription,
    GenerationComplete,
    TurnComplete,
    UsageMetrics,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let event: LiveEvent = TurnComplete.into();
        assert_eq!(event.kind(), EventKind::TurnComplete);
        assert_eq!(<TurnComplete as LiveEventType>::KIND, EventKind::TurnComplete);
    }

    #[test]
    fn from_event_downcasts() {
        let event = Transcription {
            direction: TranscriptionDirection::Input,
            text: "hello".to_string(),
        }
        .into_event();

        let t = Transcription::from_event(&event).unwrap();
        assert_eq!(t.text, "hello");
        assert!(TurnComplete::from_event(&event).is_none());
    }

    #[test]
    fn interaction_helpers() {
        let interaction = Interaction::new(
            InteractionRole::Model,
            vec![
                InteractionPart::Text("a".into()),
                InteractionPart::Audio(AudioPart {
                    sample_rate: 1000,
                    samples: Arc::from(vec![0.0f32; 500]),
                }),
                InteractionPart::invalid("bad"),
                InteractionPart::Text("b".into()),
            ],
        );
        assert_eq!(interaction.text(), "ab");
        let audio: Vec<_> = interaction.audio().collect();
        assert_eq!(audio.len(), 1);
        assert!((audio[0].duration_ms() - 500.0).abs() < f64::EPSILON);
        assert!(interaction.parts[2].is_invalid());
    }
}
