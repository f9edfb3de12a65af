//! Wire protocol of the Gemini Live bidirectional endpoint.
//!
//! Outbound: one `setup` envelope when the connection opens, then any number
//! of `realtimeInput` envelopes. Inbound: JSON objects keyed by any of
//! `setupComplete`, `serverContent` and `usageMetadata`. Unknown top-level
//! keys are ignored.

mod decode;
mod encode;

pub use decode::{decode_frame, decode_part};
pub use encode::{encode_prompt, encode_setup};

/// Gemini Live bidirectional streaming endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
