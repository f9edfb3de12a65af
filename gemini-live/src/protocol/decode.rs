//! Inbound frame decoding.
//!
//! Decoding is structural pattern matching over a `serde_json::Value`, not
//! schema validation: fields that are missing or have the wrong shape are
//! skipped or defaulted instead of failing the whole frame.

use crate::audio::MAX_SAMPLE_RATE;
use crate::config::Modality;
use crate::error::{LiveError, Result};
use crate::events::{
    AudioPart, GenerationComplete, Interaction, InteractionPart, InteractionReceived,
    InteractionRole, LiveEvent, SessionReady, TokenDetail, Transcription, TranscriptionDirection,
    TurnComplete, UsageMetrics,
};
use base64::Engine;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Decode one complete inbound frame into the events it carries.
///
/// A frame can produce several events (e.g. an interaction followed by a
/// turn-complete marker) or none at all. Text that is not a JSON object is a
/// [`LiveError::Decode`].
pub fn decode_frame(text: &str) -> Result<Vec<LiveEvent>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| LiveError::decode(format!("'{}' ({})", text, e)))?;
    let Value::Object(frame) = value else {
        return Err(LiveError::decode(format!("'{}' (not a JSON object)", text)));
    };

    let mut events = Vec::new();

    if frame.contains_key("setupComplete") {
        events.push(SessionReady.into());
    }

    if let Some(Value::Object(content)) = frame.get("serverContent") {
        decode_server_content(content, &mut events);
    }

    if let Some(Value::Object(usage)) = frame.get("usageMetadata") {
        events.push(decode_usage(usage).into());
    }

    Ok(events)
}

fn decode_server_content(content: &Map<String, Value>, events: &mut Vec<LiveEvent>) {
    if let Some(Value::Array(parts)) = content.get("modelTurn").and_then(|turn| turn.get("parts")) {
        let parts = parts.iter().map(decode_part).collect();
        let interaction = Interaction::new(InteractionRole::Model, parts);
        events.push(InteractionReceived { interaction }.into());
    }

    for (key, direction) in [
        ("outputTranscription", TranscriptionDirection::Output),
        ("inputTranscription", TranscriptionDirection::Input),
    ] {
        if let Some(Value::Object(transcription)) = content.get(key) {
            if let Some(Value::String(text)) = transcription.get("text") {
                events.push(Transcription { direction, text: text.clone() }.into());
            }
        }
    }

    if flag(content, "generationComplete") {
        events.push(GenerationComplete.into());
    }
    if flag(content, "turnComplete") {
        events.push(TurnComplete.into());
    }
}

fn flag(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Decode one element of `modelTurn.parts`.
///
/// `inlineData` with an `audio/pcm;rate=N` MIME type is decoded into samples;
/// other inline data falls back to the `text` field. Anything unusable becomes
/// [`InteractionPart::Invalid`].
pub fn decode_part(part: &Value) -> InteractionPart {
    let Value::Object(part) = part else {
        return InteractionPart::invalid("part is not a JSON object");
    };

    if let Some(Value::Object(inline)) = part.get("inlineData") {
        if let (Some(Value::String(mime_type)), Some(data)) =
            (inline.get("mimeType"), inline.get("data"))
        {
            let mut fields = mime_type.split(';');
            let primary = fields.next().unwrap_or_default().trim().to_ascii_lowercase();
            if primary == "audio/pcm" {
                return decode_pcm(fields, data);
            }
        }
    }

    match part.get("text") {
        Some(Value::String(text)) => InteractionPart::Text(text.clone()),
        _ => InteractionPart::invalid("no usable inlineData or text"),
    }
}

fn decode_pcm<'a>(params: impl Iterator<Item = &'a str>, data: &Value) -> InteractionPart {
    let rate = params.filter_map(|param| param.split_once('=')).find_map(|(key, value)| {
        key.trim().eq_ignore_ascii_case("rate").then(|| value.trim().parse::<u32>().ok()).flatten()
    });
    let Some(sample_rate) = rate else {
        return InteractionPart::invalid("audio/pcm without a valid rate parameter");
    };
    if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
        return InteractionPart::invalid(format!("unsupported audio/pcm rate {}", sample_rate));
    }
    let Value::String(data) = data else {
        return InteractionPart::invalid("audio data is not a string");
    };

    match base64::engine::general_purpose::STANDARD.decode(data) {
        Ok(bytes) => {
            InteractionPart::Audio(AudioPart { sample_rate, samples: pcm16_to_f32(&bytes) })
        }
        Err(e) => InteractionPart::invalid(format!("audio data is not valid base64: {}", e)),
    }
}

/// Convert signed 16-bit little-endian PCM into samples normalized by 32768.
///
/// A trailing odd byte is ignored.
pub(crate) fn pcm16_to_f32(bytes: &[u8]) -> Arc<[f32]> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

fn decode_usage(usage: &Map<String, Value>) -> UsageMetrics {
    UsageMetrics {
        prompt_token_count: count(usage.get("promptTokenCount")),
        response_token_count: count(usage.get("responseTokenCount")),
        total_token_count: count(usage.get("totalTokenCount")),
        prompt_details: token_details(usage.get("promptTokensDetails")),
        response_details: token_details(usage.get("responseTokensDetails")),
    }
}

/// Lenient integer extraction. Missing or non-numeric values count as zero.
fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn token_details(value: Option<&Value>) -> Vec<TokenDetail> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| TokenDetail {
            modality: item
                .get("modality")
                .and_then(Value::as_str)
                .map(Modality::parse_or_text)
                .unwrap_or_default(),
            token_count: count(item.get("tokenCount")),
        })
        .collect()
}
