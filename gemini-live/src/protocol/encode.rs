//! Outbound frame encoding.

use crate::config::{LiveConfig, Modality};
use crate::sanitize::json_escape;
use serde_json::{Map, Value, json};

/// Build the `setup` frame sent once, right after the socket opens.
///
/// Optional sections are omitted rather than sent empty: speech settings
/// only accompany an audio response modality, and an empty system
/// instruction is left out entirely.
pub fn encode_setup(config: &LiveConfig) -> String {
    let generation = &config.generation;

    let mut generation_config = json!({
        "maxOutputTokens": generation.max_output_tokens,
        "temperature": generation.temperature,
        "topP": generation.top_p,
        "topK": generation.top_k,
        "thinkingConfig": {
            "includeThoughts": generation.thinking.include_thoughts,
            "thinkingBudget": generation.thinking.thinking_budget,
        },
        "responseModalities": [generation.response_modality.as_str()],
    });
    if let (Modality::Audio, Some(speech)) = (generation.response_modality, &generation.speech) {
        generation_config["speechConfig"] = json!({
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": speech.voice } },
            "languageCode": speech.language_code,
        });
    }

    let mut setup = Map::new();
    setup.insert("model".into(), Value::String(config.model.clone()));
    setup.insert("generationConfig".into(), generation_config);
    if config.sliding_context_window {
        setup.insert("contextWindowCompression".into(), json!({ "slidingWindow": {} }));
    }
    if config.input_transcription {
        setup.insert("inputAudioTranscription".into(), json!({}));
    }
    if config.output_transcription {
        setup.insert("outputAudioTranscription".into(), json!({}));
    }
    if !config.system_instruction.is_empty() {
        setup.insert(
            "systemInstruction".into(),
            json!({ "parts": [{ "text": config.system_instruction }] }),
        );
    }

    json!({ "setup": setup }).to_string()
}

/// Build a `realtimeInput` frame for an already-sanitized prompt.
pub fn encode_prompt(sanitized: &str) -> String {
    format!(r#"{{"realtimeInput":{{"text":"{}"}}}}"#, json_escape(sanitized))
}
