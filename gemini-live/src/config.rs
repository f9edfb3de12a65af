//! Configuration types for live sessions.
//!
//! A [`LiveConfig`] is serialized once into the `setup` frame when a session
//! starts. The session never mutates it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known model identifiers for the bidirectional endpoint.
pub mod models {
    /// Gemini 2.0 Flash experimental.
    pub const FLASH_2_0_EXPERIMENTAL: &str = "models/gemini-2.0-flash-exp";
    /// Gemini 2.0 Flash live.
    pub const FLASH_2_0_LIVE: &str = "models/gemini-2.0-flash-live-001";
    /// Gemini 2.5 Flash live preview.
    pub const FLASH_2_5_LIVE_PREVIEW: &str = "models/gemini-live-2.5-flash-preview";
    /// Gemini 2.5 Flash native audio.
    pub const FLASH_2_5_NATIVE_AUDIO: &str = "models/gemini-2.5-flash-native-audio-latest";
}

/// Prebuilt voice names. Availability varies by model.
pub mod voices {
    /// Default voice.
    pub const ZEPHYR: &str = "Zephyr";
    /// Every known prebuilt voice.
    pub const ALL: &[&str] = &[
        "Zephyr", "Puck", "Charon", "Kore", "Fenrir", "Leda", "Orus", "Aoede", "Callirrhoe",
        "Autonoe", "Enceladus", "Iapetus", "Umbriel", "Algieba", "Despina", "Erinome", "Algenib",
        "Rasalgethi", "Laomedeia", "Achernar", "Alnilam", "Schedar", "Gacrux", "Pulcherrima",
        "Achird", "Zubenelgenubi", "Vindemiatrix", "Sadachbia", "Sadaltager", "Sulafat",
    ];
}

/// BCP-47 language codes accepted for speech output.
pub mod languages {
    pub const GERMAN_GERMANY: &str = "de-DE";
    pub const ENGLISH_AUSTRALIA: &str = "en-AU";
    pub const ENGLISH_GREAT_BRITAIN: &str = "en-GB";
    pub const ENGLISH_INDIA: &str = "en-IN";
    pub const ENGLISH_UNITED_STATES: &str = "en-US";
    pub const SPANISH_UNITED_STATES: &str = "es-US";
    pub const FRENCH_FRANCE: &str = "fr-FR";
    pub const HINDI_INDIA: &str = "hi-IN";
    pub const PORTUGUESE_BRAZIL: &str = "pt-BR";
    pub const SPANISH_SPAIN: &str = "es-ES";
    pub const FRENCH_CANADA: &str = "fr-CA";
    pub const INDONESIAN_INDONESIA: &str = "id-ID";
    pub const ITALIAN_ITALY: &str = "it-IT";
    pub const JAPANESE_JAPAN: &str = "ja-JP";
    pub const TURKISH_TURKEY: &str = "tr-TR";
    pub const VIETNAMESE_VIETNAM: &str = "vi-VN";
    pub const BENGALI_INDIA: &str = "bn-IN";
    pub const GUJARATI_INDIA: &str = "gu-IN";
    pub const KANNADA_INDIA: &str = "kn-IN";
    pub const MALAYALAM_INDIA: &str = "ml-IN";
    pub const MARATHI_INDIA: &str = "mr-IN";
    pub const TAMIL_INDIA: &str = "ta-IN";
    pub const TELUGU_INDIA: &str = "te-IN";
    pub const DUTCH_NETHERLANDS: &str = "nl-NL";
    pub const KOREAN_SOUTH_KOREA: &str = "ko-KR";
    /// Mandarin, mainland China.
    pub const CHINESE_MANDARIN: &str = "cmn-CN";
    pub const POLISH_POLAND: &str = "pl-PL";
    pub const RUSSIAN_RUSSIA: &str = "ru-RU";
    pub const THAI_THAILAND: &str = "th-TH";
}

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful voice assistant connected through a \
     live session. Introduce yourself briefly and tell the user they can change this \
     instruction in the session configuration.";

/// Content modality, used for responses and token accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    /// Plain text.
    #[default]
    #[serde(alias = "text")]
    Text,
    /// Images.
    #[serde(alias = "image")]
    Image,
    /// Video.
    #[serde(alias = "video")]
    Video,
    /// Audio.
    #[serde(alias = "audio")]
    Audio,
    /// Documents such as PDFs.
    #[serde(alias = "document")]
    Document,
}

impl Modality {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
            Self::Audio => "AUDIO",
            Self::Document => "DOCUMENT",
        }
    }

    /// Parse a modality name, falling back to [`Modality::Text`] for anything unknown.
    pub fn parse_or_text(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(Self::Text),
            "IMAGE" => Ok(Self::Image),
            "VIDEO" => Ok(Self::Video),
            "AUDIO" => Ok(Self::Audio),
            "DOCUMENT" => Ok(Self::Document),
            other => Err(format!("unknown modality '{}'", other)),
        }
    }
}

/// Speech synthesis settings, used when the response modality is audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Prebuilt voice name.
    pub voice: String,
    /// BCP-47 language code, e.g. `en-US`.
    pub language_code: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: voices::ZEPHYR.to_string(),
            language_code: languages::ENGLISH_UNITED_STATES.to_string(),
        }
    }
}

/// Thinking trace settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThinkingConfig {
    /// Whether thought summaries are included in responses.
    pub include_thoughts: bool,
    /// Token budget for thinking. Zero disables it.
    pub thinking_budget: i32,
}

/// Sampling and output settings for generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum number of output tokens.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling probability mass.
    pub top_p: f64,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Modality of generated responses.
    pub response_modality: Modality,
    /// Speech settings. Only sent when `response_modality` is audio.
    pub speech: Option<SpeechConfig>,
    /// Thinking settings.
    pub thinking: ThinkingConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 65536,
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            response_modality: Modality::Audio,
            speech: Some(SpeechConfig::default()),
            thinking: ThinkingConfig::default(),
        }
    }
}

/// Immutable configuration sent in the setup frame of a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Model identifier, e.g. `models/gemini-2.0-flash-exp`.
    pub model: String,
    /// Generation settings.
    pub generation: GenerationConfig,
    /// Request transcripts of the user's audio input.
    pub input_transcription: bool,
    /// Request transcripts of the model's audio output.
    pub output_transcription: bool,
    /// System instruction. An empty string omits it from the setup frame.
    pub system_instruction: String,
    /// Enable sliding-window context compression on the server.
    pub sliding_context_window: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: models::FLASH_2_0_EXPERIMENTAL.to_string(),
            generation: GenerationConfig::default(),
            input_transcription: false,
            output_transcription: true,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            sliding_context_window: true,
        }
    }
}

impl LiveConfig {
    /// Create a default configuration for the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), ..Default::default() }
    }

    /// Set the system instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Set the voice, creating speech settings if needed.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.generation.speech.get_or_insert_with(SpeechConfig::default).voice = voice.into();
        self
    }

    /// Set the speech language code, creating speech settings if needed.
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.generation.speech.get_or_insert_with(SpeechConfig::default).language_code =
            language_code.into();
        self
    }

    /// Set the response modality.
    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.generation.response_modality = modality;
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.generation.temperature = temperature;
        self
    }

    /// Set the maximum number of output tokens.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.generation.max_output_tokens = max;
        self
    }

    /// Toggle input/output transcription.
    pub fn with_transcription(mut self, input: bool, output: bool) -> Self {
        self.input_transcription = input;
        self.output_transcription = output;
        self
    }

    /// Toggle sliding-window context compression.
    pub fn with_sliding_context_window(mut self, enabled: bool) -> Self {
        self.sliding_context_window = enabled;
        self
    }

    /// Set thinking settings.
    pub fn with_thinking(mut self, include_thoughts: bool, budget: i32) -> Self {
        self.generation.thinking = ThinkingConfig { include_thoughts, thinking_budget: budget };
        self
    }
}
