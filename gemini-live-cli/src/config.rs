//! Configuration loading.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, command line
//! flags. The access token only ever comes from the environment (or `.env`).

use crate::cli::Cli;
use anyhow::{Context, Result};
use gemini_live::{AccessToken, LiveConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Everything the client needs besides the access token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Websocket endpoint override.
    pub endpoint: Option<String>,
    /// Session configuration sent in the setup frame.
    pub session: LiveConfig,
}

impl AppConfig {
    /// Load from a TOML file, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply command line flags on top of the loaded values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        let session = &mut self.session;
        if let Some(model) = &cli.model {
            session.model = model.clone();
        }
        if let Some(modality) = cli.modality {
            session.generation.response_modality = modality;
        }
        if let Some(instruction) = &cli.instruction {
            session.system_instruction = instruction.clone();
        }
        if let Some(temperature) = cli.temperature {
            session.generation.temperature = temperature;
        }
        if cli.input_transcription {
            session.input_transcription = true;
        }
        if cli.no_output_transcription {
            session.output_transcription = false;
        }
        if let Some(endpoint) = &cli.endpoint {
            self.endpoint = Some(endpoint.clone());
        }

        let mut session = std::mem::take(&mut self.session);
        if let Some(voice) = &cli.voice {
            session = session.with_voice(voice.clone());
        }
        if let Some(language) = &cli.language {
            session = session.with_language(language.clone());
        }
        self.session = session;
        self
    }
}

/// Read the access token from the environment.
pub fn access_token() -> Result<AccessToken> {
    AccessToken::from_env(API_KEY_VARS)
        .with_context(|| format!("No API key found. Set one of: {}", API_KEY_VARS.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemini_live::Modality;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
endpoint = "ws://127.0.0.1:9000/live"

[session]
model = "models/gemini-2.0-flash-live-001"
input_transcription = true

[session.generation]
temperature = 0.2
response_modality = "TEXT"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("ws://127.0.0.1:9000/live"));
        assert_eq!(config.session.model, "models/gemini-2.0-flash-live-001");
        assert!(config.session.input_transcription);
        assert!(config.session.output_transcription);
        assert_eq!(config.session.generation.temperature, 0.2);
        assert_eq!(config.session.generation.response_modality, Modality::Text);
        assert_eq!(config.session.generation.top_k, 40);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "session = 3").unwrap();
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn flags_override_file() {
        let cli = Cli {
            model: Some("models/flag".into()),
            voice: Some("Puck".into()),
            language: Some("nl-NL".into()),
            no_output_transcription: true,
            endpoint: Some("ws://localhost:1/".into()),
            ..Default::default()
        };
        let config = AppConfig::default().with_overrides(&cli);

        assert_eq!(config.session.model, "models/flag");
        let speech = config.session.generation.speech.unwrap();
        assert_eq!(speech.voice, "Puck");
        assert_eq!(speech.language_code, "nl-NL");
        assert!(!config.session.output_transcription);
        assert_eq!(config.endpoint.as_deref(), Some("ws://localhost:1/"));
    }
}
