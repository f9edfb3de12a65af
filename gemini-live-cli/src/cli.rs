//! Command line arguments.

use clap::Parser;
use gemini_live::Modality;
use std::path::PathBuf;

/// Talk to a Gemini Live model from the terminal.
///
/// Each line read from stdin is sent as a prompt. Transcripts and text
/// replies are printed as they arrive. Type `/quit` or press Ctrl-C to exit.
#[derive(Parser, Debug, Default)]
#[command(name = "gemini-live")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "GEMINI_LIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Model identifier, e.g. models/gemini-2.0-flash-live-001
    #[arg(short, long)]
    pub model: Option<String>,

    /// Prebuilt voice name
    #[arg(long)]
    pub voice: Option<String>,

    /// BCP-47 language code for speech output
    #[arg(long)]
    pub language: Option<String>,

    /// Response modality (text or audio)
    #[arg(long)]
    pub modality: Option<Modality>,

    /// System instruction
    #[arg(short, long)]
    pub instruction: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Request transcripts of audio input
    #[arg(long)]
    pub input_transcription: bool,

    /// Do not request transcripts of audio output
    #[arg(long)]
    pub no_output_transcription: bool,

    /// Websocket endpoint (overrides the public Gemini endpoint)
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "gemini-live",
            "--model",
            "models/x",
            "--modality",
            "text",
            "--temperature",
            "0.5",
            "--no-output-transcription",
        ])
        .unwrap();

        assert_eq!(cli.model.as_deref(), Some("models/x"));
        assert_eq!(cli.modality, Some(Modality::Text));
        assert_eq!(cli.temperature, Some(0.5));
        assert!(cli.no_output_transcription);
        assert!(!cli.input_transcription);
    }

    #[test]
    fn rejects_unknown_modality() {
        assert!(Cli::try_parse_from(["gemini-live", "--modality", "smell"]).is_err());
    }
}
