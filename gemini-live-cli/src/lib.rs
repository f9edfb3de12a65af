//! Terminal client for Gemini Live sessions.
//!
//! The binary wires these pieces together: [`cli::Cli`] parses flags,
//! [`config::AppConfig`] merges them with an optional TOML file,
//! [`telemetry::init_telemetry`] installs logging, and [`app::run`] drives the
//! conversation.

pub mod app;
pub mod cli;
pub mod config;
pub mod telemetry;
