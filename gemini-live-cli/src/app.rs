//! Interactive prompt loop.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use gemini_live::{
    AccessToken, InteractionReceived, LiveError, LiveSession, PromptOutcome, ServerClosedSession,
    Transcription, TranscriptionDirection, UsageMetrics,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Line that ends the conversation.
pub const QUIT_COMMAND: &str = "/quit";

/// Build a session from the loaded configuration.
pub fn build_session(config: &AppConfig, token: AccessToken) -> Result<LiveSession> {
    let session = LiveSession::new(token, config.session.clone());
    match &config.endpoint {
        Some(endpoint) => Ok(session.with_endpoint(endpoint)?),
        None => Ok(session),
    }
}

/// Print model output to stdout.
pub fn attach_printers(session: &LiveSession) {
    session.add_listener(|evt: Transcription, _| async move {
        let label = match evt.direction {
            TranscriptionDirection::Output => "model",
            TranscriptionDirection::Input => "you",
        };
        println!("[{}] {}", label, evt.text);
        Ok(())
    });
    session.add_listener(|evt: InteractionReceived, _| async move {
        let text = evt.interaction.text();
        if !text.is_empty() {
            println!("{}", text);
        }
        for part in &evt.interaction.parts {
            if let gemini_live::InteractionPart::Invalid { reason } = part {
                tracing::warn!(%reason, "Model sent a part that could not be decoded");
            }
        }
        Ok(())
    });
    session.add_listener(|evt: UsageMetrics, _| async move {
        tracing::debug!(
            prompt = evt.prompt_token_count,
            response = evt.response_token_count,
            total = evt.total_token_count,
            "Token usage"
        );
        Ok(())
    });
    session.add_listener(|evt: ServerClosedSession, _| async move {
        eprintln!("Server closed the session ({:?}): {}", evt.code, evt.reason);
        Ok(())
    });
}

/// Run a conversation: start the session, forward each input line as a
/// prompt, and shut down on `/quit`, end of input, cancellation or when the
/// server goes away.
pub async fn run<R>(session: Arc<LiveSession>, input: R, cancel: CancellationToken) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let receive_cancel = cancel.child_token();
    let mut receiver = tokio::spawn({
        let (session, cancel) = (session.clone(), receive_cancel.clone());
        async move { session.start_session(&cancel).await }
    });

    let mut lines = input.lines();
    let mut receiver_done = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            joined = &mut receiver => {
                receiver_done = true;
                finish(joined)?;
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else { break };
                let line = line.trim();
                if line == QUIT_COMMAND {
                    break;
                }
                match session.prompt(line, &cancel).await {
                    Ok(PromptOutcome::Sent) => {}
                    Ok(PromptOutcome::Dropped) => tracing::info!("Prompt was empty or rejected"),
                    Err(LiveError::NoActiveSession) => {
                        eprintln!("Session is not connected yet");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    // Teardown gets its own token so a Ctrl-C still closes the socket cleanly.
    session.end_session(&CancellationToken::new()).await;
    receive_cancel.cancel();
    if !receiver_done {
        finish(receiver.await)?;
    }
    Ok(())
}

fn finish(joined: std::result::Result<gemini_live::Result<()>, JoinError>) -> Result<()> {
    match joined.context("Receive task panicked")? {
        Ok(()) | Err(LiveError::Cancelled) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
