//! Live session state machine.
//!
//! A [`LiveSession`] owns at most one websocket connection at a time. Start
//! opens it and then runs the receive loop until the connection closes or the
//! caller cancels; prompts and end can be issued concurrently from other
//! tasks through a shared `Arc<LiveSession>`.

use crate::config::LiveConfig;
use crate::credential::AccessToken;
use crate::dispatch::{EventBus, ListenerId, ListenerResult};
use crate::error::{LiveError, Result};
use crate::events::{
    EventKind, FrameReceived, LiveEvent, LiveEventType, PromptSubmitted, ServerClosedSession,
    SessionEnded, SessionStarted,
};
use crate::protocol::{GEMINI_LIVE_URL, decode_frame, encode_prompt, encode_setup};
use crate::sanitize::SanitizerPipeline;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Handler for failures that do not stop the receive loop.
pub type ExceptionHandler = Arc<dyn Fn(&LiveError) + Send + Sync>;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No transport.
    #[default]
    NotConnected,
    /// Transport open and setup frame sent, waiting for the acknowledgement.
    SettingUp,
    /// The server acknowledged the setup frame.
    Ready,
}

/// What happened to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The prompt was sent.
    Sent,
    /// The sanitizer vetoed the prompt or it was blank. Nothing was sent.
    Dropped,
}

/// The current connection's cancellation token and its generation number.
///
/// Each successful start bumps the generation, so a receive loop can tell
/// whether the connection it was reading from is still the current one.
#[derive(Default)]
struct ConnectionSlot {
    token: CancellationToken,
    generation: u64,
}

/// A bidirectional streaming session with the Gemini Live API.
///
/// ```rust,ignore
/// let session = Arc::new(LiveSession::new(AccessToken::new(key), LiveConfig::default()));
/// session.add_listener(|evt: Transcription, _| async move {
///     println!("{}", evt.text);
///     Ok(())
/// });
///
/// let cancel = CancellationToken::new();
/// let runner = tokio::spawn({
///     let (session, cancel) = (session.clone(), cancel.clone());
///     async move { session.start_session(&cancel).await }
/// });
/// session.prompt("Hello!", &cancel).await?;
/// ```
pub struct LiveSession {
    token: AccessToken,
    config: LiveConfig,
    endpoint: String,
    active: AtomicBool,
    state: RwLock<SessionState>,
    session_id: RwLock<Option<String>>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    connection: Mutex<ConnectionSlot>,
    events: EventBus,
    sanitizer: SanitizerPipeline,
    exception_handler: RwLock<ExceptionHandler>,
}

fn default_exception_handler() -> ExceptionHandler {
    Arc::new(|error: &LiveError| tracing::error!(%error, "Live session error"))
}

/// Install the process-wide rustls provider used for `wss://` endpoints.
fn install_crypto_provider() {
    // Err means a provider is already installed.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

impl LiveSession {
    /// Create a session. No connection is made until [`start_session`](Self::start_session).
    pub fn new(token: AccessToken, config: LiveConfig) -> Self {
        Self {
            token,
            config,
            endpoint: GEMINI_LIVE_URL.to_string(),
            active: AtomicBool::new(false),
            state: RwLock::new(SessionState::NotConnected),
            session_id: RwLock::new(None),
            sink: tokio::sync::Mutex::new(None),
            connection: Mutex::new(ConnectionSlot::default()),
            events: EventBus::new(),
            sanitizer: SanitizerPipeline::new(),
            exception_handler: RwLock::new(default_exception_handler()),
        }
    }

    /// Point the session at a different websocket endpoint, e.g. a proxy.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| LiveError::config(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(LiveError::config(format!(
                "endpoint must use ws:// or wss://, got '{}'",
                endpoint
            )));
        }
        self.endpoint = url.into();
        Ok(self)
    }

    /// Whether a connection is currently open.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Configuration sent in the setup frame.
    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Identifier of the current or most recent connection.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Prompt filters applied before anything is sent.
    pub fn sanitizer(&self) -> &SanitizerPipeline {
        &self.sanitizer
    }

    /// The session's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a listener for one event type. See [`EventBus::add_listener`].
    pub fn add_listener<E, F, Fut>(&self, listener: F) -> ListenerId
    where
        E: LiveEventType,
        F: Fn(E, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        self.events.add_listener(listener)
    }

    /// Register a listener for every event.
    pub fn add_wildcard_listener<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(LiveEvent, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        self.events.add_wildcard_listener(listener)
    }

    /// Remove a listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Replace the handler for listening, decode and listener failures.
    ///
    /// The default logs the error and the receive loop keeps going.
    pub fn set_exception_handler<F>(&self, handler: F)
    where
        F: Fn(&LiveError) + Send + Sync + 'static,
    {
        *self.exception_handler.write() = Arc::new(handler);
    }

    /// Open the connection and run the receive loop.
    ///
    /// Ends any previous connection first. Returns once the server closes the
    /// connection, [`end_session`](Self::end_session) is called, or `cancel`
    /// fires. Cancelling leaves the session active without a close event;
    /// call `end_session` to release the transport.
    pub async fn start_session(&self, cancel: &CancellationToken) -> Result<()> {
        if self.is_active() {
            self.end_session(cancel).await;
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let model = &self.config.model;
        let span = tracing::info_span!("live_session", session_id = %session_id, model = %model);

        let source = match self.open(cancel).instrument(span.clone()).await {
            Ok((sink, source)) => {
                *self.sink.lock().await = Some(sink);
                source
            }
            Err(e) => {
                self.end_session(cancel).await;
                return Err(e);
            }
        };

        let connection = CancellationToken::new();
        let generation = {
            let mut slot = self.connection.lock();
            slot.token = connection.clone();
            slot.generation += 1;
            *self.session_id.write() = Some(session_id.clone());
            *self.state.write() = SessionState::SettingUp;
            self.active.store(true, Ordering::SeqCst);
            slot.generation
        };

        async {
            tracing::info!("Live session started");
            self.dispatch(SessionStarted { session_id }.into(), cancel).await;
            self.receive_loop(source, &connection, generation, cancel).await;
        }
        .instrument(span)
        .await;
        Ok(())
    }

    async fn open(&self, cancel: &CancellationToken) -> Result<(WsSink, WsSource)> {
        install_crypto_provider();
        let url = Url::parse_with_params(&self.endpoint, &[("key", self.token.expose())])
            .map_err(|e| LiveError::connection("Invalid endpoint URL", e))?;

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LiveError::Cancelled),
            connected = connect_async(url.as_str()) => connected,
        };
        let (stream, _response) = connected.map_err(|e| {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "WebSocket connect failed");
            LiveError::connection("WebSocket connect error", e)
        })?;
        let (mut sink, source) = stream.split();

        let setup = encode_setup(&self.config);
        tracing::debug!(raw_setup = %setup, "Sending setup frame");
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LiveError::Cancelled),
            sent = sink.send(Message::Text(setup.into())) => sent,
        };
        sent.map_err(|e| LiveError::connection("Failed to send setup frame", e))?;

        Ok((sink, source))
    }

    async fn receive_loop(
        &self,
        mut source: WsSource,
        connection: &CancellationToken,
        generation: u64,
        cancel: &CancellationToken,
    ) {
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Receive loop cancelled");
                    return;
                }
                _ = connection.cancelled() => return,
                message = source.next() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str(), cancel).await,
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.handle_frame(text, cancel).await,
                    Err(e) => self.report(&LiveError::decode(format!(
                        "Invalid UTF-8 in binary message: {}",
                        e
                    ))),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => {
                            (Some(u16::from(frame.code)), frame.reason.as_str().to_owned())
                        }
                        None => (None, String::new()),
                    };
                    tracing::info!(?code, %reason, "Server closed the session");
                    self.dispatch(ServerClosedSession { code, reason }.into(), cancel).await;
                    self.end_connection(Some(generation), cancel).await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    tracing::info!("Connection closed");
                    self.end_connection(Some(generation), cancel).await;
                    return;
                }
                Some(Err(e)) => self.report(&LiveError::listening(e)),
                None => {
                    tracing::warn!("Stream ended without a close frame");
                    self.end_connection(Some(generation), cancel).await;
                    return;
                }
            }
        }
    }

    async fn handle_frame(&self, text: &str, cancel: &CancellationToken) {
        tracing::debug!(bytes = text.len(), "Frame received");
        self.dispatch(FrameReceived { json: text.to_string() }.into(), cancel).await;

        let events = match decode_frame(text) {
            Ok(events) => events,
            Err(e) => {
                self.report(&e);
                return;
            }
        };
        for event in events {
            if event.kind() == EventKind::SessionReady {
                *self.state.write() = SessionState::Ready;
                tracing::info!("Session ready");
            }
            self.dispatch(event, cancel).await;
        }
    }

    /// Close the connection. Does nothing if no session is active.
    ///
    /// A normal-closure frame is sent first; if that fails, or `cancel`
    /// fires, the transport is dropped instead.
    pub async fn end_session(&self, cancel: &CancellationToken) {
        self.end_connection(None, cancel).await;
    }

    /// End the active connection, or only connection `generation` when given.
    ///
    /// A receive loop passes its own generation so that it never tears down a
    /// connection started after the one it was reading from.
    async fn end_connection(&self, generation: Option<u64>, cancel: &CancellationToken) {
        {
            let slot = self.connection.lock();
            if generation.is_some_and(|g| g != slot.generation) {
                tracing::debug!(?generation, current = slot.generation, "Connection superseded");
                return;
            }
            if !self.active.swap(false, Ordering::SeqCst) {
                return;
            }
            slot.token.cancel();
        }

        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            let close = Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "Client Disconnect".into(),
            }));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => tracing::debug!("Close cancelled, releasing transport"),
                sent = sink.send(close) => {
                    if let Err(e) = sent {
                        tracing::debug!(error = %e, "Graceful close failed, releasing transport");
                    }
                }
            }
        }

        *self.state.write() = SessionState::NotConnected;
        tracing::info!(session_id = ?self.session_id(), "Live session ended");
        self.dispatch(SessionEnded.into(), cancel).await;
    }

    /// Sanitize `text` and send it as realtime input.
    ///
    /// Blank prompts and prompts vetoed by a filter are dropped without an
    /// event or a frame and reported as [`PromptOutcome::Dropped`].
    /// [`PromptSubmitted`] is dispatched only after the frame was written.
    pub async fn prompt(&self, text: &str, cancel: &CancellationToken) -> Result<PromptOutcome> {
        if !self.is_active() {
            return Err(LiveError::NoActiveSession);
        }

        let sanitized = self.sanitizer.sanitize(text);
        if sanitized.trim().is_empty() {
            tracing::debug!("Prompt dropped by sanitizer");
            return Ok(PromptOutcome::Dropped);
        }

        self.send_frame(encode_prompt(&sanitized), cancel).await?;
        self.dispatch(PromptSubmitted { raw: text.to_string(), sanitized }.into(), cancel).await;
        Ok(PromptOutcome::Sent)
    }

    /// Send one text frame. Only waiting for the send lock is cancellable,
    /// so a frame is either written whole or not at all.
    async fn send_frame(&self, frame: String, cancel: &CancellationToken) -> Result<()> {
        let mut sink = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LiveError::Cancelled),
            sink = self.sink.lock() => sink,
        };
        let Some(sink) = sink.as_mut() else {
            return Err(LiveError::NoActiveSession);
        };
        tracing::debug!(bytes = frame.len(), "Sending frame");
        sink.send(Message::Text(frame.into())).await.map_err(LiveError::listening)
    }

    async fn dispatch(&self, event: LiveEvent, cancel: &CancellationToken) {
        for failure in self.events.dispatch(event, cancel).await {
            self.report(&failure);
        }
    }

    fn report(&self, error: &LiveError) {
        let handler = self.exception_handler.read().clone();
        handler(error);
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("model", &self.config.model)
            .field("endpoint", &self.endpoint)
            .field("active", &self.is_active())
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .finish()
    }
}
