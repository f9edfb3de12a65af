//! Error types for live sessions.

use thiserror::Error;

/// Result type for live session operations.
pub type Result<T> = std::result::Result<T, LiveError>;

/// Boxed cause carried by connection and listening failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while running a live session.
#[derive(Error, Debug)]
pub enum LiveError {
    /// Opening the transport or sending the setup frame failed.
    ///
    /// The original failure is kept as the error source. Call
    /// [`LiveError::into_cause`] to take it back out and propagate it.
    #[error("Failed to start live session: {message}")]
    Connection {
        /// Human readable summary of the failure.
        message: String,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },

    /// The transport reported an error while the receive loop was listening.
    #[error("Error while listening on the websocket: {0}")]
    Listening(#[source] BoxError),

    /// An inbound frame could not be decoded.
    #[error("Received invalid json: {0}")]
    Decode(String),

    /// An operation needed a session but none is active.
    #[error("Cannot prompt while no session is active")]
    NoActiveSession,

    /// A registered listener failed or panicked.
    #[error("Listener failed: {0}")]
    Listener(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The operation was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl LiveError {
    /// Create a new connection error wrapping its cause.
    pub fn connection<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Connection { message: message.into(), source: source.into() }
    }

    /// Create a new listening error.
    pub fn listening<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Listening(source.into())
    }

    /// Create a new decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new listener error.
    pub fn listener<S: Into<String>>(msg: S) -> Self {
        Self::Listener(msg.into())
    }

    /// Whether this error came from cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Take the original cause out of a connection or listening failure.
    ///
    /// Other variants are returned boxed as-is.
    pub fn into_cause(self) -> BoxError {
        match self {
            Self::Connection { source, .. } => source,
            Self::Listening(source) => source,
            other => Box::new(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn connection_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = LiveError::connection("connect failed", io);

        assert!(err.to_string().contains("connect failed"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("refused".to_string()));

        let cause = err.into_cause();
        let io = cause.downcast::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn into_cause_boxes_other_variants() {
        let cause = LiveError::NoActiveSession.into_cause();
        let err = cause.downcast::<LiveError>().unwrap();
        assert!(matches!(*err, LiveError::NoActiveSession));
    }

    #[test]
    fn cancelled_is_detected() {
        assert!(LiveError::Cancelled.is_cancelled());
        assert!(!LiveError::decode("x").is_cancelled());
    }
}
