//! Error types for gridwire-client.

use thiserror::Error;

/// Main error type for all gridwire operations.
#[derive(Debug, Error)]
pub enum GridwireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error (unexpected frame layout, violated invariant, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A frame header declared a length smaller than the header itself.
    #[error("Malformed frame: declared length {length} is smaller than the 6-byte header")]
    MalformedFrame { length: i32 },

    /// A frame header declared a length above the configured maximum.
    #[error("Frame length {length} exceeds maximum {max}")]
    FrameTooLarge { length: i32, max: usize },

    /// The frames of one message together exceed the configured maximum.
    #[error("Message length {length} exceeds maximum {max}")]
    MessageTooLarge { length: usize, max: usize },

    /// Decoding ran past the end of the available bytes.
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A string frame did not contain valid UTF-8.
    #[error("Invalid UTF-8 in string frame: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A marker frame (begin/end data structure) was expected but not found.
    #[error("Expected {expected} frame, found flags {flags:#06x}")]
    UnexpectedFrame { expected: &'static str, flags: u16 },

    /// The connection has not completed its handshake yet.
    #[error("Not connected")]
    NotConnected,

    /// `connect` was called on a connection that already connected.
    #[error("Already connected")]
    AlreadyConnected,

    /// Connection closed (by request or by the peer).
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection terminated by a fatal socket error.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A correlation id was registered twice while still pending.
    #[error("Correlation id {0} is already pending")]
    DuplicateCorrelationId(u64),
}

/// Result type alias using GridwireError.
pub type Result<T> = std::result::Result<T, GridwireError>;

/// Why a connection terminated. Recorded once, then turned into the error
/// every still-pending invocation receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called or every handle was dropped.
    Requested,
    /// The peer closed the stream.
    PeerClosed,
    /// A socket read or write failed.
    Io(String),
    /// The peer violated the framing protocol.
    Protocol(String),
}

impl CloseReason {
    pub fn to_error(&self) -> GridwireError {
        match self {
            CloseReason::Requested | CloseReason::PeerClosed => GridwireError::ConnectionClosed,
            CloseReason::Io(msg) => GridwireError::ConnectionLost(msg.clone()),
            CloseReason::Protocol(msg) => GridwireError::Protocol(msg.clone()),
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Requested => write!(f, "closed by request"),
            CloseReason::PeerClosed => write!(f, "closed by peer"),
            CloseReason::Io(msg) => write!(f, "I/O failure: {msg}"),
            CloseReason::Protocol(msg) => write!(f, "protocol violation: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_reason_maps_to_error() {
        assert!(matches!(
            CloseReason::Requested.to_error(),
            GridwireError::ConnectionClosed
        ));
        assert!(matches!(
            CloseReason::PeerClosed.to_error(),
            GridwireError::ConnectionClosed
        ));
        assert!(matches!(
            CloseReason::Io("reset".into()).to_error(),
            GridwireError::ConnectionLost(msg) if msg == "reset"
        ));
        assert!(matches!(
            CloseReason::Protocol("bad length".into()).to_error(),
            GridwireError::Protocol(msg) if msg == "bad length"
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = GridwireError::FrameTooLarge { length: 100, max: 10 };
        assert!(err.to_string().contains("exceeds maximum"));

        let err = GridwireError::MalformedFrame { length: 3 };
        assert!(err.to_string().contains("declared length 3"));
    }
}
