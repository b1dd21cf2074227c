//! Connection handshake state machine.
//!
//! ```text
//! Start ──► Connecting ──► ReaderStarted ──► ProtocolSent ──► Ready
//! ```
//!
//! `Connecting` is entered when the connect attempt is claimed, the read
//! loop is started before the protocol identifier is written, and the
//! handshake completes as soon as that write finishes. Every step publishes
//! the matching [`ConnectionState`].

use tokio::sync::watch;
use tracing::debug;

use crate::error::{GridwireError, Result};

/// Protocol identifier written right after the socket connects.
pub const PROTOCOL_IDENTIFIER: &[u8; 3] = b"CP2";

/// Observable lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    ReaderStarted,
    HandshakeSent,
    Ready,
    Closed,
}

impl ConnectionState {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Start,
    Connecting,
    ReaderStarted,
    ProtocolSent,
    Ready,
}

impl HandshakeState {
    /// The only state this one may advance to.
    pub fn next(self) -> Option<HandshakeState> {
        match self {
            HandshakeState::Start => Some(HandshakeState::Connecting),
            HandshakeState::Connecting => Some(HandshakeState::ReaderStarted),
            HandshakeState::ReaderStarted => Some(HandshakeState::ProtocolSent),
            HandshakeState::ProtocolSent => Some(HandshakeState::Ready),
            HandshakeState::Ready => None,
        }
    }

    pub fn connection_state(self) -> ConnectionState {
        match self {
            HandshakeState::Start => ConnectionState::Disconnected,
            HandshakeState::Connecting => ConnectionState::Connecting,
            HandshakeState::ReaderStarted => ConnectionState::ReaderStarted,
            HandshakeState::ProtocolSent => ConnectionState::HandshakeSent,
            HandshakeState::Ready => ConnectionState::Ready,
        }
    }
}

/// Drives one handshake and publishes each step.
pub(crate) struct Handshake<'a> {
    state: HandshakeState,
    publish: &'a watch::Sender<ConnectionState>,
}

impl<'a> Handshake<'a> {
    /// Claim the connection for a handshake.
    ///
    /// Fails with [`GridwireError::ConnectionClosed`] once the connection is
    /// closed and with [`GridwireError::AlreadyConnected`] for any other
    /// state but `Disconnected`; on success the connection is `Connecting`.
    pub(crate) fn begin(publish: &'a watch::Sender<ConnectionState>) -> Result<Self> {
        let mut found = ConnectionState::Disconnected;
        let claimed = publish.send_if_modified(|state| {
            found = *state;
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(if found.is_closed() {
                GridwireError::ConnectionClosed
            } else {
                GridwireError::AlreadyConnected
            });
        }
        debug!(from = ?HandshakeState::Start, to = ?HandshakeState::Connecting, "handshake");
        Ok(Self {
            state: HandshakeState::Connecting,
            publish,
        })
    }

    #[inline]
    pub(crate) fn state(&self) -> HandshakeState {
        self.state
    }

    /// Move to `to`, which must be the next state.
    pub(crate) fn advance(&mut self, to: HandshakeState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(GridwireError::Protocol(format!(
                "illegal handshake transition {:?} -> {:?}",
                self.state, to
            )));
        }
        let expected = self.state.connection_state();
        let advanced = self.publish.send_if_modified(|state| {
            if *state == expected {
                *state = to.connection_state();
                true
            } else {
                false
            }
        });
        if !advanced {
            // closed underneath us
            return Err(GridwireError::ConnectionClosed);
        }
        debug!(from = ?self.state, to = ?to, "handshake");
        self.state = to;
        Ok(())
    }

    /// Abandon the handshake; the connection is unusable afterwards.
    pub(crate) fn fail(self, error: &GridwireError) {
        debug!(at = ?self.state(), %error, "handshake failed");
        self.publish.send_replace(ConnectionState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        let mut state = HandshakeState::Start;
        let mut seen = vec![state.connection_state()];
        while let Some(next) = state.next() {
            state = next;
            seen.push(state.connection_state());
        }
        assert_eq!(
            seen,
            vec![
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::ReaderStarted,
                ConnectionState::HandshakeSent,
                ConnectionState::Ready,
            ]
        );
    }

    #[test]
    fn test_begin_claims_once() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let handshake = Handshake::begin(&tx).unwrap();
        assert_eq!(handshake.state(), HandshakeState::Connecting);
        assert_eq!(*rx.borrow(), ConnectionState::Connecting);

        assert!(matches!(
            Handshake::begin(&tx),
            Err(GridwireError::AlreadyConnected)
        ));
    }

    #[test]
    fn test_begin_after_close() {
        let (tx, _rx) = watch::channel(ConnectionState::Closed);
        assert!(matches!(
            Handshake::begin(&tx),
            Err(GridwireError::ConnectionClosed)
        ));
        assert!(tx.borrow().is_closed());
    }

    #[test]
    fn test_advance_publishes_and_rejects_skips() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let mut handshake = Handshake::begin(&tx).unwrap();

        assert!(handshake.advance(HandshakeState::ProtocolSent).is_err());
        handshake.advance(HandshakeState::ReaderStarted).unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::ReaderStarted);
        handshake.advance(HandshakeState::ProtocolSent).unwrap();
        handshake.advance(HandshakeState::Ready).unwrap();
        assert!(rx.borrow().is_ready());
    }

    #[test]
    fn test_advance_after_external_close() {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        let mut handshake = Handshake::begin(&tx).unwrap();
        tx.send_replace(ConnectionState::Closed);

        assert!(matches!(
            handshake.advance(HandshakeState::ReaderStarted),
            Err(GridwireError::ConnectionClosed)
        ));
        assert!(tx.borrow().is_closed());
    }

    #[test]
    fn test_fail_closes() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let handshake = Handshake::begin(&tx).unwrap();
        handshake.fail(&GridwireError::ConnectionClosed);
        assert!(rx.borrow().is_closed());
    }
}
