//! Invocation registry mapping correlation ids to waiting callers.
//!
//! Correlation ids are assigned sequentially starting from 1. A response is
//! routed by the correlation id in its initial frame; the entry is removed on
//! delivery so each caller is answered exactly once.
//!
//! # Example
//!
//! ```
//! use gridwire_client::invocation::InvocationRegistry;
//!
//! let mut registry = InvocationRegistry::new();
//! let id = registry.next_correlation_id();
//! let rx = registry.register(id).unwrap();
//!
//! assert_eq!(id, 1);
//! assert_eq!(registry.len(), 1);
//! # drop(rx);
//! ```

use std::collections::HashMap;

use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::error::{CloseReason, GridwireError, Result};
use crate::protocol::ClientMessage;

/// Receiving side of a pending invocation.
pub type ResponseReceiver = oneshot::Receiver<Result<ClientMessage>>;

/// Sending side of a pending invocation, held by the registry.
pub type ResponseSender = oneshot::Sender<Result<ClientMessage>>;

/// What happened to a message handed to [`InvocationRegistry::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the invocation with this correlation id.
    Delivered(u64),
    /// No pending invocation matched; the message was dropped.
    Unmatched,
}

/// Pending invocations of one connection.
#[derive(Debug)]
pub struct InvocationRegistry {
    pending: HashMap<u64, ResponseSender>,
    /// Next correlation id to assign.
    next_id: u64,
}

impl InvocationRegistry {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 1, // 0 is never assigned
        }
    }

    /// Allocate the next correlation id.
    ///
    /// Ids still pending are skipped, so an id is never handed out twice
    /// while its invocation is outstanding.
    pub fn next_correlation_id(&mut self) -> u64 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }

    /// Register a pending invocation and return the receiver its response
    /// will arrive on.
    pub fn register(&mut self, correlation_id: u64) -> Result<ResponseReceiver> {
        let (tx, rx) = oneshot::channel();
        self.insert(correlation_id, tx)?;
        Ok(rx)
    }

    /// Register a pending invocation answered through `tx`.
    ///
    /// On a duplicate id `tx` is dropped unanswered and the existing entry
    /// is kept.
    pub fn insert(&mut self, correlation_id: u64, tx: ResponseSender) -> Result<()> {
        if self.pending.contains_key(&correlation_id) {
            return Err(GridwireError::DuplicateCorrelationId(correlation_id));
        }
        self.pending.insert(correlation_id, tx);
        Ok(())
    }

    /// Drop a pending invocation without answering it.
    pub fn cancel(&mut self, correlation_id: u64) -> bool {
        self.pending.remove(&correlation_id).is_some()
    }

    /// Route a complete message to the invocation it answers.
    pub fn dispatch(&mut self, message: ClientMessage) -> Dispatch {
        let Some(correlation_id) = message.correlation_id() else {
            warn!(
                len = message.len(),
                "discarding message too short to carry a correlation id"
            );
            return Dispatch::Unmatched;
        };

        match self.pending.remove(&correlation_id) {
            Some(tx) => {
                if tx.send(Ok(message)).is_err() {
                    trace!(correlation_id, "caller stopped waiting for response");
                }
                Dispatch::Delivered(correlation_id)
            }
            None => {
                warn!(
                    correlation_id,
                    is_event = message.is_event(),
                    message_type = message.message_type(),
                    "discarding message with no pending invocation"
                );
                Dispatch::Unmatched
            }
        }
    }

    /// Fail every pending invocation with the error `reason` maps to, and
    /// clear the registry. Returns how many were failed.
    pub fn fail_all(&mut self, reason: &CloseReason) -> usize {
        let count = self.pending.len();
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(reason.to_error()));
        }
        count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, correlation_id: u64) -> bool {
        self.pending.contains_key(&correlation_id)
    }
}

impl Default for InvocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, flags};
    use bytes::Bytes;

    fn response(correlation_id: u64, extra_flags: u16) -> ClientMessage {
        let mut body = Vec::new();
        body.extend_from_slice(&2817i32.to_le_bytes());
        body.extend_from_slice(&correlation_id.to_le_bytes());
        body.push(0);
        ClientMessage::new(Bytes::from(build_frame(
            flags::UNFRAGMENTED | flags::IS_FINAL | extra_flags,
            &body,
        )))
    }

    #[test]
    fn test_ids_sequential_from_one() {
        let mut registry = InvocationRegistry::new();
        assert_eq!(registry.next_correlation_id(), 1);
        assert_eq!(registry.next_correlation_id(), 2);
        assert_eq!(registry.next_correlation_id(), 3);
    }

    #[test]
    fn test_ids_skip_pending_after_wrap() {
        let mut registry = InvocationRegistry::new();
        let _rx = registry.register(1).unwrap();
        registry.next_id = u64::MAX;

        assert_eq!(registry.next_correlation_id(), u64::MAX);
        // wraps past 0 and skips the still-pending 1
        assert_eq!(registry.next_correlation_id(), 2);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = InvocationRegistry::new();
        let _rx = registry.register(7).unwrap();

        let err = registry.register(7).unwrap_err();
        assert!(matches!(err, GridwireError::DuplicateCorrelationId(7)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_out_of_order() {
        let mut registry = InvocationRegistry::new();
        let a = registry.next_correlation_id();
        let b = registry.next_correlation_id();
        let rx_a = registry.register(a).unwrap();
        let rx_b = registry.register(b).unwrap();

        assert_eq!(registry.dispatch(response(b, 0)), Dispatch::Delivered(b));
        assert_eq!(registry.dispatch(response(a, 0)), Dispatch::Delivered(a));
        assert!(registry.is_empty());

        assert_eq!(rx_a.await.unwrap().unwrap().correlation_id(), Some(a));
        assert_eq!(rx_b.await.unwrap().unwrap().correlation_id(), Some(b));
    }

    #[test]
    fn test_unmatched_and_short_messages_dropped() {
        let mut registry = InvocationRegistry::new();
        let _rx = registry.register(1).unwrap();

        assert_eq!(registry.dispatch(response(99, flags::IS_EVENT)), Dispatch::Unmatched);

        let short = ClientMessage::new(Bytes::from(build_frame(flags::IS_FINAL, &[0; 4])));
        assert_eq!(registry.dispatch(short), Dispatch::Unmatched);

        assert!(registry.is_pending(1));
    }

    #[test]
    fn test_dispatch_after_caller_gave_up() {
        let mut registry = InvocationRegistry::new();
        drop(registry.register(4).unwrap());

        assert_eq!(registry.dispatch(response(4, 0)), Dispatch::Delivered(4));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_fail_all() {
        let mut registry = InvocationRegistry::new();
        let rx1 = registry.register(1).unwrap();
        let rx2 = registry.register(2).unwrap();

        let failed = registry.fail_all(&CloseReason::Protocol("bad frame".into()));
        assert_eq!(failed, 2);
        assert!(registry.is_empty());

        for rx in [rx1, rx2] {
            assert!(matches!(rx.await.unwrap(), Err(GridwireError::Protocol(_))));
        }
    }

    #[test]
    fn test_cancel() {
        let mut registry = InvocationRegistry::new();
        let _rx = registry.register(3).unwrap();
        assert!(registry.cancel(3));
        assert!(!registry.cancel(3));
    }
}
