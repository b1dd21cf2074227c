//! Connection driver task.
//!
//! The driver is the connection's single execution context. It alone owns
//! the write scheduler, the correlation counter and the invocation registry;
//! callers reach it through the command inbox and the read loop through the
//! inbound channel.
//!
//! ```text
//! Connection::invoke ─► Command ─┐
//!                                ├─► Driver ─► WriteScheduler ─► socket
//! read loop ─────────► Inbound ──┘      │
//!                                       └─► InvocationRegistry ─► caller
//! ```

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::CloseReason;
use crate::handshake::ConnectionState;
use crate::invocation::{InvocationRegistry, ResponseSender};
use crate::message::{encode_request, Request};
use crate::reader::Inbound;
use crate::writer::WriteScheduler;

/// Requests from connection handles.
pub(crate) enum Command {
    Invoke {
        request: Box<dyn Request>,
        reply: ResponseSender,
    },
    Close,
}

pub(crate) struct Driver<W> {
    commands: mpsc::UnboundedReceiver<Command>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    scheduler: WriteScheduler<W>,
    registry: InvocationRegistry,
    state: Arc<watch::Sender<ConnectionState>>,
    reader: JoinHandle<()>,
}

impl<W> Driver<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub(crate) fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        inbound: mpsc::UnboundedReceiver<Inbound>,
        scheduler: WriteScheduler<W>,
        state: Arc<watch::Sender<ConnectionState>>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            inbound,
            scheduler,
            registry: InvocationRegistry::new(),
            state,
            reader,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let reason = loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Invoke { request, reply }) => self.admit(request, reply),
                    Some(Command::Close) => break CloseReason::Requested,
                    None => {
                        debug!("every connection handle dropped");
                        break CloseReason::Requested;
                    }
                },
                inbound = self.inbound.recv() => match inbound {
                    Some(Inbound::Message(message)) => {
                        self.registry.dispatch(message);
                    }
                    Some(Inbound::Closed(reason)) => break reason,
                    None => break CloseReason::PeerClosed,
                },
                written = self.scheduler.completion() => {
                    if let Err(e) = written {
                        error!("Write error: {}", e);
                        break CloseReason::Io(e.to_string());
                    }
                }
            }
        };

        self.teardown(reason).await;
    }

    /// Assign a correlation id, serialize into the pending buffer, register
    /// the caller, then kick the scheduler.
    fn admit(&mut self, request: Box<dyn Request>, reply: ResponseSender) {
        let correlation_id = self.registry.next_correlation_id();
        let bytes = encode_request(&*request, correlation_id, self.scheduler.pending_mut());
        trace!(
            request = request.name(),
            correlation_id,
            bytes,
            "request admitted"
        );

        if let Err(e) = self.registry.insert(correlation_id, reply) {
            error!("Failed to register invocation: {}", e);
        }
        self.scheduler.schedule_flush();
    }

    async fn teardown(mut self, reason: CloseReason) {
        self.commands.close();
        let mut rejected = 0;
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Invoke { reply, .. } = command {
                let _ = reply.send(Err(reason.to_error()));
                rejected += 1;
            }
        }

        let failed = self.registry.fail_all(&reason);
        self.reader.abort();

        if !matches!(reason, CloseReason::Io(_)) {
            if let Err(e) = self.scheduler.shutdown().await {
                trace!("writer shutdown failed: {}", e);
            }
        }

        debug!(%reason, failed, rejected, "connection closed");
        self.state.send_replace(ConnectionState::Closed);
    }
}
