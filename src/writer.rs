//! Double-buffered write scheduler.
//!
//! All outgoing bytes are appended to the *pending* buffer. A flush swaps
//! the pending buffer into the *active* slot and writes it to the socket in a
//! single `write_all`; appends made while that write is in flight land in the
//! fresh pending buffer and go out with the next flush.
//!
//! # Architecture
//!
//! ```text
//! invoke ─► pending ──swap──► active ─► write_all ─► socket
//!              ▲                                        │
//!              └──── cleared buffer reused on completion┘
//! ```
//!
//! The in-flight write future owns both the writer half and the active
//! buffer, so there is never more than one outstanding write and neither
//! buffer is touched by two parties at once.

use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Default initial capacity of each write buffer.
pub const DEFAULT_WRITE_BUFFER_CAPACITY: usize = 64 * 1024;

/// Writer half and active buffer handed back by a finished write.
type WriteOutcome<W> = (W, BytesMut, io::Result<()>);

type WriteFuture<W> = Pin<Box<dyn Future<Output = WriteOutcome<W>> + Send>>;

enum WriterSlot<W> {
    Idle(W),
    Writing(WriteFuture<W>),
    /// A write failed; the writer half is gone.
    Broken,
}

/// Serializes outgoing bytes onto `W` in append order, one write at a time.
pub struct WriteScheduler<W> {
    slot: WriterSlot<W>,
    pending: BytesMut,
    /// Cleared buffer returned by the last completed write.
    spare: Option<BytesMut>,
    capacity: usize,
}

impl<W> WriteScheduler<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, DEFAULT_WRITE_BUFFER_CAPACITY)
    }

    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            slot: WriterSlot::Idle(writer),
            pending: BytesMut::with_capacity(capacity),
            spare: Some(BytesMut::with_capacity(capacity)),
            capacity,
        }
    }

    /// Buffer accepting new appends.
    #[inline]
    pub fn pending_mut(&mut self) -> &mut BytesMut {
        &mut self.pending
    }

    /// Bytes appended but not yet handed to a write.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a write is outstanding.
    #[inline]
    pub fn is_in_progress(&self) -> bool {
        matches!(self.slot, WriterSlot::Writing(_))
    }

    /// Start writing the pending buffer.
    ///
    /// No-op while a write is outstanding (the next completion picks the
    /// pending bytes up) or when nothing is pending. Returns whether a write
    /// was started.
    pub fn schedule_flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let writer = match std::mem::replace(&mut self.slot, WriterSlot::Broken) {
            WriterSlot::Idle(writer) => writer,
            other => {
                self.slot = other;
                return false;
            }
        };

        let fresh = self
            .spare
            .take()
            .unwrap_or_else(|| BytesMut::with_capacity(self.capacity));
        let active = std::mem::replace(&mut self.pending, fresh);
        trace!(bytes = active.len(), "flush started");

        self.slot = WriterSlot::Writing(Box::pin(write_buffer(writer, active)));
        true
    }

    /// Wait for the outstanding write to finish.
    ///
    /// On success the written buffer is recycled and, if more bytes were
    /// appended meanwhile, the next flush starts immediately. Returns the
    /// number of bytes written. Never resolves while no write is outstanding,
    /// which makes it usable as a `select!` branch. Cancel safe.
    pub async fn completion(&mut self) -> io::Result<usize> {
        let fut = match &mut self.slot {
            WriterSlot::Writing(fut) => fut,
            _ => return std::future::pending().await,
        };
        let (writer, mut active, result) = fut.await;

        if let Err(e) = result {
            self.slot = WriterSlot::Broken;
            return Err(e);
        }

        let written = active.len();
        active.clear();
        self.spare = Some(active);
        self.slot = WriterSlot::Idle(writer);
        trace!(bytes = written, "flush completed");

        self.schedule_flush();
        Ok(written)
    }

    /// Wait for every appended byte to reach the writer.
    pub async fn drain(&mut self) -> io::Result<()> {
        self.schedule_flush();
        while self.is_in_progress() {
            self.completion().await?;
        }
        Ok(())
    }

    /// Shut the writer down once idle. Best effort; a broken or busy writer
    /// is left alone.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        match &mut self.slot {
            WriterSlot::Idle(writer) => writer.shutdown().await,
            _ => Ok(()),
        }
    }
}

async fn write_buffer<W>(mut writer: W, buf: BytesMut) -> WriteOutcome<W>
where
    W: AsyncWrite + Unpin,
{
    let result = async {
        writer.write_all(&buf).await?;
        writer.flush().await
    }
    .await;
    (writer, buf, result)
}
