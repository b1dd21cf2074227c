//! Socket read loop.
//!
//! Owns the read half and the [`FrameBuffer`]. Complete messages are
//! forwarded to the connection driver in arrival order; the loop ends with
//! exactly one [`Inbound::Closed`] naming why.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::CloseReason;
use crate::protocol::{ClientMessage, FrameBuffer};

/// Event delivered from the read loop to the driver.
#[derive(Debug)]
pub(crate) enum Inbound {
    Message(ClientMessage),
    Closed(CloseReason),
}

pub(crate) fn spawn_reader<R>(
    reader: R,
    frames: FrameBuffer,
    read_buffer_size: usize,
    tx: mpsc::UnboundedSender<Inbound>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(read_loop(reader, frames, read_buffer_size, tx))
}

async fn read_loop<R>(
    mut reader: R,
    mut frames: FrameBuffer,
    read_buffer_size: usize,
    tx: mpsc::UnboundedSender<Inbound>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; read_buffer_size.max(1)];

    let reason = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!(mid_message = frames.is_mid_message(), "peer closed the stream");
                break CloseReason::PeerClosed;
            }
            Ok(n) => n,
            Err(e) => {
                error!("Read error: {}", e);
                break CloseReason::Io(e.to_string());
            }
        };
        trace!(bytes = n, "read");

        let messages = match frames.push(&buf[..n]) {
            Ok(messages) => messages,
            Err(e) => {
                error!("Framing error: {}", e);
                break CloseReason::Protocol(e.to_string());
            }
        };

        for message in messages {
            if tx.send(Inbound::Message(message)).is_err() {
                // driver is gone, nobody left to read for
                return;
            }
        }
    };

    let _ = tx.send(Inbound::Closed(reason));
}
