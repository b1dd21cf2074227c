//! Frame buffer for reassembling messages from partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented input:
//! - `WaitingForHeader`: need at least 6 bytes to decode a frame header
//! - `WaitingForFrame`: header decoded, need the rest of the declared length
//!
//! Every complete frame (header + body) is appended to an accumulation
//! buffer. When a frame with the is-final flag lands, the accumulation buffer
//! holds exactly one message, which is frozen and handed out.
//!
//! # Example
//!
//! ```
//! use gridwire_client::protocol::{build_frame, flags, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let first = build_frame(flags::BEGIN_FRAGMENT, &[0u8; 16]);
//! let last = build_frame(flags::IS_FINAL, b"end");
//!
//! assert!(buffer.push(&first).unwrap().is_empty());
//! let messages = buffer.push(&last).unwrap();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].len(), first.len() + last.len());
//! ```

use bytes::BytesMut;

use super::wire_format::FrameHeader;
use super::ClientMessage;
use crate::error::{GridwireError, Result};

/// Default maximum declared frame length (64 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// Default maximum size of one reassembled message (256 MiB).
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 256 * 1024 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for a complete 6-byte header.
    WaitingForHeader,
    /// Header validated, waiting until the whole frame is buffered.
    WaitingForFrame { header: FrameHeader },
}

/// Buffer for accumulating incoming bytes and extracting complete messages.
///
/// A declared length below the header size (or above the configured
/// maximum) is a protocol violation, as is a message whose frames together
/// exceed the message maximum; the buffer must not be used after
/// [`push`](Self::push) returned an error.
pub struct FrameBuffer {
    /// Bytes received but not yet part of a complete frame.
    buffer: BytesMut,
    /// Complete frames of the message being reassembled.
    message: BytesMut,
    /// Number of frames in `message`.
    frames_in_message: usize,
    state: State,
    max_frame_length: usize,
    max_message_length: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max frame length: 64MB.
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    /// Create a new frame buffer with a custom max frame length.
    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            message: BytesMut::new(),
            frames_in_message: 0,
            state: State::WaitingForHeader,
            max_frame_length,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }

    /// Cap the combined size of the frames making up one message.
    pub fn with_max_message_length(mut self, max_message_length: usize) -> Self {
        self.max_message_length = max_message_length;
        self
    }

    /// Push data into the buffer and extract all complete messages.
    ///
    /// Returns the messages completed by this chunk, in arrival order
    /// (may be empty if still waiting for data).
    ///
    /// # Errors
    ///
    /// Returns [`MalformedFrame`](crate::GridwireError::MalformedFrame) if a
    /// header declares fewer than 6 bytes and
    /// [`FrameTooLarge`](crate::GridwireError::FrameTooLarge) above the max.
    /// Returns [`MessageTooLarge`](crate::GridwireError::MessageTooLarge)
    /// once an unfinished message would outgrow the message maximum.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<ClientMessage>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Try to move one frame from the input into the message.
    ///
    /// Returns:
    /// - `Ok(Some(message))` if that frame completed a message
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a protocol violation
    fn try_extract_one(&mut self) -> Result<Option<ClientMessage>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let Some(header) = FrameHeader::from_bytes(&self.buffer) else {
                        return Ok(None);
                    };
                    header.validate(self.max_frame_length)?;
                    let length = self.message.len() + header.length as usize;
                    if length > self.max_message_length {
                        return Err(GridwireError::MessageTooLarge {
                            length,
                            max: self.max_message_length,
                        });
                    }
                    tracing::trace!(
                        length = header.length,
                        flags = header.flags,
                        "frame header decoded"
                    );
                    self.state = State::WaitingForFrame { header };
                }

                State::WaitingForFrame { header } => {
                    let frame_len = header.length as usize;
                    if self.buffer.len() < frame_len {
                        return Ok(None);
                    }

                    let frame = self.buffer.split_to(frame_len);
                    self.message.extend_from_slice(&frame);
                    self.frames_in_message += 1;
                    self.state = State::WaitingForHeader;

                    if header.is_final() {
                        let message = self.message.split().freeze();
                        tracing::trace!(
                            frames = self.frames_in_message,
                            bytes = message.len(),
                            "message reassembled"
                        );
                        self.frames_in_message = 0;
                        return Ok(Some(ClientMessage::new(message)));
                    }
                }
            }
        }
    }

    /// Number of buffered input bytes not yet part of a complete frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no input bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether frames of an unfinished message are being held.
    pub fn is_mid_message(&self) -> bool {
        self.frames_in_message > 0 || !self.buffer.is_empty()
    }

    /// Clear all buffered data and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.message.clear();
        self.frames_in_message = 0;
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForFrame { .. } => "WaitingForFrame",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
