//! Frames and complete messages.
//!
//! A [`ClientMessage`] is the byte-exact concatenation of every frame of one
//! message, headers included, as produced by the
//! [`FrameBuffer`](super::FrameBuffer). Uses `bytes::Bytes` so handing a
//! message to a waiting caller never copies it.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gridwire_client::protocol::{flags, ClientMessage, FrameHeader, InitialFrame, WireWriter};
//!
//! let mut buf = BytesMut::new();
//! InitialFrame {
//!     header: FrameHeader::new(22, flags::UNFRAGMENTED | flags::IS_FINAL),
//!     message_type: 2817,
//!     correlation_id: 7,
//!     partition_id: -1,
//! }
//! .encode(&mut WireWriter::new(&mut buf));
//!
//! let message = ClientMessage::new(buf.freeze());
//! assert_eq!(message.correlation_id(), Some(7));
//! assert_eq!(message.frames().count(), 1);
//! ```

use bytes::Bytes;

use super::byte_order::WireReader;
use super::wire_format::{flags, FrameHeader, InitialFrame, CORRELATION_ID_END, HEADER_SIZE};
use crate::error::{GridwireError, Result};

/// A single frame: header plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    /// Body bytes (everything after the 6-byte header).
    pub body: Bytes,
}

impl Frame {
    pub fn new(header: FrameHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        self.header.flags
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.header.is_final()
    }

    /// Size of the frame on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

/// Build a frame's wire bytes from header flags and body.
///
/// The header length is derived from the body.
pub fn build_frame(frame_flags: u16, body: &[u8]) -> Vec<u8> {
    let header = FrameHeader::for_body(body.len(), frame_flags);
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(body);
    buf
}

/// One complete, reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    bytes: Bytes,
}

impl ClientMessage {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Raw message bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap clone of the underlying bytes.
    #[inline]
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Header of the first frame.
    pub fn header(&self) -> Option<FrameHeader> {
        FrameHeader::from_bytes(&self.bytes)
    }

    /// Message type of the initial frame.
    pub fn message_type(&self) -> Option<i32> {
        let mut r = WireReader::new(&self.bytes);
        r.skip(HEADER_SIZE).ok()?;
        r.get_i32().ok()
    }

    /// Correlation id of the initial frame.
    ///
    /// Needs only the first 18 bytes; response initial frames are shorter
    /// than request ones.
    pub fn correlation_id(&self) -> Option<u64> {
        if self.bytes.len() < CORRELATION_ID_END {
            return None;
        }
        let mut r = WireReader::new(&self.bytes);
        r.skip(HEADER_SIZE + 4).ok()?;
        r.get_u64().ok()
    }

    /// Whether the initial frame carries the is-event flag.
    pub fn is_event(&self) -> bool {
        self.header()
            .map(|h| flags::has_flag(h.flags, flags::IS_EVENT))
            .unwrap_or(false)
    }

    /// Decode the full request-style initial frame.
    pub fn initial_frame(&self) -> Result<InitialFrame> {
        InitialFrame::decode(&mut WireReader::new(&self.bytes))
    }

    /// Reader positioned right after the initial frame.
    pub fn body_reader(&self) -> Result<WireReader<'_>> {
        let header = self.header().ok_or(GridwireError::Truncated {
            needed: HEADER_SIZE,
            remaining: self.bytes.len(),
        })?;
        if header.length < HEADER_SIZE as i32 {
            return Err(GridwireError::MalformedFrame {
                length: header.length,
            });
        }
        let mut r = WireReader::new(&self.bytes);
        r.skip(header.length as usize)?;
        Ok(r)
    }

    /// Iterate over the frames of this message.
    pub fn frames(&self) -> FrameIter {
        FrameIter {
            bytes: self.bytes.clone(),
        }
    }
}

/// Iterator over the frames of a [`ClientMessage`].
///
/// Stops at the first frame whose declared length is invalid or exceeds
/// the remaining bytes.
pub struct FrameIter {
    bytes: Bytes,
}

impl Iterator for FrameIter {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let header = FrameHeader::from_bytes(&self.bytes)?;
        if header.length < HEADER_SIZE as i32 || header.length as usize > self.bytes.len() {
            return None;
        }
        let mut frame = self.bytes.split_to(header.length as usize);
        let body = frame.split_off(HEADER_SIZE);
        Some(Frame::new(header, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WireWriter;
    use bytes::BytesMut;

    fn message_with_body() -> ClientMessage {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);
        InitialFrame {
            header: FrameHeader::new(22, flags::UNFRAGMENTED),
            message_type: 257,
            correlation_id: 42,
            partition_id: -1,
        }
        .encode(&mut w);
        w.put_bytes(&build_frame(0, b"dev"));
        FrameHeader::final_frame().encode(&mut w);
        ClientMessage::new(buf.freeze())
    }

    #[test]
    fn test_message_accessors() {
        let message = message_with_body();
        assert_eq!(message.correlation_id(), Some(42));
        assert_eq!(message.message_type(), Some(257));
        assert!(!message.is_event());
        assert_eq!(message.len(), 22 + 9 + 6);
        assert_eq!(message.initial_frame().unwrap().partition_id, -1);
    }

    #[test]
    fn test_frames_iterator() {
        let message = message_with_body();
        let frames: Vec<Frame> = message.frames().collect();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].size(), 22);
        assert_eq!(frames[1].body(), b"dev");
        assert!(frames[2].is_final());
        assert_eq!(
            frames.iter().map(Frame::size).sum::<usize>(),
            message.len()
        );
    }

    #[test]
    fn test_body_reader_skips_initial_frame() {
        let message = message_with_body();
        let mut r = message.body_reader().unwrap();
        let header = FrameHeader::decode(&mut r).unwrap();
        assert_eq!(header.length, 9);
        assert_eq!(r.get_bytes(3).unwrap(), b"dev");
    }

    #[test]
    fn test_short_message_has_no_correlation_id() {
        let message = ClientMessage::new(Bytes::from(build_frame(flags::IS_FINAL, &[1, 2])));
        assert_eq!(message.correlation_id(), None);
        assert!(message.initial_frame().is_err());
    }

    #[test]
    fn test_response_initial_frame_shorter_than_request() {
        // header + type + correlation id + one byte of backup acks
        let mut body = Vec::new();
        body.extend_from_slice(&2817i32.to_le_bytes());
        body.extend_from_slice(&9u64.to_le_bytes());
        body.push(0);
        let bytes = build_frame(flags::UNFRAGMENTED | flags::IS_FINAL, &body);
        assert_eq!(bytes.len(), 19);

        let message = ClientMessage::new(Bytes::from(bytes));
        assert_eq!(message.correlation_id(), Some(9));
        assert_eq!(message.frames().count(), 1);
    }

    #[test]
    fn test_is_event_flag() {
        let mut body = vec![0u8; 16];
        body[4..12].copy_from_slice(&3u64.to_le_bytes());
        let bytes = build_frame(flags::UNFRAGMENTED | flags::IS_FINAL | flags::IS_EVENT, &body);
        assert!(ClientMessage::new(Bytes::from(bytes)).is_event());
    }
}
