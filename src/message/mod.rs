//! Message codecs - request types and their exact frame layout.
//!
//! A request is an initial frame followed by zero or more body frames. The
//! initial frame's type, declared length, flags and partition id are fixed per
//! request type ([`RequestHeader`]); only the correlation id is filled in when
//! the request is admitted to a connection.
//!
//! Fixed-size request fields live inside the initial frame, after the
//! 22-byte prefix, and count towards its declared length. If a request writes
//! fewer fixed bytes than declared (a nil identifier, for instance), the rest
//! is zero-filled so the frame is exactly as long as it says.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gridwire_client::message::{encode_request, Heartbeat};
//! use gridwire_client::protocol::ClientMessage;
//!
//! let mut buf = BytesMut::new();
//! let written = encode_request(&Heartbeat, 3, &mut buf);
//! assert_eq!(written, 22);
//!
//! let message = ClientMessage::new(buf.freeze());
//! assert_eq!(message.correlation_id(), Some(3));
//! assert_eq!(message.message_type(), Some(2816));
//! ```

mod authentication;
mod create_proxy;
mod heartbeat;
mod map_put;

pub use authentication::{Authentication, CLIENT_TYPE, CLIENT_VERSION, SERIALIZATION_VERSION};
pub use create_proxy::{CreateProxy, MAP_SERVICE};
pub use heartbeat::Heartbeat;
pub use map_put::{IntegerData, MapPut, INTEGER_TYPE_ID, MAP_PUT_PARTITION_ID};

use bytes::BytesMut;

use crate::protocol::{FrameHeader, InitialFrame, WireWriter, INITIAL_FRAME_SIZE};

/// Message type codes.
pub mod message_type {
    pub const AUTHENTICATION: i32 = 0x00_0100;
    pub const CREATE_PROXY: i32 = 0x00_0400;
    pub const HEARTBEAT: i32 = 0x00_0B00;
    pub const MAP_PUT: i32 = 0x01_0100;
}

/// Fixed initial-frame values of a request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub message_type: i32,
    /// Declared length of the initial frame, fixed-size fields included.
    pub length: i32,
    pub flags: u16,
    pub partition_id: i32,
}

impl RequestHeader {
    /// Initial frame carrying `correlation_id`.
    pub fn initial_frame(&self, correlation_id: u64) -> InitialFrame {
        InitialFrame {
            header: FrameHeader::new(self.length, self.flags),
            message_type: self.message_type,
            correlation_id,
            partition_id: self.partition_id,
        }
    }
}

/// A request that can be sent over a connection.
pub trait Request: Send + 'static {
    /// Initial frame constants for this request type.
    fn header(&self) -> RequestHeader;

    /// Fixed-size fields written inside the initial frame.
    fn encode_fixed(&self, _w: &mut WireWriter<'_>) {}

    /// Frames following the initial frame, closing frame included.
    fn encode_body(&self, w: &mut WireWriter<'_>);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Serialize `request` with `correlation_id` stamped into its initial frame,
/// appending to `buf`. Returns the number of bytes written.
pub fn encode_request(request: &dyn Request, correlation_id: u64, buf: &mut BytesMut) -> usize {
    let start = buf.len();
    let header = request.header();
    let mut w = WireWriter::new(buf);

    header.initial_frame(correlation_id).encode(&mut w);
    request.encode_fixed(&mut w);

    let written = w.len() - start;
    let declared = header.length.max(INITIAL_FRAME_SIZE as i32) as usize;
    if written < declared {
        w.put_bytes(&vec![0u8; declared - written]);
    } else if written > declared {
        tracing::warn!(
            request = request.name(),
            written,
            declared,
            "fixed fields overflow the declared initial frame length"
        );
    }

    request.encode_body(&mut w);
    w.len() - start
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{flags, ClientMessage};

    struct Padded;

    impl Request for Padded {
        fn header(&self) -> RequestHeader {
            RequestHeader {
                message_type: 1,
                length: 30,
                flags: flags::UNFRAGMENTED | flags::IS_FINAL,
                partition_id: 4,
            }
        }

        fn encode_fixed(&self, w: &mut WireWriter<'_>) {
            w.put_u8(0xAB);
        }

        fn encode_body(&self, _w: &mut WireWriter<'_>) {}

        fn name(&self) -> &'static str {
            "padded"
        }
    }

    #[test]
    fn test_initial_frame_is_zero_filled_to_declared_length() {
        let mut buf = BytesMut::new();
        let written = encode_request(&Padded, 8, &mut buf);

        assert_eq!(written, 30);
        assert_eq!(buf[22], 0xAB);
        assert!(buf[23..].iter().all(|&b| b == 0));

        let message = ClientMessage::new(buf.freeze());
        let initial = message.initial_frame().unwrap();
        assert_eq!(initial.correlation_id, 8);
        assert_eq!(initial.partition_id, 4);
    }

    #[test]
    fn test_encode_appends_to_existing_bytes() {
        let mut buf = BytesMut::from(&b"CP2"[..]);
        let written = encode_request(&Heartbeat, 1, &mut buf);

        assert_eq!(written, 22);
        assert_eq!(buf.len(), 25);
        assert_eq!(&buf[..3], b"CP2");
    }

    #[test]
    fn test_message_type_codes() {
        assert_eq!(message_type::AUTHENTICATION, 256);
        assert_eq!(message_type::HEARTBEAT, 2816);
        assert_eq!(message_type::CREATE_PROXY, 1024);
        assert_eq!(message_type::MAP_PUT, 65792);
    }
}
