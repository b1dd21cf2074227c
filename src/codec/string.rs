//! String frames.
//!
//! ```text
//! ┌─────────────────────────────┬──────────────┐
//! │ Header {6 + len, flags 0}   │ UTF-8 bytes  │
//! └─────────────────────────────┴──────────────┘
//! ```

use super::{WireDecode, WireEncode};
use crate::error::Result;
use crate::protocol::{flags, FrameHeader, WireReader, WireWriter};

impl WireEncode for str {
    fn encode(&self, w: &mut WireWriter<'_>) {
        FrameHeader::for_body(self.len(), flags::DEFAULT).encode(w);
        w.put_bytes(self.as_bytes());
    }
}

impl WireEncode for String {
    fn encode(&self, w: &mut WireWriter<'_>) {
        self.as_str().encode(w);
    }
}

impl WireDecode for String {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let header = FrameHeader::decode(r)?;
        header.validate(usize::MAX)?;
        let bytes = r.get_bytes(header.body_len())?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridwireError;
    use crate::protocol::ByteOrder;
    use bytes::BytesMut;

    #[test]
    fn test_string_frame_layout() {
        let mut buf = BytesMut::new();
        "dev".encode(&mut WireWriter::new(&mut buf));

        assert_eq!(&buf[..], &[9, 0, 0, 0, 0, 0, b'd', b'e', b'v']);
    }

    #[test]
    fn test_empty_string_is_header_only() {
        let mut buf = BytesMut::new();
        String::new().encode(&mut WireWriter::new(&mut buf));
        assert_eq!(&buf[..], &[6, 0, 0, 0, 0, 0]);

        let decoded = String::decode(&mut WireReader::new(&buf)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_string_header_ignores_ambient_order() {
        let mut buf = BytesMut::new();
        "ab".encode(&mut WireWriter::with_byte_order(&mut buf, ByteOrder::Big));
        assert_eq!(&buf[..6], &[8, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_multibyte_utf8_roundtrip() {
        let original = "zażółć".to_string();
        let mut buf = BytesMut::new();
        original.encode(&mut WireWriter::new(&mut buf));
        assert_eq!(buf.len(), 6 + original.len());

        let decoded = String::decode(&mut WireReader::new(&buf)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let bytes = crate::protocol::build_frame(0, &[0xFF, 0xFE]);
        let err = String::decode(&mut WireReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, GridwireError::InvalidUtf8(_)));
    }

    #[test]
    fn test_truncated_body_rejected() {
        let mut bytes = crate::protocol::build_frame(0, b"hello");
        bytes.truncate(8);
        let err = String::decode(&mut WireReader::new(&bytes)).unwrap_err();
        assert!(matches!(err, GridwireError::Truncated { .. }));
    }
}
