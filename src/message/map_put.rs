//! Keyed put into a distributed map.
//!
//! Key and value travel as serialized data frames. Their payload is written
//! big-endian while every frame header, theirs included, stays little-endian:
//!
//! ```text
//! data frame: header{length 18, flags 0} | partition hash (BE i32 0) | type id (BE i32 -7) | value (BE i32)
//! ```

use super::{message_type, Request, RequestHeader};
use crate::codec::{WireDecode, WireEncode};
use crate::error::{GridwireError, Result};
use crate::protocol::{flags, ByteOrder, FrameHeader, WireReader, WireWriter};

/// Partition every put is routed to. Partition resolution is out of scope,
/// so the value is fixed.
pub const MAP_PUT_PARTITION_ID: i32 = 50;

/// Serializer type id of a 32-bit integer.
pub const INTEGER_TYPE_ID: i32 = -7;

const DATA_FRAME_LENGTH: i32 = 18;

/// A 32-bit integer in its serialized data form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerData(pub i32);

impl WireEncode for IntegerData {
    fn encode(&self, w: &mut WireWriter<'_>) {
        FrameHeader::new(DATA_FRAME_LENGTH, flags::DEFAULT).encode(w);
        w.scoped(ByteOrder::Big, |w| {
            w.put_i32(0);
            w.put_i32(INTEGER_TYPE_ID);
            w.put_i32(self.0);
        });
    }
}

impl WireDecode for IntegerData {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let header = FrameHeader::decode(r)?;
        if header.length != DATA_FRAME_LENGTH {
            return Err(GridwireError::Protocol(format!(
                "integer data frame must be {DATA_FRAME_LENGTH} bytes, got {}",
                header.length
            )));
        }
        r.scoped(ByteOrder::Big, |r| {
            let _partition_hash = r.get_i32()?;
            let type_id = r.get_i32()?;
            if type_id != INTEGER_TYPE_ID {
                return Err(GridwireError::Protocol(format!(
                    "expected integer data, got serializer type {type_id}"
                )));
            }
            Ok(IntegerData(r.get_i32()?))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapPut {
    pub map_name: String,
    pub key: i32,
    pub value: i32,
    pub thread_id: i64,
    /// Entry time-to-live in milliseconds; -1 uses the map's default.
    pub ttl: i64,
    pub partition_id: i32,
}

impl MapPut {
    pub fn new(map_name: impl Into<String>, key: i32, value: i32) -> Self {
        Self {
            map_name: map_name.into(),
            key,
            value,
            thread_id: 0,
            ttl: -1,
            partition_id: MAP_PUT_PARTITION_ID,
        }
    }

    pub fn with_thread_id(mut self, thread_id: i64) -> Self {
        self.thread_id = thread_id;
        self
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Request for MapPut {
    fn header(&self) -> RequestHeader {
        RequestHeader {
            message_type: message_type::MAP_PUT,
            length: 38,
            flags: flags::UNFRAGMENTED,
            partition_id: self.partition_id,
        }
    }

    fn encode_fixed(&self, w: &mut WireWriter<'_>) {
        w.put_i64(self.thread_id);
        w.put_i64(self.ttl);
    }

    fn encode_body(&self, w: &mut WireWriter<'_>) {
        self.map_name.encode(w);
        IntegerData(self.key).encode(w);
        IntegerData(self.value).encode(w);
        FrameHeader::final_frame().encode(w);
    }

    fn name(&self) -> &'static str {
        "map_put"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::encode_request;
    use crate::protocol::ClientMessage;
    use bytes::BytesMut;

    #[test]
    fn test_integer_data_mixed_byte_order() {
        let mut buf = BytesMut::new();
        IntegerData(0x0102_0304).encode(&mut WireWriter::new(&mut buf));

        assert_eq!(
            &buf[..],
            &[
                18, 0, 0, 0, 0, 0, // header, little-endian
                0, 0, 0, 0, // partition hash
                0xFF, 0xFF, 0xFF, 0xF9, // -7, big-endian
                1, 2, 3, 4,
            ]
        );

        let mut r = WireReader::new(&buf);
        assert_eq!(IntegerData::decode(&mut r).unwrap(), IntegerData(0x0102_0304));
        assert!(r.is_empty());
    }

    #[test]
    fn test_scope_does_not_leak_into_following_fields() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);
        IntegerData(1).encode(&mut w);
        w.put_i32(1);
        assert_eq!(&buf[18..], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_integer_data_rejects_other_types() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);
        FrameHeader::new(18, 0).encode(&mut w);
        w.put_i32_in(0, ByteOrder::Big);
        w.put_i32_in(-11, ByteOrder::Big);
        w.put_i32_in(5, ByteOrder::Big);

        let err = IntegerData::decode(&mut WireReader::new(&buf)).unwrap_err();
        assert!(err.to_string().contains("serializer type -11"));
    }

    #[test]
    fn test_integer_data_rejects_wrong_frame_length() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);
        FrameHeader::new(20, 0).encode(&mut w);
        w.put_bytes(&[0u8; 14]);

        let err = IntegerData::decode(&mut WireReader::new(&buf)).unwrap_err();
        assert!(matches!(err, GridwireError::Protocol(_)));
        assert!(err.to_string().contains("must be 18 bytes, got 20"));
    }

    #[test]
    fn test_map_put_layout() {
        let put = MapPut::new("scores", 7, 99).with_thread_id(3);
        let mut buf = BytesMut::new();
        encode_request(&put, 11, &mut buf);
        let message = ClientMessage::new(buf.freeze());

        let initial = message.initial_frame().unwrap();
        assert_eq!(initial.message_type, 65792);
        assert_eq!(initial.header.length, 38);
        assert_eq!(initial.header.flags, flags::UNFRAGMENTED);
        assert_eq!(initial.partition_id, 50);

        let mut r = WireReader::new(message.as_bytes());
        r.skip(22).unwrap();
        assert_eq!(r.get_i64().unwrap(), 3);
        assert_eq!(r.get_i64().unwrap(), -1);

        let mut r = message.body_reader().unwrap();
        assert_eq!(String::decode(&mut r).unwrap(), "scores");
        assert_eq!(IntegerData::decode(&mut r).unwrap(), IntegerData(7));
        assert_eq!(IntegerData::decode(&mut r).unwrap(), IntegerData(99));
        assert!(FrameHeader::decode(&mut r).unwrap().is_final());
        assert!(r.is_empty());

        let total: usize = message.frames().map(|f| f.size()).sum();
        assert_eq!(total, message.len());
    }
}
