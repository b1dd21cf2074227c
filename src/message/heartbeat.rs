//! Heartbeat ("ping") request: a lone initial frame that is also final.

use super::{message_type, Request, RequestHeader};
use crate::protocol::{flags, WireWriter, ANY_PARTITION, INITIAL_FRAME_SIZE};

const HEADER: RequestHeader = RequestHeader {
    message_type: message_type::HEARTBEAT,
    length: INITIAL_FRAME_SIZE as i32,
    flags: flags::UNFRAGMENTED | flags::IS_FINAL,
    partition_id: ANY_PARTITION,
};

/// Keeps an idle connection alive; the response carries no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heartbeat;

impl Request for Heartbeat {
    fn header(&self) -> RequestHeader {
        HEADER
    }

    fn encode_body(&self, _w: &mut WireWriter<'_>) {}

    fn name(&self) -> &'static str {
        "heartbeat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::encode_request;
    use crate::protocol::ClientMessage;
    use bytes::BytesMut;

    #[test]
    fn test_heartbeat_is_a_single_final_frame() {
        let mut buf = BytesMut::new();
        assert_eq!(encode_request(&Heartbeat, 5, &mut buf), 22);

        let message = ClientMessage::new(buf.freeze());
        let initial = message.initial_frame().unwrap();
        assert_eq!(initial.message_type, 2816);
        assert_eq!(initial.correlation_id, 5);
        assert_eq!(initial.partition_id, -1);
        assert_eq!(initial.header.length, 22);
        assert!(initial.header.is_final());
        assert_eq!(message.frames().count(), 1);
    }
}
