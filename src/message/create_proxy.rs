//! Create a named distributed object on the cluster.

use super::{message_type, Request, RequestHeader};
use crate::codec::WireEncode;
use crate::protocol::{flags, FrameHeader, WireWriter, ANY_PARTITION, INITIAL_FRAME_SIZE};

/// Service name of distributed maps.
pub const MAP_SERVICE: &str = "hz:impl:mapService";

const HEADER: RequestHeader = RequestHeader {
    message_type: message_type::CREATE_PROXY,
    length: INITIAL_FRAME_SIZE as i32,
    flags: flags::UNFRAGMENTED,
    partition_id: ANY_PARTITION,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProxy {
    pub name: String,
    pub service_name: String,
}

impl CreateProxy {
    pub fn new(name: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_name: service_name.into(),
        }
    }

    /// Create a distributed map called `name`.
    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, MAP_SERVICE)
    }
}

impl Request for CreateProxy {
    fn header(&self) -> RequestHeader {
        HEADER
    }

    fn encode_body(&self, w: &mut WireWriter<'_>) {
        self.name.encode(w);
        self.service_name.encode(w);
        FrameHeader::final_frame().encode(w);
    }

    fn name(&self) -> &'static str {
        "create_proxy"
    }
}
