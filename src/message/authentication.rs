//! Authentication request.
//!
//! ```text
//! Initial frame (40 bytes): prefix(22) | client uuid(17) | serialization version(1)
//! cluster name            : string frame
//! username                : string frame or null frame
//! password                : string frame or null frame
//! client type             : string frame
//! client version          : string frame
//! client instance name    : string frame
//! labels                  : list of string frames
//! closing frame           : end data structure + final
//! ```

use uuid::Uuid;

use super::{message_type, Request, RequestHeader};
use crate::codec::{WireDecode, WireEncode};
use crate::error::{GridwireError, Result};
use crate::protocol::{
    flags, ClientMessage, FrameHeader, WireReader, WireWriter, ANY_PARTITION, INITIAL_FRAME_SIZE,
};

/// Serialization version announced to the server.
pub const SERIALIZATION_VERSION: u8 = 1;

/// Client type announced to the server.
pub const CLIENT_TYPE: &str = "CPP";

/// Client version announced to the server.
pub const CLIENT_VERSION: &str = "5.1.0";

/// Bytes reserved for the client id in the initial frame.
const CLIENT_UUID_SLOT: usize = 17;

const HEADER: RequestHeader = RequestHeader {
    message_type: message_type::AUTHENTICATION,
    length: 40,
    flags: flags::UNFRAGMENTED,
    partition_id: ANY_PARTITION,
};

/// Credentials and identity presented when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub cluster_name: String,
    pub client_uuid: Uuid,
    pub instance_name: String,
    pub labels: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Authentication {
    /// Anonymous authentication with a nil client id and no labels.
    pub fn new(cluster_name: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            client_uuid: Uuid::nil(),
            instance_name: instance_name.into(),
            labels: Vec::new(),
            username: None,
            password: None,
        }
    }

    pub fn with_client_uuid(mut self, client_uuid: Uuid) -> Self {
        self.client_uuid = client_uuid;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Parse an encoded authentication request.
    ///
    /// Used by test peers and tooling; the client itself only encodes.
    pub fn from_message(message: &ClientMessage) -> Result<Self> {
        let initial = message.initial_frame()?;
        if initial.message_type != message_type::AUTHENTICATION {
            return Err(GridwireError::Protocol(format!(
                "expected authentication request, got message type {}",
                initial.message_type
            )));
        }

        let mut r = WireReader::new(message.as_bytes());
        r.skip(INITIAL_FRAME_SIZE)?;
        let client_uuid = Uuid::decode(&mut r)?;
        if client_uuid.is_nil() {
            r.skip(CLIENT_UUID_SLOT - 1)?;
        }
        let _version = r.get_u8()?;

        let mut r = message.body_reader()?;
        let cluster_name = String::decode(&mut r)?;
        let username = Option::<String>::decode(&mut r)?;
        let password = Option::<String>::decode(&mut r)?;
        let _client_type = String::decode(&mut r)?;
        let _client_version = String::decode(&mut r)?;
        let instance_name = String::decode(&mut r)?;
        let labels = Vec::<String>::decode(&mut r)?;

        let closing = FrameHeader::decode(&mut r)?;
        if !closing.is_final() {
            return Err(GridwireError::UnexpectedFrame {
                expected: "final",
                flags: closing.flags,
            });
        }

        Ok(Self {
            cluster_name,
            client_uuid,
            instance_name,
            labels,
            username,
            password,
        })
    }
}

impl Request for Authentication {
    fn header(&self) -> RequestHeader {
        HEADER
    }

    fn encode_fixed(&self, w: &mut WireWriter<'_>) {
        self.client_uuid.encode(w);
        if self.client_uuid.is_nil() {
            // the version sits at a fixed offset whatever the id
            w.put_bytes(&[0u8; CLIENT_UUID_SLOT - 1]);
        }
        w.put_u8(SERIALIZATION_VERSION);
    }

    fn encode_body(&self, w: &mut WireWriter<'_>) {
        self.cluster_name.encode(w);
        self.username.encode(w);
        self.password.encode(w);
        CLIENT_TYPE.encode(w);
        CLIENT_VERSION.encode(w);
        self.instance_name.encode(w);
        self.labels.encode(w);
        FrameHeader::final_frame().encode(w);
    }

    fn name(&self) -> &'static str {
        "authentication"
    }
}
