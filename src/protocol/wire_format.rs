//! Frame header and initial frame layout.
//!
//! Every frame starts with a 6-byte header:
//! ```text
//! ┌──────────────┬──────────┐
//! │ Length       │ Flags    │
//! │ 4 bytes i32  │ 2 bytes  │
//! │ LE           │ u16 LE   │
//! └──────────────┴──────────┘
//! ```
//!
//! The header is little-endian no matter which ambient order the rest of the
//! message is written in. The first frame of a message (the initial frame)
//! continues with the message type, correlation id and partition id:
//! ```text
//! ┌────────┬──────────┬──────────────┬──────────────┐
//! │ Header │ Type     │ Correlation  │ Partition    │
//! │ 6      │ 4 i32    │ 8 u64        │ 4 i32        │
//! └────────┴──────────┴──────────────┴──────────────┘
//! ```

use crate::error::{GridwireError, Result};

use super::byte_order::{ByteOrder, WireReader, WireWriter};

/// Frame header size in bytes (fixed, exactly 6).
pub const HEADER_SIZE: usize = 6;

/// Size of a request initial frame without any trailing fixed-size fields.
pub const INITIAL_FRAME_SIZE: usize = HEADER_SIZE + 4 + 8 + 4;

/// Bytes needed to read a correlation id from the start of a message.
pub const CORRELATION_ID_END: usize = HEADER_SIZE + 4 + 8;

/// Byte order of every frame header.
pub const HEADER_BYTE_ORDER: ByteOrder = ByteOrder::Little;

/// Partition id meaning "any partition".
pub const ANY_PARTITION: i32 = -1;

/// Flag bits of the frame header.
pub mod flags {
    pub const DEFAULT: u16 = 0;
    /// First frame of a fragmented message.
    pub const BEGIN_FRAGMENT: u16 = 1 << 15;
    /// Last frame of a fragmented message.
    pub const END_FRAGMENT: u16 = 1 << 14;
    /// Last frame of the whole message.
    pub const IS_FINAL: u16 = 1 << 13;
    /// Opens a nested data structure (e.g. a list).
    pub const BEGIN_DATA_STRUCTURE: u16 = 1 << 12;
    /// Closes a nested data structure.
    pub const END_DATA_STRUCTURE: u16 = 1 << 11;
    /// Frame stands for an absent value.
    pub const IS_NULL: u16 = 1 << 10;
    /// Message is a server-initiated event.
    pub const IS_EVENT: u16 = 1 << 9;
    pub const BACKUP_AWARE: u16 = 1 << 8;
    pub const BACKUP_EVENT: u16 = 1 << 7;

    /// Begin + end fragment: a message that is not fragmented.
    pub const UNFRAGMENTED: u16 = BEGIN_FRAGMENT | END_FRAGMENT;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Total frame size in bytes, header included.
    pub length: i32,
    /// Flag bitmask (see [`flags`]).
    pub flags: u16,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(length: i32, flags: u16) -> Self {
        Self { length, flags }
    }

    /// A header-only frame carrying just `flags`.
    pub fn empty(flags: u16) -> Self {
        Self::new(HEADER_SIZE as i32, flags)
    }

    /// Header for a frame with a body of `body_len` bytes.
    pub fn for_body(body_len: usize, flags: u16) -> Self {
        Self::new((HEADER_SIZE + body_len) as i32, flags)
    }

    /// Opens a data structure.
    pub fn begin_data_structure() -> Self {
        Self::empty(flags::BEGIN_DATA_STRUCTURE)
    }

    /// Closes a data structure.
    pub fn end_data_structure() -> Self {
        Self::empty(flags::END_DATA_STRUCTURE)
    }

    /// Stands for an absent optional value.
    pub fn null() -> Self {
        Self::empty(flags::IS_NULL)
    }

    /// Closing frame of a request: end-data-structure + final.
    pub fn final_frame() -> Self {
        Self::empty(flags::END_DATA_STRUCTURE | flags::IS_FINAL)
    }

    /// Write the header. Always little-endian.
    pub fn encode(&self, w: &mut WireWriter<'_>) {
        w.put_i32_in(self.length, HEADER_BYTE_ORDER);
        w.put_u16_in(self.flags, HEADER_BYTE_ORDER);
    }

    /// Encode to a fixed array.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.length.to_le_bytes());
        buf[4..6].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    /// Read a header. Always little-endian.
    pub fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let length = r.get_i32_in(HEADER_BYTE_ORDER)?;
        let flags = r.get_u16_in(HEADER_BYTE_ORDER)?;
        Ok(Self { length, flags })
    }

    /// Decode from the start of a slice without a reader.
    ///
    /// Returns `None` if the slice is shorter than [`HEADER_SIZE`].
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            length: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            flags: u16::from_le_bytes([buf[4], buf[5]]),
        })
    }

    /// Read the next header without consuming it.
    pub fn peek(r: &WireReader<'_>) -> Result<Self> {
        let bytes = r.peek(HEADER_SIZE)?;
        Self::from_bytes(bytes).ok_or(GridwireError::Truncated {
            needed: HEADER_SIZE,
            remaining: bytes.len(),
        })
    }

    /// Check the declared length against the header size and `max_length`.
    pub fn validate(&self, max_length: usize) -> Result<()> {
        if self.length < HEADER_SIZE as i32 {
            return Err(GridwireError::MalformedFrame {
                length: self.length,
            });
        }
        if self.length as usize > max_length {
            return Err(GridwireError::FrameTooLarge {
                length: self.length,
                max: max_length,
            });
        }
        Ok(())
    }

    /// Body size implied by the declared length.
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeded.
    #[inline]
    pub fn body_len(&self) -> usize {
        (self.length as usize).saturating_sub(HEADER_SIZE)
    }

    #[inline]
    pub fn has(&self, flag: u16) -> bool {
        flags::has_flag(self.flags, flag)
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.has(flags::IS_FINAL)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.has(flags::IS_NULL)
    }

    #[inline]
    pub fn is_event(&self) -> bool {
        self.has(flags::IS_EVENT)
    }

    #[inline]
    pub fn is_begin_data_structure(&self) -> bool {
        self.has(flags::BEGIN_DATA_STRUCTURE)
    }

    #[inline]
    pub fn is_end_data_structure(&self) -> bool {
        self.has(flags::END_DATA_STRUCTURE)
    }
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self::empty(flags::DEFAULT)
    }
}

/// First frame of every request and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialFrame {
    pub header: FrameHeader,
    pub message_type: i32,
    pub correlation_id: u64,
    pub partition_id: i32,
}

impl InitialFrame {
    /// Write the initial frame fields. The header part stays little-endian,
    /// the rest follows the writer's ambient order.
    pub fn encode(&self, w: &mut WireWriter<'_>) {
        self.header.encode(w);
        w.put_i32(self.message_type);
        w.put_u64(self.correlation_id);
        w.put_i32(self.partition_id);
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let header = FrameHeader::decode(r)?;
        let message_type = r.get_i32()?;
        let correlation_id = r.get_u64()?;
        let partition_id = r.get_i32()?;
        Ok(Self {
            header,
            message_type,
            correlation_id,
            partition_id,
        })
    }
}
