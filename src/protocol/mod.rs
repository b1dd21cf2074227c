//! Protocol module - byte codec, frame layout, and message reassembly.
//!
//! This module implements the framing layer of the binary protocol:
//! - Byte codec with explicit, scoped byte order
//! - 6-byte frame header and initial frame encoding/decoding
//! - Frame buffer reassembling complete messages from partial reads
//! - Message and frame views with typed accessors

mod byte_order;
mod frame;
mod frame_buffer;
mod wire_format;

pub use byte_order::{ByteOrder, WireReader, WireWriter};
pub use frame::{build_frame, ClientMessage, Frame, FrameIter};
pub use frame_buffer::{FrameBuffer, DEFAULT_MAX_FRAME_LENGTH, DEFAULT_MAX_MESSAGE_LENGTH};
pub use wire_format::{
    flags, FrameHeader, InitialFrame, ANY_PARTITION, CORRELATION_ID_END, HEADER_BYTE_ORDER,
    HEADER_SIZE, INITIAL_FRAME_SIZE,
};
