//! Optional values: the inner value, or a bare is-null frame.

use super::{WireDecode, WireEncode};
use crate::error::Result;
use crate::protocol::{FrameHeader, WireReader, WireWriter};

impl<T: WireEncode> WireEncode for Option<T> {
    fn encode(&self, w: &mut WireWriter<'_>) {
        match self {
            Some(value) => value.encode(w),
            None => FrameHeader::null().encode(w),
        }
    }
}

impl<T: WireDecode> WireDecode for Option<T> {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        if FrameHeader::peek(r)?.is_null() {
            FrameHeader::decode(r)?;
            return Ok(None);
        }
        T::decode(r).map(Some)
    }
}
