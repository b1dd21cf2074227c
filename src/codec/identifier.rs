//! 128-bit identifiers.
//!
//! ```text
//! ┌─────────┬──────────────────────┬──────────────────────┐
//! │ is_nil  │ bytes[0..8] reversed │ bytes[8..16] reversed│
//! │ 1 byte  │ 8 bytes              │ 8 bytes              │
//! └─────────┴──────────────────────┴──────────────────────┘
//! ```
//!
//! A nil identifier is the marker byte alone. Otherwise each 8-byte half is
//! written back to front, which matches the peer reading the two halves as
//! little-endian 64-bit values.

use uuid::Uuid;

use super::{WireDecode, WireEncode};
use crate::error::Result;
use crate::protocol::{WireReader, WireWriter};

/// Reverse each 8-byte half in place. Its own inverse.
fn swap_halves(bytes: &mut [u8; 16]) {
    bytes[..8].reverse();
    bytes[8..].reverse();
}

impl WireEncode for Uuid {
    fn encode(&self, w: &mut WireWriter<'_>) {
        w.put_bool(self.is_nil());
        if self.is_nil() {
            return;
        }
        let mut bytes = *self.as_bytes();
        swap_halves(&mut bytes);
        w.put_bytes(&bytes);
    }
}

impl WireDecode for Uuid {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        if r.get_bool()? {
            return Ok(Uuid::nil());
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(r.get_bytes(16)?);
        swap_halves(&mut bytes);
        Ok(Uuid::from_bytes(bytes))
    }
}
