//! Byte codec with an explicit, scoped byte order.
//!
//! [`WireWriter`] and [`WireReader`] carry an *ambient* byte order that every
//! integer operation uses unless the `_in` variant is called with an explicit
//! order. The ambient order of a writer/reader is fixed at construction;
//! [`WireWriter::scoped`] and [`WireReader::scoped`] hand a closure a view with
//! a different ambient order over the same buffer, so nested encodings can
//! switch order without mutating anything shared.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gridwire_client::protocol::{ByteOrder, WireWriter};
//!
//! let mut buf = BytesMut::new();
//! let mut w = WireWriter::new(&mut buf);
//! w.put_i32(1);
//! w.scoped(ByteOrder::Big, |w| w.put_i32(1));
//! assert_eq!(&buf[..], &[1, 0, 0, 0, 0, 0, 0, 1]);
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{GridwireError, Result};

/// Byte order used for multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Least significant byte first. The protocol default.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// Appends fixed-width values to a `BytesMut`.
pub struct WireWriter<'a> {
    buf: &'a mut BytesMut,
    order: ByteOrder,
}

impl<'a> WireWriter<'a> {
    /// Create a writer with little-endian ambient order.
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self::with_byte_order(buf, ByteOrder::Little)
    }

    /// Create a writer with the given ambient order.
    pub fn with_byte_order(buf: &'a mut BytesMut, order: ByteOrder) -> Self {
        Self { buf, order }
    }

    /// Ambient byte order of this writer.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Run `f` against a view of the same buffer whose ambient order is `order`.
    ///
    /// This writer's own ambient order is untouched once `f` returns.
    pub fn scoped<R>(&mut self, order: ByteOrder, f: impl FnOnce(&mut WireWriter<'_>) -> R) -> R {
        let mut inner = WireWriter {
            buf: &mut *self.buf,
            order,
        };
        f(&mut inner)
    }

    /// Total number of bytes in the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the underlying buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Booleans are a single byte, 1 or 0.
    #[inline]
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.put_u16_in(value, self.order);
    }

    pub fn put_u16_in(&mut self, value: u16, order: ByteOrder) {
        match order {
            ByteOrder::Little => self.buf.put_u16_le(value),
            ByteOrder::Big => self.buf.put_u16(value),
        }
    }

    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.put_u32_in(value, self.order);
    }

    pub fn put_u32_in(&mut self, value: u32, order: ByteOrder) {
        match order {
            ByteOrder::Little => self.buf.put_u32_le(value),
            ByteOrder::Big => self.buf.put_u32(value),
        }
    }

    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.put_u64_in(value, self.order);
    }

    pub fn put_u64_in(&mut self, value: u64, order: ByteOrder) {
        match order {
            ByteOrder::Little => self.buf.put_u64_le(value),
            ByteOrder::Big => self.buf.put_u64(value),
        }
    }

    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.put_i32_in(value, self.order);
    }

    pub fn put_i32_in(&mut self, value: i32, order: ByteOrder) {
        match order {
            ByteOrder::Little => self.buf.put_i32_le(value),
            ByteOrder::Big => self.buf.put_i32(value),
        }
    }

    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.put_i64_in(value, self.order);
    }

    pub fn put_i64_in(&mut self, value: i64, order: ByteOrder) {
        match order {
            ByteOrder::Little => self.buf.put_i64_le(value),
            ByteOrder::Big => self.buf.put_i64(value),
        }
    }

    /// Append raw bytes unchanged.
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Reads fixed-width values from a byte slice, tracking a cursor.
///
/// Every read is bounds-checked and fails with
/// [`GridwireError::Truncated`] instead of panicking.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> WireReader<'a> {
    /// Create a reader with little-endian ambient order.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_byte_order(buf, ByteOrder::Little)
    }

    /// Create a reader with the given ambient order.
    pub fn with_byte_order(buf: &'a [u8], order: ByteOrder) -> Self {
        Self { buf, pos: 0, order }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Run `f` against a reader sharing this cursor but using `order` as its
    /// ambient order. The cursor advances by whatever `f` consumed.
    pub fn scoped<R>(&mut self, order: ByteOrder, f: impl FnOnce(&mut WireReader<'a>) -> R) -> R {
        let mut inner = WireReader {
            buf: self.buf,
            pos: self.pos,
            order,
        };
        let result = f(&mut inner);
        self.pos = inner.pos;
        result
    }

    /// Current cursor position from the start of the slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(GridwireError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    /// Consume the next `n` bytes.
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Ok(bytes)
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.get_bytes(n).map(|_| ())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_bytes(1)?[0])
    }

    /// Any non-zero byte reads as `true`.
    pub fn get_bool(&mut self) -> Result<bool> {
        Ok(self.get_u8()? != 0)
    }

    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        self.get_u16_in(self.order)
    }

    pub fn get_u16_in(&mut self, order: ByteOrder) -> Result<u16> {
        let mut src = self.get_bytes(2)?;
        Ok(match order {
            ByteOrder::Little => src.get_u16_le(),
            ByteOrder::Big => src.get_u16(),
        })
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        self.get_u32_in(self.order)
    }

    pub fn get_u32_in(&mut self, order: ByteOrder) -> Result<u32> {
        let mut src = self.get_bytes(4)?;
        Ok(match order {
            ByteOrder::Little => src.get_u32_le(),
            ByteOrder::Big => src.get_u32(),
        })
    }

    #[inline]
    pub fn get_u64(&mut self) -> Result<u64> {
        self.get_u64_in(self.order)
    }

    pub fn get_u64_in(&mut self, order: ByteOrder) -> Result<u64> {
        let mut src = self.get_bytes(8)?;
        Ok(match order {
            ByteOrder::Little => src.get_u64_le(),
            ByteOrder::Big => src.get_u64(),
        })
    }

    #[inline]
    pub fn get_i32(&mut self) -> Result<i32> {
        self.get_i32_in(self.order)
    }

    pub fn get_i32_in(&mut self, order: ByteOrder) -> Result<i32> {
        let mut src = self.get_bytes(4)?;
        Ok(match order {
            ByteOrder::Little => src.get_i32_le(),
            ByteOrder::Big => src.get_i32(),
        })
    }

    #[inline]
    pub fn get_i64(&mut self) -> Result<i64> {
        self.get_i64_in(self.order)
    }

    pub fn get_i64_in(&mut self, order: ByteOrder) -> Result<i64> {
        let mut src = self.get_bytes(8)?;
        Ok(match order {
            ByteOrder::Little => src.get_i64_le(),
            ByteOrder::Big => src.get_i64(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_is_default() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);
        assert_eq!(w.byte_order(), ByteOrder::Little);

        w.put_u32(0x0102_0304);
        assert_eq!(&buf[..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_explicit_order_overrides_ambient() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::with_byte_order(&mut buf, ByteOrder::Big);
        w.put_u16(0x0102);
        w.put_u16_in(0x0102, ByteOrder::Little);
        assert_eq!(&buf[..], &[0x01, 0x02, 0x02, 0x01]);
    }

    #[test]
    fn test_scoped_order_is_restored() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);

        w.scoped(ByteOrder::Big, |inner| {
            assert_eq!(inner.byte_order(), ByteOrder::Big);
            inner.put_i32(-7);
            // Nested scope back to little-endian.
            inner.scoped(ByteOrder::Little, |innermost| innermost.put_i32(-7));
            assert_eq!(inner.byte_order(), ByteOrder::Big);
        });
        assert_eq!(w.byte_order(), ByteOrder::Little);
        w.put_i32(-7);

        assert_eq!(
            &buf[..],
            &[
                0xFF, 0xFF, 0xFF, 0xF9, // big
                0xF9, 0xFF, 0xFF, 0xFF, // little
                0xF9, 0xFF, 0xFF, 0xFF, // little again
            ]
        );
    }

    #[test]
    fn test_read_back_every_width() {
        let mut buf = BytesMut::new();
        let mut w = WireWriter::new(&mut buf);
        w.put_u8(7);
        w.put_bool(true);
        w.put_u16(0xBEEF);
        w.put_u32_in(0xDEAD_BEEF, ByteOrder::Big);
        w.put_u64(u64::MAX - 1);
        w.put_i32(-1);
        w.put_i64_in(-42, ByteOrder::Big);
        w.put_bytes(b"xyz");

        let mut r = WireReader::new(&buf);
        assert_eq!(r.get_u8().unwrap(), 7);
        assert!(r.get_bool().unwrap());
        assert_eq!(r.get_u16().unwrap(), 0xBEEF);
        assert_eq!(r.get_u32_in(ByteOrder::Big).unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.get_u64().unwrap(), u64::MAX - 1);
        assert_eq!(r.get_i32().unwrap(), -1);
        assert_eq!(r.get_i64_in(ByteOrder::Big).unwrap(), -42);
        assert_eq!(r.get_bytes(3).unwrap(), b"xyz");
        assert!(r.is_empty());
    }

    #[test]
    fn test_reader_scoped_advances_cursor() {
        let data = [0x00, 0x00, 0x00, 0x05, 0x05, 0x00, 0x00, 0x00];
        let mut r = WireReader::new(&data);

        let big = r.scoped(ByteOrder::Big, |inner| inner.get_i32()).unwrap();
        assert_eq!(big, 5);
        assert_eq!(r.position(), 4);
        assert_eq!(r.byte_order(), ByteOrder::Little);
        assert_eq!(r.get_i32().unwrap(), 5);
    }

    #[test]
    fn test_truncated_read() {
        let data = [1, 2, 3];
        let mut r = WireReader::new(&data);
        let err = r.get_u32().unwrap_err();
        assert!(matches!(
            err,
            GridwireError::Truncated {
                needed: 4,
                remaining: 3
            }
        ));
        // Failed reads do not move the cursor.
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = [9, 8];
        let mut r = WireReader::new(&data);
        assert_eq!(r.peek(2).unwrap(), &[9, 8]);
        assert_eq!(r.remaining(), 2);
        r.skip(1).unwrap();
        assert_eq!(r.get_u8().unwrap(), 8);
    }
}
