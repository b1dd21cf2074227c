//! Homogeneous lists.
//!
//! A list is a begin-data-structure frame, each element in sequence, then an
//! end-data-structure frame. There is no element count: decoders stop at the
//! end marker, so [`ListIter`] can stream arbitrarily long lists.

use std::marker::PhantomData;

use super::{WireDecode, WireEncode};
use crate::error::{GridwireError, Result};
use crate::protocol::{FrameHeader, WireReader, WireWriter};

impl<T: WireEncode> WireEncode for [T] {
    fn encode(&self, w: &mut WireWriter<'_>) {
        FrameHeader::begin_data_structure().encode(w);
        for item in self {
            item.encode(w);
        }
        FrameHeader::end_data_structure().encode(w);
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    fn encode(&self, w: &mut WireWriter<'_>) {
        self.as_slice().encode(w);
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        ListIter::<T>::begin(r)?.collect()
    }
}

/// Streaming decoder over the elements of a list.
///
/// Yields elements until the end marker is consumed. After an error the
/// iterator is fused.
pub struct ListIter<'r, 'a, T> {
    reader: &'r mut WireReader<'a>,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, 'a, T: WireDecode> ListIter<'r, 'a, T> {
    /// Consume the begin marker and return an iterator over the elements.
    pub fn begin(reader: &'r mut WireReader<'a>) -> Result<Self> {
        let header = FrameHeader::decode(reader)?;
        if !header.is_begin_data_structure() {
            return Err(GridwireError::UnexpectedFrame {
                expected: "begin data structure",
                flags: header.flags,
            });
        }
        Ok(Self {
            reader,
            done: false,
            _marker: PhantomData,
        })
    }

    fn next_item(&mut self) -> Result<Option<T>> {
        if FrameHeader::peek(self.reader)?.is_end_data_structure() {
            FrameHeader::decode(self.reader)?;
            return Ok(None);
        }
        T::decode(self.reader).map(Some)
    }
}

impl<T: WireDecode> Iterator for ListIter<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_item() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
