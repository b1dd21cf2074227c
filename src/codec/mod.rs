//! Codec module - wire type serializers.
//!
//! Each wire type knows how to write itself into a [`WireWriter`] and read
//! itself back from a [`WireReader`]:
//!
//! - `str` / `String` - a frame whose body is the raw UTF-8 bytes
//! - `Option<T>` - the inner value, or a header-only is-null frame
//! - [`Uuid`](uuid::Uuid) - an is-nil marker plus 16 bytes with each half reversed
//! - `[T]` / `Vec<T>` - begin/end data-structure frames around the elements
//!
//! # Design
//!
//! Codecs are trait implementations on the value types rather than wrapper
//! objects, so message codecs can compose them with plain method calls.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gridwire_client::codec::{WireDecode, WireEncode};
//! use gridwire_client::protocol::{WireReader, WireWriter};
//!
//! let labels = vec!["a".to_string(), "b".to_string()];
//! let mut buf = BytesMut::new();
//! labels.encode(&mut WireWriter::new(&mut buf));
//!
//! let decoded: Vec<String> = Vec::decode(&mut WireReader::new(&buf)).unwrap();
//! assert_eq!(decoded, labels);
//! ```

mod identifier;
mod list;
mod optional;
mod string;

pub use list::ListIter;

use crate::error::Result;
use crate::protocol::{WireReader, WireWriter};

/// A value that can be written as one or more frames (or frame fields).
pub trait WireEncode {
    fn encode(&self, w: &mut WireWriter<'_>);
}

/// A value that can be read back from its wire form.
pub trait WireDecode: Sized {
    fn decode(r: &mut WireReader<'_>) -> Result<Self>;
}

impl<T: WireEncode + ?Sized> WireEncode for &T {
    fn encode(&self, w: &mut WireWriter<'_>) {
        (**self).encode(w);
    }
}
