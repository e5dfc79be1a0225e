//! NDR (Network Data Representation) codec for MSRPC stubs
//!
//! This crate serializes typed values to and from the NDR 2.0 octet stream
//! used by DCE RPC and MS-RPCE request and response bodies.
//!
//! # NDR Wire Format
//!
//! - Primitives align to their natural size (1, 2, 4, or 8 bytes)
//! - Padding is written as zeros and skipped without inspection on read
//! - Conformance and variance counts are 32-bit and align to 4
//! - Unique and full pointers are a 4-byte referent id; the body is deferred
//!   until the flat part of the enclosing construct has been written
//! - Strings are conformant varying arrays with a null terminator
//!
//! # Usage
//!
//! ```
//! use msrpc_ndr::{NdrReader, NdrWString, NdrWriter, UniquePtr};
//!
//! let mut w = NdrWriter::new();
//! w.write(&UniquePtr::new(NdrWString::new("Application"))).unwrap();
//! w.write(&7u32).unwrap();
//!
//! let mut r = NdrReader::new(w.into_bytes());
//! let name: UniquePtr<NdrWString> = r.read().unwrap();
//! assert_eq!(name.as_ref().unwrap().as_str(), "Application");
//! assert_eq!(r.read::<u32>().unwrap(), 7);
//! ```

mod arrays;
mod context;
mod counted;
mod decode;
mod encode;
mod error;
mod handle;
mod pointers;
mod primitives;
mod reader;
mod strings;
mod union;
mod writer;

pub use arrays::{
    decode_conformance, decode_sized, encode_conformance, encode_sized, ConformantArray,
    ConformantVaryingArray, FixedArray, VaryingArray,
};
pub use context::{NdrContext, DEFAULT_MAX_ALLOCATION};
pub use counted::{RpcString, RpcUnicodeString};
pub use decode::NdrDecode;
pub use encode::NdrEncode;
pub use error::{check_range, NdrError, Result};
pub use handle::ContextHandle;
pub use pointers::{FullPtr, RefPtr, UniquePtr};
pub use primitives::Guid;
pub use reader::NdrReader;
pub use strings::{NdrString, NdrWString};
pub use union::{decode_switched, encode_switched, Encapsulated, NdrUnion};
pub use writer::{NdrWriter, FIRST_REFERENT_ID};

/// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Encode one complete value into a fresh little-endian stub.
pub fn encode_to_bytes<T: NdrEncode>(value: &T) -> Result<Bytes> {
    let mut w = NdrWriter::new();
    w.write(value)?;
    Ok(w.into_bytes())
}

/// Decode one complete value from a little-endian stub.
pub fn decode_from_bytes<T: NdrDecode>(data: impl Into<Bytes>) -> Result<T> {
    NdrReader::new(data).read()
}
