//! NDR decoding trait

use crate::{NdrReader, Result};

/// Trait for types that can be decoded from NDR format.
///
/// Mirror of [`NdrEncode`](crate::NdrEncode): `ndr_decode` consumes the flat
/// part and leaves every non-null pointer pending, `ndr_decode_deferred`
/// resolves the pending pointers in declaration order once the reader has
/// reached the deferred section.
pub trait NdrDecode: Sized {
    /// Read the flat part of a value.
    fn ndr_decode(r: &mut NdrReader) -> Result<Self>;

    /// Fill in the bodies of pointers left pending by `ndr_decode`.
    fn ndr_decode_deferred(&mut self, _r: &mut NdrReader) -> Result<()> {
        Ok(())
    }

    /// Get the NDR alignment requirement for this type
    fn ndr_align() -> usize {
        1
    }

    /// Smallest number of wire bytes one element can occupy.
    ///
    /// Used to bounds-check declared counts before allocating.
    fn ndr_min_size() -> usize {
        1
    }
}
