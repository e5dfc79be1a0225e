//! NDR encoding trait

use crate::{NdrWriter, Result};

/// Trait for types that can be encoded to NDR format.
///
/// Encoding is two-phase. [`ndr_encode`](NdrEncode::ndr_encode) writes the
/// flat part of the value: scalars, conformance headers and the referent ids
/// of embedded pointers. [`ndr_encode_deferred`](NdrEncode::ndr_encode_deferred)
/// then writes the bodies of those pointers, in the order their ids were
/// emitted. A structure implements both by visiting its fields in declaration
/// order, so every pointee lands after the whole flat layout of its parent.
pub trait NdrEncode {
    /// Write the flat part of this value.
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()>;

    /// Write the bodies of pointers reached from the flat part.
    fn ndr_encode_deferred(&self, _w: &mut NdrWriter) -> Result<()> {
        Ok(())
    }

    /// Get the NDR alignment requirement for this type
    fn ndr_align() -> usize
    where
        Self: Sized,
    {
        1
    }
}
