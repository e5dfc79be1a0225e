//! Context handles
//!
//! A context handle is 20 opaque bytes: a 32-bit attribute word and a GUID
//! chosen by the server. The codec passes them through verbatim and never
//! looks inside. In, out and in-out handles share this one representation;
//! only the operation decides which direction carries it.

use std::fmt;

use crate::{Guid, NdrDecode, NdrEncode, NdrReader, NdrWriter, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextHandle {
    pub attributes: u32,
    pub uuid: Guid,
}

impl ContextHandle {
    /// Wire size in bytes
    pub const SIZE: usize = 20;

    pub const fn new(attributes: u32, uuid: Guid) -> Self {
        Self { attributes, uuid }
    }

    /// The all-zero handle, meaning "no handle" or "closed".
    pub const fn nil() -> Self {
        Self::new(0, Guid::NIL)
    }

    pub fn is_nil(&self) -> bool {
        self.attributes == 0 && self.uuid.is_nil()
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{}", self.attributes, self.uuid)
    }
}

impl NdrEncode for ContextHandle {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_u32(self.attributes);
        self.uuid.ndr_encode(w)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for ContextHandle {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let attributes = r.read_u32()?;
        let uuid = Guid::ndr_decode(r)?;
        Ok(Self { attributes, uuid })
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        Self::SIZE
    }
}
