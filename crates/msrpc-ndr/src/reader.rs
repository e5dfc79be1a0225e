//! NDR input stream

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::{NdrContext, NdrDecode, NdrError, Result};

type SharedReferent = Arc<dyn Any + Send + Sync>;

/// Cursor over an NDR stub being decoded.
///
/// Padding is skipped without being inspected. Every read checks the
/// remaining length first, so a truncated stub yields
/// [`NdrError::ShortBuffer`] rather than a panic.
#[derive(Debug)]
pub struct NdrReader {
    buf: Bytes,
    pos: usize,
    ctx: NdrContext,
    full_referents: HashMap<u32, SharedReferent>,
}

macro_rules! read_scalar {
    ($($name:ident => $ty:ty, $size:expr, $get:ident;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                self.align($size);
                self.ensure($size)?;
                let mut slice = &self.buf[self.pos..self.pos + $size];
                let value = self.ctx.$get(&mut slice);
                self.pos += $size;
                Ok(value)
            }
        )*
    };
}

impl NdrReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_context(data, NdrContext::new())
    }

    pub fn with_context(data: impl Into<Bytes>, ctx: NdrContext) -> Self {
        Self {
            buf: data.into(),
            pos: 0,
            ctx,
            full_referents: HashMap::new(),
        }
    }

    pub fn context(&self) -> &NdrContext {
        &self.ctx
    }

    /// Current offset from the start of the stub
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Skip padding up to the next multiple of `alignment`.
    ///
    /// Never fails: a stub that ends inside the padding is caught by the next read.
    pub fn align(&mut self, alignment: usize) {
        let padding = NdrContext::align_padding(self.pos, alignment);
        self.pos += padding.min(self.remaining());
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(NdrError::ShortBuffer {
                needed,
                have: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.buf[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_scalar! {
        read_u16 => u16, 2, get_u16;
        read_i16 => i16, 2, get_i16;
        read_u32 => u32, 4, get_u32;
        read_i32 => i32, 4, get_i32;
        read_u64 => u64, 8, get_u64;
        read_i64 => i64, 8, get_i64;
        read_f32 => f32, 4, get_f32;
        read_f64 => f64, 8, get_f64;
    }

    /// Read `len` raw octets with no alignment.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        let data = self.buf.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(data)
    }

    /// Read a conformance count (`MaximumCount`).
    pub fn read_size(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Read a variance pair (`Offset`, `ActualCount`).
    pub fn read_variance(&mut self) -> Result<(usize, usize)> {
        let offset = self.read_u32()? as usize;
        let actual_count = self.read_u32()? as usize;
        Ok((offset, actual_count))
    }

    /// Read a pointer representation. Zero means null.
    pub fn read_referent(&mut self) -> Result<u32> {
        self.read_u32()
    }

    /// Reject a declared element count before anything is allocated for it.
    ///
    /// `element_size` is the smallest wire size of one element, so a count
    /// that cannot possibly fit in the rest of the stub is refused outright.
    pub fn check_span(&self, count: usize, element_size: usize) -> Result<()> {
        let span = count
            .checked_mul(element_size.max(1))
            .ok_or(NdrError::IntegerOverflow("array span"))?;
        if span > self.remaining() {
            return Err(NdrError::BufferOverflow {
                count,
                element_size,
                remaining: self.remaining(),
            });
        }
        if span > self.ctx.max_allocation {
            return Err(NdrError::AllocationLimitExceeded {
                requested: span,
                limit: self.ctx.max_allocation,
            });
        }
        Ok(())
    }

    /// Look up a full pointer body already decoded under `id`.
    pub fn full_referent<T: Any + Send + Sync>(&self, id: u32) -> Result<Option<Arc<T>>> {
        match self.full_referents.get(&id) {
            None => Ok(None),
            Some(shared) => Arc::clone(shared)
                .downcast::<T>()
                .map(Some)
                .map_err(|_| NdrError::InvalidPointer(id)),
        }
    }

    /// Record the body decoded for full pointer `id`.
    pub fn remember_full_referent<T: Any + Send + Sync>(&mut self, id: u32, value: Arc<T>) {
        self.full_referents.insert(id, value);
    }

    /// Decode a complete value: flat part followed by its deferred bodies.
    pub fn read<T: NdrDecode>(&mut self) -> Result<T> {
        let mut value = T::ndr_decode(self)?;
        value.ndr_decode_deferred(self)?;
        Ok(value)
    }
}
