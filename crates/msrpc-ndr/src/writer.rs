//! NDR output stream

use std::collections::{HashMap, HashSet};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{NdrContext, NdrEncode, NdrError, Result};

/// First referent id handed out for a non-null pointer.
///
/// Windows stubs start at the same value; peers never interpret it.
pub const FIRST_REFERENT_ID: u32 = 0x0002_0000;

const REFERENT_STEP: u32 = 4;

/// Cursor over an NDR stub being encoded.
///
/// The writer's position is the absolute offset from the start of the stub,
/// which is what every alignment computation is relative to.
#[derive(Debug)]
pub struct NdrWriter {
    buf: BytesMut,
    ctx: NdrContext,
    next_referent: u32,
    full_referents: HashMap<usize, u32>,
    full_pending: HashSet<usize>,
}

impl Default for NdrWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl NdrWriter {
    pub fn new() -> Self {
        Self::with_context(NdrContext::new())
    }

    pub fn with_context(ctx: NdrContext) -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            ctx,
            next_referent: FIRST_REFERENT_ID,
            full_referents: HashMap::new(),
            full_pending: HashSet::new(),
        }
    }

    pub fn context(&self) -> &NdrContext {
        &self.ctx
    }

    /// Current offset from the start of the stub
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Write zero padding up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let padding = NdrContext::align_padding(self.position(), alignment);
        self.buf.put_bytes(0, padding);
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    #[inline]
    pub fn write_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.align(2);
        self.ctx.put_u16(&mut self.buf, value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.align(2);
        self.ctx.put_i16(&mut self.buf, value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.align(4);
        self.ctx.put_u32(&mut self.buf, value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.align(4);
        self.ctx.put_i32(&mut self.buf, value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.align(8);
        self.ctx.put_u64(&mut self.buf, value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.align(8);
        self.ctx.put_i64(&mut self.buf, value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.align(4);
        self.ctx.put_f32(&mut self.buf, value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.align(8);
        self.ctx.put_f64(&mut self.buf, value);
    }

    /// Write raw octets with no alignment.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Write a conformance count (`MaximumCount`).
    pub fn write_size(&mut self, count: usize) -> Result<()> {
        let count = u32::try_from(count).map_err(|_| NdrError::IntegerOverflow("conformance count"))?;
        self.write_u32(count);
        Ok(())
    }

    /// Write a variance pair (`Offset`, `ActualCount`).
    pub fn write_variance(&mut self, offset: usize, actual_count: usize) -> Result<()> {
        let offset = u32::try_from(offset).map_err(|_| NdrError::IntegerOverflow("variance offset"))?;
        let actual_count =
            u32::try_from(actual_count).map_err(|_| NdrError::IntegerOverflow("variance count"))?;
        self.write_u32(offset);
        self.write_u32(actual_count);
        Ok(())
    }

    /// Write the representation of a unique pointer and return the id used.
    ///
    /// A null pointer is a zero id. A non-null pointer gets a fresh id; its
    /// body is the caller's to write in the deferred phase.
    pub fn write_referent(&mut self, present: bool) -> u32 {
        let id = if present { self.allocate_referent() } else { 0 };
        self.write_u32(id);
        id
    }

    /// Write the representation of a full pointer identified by `key`.
    ///
    /// Two full pointers with the same key share one referent id, and only
    /// the first one to reach the deferred phase carries the body.
    pub fn write_full_referent(&mut self, key: Option<usize>) -> u32 {
        let id = match key {
            None => 0,
            Some(key) => match self.full_referents.get(&key) {
                Some(&id) => id,
                None => {
                    let id = self.allocate_referent();
                    self.full_referents.insert(key, id);
                    self.full_pending.insert(key);
                    id
                }
            },
        };
        self.write_u32(id);
        id
    }

    /// Claim the right to write the body for a full pointer.
    ///
    /// Returns `true` exactly once per key.
    pub fn take_full_body(&mut self, key: usize) -> bool {
        self.full_pending.remove(&key)
    }

    /// Encode a complete value: flat part immediately followed by its
    /// deferred pointer bodies. This is how top-level parameters are written.
    pub fn write<T: NdrEncode>(&mut self, value: &T) -> Result<()> {
        value.ndr_encode(self)?;
        value.ndr_encode_deferred(self)
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn allocate_referent(&mut self) -> u32 {
        let id = self.next_referent;
        self.next_referent = self.next_referent.wrapping_add(REFERENT_STEP).max(FIRST_REFERENT_ID);
        id
    }
}
