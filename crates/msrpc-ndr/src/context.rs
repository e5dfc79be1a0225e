//! NDR stream context
//!
//! The context carries the data representation negotiated for a stream (byte
//! order) and the decoder's allocation ceiling. It also owns the scalar
//! byte-order helpers used by [`NdrWriter`](crate::NdrWriter) and
//! [`NdrReader`](crate::NdrReader).

use bytes::{Buf, BufMut};

/// Largest single allocation a decoder will make on behalf of a wire count.
pub const DEFAULT_MAX_ALLOCATION: usize = 16 * 1024 * 1024;

/// NDR encoding/decoding context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdrContext {
    /// Whether to use little-endian byte order
    pub little_endian: bool,
    /// Upper bound, in bytes, for any array or string decoded from the wire
    pub max_allocation: usize,
}

impl Default for NdrContext {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! byte_order_accessors {
    ($($ty:ty => $put:ident, $get:ident, $put_le:ident, $put_be:ident, $get_le:ident, $get_be:ident;)*) => {
        $(
            #[inline]
            pub fn $put<B: BufMut>(&self, buf: &mut B, value: $ty) {
                if self.little_endian {
                    buf.$put_le(value);
                } else {
                    buf.$put_be(value);
                }
            }

            #[inline]
            pub fn $get<B: Buf>(&self, buf: &mut B) -> $ty {
                if self.little_endian {
                    buf.$get_le()
                } else {
                    buf.$get_be()
                }
            }
        )*
    };
}

impl NdrContext {
    /// Little-endian context (the DCE default for x86 peers)
    pub fn new() -> Self {
        Self {
            little_endian: true,
            max_allocation: DEFAULT_MAX_ALLOCATION,
        }
    }

    /// Big-endian context
    pub fn big_endian() -> Self {
        Self {
            little_endian: false,
            ..Self::new()
        }
    }

    pub fn with_byte_order(little_endian: bool) -> Self {
        Self {
            little_endian,
            ..Self::new()
        }
    }

    /// Override the decoder allocation ceiling
    pub fn with_max_allocation(mut self, limit: usize) -> Self {
        self.max_allocation = limit;
        self
    }

    /// Number of pad bytes needed to move `position` to a multiple of `alignment`
    #[inline]
    pub fn align_padding(position: usize, alignment: usize) -> usize {
        if alignment <= 1 {
            return 0;
        }
        let remainder = position % alignment;
        if remainder == 0 {
            0
        } else {
            alignment - remainder
        }
    }

    byte_order_accessors! {
        u16 => put_u16, get_u16, put_u16_le, put_u16, get_u16_le, get_u16;
        i16 => put_i16, get_i16, put_i16_le, put_i16, get_i16_le, get_i16;
        u32 => put_u32, get_u32, put_u32_le, put_u32, get_u32_le, get_u32;
        i32 => put_i32, get_i32, put_i32_le, put_i32, get_i32_le, get_i32;
        u64 => put_u64, get_u64, put_u64_le, put_u64, get_u64_le, get_u64;
        i64 => put_i64, get_i64, put_i64_le, put_i64, get_i64_le, get_i64;
        f32 => put_f32, get_f32, put_f32_le, put_f32, get_f32_le, get_f32;
        f64 => put_f64, get_f64, put_f64_le, put_f64, get_f64_le, get_f64;
    }
}
