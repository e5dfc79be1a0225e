//! Counted strings
//!
//! `RPC_UNICODE_STRING` and `RPC_STRING` from MS-DTYP. Both carry explicit
//! byte lengths next to a unique pointer to the character buffer:
//!
//! ```text
//! Length: u16          # bytes in use, no terminator
//! MaximumLength: u16   # bytes allocated
//! Buffer: unique ptr   # deferred conformant varying array
//! ```
//!
//! An empty value is sent as a null buffer pointer. Length fields left at
//! zero are derived from the text when encoding, and equality compares the
//! derived lengths, so a value built with zero lengths equals its decoded
//! copy.

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

fn length_u16(field: &'static str, bytes: usize) -> Result<u16> {
    u16::try_from(bytes).map_err(|_| NdrError::FieldOutOfRange {
        field,
        value: bytes as u64,
        min: 0,
        max: u16::MAX as u64,
    })
}

fn read_counted_header(r: &mut NdrReader, unit_size: usize) -> Result<usize> {
    let max_count = r.read_size()?;
    let (offset, actual_count) = r.read_variance()?;
    if offset != 0 || actual_count > max_count {
        return Err(NdrError::ConformanceMismatch {
            max_count,
            offset,
            actual_count,
        });
    }
    r.check_span(actual_count, unit_size)?;
    Ok(actual_count)
}

/// `RPC_UNICODE_STRING`
#[derive(Debug, Clone, Default)]
pub struct RpcUnicodeString {
    /// Bytes in use. Zero means "derive from `value`".
    pub length: u16,
    /// Bytes allocated. Zero means "same as `length`".
    pub maximum_length: u16,
    pub value: String,
    pending: bool,
}

impl RpcUnicodeString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    fn lengths(&self) -> Result<(u16, u16)> {
        let length = if self.length == 0 {
            length_u16("RPC_UNICODE_STRING.Length", self.value.encode_utf16().count() * 2)?
        } else {
            self.length
        };
        let maximum_length = if self.maximum_length == 0 {
            length
        } else {
            self.maximum_length
        };
        if maximum_length < length || length % 2 != 0 || maximum_length % 2 != 0 {
            return Err(NdrError::ConformanceMismatch {
                max_count: maximum_length as usize,
                offset: 0,
                actual_count: length as usize,
            });
        }
        Ok((length, maximum_length))
    }
}

impl PartialEq for RpcUnicodeString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.lengths().ok() == other.lengths().ok()
    }
}

impl Eq for RpcUnicodeString {}

impl From<&str> for RpcUnicodeString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl NdrEncode for RpcUnicodeString {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        let (length, maximum_length) = self.lengths()?;
        w.write_u16(length);
        w.write_u16(maximum_length);
        w.write_referent(!self.value.is_empty());
        Ok(())
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        if self.value.is_empty() {
            return Ok(());
        }
        let (length, maximum_length) = self.lengths()?;
        let units = length as usize / 2;
        w.write_size(maximum_length as usize / 2)?;
        w.write_variance(0, units)?;
        self.value
            .encode_utf16()
            .chain(std::iter::repeat(0))
            .take(units)
            .for_each(|unit| w.write_u16(unit));
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for RpcUnicodeString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let length = r.read_u16()?;
        let maximum_length = r.read_u16()?;
        let referent = r.read_referent()?;
        Ok(Self {
            length,
            maximum_length,
            value: String::new(),
            pending: referent != 0,
        })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        if !std::mem::take(&mut self.pending) {
            return Ok(());
        }
        let count = read_counted_header(r, 2)?;
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(r.read_u16()?);
        }
        while units.last() == Some(&0) {
            units.pop();
        }
        self.value = char::decode_utf16(units).collect::<std::result::Result<String, _>>()?;
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        8
    }
}

/// `RPC_STRING`, the ANSI counterpart.
///
/// `MaximumLength` defaults to `Length + 1` so the receiver has room for a
/// terminator, as Windows clients send it.
#[derive(Debug, Clone, Default)]
pub struct RpcString {
    pub length: u16,
    pub maximum_length: u16,
    pub value: String,
    pending: bool,
}

impl RpcString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    fn lengths(&self) -> Result<(u16, u16)> {
        let length = if self.length == 0 {
            length_u16("RPC_STRING.Length", self.value.len())?
        } else {
            self.length
        };
        let maximum_length = if self.maximum_length == 0 {
            length_u16("RPC_STRING.MaximumLength", length as usize + 1)?
        } else {
            self.maximum_length
        };
        if maximum_length < length {
            return Err(NdrError::ConformanceMismatch {
                max_count: maximum_length as usize,
                offset: 0,
                actual_count: length as usize,
            });
        }
        Ok((length, maximum_length))
    }
}

impl PartialEq for RpcString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.lengths().ok() == other.lengths().ok()
    }
}

impl Eq for RpcString {}

impl From<&str> for RpcString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl NdrEncode for RpcString {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        let (length, maximum_length) = self.lengths()?;
        w.write_u16(length);
        w.write_u16(maximum_length);
        w.write_referent(!self.value.is_empty());
        Ok(())
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        if self.value.is_empty() {
            return Ok(());
        }
        let (length, maximum_length) = self.lengths()?;
        let length = length as usize;
        w.write_size(maximum_length as usize)?;
        w.write_variance(0, length)?;
        let bytes = self.value.as_bytes();
        let used = length.min(bytes.len());
        w.write_bytes(&bytes[..used]);
        for _ in used..length {
            w.write_u8(0);
        }
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for RpcString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let length = r.read_u16()?;
        let maximum_length = r.read_u16()?;
        let referent = r.read_referent()?;
        Ok(Self {
            length,
            maximum_length,
            value: String::new(),
            pending: referent != 0,
        })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        if !std::mem::take(&mut self.pending) {
            return Ok(());
        }
        let count = read_counted_header(r, 1)?;
        let data = r.read_bytes(count)?;
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        self.value = String::from_utf8(data[..end].to_vec())?;
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        8
    }
}
