//! NDR string types
//!
//! `[string]` data is a conformant varying array of code units. A non-empty
//! value carries a terminating zero which is counted in both `MaximumCount`
//! and `ActualCount`. An empty value is written with all three counts at zero
//! and no data, which is how Windows stubs marshal `L""`.
//!
//! Wire format:
//! ```text
//! max_count: u32     # code units including terminator
//! offset: u32        # always 0
//! actual_count: u32  # code units including terminator
//! data[actual_count]
//! ```

use std::fmt;

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

fn read_string_header(r: &mut NdrReader, unit_size: usize) -> Result<usize> {
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

/// Narrow (`char`) string
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct NdrString(pub String);

impl NdrString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for NdrString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NdrString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NdrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl NdrEncode for NdrString {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        if self.0.contains('\0') {
            return Err(NdrError::InvalidString("embedded NUL".into()));
        }
        let count = if self.0.is_empty() { 0 } else { self.0.len() + 1 };
        w.write_size(count)?;
        w.write_variance(0, count)?;
        if count > 0 {
            w.write_bytes(self.0.as_bytes());
            w.write_u8(0);
        }
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for NdrString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let count = read_string_header(r, 1)?;
        let data = r.read_bytes(count)?;
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Ok(Self(String::from_utf8(data[..end].to_vec())?))
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        12
    }
}

/// Wide (`wchar_t`) string, UTF-16 on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct NdrWString(pub String);

impl NdrWString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Code units on the wire, terminator included
    pub fn wire_len(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.encode_utf16().count() + 1
        }
    }
}

impl From<&str> for NdrWString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NdrWString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NdrWString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl NdrEncode for NdrWString {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        if self.0.contains('\0') {
            return Err(NdrError::InvalidString("embedded NUL".into()));
        }
        let count = self.wire_len();
        w.write_size(count)?;
        w.write_variance(0, count)?;
        if count > 0 {
            self.0.encode_utf16().for_each(|unit| w.write_u16(unit));
            w.write_u16(0);
        }
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for NdrWString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let count = read_string_header(r, 2)?;
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(r.read_u16()?);
        }
        while units.last() == Some(&0) {
            units.pop();
        }
        let s = char::decode_utf16(units).collect::<std::result::Result<String, _>>()?;
        Ok(Self(s))
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        12
    }
}
