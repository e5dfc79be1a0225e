//! NDR array types
//!
//! - Fixed arrays: size known at compile time, no header
//! - Conformant arrays: `MaximumCount` precedes the elements
//! - Varying arrays: `Offset` and `ActualCount` precede the elements
//! - Conformant varying arrays: all three counts
//!
//! Decoders validate every count against the remaining stub before
//! allocating, so a hostile count fails with
//! [`NdrError::BufferOverflow`] instead of reserving memory for it.

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

fn encode_elements<T: NdrEncode>(w: &mut NdrWriter, elements: &[T]) -> Result<()> {
    elements.iter().try_for_each(|e| e.ndr_encode(w))
}

fn encode_elements_deferred<T: NdrEncode>(w: &mut NdrWriter, elements: &[T]) -> Result<()> {
    elements.iter().try_for_each(|e| e.ndr_encode_deferred(w))
}

fn decode_elements<T: NdrDecode>(r: &mut NdrReader, count: usize) -> Result<Vec<T>> {
    r.check_span(count, T::ndr_min_size())?;
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        elements.push(T::ndr_decode(r)?);
    }
    Ok(elements)
}

fn decode_elements_deferred<T: NdrDecode>(r: &mut NdrReader, elements: &mut [T]) -> Result<()> {
    elements.iter_mut().try_for_each(|e| e.ndr_decode_deferred(r))
}

fn check_variance(max_count: usize, offset: usize, actual_count: usize) -> Result<()> {
    match offset.checked_add(actual_count) {
        Some(end) if end <= max_count => Ok(()),
        _ => Err(NdrError::ConformanceMismatch {
            max_count,
            offset,
            actual_count,
        }),
    }
}

/// Fixed-size array
///
/// Wire format: just the elements (no size prefix)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedArray<T, const N: usize> {
    pub elements: [T; N],
}

impl<T: Default + Copy, const N: usize> Default for FixedArray<T, N> {
    fn default() -> Self {
        Self {
            elements: [T::default(); N],
        }
    }
}

impl<T, const N: usize> FixedArray<T, N> {
    pub fn new(elements: [T; N]) -> Self {
        Self { elements }
    }
}

impl<T: NdrEncode, const N: usize> NdrEncode for FixedArray<T, N> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        encode_elements(w, &self.elements)
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_elements_deferred(w, &self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

impl<T: NdrDecode, const N: usize> NdrDecode for FixedArray<T, N> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let elements: Vec<T> = decode_elements(r, N)?;
        let elements: [T; N] = elements.try_into().map_err(|_| NdrError::ConformanceMismatch {
            max_count: N,
            offset: 0,
            actual_count: N,
        })?;
        Ok(Self { elements })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_elements_deferred(r, &mut self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }

    fn ndr_min_size() -> usize {
        N * T::ndr_min_size()
    }
}

/// Conformant array - size determined at runtime
///
/// Wire format:
/// ```text
/// max_count: u32      # Maximum elements
/// elements[max_count] # Element data
/// ```
///
/// In a structure the count is hoisted to the start of the structure while
/// the elements come last; use [`encode_conformance`] and
/// [`ConformantArray::encode_body`] for that layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConformantArray<T> {
    pub elements: Vec<T>,
}

impl<T> ConformantArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T> From<Vec<T>> for ConformantArray<T> {
    fn from(elements: Vec<T>) -> Self {
        Self { elements }
    }
}

impl<T: NdrEncode> ConformantArray<T> {
    /// Elements only, for a structure that already wrote the conformance.
    pub fn encode_body(&self, w: &mut NdrWriter) -> Result<()> {
        encode_elements(w, &self.elements)
    }
}

impl<T: NdrDecode> ConformantArray<T> {
    /// Elements only, with the count taken from a hoisted conformance.
    pub fn decode_body(r: &mut NdrReader, max_count: usize) -> Result<Self> {
        Ok(Self {
            elements: decode_elements(r, max_count)?,
        })
    }
}

impl<T: NdrEncode> NdrEncode for ConformantArray<T> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_size(self.elements.len())?;
        encode_elements(w, &self.elements)
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_elements_deferred(w, &self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align().max(4)
    }
}

impl<T: NdrDecode> NdrDecode for ConformantArray<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let max_count = r.read_size()?;
        Self::decode_body(r, max_count)
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_elements_deferred(r, &mut self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align().max(4)
    }

    fn ndr_min_size() -> usize {
        4
    }
}

/// Varying array - window into a fixed array of `N` elements
///
/// Wire format:
/// ```text
/// offset: u32
/// actual_count: u32
/// elements[actual_count]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaryingArray<T, const N: usize> {
    pub offset: usize,
    pub elements: Vec<T>,
}

impl<T, const N: usize> Default for VaryingArray<T, N> {
    fn default() -> Self {
        Self {
            offset: 0,
            elements: Vec::new(),
        }
    }
}

impl<T, const N: usize> VaryingArray<T, N> {
    pub fn new(elements: Vec<T>) -> Self {
        Self { offset: 0, elements }
    }

    pub fn with_offset(offset: usize, elements: Vec<T>) -> Self {
        Self { offset, elements }
    }
}

impl<T: NdrEncode, const N: usize> NdrEncode for VaryingArray<T, N> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        check_variance(N, self.offset, self.elements.len())?;
        w.write_variance(self.offset, self.elements.len())?;
        encode_elements(w, &self.elements)
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_elements_deferred(w, &self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align().max(4)
    }
}

impl<T: NdrDecode, const N: usize> NdrDecode for VaryingArray<T, N> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let (offset, actual_count) = r.read_variance()?;
        check_variance(N, offset, actual_count)?;
        Ok(Self {
            offset,
            elements: decode_elements(r, actual_count)?,
        })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_elements_deferred(r, &mut self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align().max(4)
    }

    fn ndr_min_size() -> usize {
        8
    }
}

/// Conformant varying array
///
/// Wire format:
/// ```text
/// max_count: u32
/// offset: u32
/// actual_count: u32
/// elements[actual_count]
/// ```
///
/// A `max_count` of zero is derived from `offset + elements.len()` on encode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConformantVaryingArray<T> {
    pub max_count: usize,
    pub offset: usize,
    pub elements: Vec<T>,
}

impl<T> ConformantVaryingArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            max_count: elements.len(),
            offset: 0,
            elements,
        }
    }

    pub fn with_max(max_count: usize, elements: Vec<T>) -> Self {
        Self {
            max_count,
            offset: 0,
            elements,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: NdrEncode> NdrEncode for ConformantVaryingArray<T> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        let actual_count = self.elements.len();
        let max_count = if self.max_count == 0 {
            self.offset + actual_count
        } else {
            self.max_count
        };
        check_variance(max_count, self.offset, actual_count)?;
        w.write_size(max_count)?;
        w.write_variance(self.offset, actual_count)?;
        encode_elements(w, &self.elements)
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        encode_elements_deferred(w, &self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align().max(4)
    }
}

impl<T: NdrDecode> NdrDecode for ConformantVaryingArray<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let max_count = r.read_size()?;
        let (offset, actual_count) = r.read_variance()?;
        check_variance(max_count, offset, actual_count)?;
        Ok(Self {
            max_count,
            offset,
            elements: decode_elements(r, actual_count)?,
        })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        decode_elements_deferred(r, &mut self.elements)
    }

    fn ndr_align() -> usize {
        T::ndr_align().max(4)
    }

    fn ndr_min_size() -> usize {
        12
    }
}

/// Write a hoisted conformance count for a conformant structure.
pub fn encode_conformance(w: &mut NdrWriter, max_count: usize) -> Result<()> {
    w.write_size(max_count)
}

/// Read a hoisted conformance count for a conformant structure.
pub fn decode_conformance(r: &mut NdrReader) -> Result<usize> {
    r.read_size()
}

/// Encode a `[size_is(size)]` array whose count lives in a sibling field.
///
/// The wire always carries exactly `size` elements: `items` is truncated
/// when longer and padded with default values when shorter.
pub fn encode_sized<T: NdrEncode + Default>(w: &mut NdrWriter, items: &[T], size: usize) -> Result<()> {
    w.write_size(size)?;
    let filler = T::default();
    let padded = || items.iter().chain(std::iter::repeat(&filler)).take(size);
    padded().try_for_each(|e| e.ndr_encode(w))?;
    padded().try_for_each(|e| e.ndr_encode_deferred(w))
}

/// Decode a `[size_is(..)]` array written by [`encode_sized`].
pub fn decode_sized<T: NdrDecode>(r: &mut NdrReader) -> Result<Vec<T>> {
    let size = r.read_size()?;
    let mut elements = decode_elements(r, size)?;
    decode_elements_deferred(r, &mut elements)?;
    Ok(elements)
}
