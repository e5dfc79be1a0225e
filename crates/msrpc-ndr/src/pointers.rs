//! NDR pointer types
//!
//! - Reference (`[ref]`): never null, no wire representation, body inline
//! - Unique (`[unique]`): nullable, 4-byte referent id, body deferred
//! - Full (`[ptr]`): nullable, 4-byte referent id, body deferred, may alias
//!
//! Unique and full pointers follow the two-phase protocol of
//! [`NdrEncode`]/[`NdrDecode`]: the flat phase writes or reads the referent
//! id only, and the deferred phase handles the body. On decode the pointer
//! remembers that a body is owed and fills itself in when the reader reaches
//! the deferred section.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::{NdrDecode, NdrEncode, NdrReader, NdrWriter, Result};

/// Reference pointer - non-null, data follows inline
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefPtr<T>(pub T);

impl<T> RefPtr<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for RefPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for RefPtr<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: NdrEncode> NdrEncode for RefPtr<T> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        self.0.ndr_encode(w)
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        self.0.ndr_encode_deferred(w)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

impl<T: NdrDecode> NdrDecode for RefPtr<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        T::ndr_decode(r).map(Self)
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0.ndr_decode_deferred(r)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }

    fn ndr_min_size() -> usize {
        T::ndr_min_size()
    }
}

/// Unique pointer - nullable, no aliasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquePtr<T> {
    value: Option<Box<T>>,
    pending: bool,
}

impl<T> UniquePtr<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            pending: false,
        }
    }

    pub fn null() -> Self {
        Self {
            value: None,
            pending: false,
        }
    }

    pub fn from_option(opt: Option<T>) -> Self {
        opt.map_or_else(Self::null, Self::new)
    }

    pub fn into_option(self) -> Option<T> {
        self.value.map(|b| *b)
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.value.as_deref()
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        self.value.as_deref_mut()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none() && !self.pending
    }
}

impl<T> Default for UniquePtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for UniquePtr<T> {
    fn from(opt: Option<T>) -> Self {
        Self::from_option(opt)
    }
}

impl<T: NdrEncode> NdrEncode for UniquePtr<T> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_referent(self.value.is_some());
        Ok(())
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        match &self.value {
            Some(value) => w.write(&**value),
            None => Ok(()),
        }
    }

    fn ndr_align() -> usize {
        4
    }
}

impl<T: NdrDecode> NdrDecode for UniquePtr<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let referent = r.read_referent()?;
        Ok(Self {
            value: None,
            pending: referent != 0,
        })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        if std::mem::take(&mut self.pending) {
            self.value = Some(Box::new(r.read::<T>()?));
        }
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        4
    }
}

/// Full pointer - nullable, aliasing preserved
///
/// Two `FullPtr`s cloned from the same `Arc` encode to the same referent id
/// and a single body; decoding rebuilds the sharing.
#[derive(Debug, Clone)]
pub struct FullPtr<T> {
    value: Option<Arc<T>>,
    pending: u32,
}

impl<T> FullPtr<T> {
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            value: Some(value),
            pending: 0,
        }
    }

    pub fn null() -> Self {
        Self {
            value: None,
            pending: 0,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.value.as_deref()
    }

    pub fn as_arc(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none() && self.pending == 0
    }

    /// Whether both pointers refer to the same referent
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn key(&self) -> Option<usize> {
        self.value.as_ref().map(|v| Arc::as_ptr(v) as usize)
    }
}

impl<T: PartialEq> PartialEq for FullPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Default for FullPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for FullPtr<T> {
    fn from(opt: Option<T>) -> Self {
        opt.map_or_else(Self::null, Self::new)
    }
}

impl<T: NdrEncode> NdrEncode for FullPtr<T> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_full_referent(self.key());
        Ok(())
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        match (&self.value, self.key()) {
            (Some(value), Some(key)) if w.take_full_body(key) => w.write(&**value),
            _ => Ok(()),
        }
    }

    fn ndr_align() -> usize {
        4
    }
}

impl<T: NdrDecode + Send + Sync + 'static> NdrDecode for FullPtr<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let referent = r.read_referent()?;
        Ok(Self {
            value: None,
            pending: referent,
        })
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        let referent = std::mem::take(&mut self.pending);
        if referent == 0 {
            return Ok(());
        }
        let value = match r.full_referent::<T>(referent)? {
            Some(shared) => shared,
            None => {
                let value = Arc::new(r.read::<T>()?);
                r.remember_full_referent(referent, Arc::clone(&value));
                value
            }
        };
        self.value = Some(value);
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        4
    }
}
