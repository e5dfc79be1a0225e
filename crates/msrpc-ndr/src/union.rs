//! Discriminated unions
//!
//! An IDL union is a discriminant followed by exactly one arm. Two shapes
//! exist on the wire:
//!
//! - encapsulated: the union is a structure holding its own discriminant;
//!   see [`Encapsulated`]
//! - non-encapsulated (`[switch_is(field)]`): the discriminant value comes
//!   from a sibling field of the enclosing structure but is still marshaled
//!   in front of the arm; see [`encode_switched`] and [`decode_switched`]

use std::fmt::Debug;

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

/// A union type: knows its discriminant and how to code each arm.
pub trait NdrUnion: Sized {
    type Discriminant: NdrEncode + NdrDecode + Copy + PartialEq + Debug + Into<i64>;

    /// Discriminant selecting the arm currently held
    fn discriminant(&self) -> Self::Discriminant;

    fn encode_arm(&self, w: &mut NdrWriter) -> Result<()>;

    fn encode_arm_deferred(&self, _w: &mut NdrWriter) -> Result<()> {
        Ok(())
    }

    /// Decode the arm selected by `discriminant`.
    ///
    /// Unknown discriminants without a default arm should fail with
    /// [`NdrError::InvalidDiscriminant`].
    fn decode_arm(discriminant: Self::Discriminant, r: &mut NdrReader) -> Result<Self>;

    fn decode_arm_deferred(&mut self, _r: &mut NdrReader) -> Result<()> {
        Ok(())
    }

    /// Largest alignment of any arm
    fn arm_align() -> usize;
}

/// Union carrying its own discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encapsulated<U>(pub U);

impl<U: NdrUnion> NdrEncode for Encapsulated<U> {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        w.align(<Self as NdrEncode>::ndr_align());
        self.0.discriminant().ndr_encode(w)?;
        w.align(U::arm_align());
        self.0.encode_arm(w)
    }

    fn ndr_encode_deferred(&self, w: &mut NdrWriter) -> Result<()> {
        self.0.encode_arm_deferred(w)
    }

    fn ndr_align() -> usize {
        <U::Discriminant as NdrEncode>::ndr_align().max(U::arm_align())
    }
}

impl<U: NdrUnion> NdrDecode for Encapsulated<U> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.align(<Self as NdrDecode>::ndr_align());
        let discriminant = U::Discriminant::ndr_decode(r)?;
        r.align(U::arm_align());
        U::decode_arm(discriminant, r).map(Self)
    }

    fn ndr_decode_deferred(&mut self, r: &mut NdrReader) -> Result<()> {
        self.0.decode_arm_deferred(r)
    }

    fn ndr_align() -> usize {
        <U::Discriminant as NdrDecode>::ndr_align().max(U::arm_align())
    }
}

/// Encode the flat part of a non-encapsulated union whose discriminant is
/// held by a sibling field.
///
/// Fails if the value's arm does not match the sibling's discriminant.
pub fn encode_switched<U: NdrUnion>(w: &mut NdrWriter, value: &U, switch: U::Discriminant) -> Result<()> {
    if value.discriminant() != switch {
        return Err(NdrError::InvalidDiscriminant(value.discriminant().into()));
    }
    switch.ndr_encode(w)?;
    w.align(U::arm_align());
    value.encode_arm(w)
}

/// Decode the flat part of a non-encapsulated union. The discriminant on the
/// wire must agree with the sibling field already decoded.
pub fn decode_switched<U: NdrUnion>(r: &mut NdrReader, switch: U::Discriminant) -> Result<U> {
    let on_wire = U::Discriminant::ndr_decode(r)?;
    if on_wire != switch {
        return Err(NdrError::InvalidDiscriminant(on_wire.into()));
    }
    r.align(U::arm_align());
    U::decode_arm(switch, r)
}
