//! Operation envelope
//!
//! An [`Operation`] is the per-call value behind every remote procedure: its
//! opnum, a diagnostic name, and the union of all of its in, out and in-out
//! parameters. Clients fill it from a typed request and read the typed
//! response back out of it; servers do the reverse. The move between an
//! operation and its request or response types is a [`Projection`].

use std::fmt;

use msrpc_ndr::{NdrReader, NdrWriter, Result};

/// One remote call: parameters plus the four codec entry points.
///
/// Implementors provide the `write_*`/`read_*` bodies in IDL parameter
/// order. The provided `marshal_*` methods run the matching prepare hook
/// first, so derived length fields and declared ranges are settled before
/// any byte is written.
pub trait Operation: Send {
    /// Opnum within the interface version
    fn opnum(&self) -> u16;

    /// Diagnostic name, e.g. `ElfrReadELW`
    fn name(&self) -> &'static str;

    /// Derive unset size fields of in-parameters and check ranges.
    fn prepare_request(&mut self) -> Result<()> {
        Ok(())
    }

    /// Derive unset size fields of out-parameters and check ranges.
    fn prepare_response(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_request(&self, w: &mut NdrWriter) -> Result<()>;

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()>;

    fn write_response(&self, w: &mut NdrWriter) -> Result<()>;

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()>;

    /// The trailing status of the response. Zero means success.
    fn status(&self) -> i32 {
        0
    }

    fn marshal_request(&mut self, w: &mut NdrWriter) -> Result<()> {
        self.prepare_request()?;
        self.write_request(w)
    }

    fn unmarshal_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.read_request(r)
    }

    fn marshal_response(&mut self, w: &mut NdrWriter) -> Result<()> {
        self.prepare_response()?;
        self.write_response(w)
    }

    fn unmarshal_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.read_response(r)
    }
}

impl fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("opnum", &self.opnum())
            .field("name", &self.name())
            .finish()
    }
}

/// Conversion between a typed request or response and its operation.
///
/// `into_op` copies this value's fields into the operation. `from_op` moves
/// them out: owned buffers are taken, scalars are copied and left in place.
///
/// A response that echoes an implicit input dependency (for instance the
/// number of bytes that was asked for) writes it into the operation only
/// while the operation still holds zero there, so the caller's input wins.
pub trait Projection<O>: Sized {
    fn into_op(self, op: &mut O);

    fn from_op(op: &mut O) -> Self;
}

/// Copy an echoed implicit input back only if the operation left it unset.
#[inline]
pub fn copy_if_unset<T: Default + PartialEq>(slot: &mut T, value: T) {
    if *slot == T::default() {
        *slot = value;
    }
}

/// Adjustment applied to an operation after its own prepare hook.
pub type Hook<O> = fn(&mut O) -> Result<()>;

/// An operation with optional statically-typed hooks run after
/// `prepare_request` and `prepare_response`.
pub struct WithHook<O> {
    pub op: O,
    pub after_request: Option<Hook<O>>,
    pub after_response: Option<Hook<O>>,
}

impl<O> WithHook<O> {
    pub fn new(op: O) -> Self {
        Self {
            op,
            after_request: None,
            after_response: None,
        }
    }

    pub fn on_request(mut self, hook: Hook<O>) -> Self {
        self.after_request = Some(hook);
        self
    }

    pub fn on_response(mut self, hook: Hook<O>) -> Self {
        self.after_response = Some(hook);
        self
    }

    pub fn into_inner(self) -> O {
        self.op
    }
}

impl<O: Default> Default for WithHook<O> {
    fn default() -> Self {
        Self::new(O::default())
    }
}

impl<O: Operation> Operation for WithHook<O> {
    fn opnum(&self) -> u16 {
        self.op.opnum()
    }

    fn name(&self) -> &'static str {
        self.op.name()
    }

    fn prepare_request(&mut self) -> Result<()> {
        self.op.prepare_request()?;
        match self.after_request {
            Some(hook) => hook(&mut self.op),
            None => Ok(()),
        }
    }

    fn prepare_response(&mut self) -> Result<()> {
        self.op.prepare_response()?;
        match self.after_response {
            Some(hook) => hook(&mut self.op),
            None => Ok(()),
        }
    }

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        self.op.write_request(w)
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.op.read_request(r)
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        self.op.write_response(w)
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.op.read_response(r)
    }

    fn status(&self) -> i32 {
        self.op.status()
    }
}
