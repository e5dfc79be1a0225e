//! Server dispatch path
//!
//! An interface is served from a static table indexed by opnum. Each entry is
//! either a real operation or a reserved placeholder for an opnum the
//! protocol defines but never sends (`NotUsedOnWire`). Dispatching a
//! placeholder yields no operation and no error: there is no response due.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use msrpc_ndr::{NdrReader, NdrWriter};
use tracing::{debug, trace, warn};

use crate::error::{Result, RpcError};
use crate::operation::{Operation, Projection};
use crate::syntax::SyntaxId;

/// Decode-call-encode routine for one opnum of a server of type `S`.
pub type Handler<S> = for<'a> fn(&'a S, &'a mut NdrReader) -> BoxFuture<'a, Result<Box<dyn Operation>>>;

/// One opnum of an interface
pub enum Slot<S: ?Sized + 'static> {
    /// Defined by the protocol, never sent on the wire
    Reserved,
    /// Defined by the protocol, not served by this table
    Unavailable,
    Call(Handler<S>),
}

/// Static opnum table for an interface served by `S`
pub struct DispatchTable<S: ?Sized + 'static> {
    pub interface: &'static str,
    pub syntax: SyntaxId,
    pub slots: &'static [Slot<S>],
}

impl<S: ?Sized + Sync + 'static> DispatchTable<S> {
    /// Route `opnum` to its handler.
    ///
    /// Returns `Ok(None)` for reserved opnums and
    /// [`RpcError::OperationUnavailable`] for unavailable ones or past the
    /// end of the table.
    pub async fn dispatch(
        &self,
        server: &S,
        opnum: u16,
        r: &mut NdrReader,
    ) -> Result<Option<Box<dyn Operation>>> {
        match self.slots.get(opnum as usize) {
            None => {
                warn!("{}: opnum {} out of range", self.interface, opnum);
                Err(RpcError::OperationUnavailable(opnum))
            }
            Some(Slot::Unavailable) => {
                debug!("{}: opnum {} is not served", self.interface, opnum);
                Err(RpcError::OperationUnavailable(opnum))
            }
            Some(Slot::Reserved) => {
                debug!("{}: opnum {} is not used on the wire", self.interface, opnum);
                Ok(None)
            }
            Some(Slot::Call(handler)) => {
                trace!("{}: dispatching opnum {}", self.interface, opnum);
                handler(server, r).await.map(Some)
            }
        }
    }

    /// Number of opnums the table covers, reserved ones included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Serve one call of operation `O`.
///
/// Builds the zero operation, unmarshals the request into it, projects the
/// typed request for `handler`, and projects the handler's response back
/// into the same operation. The handler never sees a partially decoded
/// request.
pub async fn serve<O, Req, Resp, F, Fut>(r: &mut NdrReader, handler: F) -> Result<Box<dyn Operation>>
where
    O: Operation + Default + 'static,
    Req: Projection<O>,
    Resp: Projection<O>,
    F: FnOnce(Req) -> Fut,
    Fut: Future<Output = Result<Resp>>,
{
    let mut op = O::default();
    op.unmarshal_request(r)?;
    let request = Req::from_op(&mut op);
    let response = handler(request).await?;
    response.into_op(&mut op);
    Ok(Box::new(op))
}

/// Server-side capability handed to a transport: turn an opnum and request
/// stub into a populated operation.
#[async_trait]
pub trait ServerHandle: Send + Sync {
    fn syntax(&self) -> SyntaxId;

    /// `Ok(None)` means the opnum is reserved and no response is due.
    async fn handle(&self, opnum: u16, r: &mut NdrReader) -> Result<Option<Box<dyn Operation>>>;
}

/// A server implementation paired with its dispatch table.
pub struct TableHandle<S: ?Sized + 'static> {
    server: Arc<S>,
    table: &'static DispatchTable<S>,
}

impl<S: ?Sized + 'static> TableHandle<S> {
    pub fn new(server: Arc<S>, table: &'static DispatchTable<S>) -> Self {
        Self { server, table }
    }

    pub fn server(&self) -> &Arc<S> {
        &self.server
    }
}

#[async_trait]
impl<S: ?Sized + Send + Sync + 'static> ServerHandle for TableHandle<S> {
    fn syntax(&self) -> SyntaxId {
        self.table.syntax
    }

    async fn handle(&self, opnum: u16, r: &mut NdrReader) -> Result<Option<Box<dyn Operation>>> {
        self.table.dispatch(&*self.server, opnum, r).await
    }
}

/// Dispatch a request stub and marshal the response stub.
///
/// `Ok(None)` is returned for reserved opnums.
pub async fn serve_request(handle: &dyn ServerHandle, opnum: u16, stub: Bytes) -> Result<Option<Bytes>> {
    let mut r = NdrReader::new(stub);
    let Some(mut op) = handle.handle(opnum, &mut r).await? else {
        return Ok(None);
    };
    if !r.is_empty() {
        trace!("{}: {} trailing request bytes ignored", op.name(), r.remaining());
    }
    let mut w = NdrWriter::new();
    op.marshal_response(&mut w)?;
    debug!("{} served: status=0x{:08x}, stub_len={}", op.name(), op.status(), w.position());
    Ok(Some(w.into_bytes()))
}
