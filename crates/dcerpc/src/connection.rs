//! Transport capabilities consumed by the client path
//!
//! The call layer needs only three things from a transport: bind to an
//! interface, exchange one request stub for one response stub under an
//! opnum, and alter the presentation context. Fragmentation, security and
//! pooling all live behind these traits.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::BindOptions;
use crate::error::Result;
use crate::syntax::SyntaxId;

/// A bound connection to one interface.
///
/// Calls on one connection are serialized by the implementation; separate
/// connections may be driven in parallel.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Interface the connection is currently bound to
    fn syntax(&self) -> SyntaxId;

    /// Send a request stub for `opnum` and wait for the response stub.
    ///
    /// A fault reply surfaces as [`RpcError::Fault`](crate::RpcError::Fault).
    async fn invoke(&self, opnum: u16, stub: Bytes) -> Result<Bytes>;

    async fn alter_context(&self, options: &BindOptions) -> Result<()>;
}

/// Something that can produce bound connections.
#[async_trait]
pub trait Binder: Send + Sync {
    type Connection: Connection;

    async fn bind(&self, syntax: SyntaxId, options: &BindOptions) -> Result<Self::Connection>;
}

/// Server-side identity of one client connection.
///
/// Transports assign one per accepted connection and run every dispatched
/// call inside [`with_connection`], so handlers can tag the state they
/// create with the connection that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

tokio::task_local! {
    static CALLER: ConnectionId;
}

/// Run `f` as a call from connection `id`.
pub async fn with_connection<F: Future>(id: ConnectionId, f: F) -> F::Output {
    CALLER.scope(id, f).await
}

/// Connection whose call is being dispatched on this task, if any
pub fn current_connection() -> Option<ConnectionId> {
    CALLER.try_with(|id| *id).ok()
}
