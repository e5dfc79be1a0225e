//! MSRPC call framing on top of the NDR codec
//!
//! This crate sits between generated interface stubs and a transport:
//!
//! - [`Operation`]: the per-call envelope holding every parameter of one
//!   remote procedure, with request and response codecs
//! - [`invoke`] / [`call`]: the client path, from typed request to typed
//!   response through any [`Connection`]
//! - [`DispatchTable`] / [`serve_request`]: the server path, from opnum and
//!   request stub to response stub
//! - [`HandleTable`]: server-side state behind context handles
//! - [`LoopbackServer`]: an in-process transport for tests and embedding
//!
//! # Example
//!
//! ```no_run
//! use dcerpc::{call, CallOptions, LoopbackServer, SyntaxId};
//! # async fn example<O, Req, Resp>(server: LoopbackServer, syntax: SyntaxId, request: Req)
//! # -> dcerpc::Result<Resp>
//! # where O: dcerpc::Operation + Default, Req: dcerpc::Projection<O>, Resp: dcerpc::Projection<O> {
//! let conn = server.connect(syntax).await?;
//! let response: Resp = call::<_, O, _, _>(&conn, request, &CallOptions::default()).await?;
//! # Ok(response)
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handles;
pub mod loopback;
pub mod operation;
pub mod server;
pub mod syntax;

pub use msrpc_ndr as ndr;

// Re-export error types
pub use error::{Result, RpcError};

pub use client::{call, invoke, invoke_unchecked};
pub use config::{BindOptions, CallOptions, ServerConfig, DEFAULT_MAX_PDU_SIZE};
pub use connection::{current_connection, with_connection, Binder, Connection, ConnectionId};
pub use handles::HandleTable;
pub use loopback::{
    LoopbackBinder, LoopbackConnection, LoopbackServer, Rundown, ServerStats, ServerStatsSnapshot,
};
pub use operation::{copy_if_unset, Hook, Operation, Projection, WithHook};
pub use server::{serve, serve_request, DispatchTable, Handler, ServerHandle, Slot, TableHandle};
pub use syntax::{FaultStatus, SyntaxId, NDR_SYNTAX};
