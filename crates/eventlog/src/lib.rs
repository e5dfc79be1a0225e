//! MS-EVEN eventlog v0 bindings
//!
//! Operations, client and server dispatch for the `eventlog` interface
//! (`82273fdc-e32a-18c3-3f78-827929dc23ea` v0.0), built on [`dcerpc`].
//!
//! Only the Unicode operations are served. The ANSI variants and
//! `ElfrChangeNotify` answer with an unavailable-operation fault, and the
//! four opnums reserved by the protocol (19, 20, 21, 23) are accepted
//! without a response.

pub mod client;
pub mod ops;
pub mod protocol;
pub mod server;

pub use client::{Event, EventlogClient};
pub use protocol::{LogHandle, Sid, EVENTLOG_SYNTAX_V0_0, EVENTLOG_UUID};
pub use server::{dispatch_table, server_handle, EventlogServer, Server};
