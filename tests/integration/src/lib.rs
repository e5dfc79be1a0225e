//! Shared fixtures for the integration tests
//!
//! Run with logging:
//! ```text
//! RUST_LOG=debug cargo test -p integration-tests
//! ```

mod memory;

use std::sync::Arc;

use dcerpc::{LoopbackConnection, LoopbackServer, ServerConfig};
use msrpc_eventlog::{server_handle, EventlogClient, EVENTLOG_SYNTAX_V0_0};
use tracing_subscriber::EnvFilter;

pub use memory::{MemoryEventlog, Record, DEFAULT_LOGS};

/// Initialize test logging once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Loopback server with one in-memory eventlog registered.
///
/// Disconnecting a bound connection runs down the handles it opened.
pub async fn start_server(config: ServerConfig) -> (LoopbackServer, Arc<MemoryEventlog>) {
    start_server_with(config, MemoryEventlog::new()).await
}

pub async fn start_server_with(
    config: ServerConfig,
    eventlog: MemoryEventlog,
) -> (LoopbackServer, Arc<MemoryEventlog>) {
    init_logging();
    let eventlog = Arc::new(eventlog);
    let server = LoopbackServer::with_config(config);
    let rundown = Arc::clone(&eventlog);
    server
        .register_with_rundown(Arc::new(server_handle(eventlog.clone())), move |conn| {
            rundown.revoke_handles(conn);
        })
        .await;
    (server, eventlog)
}

pub async fn connect(server: &LoopbackServer) -> EventlogClient<LoopbackConnection> {
    match EventlogClient::bind(&server.binder()).await {
        Ok(client) => client,
        Err(e) => panic!("bind to {} failed: {}", EVENTLOG_SYNTAX_V0_0, e),
    }
}
