//! In-process transport
//!
//! A [`LoopbackServer`] holds registered interfaces; a [`LoopbackBinder`]
//! produces [`LoopbackConnection`]s bound to one of them. Each call goes
//! through the same stub path a network transport would use: the request
//! stub is dispatched with [`serve_request`] and dispatch errors come back
//! as fault codes, so clients see exactly what they would over the wire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use msrpc_ndr::Guid;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::{BindOptions, ServerConfig};
use crate::connection::{with_connection, Binder, Connection, ConnectionId};
use crate::error::{Result, RpcError};
use crate::server::{serve_request, ServerHandle};
use crate::syntax::{SyntaxId, NDR_SYNTAX};

/// Called with the id of a connection bound to the interface when it goes
/// away
pub type Rundown = Arc<dyn Fn(ConnectionId) + Send + Sync>;

#[derive(Clone)]
struct Registration {
    handle: Arc<dyn ServerHandle>,
    rundown: Option<Rundown>,
}

/// Server statistics
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_accepted: AtomicU64,
    pub requests_processed: AtomicU64,
    pub requests_failed: AtomicU64,
}

impl ServerStats {
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    pub connections_accepted: u64,
    pub requests_processed: u64,
    pub requests_failed: u64,
}

/// In-process server: registered interfaces keyed by interface UUID
pub struct LoopbackServer {
    interfaces: Arc<RwLock<HashMap<Guid, Registration>>>,
    config: ServerConfig,
    stats: Arc<ServerStats>,
}

impl LoopbackServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            interfaces: Arc::new(RwLock::new(HashMap::new())),
            config,
            stats: Arc::new(ServerStats::default()),
        }
    }

    /// Register an interface. A later registration of the same UUID
    /// replaces the earlier one.
    pub async fn register(&self, handle: Arc<dyn ServerHandle>) {
        self.insert(handle, None).await
    }

    /// Register an interface whose context handles are revoked through
    /// `rundown` when a bound connection disconnects. The callback gets the
    /// id the disconnected connection's calls were dispatched under.
    pub async fn register_with_rundown(
        &self,
        handle: Arc<dyn ServerHandle>,
        rundown: impl Fn(ConnectionId) + Send + Sync + 'static,
    ) {
        self.insert(handle, Some(Arc::new(rundown))).await
    }

    async fn insert(&self, handle: Arc<dyn ServerHandle>, rundown: Option<Rundown>) {
        let syntax = handle.syntax();
        debug!("Registering interface {}", syntax);
        let mut interfaces = self.interfaces.write().await;
        if interfaces.insert(syntax.uuid, Registration { handle, rundown }).is_some() {
            warn!("Interface {} re-registered", syntax.uuid);
        }
    }

    pub async fn unregister(&self, uuid: &Guid) -> bool {
        self.interfaces.write().await.remove(uuid).is_some()
    }

    pub fn binder(&self) -> LoopbackBinder {
        LoopbackBinder {
            interfaces: Arc::clone(&self.interfaces),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Shortcut for `self.binder().bind(syntax, &BindOptions::default())`
    pub async fn connect(&self, syntax: SyntaxId) -> Result<LoopbackConnection> {
        self.binder().bind(syntax, &BindOptions::default()).await
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stats(&self) -> ServerStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for LoopbackServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces connections to a [`LoopbackServer`]
#[derive(Clone)]
pub struct LoopbackBinder {
    interfaces: Arc<RwLock<HashMap<Guid, Registration>>>,
    config: ServerConfig,
    stats: Arc<ServerStats>,
}

impl LoopbackBinder {
    async fn resolve(&self, syntax: &SyntaxId, options: &BindOptions) -> Result<Registration> {
        if options.transfer_syntax != NDR_SYNTAX {
            return Err(RpcError::BindFailed(format!(
                "transfer syntax {} not supported",
                options.transfer_syntax
            )));
        }
        let interfaces = self.interfaces.read().await;
        let registration = interfaces
            .get(&syntax.uuid)
            .ok_or_else(|| RpcError::InterfaceNotFound(syntax.uuid.to_string()))?;
        let offered = registration.handle.syntax();
        if !offered.accepts(syntax) {
            return Err(RpcError::BindFailed(format!("{} requested, {} offered", syntax, offered)));
        }
        Ok(registration.clone())
    }
}

#[async_trait]
impl Binder for LoopbackBinder {
    type Connection = LoopbackConnection;

    async fn bind(&self, syntax: SyntaxId, options: &BindOptions) -> Result<LoopbackConnection> {
        let registration = self.resolve(&syntax, options).await?;
        let id = ConnectionId(self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed) + 1);
        debug!("{} bound to {}: context_id={}", id, syntax, options.context_id);
        Ok(LoopbackConnection {
            id,
            binder: self.clone(),
            state: Mutex::new(ConnectionState {
                syntax,
                context_id: options.context_id,
                current: registration.clone(),
                bound: vec![registration],
                closed: false,
            }),
            syntax: parking_lot::Mutex::new(syntax),
        })
    }
}

struct ConnectionState {
    syntax: SyntaxId,
    context_id: u16,
    current: Registration,
    /// Every interface this connection has been bound to, for rundown
    bound: Vec<Registration>,
    closed: bool,
}

/// A connection to a [`LoopbackServer`]. Calls on one connection are
/// serialized.
pub struct LoopbackConnection {
    id: ConnectionId,
    binder: LoopbackBinder,
    state: Mutex<ConnectionState>,
    syntax: parking_lot::Mutex<SyntaxId>,
}

impl LoopbackConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn context_id(&self) -> u16 {
        self.state.lock().await.context_id
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Simulate connection loss.
    ///
    /// Later calls fail with [`RpcError::ConnectionClosed`]. When the server
    /// runs down on disconnect, the rundown of every interface the
    /// connection was bound to is run once.
    pub async fn revoke(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        debug!("{} to {} closed", self.id, state.syntax);
        if !self.binder.config.rundown_on_disconnect {
            return;
        }
        let mut seen: Vec<SyntaxId> = Vec::new();
        for registration in state.bound.drain(..) {
            let syntax = registration.handle.syntax();
            if seen.contains(&syntax) {
                continue;
            }
            seen.push(syntax);
            if let Some(rundown) = &registration.rundown {
                debug!("Running down context handles of {} for {}", self.id, syntax);
                rundown(self.id);
            }
        }
    }
}

#[async_trait]
impl Connection for LoopbackConnection {
    fn syntax(&self) -> SyntaxId {
        *self.syntax.lock()
    }

    async fn invoke(&self, opnum: u16, stub: Bytes) -> Result<Bytes> {
        let state = self.state.lock().await;
        if state.closed {
            return Err(RpcError::ConnectionClosed);
        }
        let max = self.binder.config.max_pdu_size;
        if stub.len() > max {
            return Err(RpcError::PduTooLarge { size: stub.len(), max });
        }

        let stats = &self.binder.stats;
        let handle = state.current.handle.as_ref();
        let served = with_connection(self.id, serve_request(handle, opnum, stub)).await;
        match served {
            Ok(Some(response)) if response.len() > max => {
                stats.requests_failed.fetch_add(1, Ordering::Relaxed);
                warn!("Response for opnum {} exceeds max PDU size: {} > {}", opnum, response.len(), max);
                Err(RpcError::PduTooLarge { size: response.len(), max })
            }
            Ok(response) => {
                stats.requests_processed.fetch_add(1, Ordering::Relaxed);
                Ok(response.unwrap_or_default())
            }
            Err(e) => {
                stats.requests_failed.fetch_add(1, Ordering::Relaxed);
                let status = e.fault_status() as u32;
                debug!("Opnum {} on {} faulted: {} (0x{:08x})", opnum, state.syntax, e, status);
                Err(RpcError::Fault(status))
            }
        }
    }

    async fn alter_context(&self, options: &BindOptions) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(RpcError::ConnectionClosed);
        }
        let syntax = options.abstract_syntax.unwrap_or(state.syntax);
        let registration = self.binder.resolve(&syntax, options).await?;
        debug!(
            "Altered context: {} -> {}, context_id={}",
            state.syntax, syntax, options.context_id
        );
        state.syntax = syntax;
        state.context_id = options.context_id;
        state.current = registration.clone();
        state.bound.push(registration);
        *self.syntax.lock() = syntax;
        Ok(())
    }
}
