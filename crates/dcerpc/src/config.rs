//! Call, bind and server configuration

use std::time::Duration;

use crate::syntax::{SyntaxId, NDR_SYNTAX};

/// Largest stub a loopback server accepts or returns by default.
pub const DEFAULT_MAX_PDU_SIZE: usize = 1024 * 1024;

/// Per-call options for [`invoke`](crate::invoke)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Upper bound on the transport round trip. `None` waits forever;
    /// dropping the call future cancels it either way.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for binding a connection or altering its context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOptions {
    pub context_id: u16,
    pub transfer_syntax: SyntaxId,
    /// New abstract syntax for an alter-context; `None` keeps the current one
    pub abstract_syntax: Option<SyntaxId>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            context_id: 0,
            transfer_syntax: NDR_SYNTAX,
            abstract_syntax: None,
        }
    }
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_id(mut self, context_id: u16) -> Self {
        self.context_id = context_id;
        self
    }

    pub fn transfer_syntax(mut self, syntax: SyntaxId) -> Self {
        self.transfer_syntax = syntax;
        self
    }

    /// Switch the connection to another interface on alter-context
    pub fn abstract_syntax(mut self, syntax: SyntaxId) -> Self {
        self.abstract_syntax = Some(syntax);
        self
    }
}

/// Server-side configuration for the loopback transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Largest request or response stub, in bytes
    pub max_pdu_size: usize,
    /// Revoke a connection's context handles when it disconnects
    pub rundown_on_disconnect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_pdu_size: DEFAULT_MAX_PDU_SIZE,
            rundown_on_disconnect: true,
        }
    }
}
