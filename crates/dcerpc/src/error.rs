//! Error types for MSRPC calls

use msrpc_ndr::NdrError;
use thiserror::Error;

use crate::syntax::FaultStatus;

/// RPC error types
#[derive(Debug, Error)]
pub enum RpcError {
    /// Malformed or truncated stub data, or a field rejected while marshaling
    #[error("NDR error: {0}")]
    Ndr(#[from] NdrError),

    /// Stale, closed, revoked or unknown context handle
    #[error("invalid context handle")]
    InvalidHandle,

    /// The server does not implement this operation
    #[error("{0}: not implemented")]
    NotImplemented(&'static str),

    /// Round trip succeeded, the call's status field is non-zero
    #[error("{operation}: remote status 0x{status:08x}")]
    RemoteFailure { operation: &'static str, status: i32 },

    #[error("operation unavailable: {0}")]
    OperationUnavailable(u16),

    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("bind failed: {0}")]
    BindFailed(String),

    #[error("fault: status 0x{0:08x}")]
    Fault(u32),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,

    #[error("PDU too large: {size} bytes exceeds maximum {max}")]
    PduTooLarge { size: usize, max: usize },
}

impl RpcError {
    /// Raw status of a [`RpcError::RemoteFailure`], for matching on codes.
    pub fn status(&self) -> Option<i32> {
        match self {
            RpcError::RemoteFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Fault code a server transport sends back when dispatch fails.
    pub fn fault_status(&self) -> FaultStatus {
        match self {
            RpcError::InvalidHandle => FaultStatus::ContextMismatch,
            RpcError::OperationUnavailable(_) => FaultStatus::OpRngError,
            RpcError::NotImplemented(_) => FaultStatus::CannotSupport,
            RpcError::InterfaceNotFound(_) => FaultStatus::UnkIf,
            RpcError::Ndr(_) => FaultStatus::BadStubData,
            RpcError::Fault(code) => FaultStatus::from_u32(*code).unwrap_or(FaultStatus::RpcError),
            _ => FaultStatus::RpcError,
        }
    }

    /// Typed error for a fault received in reply to `opnum`.
    pub fn from_fault(status: u32, opnum: u16, operation: &'static str) -> Self {
        match FaultStatus::from_u32(status) {
            Some(FaultStatus::ContextMismatch) => RpcError::InvalidHandle,
            Some(FaultStatus::OpRngError) => RpcError::OperationUnavailable(opnum),
            Some(FaultStatus::CannotSupport) => RpcError::NotImplemented(operation),
            _ => RpcError::Fault(status),
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
