//! Interface identifiers and fault codes

use std::fmt;

use msrpc_ndr::Guid;

/// NDR 2.0 transfer syntax `8a885d04-1ceb-11c9-9fe8-08002b104860` v2.0
pub const NDR_SYNTAX: SyntaxId = SyntaxId::new(Guid::from_u128(0x8a885d04_1ceb_11c9_9fe8_08002b104860), 2, 0);

/// Presentation syntax: interface UUID plus version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntaxId {
    pub uuid: Guid,
    pub version: u32, // major in lower 16 bits, minor in upper 16 bits
}

impl SyntaxId {
    pub const fn new(uuid: Guid, major: u16, minor: u16) -> Self {
        Self {
            uuid,
            version: (major as u32) | ((minor as u32) << 16),
        }
    }

    pub fn major_version(&self) -> u16 {
        self.version as u16
    }

    pub fn minor_version(&self) -> u16 {
        (self.version >> 16) as u16
    }

    /// Whether a server offering `self` can accept a bind for `requested`.
    ///
    /// Major versions must match exactly; the server's minor version must
    /// be at least the client's.
    pub fn accepts(&self, requested: &SyntaxId) -> bool {
        self.uuid == requested.uuid
            && self.major_version() == requested.major_version()
            && self.minor_version() >= requested.minor_version()
    }
}

impl fmt::Display for SyntaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}.{}", self.uuid, self.major_version(), self.minor_version())
    }
}

/// Fault status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FaultStatus {
    /// Access denied
    AccessDenied = 0x00000005,
    /// RPC_S_CANNOT_SUPPORT: operation exists but the server does not implement it
    CannotSupport = 0x000006e4,
    /// RPC_X_BAD_STUB_DATA: request stub failed to unmarshal
    BadStubData = 0x000006f7,
    /// General RPC error
    RpcError = 0x1c000000,
    /// Protocol version not supported
    NdrVersion = 0x1c000008,
    /// Context handle unknown to the server
    ContextMismatch = 0x1c00001a,
    /// Opnum out of range for the interface
    OpRngError = 0x1c010002,
    /// Unknown interface
    UnkIf = 0x1c010003,
}

impl FaultStatus {
    pub fn from_u32(code: u32) -> Option<Self> {
        let status = match code {
            0x00000005 => FaultStatus::AccessDenied,
            0x000006e4 => FaultStatus::CannotSupport,
            0x000006f7 => FaultStatus::BadStubData,
            0x1c000000 => FaultStatus::RpcError,
            0x1c000008 => FaultStatus::NdrVersion,
            0x1c00001a => FaultStatus::ContextMismatch,
            0x1c010002 => FaultStatus::OpRngError,
            0x1c010003 => FaultStatus::UnkIf,
            _ => return None,
        };
        Some(status)
    }
}
