//! eventlog wire protocol (MS-EVEN)
//!
//! Interface identity, opnums, protocol limits and the `RPC_SID` structure
//! used by `ElfrReportEventW`.

use std::fmt;

use dcerpc::ndr::{
    ContextHandle, Guid, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result,
};
use dcerpc::SyntaxId;

/// eventlog interface UUID
pub const EVENTLOG_UUID: Guid = Guid::from_u128(0x82273fdc_e32a_18c3_3f78_827929dc23ea);

/// eventlog v0.0
pub const EVENTLOG_SYNTAX_V0_0: SyntaxId = SyntaxId::new(EVENTLOG_UUID, 0, 0);

/// `IELF_HANDLE`: handle to an open event log or registered event source
pub type LogHandle = ContextHandle;

/// Operation numbers for eventlog v0
pub mod opnum {
    pub const CLEAR_ELFW: u16 = 0;
    pub const BACKUP_ELFW: u16 = 1;
    pub const CLOSE_EL: u16 = 2;
    pub const DEREGISTER_EVENT_SOURCE: u16 = 3;
    pub const NUMBER_OF_RECORDS: u16 = 4;
    pub const OLDEST_RECORD: u16 = 5;
    /// Local use only
    pub const CHANGE_NOTIFY: u16 = 6;
    pub const OPEN_ELW: u16 = 7;
    pub const REGISTER_EVENT_SOURCE_W: u16 = 8;
    pub const OPEN_BELW: u16 = 9;
    pub const READ_ELW: u16 = 10;
    pub const REPORT_EVENT_W: u16 = 11;
    pub const GET_LOG_INFORMATION: u16 = 22;
    /// Opnums 19, 20, 21 and 23 are reserved and never sent
    pub const NOT_USED_ON_WIRE: [u16; 4] = [19, 20, 21, 23];
    /// Opnums past the end of the interface
    pub const COUNT: u16 = 27;
}

/// `MAX_STRINGS`: insertion strings per event
pub const MAX_STRINGS: u16 = 256;

/// `MAX_SINGLE_EVENT`: largest single event record, in bytes
pub const MAX_SINGLE_EVENT: u32 = 262143;

/// `MAX_BATCH_BUFF`: largest `ElfrReadELW` buffer, in bytes
pub const MAX_BATCH_BUFF: u32 = 524287;

/// Largest binary data block accepted by `ElfrReportEventW`
pub const MAX_EVENT_DATA: u32 = 61440;

/// Largest `cbBufSize` for `ElfrGetLogInformation`
pub const MAX_LOG_INFORMATION: u32 = 1024;

/// NTSTATUS codes returned by eventlog servers
pub mod status {
    pub const STATUS_SUCCESS: i32 = 0;
    pub const STATUS_INVALID_HANDLE: i32 = 0xC000_0008_u32 as i32;
    pub const STATUS_INVALID_PARAMETER: i32 = 0xC000_000D_u32 as i32;
    pub const STATUS_BUFFER_TOO_SMALL: i32 = 0xC000_0023_u32 as i32;
    pub const STATUS_END_OF_FILE: i32 = 0xC000_0011_u32 as i32;
    pub const STATUS_EVENTLOG_FILE_CHANGED: i32 = 0xC000_0197_u32 as i32;
}

/// `ReadFlags` for `ElfrReadELW`
pub mod read_flags {
    pub const EVENTLOG_SEQUENTIAL_READ: u32 = 0x0000_0001;
    pub const EVENTLOG_SEEK_READ: u32 = 0x0000_0002;
    pub const EVENTLOG_FORWARDS_READ: u32 = 0x0000_0004;
    pub const EVENTLOG_BACKWARDS_READ: u32 = 0x0000_0008;
}

/// `EventType` values
pub mod event_type {
    pub const EVENTLOG_SUCCESS: u16 = 0x0000;
    pub const EVENTLOG_ERROR_TYPE: u16 = 0x0001;
    pub const EVENTLOG_WARNING_TYPE: u16 = 0x0002;
    pub const EVENTLOG_INFORMATION_TYPE: u16 = 0x0004;
    pub const EVENTLOG_AUDIT_SUCCESS: u16 = 0x0008;
    pub const EVENTLOG_AUDIT_FAILURE: u16 = 0x0010;
}

/// `InfoLevel` for `ElfrGetLogInformation`
pub const EVENTLOG_FULL_INFO: u32 = 0;

/// `RPC_SID` (MS-DTYP 2.4.2.3)
///
/// A conformant structure: the sub-authority count is sent as the
/// conformance ahead of the fixed fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sid {
    pub revision: u8,
    pub identifier_authority: [u8; 6],
    pub sub_authority: Vec<u32>,
}

impl Sid {
    /// SIDs carry at most 15 sub-authorities
    pub const MAX_SUB_AUTHORITIES: usize = 15;

    pub fn new(authority: u64, sub_authority: Vec<u32>) -> Self {
        let bytes = authority.to_be_bytes();
        let mut identifier_authority = [0u8; 6];
        identifier_authority.copy_from_slice(&bytes[2..]);
        Self {
            revision: 1,
            identifier_authority,
            sub_authority,
        }
    }

    pub fn authority(&self) -> u64 {
        self.identifier_authority
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-{}", self.revision, self.authority())?;
        for sub in &self.sub_authority {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}

impl NdrEncode for Sid {
    fn ndr_encode(&self, w: &mut NdrWriter) -> Result<()> {
        let count = self.sub_authority.len();
        if count > Self::MAX_SUB_AUTHORITIES {
            return Err(NdrError::FieldOutOfRange {
                field: "SubAuthorityCount",
                value: count as u64,
                min: 0,
                max: Self::MAX_SUB_AUTHORITIES as u64,
            });
        }
        w.write_size(count)?;
        w.write_u8(self.revision);
        w.write_u8(count as u8);
        w.write_bytes(&self.identifier_authority);
        for sub in &self.sub_authority {
            w.write_u32(*sub);
        }
        Ok(())
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for Sid {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let max_count = r.read_size()?;
        let revision = r.read_u8()?;
        let count = r.read_u8()? as usize;
        if count != max_count || count > Self::MAX_SUB_AUTHORITIES {
            return Err(NdrError::ConformanceMismatch {
                max_count,
                offset: 0,
                actual_count: count,
            });
        }
        let mut identifier_authority = [0u8; 6];
        identifier_authority.copy_from_slice(&r.read_bytes(6)?);
        let mut sub_authority = Vec::with_capacity(count);
        for _ in 0..count {
            sub_authority.push(r.read_u32()?);
        }
        Ok(Self {
            revision,
            identifier_authority,
            sub_authority,
        })
    }

    fn ndr_align() -> usize {
        4
    }

    fn ndr_min_size() -> usize {
        12
    }
}
