//! eventlog v0 operations
//!
//! One [`Operation`] per opnum holding every in, out and in-out parameter,
//! plus the typed request and response that project into it. Parameters
//! are marshaled in IDL order; every response ends with the NTSTATUS.

use dcerpc::ndr::{
    check_range, decode_sized, encode_sized, NdrError, NdrReader, NdrWString, NdrWriter, Result,
    RpcUnicodeString, UniquePtr,
};
use dcerpc::{copy_if_unset, Operation, Projection};

use crate::protocol::{
    opnum, LogHandle, Sid, MAX_BATCH_BUFF, MAX_EVENT_DATA, MAX_LOG_INFORMATION, MAX_STRINGS,
};

fn check_count(declared: usize, decoded: usize) -> Result<()> {
    if declared != decoded {
        return Err(NdrError::ConformanceMismatch {
            max_count: declared,
            offset: 0,
            actual_count: decoded,
        });
    }
    Ok(())
}

macro_rules! op_identity {
    ($opnum:expr, $name:literal) => {
        fn opnum(&self) -> u16 {
            $opnum
        }

        fn name(&self) -> &'static str {
            $name
        }

        fn status(&self) -> i32 {
            self.status
        }
    };
}

fn unique_string(value: Option<String>) -> UniquePtr<NdrWString> {
    value.map(NdrWString::from).into()
}

fn take_unique_string(ptr: &mut UniquePtr<NdrWString>) -> Option<String> {
    std::mem::take(ptr).into_option().map(|s| s.0)
}

fn unique_counted(value: Option<String>) -> UniquePtr<RpcUnicodeString> {
    value.map(RpcUnicodeString::new).into()
}

fn take_unique_counted(ptr: &mut UniquePtr<RpcUnicodeString>) -> Option<String> {
    std::mem::take(ptr).into_option().map(|s| s.value)
}

/// `[in, out, unique] unsigned long*` that is always sent non-null
fn write_unique_u32(w: &mut NdrWriter, value: u32) {
    w.write_referent(true);
    w.write_u32(value);
}

fn read_unique_u32(r: &mut NdrReader) -> Result<u32> {
    match r.read_referent()? {
        0 => Ok(0),
        _ => r.read_u32(),
    }
}

fn saturate_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn saturate_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `ElfrClearELFW`: clear a log, optionally backing it up first.
#[derive(Debug, Default)]
pub struct ClearEventLogW {
    pub log: LogHandle,
    pub backup_file_name: UniquePtr<RpcUnicodeString>,
    pub status: i32,
}

impl Operation for ClearEventLogW {
    op_identity!(opnum::CLEAR_ELFW, "ElfrClearELFW");

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.log)?;
        w.write(&self.backup_file_name)
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.log = r.read()?;
        self.backup_file_name = r.read()?;
        Ok(())
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_i32(self.status);
        Ok(())
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.status = r.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearEventLogWRequest {
    pub log: LogHandle,
    /// `None` clears without a backup
    pub backup_file_name: Option<String>,
}

impl Projection<ClearEventLogW> for ClearEventLogWRequest {
    fn into_op(self, op: &mut ClearEventLogW) {
        op.log = self.log;
        op.backup_file_name = unique_counted(self.backup_file_name);
    }

    fn from_op(op: &mut ClearEventLogW) -> Self {
        Self {
            log: op.log,
            backup_file_name: take_unique_counted(&mut op.backup_file_name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearEventLogWResponse {
    pub status: i32,
}

impl Projection<ClearEventLogW> for ClearEventLogWResponse {
    fn into_op(self, op: &mut ClearEventLogW) {
        op.status = self.status;
    }

    fn from_op(op: &mut ClearEventLogW) -> Self {
        Self { status: op.status }
    }
}

/// `ElfrBackupELFW`: copy a log to a server-side file.
#[derive(Debug, Default)]
pub struct BackupEventLogW {
    pub log: LogHandle,
    pub backup_file_name: RpcUnicodeString,
    pub status: i32,
}

impl Operation for BackupEventLogW {
    op_identity!(opnum::BACKUP_ELFW, "ElfrBackupELFW");

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.log)?;
        w.write(&self.backup_file_name)
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.log = r.read()?;
        self.backup_file_name = r.read()?;
        Ok(())
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        w.write_i32(self.status);
        Ok(())
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.status = r.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupEventLogWRequest {
    pub log: LogHandle,
    pub backup_file_name: String,
}

impl Projection<BackupEventLogW> for BackupEventLogWRequest {
    fn into_op(self, op: &mut BackupEventLogW) {
        op.log = self.log;
        op.backup_file_name = RpcUnicodeString::new(self.backup_file_name);
    }

    fn from_op(op: &mut BackupEventLogW) -> Self {
        Self {
            log: op.log,
            backup_file_name: std::mem::take(&mut op.backup_file_name.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupEventLogWResponse {
    pub status: i32,
}

impl Projection<BackupEventLogW> for BackupEventLogWResponse {
    fn into_op(self, op: &mut BackupEventLogW) {
        op.status = self.status;
    }

    fn from_op(op: &mut BackupEventLogW) -> Self {
        Self { status: op.status }
    }
}

/// Operations that take an `[in, out]` log handle and return only a status.
/// The server hands back a nil handle once the original is released.
macro_rules! release_handle_op {
    ($op:ident, $request:ident, $response:ident, $opnum:expr, $name:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default)]
        pub struct $op {
            pub log: LogHandle,
            pub status: i32,
        }

        impl Operation for $op {
            op_identity!($opnum, $name);

            fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
                w.write(&self.log)
            }

            fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
                self.log = r.read()?;
                Ok(())
            }

            fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
                w.write(&self.log)?;
                w.write_i32(self.status);
                Ok(())
            }

            fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
                self.log = r.read()?;
                self.status = r.read_i32()?;
                Ok(())
            }
        }

        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $request {
            pub log: LogHandle,
        }

        impl Projection<$op> for $request {
            fn into_op(self, op: &mut $op) {
                op.log = self.log;
            }

            fn from_op(op: &mut $op) -> Self {
                Self { log: op.log }
            }
        }

        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $response {
            pub log: LogHandle,
            pub status: i32,
        }

        impl Projection<$op> for $response {
            fn into_op(self, op: &mut $op) {
                op.log = self.log;
                op.status = self.status;
            }

            fn from_op(op: &mut $op) -> Self {
                Self {
                    log: op.log,
                    status: op.status,
                }
            }
        }
    };
}

release_handle_op!(
    CloseEventLog,
    CloseEventLogRequest,
    CloseEventLogResponse,
    opnum::CLOSE_EL,
    "ElfrCloseEL",
    "`ElfrCloseEL`: release a handle from `ElfrOpenELW` or `ElfrOpenBELW`."
);

release_handle_op!(
    DeregisterEventSource,
    DeregisterEventSourceRequest,
    DeregisterEventSourceResponse,
    opnum::DEREGISTER_EVENT_SOURCE,
    "ElfrDeregisterEventSource",
    "`ElfrDeregisterEventSource`: release a handle from `ElfrRegisterEventSourceW`."
);

/// Operations that take a log handle and return one counter.
macro_rules! counter_op {
    ($op:ident, $request:ident, $response:ident, $field:ident, $opnum:expr, $name:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default)]
        pub struct $op {
            pub log: LogHandle,
            pub $field: u32,
            pub status: i32,
        }

        impl Operation for $op {
            op_identity!($opnum, $name);

            fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
                w.write(&self.log)
            }

            fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
                self.log = r.read()?;
                Ok(())
            }

            fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
                w.write_u32(self.$field);
                w.write_i32(self.status);
                Ok(())
            }

            fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
                self.$field = r.read_u32()?;
                self.status = r.read_i32()?;
                Ok(())
            }
        }

        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $request {
            pub log: LogHandle,
        }

        impl Projection<$op> for $request {
            fn into_op(self, op: &mut $op) {
                op.log = self.log;
            }

            fn from_op(op: &mut $op) -> Self {
                Self { log: op.log }
            }
        }

        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $response {
            pub $field: u32,
            pub status: i32,
        }

        impl Projection<$op> for $response {
            fn into_op(self, op: &mut $op) {
                op.$field = self.$field;
                op.status = self.status;
            }

            fn from_op(op: &mut $op) -> Self {
                Self {
                    $field: op.$field,
                    status: op.status,
                }
            }
        }
    };
}

counter_op!(
    NumberOfRecords,
    NumberOfRecordsRequest,
    NumberOfRecordsResponse,
    number_of_records,
    opnum::NUMBER_OF_RECORDS,
    "ElfrNumberOfRecords",
    "`ElfrNumberOfRecords`: number of records currently in the log."
);

counter_op!(
    OldestRecord,
    OldestRecordRequest,
    OldestRecordResponse,
    oldest_record_number,
    opnum::OLDEST_RECORD,
    "ElfrOldestRecord",
    "`ElfrOldestRecord`: record number of the oldest record in the log."
);

/// Operations that open a log by module name and return a new handle.
macro_rules! open_op {
    ($op:ident, $request:ident, $response:ident, $opnum:expr, $name:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Default)]
        pub struct $op {
            /// `EVENTLOG_HANDLE_W`, ignored by servers
            pub unc_server_name: UniquePtr<NdrWString>,
            pub module_name: RpcUnicodeString,
            pub reg_module_name: RpcUnicodeString,
            pub major_version: u32,
            pub minor_version: u32,
            pub log: LogHandle,
            pub status: i32,
        }

        impl Operation for $op {
            op_identity!($opnum, $name);

            fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
                w.write(&self.unc_server_name)?;
                w.write(&self.module_name)?;
                w.write(&self.reg_module_name)?;
                w.write_u32(self.major_version);
                w.write_u32(self.minor_version);
                Ok(())
            }

            fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
                self.unc_server_name = r.read()?;
                self.module_name = r.read()?;
                self.reg_module_name = r.read()?;
                self.major_version = r.read_u32()?;
                self.minor_version = r.read_u32()?;
                Ok(())
            }

            fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
                w.write(&self.log)?;
                w.write_i32(self.status);
                Ok(())
            }

            fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
                self.log = r.read()?;
                self.status = r.read_i32()?;
                Ok(())
            }
        }

        #[derive(Debug, Clone, PartialEq)]
        pub struct $request {
            pub unc_server_name: Option<String>,
            pub module_name: String,
            /// Must be empty
            pub reg_module_name: String,
            pub major_version: u32,
            pub minor_version: u32,
        }

        impl Default for $request {
            fn default() -> Self {
                Self {
                    unc_server_name: None,
                    module_name: String::new(),
                    reg_module_name: String::new(),
                    major_version: 1,
                    minor_version: 1,
                }
            }
        }

        impl Projection<$op> for $request {
            fn into_op(self, op: &mut $op) {
                op.unc_server_name = unique_string(self.unc_server_name);
                op.module_name = RpcUnicodeString::new(self.module_name);
                op.reg_module_name = RpcUnicodeString::new(self.reg_module_name);
                op.major_version = self.major_version;
                op.minor_version = self.minor_version;
            }

            fn from_op(op: &mut $op) -> Self {
                Self {
                    unc_server_name: take_unique_string(&mut op.unc_server_name),
                    module_name: std::mem::take(&mut op.module_name.value),
                    reg_module_name: std::mem::take(&mut op.reg_module_name.value),
                    major_version: op.major_version,
                    minor_version: op.minor_version,
                }
            }
        }

        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $response {
            pub log: LogHandle,
            pub status: i32,
        }

        impl Projection<$op> for $response {
            fn into_op(self, op: &mut $op) {
                op.log = self.log;
                op.status = self.status;
            }

            fn from_op(op: &mut $op) -> Self {
                Self {
                    log: op.log,
                    status: op.status,
                }
            }
        }
    };
}

open_op!(
    OpenEventLogW,
    OpenEventLogWRequest,
    OpenEventLogWResponse,
    opnum::OPEN_ELW,
    "ElfrOpenELW",
    "`ElfrOpenELW`: open a live log for reading."
);

open_op!(
    RegisterEventSourceW,
    RegisterEventSourceWRequest,
    RegisterEventSourceWResponse,
    opnum::REGISTER_EVENT_SOURCE_W,
    "ElfrRegisterEventSourceW",
    "`ElfrRegisterEventSourceW`: obtain a handle for reporting events."
);

/// `ElfrOpenBELW`: open a backup log file for reading.
#[derive(Debug, Default)]
pub struct OpenBackupEventLogW {
    pub unc_server_name: UniquePtr<NdrWString>,
    pub backup_file_name: RpcUnicodeString,
    pub major_version: u32,
    pub minor_version: u32,
    pub log: LogHandle,
    pub status: i32,
}

impl Operation for OpenBackupEventLogW {
    op_identity!(opnum::OPEN_BELW, "ElfrOpenBELW");

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.unc_server_name)?;
        w.write(&self.backup_file_name)?;
        w.write_u32(self.major_version);
        w.write_u32(self.minor_version);
        Ok(())
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.unc_server_name = r.read()?;
        self.backup_file_name = r.read()?;
        self.major_version = r.read_u32()?;
        self.minor_version = r.read_u32()?;
        Ok(())
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.log)?;
        w.write_i32(self.status);
        Ok(())
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.log = r.read()?;
        self.status = r.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenBackupEventLogWRequest {
    pub unc_server_name: Option<String>,
    pub backup_file_name: String,
    pub major_version: u32,
    pub minor_version: u32,
}

impl Default for OpenBackupEventLogWRequest {
    fn default() -> Self {
        Self {
            unc_server_name: None,
            backup_file_name: String::new(),
            major_version: 1,
            minor_version: 1,
        }
    }
}

impl Projection<OpenBackupEventLogW> for OpenBackupEventLogWRequest {
    fn into_op(self, op: &mut OpenBackupEventLogW) {
        op.unc_server_name = unique_string(self.unc_server_name);
        op.backup_file_name = RpcUnicodeString::new(self.backup_file_name);
        op.major_version = self.major_version;
        op.minor_version = self.minor_version;
    }

    fn from_op(op: &mut OpenBackupEventLogW) -> Self {
        Self {
            unc_server_name: take_unique_string(&mut op.unc_server_name),
            backup_file_name: std::mem::take(&mut op.backup_file_name.value),
            major_version: op.major_version,
            minor_version: op.minor_version,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenBackupEventLogWResponse {
    pub log: LogHandle,
    pub status: i32,
}

impl Projection<OpenBackupEventLogW> for OpenBackupEventLogWResponse {
    fn into_op(self, op: &mut OpenBackupEventLogW) {
        op.log = self.log;
        op.status = self.status;
    }

    fn from_op(op: &mut OpenBackupEventLogW) -> Self {
        Self {
            log: op.log,
            status: op.status,
        }
    }
}

/// `ElfrReadELW`: read whole records into a caller-sized buffer.
///
/// The response buffer is exactly `number_of_bytes_to_read` long on the
/// wire: shorter server data is zero padded, longer data is cut.
#[derive(Debug, Default)]
pub struct ReadEventLogW {
    pub log: LogHandle,
    pub read_flags: u32,
    pub record_offset: u32,
    pub number_of_bytes_to_read: u32,
    pub buffer: Vec<u8>,
    pub number_of_bytes_read: u32,
    pub min_number_of_bytes_needed: u32,
    pub status: i32,
}

impl Operation for ReadEventLogW {
    op_identity!(opnum::READ_ELW, "ElfrReadELW");

    fn prepare_request(&mut self) -> Result<()> {
        check_range(
            "NumberOfBytesToRead",
            self.number_of_bytes_to_read as u64,
            0,
            MAX_BATCH_BUFF as u64,
        )
    }

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.log)?;
        w.write_u32(self.read_flags);
        w.write_u32(self.record_offset);
        w.write_u32(self.number_of_bytes_to_read);
        Ok(())
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.log = r.read()?;
        self.read_flags = r.read_u32()?;
        self.record_offset = r.read_u32()?;
        self.number_of_bytes_to_read = r.read_u32()?;
        self.prepare_request()
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        encode_sized(w, &self.buffer, self.number_of_bytes_to_read as usize)?;
        w.write_u32(self.number_of_bytes_read);
        w.write_u32(self.min_number_of_bytes_needed);
        w.write_i32(self.status);
        Ok(())
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.buffer = decode_sized(r)?;
        copy_if_unset(&mut self.number_of_bytes_to_read, saturate_u32(self.buffer.len()));
        self.number_of_bytes_read = r.read_u32()?;
        self.min_number_of_bytes_needed = r.read_u32()?;
        self.status = r.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadEventLogWRequest {
    pub log: LogHandle,
    pub read_flags: u32,
    pub record_offset: u32,
    pub number_of_bytes_to_read: u32,
}

impl Projection<ReadEventLogW> for ReadEventLogWRequest {
    fn into_op(self, op: &mut ReadEventLogW) {
        op.log = self.log;
        op.read_flags = self.read_flags;
        op.record_offset = self.record_offset;
        op.number_of_bytes_to_read = self.number_of_bytes_to_read;
    }

    fn from_op(op: &mut ReadEventLogW) -> Self {
        Self {
            log: op.log,
            read_flags: op.read_flags,
            record_offset: op.record_offset,
            number_of_bytes_to_read: op.number_of_bytes_to_read,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadEventLogWResponse {
    /// Echo of the requested size; the request's value wins
    pub number_of_bytes_to_read: u32,
    pub buffer: Vec<u8>,
    pub number_of_bytes_read: u32,
    pub min_number_of_bytes_needed: u32,
    pub status: i32,
}

impl Projection<ReadEventLogW> for ReadEventLogWResponse {
    fn into_op(self, op: &mut ReadEventLogW) {
        copy_if_unset(&mut op.number_of_bytes_to_read, self.number_of_bytes_to_read);
        op.buffer = self.buffer;
        op.number_of_bytes_read = self.number_of_bytes_read;
        op.min_number_of_bytes_needed = self.min_number_of_bytes_needed;
        op.status = self.status;
    }

    fn from_op(op: &mut ReadEventLogW) -> Self {
        Self {
            number_of_bytes_to_read: op.number_of_bytes_to_read,
            buffer: std::mem::take(&mut op.buffer),
            number_of_bytes_read: op.number_of_bytes_read,
            min_number_of_bytes_needed: op.min_number_of_bytes_needed,
            status: op.status,
        }
    }
}

/// `ElfrReportEventW`: write one event through a registered source.
#[derive(Debug, Default)]
pub struct ReportEventW {
    pub log: LogHandle,
    pub time: u32,
    pub event_type: u16,
    pub event_category: u16,
    pub event_id: u32,
    /// `NumStrings`; zero is derived from `strings`
    pub num_strings: u16,
    /// `DataSize`; zero is derived from `data`
    pub data_size: u32,
    pub computer_name: RpcUnicodeString,
    pub user_sid: UniquePtr<Sid>,
    pub strings: Vec<UniquePtr<RpcUnicodeString>>,
    pub data: Vec<u8>,
    pub flags: u16,
    pub record_number: u32,
    pub time_written: u32,
    pub status: i32,
}

impl Operation for ReportEventW {
    op_identity!(opnum::REPORT_EVENT_W, "ElfrReportEventW");

    fn prepare_request(&mut self) -> Result<()> {
        if self.num_strings == 0 {
            self.num_strings = saturate_u16(self.strings.len());
        }
        if self.data_size == 0 {
            self.data_size = saturate_u32(self.data.len());
        }
        check_range("NumStrings", self.num_strings as u64, 0, MAX_STRINGS as u64)?;
        check_range("DataSize", self.data_size as u64, 0, MAX_EVENT_DATA as u64)
    }

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.log)?;
        w.write_u32(self.time);
        w.write_u16(self.event_type);
        w.write_u16(self.event_category);
        w.write_u32(self.event_id);
        w.write_u16(self.num_strings);
        w.write_u32(self.data_size);
        w.write(&self.computer_name)?;
        w.write(&self.user_sid)?;
        encode_sized(w, &self.strings, self.num_strings as usize)?;

        let has_data = !self.data.is_empty() || self.data_size > 0;
        if w.write_referent(has_data) != 0 {
            encode_sized(w, &self.data, self.data_size as usize)?;
        }

        w.write_u16(self.flags);
        write_unique_u32(w, self.record_number);
        write_unique_u32(w, self.time_written);
        Ok(())
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.log = r.read()?;
        self.time = r.read_u32()?;
        self.event_type = r.read_u16()?;
        self.event_category = r.read_u16()?;
        self.event_id = r.read_u32()?;
        self.num_strings = r.read_u16()?;
        self.data_size = r.read_u32()?;
        check_range("NumStrings", self.num_strings as u64, 0, MAX_STRINGS as u64)?;
        check_range("DataSize", self.data_size as u64, 0, MAX_EVENT_DATA as u64)?;
        self.computer_name = r.read()?;
        self.user_sid = r.read()?;
        self.strings = decode_sized(r)?;
        self.data = match r.read_referent()? {
            0 => Vec::new(),
            _ => decode_sized(r)?,
        };
        // the counts size the arrays; a disagreeing peer sent a bad stub
        check_count(self.num_strings as usize, self.strings.len())?;
        check_count(self.data_size as usize, self.data.len())?;
        self.flags = r.read_u16()?;
        self.record_number = read_unique_u32(r)?;
        self.time_written = read_unique_u32(r)?;
        Ok(())
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        write_unique_u32(w, self.record_number);
        write_unique_u32(w, self.time_written);
        w.write_i32(self.status);
        Ok(())
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.record_number = read_unique_u32(r)?;
        self.time_written = read_unique_u32(r)?;
        self.status = r.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportEventWRequest {
    pub log: LogHandle,
    pub time: u32,
    pub event_type: u16,
    pub event_category: u16,
    pub event_id: u32,
    pub computer_name: String,
    pub user_sid: Option<Sid>,
    /// Insertion strings; a null entry on the wire reads back as `None`
    pub strings: Vec<Option<String>>,
    pub data: Vec<u8>,
    pub flags: u16,
    pub record_number: u32,
    pub time_written: u32,
}

impl Projection<ReportEventW> for ReportEventWRequest {
    fn into_op(self, op: &mut ReportEventW) {
        op.log = self.log;
        op.time = self.time;
        op.event_type = self.event_type;
        op.event_category = self.event_category;
        op.event_id = self.event_id;
        op.computer_name = RpcUnicodeString::new(self.computer_name);
        op.user_sid = self.user_sid.into();
        op.strings = self.strings.into_iter().map(unique_counted).collect();
        op.data = self.data;
        op.flags = self.flags;
        op.record_number = self.record_number;
        op.time_written = self.time_written;
    }

    fn from_op(op: &mut ReportEventW) -> Self {
        Self {
            log: op.log,
            time: op.time,
            event_type: op.event_type,
            event_category: op.event_category,
            event_id: op.event_id,
            computer_name: std::mem::take(&mut op.computer_name.value),
            user_sid: std::mem::take(&mut op.user_sid).into_option(),
            strings: op.strings.iter_mut().map(take_unique_counted).collect(),
            data: std::mem::take(&mut op.data),
            flags: op.flags,
            record_number: op.record_number,
            time_written: op.time_written,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportEventWResponse {
    pub record_number: u32,
    pub time_written: u32,
    pub status: i32,
}

impl Projection<ReportEventW> for ReportEventWResponse {
    fn into_op(self, op: &mut ReportEventW) {
        op.record_number = self.record_number;
        op.time_written = self.time_written;
        op.status = self.status;
    }

    fn from_op(op: &mut ReportEventW) -> Self {
        Self {
            record_number: op.record_number,
            time_written: op.time_written,
            status: op.status,
        }
    }
}

/// `ElfrGetLogInformation`: fixed-size information block about a log.
#[derive(Debug, Default)]
pub struct GetLogInformation {
    pub log: LogHandle,
    pub info_level: u32,
    /// `cbBufSize`
    pub buffer_length: u32,
    pub buffer: Vec<u8>,
    /// `pcbBytesNeeded`
    pub bytes_needed: u32,
    pub status: i32,
}

impl Operation for GetLogInformation {
    op_identity!(opnum::GET_LOG_INFORMATION, "ElfrGetLogInformation");

    fn prepare_request(&mut self) -> Result<()> {
        check_range("cbBufSize", self.buffer_length as u64, 0, MAX_LOG_INFORMATION as u64)
    }

    fn write_request(&self, w: &mut NdrWriter) -> Result<()> {
        w.write(&self.log)?;
        w.write_u32(self.info_level);
        w.write_u32(self.buffer_length);
        Ok(())
    }

    fn read_request(&mut self, r: &mut NdrReader) -> Result<()> {
        self.log = r.read()?;
        self.info_level = r.read_u32()?;
        self.buffer_length = r.read_u32()?;
        self.prepare_request()
    }

    fn write_response(&self, w: &mut NdrWriter) -> Result<()> {
        encode_sized(w, &self.buffer, self.buffer_length as usize)?;
        w.write_u32(self.bytes_needed);
        w.write_i32(self.status);
        Ok(())
    }

    fn read_response(&mut self, r: &mut NdrReader) -> Result<()> {
        self.buffer = decode_sized(r)?;
        copy_if_unset(&mut self.buffer_length, saturate_u32(self.buffer.len()));
        self.bytes_needed = r.read_u32()?;
        self.status = r.read_i32()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetLogInformationRequest {
    pub log: LogHandle,
    pub info_level: u32,
    pub buffer_length: u32,
}

impl Projection<GetLogInformation> for GetLogInformationRequest {
    fn into_op(self, op: &mut GetLogInformation) {
        op.log = self.log;
        op.info_level = self.info_level;
        op.buffer_length = self.buffer_length;
    }

    fn from_op(op: &mut GetLogInformation) -> Self {
        Self {
            log: op.log,
            info_level: op.info_level,
            buffer_length: op.buffer_length,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetLogInformationResponse {
    pub buffer_length: u32,
    pub buffer: Vec<u8>,
    pub bytes_needed: u32,
    pub status: i32,
}

impl Projection<GetLogInformation> for GetLogInformationResponse {
    fn into_op(self, op: &mut GetLogInformation) {
        copy_if_unset(&mut op.buffer_length, self.buffer_length);
        op.buffer = self.buffer;
        op.bytes_needed = self.bytes_needed;
        op.status = self.status;
    }

    fn from_op(op: &mut GetLogInformation) -> Self {
        Self {
            buffer_length: op.buffer_length,
            buffer: std::mem::take(&mut op.buffer),
            bytes_needed: op.bytes_needed,
            status: op.status,
        }
    }
}
