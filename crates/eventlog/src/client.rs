//! eventlog client

use dcerpc::{call, BindOptions, Binder, CallOptions, Connection, Result};
use tracing::debug;

use crate::ops::*;
use crate::protocol::{LogHandle, Sid, EVENTLOG_FULL_INFO, EVENTLOG_SYNTAX_V0_0};

/// One event to report through [`EventlogClient::report_event`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub time: u32,
    pub event_type: u16,
    pub event_category: u16,
    pub event_id: u32,
    pub computer_name: String,
    pub user_sid: Option<Sid>,
    pub strings: Vec<String>,
    pub data: Vec<u8>,
}

/// Typed eventlog v0 client over any bound [`Connection`].
///
/// Every method runs one call; a non-zero NTSTATUS surfaces as
/// [`RpcError::RemoteFailure`](dcerpc::RpcError::RemoteFailure).
pub struct EventlogClient<C: Connection> {
    conn: C,
    options: CallOptions,
}

impl<C: Connection> EventlogClient<C> {
    /// Wrap a connection already bound to eventlog v0.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            options: CallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    pub async fn alter_context(&self, options: &BindOptions) -> Result<()> {
        self.conn.alter_context(options).await
    }

    /// Open a live log, e.g. `"Application"`.
    pub async fn open(&self, module_name: &str) -> Result<LogHandle> {
        let request = OpenEventLogWRequest {
            module_name: module_name.to_string(),
            ..OpenEventLogWRequest::default()
        };
        let response: OpenEventLogWResponse =
            call::<_, OpenEventLogW, _, _>(&self.conn, request, &self.options).await?;
        debug!("Opened event log {}: {}", module_name, response.log);
        Ok(response.log)
    }

    pub async fn open_backup(&self, backup_file_name: &str) -> Result<LogHandle> {
        let request = OpenBackupEventLogWRequest {
            backup_file_name: backup_file_name.to_string(),
            ..OpenBackupEventLogWRequest::default()
        };
        let response: OpenBackupEventLogWResponse =
            call::<_, OpenBackupEventLogW, _, _>(&self.conn, request, &self.options).await?;
        Ok(response.log)
    }

    /// Register an event source for [`report_event`](Self::report_event).
    pub async fn register_source(&self, source_name: &str) -> Result<LogHandle> {
        let request = RegisterEventSourceWRequest {
            module_name: source_name.to_string(),
            ..RegisterEventSourceWRequest::default()
        };
        let response: RegisterEventSourceWResponse =
            call::<_, RegisterEventSourceW, _, _>(&self.conn, request, &self.options).await?;
        debug!("Registered event source {}: {}", source_name, response.log);
        Ok(response.log)
    }

    /// Close a handle from [`open`](Self::open) or [`open_backup`](Self::open_backup).
    pub async fn close(&self, log: LogHandle) -> Result<()> {
        let _: CloseEventLogResponse =
            call::<_, CloseEventLog, _, _>(&self.conn, CloseEventLogRequest { log }, &self.options).await?;
        Ok(())
    }

    pub async fn deregister_source(&self, log: LogHandle) -> Result<()> {
        let _: DeregisterEventSourceResponse = call::<_, DeregisterEventSource, _, _>(
            &self.conn,
            DeregisterEventSourceRequest { log },
            &self.options,
        )
        .await?;
        Ok(())
    }

    pub async fn number_of_records(&self, log: LogHandle) -> Result<u32> {
        let response: NumberOfRecordsResponse =
            call::<_, NumberOfRecords, _, _>(&self.conn, NumberOfRecordsRequest { log }, &self.options).await?;
        Ok(response.number_of_records)
    }

    pub async fn oldest_record(&self, log: LogHandle) -> Result<u32> {
        let response: OldestRecordResponse =
            call::<_, OldestRecord, _, _>(&self.conn, OldestRecordRequest { log }, &self.options).await?;
        Ok(response.oldest_record_number)
    }

    /// Read records into a buffer of `size` bytes.
    ///
    /// The returned buffer is truncated to the bytes the server filled.
    pub async fn read(&self, log: LogHandle, read_flags: u32, record_offset: u32, size: u32) -> Result<Vec<u8>> {
        let request = ReadEventLogWRequest {
            log,
            read_flags,
            record_offset,
            number_of_bytes_to_read: size,
        };
        let mut response: ReadEventLogWResponse =
            call::<_, ReadEventLogW, _, _>(&self.conn, request, &self.options).await?;
        response.buffer.truncate(response.number_of_bytes_read as usize);
        Ok(response.buffer)
    }

    /// Like [`read`](Self::read), returning the full response.
    pub async fn read_raw(&self, request: ReadEventLogWRequest) -> Result<ReadEventLogWResponse> {
        call::<_, ReadEventLogW, _, _>(&self.conn, request, &self.options).await
    }

    /// Report one event, returning the record number assigned to it.
    pub async fn report_event(&self, log: LogHandle, event: Event) -> Result<u32> {
        let request = ReportEventWRequest {
            log,
            time: event.time,
            event_type: event.event_type,
            event_category: event.event_category,
            event_id: event.event_id,
            computer_name: event.computer_name,
            user_sid: event.user_sid,
            strings: event.strings.into_iter().map(Some).collect(),
            data: event.data,
            ..ReportEventWRequest::default()
        };
        let response: ReportEventWResponse =
            call::<_, ReportEventW, _, _>(&self.conn, request, &self.options).await?;
        Ok(response.record_number)
    }

    /// Clear a log, first backing it up when `backup_file_name` is given.
    pub async fn clear(&self, log: LogHandle, backup_file_name: Option<&str>) -> Result<()> {
        let request = ClearEventLogWRequest {
            log,
            backup_file_name: backup_file_name.map(str::to_string),
        };
        let _: ClearEventLogWResponse =
            call::<_, ClearEventLogW, _, _>(&self.conn, request, &self.options).await?;
        Ok(())
    }

    pub async fn backup(&self, log: LogHandle, backup_file_name: &str) -> Result<()> {
        let request = BackupEventLogWRequest {
            log,
            backup_file_name: backup_file_name.to_string(),
        };
        let _: BackupEventLogWResponse =
            call::<_, BackupEventLogW, _, _>(&self.conn, request, &self.options).await?;
        Ok(())
    }

    /// `EVENTLOG_FULL_INFORMATION`: whether the log is full.
    pub async fn is_full(&self, log: LogHandle) -> Result<bool> {
        let request = GetLogInformationRequest {
            log,
            info_level: EVENTLOG_FULL_INFO,
            buffer_length: 4,
        };
        let response: GetLogInformationResponse =
            call::<_, GetLogInformation, _, _>(&self.conn, request, &self.options).await?;
        // dwFull is a little-endian u32; a short buffer reads as zero
        let mut full = [0u8; 4];
        full.iter_mut().zip(&response.buffer).for_each(|(dst, src)| *dst = *src);
        Ok(u32::from_le_bytes(full) != 0)
    }

    /// Bind a fresh connection to eventlog v0 through `binder`.
    pub async fn bind<B>(binder: &B) -> Result<Self>
    where
        B: Binder<Connection = C>,
    {
        let conn = binder.bind(EVENTLOG_SYNTAX_V0_0, &BindOptions::default()).await?;
        Ok(Self::new(conn))
    }
}
