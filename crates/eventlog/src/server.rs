//! eventlog server dispatch

use std::sync::Arc;

use async_trait::async_trait;
use dcerpc::ndr::NdrReader;
use dcerpc::{serve, DispatchTable, Operation, Result, RpcError, Slot, TableHandle};
use futures::future::BoxFuture;

use crate::ops::*;
use crate::protocol::EVENTLOG_SYNTAX_V0_0;

/// Server side of eventlog v0.
///
/// Every method defaults to [`RpcError::NotImplemented`], so an
/// implementation only overrides the operations it serves.
#[async_trait]
pub trait EventlogServer: Send + Sync {
    async fn clear_event_log(&self, _req: ClearEventLogWRequest) -> Result<ClearEventLogWResponse> {
        Err(RpcError::NotImplemented("ElfrClearELFW"))
    }

    async fn backup_event_log(&self, _req: BackupEventLogWRequest) -> Result<BackupEventLogWResponse> {
        Err(RpcError::NotImplemented("ElfrBackupELFW"))
    }

    async fn close_event_log(&self, _req: CloseEventLogRequest) -> Result<CloseEventLogResponse> {
        Err(RpcError::NotImplemented("ElfrCloseEL"))
    }

    async fn deregister_event_source(
        &self,
        _req: DeregisterEventSourceRequest,
    ) -> Result<DeregisterEventSourceResponse> {
        Err(RpcError::NotImplemented("ElfrDeregisterEventSource"))
    }

    async fn number_of_records(&self, _req: NumberOfRecordsRequest) -> Result<NumberOfRecordsResponse> {
        Err(RpcError::NotImplemented("ElfrNumberOfRecords"))
    }

    async fn oldest_record(&self, _req: OldestRecordRequest) -> Result<OldestRecordResponse> {
        Err(RpcError::NotImplemented("ElfrOldestRecord"))
    }

    async fn open_event_log(&self, _req: OpenEventLogWRequest) -> Result<OpenEventLogWResponse> {
        Err(RpcError::NotImplemented("ElfrOpenELW"))
    }

    async fn register_event_source(
        &self,
        _req: RegisterEventSourceWRequest,
    ) -> Result<RegisterEventSourceWResponse> {
        Err(RpcError::NotImplemented("ElfrRegisterEventSourceW"))
    }

    async fn open_backup_event_log(
        &self,
        _req: OpenBackupEventLogWRequest,
    ) -> Result<OpenBackupEventLogWResponse> {
        Err(RpcError::NotImplemented("ElfrOpenBELW"))
    }

    async fn read_event_log(&self, _req: ReadEventLogWRequest) -> Result<ReadEventLogWResponse> {
        Err(RpcError::NotImplemented("ElfrReadELW"))
    }

    async fn report_event(&self, _req: ReportEventWRequest) -> Result<ReportEventWResponse> {
        Err(RpcError::NotImplemented("ElfrReportEventW"))
    }

    async fn get_log_information(
        &self,
        _req: GetLogInformationRequest,
    ) -> Result<GetLogInformationResponse> {
        Err(RpcError::NotImplemented("ElfrGetLogInformation"))
    }
}

/// Object type the dispatch table is written against
pub type Server = dyn EventlogServer;

macro_rules! handler {
    ($name:ident, $op:ty, $req:ty, $resp:ty, $method:ident) => {
        fn $name<'a>(s: &'a Server, r: &'a mut NdrReader) -> BoxFuture<'a, Result<Box<dyn Operation>>> {
            Box::pin(serve::<$op, $req, $resp, _, _>(r, move |req| s.$method(req)))
        }
    };
}

handler!(clear_elfw, ClearEventLogW, ClearEventLogWRequest, ClearEventLogWResponse, clear_event_log);
handler!(backup_elfw, BackupEventLogW, BackupEventLogWRequest, BackupEventLogWResponse, backup_event_log);
handler!(close_el, CloseEventLog, CloseEventLogRequest, CloseEventLogResponse, close_event_log);
handler!(
    deregister_event_source,
    DeregisterEventSource,
    DeregisterEventSourceRequest,
    DeregisterEventSourceResponse,
    deregister_event_source
);
handler!(number_of_records, NumberOfRecords, NumberOfRecordsRequest, NumberOfRecordsResponse, number_of_records);
handler!(oldest_record, OldestRecord, OldestRecordRequest, OldestRecordResponse, oldest_record);
handler!(open_elw, OpenEventLogW, OpenEventLogWRequest, OpenEventLogWResponse, open_event_log);
handler!(
    register_event_source_w,
    RegisterEventSourceW,
    RegisterEventSourceWRequest,
    RegisterEventSourceWResponse,
    register_event_source
);
handler!(
    open_belw,
    OpenBackupEventLogW,
    OpenBackupEventLogWRequest,
    OpenBackupEventLogWResponse,
    open_backup_event_log
);
handler!(read_elw, ReadEventLogW, ReadEventLogWRequest, ReadEventLogWResponse, read_event_log);
handler!(report_event_w, ReportEventW, ReportEventWRequest, ReportEventWResponse, report_event);
handler!(
    get_log_information,
    GetLogInformation,
    GetLogInformationRequest,
    GetLogInformationResponse,
    get_log_information
);

// ANSI variants and the local-only change notification are not served.
static SLOTS: [Slot<Server>; 27] = [
    Slot::Call(clear_elfw),
    Slot::Call(backup_elfw),
    Slot::Call(close_el),
    Slot::Call(deregister_event_source),
    Slot::Call(number_of_records),
    Slot::Call(oldest_record),
    Slot::Unavailable, // ElfrChangeNotify
    Slot::Call(open_elw),
    Slot::Call(register_event_source_w),
    Slot::Call(open_belw),
    Slot::Call(read_elw),
    Slot::Call(report_event_w),
    Slot::Unavailable, // ElfrClearELFA
    Slot::Unavailable, // ElfrBackupELFA
    Slot::Unavailable, // ElfrOpenELA
    Slot::Unavailable, // ElfrRegisterEventSourceA
    Slot::Unavailable, // ElfrOpenBELA
    Slot::Unavailable, // ElfrReadELA
    Slot::Unavailable, // ElfrReportEventA
    Slot::Reserved,
    Slot::Reserved,
    Slot::Reserved,
    Slot::Call(get_log_information),
    Slot::Reserved,
    Slot::Unavailable, // ElfrReportEventAndSourceW
    Slot::Unavailable, // ElfrReportEventExW
    Slot::Unavailable, // ElfrReportEventExA
];

static TABLE: DispatchTable<Server> = DispatchTable {
    interface: "eventlog",
    syntax: EVENTLOG_SYNTAX_V0_0,
    slots: &SLOTS,
};

pub fn dispatch_table() -> &'static DispatchTable<Server> {
    &TABLE
}

/// Pair an implementation with the eventlog table, ready for registration.
pub fn server_handle(server: Arc<Server>) -> TableHandle<Server> {
    TableHandle::new(server, &TABLE)
}
