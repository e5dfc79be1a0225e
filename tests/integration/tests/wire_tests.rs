//! Request stubs as seen on the wire, and hostile responses

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dcerpc::ndr::NdrError;
use dcerpc::{
    call, BindOptions, CallOptions, Connection, LoopbackConnection, Result, RpcError, ServerConfig, SyntaxId,
};
use integration_tests::{connect, start_server};
use msrpc_eventlog::ops::*;
use msrpc_eventlog::protocol::{opnum, MAX_BATCH_BUFF};
use msrpc_eventlog::{EventlogClient, EVENTLOG_SYNTAX_V0_0};
use parking_lot::Mutex;

/// Forwards to a real connection and keeps every request stub.
struct Recorder {
    inner: LoopbackConnection,
    sent: Mutex<Vec<(u16, Bytes)>>,
}

#[async_trait]
impl Connection for Recorder {
    fn syntax(&self) -> SyntaxId {
        self.inner.syntax()
    }

    async fn invoke(&self, opnum: u16, stub: Bytes) -> Result<Bytes> {
        self.sent.lock().push((opnum, stub.clone()));
        self.inner.invoke(opnum, stub).await
    }

    async fn alter_context(&self, options: &BindOptions) -> Result<()> {
        self.inner.alter_context(options).await
    }
}

/// Answers every call with the same stub.
struct Hostile(Bytes);

#[async_trait]
impl Connection for Hostile {
    fn syntax(&self) -> SyntaxId {
        EVENTLOG_SYNTAX_V0_0
    }

    async fn invoke(&self, _opnum: u16, _stub: Bytes) -> Result<Bytes> {
        Ok(self.0.clone())
    }

    async fn alter_context(&self, _options: &BindOptions) -> Result<()> {
        Ok(())
    }
}

async fn recorder() -> Arc<Recorder> {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let inner = connect(&server).await.into_inner();
    Arc::new(Recorder {
        inner,
        sent: Mutex::new(Vec::new()),
    })
}

#[tokio::test]
async fn test_absent_and_empty_server_name_differ() {
    let conn = recorder().await;
    for unc_server_name in [None, Some(String::new())] {
        let request = OpenEventLogWRequest {
            unc_server_name,
            module_name: "Application".into(),
            ..OpenEventLogWRequest::default()
        };
        let _: OpenEventLogWResponse = call::<_, OpenEventLogW, _, _>(&*conn, request, &CallOptions::default())
            .await
            .unwrap();
    }

    let sent = conn.sent.lock();
    let (absent, empty) = (&sent[0].1, &sent[1].1);
    assert_eq!(&absent[..4], &[0, 0, 0, 0]);
    assert_ne!(&empty[..4], &[0, 0, 0, 0]);
    // the empty string still carries its conformance and variance header
    assert!(empty.len() > absent.len());
    assert!(sent.iter().all(|(n, _)| *n == opnum::OPEN_ELW));
}

#[tokio::test]
async fn test_out_of_range_request_never_sent() {
    let conn = recorder().await;
    let err = call::<_, ReadEventLogW, _, ReadEventLogWResponse>(
        &*conn,
        ReadEventLogWRequest {
            number_of_bytes_to_read: MAX_BATCH_BUFF + 1,
            ..ReadEventLogWRequest::default()
        },
        &CallOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        RpcError::Ndr(NdrError::FieldOutOfRange {
            field: "NumberOfBytesToRead",
            ..
        })
    ));
    assert!(conn.sent.lock().is_empty());
}

#[tokio::test]
async fn test_hostile_conformance_is_rejected() {
    // ReadELW response claiming a 256 MiB buffer in a 16 byte stub
    let mut stub = vec![0u8; 16];
    stub[..4].copy_from_slice(&0x1000_0000u32.to_le_bytes());
    let client = EventlogClient::new(Hostile(Bytes::from(stub)));
    let err = client.read(Default::default(), 5, 0, 64).await.unwrap_err();
    assert!(matches!(err, RpcError::Ndr(NdrError::BufferOverflow { .. })), "{:?}", err);
}

#[tokio::test]
async fn test_truncated_response_is_rejected() {
    let client = EventlogClient::new(Hostile(Bytes::from_static(&[1, 0, 0])));
    let err = client.number_of_records(Default::default()).await.unwrap_err();
    assert!(matches!(err, RpcError::Ndr(NdrError::ShortBuffer { .. })), "{:?}", err);
}

#[tokio::test]
async fn test_full_flag_reads_whole_word() {
    // size_is(4) buffer, pcbBytesNeeded, NTSTATUS
    let response = |flag: [u8; 4]| {
        let mut stub = vec![4, 0, 0, 0];
        stub.extend_from_slice(&flag);
        stub.extend_from_slice(&[4, 0, 0, 0, 0, 0, 0, 0]);
        EventlogClient::new(Hostile(Bytes::from(stub)))
    };
    assert!(response([0, 0, 0, 1]).is_full(Default::default()).await.unwrap());
    assert!(response([0, 1, 0, 0]).is_full(Default::default()).await.unwrap());
    assert!(!response([0, 0, 0, 0]).is_full(Default::default()).await.unwrap());
}

#[tokio::test]
async fn test_oversized_request_refused() {
    let config = ServerConfig {
        max_pdu_size: 256,
        ..ServerConfig::default()
    };
    let (server, _eventlog) = start_server(config).await;
    let client = connect(&server).await;
    let source = client.register_source("svc").await.unwrap();
    let event = msrpc_eventlog::Event {
        data: vec![0; 1024],
        ..Default::default()
    };
    let err = client.report_event(source, event).await.unwrap_err();
    assert!(matches!(err, RpcError::PduTooLarge { max: 256, .. }));
}

#[tokio::test]
async fn test_bind_to_unregistered_interface() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    server.unregister(&EVENTLOG_SYNTAX_V0_0.uuid).await;
    let err = EventlogClient::bind(&server.binder()).await.err();
    assert!(matches!(err, Some(RpcError::InterfaceNotFound(_))));
}
