//! eventlog operations end to end over the loopback transport

use bytes::Bytes;
use dcerpc::{call, Connection, RpcError, ServerConfig};
use integration_tests::{connect, start_server, start_server_with, MemoryEventlog, Record};
use msrpc_eventlog::ops::*;
use msrpc_eventlog::protocol::{event_type, opnum, read_flags, status};
use msrpc_eventlog::{Event, Sid};

const FORWARDS: u32 = read_flags::EVENTLOG_SEQUENTIAL_READ | read_flags::EVENTLOG_FORWARDS_READ;
const BACKWARDS: u32 = read_flags::EVENTLOG_SEQUENTIAL_READ | read_flags::EVENTLOG_BACKWARDS_READ;

fn event(id: u32, strings: &[&str]) -> Event {
    Event {
        time: 1_700_000_000 + id,
        event_type: event_type::EVENTLOG_INFORMATION_TYPE,
        event_id: id,
        computer_name: "HOST01".into(),
        strings: strings.iter().map(|s| s.to_string()).collect(),
        ..Event::default()
    }
}

#[tokio::test]
async fn test_report_then_read() {
    let (server, eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;

    let source = client.register_source("demo-service").await.unwrap();
    let first = client.report_event(source, event(100, &["started"])).await.unwrap();
    let second = client
        .report_event(
            source,
            Event {
                user_sid: Some(Sid::new(5, vec![18])),
                data: vec![0xca, 0xfe],
                ..event(101, &["stopped", "code 3"])
            },
        )
        .await
        .unwrap();
    assert_eq!((first, second), (1, 2));
    client.deregister_source(source).await.unwrap();

    let log = client.open("Application").await.unwrap();
    assert_eq!(client.number_of_records(log).await.unwrap(), 2);
    assert_eq!(client.oldest_record(log).await.unwrap(), 1);

    let buffer = client.read(log, FORWARDS, 0, 4096).await.unwrap();
    let records = Record::decode_all(&buffer).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source, "demo-service");
    assert_eq!(records[0].strings, vec!["started"]);
    assert_eq!(records[1].strings, vec!["stopped", "code 3"]);
    assert_eq!(records[1].data, vec![0xca, 0xfe]);
    assert_eq!(records[1].time_generated, 1_700_000_101);
    assert_eq!(records, eventlog.records("Application"));

    // sequential cursor is exhausted
    let err = client.read(log, FORWARDS, 0, 4096).await.unwrap_err();
    assert_eq!(err.status(), Some(status::STATUS_END_OF_FILE));

    client.close(log).await.unwrap();
    assert_eq!(eventlog.open_handles(), 0);
}

#[tokio::test]
async fn test_read_backwards_and_seek() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let source = client.register_source("svc").await.unwrap();
    for id in 1..=5 {
        client.report_event(source, event(id, &[])).await.unwrap();
    }

    let log = client.open("Application").await.unwrap();
    let newest = Record::decode_all(&client.read(log, BACKWARDS, 0, 4096).await.unwrap()).unwrap();
    let ids: Vec<_> = newest.iter().map(|r| r.event_id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);

    let seek = read_flags::EVENTLOG_SEEK_READ | read_flags::EVENTLOG_FORWARDS_READ;
    let from_four = Record::decode_all(&client.read(log, seek, 4, 4096).await.unwrap()).unwrap();
    assert_eq!(from_four.iter().map(|r| r.record_number).collect::<Vec<_>>(), vec![4, 5]);

    let err = client.read(log, read_flags::EVENTLOG_SEEK_READ, 1, 4096).await.unwrap_err();
    assert_eq!(err.status(), Some(status::STATUS_INVALID_PARAMETER));
}

#[tokio::test]
async fn test_small_buffer_reports_size_needed() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let source = client.register_source("svc").await.unwrap();
    client.report_event(source, event(7, &["a fairly long insertion string"])).await.unwrap();
    let log = client.open("Application").await.unwrap();

    let request = ReadEventLogWRequest {
        log,
        read_flags: FORWARDS,
        record_offset: 0,
        number_of_bytes_to_read: 16,
    };
    let err = client.read_raw(request.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        RpcError::RemoteFailure {
            operation: "ElfrReadELW",
            status: status::STATUS_BUFFER_TOO_SMALL,
        }
    ));

    // invoke_unchecked keeps the out parameters of a failed call
    let mut op = ReadEventLogW::default();
    dcerpc::Projection::into_op(request, &mut op);
    dcerpc::invoke_unchecked(client.connection(), &mut op, &Default::default())
        .await
        .unwrap();
    assert_eq!(op.status, status::STATUS_BUFFER_TOO_SMALL);
    assert_eq!(op.buffer.len(), 16);
    assert_eq!(op.number_of_bytes_read, 0);
    let needed = op.min_number_of_bytes_needed;
    assert!(needed > 16);

    let buffer = client.read(log, FORWARDS, 0, needed).await.unwrap();
    assert_eq!(buffer.len(), needed as usize);
}

#[tokio::test]
async fn test_clear_with_backup_and_open_backup() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let source = client.register_source("svc").await.unwrap();
    for id in 0..3 {
        client.report_event(source, event(id, &[])).await.unwrap();
    }

    let log = client.open("Application").await.unwrap();
    client.clear(log, Some("app.evt")).await.unwrap();
    assert_eq!(client.number_of_records(log).await.unwrap(), 0);

    let backup = client.open_backup("app.evt").await.unwrap();
    assert_eq!(client.number_of_records(backup).await.unwrap(), 3);
    let records = Record::decode_all(&client.read(backup, FORWARDS, 0, 4096).await.unwrap()).unwrap();
    assert_eq!(records.len(), 3);

    // clearing a backup is refused
    let err = client.clear(backup, None).await.unwrap_err();
    assert_eq!(err.status(), Some(status::STATUS_INVALID_HANDLE));

    let err = client.open_backup("missing.evt").await.unwrap_err();
    assert_eq!(err.status(), Some(status::STATUS_INVALID_PARAMETER));

    client.backup(log, "empty.evt").await.unwrap();
    let empty = client.open_backup("empty.evt").await.unwrap();
    assert_eq!(client.number_of_records(empty).await.unwrap(), 0);
}

#[tokio::test]
async fn test_log_full_information() {
    let (server, _eventlog) = start_server_with(ServerConfig::default(), MemoryEventlog::with_capacity(2)).await;
    let client = connect(&server).await;
    let source = client.register_source("svc").await.unwrap();
    let log = client.open("Application").await.unwrap();

    assert!(!client.is_full(log).await.unwrap());
    for id in 0..3 {
        client.report_event(source, event(id, &[])).await.unwrap();
    }
    assert!(client.is_full(log).await.unwrap());
    assert_eq!(client.oldest_record(log).await.unwrap(), 2);

    let err = call::<_, GetLogInformation, _, GetLogInformationResponse>(
        client.connection(),
        GetLogInformationRequest {
            log,
            info_level: 0,
            buffer_length: 2,
        },
        &Default::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), Some(status::STATUS_BUFFER_TOO_SMALL));
}

#[tokio::test]
async fn test_open_rejects_reg_module_name() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let err = call::<_, OpenEventLogW, _, OpenEventLogWResponse>(
        client.connection(),
        OpenEventLogWRequest {
            module_name: "System".into(),
            reg_module_name: "System".into(),
            ..OpenEventLogWRequest::default()
        },
        &Default::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), Some(status::STATUS_INVALID_PARAMETER));

    // unknown logs fall back to Application
    let log = client.open("NoSuchLog").await.unwrap();
    assert!(!log.is_nil());
}

#[tokio::test]
async fn test_reserved_and_unavailable_opnums() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let conn = client.connection();

    for n in opnum::NOT_USED_ON_WIRE {
        let reply = conn.invoke(n, Bytes::new()).await.unwrap();
        assert!(reply.is_empty());
    }

    for n in [opnum::CHANGE_NOTIFY, 14, 26, opnum::COUNT] {
        let err = conn.invoke(n, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, RpcError::Fault(0x1c01_0002)), "opnum {}: {:?}", n, err);
    }
}

#[tokio::test]
async fn test_malformed_stub_faults() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    // a context handle needs 20 bytes
    let err = client
        .connection()
        .invoke(opnum::NUMBER_OF_RECORDS, Bytes::from_static(&[0; 8]))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Fault(0x6f7)));
    assert_eq!(server.stats().requests_failed, 1);
}
