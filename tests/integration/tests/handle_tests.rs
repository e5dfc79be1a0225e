//! Context handle lifetime: close, forgery and connection rundown

use dcerpc::ndr::{ContextHandle, Guid};
use dcerpc::{RpcError, ServerConfig};
use integration_tests::{connect, start_server};

#[tokio::test]
async fn test_use_after_close() {
    let (server, eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;

    let log = client.open("System").await.unwrap();
    assert_eq!(eventlog.open_handles(), 1);
    client.close(log).await.unwrap();
    assert_eq!(eventlog.open_handles(), 0);

    let err = client.number_of_records(log).await.unwrap_err();
    assert!(matches!(err, RpcError::InvalidHandle));
    let err = client.close(log).await.unwrap_err();
    assert!(matches!(err, RpcError::InvalidHandle));
}

#[tokio::test]
async fn test_forged_and_nil_handles() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    client.open("Application").await.unwrap();

    let forged = ContextHandle::new(0, Guid::from_u128(0xdead_beef));
    assert!(matches!(client.oldest_record(forged).await, Err(RpcError::InvalidHandle)));
    assert!(matches!(
        client.number_of_records(ContextHandle::nil()).await,
        Err(RpcError::InvalidHandle)
    ));
}

#[tokio::test]
async fn test_handles_are_unique() {
    let (server, eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let mut handles = Vec::new();
    for _ in 0..32 {
        handles.push(client.open("Application").await.unwrap());
    }
    handles.sort_by_key(|h| h.uuid.to_string());
    handles.dedup();
    assert_eq!(handles.len(), 32);
    assert_eq!(eventlog.open_handles(), 32);
}

#[tokio::test]
async fn test_disconnect_runs_down_handles() {
    let (server, eventlog) = start_server(ServerConfig::default()).await;
    let first = connect(&server).await;
    let log = first.open("Application").await.unwrap();
    let source = first.register_source("svc").await.unwrap();
    assert_eq!(eventlog.open_handles(), 2);

    first.connection().revoke().await;
    assert!(first.connection().is_closed().await);
    assert_eq!(eventlog.open_handles(), 0);
    assert!(matches!(first.number_of_records(log).await, Err(RpcError::ConnectionClosed)));

    // the handles do not survive onto another connection either
    let second = connect(&server).await;
    assert!(matches!(second.number_of_records(log).await, Err(RpcError::InvalidHandle)));
    assert!(matches!(second.deregister_source(source).await, Err(RpcError::InvalidHandle)));
}

#[tokio::test]
async fn test_disconnect_leaves_other_connections_handles() {
    let (server, eventlog) = start_server(ServerConfig::default()).await;
    let a = connect(&server).await;
    let b = connect(&server).await;
    let log_a = a.open("Application").await.unwrap();
    let source_a = a.register_source("svc-a").await.unwrap();
    let log_b = b.open("System").await.unwrap();
    assert_eq!(eventlog.open_handles(), 3);

    b.connection().revoke().await;
    assert_eq!(eventlog.open_handles(), 2);
    assert_eq!(a.number_of_records(log_a).await.unwrap(), 0);
    a.report_event(source_a, Default::default()).await.unwrap();
    assert_eq!(a.number_of_records(log_a).await.unwrap(), 1);

    // b's handle is gone even when presented by a
    assert!(matches!(a.number_of_records(log_b).await, Err(RpcError::InvalidHandle)));

    a.close(log_a).await.unwrap();
    a.deregister_source(source_a).await.unwrap();
    assert_eq!(eventlog.open_handles(), 0);
}

#[tokio::test]
async fn test_disconnect_without_rundown_keeps_handles() {
    let config = ServerConfig {
        rundown_on_disconnect: false,
        ..ServerConfig::default()
    };
    let (server, eventlog) = start_server(config).await;
    let first = connect(&server).await;
    let log = first.open("Application").await.unwrap();
    first.connection().revoke().await;
    assert_eq!(eventlog.open_handles(), 1);

    let second = connect(&server).await;
    assert_eq!(second.number_of_records(log).await.unwrap(), 0);
}

#[tokio::test]
async fn test_report_needs_source_handle() {
    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let client = connect(&server).await;
    let log = client.open("Application").await.unwrap();
    let err = client.report_event(log, Default::default()).await.unwrap_err();
    assert!(matches!(err, RpcError::RemoteFailure { operation: "ElfrReportEventW", .. }));
}
