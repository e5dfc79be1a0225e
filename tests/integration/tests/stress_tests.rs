//! Many connections driving one server in parallel

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dcerpc::{CallOptions, ServerConfig};
use futures::future::join_all;
use integration_tests::{connect, start_server, Record};
use msrpc_eventlog::protocol::read_flags;
use msrpc_eventlog::Event;
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_reporters() {
    const CLIENTS: usize = 16;
    const EVENTS_PER_CLIENT: usize = 50;

    let (server, eventlog) = start_server(ServerConfig::default()).await;
    let barrier = Arc::new(Barrier::new(CLIENTS));
    let start = Instant::now();

    let tasks = (0..CLIENTS).map(|client_id| {
        let binder = server.binder();
        let barrier = barrier.clone();
        tokio::spawn(async move {
            let client = msrpc_eventlog::EventlogClient::bind(&binder)
                .await
                .unwrap()
                .with_options(CallOptions::new().timeout(Duration::from_secs(10)));
            let source = client.register_source(&format!("client-{}", client_id)).await.unwrap();
            barrier.wait().await;

            let mut assigned = Vec::with_capacity(EVENTS_PER_CLIENT);
            for n in 0..EVENTS_PER_CLIENT {
                let event = Event {
                    event_id: (client_id * 1000 + n) as u32,
                    strings: vec![format!("client {} event {}", client_id, n)],
                    ..Event::default()
                };
                assigned.push(client.report_event(source, event).await.unwrap());
            }
            client.deregister_source(source).await.unwrap();
            assigned
        })
    });

    let results = join_all(tasks).await;
    let mut numbers = HashSet::new();
    for result in results {
        let assigned = result.unwrap();
        // one connection's calls are serialized, so its records are ordered
        assert!(assigned.windows(2).all(|w| w[0] < w[1]));
        numbers.extend(assigned);
    }
    tracing::info!("{} events reported in {:?}", CLIENTS * EVENTS_PER_CLIENT, start.elapsed());

    assert_eq!(numbers.len(), CLIENTS * EVENTS_PER_CLIENT);
    assert_eq!(eventlog.records("Application").len(), CLIENTS * EVENTS_PER_CLIENT);
    assert_eq!(eventlog.open_handles(), 0);
    assert_eq!(server.stats().connections_accepted, CLIENTS as u64);
    assert_eq!(server.stats().requests_failed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_readers_see_every_record() {
    const READERS: usize = 8;

    let (server, _eventlog) = start_server(ServerConfig::default()).await;
    let writer = connect(&server).await;
    let source = writer.register_source("writer").await.unwrap();
    for id in 0..100 {
        writer
            .report_event(
                source,
                Event {
                    event_id: id,
                    ..Event::default()
                },
            )
            .await
            .unwrap();
    }

    let readers = (0..READERS).map(|_| {
        let binder = server.binder();
        tokio::spawn(async move {
            let client = msrpc_eventlog::EventlogClient::bind(&binder).await.unwrap();
            let log = client.open("Application").await.unwrap();
            let flags = read_flags::EVENTLOG_SEQUENTIAL_READ | read_flags::EVENTLOG_FORWARDS_READ;
            let mut ids = Vec::new();
            // small buffers force many round trips through the cursor
            while let Ok(buffer) = client.read(log, flags, 0, 512).await {
                ids.extend(Record::decode_all(&buffer).unwrap().into_iter().map(|r| r.event_id));
            }
            client.close(log).await.unwrap();
            ids
        })
    });

    for ids in join_all(readers).await {
        assert_eq!(ids.unwrap(), (0..100).collect::<Vec<u32>>());
    }
}
