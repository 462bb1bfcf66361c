// SPDX-License-Identifier: MPL-2.0

//! End-to-end scenarios driven against the in-memory mock transport: no
//! live ensemble is needed to exercise connect/handshake, watch delivery,
//! reconnect/re-arm, keepalive, expiry, and request correlation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use coord_client::transport::mock::{MockConnector, MockServerHandle};
use coord_client::wire::{
    self, BinaryRecordCodec, OpCode, PrimeResponse, RecordCodec, ReplyHeader, RequestHeader,
};
use coord_client::xid::WATCHER_EVENT_XID;
use coord_client::{
    ClientBuilder, ClientConfig, CreateOp, ExistsOp, ErrorCode, Session, SessionState, WatchEvent,
};

const ADDR: &str = "127.0.0.1:2181";

fn config(timeout: Duration) -> ClientConfig {
    ClientBuilder::new()
        .ensemble([ADDR])
        .session_retry_limit(0)
        .session_timeout(timeout)
        .build()
        .unwrap()
}

/// Read the prime request and reply with a fixed session id/password.
async fn handshake(server: &mut MockServerHandle, session_id: i64, timeout_ms: i32) {
    let _prime_req = server.recv().await.expect("prime request");
    let reply = PrimeResponse {
        protocol_version: 0,
        timeout_ms,
        session_id,
        password: vec![7; 16],
    }
    .encode()
    .unwrap();
    server.send(reply).await;
}

/// Decode a client-sent request frame into its header and op-specific body.
fn decode_request(bytes: &[u8]) -> (RequestHeader, Vec<u8>) {
    let mut cursor = std::io::Cursor::new(bytes);
    let header = RequestHeader::decode(&mut cursor).unwrap();
    let body = bytes[cursor.position() as usize..].to_vec();
    (header, body)
}

/// Build a reply frame: `ReplyHeader` followed by an already-encoded body.
fn reply_frame(xid: i32, zxid: i64, status: ErrorCode, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    ReplyHeader {
        xid,
        zxid,
        err: wire::domain_code_from_error_code(status),
    }
    .encode(&mut buf)
    .unwrap();
    buf.extend_from_slice(body);
    buf
}

async fn wait_for_state(session: &Session, target: SessionState) {
    let mut rx = session.state_receiver();
    while *rx.borrow() != target {
        rx.changed().await.unwrap();
    }
}

#[tokio::test]
async fn connect_create_get() {
    let (session, event_loop) = Session::new(config(Duration::from_secs(10)), |_| {});
    let connector = MockConnector::new();
    let mut server = connector.register(ADDR);
    let handle = event_loop.spawn(connector);

    handshake(&mut server, 1, 10_000).await;
    wait_for_state(&session, SessionState::Connected).await;

    let create = tokio::spawn({
        let session = session.clone();
        async move {
            session
                .create(CreateOp::new("/a").data(b"hello".to_vec()))
                .await
        }
    });
    let (header, body) = decode_request(&server.recv().await.unwrap());
    assert_eq!(header.op, OpCode::Create);
    let request = <BinaryRecordCodec as RecordCodec<wire::CreateRequest>>::decode(&body).unwrap();
    assert_eq!(request.path, "/a");
    assert_eq!(request.data, b"hello");
    let response_body =
        <BinaryRecordCodec as RecordCodec<wire::CreateResponse>>::encode(&wire::CreateResponse {
            path: "/a".to_string(),
        })
        .unwrap();
    server
        .send(reply_frame(header.xid, 1, ErrorCode::Ok, &response_body))
        .await;
    assert_eq!(create.await.unwrap().unwrap(), "/a");

    let get = tokio::spawn({
        let session = session.clone();
        async move { session.get_data(coord_client::GetDataOp::new("/a")).await }
    });
    let (header, _body) = decode_request(&server.recv().await.unwrap());
    assert_eq!(header.op, OpCode::GetData);
    let response_body =
        <BinaryRecordCodec as RecordCodec<wire::DataResponse>>::encode(&wire::DataResponse {
            data: b"hello".to_vec(),
            stat: wire::Stat {
                czxid: 1,
                mzxid: 1,
                version: 0,
            },
        })
        .unwrap();
    server
        .send(reply_frame(header.xid, 1, ErrorCode::Ok, &response_body))
        .await;
    let (data, stat) = get.await.unwrap().unwrap();
    assert_eq!(data, b"hello");
    assert_eq!(stat.version, 0);

    session.close().await;
    let _ = handle.await;
}

#[tokio::test]
async fn watch_fires_on_create() {
    let events: Arc<Mutex<Vec<WatchEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let events2 = events.clone();
    let (session, event_loop) =
        Session::new(config(Duration::from_secs(10)), move |e| events2.lock().unwrap().push(e));
    let connector = MockConnector::new();
    let mut server = connector.register(ADDR);
    let handle = event_loop.spawn(connector);

    handshake(&mut server, 1, 10_000).await;
    wait_for_state(&session, SessionState::Connected).await;

    let exists = tokio::spawn({
        let session = session.clone();
        async move { session.exists(ExistsOp::new("/w").watch()).await }
    });
    let (header, _body) = decode_request(&server.recv().await.unwrap());
    assert_eq!(header.op, OpCode::Exists);
    server
        .send(reply_frame(header.xid, 0, ErrorCode::NoNode, &[]))
        .await;
    assert_eq!(exists.await.unwrap().unwrap(), None);

    let watcher_body =
        <BinaryRecordCodec as RecordCodec<wire::WatcherEvent>>::encode(&wire::WatcherEvent {
            event_type: wire::EventType::Created,
            state: wire::SessionStateCode::Connected,
            path: "/w".to_string(),
        })
        .unwrap();
    server
        .send(reply_frame(
            WATCHER_EVENT_XID,
            1,
            ErrorCode::Ok,
            &watcher_body,
        ))
        .await;

    // Give the event loop a tick to process the pushed frame.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let seen = events.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path, "/w");
    assert_eq!(seen[0].event_type, wire::EventType::Created);

    session.close().await;
    let _ = handle.await;
}

#[tokio::test]
async fn reconnect_re_arms_watches() {
    let events: Arc<Mutex<Vec<WatchEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let events2 = events.clone();
    let (session, event_loop) =
        Session::new(config(Duration::from_secs(10)), move |e| events2.lock().unwrap().push(e));
    let connector = MockConnector::new();
    let mut server = connector.register(ADDR);
    let handle = event_loop.spawn(connector.clone());

    handshake(&mut server, 1, 10_000).await;
    wait_for_state(&session, SessionState::Connected).await;

    let watched_paths = ["/p1", "/p2", "/p3"];
    for path in watched_paths {
        let exists = tokio::spawn({
            let session = session.clone();
            let path = path.to_string();
            async move { session.exists(ExistsOp::new(path).watch()).await }
        });
        let (header, _body) = decode_request(&server.recv().await.unwrap());
        assert_eq!(header.op, OpCode::Exists);
        server
            .send(reply_frame(header.xid, 0, ErrorCode::NoNode, &[]))
            .await;
        exists.await.unwrap().unwrap();
    }

    // Simulate the connection dropping, then re-register a fresh link at
    // the same address before the event loop's next connect attempt.
    server.disconnect();
    let mut server2 = connector.register(ADDR);

    handshake(&mut server2, 1, 10_000).await;
    wait_for_state(&session, SessionState::Connected).await;

    let (header, body) = decode_request(&server2.recv().await.unwrap());
    assert_eq!(header.op, OpCode::SetWatches);
    let set_watches =
        <BinaryRecordCodec as RecordCodec<wire::SetWatchesRequest>>::decode(&body).unwrap();
    let mut exist_watches = set_watches.exist_watches.clone();
    exist_watches.sort();
    assert_eq!(exist_watches, vec!["/p1", "/p2", "/p3"]);

    // Fire events for a subset only.
    for path in ["/p1", "/p3"] {
        let watcher_body =
            <BinaryRecordCodec as RecordCodec<wire::WatcherEvent>>::encode(&wire::WatcherEvent {
                event_type: wire::EventType::Created,
                state: wire::SessionStateCode::Connected,
                path: path.to_string(),
            })
            .unwrap();
        server2
            .send(reply_frame(
                WATCHER_EVENT_XID,
                2,
                ErrorCode::Ok,
                &watcher_body,
            ))
            .await;
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut fired: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.event_type == wire::EventType::Created)
        .map(|e| e.path.clone())
        .collect();
    fired.sort();
    assert_eq!(fired, vec!["/p1", "/p3"]);

    session.close().await;
    let _ = handle.await;
}

#[tokio::test]
async fn ping_keepalive_holds_connected() {
    let (session, event_loop) = Session::new(config(Duration::from_millis(300)), |_| {});
    let connector = MockConnector::new();
    let mut server = connector.register(ADDR);
    let handle = event_loop.spawn(connector);

    handshake(&mut server, 1, 300).await;
    wait_for_state(&session, SessionState::Connected).await;

    let echo = tokio::spawn(async move {
        loop {
            match server.recv().await {
                Some(bytes) => {
                    let (header, _body) = decode_request(&bytes);
                    if header.op != OpCode::Ping {
                        break;
                    }
                    server
                        .send(reply_frame(header.xid, 0, ErrorCode::Ok, &[]))
                        .await;
                }
                None => break,
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(session.state(), SessionState::Connected);

    session.close().await;
    let _ = handle.await;
    echo.abort();
}

#[tokio::test]
async fn session_expiry_on_id_mismatch() {
    let (session, event_loop) = Session::new(config(Duration::from_secs(10)), |_| {});
    let connector = MockConnector::new();
    let mut server = connector.register(ADDR);
    let handle = event_loop.spawn(connector.clone());

    handshake(&mut server, 100, 10_000).await;
    wait_for_state(&session, SessionState::Connected).await;

    server.disconnect();
    let mut server2 = connector.register(ADDR);
    let _prime_req = server2.recv().await.expect("prime request");
    let reply = PrimeResponse {
        protocol_version: 0,
        timeout_ms: 10_000,
        session_id: 999,
        password: vec![1; 16],
    }
    .encode()
    .unwrap();
    server2.send(reply).await;

    let final_state = handle.await.unwrap();
    assert_eq!(final_state, SessionState::ExpiredSession);
    assert_eq!(session.state(), SessionState::ExpiredSession);
}

#[tokio::test]
async fn fifo_order_holds_under_concurrent_creates() {
    let (session, event_loop) = Session::new(config(Duration::from_secs(10)), |_| {});
    let connector = MockConnector::new();
    let mut server = connector.register(ADDR);
    let handle = event_loop.spawn(connector);

    handshake(&mut server, 1, 10_000).await;
    wait_for_state(&session, SessionState::Connected).await;

    const N: usize = 20;
    let mut tasks = Vec::new();
    for i in 0..N {
        let session = session.clone();
        tasks.push(tokio::spawn(async move {
            let path = format!("/n{i}");
            session.create(CreateOp::new(path)).await.unwrap()
        }));
    }

    let received_order = Arc::new(AtomicUsize::new(0));
    let mut expected_paths = Vec::new();
    for _ in 0..N {
        let (header, body) = decode_request(&server.recv().await.unwrap());
        assert_eq!(header.op, OpCode::Create);
        let request = <BinaryRecordCodec as RecordCodec<wire::CreateRequest>>::decode(&body).unwrap();
        expected_paths.push(request.path.clone());
        let response_body = <BinaryRecordCodec as RecordCodec<wire::CreateResponse>>::encode(
            &wire::CreateResponse {
                path: request.path,
            },
        )
        .unwrap();
        received_order.fetch_add(1, Ordering::SeqCst);
        server
            .send(reply_frame(header.xid, received_order.load(Ordering::SeqCst) as i64, ErrorCode::Ok, &response_body))
            .await;
    }

    // Requests must have reached the server in the exact order they were issued.
    assert_eq!(expected_paths, (0..N).map(|i| format!("/n{i}")).collect::<Vec<_>>());

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), format!("/n{i}"));
    }

    session.close().await;
    let _ = handle.await;
}
