// SPDX-License-Identifier: MPL-2.0

//! The session handle and the reactor that drives it.
//!
//! Structurally this mirrors `async-opcua-client/src/session/mod.rs`:
//! a plain data-holding `Session` struct behind `Arc`, constructed as a
//! `(Arc<Session>, SessionEventLoop)` pair so the caller decides how to
//! drive the loop (`run`, `spawn`, or manual `enter()` polling), plus the
//! same `session_warn!`/`session_debug!`/`session_error!`/`session_trace!`
//! log-prefix macro family.

mod completion;
mod connect;
mod event_loop;
mod heartbeat;
mod multiplexer;
mod request;
pub mod services;
mod state;

pub use completion::Completion;
pub use connect::{SessionConnectMode, SessionConnector};
pub use event_loop::{SessionEventLoop, SessionPollResult};
pub use heartbeat::Heartbeat;
pub use multiplexer::Multiplexer;
pub use request::CoordRequest;
pub use state::SessionState;

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::config::ClientConfig;
use crate::error::ErrorCode;
use crate::retry::SessionRetryPolicy;
use crate::sync::Mutex;
use crate::transport::OutgoingMessage;
use crate::watch::{WatchEvent, WatchRegistry};
use crate::wire::{
    BinaryRecordCodec, EventType, RecordCodec, SessionStateCode, SetWatchesRequest, WatcherEvent,
};
use crate::xid::{AUTH_XID, PING_XID, SET_WATCHES_XID, WATCHER_EVENT_XID};

macro_rules! session_warn {
    ($session: expr, $($arg:tt)*) =>  {
        log::warn!("session:{} {}", $session.internal_session_id(), format!($($arg)*));
    }
}
pub(crate) use session_warn;

macro_rules! session_error {
    ($session: expr, $($arg:tt)*) =>  {
        log::error!("session:{} {}", $session.internal_session_id(), format!($($arg)*));
    }
}
pub(crate) use session_error;

macro_rules! session_debug {
    ($session: expr, $($arg:tt)*) =>  {
        log::debug!("session:{} {}", $session.internal_session_id(), format!($($arg)*));
    }
}
pub(crate) use session_debug;

#[allow(unused)]
macro_rules! session_trace {
    ($session: expr, $($arg:tt)*) =>  {
        log::trace!("session:{} {}", $session.internal_session_id(), format!($($arg)*));
    }
}
#[allow(unused)]
pub(crate) use session_trace;

static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

/// The session handle. Cheap to clone via `Arc`; every public operation
/// takes `&self` and is safe to call concurrently from many tasks.
pub struct Session {
    pub(crate) config: ClientConfig,
    state_tx: watch::Sender<SessionState>,
    state_rx: watch::Receiver<SessionState>,
    pub(crate) mux: Mutex<Multiplexer>,
    watches: WatchRegistry,
    pending_auth: Mutex<Option<Completion>>,
    outgoing_tx: Mutex<Option<mpsc::Sender<OutgoingMessage>>>,
    session_id: AtomicI64,
    password: Mutex<Vec<u8>>,
    negotiated_timeout_millis: AtomicU64,
    last_zxid: AtomicI64,
    endpoint_index: AtomicUsize,
    internal_session_id: u32,
    should_reconnect: AtomicBool,
    ping_in_flight: AtomicBool,
    default_watcher: Box<dyn Fn(WatchEvent) + Send + Sync>,
}

impl Session {
    /// Construct a new session and its event loop. The event loop must be
    /// driven (`run`, `spawn`, or manual `enter()`) for anything to happen.
    pub fn new(
        config: ClientConfig,
        default_watcher: impl Fn(WatchEvent) + Send + Sync + 'static,
    ) -> (Arc<Self>, SessionEventLoop) {
        let (state_tx, state_rx) = watch::channel(SessionState::Closed);
        let retry = config.session_retry_policy();
        let initial_timeout_millis = config.session_timeout.as_millis() as u64;
        let session = Arc::new(Session {
            config,
            state_tx,
            state_rx,
            mux: Mutex::new(Multiplexer::new()),
            watches: WatchRegistry::new(),
            pending_auth: Mutex::new(None),
            outgoing_tx: Mutex::new(None),
            session_id: AtomicI64::new(0),
            password: Mutex::new(Vec::new()),
            negotiated_timeout_millis: AtomicU64::new(initial_timeout_millis),
            last_zxid: AtomicI64::new(0),
            endpoint_index: AtomicUsize::new(0),
            internal_session_id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            should_reconnect: AtomicBool::new(true),
            ping_in_flight: AtomicBool::new(false),
            default_watcher: Box::new(default_watcher),
        });
        let event_loop = SessionEventLoop::new(session.clone(), retry);
        (session, event_loop)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every state transition, for callers who
    /// want to `wait_for` a particular state without a watcher callback.
    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// The server-assigned 64-bit session id. Zero before the first
    /// successful handshake.
    pub fn session_id(&self) -> i64 {
        self.session_id.load(Ordering::Acquire)
    }

    /// Process-unique id distinguishing this `Session` in log lines,
    /// independent of the server-assigned session id.
    pub fn internal_session_id(&self) -> u32 {
        self.internal_session_id
    }

    /// Last zxid observed from any reply header.
    pub fn last_zxid(&self) -> i64 {
        self.last_zxid.load(Ordering::Acquire)
    }

    pub(crate) fn password(&self) -> Vec<u8> {
        self.password.lock().clone()
    }

    /// The session timeout currently in effect: the server's last negotiated
    /// value, or the configured request value before the first handshake.
    pub(crate) fn negotiated_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiated_timeout_millis.load(Ordering::Acquire))
    }

    pub(crate) fn next_ensemble_address(&self) -> String {
        let idx = self.endpoint_index.fetch_add(1, Ordering::Relaxed) % self.config.ensemble.len();
        self.config.ensemble[idx].clone()
    }

    pub(crate) fn install_outgoing(&self, tx: mpsc::Sender<OutgoingMessage>) {
        *self.outgoing_tx.lock() = Some(tx);
    }

    pub(crate) fn clear_outgoing(&self) {
        *self.outgoing_tx.lock() = None;
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let _ = self.state_tx.send(state);
        if matches!(
            state,
            SessionState::Connected | SessionState::ExpiredSession | SessionState::AuthFailed
        ) {
            let wire_state = match state {
                SessionState::Connected => SessionStateCode::Connected,
                SessionState::ExpiredSession => SessionStateCode::ExpiredSession,
                SessionState::AuthFailed => SessionStateCode::AuthFailed,
                _ => unreachable!(),
            };
            self.deliver_watch_event(WatchEvent {
                kind: None,
                event_type: EventType::Session,
                state: wire_state,
                path: String::new(),
            });
        }
    }

    pub(crate) fn on_handshake_complete(&self, session_id: i64, password: Vec<u8>, timeout: Duration) {
        self.session_id.store(session_id, Ordering::Release);
        *self.password.lock() = password;
        self.negotiated_timeout_millis
            .store(timeout.as_millis() as u64, Ordering::Release);
        self.set_state(SessionState::Connected);
    }

    pub(crate) fn pending_request_frames(&self) -> Vec<Vec<u8>> {
        self.mux.lock().pending_frames()
    }

    pub(crate) async fn send_set_watches(&self, tx: &mpsc::Sender<OutgoingMessage>) {
        let (data, exist, child) = self.watches.snapshot();
        if data.is_empty() && exist.is_empty() && child.is_empty() {
            return;
        }
        let request = SetWatchesRequest {
            relative_zxid: self.last_zxid(),
            data_watches: data,
            exist_watches: exist,
            child_watches: child,
        };
        let Ok(body) = <BinaryRecordCodec as RecordCodec<SetWatchesRequest>>::encode(&request)
        else {
            return;
        };
        let mut frame = Vec::new();
        let header = crate::wire::RequestHeader {
            xid: SET_WATCHES_XID,
            op: crate::wire::OpCode::SetWatches,
        };
        if header.encode(&mut frame).is_ok() {
            frame.extend_from_slice(&body);
            let _ = tx.send(OutgoingMessage { bytes: frame }).await;
        }
    }

    pub(crate) async fn send_pending_auth(&self, tx: &mpsc::Sender<OutgoingMessage>) {
        let Some((scheme, credential)) = self.config.default_auth.clone() else {
            return;
        };
        let request = crate::wire::AuthRequest { scheme, credential };
        let Ok(body) = <BinaryRecordCodec as RecordCodec<crate::wire::AuthRequest>>::encode(&request)
        else {
            return;
        };
        let mut frame = Vec::new();
        let header = crate::wire::RequestHeader {
            xid: AUTH_XID,
            op: crate::wire::OpCode::AddAuth,
        };
        if header.encode(&mut frame).is_ok() {
            frame.extend_from_slice(&body);
            let _ = tx.send(OutgoingMessage { bytes: frame }).await;
        }
    }

    pub(crate) fn install_watch(&self, kind: crate::watch::WatchKind, path: &str) {
        self.watches.install(kind, path);
    }

    fn deliver_watch_event(&self, event: WatchEvent) {
        (self.default_watcher)(event);
    }

    /// Send a ping if the negotiated timeout's send-idle threshold has
    /// elapsed. At most one ping is ever in flight.
    pub(crate) async fn maybe_send_ping(&self) {
        if self.ping_in_flight.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut frame = Vec::new();
        let header = crate::wire::RequestHeader {
            xid: PING_XID,
            op: crate::wire::OpCode::Ping,
        };
        if header.encode(&mut frame).is_err() {
            self.ping_in_flight.store(false, Ordering::Release);
            return;
        }
        {
            let mut mux = self.mux.lock();
            mux.register(
                PING_XID,
                crate::wire::OpCode::Ping,
                Completion::Callback(Box::new(|_| {})),
                frame.clone(),
            );
        }
        self.dispatch_or_queue(frame).await;
    }

    fn clear_ping_in_flight(&self) {
        self.ping_in_flight.store(false, Ordering::Release);
    }

    /// Process one complete, length-prefix-stripped incoming frame.
    pub(crate) fn handle_incoming_frame(&self, bytes: &[u8]) -> Result<(), ErrorCode> {
        let mut cursor = std::io::Cursor::new(bytes);
        let header = crate::wire::ReplyHeader::decode(&mut cursor)?;
        if header.zxid > 0 {
            self.update_zxid(header.zxid);
        }
        let body = &bytes[cursor.position() as usize..];

        match header.xid {
            WATCHER_EVENT_XID => {
                let event: WatcherEvent = <BinaryRecordCodec as RecordCodec<WatcherEvent>>::decode(body)?;
                for fired in self.watches.dispatch(&event) {
                    self.deliver_watch_event(fired);
                }
                Ok(())
            }
            SET_WATCHES_XID => Ok(()),
            AUTH_XID => {
                let completion = self.pending_auth.lock().take();
                let status = header.status();
                if let Some(completion) = completion {
                    if status == ErrorCode::Ok {
                        completion.complete(Ok(Vec::new()));
                    } else {
                        completion.complete(Err(status));
                    }
                }
                if status != ErrorCode::Ok {
                    session_warn!(self, "authentication failed: {status}");
                    self.set_state(SessionState::AuthFailed);
                }
                Ok(())
            }
            xid => {
                let (_op, completion) = self.mux.lock().take(xid)?;
                if xid == PING_XID {
                    self.clear_ping_in_flight();
                    completion.complete(Ok(Vec::new()));
                    return Ok(());
                }
                let status = header.status();
                if status == ErrorCode::Ok {
                    completion.complete(Ok(body.to_vec()));
                } else {
                    completion.complete(Err(status));
                }
                Ok(())
            }
        }
    }

    fn update_zxid(&self, zxid: i64) {
        self.last_zxid.fetch_max(zxid, Ordering::AcqRel);
    }

    /// Close the session: stop reconnecting and fail every pending
    /// completion with [`ErrorCode::Closing`].
    pub async fn close(&self) {
        self.should_reconnect.store(false, Ordering::Release);
        self.clear_outgoing();
        self.mux.lock().fail_all(ErrorCode::Closing);
        self.set_state(SessionState::Closed);
    }

    pub(crate) fn should_reconnect(&self) -> bool {
        self.should_reconnect.load(Ordering::Acquire)
    }

    pub(crate) fn fail_pending(&self, error: ErrorCode) {
        self.mux.lock().fail_all(error);
    }

    /// Send a credential with the reserved `AUTH_XID`, awaiting the server's
    /// accept/reject rather than going through the normal FIFO queue.
    pub(crate) async fn submit_auth(&self, scheme: String, credential: Vec<u8>) -> Result<(), ErrorCode> {
        if self.state().is_terminal() {
            return Err(ErrorCode::InvalidState);
        }
        let request = crate::wire::AuthRequest { scheme, credential };
        let body = <BinaryRecordCodec as RecordCodec<crate::wire::AuthRequest>>::encode(&request)?;
        let mut frame = Vec::new();
        let header = crate::wire::RequestHeader {
            xid: AUTH_XID,
            op: crate::wire::OpCode::AddAuth,
        };
        header.encode(&mut frame)?;
        frame.extend_from_slice(&body);

        let (tx, rx) = tokio::sync::oneshot::channel();
        *self.pending_auth.lock() = Some(Completion::Oneshot(tx));
        self.dispatch_or_queue(frame).await;
        rx.await.map_err(|_| ErrorCode::Closing)?.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientBuilder;

    fn test_config() -> ClientConfig {
        ClientBuilder::new()
            .ensemble(["127.0.0.1:2181"])
            .build()
            .unwrap()
    }

    #[test]
    fn session_id_is_zero_before_handshake() {
        let (session, _event_loop) = Session::new(test_config(), |_| {});
        assert_eq!(session.session_id(), 0);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn close_fails_pending_with_closing() {
        let (session, _event_loop) = Session::new(test_config(), |_| {});
        let session2 = session.clone();
        let handle = tokio::spawn(async move {
            session2
                .submit_and_await(crate::wire::OpCode::Sync, Vec::new())
                .await
        });
        // Give the spawned task a chance to register before closing.
        tokio::task::yield_now().await;
        session.close().await;
        let result = handle.await.unwrap();
        assert_eq!(result.unwrap_err(), ErrorCode::Closing);
    }

    #[test]
    fn internal_session_ids_are_distinct() {
        let (a, _) = Session::new(test_config(), |_| {});
        let (b, _) = Session::new(test_config(), |_| {});
        assert_ne!(a.internal_session_id(), b.internal_session_id());
    }
}
