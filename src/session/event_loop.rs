// SPDX-License-Identifier: MPL-2.0

//! The reactor that actually drives a [`Session`]: connects, reconnects on
//! failure with backoff, polls the active transport for incoming frames,
//! and sends pings on the heartbeat schedule.
//!
//! Grounded on `async-opcua-client/src/session/event_loop.rs`'s
//! `SessionEventLoop`, built on `futures::stream::try_unfold` over a small
//! state enum (`Connecting`/`Connected`/`Disconnected`). The fold state here
//! plays the same role as that file's `SessionEventLoopState`.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, Stream, TryStreamExt};
use tokio::time::sleep;

use crate::error::ErrorCode;
use crate::retry::{ExponentialBackoff, SessionRetryPolicy};
use crate::transport::{Connector, Transport, TransportPollResult};

use super::connect::SessionConnector;
use super::heartbeat::Heartbeat;
use super::state::SessionState;
use super::{session_debug, session_warn, Session};

/// One iteration's worth of progress, surfaced to callers driving the loop
/// manually (`enter`) rather than through `run`/`spawn`.
#[derive(Debug)]
pub enum SessionPollResult {
    /// The session is attempting to (re)connect.
    Connecting,
    /// A connection is established and idling or exchanging frames.
    Connected,
    /// The session reached a terminal state; the loop will not continue.
    Terminal(SessionState),
}

enum LoopState<C: Connector> {
    Disconnected {
        backoff: ExponentialBackoff,
    },
    Connecting {
        backoff: ExponentialBackoff,
    },
    Connected {
        transport: C::Transport,
        heartbeat: Heartbeat,
    },
}

/// Drives a [`Session`]'s connection lifecycle. Must be polled (via `run`,
/// `spawn`, or manual iteration) for anything to happen; dropping it without
/// driving it leaves the session permanently in [`SessionState::Closed`].
pub struct SessionEventLoop {
    session: Arc<Session>,
    retry: SessionRetryPolicy,
}

impl SessionEventLoop {
    pub(super) fn new(session: Arc<Session>, retry: SessionRetryPolicy) -> Self {
        Self { session, retry }
    }

    /// Drive the loop to completion: runs until the session reaches a
    /// terminal state or `close()` is called.
    pub async fn run<C: Connector + Clone>(self, connector: C) -> SessionState {
        let session = self.session.clone();
        let stream = self.into_stream(connector);
        tokio::pin!(stream);
        loop {
            match stream.try_next().await {
                Ok(Some(SessionPollResult::Terminal(state))) => return state,
                Ok(Some(_)) => continue,
                Ok(None) => return session.state(),
                Err(_) => return session.state(),
            }
        }
    }

    /// Spawn [`SessionEventLoop::run`] on the current tokio runtime.
    pub fn spawn<C: Connector + Clone + 'static>(self, connector: C) -> tokio::task::JoinHandle<SessionState> {
        tokio::spawn(self.run(connector))
    }

    fn into_stream<C: Connector + Clone>(
        self,
        connector: C,
    ) -> impl Stream<Item = Result<SessionPollResult, ErrorCode>> {
        let session = self.session;
        let retry = self.retry;
        let state = LoopState::Disconnected {
            backoff: retry.new_backoff(),
        };
        stream::try_unfold((session, connector, retry, state), move |(session, connector, retry, state)| async move {
            if !session.should_reconnect() {
                return Ok(None);
            }
            if session.state().is_terminal() {
                return Ok(Some((
                    SessionPollResult::Terminal(session.state()),
                    (session.clone(), connector, retry, LoopState::Disconnected { backoff: retry.new_backoff() }),
                )));
            }

            match state {
                LoopState::Disconnected { backoff } => {
                    session.set_state(SessionState::Connecting);
                    Ok(Some((
                        SessionPollResult::Connecting,
                        (session, connector, retry, LoopState::Connecting { backoff }),
                    )))
                }
                LoopState::Connecting { mut backoff } => {
                    let session_connector = SessionConnector::new(session.clone(), connector.clone());
                    match session_connector.try_connect().await {
                        Ok((transport, _mode)) => {
                            session_debug!(session, "connected");
                            let heartbeat = Heartbeat::new(session.negotiated_timeout(), Instant::now());
                            Ok(Some((
                                SessionPollResult::Connected,
                                (session, connector, retry, LoopState::Connected { transport, heartbeat }),
                            )))
                        }
                        Err(ErrorCode::SessionExpired) => {
                            session_warn!(session, "session expired on resume attempt");
                            session.fail_pending(ErrorCode::SessionExpired);
                            session.set_state(SessionState::ExpiredSession);
                            Ok(Some((
                                SessionPollResult::Terminal(SessionState::ExpiredSession),
                                (session.clone(), connector, retry, LoopState::Disconnected { backoff }),
                            )))
                        }
                        Err(e) => {
                            session_warn!(session, "connect attempt failed: {e}");
                            match backoff.next() {
                                Some(delay) => {
                                    sleep(delay).await;
                                    Ok(Some((
                                        SessionPollResult::Connecting,
                                        (session, connector, retry, LoopState::Connecting { backoff }),
                                    )))
                                }
                                None => {
                                    session.fail_pending(ErrorCode::ConnectionLoss);
                                    session.set_state(SessionState::ExpiredSession);
                                    Ok(Some((
                                        SessionPollResult::Terminal(SessionState::ExpiredSession),
                                        (session.clone(), connector, retry, LoopState::Disconnected { backoff }),
                                    )))
                                }
                            }
                        }
                    }
                }
                LoopState::Connected { mut transport, mut heartbeat } => {
                    tokio::select! {
                        biased;

                        result = transport.poll() => {
                            match result {
                                TransportPollResult::Incoming(bytes) => {
                                    heartbeat.record_recv(Instant::now());
                                    if let Err(e) = session.handle_incoming_frame(&bytes) {
                                        // Requests still awaiting a reply are left in the
                                        // multiplexer: they are replayed, not failed, once
                                        // SessionConnector re-establishes a connection.
                                        session_warn!(session, "dropping connection: {e}");
                                        session.clear_outgoing();
                                        session.set_state(SessionState::Connecting);
                                        Ok(Some((
                                            SessionPollResult::Connecting,
                                            (session, connector, retry, LoopState::Connecting { backoff: retry.new_backoff() }),
                                        )))
                                    } else {
                                        Ok(Some((
                                            SessionPollResult::Connected,
                                            (session, connector, retry, LoopState::Connected { transport, heartbeat }),
                                        )))
                                    }
                                }
                                TransportPollResult::Disconnected(e) => {
                                    // Same as above: pending requests stay queued for replay.
                                    session_warn!(session, "disconnected: {e}");
                                    session.clear_outgoing();
                                    session.set_state(SessionState::Connecting);
                                    Ok(Some((
                                        SessionPollResult::Connecting,
                                        (session, connector, retry, LoopState::Connecting { backoff: retry.new_backoff() }),
                                    )))
                                }
                            }
                        }

                        _ = sleep(time_until(heartbeat.next_ping_due())) => {
                            if heartbeat.is_expired(Instant::now()) {
                                session_warn!(session, "read timeout, reconnecting");
                                session.clear_outgoing();
                                session.set_state(SessionState::Connecting);
                                Ok(Some((
                                    SessionPollResult::Connecting,
                                    (session, connector, retry, LoopState::Connecting { backoff: retry.new_backoff() }),
                                )))
                            } else {
                                heartbeat.record_send(Instant::now());
                                session.maybe_send_ping().await;
                                Ok(Some((
                                    SessionPollResult::Connected,
                                    (session, connector, retry, LoopState::Connected { transport, heartbeat }),
                                )))
                            }
                        }
                    }
                }
            }
        })
    }
}

fn time_until(deadline: Instant) -> std::time::Duration {
    deadline.saturating_duration_since(Instant::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientBuilder;
    use crate::transport::mock::MockConnector;
    use crate::wire::PrimeResponse;

    fn test_config() -> crate::config::ClientConfig {
        ClientBuilder::new()
            .ensemble(["127.0.0.1:2181"])
            .session_retry_limit(0)
            .session_timeout(std::time::Duration::from_millis(300))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn connects_and_reaches_connected_state() {
        let (session, event_loop) = Session::new(test_config(), |_| {});
        let connector = MockConnector::new();
        let mut server = connector.register("127.0.0.1:2181");

        let handle = event_loop.spawn(connector);

        let prime_req_bytes = server.recv().await.expect("prime request");
        let _ = prime_req_bytes;
        let reply = PrimeResponse {
            protocol_version: 0,
            timeout_ms: 9_000,
            session_id: 42,
            password: vec![1; 16],
        }
        .encode()
        .unwrap();
        server.send(reply).await;

        let mut state_rx = session.state_receiver();
        while *state_rx.borrow() != SessionState::Connected {
            state_rx.changed().await.unwrap();
        }
        assert_eq!(session.session_id(), 42);

        session.close().await;
        let _ = handle.await;
    }
}
