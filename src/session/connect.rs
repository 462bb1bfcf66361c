// SPDX-License-Identifier: MPL-2.0

//! Connection establishment: picks the next ensemble member, dials it,
//! performs the prime/handshake exchange, and decides whether the result is
//! a fresh session, a resumed one, or an expired one.
//!
//! Grounded on `async-opcua-client/src/session/connect.rs`'s
//! `SessionConnector`/`SessionConnectMode` pair: a small struct the event
//! loop owns only while `SessionEventLoopState::Connecting`, whose
//! `try_connect` either returns a live channel or an error the backoff loop
//! consumes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{ErrorCode, Result};
use crate::transport::{Connector, OutgoingMessage, Transport, TransportConfig};
use crate::wire::{PrimeRequest, PrimeResponse};

use super::Session;

/// Outcome of a successful [`SessionConnector::try_connect`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionConnectMode {
    /// No prior session id was held; this is a brand new session.
    New,
    /// A prior session id was held and the server confirmed it.
    Resumed,
}

/// Drives one connect attempt: dial, handshake, classify the result.
pub struct SessionConnector<C: Connector> {
    session: Arc<Session>,
    connector: C,
}

impl<C: Connector> SessionConnector<C> {
    /// Build a connector bound to `session`, dialing through `connector`.
    pub fn new(session: Arc<Session>, connector: C) -> Self {
        Self { session, connector }
    }

    /// Attempt exactly one connect + handshake against the current
    /// round-robin ensemble member. On success, installs the new transport
    /// as the session's active outgoing channel, replays any
    /// still-unacknowledged requests, and returns the classified result.
    pub async fn try_connect(&self) -> Result<(C::Transport, SessionConnectMode)> {
        let addr = self.session.next_ensemble_address();

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<OutgoingMessage>(256);
        let transport_config = TransportConfig {
            connect_timeout: self.session.config.connect_timeout,
            max_frame_len: 4 * 1024 * 1024,
        };
        let mut transport = self
            .connector
            .connect(&addr, outgoing_rx, transport_config)
            .await?;

        let prior_session_id = self.session.session_id();
        let prior_password = self.session.password();
        let request = PrimeRequest {
            protocol_version: 0,
            last_zxid_seen: self.session.last_zxid(),
            timeout_ms: self.session.config.session_timeout.as_millis() as i32,
            session_id: prior_session_id,
            password: prior_password,
        };
        let body = request.encode()?;
        outgoing_tx
            .send(OutgoingMessage { bytes: body })
            .await
            .map_err(|_| ErrorCode::ConnectionLoss)?;

        let reply_bytes = match transport.poll().await {
            crate::transport::TransportPollResult::Incoming(bytes) => bytes,
            crate::transport::TransportPollResult::Disconnected(e) => return Err(e),
        };
        let reply = PrimeResponse::decode(&reply_bytes)?;

        let mode = if prior_session_id != 0 && reply.session_id != prior_session_id {
            return Err(ErrorCode::SessionExpired);
        } else if prior_session_id != 0 {
            SessionConnectMode::Resumed
        } else {
            SessionConnectMode::New
        };

        self.session
            .on_handshake_complete(reply.session_id, reply.password, Duration::from_millis(reply.timeout_ms.max(0) as u64));
        self.session.install_outgoing(outgoing_tx.clone());

        // Post-handshake frames, in order: watch re-arm, then auth.
        self.session.send_set_watches(&outgoing_tx).await;
        self.session.send_pending_auth(&outgoing_tx).await;

        // Replay every request still awaiting a reply from before this
        // connection existed (first connect: empty; reconnect: whatever
        // never got acknowledged).
        for frame in self.session.pending_request_frames() {
            let _ = outgoing_tx.send(OutgoingMessage { bytes: frame }).await;
        }

        Ok((transport, mode))
    }
}
