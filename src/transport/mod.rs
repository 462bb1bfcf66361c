// SPDX-License-Identifier: MPL-2.0

//! Pluggable transport seam: a [`Connector`] establishes a connection to one
//! ensemble member, returning a [`Transport`] the event loop polls for
//! incoming frames and feeds outgoing frames through an `mpsc` channel.
//!
//! Grounded on `async-opcua-client/src/transport/{mod,connect}.rs`: the same
//! two-trait split (a `Connector` that does the one-shot connection setup,
//! a `Transport` that is polled in a loop) lets `tcp` and `mock` provide
//! interchangeable implementations without the session or event loop
//! depending on either directly.

pub mod codec;
pub mod mock;
pub mod tcp;

use async_trait::async_trait;

use crate::error::{ErrorCode, Result};

/// One fully-encoded outgoing frame body (header + request body), handed to
/// the transport for length-prefixing and writing.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// The frame body, not yet length-prefixed.
    pub bytes: Vec<u8>,
}

/// Outcome of one [`Transport::poll`] call.
#[derive(Debug)]
pub enum TransportPollResult {
    /// A complete frame body arrived (length prefix already stripped).
    Incoming(Vec<u8>),
    /// The transport can make no further progress; the session must
    /// reconnect to continue.
    Disconnected(ErrorCode),
}

/// Connection parameters a [`Connector`] needs in order to dial an ensemble
/// member and prepare a usable [`Transport`].
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// Time allowed for the TCP connect itself.
    pub connect_timeout: std::time::Duration,
    /// Largest frame body the transport will accept before treating the
    /// connection as corrupt.
    pub max_frame_len: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: std::time::Duration::from_secs(5),
            max_frame_len: 4 * 1024 * 1024,
        }
    }
}

/// Establishes a connection to one ensemble member.
///
/// Implementations should not retry internally; retry/backoff across
/// ensemble members is the event loop's job (see [`crate::retry`]).
#[async_trait]
pub trait Connector: Send + Sync {
    /// The concrete [`Transport`] this connector produces.
    type Transport: Transport;

    /// Dial `addr`, returning a transport that will forward writes from
    /// `outgoing_recv` and yield reads through [`Transport::poll`].
    async fn connect(
        &self,
        addr: &str,
        outgoing_recv: tokio::sync::mpsc::Receiver<OutgoingMessage>,
        config: TransportConfig,
    ) -> Result<Self::Transport>;
}

/// A live connection to one ensemble member.
///
/// `poll` must be cancellation safe: the event loop selects over it
/// alongside timers and other channels, and a cancelled poll must not lose
/// buffered state.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Wait for the next event: an incoming frame, or terminal disconnection.
    async fn poll(&mut self) -> TransportPollResult;
}
