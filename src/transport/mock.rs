// SPDX-License-Identifier: MPL-2.0

//! In-memory transport for tests: an `mpsc`-channel stand-in for a socket,
//! paired with a handle the test harness uses to play the server side.
//!
//! No single file in `async-opcua-client` has an in-memory transport of its
//! own; this is grounded instead on the `Connector`/`Transport` trait seam
//! those traits define, the same way a hand-rolled fake would plug into
//! that crate's transport layer for a test.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ErrorCode, Result};
use crate::transport::{Connector, OutgoingMessage, Transport, TransportConfig, TransportPollResult};

/// Connects every dial to whichever [`MockLink`] the test registered for
/// the requested address; dialing an unregistered address fails as
/// `ConnectionLoss` to exercise endpoint-rotation logic.
#[derive(Clone, Default)]
pub struct MockConnector {
    links: std::sync::Arc<crate::sync::Mutex<std::collections::HashMap<String, MockLink>>>,
}

impl MockConnector {
    /// Create a connector with no registered links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a server-side link for `addr`. Returns the harness-side
    /// [`MockServerHandle`] used to read what the client sent and inject
    /// frames as if the server sent them.
    pub fn register(&self, addr: impl Into<String>) -> MockServerHandle {
        let (to_client_tx, to_client_rx) = mpsc::channel(64);
        let (from_client_tx, from_client_rx) = mpsc::channel(64);
        let link = MockLink {
            to_client_rx: std::sync::Arc::new(crate::sync::Mutex::new(Some(to_client_rx))),
            from_client_tx,
        };
        self.links.lock().insert(addr.into(), link);
        MockServerHandle {
            to_client_tx,
            from_client_rx,
        }
    }
}

#[derive(Clone)]
struct MockLink {
    to_client_rx: std::sync::Arc<crate::sync::Mutex<Option<mpsc::Receiver<Vec<u8>>>>>,
    from_client_tx: mpsc::Sender<Vec<u8>>,
}

/// Harness-side handle for a registered [`MockLink`].
pub struct MockServerHandle {
    to_client_tx: mpsc::Sender<Vec<u8>>,
    from_client_rx: mpsc::Receiver<Vec<u8>>,
}

impl MockServerHandle {
    /// Inject a frame as if the server sent it.
    pub async fn send(&self, frame: Vec<u8>) {
        let _ = self.to_client_tx.send(frame).await;
    }

    /// Wait for the next frame the client sent.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_client_rx.recv().await
    }

    /// Drop the server's sending half, simulating the server closing the connection.
    pub fn disconnect(self) {
        drop(self);
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(
        &self,
        addr: &str,
        outgoing_recv: mpsc::Receiver<OutgoingMessage>,
        _config: TransportConfig,
    ) -> Result<MockTransport> {
        let link = self
            .links
            .lock()
            .get(addr)
            .cloned()
            .ok_or(ErrorCode::ConnectionLoss)?;
        let to_client_rx = link
            .to_client_rx
            .lock()
            .take()
            .ok_or(ErrorCode::ConnectionLoss)?;
        Ok(MockTransport {
            to_client_rx,
            from_client_tx: link.from_client_tx,
            outgoing_recv,
        })
    }
}

/// The client-side half of a [`MockLink`].
pub struct MockTransport {
    to_client_rx: mpsc::Receiver<Vec<u8>>,
    from_client_tx: mpsc::Sender<Vec<u8>>,
    outgoing_recv: mpsc::Receiver<OutgoingMessage>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn poll(&mut self) -> TransportPollResult {
        loop {
            tokio::select! {
                biased;

                incoming = self.to_client_rx.recv() => {
                    return match incoming {
                        Some(frame) => TransportPollResult::Incoming(frame),
                        None => TransportPollResult::Disconnected(ErrorCode::ConnectionLoss),
                    };
                }

                outgoing = self.outgoing_recv.recv() => {
                    match outgoing {
                        Some(msg) => {
                            if self.from_client_tx.send(msg.bytes).await.is_err() {
                                return TransportPollResult::Disconnected(ErrorCode::ConnectionLoss);
                            }
                        }
                        None => return TransportPollResult::Disconnected(ErrorCode::Closing),
                    }
                }
            }
        }
    }
}
