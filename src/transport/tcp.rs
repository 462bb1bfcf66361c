// SPDX-License-Identifier: MPL-2.0

//! Real TCP transport: dials an ensemble member and pumps length-prefixed
//! frames in both directions.
//!
//! Grounded on `opcua-client/src/transport/tcp.rs`'s `TcpConnector`/
//! `TcpTransport` pair: split the socket into a `FramedRead` half and a raw
//! write half, connect with a timeout, and let the event loop drive
//! `poll()` in a `select!` alongside its other wakeups. The HELLO/ACK
//! transport-level prelude that OPC UA performs here has no counterpart in
//! this protocol, since the equivalent prime/handshake exchange happens one
//! layer up, at the session level, over the plain length-prefixed frames
//! this transport already provides.

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::error::{ErrorCode, Result};
use crate::transport::codec::FrameCodec;
use crate::transport::{Connector, OutgoingMessage, Transport, TransportConfig, TransportPollResult};

use futures::StreamExt;

/// Dials an ensemble member over plain TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(
        &self,
        addr: &str,
        outgoing_recv: mpsc::Receiver<OutgoingMessage>,
        config: TransportConfig,
    ) -> Result<TcpTransport> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ErrorCode::OperationTimeout)?
            .map_err(|_| ErrorCode::ConnectionLoss)?;
        stream.set_nodelay(true).ok();
        let (read_half, write_half) = tokio::io::split(stream);
        let read = FramedRead::new(read_half, FrameCodec::new(config.max_frame_len));
        Ok(TcpTransport {
            read,
            write: write_half,
            outgoing_recv,
            max_frame_len: config.max_frame_len,
        })
    }
}

/// A live TCP connection to one ensemble member.
pub struct TcpTransport {
    read: FramedRead<ReadHalf<TcpStream>, FrameCodec>,
    write: WriteHalf<TcpStream>,
    outgoing_recv: mpsc::Receiver<OutgoingMessage>,
    max_frame_len: usize,
}

#[async_trait]
impl Transport for TcpTransport {
    async fn poll(&mut self) -> TransportPollResult {
        loop {
            tokio::select! {
                biased;

                incoming = self.read.next() => {
                    return match incoming {
                        Some(Ok(frame)) => TransportPollResult::Incoming(frame),
                        Some(Err(e)) => TransportPollResult::Disconnected(e),
                        None => TransportPollResult::Disconnected(ErrorCode::ConnectionLoss),
                    };
                }

                outgoing = self.outgoing_recv.recv() => {
                    match outgoing {
                        Some(msg) => {
                            if msg.bytes.len() > self.max_frame_len {
                                return TransportPollResult::Disconnected(ErrorCode::MarshallingError);
                            }
                            let mut framed = Vec::with_capacity(4 + msg.bytes.len());
                            framed.extend_from_slice(&(msg.bytes.len() as u32).to_be_bytes());
                            framed.extend_from_slice(&msg.bytes);
                            if self.write.write_all(&framed).await.is_err() {
                                return TransportPollResult::Disconnected(ErrorCode::ConnectionLoss);
                            }
                            // A write alone is not an event the event loop needs to
                            // see; loop back around and keep waiting.
                        }
                        None => return TransportPollResult::Disconnected(ErrorCode::Closing),
                    }
                }
            }
        }
    }
}
