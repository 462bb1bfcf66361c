// SPDX-License-Identifier: MPL-2.0

//! The `CoordRequest` trait and the low-level submit path every service
//! operation goes through.
//!
//! `CoordRequest` mirrors `opcua-client/src/session/request_builder.rs`'s
//! `UARequest` trait: a non-`dyn` trait returning `impl Future` rather than
//! going through `async-trait`, since every caller knows the concrete type
//! at the call site (`Session::create` builds a `CreateRequest` and calls
//! `.send(self)` on it directly).

use std::future::Future;

use crate::error::{ErrorCode, Result};
use crate::session::completion::Completion;
use crate::session::Session;
use crate::wire::{OpCode, RequestHeader};

/// A fully-formed, ready-to-send request. Implementors encode their
/// op-specific body, submit it through the owning session, and decode the
/// raw reply bytes back into `Self::Out`.
pub trait CoordRequest {
    /// Decoded reply type.
    type Out;

    /// Send this request over `session` and await its reply.
    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a;
}

impl Session {
    /// Encode `op_body` behind a freshly-allocated XID, register a
    /// completion, and hand the frame to the transport (or queue it if not
    /// currently connected). Returns once the reply arrives, is cancelled
    /// by `close()`, or the session transitions to a terminal state.
    pub(crate) async fn submit_and_await(&self, op: OpCode, op_body: Vec<u8>) -> Result<Vec<u8>> {
        if self.state().is_terminal() {
            return Err(ErrorCode::InvalidState);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        let frame = {
            let mut mux = self.mux.lock();
            let xid = mux.next_xid();
            let mut frame = Vec::with_capacity(8 + op_body.len());
            RequestHeader { xid, op }
                .encode(&mut frame)
                .map_err(|_| ErrorCode::MarshallingError)?;
            frame.extend_from_slice(&op_body);
            mux.register(xid, op, Completion::Oneshot(tx), frame.clone());
            frame
        };
        self.dispatch_or_queue(frame).await;

        rx.await.map_err(|_| ErrorCode::Closing)?
    }

    /// Same as [`Session::submit_and_await`] but delivers the result to a
    /// callback instead of an awaited future, for the async/callback-style
    /// surface the external interface calls for.
    pub(crate) fn submit_with_callback(
        &self,
        op: OpCode,
        op_body: Vec<u8>,
        callback: impl FnOnce(Result<Vec<u8>>) + Send + 'static,
    ) {
        if self.state().is_terminal() {
            callback(Err(ErrorCode::InvalidState));
            return;
        }
        let frame = {
            let mut mux = self.mux.lock();
            let xid = mux.next_xid();
            let mut frame = Vec::new();
            if RequestHeader { xid, op }.encode(&mut frame).is_err() {
                drop(mux);
                callback(Err(ErrorCode::MarshallingError));
                return;
            }
            frame.extend_from_slice(&op_body);
            mux.register(xid, op, Completion::Callback(Box::new(callback)), frame.clone());
            frame
        };
        if let Some(tx) = self.outgoing_tx.lock().clone() {
            tokio::spawn(async move {
                let _ = tx.send(crate::transport::OutgoingMessage { bytes: frame }).await;
            });
        }
    }

    /// Hand `frame` to the current transport if connected; otherwise leave
    /// it queued in the multiplexer, to be replayed by
    /// [`crate::session::connect`] once a new connection is established.
    pub(crate) async fn dispatch_or_queue(&self, frame: Vec<u8>) {
        let tx = self.outgoing_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(crate::transport::OutgoingMessage { bytes: frame }).await;
        }
    }

    /// Send `request`, retrying per `policy` on transport-level failures.
    /// Opt-in: [`CoordRequest::send`] through the op-specific methods below
    /// never retries on its own.
    pub async fn send_with_retry<R>(
        &self,
        request: R,
        mut policy: impl crate::retry::RequestRetryPolicy,
    ) -> Result<R::Out>
    where
        R: CoordRequest + Clone,
    {
        loop {
            match request.clone().send(self).await {
                Ok(out) => return Ok(out),
                Err(e) => match policy.next_delay(e) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => return Err(e),
                },
            }
        }
    }
}
