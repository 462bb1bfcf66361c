// SPDX-License-Identifier: MPL-2.0

//! Request multiplexer: assigns XIDs, tracks in-flight requests in send
//! order, and matches incoming replies against that order.
//!
//! Grounded on the same shape `async-opcua-client`'s transport layer uses to
//! match OPC UA responses to requests by `RequestHandle` (see
//! `opcua-client/src/transport/channel.rs`), specialized to this protocol's
//! stronger guarantee: replies are required to come back in the exact order
//! requests were sent, so a `VecDeque` and a head-of-line check is enough —
//! no handle-keyed map is needed for the non-watch reply path.

use std::collections::VecDeque;

use crate::error::{ErrorCode, Result};
use crate::session::completion::Completion;
use crate::wire::OpCode;
use crate::xid::XidGenerator;

struct InFlight {
    xid: i32,
    op: OpCode,
    completion: Completion,
    /// The fully-encoded frame, kept so it can be replayed verbatim on the
    /// next connection if no reply arrived before the socket was lost.
    frame: Vec<u8>,
}

/// Tracks requests sent but not yet replied to, in FIFO order.
#[derive(Default)]
pub struct Multiplexer {
    xid_gen: XidGenerator,
    sent: VecDeque<InFlight>,
}

impl Multiplexer {
    /// Create an empty multiplexer.
    pub fn new() -> Self {
        Self {
            xid_gen: XidGenerator::new(),
            sent: VecDeque::new(),
        }
    }

    /// Allocate the next XID without recording anything, used for sentinel
    /// requests (ping, auth, set-watches) that carry fixed XIDs instead.
    pub fn next_xid(&self) -> i32 {
        self.xid_gen.next()
    }

    /// Record that a request with the given `xid`/`op` has been submitted,
    /// keeping `frame` so it can be resent verbatim after a reconnect, and
    /// that `completion` should fire when its reply arrives.
    pub fn register(&mut self, xid: i32, op: OpCode, completion: Completion, frame: Vec<u8>) {
        self.sent.push_back(InFlight {
            xid,
            op,
            completion,
            frame,
        });
    }

    /// Every currently-unacknowledged request's encoded frame, in FIFO
    /// order, for replay onto a freshly (re)established connection.
    pub fn pending_frames(&self) -> Vec<Vec<u8>> {
        self.sent.iter().map(|entry| entry.frame.clone()).collect()
    }

    /// Match an incoming reply's `xid` against the head of the queue.
    ///
    /// Returns the matched request's op code and completion on success. A
    /// mismatch means the server violated the FIFO-reply invariant (or a
    /// bug exists locally): the popped completion is cancelled with
    /// `RuntimeInconsistency` right here (it is never re-delivered, even if
    /// a later reply would coincidentally match its xid) and callers treat
    /// the `Err` as fatal to the connection.
    pub fn take(&mut self, xid: i32) -> Result<(OpCode, Completion)> {
        match self.sent.pop_front() {
            Some(entry) if entry.xid == xid => Ok((entry.op, entry.completion)),
            Some(entry) => {
                entry.completion.complete(Err(ErrorCode::RuntimeInconsistency));
                Err(ErrorCode::RuntimeInconsistency)
            }
            None => Err(ErrorCode::RuntimeInconsistency),
        }
    }

    /// Number of requests currently awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.sent.len()
    }

    /// Drain every pending request, completing each with `error`. Used when
    /// the connection is lost or the session is closing and no further
    /// replies will ever arrive.
    pub fn fail_all(&mut self, error: ErrorCode) {
        while let Some(entry) = self.sent.pop_front() {
            entry.completion.complete(Err(error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_completion() -> Completion {
        Completion::Callback(Box::new(|_| {}))
    }

    #[test]
    fn replies_must_match_fifo_order() {
        let mut mux = Multiplexer::new();
        mux.register(1, OpCode::Create, noop_completion(), vec![1]);
        mux.register(2, OpCode::Delete, noop_completion(), vec![2]);

        let (op, _) = mux.take(1).unwrap();
        assert_eq!(op, OpCode::Create);
        let (op, _) = mux.take(2).unwrap();
        assert_eq!(op, OpCode::Delete);
    }

    #[test]
    fn out_of_order_reply_cancels_the_mismatched_head_with_runtime_inconsistency() {
        let mut mux = Multiplexer::new();
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen2 = seen.clone();
        mux.register(
            1,
            OpCode::Create,
            Completion::Callback(Box::new(move |r| {
                assert_eq!(r.unwrap_err(), ErrorCode::RuntimeInconsistency);
                seen2.store(true, std::sync::atomic::Ordering::SeqCst);
            })),
            vec![1],
        );
        mux.register(2, OpCode::Delete, noop_completion(), vec![2]);

        let err = mux.take(2).unwrap_err();
        assert_eq!(err, ErrorCode::RuntimeInconsistency);
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
        // The mismatched entry was consumed, not restored; xid 2's own
        // request is still queued behind it.
        let (op, _) = mux.take(2).unwrap();
        assert_eq!(op, OpCode::Delete);
    }

    #[test]
    fn fail_all_drains_and_completes_every_entry() {
        let mut mux = Multiplexer::new();
        let flag = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for i in 1..=3 {
            let flag = flag.clone();
            mux.register(
                i,
                OpCode::Sync,
                Completion::Callback(Box::new(move |r| {
                    assert_eq!(r.unwrap_err(), ErrorCode::ConnectionLoss);
                    flag.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                })),
                vec![i as u8],
            );
        }
        mux.fail_all(ErrorCode::ConnectionLoss);
        assert_eq!(flag.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(mux.pending_count(), 0);
    }

    #[test]
    fn pending_frames_preserves_fifo_order_for_replay() {
        let mut mux = Multiplexer::new();
        mux.register(1, OpCode::Create, noop_completion(), vec![0xAA]);
        mux.register(2, OpCode::Delete, noop_completion(), vec![0xBB]);
        assert_eq!(mux.pending_frames(), vec![vec![0xAA], vec![0xBB]]);
    }
}
