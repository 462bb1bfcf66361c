// SPDX-License-Identifier: MPL-2.0

//! Completion records: what the multiplexer calls once a reply (or a
//! terminal failure) arrives for a given XID.
//!
//! The distilled design notes ask for two interchangeable completion
//! styles — a blocking-style synchronous marker, and an async callback —
//! which map directly onto idiomatic Rust as a [`tokio::sync::oneshot`]
//! sender (the async/await call site) and a boxed `FnOnce` (the fire-and-forget
//! callback call site), rather than the thread-parking marker and bare
//! function pointer the notes describe as implementation-language artifacts
//! to be redesigned away.

use tokio::sync::oneshot;

use crate::error::Result;

/// Raw reply payload handed to a completion: the decoded reply header's
/// status already folded in, and the body bytes (empty on error).
pub type RawReply = Result<Vec<u8>>;

/// How a caller wants to be notified that their request completed.
pub enum Completion {
    /// Resolve a future the caller is `.await`-ing.
    Oneshot(oneshot::Sender<RawReply>),
    /// Invoke a callback inline from the event loop task.
    Callback(Box<dyn FnOnce(RawReply) + Send>),
}

impl Completion {
    /// Consume the completion, delivering `reply`.
    ///
    /// A dropped `oneshot::Receiver` (the caller gave up waiting) is not an
    /// error here: the multiplexer has done its job by attempting delivery.
    pub fn complete(self, reply: RawReply) {
        match self {
            Completion::Oneshot(tx) => {
                let _ = tx.send(reply);
            }
            Completion::Callback(cb) => cb(reply),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Oneshot(_) => f.write_str("Completion::Oneshot"),
            Completion::Callback(_) => f.write_str("Completion::Callback"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oneshot_completion_delivers_to_receiver() {
        let (tx, rx) = oneshot::channel();
        let completion = Completion::Oneshot(tx);
        completion.complete(Ok(vec![1, 2, 3]));
        assert_eq!(rx.await.unwrap().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn callback_completion_invokes_closure() {
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen2 = seen.clone();
        let completion = Completion::Callback(Box::new(move |reply: RawReply| {
            assert!(reply.is_ok());
            seen2.store(true, std::sync::atomic::Ordering::SeqCst);
        }));
        completion.complete(Ok(vec![]));
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_panic() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let completion = Completion::Oneshot(tx);
        completion.complete(Ok(vec![]));
    }
}
