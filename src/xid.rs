// SPDX-License-Identifier: MPL-2.0

//! Correlation identifiers (XIDs) and the reserved sentinel values.
//!
//! Mirrors `async-opcua-core::handle`'s `AtomicHandle` idiom (referenced from
//! `async-opcua-client/src/session/mod.rs` as
//! `monitored_item_handle: AtomicHandle`): a small atomic counter type that
//! skips the values it must never hand out.

use std::sync::atomic::{AtomicI32, Ordering};

/// Sentinel XID carried by server-pushed watch notifications.
pub const WATCHER_EVENT_XID: i32 = -1;
/// Sentinel XID used for keepalive pings.
pub const PING_XID: i32 = -2;
/// Sentinel XID used for the "add credential" auth request.
pub const AUTH_XID: i32 = -4;
/// Sentinel XID used for the post-handshake watch re-arm request.
pub const SET_WATCHES_XID: i32 = -8;

/// Generates strictly increasing, positive application XIDs.
///
/// Application XIDs start at 1 and wrap back to 1 rather than going negative,
/// since negative XIDs are all reserved sentinels.
#[derive(Debug)]
pub struct XidGenerator {
    next: AtomicI32,
}

impl Default for XidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl XidGenerator {
    /// Create a generator that will hand out 1 as its first XID.
    pub fn new() -> Self {
        Self {
            next: AtomicI32::new(1),
        }
    }

    /// Allocate the next XID.
    pub fn next(&self) -> i32 {
        loop {
            let current = self.next.fetch_add(1, Ordering::Relaxed);
            if current > 0 {
                return current;
            }
            // Overflowed back through zero/negative: reset and retry.
            self.next.store(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xids_are_monotonic_and_positive() {
        let gen = XidGenerator::new();
        let mut prev = 0;
        for _ in 0..1000 {
            let xid = gen.next();
            assert!(xid > prev);
            prev = xid;
        }
    }
}
