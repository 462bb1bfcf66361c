// SPDX-License-Identifier: MPL-2.0

//! Heartbeat timing: when to send a ping, and when to give up on the
//! connection because nothing has been heard from the server.
//!
//! Grounded on the keep-alive interval/threshold pairing in
//! `async-opcua-client/src/session/event_loop.rs`'s `SessionIntervals`/
//! `SessionActivityLoop`, adapted to this protocol's specific ratios: a
//! ping is due at one third of the negotiated timeout since the last send,
//! and the connection is considered dead if nothing has been received for
//! two thirds of the timeout.

use std::time::{Duration, Instant};

/// Tracks send/receive activity against a negotiated session timeout and
/// reports when the next ping is due or when the peer must be considered
/// unresponsive.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    timeout: Duration,
    last_send: Instant,
    last_recv: Instant,
}

impl Heartbeat {
    /// Start tracking, as of `now`, against a negotiated `timeout`.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_send: now,
            last_recv: now,
        }
    }

    /// Record that a frame was just sent.
    pub fn record_send(&mut self, now: Instant) {
        self.last_send = now;
    }

    /// Record that a frame was just received.
    pub fn record_recv(&mut self, now: Instant) {
        self.last_recv = now;
    }

    /// Interval after which a ping should be sent if nothing else was sent:
    /// one third of the negotiated timeout.
    pub fn ping_interval(&self) -> Duration {
        self.timeout / 3
    }

    /// Interval of receive silence after which the connection must be
    /// treated as dead: two thirds of the negotiated timeout.
    pub fn read_timeout(&self) -> Duration {
        self.timeout * 2 / 3
    }

    /// Instant at which a ping becomes due, assuming no further sends.
    pub fn next_ping_due(&self) -> Instant {
        self.last_send + self.ping_interval()
    }

    /// Instant at which the connection must be declared dead, assuming no
    /// further receives.
    pub fn read_deadline(&self) -> Instant {
        self.last_recv + self.read_timeout()
    }

    /// True if, as of `now`, the read deadline has already passed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.read_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_due_at_one_third_timeout() {
        let now = Instant::now();
        let hb = Heartbeat::new(Duration::from_secs(9), now);
        assert_eq!(hb.next_ping_due(), now + Duration::from_secs(3));
    }

    #[test]
    fn read_deadline_at_two_thirds_timeout() {
        let now = Instant::now();
        let hb = Heartbeat::new(Duration::from_secs(9), now);
        assert_eq!(hb.read_deadline(), now + Duration::from_secs(6));
    }

    #[test]
    fn recv_activity_pushes_deadline_forward() {
        let now = Instant::now();
        let mut hb = Heartbeat::new(Duration::from_secs(9), now);
        let later = now + Duration::from_secs(5);
        hb.record_recv(later);
        assert!(!hb.is_expired(later));
        assert_eq!(hb.read_deadline(), later + Duration::from_secs(6));
    }

    #[test]
    fn expired_after_silence_past_read_timeout() {
        let now = Instant::now();
        let hb = Heartbeat::new(Duration::from_secs(9), now);
        assert!(hb.is_expired(now + Duration::from_secs(7)));
    }
}
