// SPDX-License-Identifier: MPL-2.0

//! Session state machine, grounded on the `SessionState` enum in
//! `async-opcua-client/src/session/mod.rs` (there: `Disconnected` /
//! `Connecting` / `Connected`), expanded to the richer state set the
//! protocol distinguishes: a session can additionally be associating
//! (handshake sent, awaiting reply) or dead in one of two distinct terminal
//! ways.

/// Lifecycle state of a [`crate::session::Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection attempt in progress; `close()` was called or the
    /// session was never started.
    Closed,
    /// A TCP connect to an ensemble member is in progress.
    Connecting,
    /// TCP connected; the handshake (prime) frame has been sent and a
    /// reply is awaited.
    Associating,
    /// Handshake completed successfully; the session can accept requests.
    Connected,
    /// The server rejected a resume attempt, or the session timed out
    /// without ever reconnecting in time. Terminal: the session must be
    /// recreated.
    ExpiredSession,
    /// The server rejected supplied credentials. Terminal.
    AuthFailed,
}

impl SessionState {
    /// True for the two states from which no further reconnection will be attempted.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::ExpiredSession | SessionState::AuthFailed)
    }

    /// True if requests may be sent immediately in this state.
    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_exactly_expired_and_auth_failed() {
        for state in [
            SessionState::Closed,
            SessionState::Connecting,
            SessionState::Associating,
            SessionState::Connected,
        ] {
            assert!(!state.is_terminal());
        }
        assert!(SessionState::ExpiredSession.is_terminal());
        assert!(SessionState::AuthFailed.is_terminal());
    }
}
