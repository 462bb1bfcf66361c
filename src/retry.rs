// SPDX-License-Identifier: MPL-2.0

//! Reconnect backoff and per-request retry policies.
//!
//! Ported from `opcua-client/src/session/retry.rs` and the
//! `SessionRetryPolicy`/`ExponentialBackoff` pair referenced from
//! `async-opcua-client/src/session/event_loop.rs` and
//! `async-opcua-client/src/config.rs::session_retry_policy`. The shape is
//! unchanged: a capped exponential backoff generator that a session-level
//! policy hands out fresh on every reconnect attempt, plus an independent,
//! opt-in policy for individual request retries.

use std::time::Duration;

use crate::error::ErrorCode;

/// Generates a capped, doubling sequence of delays, optionally bounded by a
/// maximum number of attempts.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    max: Duration,
    remaining: Option<u32>,
}

impl ExponentialBackoff {
    /// Create a backoff generator starting at `initial`, doubling on each
    /// call up to `max`, for at most `limit` attempts (`None` means
    /// unbounded).
    pub fn new(initial: Duration, max: Duration, limit: Option<u32>) -> Self {
        Self {
            current: initial,
            max,
            remaining: limit,
        }
    }

    /// Return the next delay, or `None` once the attempt limit is exhausted.
    pub fn next(&mut self) -> Option<Duration> {
        if let Some(remaining) = self.remaining {
            if remaining == 0 {
                return None;
            }
            self.remaining = Some(remaining - 1);
        }
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        Some(delay)
    }
}

/// Default reconnect attempt cap: unlimited.
pub const DEFAULT_RETRY_LIMIT: i32 = -1;

/// Produces a fresh [`ExponentialBackoff`] for each reconnect attempt,
/// carrying the configured bounds.
#[derive(Debug, Clone, Copy)]
pub struct SessionRetryPolicy {
    max_delay: Duration,
    limit: Option<u32>,
    initial_delay: Duration,
}

impl SessionRetryPolicy {
    /// Attempt cap matching [`DEFAULT_RETRY_LIMIT`].
    pub const DEFAULT_RETRY_LIMIT: i32 = DEFAULT_RETRY_LIMIT;

    /// Construct a policy. `limit` of `None` retries forever.
    pub fn new(max_delay: Duration, limit: Option<u32>, initial_delay: Duration) -> Self {
        Self {
            max_delay,
            limit,
            initial_delay,
        }
    }

    /// Hand out a new backoff generator for a fresh reconnect sequence.
    pub fn new_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_delay, self.max_delay, self.limit)
    }
}

/// A policy deciding, per failed request, whether and how long to wait
/// before retrying. Used only by [`crate::session::Session::send_with_retry`],
/// which is opt-in: ordinary calls never retry automatically.
pub trait RequestRetryPolicy {
    /// Return the delay until the next retry, or `None` to give up.
    fn next_delay(&mut self, error: ErrorCode) -> Option<Duration>;
}

impl RequestRetryPolicy for Box<dyn RequestRetryPolicy + Send> {
    fn next_delay(&mut self, error: ErrorCode) -> Option<Duration> {
        (**self).next_delay(error)
    }
}

/// A retry policy good enough for most callers: retries transport-level
/// failures (connection loss, timeout) using the supplied backoff, and
/// never retries domain errors (`NoNode`, `BadVersion`, ...) since those
/// reflect the state of the tree rather than a transient failure.
pub struct DefaultRetryPolicy<'a> {
    backoff: ExponentialBackoff,
    extra_errors: &'a [ErrorCode],
}

impl<'a> DefaultRetryPolicy<'a> {
    /// Create a policy using `backoff` with no additional retryable errors.
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self {
            backoff,
            extra_errors: &[],
        }
    }

    /// Create a policy that also retries the given `extra_errors`.
    pub fn new_with_extras(backoff: ExponentialBackoff, extra_errors: &'a [ErrorCode]) -> Self {
        Self {
            backoff,
            extra_errors,
        }
    }
}

impl RequestRetryPolicy for DefaultRetryPolicy<'_> {
    fn next_delay(&mut self, error: ErrorCode) -> Option<Duration> {
        let should_retry = matches!(error, ErrorCode::ConnectionLoss | ErrorCode::OperationTimeout)
            || self.extra_errors.contains(&error);

        if should_retry {
            self.backoff.next()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut b = ExponentialBackoff::new(
            Duration::from_millis(100),
            Duration::from_millis(500),
            None,
        );
        assert_eq!(b.next(), Some(Duration::from_millis(100)));
        assert_eq!(b.next(), Some(Duration::from_millis(200)));
        assert_eq!(b.next(), Some(Duration::from_millis(400)));
        assert_eq!(b.next(), Some(Duration::from_millis(500)));
        assert_eq!(b.next(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn backoff_respects_limit() {
        let mut b = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), Some(2));
        assert!(b.next().is_some());
        assert!(b.next().is_some());
        assert!(b.next().is_none());
    }

    #[test]
    fn default_policy_only_retries_transport_errors() {
        let mut policy = DefaultRetryPolicy::new(ExponentialBackoff::new(
            Duration::from_millis(10),
            Duration::from_secs(1),
            None,
        ));
        assert!(policy.next_delay(ErrorCode::ConnectionLoss).is_some());
        assert!(policy.next_delay(ErrorCode::NoNode).is_none());
    }
}
