// SPDX-License-Identifier: MPL-2.0

//! Typed error codes returned from every fallible public entry point.
//!
//! Plays the role `async-opcua-types`'s `StatusCode` plays: one flat enum,
//! `Display`-able, matched against by the retry policy and by the
//! multiplexer's dispatch rules.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ErrorCode>;

/// Every error this crate can return, either locally-detected or reported by
/// the server in a reply header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// The operation completed successfully.
    #[error("ok")]
    Ok,
    /// Caller violation: a malformed path, an invalid argument combination.
    #[error("bad arguments")]
    BadArguments,
    /// The session handle is in a terminal state and can no longer accept requests.
    #[error("invalid state")]
    InvalidState,
    /// The request or reply body could not be encoded/decoded by the `RecordCodec`.
    #[error("marshalling error")]
    MarshallingError,
    /// The socket was lost while the request was in flight.
    #[error("connection loss")]
    ConnectionLoss,
    /// No bytes were received from the server within the negotiated timeout window.
    #[error("operation timeout")]
    OperationTimeout,
    /// The server rejected an attempt to resume a prior session.
    #[error("session expired")]
    SessionExpired,
    /// The server rejected the supplied credentials.
    #[error("authentication failed")]
    AuthFailed,
    /// The session was closed by the caller while the request was pending.
    #[error("closing")]
    Closing,
    /// No node exists at the given path.
    #[error("no node")]
    NoNode,
    /// A node already exists at the given path.
    #[error("node exists")]
    NodeExists,
    /// Attempted to delete a node that still has children.
    #[error("not empty")]
    NotEmpty,
    /// The version supplied in a conditional write did not match the node's current version.
    #[error("bad version")]
    BadVersion,
    /// The caller is not authorized to perform the operation.
    #[error("no auth")]
    NoAuth,
    /// The supplied ACL is malformed or empty.
    #[error("invalid acl")]
    InvalidAcl,
    /// An ephemeral node may not have children.
    #[error("no children for ephemerals")]
    NoChildrenForEphemerals,
    /// A reply arrived whose XID did not match the head of the sent-requests queue.
    #[error("runtime inconsistency")]
    RuntimeInconsistency,
}

impl ErrorCode {
    /// True for the errors that should never disturb the session (domain errors
    /// reported in a reply body, as opposed to transport/session failures).
    pub fn is_domain_error(self) -> bool {
        matches!(
            self,
            ErrorCode::NoNode
                | ErrorCode::NodeExists
                | ErrorCode::NotEmpty
                | ErrorCode::BadVersion
                | ErrorCode::NoAuth
                | ErrorCode::InvalidAcl
                | ErrorCode::NoChildrenForEphemerals
        )
    }

    /// True for errors that are terminal for the session (no further
    /// reconnection attempts will be made).
    pub fn is_terminal(self) -> bool {
        matches!(self, ErrorCode::SessionExpired | ErrorCode::AuthFailed)
    }
}
