// SPDX-License-Identifier: MPL-2.0

//! `add-auth`: present a credential on the reserved `AUTH_XID`, outside the
//! normal FIFO request queue so the session can react to a rejection by
//! failing the session rather than just this one call.

use std::future::Future;

use crate::error::Result;
use crate::session::{CoordRequest, Session};

/// Builds an `add-auth` request.
#[derive(Debug, Clone)]
pub struct AddAuthOp {
    scheme: String,
    credential: Vec<u8>,
}

impl AddAuthOp {
    /// Present `credential` under the named `scheme` (e.g. `"digest"`).
    pub fn new(scheme: impl Into<String>, credential: impl Into<Vec<u8>>) -> Self {
        Self {
            scheme: scheme.into(),
            credential: credential.into(),
        }
    }
}

impl CoordRequest for AddAuthOp {
    type Out = ();

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move { session.submit_auth(self.scheme, self.credential).await }
    }
}
