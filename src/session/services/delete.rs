// SPDX-License-Identifier: MPL-2.0

//! `delete`: remove a node, optionally conditioned on its current version.

use std::future::Future;

use crate::error::Result;
use crate::session::{CoordRequest, Session};
use crate::wire::{self, BinaryRecordCodec, OpCode, RecordCodec};

/// Builds a `delete` request.
#[derive(Debug, Clone)]
pub struct DeleteOp {
    path: String,
    version: i32,
}

impl DeleteOp {
    /// Delete `path` unconditionally.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: -1,
        }
    }

    /// Only delete if the node's current version matches `version`.
    pub fn expected_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}

impl CoordRequest for DeleteOp {
    type Out = ();

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let request = wire::DeleteRequest {
                path: self.path,
                version: self.version,
            };
            let body = <BinaryRecordCodec as RecordCodec<wire::DeleteRequest>>::encode(&request)?;
            session.submit_and_await(OpCode::Delete, body).await?;
            Ok(())
        }
    }
}
