// SPDX-License-Identifier: MPL-2.0

//! `sync`: ask the server for a barrier at a path, guaranteeing subsequent
//! reads on this session observe every write acknowledged before the sync
//! was issued.

use std::future::Future;

use crate::error::Result;
use crate::session::{CoordRequest, Session};
use crate::wire::{self, BinaryRecordCodec, OpCode, RecordCodec};

/// Builds a `sync` request.
#[derive(Debug, Clone)]
pub struct SyncOp {
    path: String,
}

impl SyncOp {
    /// Request a sync barrier at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl CoordRequest for SyncOp {
    type Out = ();

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let request = wire::PathOnly { path: self.path };
            let body = <BinaryRecordCodec as RecordCodec<wire::PathOnly>>::encode(&request)?;
            session.submit_and_await(OpCode::Sync, body).await?;
            Ok(())
        }
    }
}
