// SPDX-License-Identifier: MPL-2.0

//! `get-children`: list a node's immediate children, with an optional watch.

use std::future::Future;

use crate::error::Result;
use crate::session::{CoordRequest, Session};
use crate::watch::WatchKind;
use crate::wire::{self, BinaryRecordCodec, OpCode, RecordCodec};

/// Builds a `get-children` request.
#[derive(Debug, Clone)]
pub struct GetChildrenOp {
    path: String,
    watch: bool,
}

impl GetChildrenOp {
    /// List `path`'s children, without installing a watch.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            watch: false,
        }
    }

    /// Install a one-shot watch that fires on the next child-list change or
    /// deletion of `path`.
    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }
}

impl CoordRequest for GetChildrenOp {
    type Out = Vec<String>;

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let path = self.path.clone();
            let request = wire::PathWatchRequest {
                path: self.path,
                watch: self.watch,
            };
            let body = <BinaryRecordCodec as RecordCodec<wire::PathWatchRequest>>::encode(&request)?;
            let raw = session.submit_and_await(OpCode::GetChildren, body).await?;
            let response = <BinaryRecordCodec as RecordCodec<wire::ChildrenResponse>>::decode(&raw)?;
            if self.watch {
                session.install_watch(WatchKind::Child, &path);
            }
            Ok(response.children)
        }
    }
}
