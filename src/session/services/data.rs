// SPDX-License-Identifier: MPL-2.0

//! `exists`, `get-data`, and `set-data`: the three operations that share the
//! path-plus-optional-watch request shape.

use std::future::Future;

use crate::error::{ErrorCode, Result};
use crate::session::{CoordRequest, Session};
use crate::watch::WatchKind;
use crate::wire::{self, BinaryRecordCodec, OpCode, RecordCodec, Stat};

/// Builds an `exists` request. Returns `None` rather than an error when the
/// node is absent.
#[derive(Debug, Clone)]
pub struct ExistsOp {
    path: String,
    watch: bool,
}

impl ExistsOp {
    /// Check whether `path` exists, without installing a watch.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            watch: false,
        }
    }

    /// Install a one-shot watch: fires on creation if the node is currently
    /// absent, or on change/deletion if it currently exists.
    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }
}

impl CoordRequest for ExistsOp {
    /// `Some(stat)` if the node exists, `None` otherwise.
    type Out = Option<Stat>;

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
            match session.submit_and_await(OpCode::Exists, body).await {
                Ok(raw) => {
                    let response = <BinaryRecordCodec as RecordCodec<wire::StatResponse>>::decode(&raw)?;
                    // Node already exists: a watch here must fire on a later
                    // data change or deletion, not on creation.
                    if self.watch {
                        session.install_watch(WatchKind::Data, &path);
                    }
                    Ok(Some(response.stat))
                }
                Err(ErrorCode::NoNode) => {
                    if self.watch {
                        session.install_watch(WatchKind::Exist, &path);
                    }
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        }
    }
}

/// Builds a `get-data` request.
#[derive(Debug, Clone)]
pub struct GetDataOp {
    path: String,
    watch: bool,
}

impl GetDataOp {
    /// Read `path`'s data, without installing a watch.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            watch: false,
        }
    }

    /// Install a one-shot watch that fires on the next change or deletion.
    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }
}

impl CoordRequest for GetDataOp {
    type Out = (Vec<u8>, Stat);

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
            let raw = session.submit_and_await(OpCode::GetData, body).await?;
            let response = <BinaryRecordCodec as RecordCodec<wire::DataResponse>>::decode(&raw)?;
            if self.watch {
                session.install_watch(WatchKind::Data, &path);
            }
            Ok((response.data, response.stat))
        }
    }
}

/// Builds a `set-data` request.
#[derive(Debug, Clone)]
pub struct SetDataOp {
    path: String,
    data: Vec<u8>,
    version: i32,
}

impl SetDataOp {
    /// Overwrite `path`'s data unconditionally.
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            version: -1,
        }
    }

    /// Only write if the node's current version matches `version`.
    pub fn expected_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}

impl CoordRequest for SetDataOp {
    type Out = Stat;

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let request = wire::SetDataRequest {
                path: self.path,
                data: self.data,
                version: self.version,
            };
            let body = <BinaryRecordCodec as RecordCodec<wire::SetDataRequest>>::encode(&request)?;
            let raw = session.submit_and_await(OpCode::SetData, body).await?;
            let response = <BinaryRecordCodec as RecordCodec<wire::StatResponse>>::decode(&raw)?;
            Ok(response.stat)
        }
    }
}
