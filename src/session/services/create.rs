// SPDX-License-Identifier: MPL-2.0

//! `create`: write a new node, with a fluent builder for the ephemeral,
//! sequential, and ACL options.
//!
//! Grounded on the fluent request builders in
//! `opcua-client/src/session/request_builder.rs` (there: `ReadBuilder`,
//! `WriteBuilder`, ...), adapted to this protocol's single-node-at-a-time
//! create call instead of a batched attribute read/write.

use std::future::Future;

use crate::acl::{create_flag, open_acl_unsafe, Acl};
use crate::error::Result;
use crate::session::{CoordRequest, Session};
use crate::wire::{self, BinaryRecordCodec, OpCode, RecordCodec};

/// Builds a `create` request. Defaults to a persistent node with the
/// world-readable/writable ACL and no data.
#[derive(Debug, Clone)]
pub struct CreateOp {
    path: String,
    data: Vec<u8>,
    acl: Acl,
    flags: u32,
}

impl CreateOp {
    /// Start building a create request for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: Vec::new(),
            acl: open_acl_unsafe(),
            flags: 0,
        }
    }

    /// Set the node's initial data.
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Replace the default ACL.
    pub fn acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }

    /// Mark the node ephemeral: removed when this session ends.
    pub fn ephemeral(mut self) -> Self {
        self.flags |= create_flag::EPHEMERAL;
        self
    }

    /// Mark the node sequential: the server appends a monotonic suffix.
    pub fn sequential(mut self) -> Self {
        self.flags |= create_flag::SEQUENCE;
        self
    }
}

impl CoordRequest for CreateOp {
    /// The path actually created (differs from the requested path when
    /// [`CreateOp::sequential`] was set).
    type Out = String;

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let request = wire::CreateRequest {
                path: self.path,
                data: self.data,
                acl: self.acl,
                flags: self.flags,
            };
            let body = <BinaryRecordCodec as RecordCodec<wire::CreateRequest>>::encode(&request)?;
            let raw = session.submit_and_await(OpCode::Create, body).await?;
            let response = <BinaryRecordCodec as RecordCodec<wire::CreateResponse>>::decode(&raw)?;
            Ok(response.path)
        }
    }
}
