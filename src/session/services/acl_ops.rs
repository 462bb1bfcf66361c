// SPDX-License-Identifier: MPL-2.0

//! `get-acl` and `set-acl`: read or replace a node's access control list.

use std::future::Future;

use crate::acl::Acl;
use crate::error::Result;
use crate::session::{CoordRequest, Session};
use crate::wire::{self, BinaryRecordCodec, OpCode, RecordCodec, Stat};

/// Builds a `get-acl` request.
#[derive(Debug, Clone)]
pub struct GetAclOp {
    path: String,
}

impl GetAclOp {
    /// Read `path`'s ACL.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl CoordRequest for GetAclOp {
    type Out = (Acl, Stat);

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let request = wire::PathOnly { path: self.path };
            let body = <BinaryRecordCodec as RecordCodec<wire::PathOnly>>::encode(&request)?;
            let raw = session.submit_and_await(OpCode::GetAcl, body).await?;
            let response = <BinaryRecordCodec as RecordCodec<wire::AclResponse>>::decode(&raw)?;
            Ok((response.acl, response.stat))
        }
    }
}

/// Builds a `set-acl` request.
#[derive(Debug, Clone)]
pub struct SetAclOp {
    path: String,
    acl: Acl,
    version: i32,
}

impl SetAclOp {
    /// Replace `path`'s ACL unconditionally.
    pub fn new(path: impl Into<String>, acl: Acl) -> Self {
        Self {
            path: path.into(),
            acl,
            version: -1,
        }
    }

    /// Only write if the node's current version matches `version`.
    pub fn expected_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}

impl CoordRequest for SetAclOp {
    type Out = Stat;

    fn send<'a>(self, session: &'a Session) -> impl Future<Output = Result<Self::Out>> + Send + 'a
    where
        Self: 'a,
    {
        async move {
            let request = wire::SetAclRequest {
                path: self.path,
                acl: self.acl,
                version: self.version,
            };
            let body = <BinaryRecordCodec as RecordCodec<wire::SetAclRequest>>::encode(&request)?;
            let raw = session.submit_and_await(OpCode::SetAcl, body).await?;
            let response = <BinaryRecordCodec as RecordCodec<wire::StatResponse>>::decode(&raw)?;
            Ok(response.stat)
        }
    }
}
