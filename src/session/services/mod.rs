// SPDX-License-Identifier: MPL-2.0

//! Per-operation request builders, one file per op family, each implementing
//! [`crate::session::CoordRequest`].
//!
//! Grounded on `async-opcua-client/src/session/services/{attributes,view,session}.rs`:
//! a thin builder struct per operation that owns just the request-specific
//! fields, with the actual submit/await/decode sequence living in
//! [`crate::session::request`] so every op shares one code path.

mod acl_ops;
mod auth;
mod children;
mod create;
mod data;
mod delete;
mod sync_op;

pub use acl_ops::{GetAclOp, SetAclOp};
pub use auth::AddAuthOp;
pub use children::GetChildrenOp;
pub use create::CreateOp;
pub use data::{ExistsOp, GetDataOp, SetDataOp};
pub use delete::DeleteOp;
pub use sync_op::SyncOp;

use std::sync::Arc;

use crate::acl::Acl;
use crate::error::Result;
use crate::session::{CoordRequest, Session};
use crate::wire::Stat;

/// The callback-style mirror of each awaited operation below: spawns the
/// same [`CoordRequest`] onto the runtime and delivers the result to
/// `callback` instead of an awaited future. Requires an owned `Arc<Session>`
/// since the work outlives the call that starts it.
macro_rules! callback_variant {
    ($name:ident, $op:ty) => {
        /// Callback-style form of the operation with the same name, minus
        /// the suffix.
        pub fn $name(
            self: &Arc<Self>,
            op: $op,
            callback: impl FnOnce(Result<<$op as CoordRequest>::Out>) + Send + 'static,
        ) {
            let session = self.clone();
            tokio::spawn(async move {
                callback(op.send(&session).await);
            });
        }
    };
}

impl Session {
    /// Create a node. See [`CreateOp`] for the available options.
    pub async fn create(&self, op: CreateOp) -> Result<String> {
        op.send(self).await
    }

    /// Delete a node. See [`DeleteOp`] for the available options.
    pub async fn delete(&self, op: DeleteOp) -> Result<()> {
        op.send(self).await
    }

    /// Check whether a node exists. See [`ExistsOp`] for the available options.
    pub async fn exists(&self, op: ExistsOp) -> Result<Option<Stat>> {
        op.send(self).await
    }

    /// Read a node's data. See [`GetDataOp`] for the available options.
    pub async fn get_data(&self, op: GetDataOp) -> Result<(Vec<u8>, Stat)> {
        op.send(self).await
    }

    /// Write a node's data. See [`SetDataOp`] for the available options.
    pub async fn set_data(&self, op: SetDataOp) -> Result<Stat> {
        op.send(self).await
    }

    /// List a node's children. See [`GetChildrenOp`] for the available options.
    pub async fn get_children(&self, op: GetChildrenOp) -> Result<Vec<String>> {
        op.send(self).await
    }

    /// Read a node's ACL.
    pub async fn get_acl(&self, op: GetAclOp) -> Result<(Acl, Stat)> {
        op.send(self).await
    }

    /// Write a node's ACL. See [`SetAclOp`] for the available options.
    pub async fn set_acl(&self, op: SetAclOp) -> Result<Stat> {
        op.send(self).await
    }

    /// Request a sync barrier at a path.
    pub async fn sync(&self, op: SyncOp) -> Result<()> {
        op.send(self).await
    }

    /// Present a credential on this session.
    pub async fn add_auth(&self, op: AddAuthOp) -> Result<()> {
        op.send(self).await
    }

    callback_variant!(create_with_callback, CreateOp);
    callback_variant!(delete_with_callback, DeleteOp);
    callback_variant!(exists_with_callback, ExistsOp);
    callback_variant!(get_data_with_callback, GetDataOp);
    callback_variant!(set_data_with_callback, SetDataOp);
    callback_variant!(get_children_with_callback, GetChildrenOp);
    callback_variant!(get_acl_with_callback, GetAclOp);
    callback_variant!(set_acl_with_callback, SetAclOp);
    callback_variant!(sync_with_callback, SyncOp);
    callback_variant!(add_auth_with_callback, AddAuthOp);
}
