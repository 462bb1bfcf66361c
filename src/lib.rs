// SPDX-License-Identifier: MPL-2.0

//! A session protocol engine for a hierarchical coordination service
//! (the ZooKeeper wire protocol): one multiplexed TCP connection to a
//! replicated ensemble, request/reply correlation by XID, one-shot
//! server-pushed watches, and transparent session recovery across
//! disconnects.
//!
//! Structurally this follows `async-opcua-client`: a plain `Session` data
//! holder behind `Arc`, a `SessionEventLoop` reactor the caller drives with
//! `run`/`spawn`, pluggable `Connector`/`Transport` traits so tests can swap
//! in an in-memory transport, and one `CoordRequest` impl per wire
//! operation feeding through a single submit/await path.
//!
//! ```no_run
//! use coord_client::{ClientBuilder, Session, CreateOp};
//!
//! # async fn run() -> coord_client::Result<()> {
//! let config = ClientBuilder::new()
//!     .ensemble(["127.0.0.1:2181"])
//!     .build()
//!     .map_err(|_| coord_client::ErrorCode::BadArguments)?;
//!
//! let (session, event_loop) = Session::new(config, |_event| {});
//! let _handle = event_loop.spawn(coord_client::transport::tcp::TcpConnector);
//!
//! let path = session.create(CreateOp::new("/a").data(b"hello".to_vec())).await?;
//! println!("created {path}");
//! # Ok(())
//! # }
//! ```

pub mod acl;
pub mod config;
pub mod error;
pub mod retry;
pub mod session;
pub mod sync;
pub mod transport;
pub mod watch;
pub mod wire;
pub mod xid;

pub use acl::{Acl, AclEntry};
pub use config::{ClientBuilder, ClientConfig, Config, ConfigError};
pub use error::{ErrorCode, Result};
pub use retry::{DefaultRetryPolicy, ExponentialBackoff, RequestRetryPolicy, SessionRetryPolicy};
pub use session::services::{
    AddAuthOp, CreateOp, DeleteOp, ExistsOp, GetAclOp, GetChildrenOp, GetDataOp, SetAclOp,
    SetDataOp, SyncOp,
};
pub use session::{CoordRequest, Session, SessionEventLoop, SessionPollResult, SessionState};
pub use transport::{Connector, OutgoingMessage, Transport, TransportConfig, TransportPollResult};
pub use watch::{WatchEvent, WatchKind};
pub use wire::Stat;
