// SPDX-License-Identifier: MPL-2.0

//! Thin re-export of the synchronous locking primitives used throughout the
//! crate, mirroring `async-opcua-core`'s `sync` module: callers write
//! `crate::sync::{Mutex, RwLock}` instead of naming `parking_lot` directly,
//! so swapping the lock implementation later touches one file.

pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
