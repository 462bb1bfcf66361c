// SPDX-License-Identifier: MPL-2.0

//! Watch registry: tracks one-shot, server-pushed watches the caller has
//! asked to install, so they can be matched against incoming
//! [`crate::wire::WatcherEvent`] frames and re-armed with `SET_WATCHES`
//! after a reconnect.
//!
//! Grounded on the subscription/monitored-item bookkeeping in
//! `async-opcua-client/src/session/services/subscriptions/service.rs`: a set
//! of maps keyed by identity (there, a subscription id; here, a path) that
//! get consulted on every incoming notification and rebuilt wholesale after
//! a reconnect.

use std::collections::HashMap;

use crate::sync::Mutex;
use crate::wire::{EventType, SessionStateCode, WatcherEvent};

/// Which kind of watch was installed for a path.
///
/// A path may have at most one pending watch per kind; installing the same
/// kind twice is a no-op dedup, not an error, matching the "one-shot,
/// identity-deduplicated" language in the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Fires on data change or node deletion, installed by `get-data` or `exists`.
    Data,
    /// Fires on node creation, installed by `exists` against a path that did not exist.
    Exist,
    /// Fires on child list change or node deletion, installed by `get-children`.
    Child,
}

/// A watch notification delivered to a caller, translated from the wire
/// representation into the kind the watch was originally registered under.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    /// The kind of watch that fired, or `None` for a session-level event.
    pub kind: Option<WatchKind>,
    /// What happened.
    pub event_type: EventType,
    /// Session state at the time, meaningful for session-level events.
    pub state: SessionStateCode,
    /// Path the event concerns; empty for session-level events.
    pub path: String,
}

#[derive(Default)]
struct Maps {
    data: HashMap<String, ()>,
    exist: HashMap<String, ()>,
    child: HashMap<String, ()>,
}

/// Tracks pending one-shot watches and dispatches incoming watch events.
///
/// Each installed watch is removed from the registry the moment it fires
/// (or the moment a matching `WatcherEvent` arrives for it) since the
/// protocol's watches are one-shot: the caller must re-request one if they
/// want to keep observing the path.
pub struct WatchRegistry {
    maps: Mutex<Maps>,
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            maps: Mutex::new(Maps::default()),
        }
    }

    /// Record that a watch of `kind` is now pending for `path`.
    pub fn install(&self, kind: WatchKind, path: &str) {
        let mut maps = self.maps.lock();
        let map = match kind {
            WatchKind::Data => &mut maps.data,
            WatchKind::Exist => &mut maps.exist,
            WatchKind::Child => &mut maps.child,
        };
        map.insert(path.to_string(), ());
    }

    /// Translate an incoming wire event into a [`WatchEvent`], removing the
    /// matching registry entries. A single wire event can match more than one
    /// kind registered for the same path: creation clears `Data` and `Exist`,
    /// a data change clears `Data` and `Exist`, and deletion clears `Data`,
    /// `Exist`, and `Child`. Callers get one [`WatchEvent`] per matched kind.
    pub fn dispatch(&self, event: &WatcherEvent) -> Vec<WatchEvent> {
        if matches!(event.event_type, EventType::Session) {
            return vec![WatchEvent {
                kind: None,
                event_type: event.event_type,
                state: event.state,
                path: event.path.clone(),
            }];
        }

        let mut maps = self.maps.lock();
        let mut fired = Vec::new();
        let path = &event.path;

        let matches_kind = |kind: WatchKind| match (kind, event.event_type) {
            (WatchKind::Data, EventType::Created)
            | (WatchKind::Data, EventType::Changed)
            | (WatchKind::Data, EventType::Deleted) => true,
            (WatchKind::Exist, EventType::Created)
            | (WatchKind::Exist, EventType::Changed)
            | (WatchKind::Exist, EventType::Deleted) => true,
            (WatchKind::Child, EventType::Child) | (WatchKind::Child, EventType::Deleted) => true,
            (_, EventType::NotWatching) => true,
            _ => false,
        };

        for (kind, map) in [
            (WatchKind::Data, &mut maps.data),
            (WatchKind::Exist, &mut maps.exist),
            (WatchKind::Child, &mut maps.child),
        ] {
            if matches_kind(kind) && map.remove(path).is_some() {
                fired.push(WatchEvent {
                    kind: Some(kind),
                    event_type: event.event_type,
                    state: event.state,
                    path: path.clone(),
                });
            }
        }
        fired
    }

    /// Snapshot every pending watch, grouped by kind, for a `SET_WATCHES`
    /// re-arm frame. Does not clear the registry: the watches stay pending
    /// until the server actually fires or rejects them.
    pub fn snapshot(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        let maps = self.maps.lock();
        (
            maps.data.keys().cloned().collect(),
            maps.exist.keys().cloned().collect(),
            maps.child.keys().cloned().collect(),
        )
    }

    /// True if no watches are currently pending.
    pub fn is_empty(&self) -> bool {
        let maps = self.maps.lock();
        maps.data.is_empty() && maps.exist.is_empty() && maps.child.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: EventType, path: &str) -> WatcherEvent {
        WatcherEvent {
            event_type,
            state: SessionStateCode::Connected,
            path: path.to_string(),
        }
    }

    #[test]
    fn install_then_dispatch_fires_once() {
        let reg = WatchRegistry::new();
        reg.install(WatchKind::Data, "/a");
        let fired = reg.dispatch(&event(EventType::Changed, "/a"));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, Some(WatchKind::Data));

        // One-shot: firing again produces nothing since the watch was consumed.
        let fired_again = reg.dispatch(&event(EventType::Changed, "/a"));
        assert!(fired_again.is_empty());
    }

    #[test]
    fn duplicate_install_is_deduped() {
        let reg = WatchRegistry::new();
        reg.install(WatchKind::Child, "/a");
        reg.install(WatchKind::Child, "/a");
        let (_, _, child) = reg.snapshot();
        assert_eq!(child, vec!["/a".to_string()]);
    }

    #[test]
    fn session_event_ignores_registry_and_always_fires() {
        let reg = WatchRegistry::new();
        let fired = reg.dispatch(&WatcherEvent {
            event_type: EventType::Session,
            state: SessionStateCode::ExpiredSession,
            path: String::new(),
        });
        assert_eq!(fired.len(), 1);
        assert!(fired[0].kind.is_none());
    }

    #[test]
    fn snapshot_reflects_all_kinds() {
        let reg = WatchRegistry::new();
        reg.install(WatchKind::Data, "/a");
        reg.install(WatchKind::Exist, "/b");
        reg.install(WatchKind::Child, "/c");
        let (data, exist, child) = reg.snapshot();
        assert_eq!(data, vec!["/a".to_string()]);
        assert_eq!(exist, vec!["/b".to_string()]);
        assert_eq!(child, vec!["/c".to_string()]);
        assert!(!reg.is_empty());
    }
}
