//! Registry of native calls currently wrapped by the gateway
//!
//! Other framework components ask [`ConnectionRegistry::contains`] before wrapping a
//! native call so the same underlying call is never wrapped twice. The registry is
//! an owned value shared as `Arc<ConnectionRegistry>`; it keeps only weak references
//! to native calls, which stay owned by the telephony runtime.
//!
//! Membership changes are also published on a broadcast channel:
//!
//! ```rust
//! use rvoip_telephony_core::registry::{ConnectionRegistry, RegistryEvent};
//!
//! let registry = ConnectionRegistry::new(16);
//! let mut events = registry.subscribe();
//! assert!(registry.is_empty());
//! assert!(events.try_recv().is_err());
//! ```

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::connection::{ConnectionId, ConnectionListener, TelephonyConnection};
use crate::phone::{NativeCallId, NativeConnection};

/// Membership change published by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    Registered {
        call_id: NativeCallId,
        connection_id: ConnectionId,
        at: DateTime<Utc>,
    },
    Unregistered {
        call_id: NativeCallId,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    native: Weak<dyn NativeConnection>,
    connection_id: ConnectionId,
    registered_at: DateTime<Utc>,
}

/// Concurrent set of known native calls
#[derive(Debug)]
pub struct ConnectionRegistry {
    entries: DashMap<NativeCallId, RegistryEntry>,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl ConnectionRegistry {
    /// Create a registry whose event channel buffers `event_capacity` events
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            entries: DashMap::new(),
            event_tx,
        }
    }

    /// Add a native call; returns false if it was already registered
    pub fn register(&self, native: &Arc<dyn NativeConnection>, connection_id: ConnectionId) -> bool {
        let call_id = native.call_id();
        let registered_at = Utc::now();

        match self.entries.entry(call_id) {
            Entry::Occupied(_) => {
                debug!("Native call {} already registered", call_id);
                return false;
            }
            Entry::Vacant(slot) => {
                slot.insert(RegistryEntry {
                    native: Arc::downgrade(native),
                    connection_id,
                    registered_at,
                });
            }
        }

        debug!("Registered native call {} for connection {}", call_id, connection_id);
        self.publish(RegistryEvent::Registered {
            call_id,
            connection_id,
            at: registered_at,
        });
        true
    }

    /// Remove a native call; returns false if it was not registered
    pub fn unregister(&self, call_id: NativeCallId) -> bool {
        if self.entries.remove(&call_id).is_none() {
            trace!("Native call {} not registered, nothing to remove", call_id);
            return false;
        }

        debug!("Unregistered native call {}", call_id);
        self.publish(RegistryEvent::Unregistered {
            call_id,
            at: Utc::now(),
        });
        true
    }

    /// Whether this native call is currently wrapped by the gateway
    pub fn contains(&self, native: &dyn NativeConnection) -> bool {
        self.contains_id(native.call_id())
    }

    pub fn contains_id(&self, call_id: NativeCallId) -> bool {
        self.entries.contains_key(&call_id)
    }

    /// Look up a registered native call, if the runtime still holds it
    pub fn get(&self, call_id: NativeCallId) -> Option<Arc<dyn NativeConnection>> {
        self.entries.get(&call_id).and_then(|entry| entry.native.upgrade())
    }

    /// Connection wrapping the given native call
    pub fn connection_id(&self, call_id: NativeCallId) -> Option<ConnectionId> {
        self.entries.get(&call_id).map(|entry| entry.connection_id)
    }

    pub fn registered_at(&self, call_id: NativeCallId) -> Option<DateTime<Utc>> {
        self.entries.get(&call_id).map(|entry| entry.registered_at)
    }

    pub fn call_ids(&self) -> Vec<NativeCallId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribe to membership changes
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    /// Register the connection's native call and drop it again when the
    /// connection is destroyed
    pub fn track(self: &Arc<Self>, connection: &TelephonyConnection) -> bool {
        if !self.register(connection.native(), connection.id()) {
            return false;
        }
        connection.add_listener(Arc::new(RegistryRemoval {
            registry: Arc::downgrade(self),
            call_id: connection.native_call_id(),
        }));
        true
    }

    fn publish(&self, event: RegistryEvent) {
        // No subscribers is the common case
        let _ = self.event_tx.send(event);
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Destruction listener that removes one registry entry
struct RegistryRemoval {
    registry: Weak<ConnectionRegistry>,
    call_id: NativeCallId,
}

impl ConnectionListener for RegistryRemoval {
    fn on_destroyed(&self, _connection: &TelephonyConnection) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.call_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionRequest;
    use std::thread;

    #[derive(Debug)]
    struct TestNative {
        id: NativeCallId,
    }

    impl NativeConnection for TestNative {
        fn call_id(&self) -> NativeCallId {
            self.id
        }

        fn address(&self) -> &str {
            "5551234"
        }
    }

    fn native() -> Arc<dyn NativeConnection> {
        Arc::new(TestNative { id: NativeCallId::new() })
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ConnectionRegistry::default();
        let call = native();
        let connection_id = ConnectionId::new();

        assert!(registry.register(&call, connection_id));
        assert!(!registry.register(&call, ConnectionId::new()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connection_id(call.call_id()), Some(connection_id));
        assert!(registry.registered_at(call.call_id()).is_some());
        assert!(registry.contains(call.as_ref()));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::default();
        let call = native();
        registry.register(&call, ConnectionId::new());

        assert!(registry.unregister(call.call_id()));
        assert!(!registry.unregister(call.call_id()));
        assert!(!registry.contains(call.as_ref()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_does_not_keep_native_alive() {
        let registry = ConnectionRegistry::default();
        let call = native();
        let call_id = call.call_id();
        registry.register(&call, ConnectionId::new());

        assert!(registry.get(call_id).is_some());
        drop(call);
        assert!(registry.get(call_id).is_none());
        assert!(registry.contains_id(call_id));
    }

    #[test]
    fn test_track_removes_entry_on_destroy() {
        let registry = Arc::new(ConnectionRegistry::default());
        let call = native();
        let connection = TelephonyConnection::new(ConnectionRequest::new(None), call.clone());

        assert!(registry.track(&connection));
        assert!(!registry.track(&connection));
        assert!(registry.contains(call.as_ref()));
        assert_eq!(connection.listener_count(), 1);

        connection.destroy();
        assert!(!registry.contains(call.as_ref()));

        connection.destroy();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_track_removes_entry_when_connection_dropped() {
        let registry = Arc::new(ConnectionRegistry::default());
        let call = native();
        let connection = TelephonyConnection::new(ConnectionRequest::new(None), call.clone());

        assert!(registry.track(&connection));
        drop(connection);
        assert!(!registry.contains(call.as_ref()));

        let rewrapped = TelephonyConnection::new(ConnectionRequest::new(None), call.clone());
        assert!(registry.track(&rewrapped));
    }

    #[test]
    fn test_events_are_published() {
        let registry = ConnectionRegistry::new(8);
        let mut events = registry.subscribe();
        let call = native();
        let connection_id = ConnectionId::new();

        registry.register(&call, connection_id);
        registry.unregister(call.call_id());
        registry.unregister(call.call_id());

        match events.try_recv().unwrap() {
            RegistryEvent::Registered { call_id, connection_id: id, .. } => {
                assert_eq!(call_id, call.call_id());
                assert_eq!(id, connection_id);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(events.try_recv().unwrap(), RegistryEvent::Unregistered { .. }));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_variant_tag() {
        let event = RegistryEvent::Unregistered {
            call_id: NativeCallId::new(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("Unregistered").is_some());

        let back: RegistryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_concurrent_register_unregister() {
        let registry = Arc::new(ConnectionRegistry::default());
        let calls: Vec<_> = (0..64).map(|_| native()).collect();

        let handles: Vec<_> = calls
            .chunks(16)
            .map(|chunk| {
                let registry = registry.clone();
                let chunk = chunk.to_vec();
                thread::spawn(move || {
                    for call in &chunk {
                        assert!(registry.register(call, ConnectionId::new()));
                    }
                    for call in chunk.iter().step_by(2) {
                        assert!(registry.unregister(call.call_id()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 32);
        assert_eq!(registry.call_ids().len(), 32);
    }
}
