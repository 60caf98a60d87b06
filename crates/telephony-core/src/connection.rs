//! Framework-facing connection wrapper
//!
//! A [`TelephonyConnection`] wraps exactly one native call and exposes a one-shot
//! destruction notification. Observers implement [`ConnectionListener`]; the
//! registry uses one to drop its entry when the wrapper goes away.
//!
//! ```text
//! add_listener ──► [listeners] ──destroy()──► drained, each notified once
//!                                  │
//!                                  ├─ second destroy(): no-op
//!                                  └─ drop without destroy(): same drain
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::phone::{NativeCallId, NativeConnection};
use crate::types::ConnectionRequest;

/// Unique identifier for a connection wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by [`TelephonyConnection::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer of a connection's lifecycle
pub trait ConnectionListener: Send + Sync {
    /// Called once when the connection is destroyed
    fn on_destroyed(&self, connection: &TelephonyConnection);
}

#[derive(Default)]
struct ListenerState {
    destroyed: bool,
    next_id: u64,
    listeners: Vec<(ListenerId, Arc<dyn ConnectionListener>)>,
}

/// Wrapper around a native call, as seen by the connection framework
pub struct TelephonyConnection {
    id: ConnectionId,
    request: ConnectionRequest,
    native: Arc<dyn NativeConnection>,
    technology: String,
    created_at: DateTime<Utc>,
    state: Mutex<ListenerState>,
}

impl TelephonyConnection {
    pub fn new(request: ConnectionRequest, native: Arc<dyn NativeConnection>) -> Self {
        Self {
            id: ConnectionId::new(),
            request,
            native,
            technology: "generic".to_string(),
            created_at: Utc::now(),
            state: Mutex::new(ListenerState::default()),
        }
    }

    /// Label the radio technology carrying the call (e.g. "GSM", "CDMA")
    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = technology.into();
        self
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn request(&self) -> &ConnectionRequest {
        &self.request
    }

    pub fn native(&self) -> &Arc<dyn NativeConnection> {
        &self.native
    }

    pub fn native_call_id(&self) -> NativeCallId {
        self.native.call_id()
    }

    pub fn technology(&self) -> &str {
        &self.technology
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Register a lifecycle observer
    ///
    /// A listener added after destruction is notified immediately.
    pub fn add_listener(&self, listener: Arc<dyn ConnectionListener>) -> ListenerId {
        let mut state = self.state.lock();
        let id = ListenerId(state.next_id);
        state.next_id += 1;

        if state.destroyed {
            drop(state);
            listener.on_destroyed(self);
        } else {
            state.listeners.push((id, listener));
        }
        id
    }

    /// Detach a listener; returns false if it was not attached
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    /// Signal that the connection is gone
    ///
    /// Listeners are drained under the lock and notified outside it, so a listener
    /// may call back into this connection. Dropping the last reference to an
    /// undestroyed connection has the same effect.
    pub fn destroy(&self) {
        if !self.notify_destroyed() {
            debug!("Connection {} already destroyed", self.id);
        }
    }

    /// Run the one-shot destruction drain; false if it already ran
    fn notify_destroyed(&self) -> bool {
        let listeners = {
            let mut state = self.state.lock();
            if state.destroyed {
                return false;
            }
            state.destroyed = true;
            std::mem::take(&mut state.listeners)
        };

        debug!(
            "Destroying connection {} (native call {}), notifying {} listener(s)",
            self.id,
            self.native.call_id(),
            listeners.len()
        );
        for (_, listener) in listeners {
            listener.on_destroyed(self);
        }
        true
    }
}

impl Drop for TelephonyConnection {
    fn drop(&mut self) {
        if self.notify_destroyed() {
            debug!("Connection {} dropped without destroy()", self.id);
        }
    }
}

impl fmt::Debug for TelephonyConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephonyConnection")
            .field("id", &self.id)
            .field("request_id", &self.request.request_id())
            .field("native_call_id", &self.native.call_id())
            .field("technology", &self.technology)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl fmt::Display for TelephonyConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TelephonyConnection {} ({}) -> {}", self.id, self.technology, self.native.address())
    }
}
