//! Phone / modem abstraction consumed by the gateway
//!
//! A [`Phone`] is the dialing capability of one line. Dialing produces a
//! [`NativeConnection`], the radio-layer handle of the call. Both are owned by the
//! telephony runtime; the gateway only borrows the phone and keeps `Arc`/`Weak`
//! references to native connections.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CallStateError;

/// Identity of a native call object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeCallId(pub Uuid);

impl NativeCallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NativeCallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NativeCallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Radio-layer call handle returned by [`Phone::dial`]
///
/// Two native connections are the same call iff their `call_id`s are equal.
pub trait NativeConnection: Send + Sync + fmt::Debug {
    fn call_id(&self) -> NativeCallId;

    /// Number or address the call was placed to
    fn address(&self) -> &str;
}

/// Dialing capability of a modem line
pub trait Phone: Send + Sync {
    /// Short name of the line, used in logs
    fn name(&self) -> &str {
        "phone"
    }

    /// Originate a call to `number`
    ///
    /// `Ok(None)` means the modem accepted the request but did not produce a call.
    fn dial(&self, number: &str) -> Result<Option<Arc<dyn NativeConnection>>, CallStateError>;
}
