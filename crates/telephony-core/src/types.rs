//! Request-side types for the telephony gateway
//!
//! - **Handle** - destination address split into scheme and scheme-specific part
//! - **ConnectionRequest** - an immutable outbound call request
//! - **Subscription** - token answered by subscription lookup
//!
//! # Usage Examples
//!
//! ```rust
//! use rvoip_telephony_core::types::{ConnectionRequest, Handle};
//!
//! let handle: Handle = "tel:555-1234".parse().unwrap();
//! assert_eq!(handle.scheme(), "tel");
//! assert_eq!(handle.scheme_specific_part(), "555-1234");
//!
//! let request = ConnectionRequest::new(Some(handle))
//!     .with_extra("account", "primary");
//! assert_eq!(request.extra("account"), Some("primary"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TelephonyError;

/// Destination address of a call
///
/// Mirrors the opaque URI form used by dialers: `scheme:scheme-specific-part#fragment`.
/// Only the scheme-specific part is dialed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    scheme: String,
    scheme_specific_part: String,
    fragment: Option<String>,
}

impl Handle {
    /// Create a handle from its parts
    pub fn new(scheme: impl Into<String>, scheme_specific_part: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            scheme_specific_part: scheme_specific_part.into(),
            fragment: None,
        }
    }

    /// Shorthand for a `tel:` handle
    pub fn tel(number: impl Into<String>) -> Self {
        Self::new("tel", number)
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Build a handle from a parsed URL
    ///
    /// The scheme-specific part is everything between `scheme:` and the fragment,
    /// so `sip:alice@example.com` keeps `alice@example.com`.
    pub fn from_url(url: &url::Url) -> Self {
        let serialized = url.as_str();
        let after_scheme = &serialized[url.scheme().len() + 1..];
        let ssp = match after_scheme.find('#') {
            Some(pos) => &after_scheme[..pos],
            None => after_scheme,
        };
        Self {
            scheme: url.scheme().to_string(),
            scheme_specific_part: ssp.to_string(),
            fragment: url.fragment().map(str::to_string),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn scheme_specific_part(&self) -> &str {
        &self.scheme_specific_part
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl FromStr for Handle {
    type Err = TelephonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| TelephonyError::invalid_handle(format!("missing scheme in '{}'", s)))?;
        if scheme.is_empty() {
            return Err(TelephonyError::invalid_handle(format!("empty scheme in '{}'", s)));
        }

        let (ssp, fragment) = match rest.split_once('#') {
            Some((ssp, fragment)) => (ssp, Some(fragment.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            scheme_specific_part: ssp.to_string(),
            fragment,
        })
    }
}

impl From<&url::Url> for Handle {
    fn from(url: &url::Url) -> Self {
        Handle::from_url(url)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.scheme_specific_part)?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// Unique identifier for a connection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbound call request as handed over by the connection framework
///
/// Immutable once built; the originator reads it and never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    request_id: RequestId,
    handle: Option<Handle>,
    extras: HashMap<String, String>,
    created_at: DateTime<Utc>,
}

impl ConnectionRequest {
    pub fn new(handle: Option<Handle>) -> Self {
        Self {
            request_id: RequestId::new(),
            handle,
            extras: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach caller context to the request
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    pub fn extras(&self) -> &HashMap<String, String> {
        &self.extras
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for ConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.handle {
            Some(handle) => write!(f, "ConnectionRequest {} {}", self.request_id, handle),
            None => write!(f, "ConnectionRequest {} <no handle>", self.request_id),
        }
    }
}

/// Identifier of a subscription token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

/// Token returned when a handle is reachable through this gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub label: Option<String>,
}

impl Subscription {
    pub fn new(label: Option<String>) -> Self {
        Self {
            id: SubscriptionId(Uuid::new_v4()),
            label,
        }
    }
}
