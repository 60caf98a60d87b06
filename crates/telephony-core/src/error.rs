//! Error types for telephony-core operations
//!
//! Origination and lookup failures are never returned across the service boundary
//! as panics: they travel through the response sink as typed errors. The crate-level
//! [`TelephonyError`] covers everything around the gateway itself (configuration,
//! handle parsing, logging setup).

use thiserror::Error;

/// Failure raised by a phone when the modem refuses to dial
///
/// Carries the modem's own message verbatim; origination reports it unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CallStateError {
    pub message: String,
}

impl CallStateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Reasons a call-placement request can fail
///
/// Every variant is terminal for the request it belongs to. None are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OriginationError {
    /// No phone was supplied for the request
    #[error("Phone is missing")]
    InvalidPhone,

    /// The request carried no destination handle
    #[error("Handle is missing")]
    InvalidHandle,

    /// The handle did not yield a dialable number
    #[error("Unable to parse number")]
    UnparseableNumber,

    /// The phone refused to dial; holds the modem's message
    #[error("{0}")]
    DialRejected(String),

    /// The phone accepted the dial but produced no native call
    #[error("Call to phone.dial failed")]
    DialFailed,

    /// The connection factory could not build a wrapper
    #[error("{0}")]
    WrapConstructionFailed(String),
}

impl OriginationError {
    /// Whether the failure happened before the phone was asked to dial
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            OriginationError::InvalidPhone
                | OriginationError::InvalidHandle
                | OriginationError::UnparseableNumber
        )
    }
}

impl From<CallStateError> for OriginationError {
    fn from(err: CallStateError) -> Self {
        OriginationError::DialRejected(err.message)
    }
}

/// Subscription lookup failure, wrapping whatever the reachability predicate raised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Subscription lookup failed: {message}")]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Crate-level errors outside the request/response path
#[derive(Error, Debug)]
pub enum TelephonyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelephonyError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid handle error
    pub fn invalid_handle(msg: impl Into<String>) -> Self {
        Self::InvalidHandle(msg.into())
    }
}

impl From<toml::de::Error> for TelephonyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelephonyError>;
