//! # Telephony-Core - Call Origination Gateway for RVoIP
//!
//! This crate sits between a connection-service framework and a phone/modem
//! abstraction. It turns call-placement requests into `Phone::dial` calls, wraps the
//! resulting native calls in [`TelephonyConnection`]s, and keeps a
//! [`ConnectionRegistry`] of the native calls it currently manages so the same
//! call is never wrapped twice.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   Connection framework       │
//! └──────────────┬───────────────┘
//!                │ find_subscriptions / start_call_with_phone
//! ┌──────────────▼───────────────┐      ┌─────────────────────┐
//! │ TelephonyConnectionService   │─────►│ ConnectionRegistry  │
//! │  CallPredicate (injected)    │      └─────────▲───────────┘
//! │  ConnectionFactory (injected)│                │ on_destroyed
//! └──────────────┬───────────────┘      ┌─────────┴───────────┐
//!                │ dial                 │ TelephonyConnection │
//! ┌──────────────▼───────────────┐      └─────────────────────┘
//! │   Phone / NativeConnection   │
//! └──────────────────────────────┘
//! ```
//!
//! Outcomes are never returned as panics: every request is answered exactly once
//! through a [`Response`] sink.

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod phone;
pub mod registry;
pub mod response;
pub mod service;
pub mod types;

pub use config::ServiceConfig;
pub use connection::{ConnectionId, ConnectionListener, ListenerId, TelephonyConnection};
pub use error::{CallStateError, LookupError, OriginationError, Result, TelephonyError};
pub use logging::{LoggingConfig, setup_logging};
pub use phone::{NativeCallId, NativeConnection, Phone};
pub use registry::{ConnectionRegistry, RegistryEvent};
pub use response::{OneshotResponse, Response};
pub use service::{
    CallPredicate, ConnectionFactory, DialableNumberPredicate, TechnologyConnectionFactory,
    TelephonyConnectionService, TelephonyServiceBuilder, extract_dialable_number,
};
pub use types::{ConnectionRequest, Handle, RequestId, Subscription, SubscriptionId};
