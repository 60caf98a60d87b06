//! Telephony connection service
//!
//! The service answers two kinds of requests coming from the connection framework:
//!
//! - **Subscription lookup** - can this handle be called through us?
//! - **Call placement** - dial a handle on a phone and wrap the resulting call
//!
//! # Call Flow
//!
//! ```text
//! ConnectionRequest ─► validate phone / handle / number
//!                          │
//!                          ▼
//!                     Phone::dial ──Err──► DialRejected(message)
//!                          │ None ──────► DialFailed
//!                          ▼
//!               ConnectionFactory::create_connection ──Err──► WrapConstructionFailed
//!                          │
//!                          ▼
//!               ConnectionRegistry::track ─► Response::on_result
//! ```
//!
//! Technology variants (GSM, CDMA, SIP...) do not subclass the service; they inject
//! a [`CallPredicate`] and a [`ConnectionFactory`] through the builder.
//!
//! A dialed call that the registry already knows is refused before the factory
//! runs, so a factory is never asked to wrap a call it cannot keep. `track` still
//! rejects the wrapper if another service registers the same call in between.
//!
//! # Usage Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use rvoip_telephony_core::{
//!     CallStateError, ConnectionRequest, Handle, NativeCallId, NativeConnection, Phone,
//!     TelephonyConnectionService,
//! };
//!
//! #[derive(Debug)]
//! struct Call { id: NativeCallId, number: String }
//!
//! impl NativeConnection for Call {
//!     fn call_id(&self) -> NativeCallId { self.id }
//!     fn address(&self) -> &str { &self.number }
//! }
//!
//! struct Modem;
//!
//! impl Phone for Modem {
//!     fn dial(&self, number: &str) -> Result<Option<Arc<dyn NativeConnection>>, CallStateError> {
//!         Ok(Some(Arc::new(Call { id: NativeCallId::new(), number: number.to_string() })))
//!     }
//! }
//!
//! let service = TelephonyConnectionService::builder().build().unwrap();
//! let request = ConnectionRequest::new(Some("tel:555-1234".parse::<Handle>().unwrap()));
//!
//! let connection = service.originate(Some(&Modem), &request).unwrap();
//! assert!(service.is_connection_known(connection.native().as_ref()));
//!
//! connection.destroy();
//! assert!(!service.is_connection_known(connection.native().as_ref()));
//! ```

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::ServiceConfig;
use crate::connection::TelephonyConnection;
use crate::error::{LookupError, OriginationError, Result};
use crate::phone::{NativeConnection, Phone};
use crate::registry::ConnectionRegistry;
use crate::response::Response;
use crate::types::{ConnectionRequest, Handle, Subscription};

/// Characters removed from a number when visual separator stripping is enabled
const VISUAL_SEPARATORS: &[char] = &['-', ' ', '.', '(', ')', '/'];

/// Decides whether a handle can be called through this service
pub trait CallPredicate: Send + Sync {
    fn can_call(&self, handle: &Handle) -> anyhow::Result<bool>;
}

impl<F> CallPredicate for F
where
    F: Fn(&Handle) -> anyhow::Result<bool> + Send + Sync,
{
    fn can_call(&self, handle: &Handle) -> anyhow::Result<bool> {
        self(handle)
    }
}

/// Builds the framework-facing wrapper for a freshly dialed native call
///
/// Returning an error is the supported way to refuse construction; the error's
/// message is reported to the requester. Panics are not caught.
pub trait ConnectionFactory: Send + Sync {
    fn create_connection(
        &self,
        request: &ConnectionRequest,
        native: Arc<dyn NativeConnection>,
    ) -> anyhow::Result<TelephonyConnection>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&ConnectionRequest, Arc<dyn NativeConnection>) -> anyhow::Result<TelephonyConnection> + Send + Sync,
{
    fn create_connection(
        &self,
        request: &ConnectionRequest,
        native: Arc<dyn NativeConnection>,
    ) -> anyhow::Result<TelephonyConnection> {
        self(request, native)
    }
}

/// Factory that wraps every call and labels it with a fixed technology
#[derive(Debug, Clone)]
pub struct TechnologyConnectionFactory {
    technology: String,
}

impl TechnologyConnectionFactory {
    pub fn new(technology: impl Into<String>) -> Self {
        Self { technology: technology.into() }
    }
}

impl ConnectionFactory for TechnologyConnectionFactory {
    fn create_connection(
        &self,
        request: &ConnectionRequest,
        native: Arc<dyn NativeConnection>,
    ) -> anyhow::Result<TelephonyConnection> {
        Ok(TelephonyConnection::new(request.clone(), native).with_technology(self.technology.clone()))
    }
}

/// Predicate accepting every handle that yields a dialable number
#[derive(Debug, Clone, Copy, Default)]
pub struct DialableNumberPredicate {
    strip_visual_separators: bool,
}

impl CallPredicate for DialableNumberPredicate {
    fn can_call(&self, handle: &Handle) -> anyhow::Result<bool> {
        Ok(extract_dialable_number(handle, self.strip_visual_separators).is_some())
    }
}

/// Extract the number to dial from a handle
///
/// Returns `None` when the scheme-specific part is empty, or only made of visual
/// separators when stripping is enabled. Whitespace is otherwise passed to the
/// phone as-is.
pub fn extract_dialable_number(handle: &Handle, strip_visual_separators: bool) -> Option<String> {
    let raw = handle.scheme_specific_part();
    let number: String = if strip_visual_separators {
        raw.chars().filter(|c| !VISUAL_SEPARATORS.contains(c)).collect()
    } else {
        raw.to_string()
    };

    if number.is_empty() { None } else { Some(number) }
}

/// Gateway between connection requests and phone dial operations
pub struct TelephonyConnectionService {
    config: ServiceConfig,
    registry: Arc<ConnectionRegistry>,
    predicate: Arc<dyn CallPredicate>,
    factory: Arc<dyn ConnectionFactory>,
}

impl TelephonyConnectionService {
    pub fn builder() -> TelephonyServiceBuilder {
        TelephonyServiceBuilder::new()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Whether the native call is already wrapped by this gateway
    pub fn is_connection_known(&self, native: &dyn NativeConnection) -> bool {
        self.registry.contains(native)
    }

    /// Decide whether `handle` is reachable and return a subscription token for it
    pub fn find_subscription(&self, handle: &Handle) -> std::result::Result<Option<Subscription>, LookupError> {
        let reachable = self
            .predicate
            .can_call(handle)
            .map_err(|e| LookupError::new(format!("{:#}", e)))?;

        Ok(reachable.then(|| Subscription::new(self.config.subscription_label.clone())))
    }

    /// Subscription lookup answered through a response sink
    pub fn find_subscriptions(
        &self,
        handle: &Handle,
        response: &dyn Response<Handle, Option<Subscription>, LookupError>,
    ) {
        match self.find_subscription(handle) {
            Ok(subscription) => {
                debug!("[{}] response_result {} -> {:?}", self.config.service_name, handle, subscription);
                response.on_result(handle, subscription);
            }
            Err(e) => {
                debug!("[{}] response_error {}: {}", self.config.service_name, handle, e);
                response.on_error(handle, e);
            }
        }
    }

    /// Dial the request's handle on `phone` and wrap the resulting call
    ///
    /// The registry is only touched after a successful dial and a successful
    /// wrapper construction.
    pub fn originate(
        &self,
        phone: Option<&dyn Phone>,
        request: &ConnectionRequest,
    ) -> std::result::Result<Arc<TelephonyConnection>, OriginationError> {
        let phone = phone.ok_or(OriginationError::InvalidPhone)?;
        let handle = request.handle().ok_or(OriginationError::InvalidHandle)?;
        let number = extract_dialable_number(handle, self.config.strip_visual_separators)
            .ok_or(OriginationError::UnparseableNumber)?;

        let native = match phone.dial(&number) {
            Ok(Some(native)) => native,
            Ok(None) => return Err(OriginationError::DialFailed),
            Err(e) => {
                error!(
                    "[{}] Call to {}.dial failed with exception: {}",
                    self.config.service_name,
                    phone.name(),
                    e
                );
                return Err(e.into());
            }
        };

        self.create_telephony_connection(request, native)
    }

    /// Call placement answered through a response sink
    pub fn start_call_with_phone(
        &self,
        phone: Option<&dyn Phone>,
        request: &ConnectionRequest,
        response: &dyn Response<ConnectionRequest, Arc<TelephonyConnection>, OriginationError>,
    ) {
        debug!("[{}] start_call_with_phone: {}", self.config.service_name, request);

        match self.originate(phone, request) {
            Ok(connection) => {
                debug!("[{}] response_result {} -> {}", self.config.service_name, request, connection);
                response.on_result(request, connection);
            }
            Err(e) => {
                debug!("[{}] response_error {}: {}", self.config.service_name, request, e);
                response.on_error(request, e);
            }
        }
    }

    fn create_telephony_connection(
        &self,
        request: &ConnectionRequest,
        native: Arc<dyn NativeConnection>,
    ) -> std::result::Result<Arc<TelephonyConnection>, OriginationError> {
        let call_id = native.call_id();
        // Skip the factory for a call that is already wrapped
        if self.registry.contains_id(call_id) {
            return Err(already_wrapped(call_id));
        }

        let connection = self
            .factory
            .create_connection(request, native)
            .map(Arc::new)
            .map_err(|e| {
                error!("[{}] Call to create_connection failed with exception: {:#}", self.config.service_name, e);
                OriginationError::WrapConstructionFailed(e.to_string())
            })?;

        if !self.registry.track(&connection) {
            return Err(already_wrapped(call_id));
        }

        info!(
            "[{}] Created connection {} for native call {}",
            self.config.service_name,
            connection.id(),
            call_id
        );
        Ok(connection)
    }
}

fn already_wrapped(call_id: crate::phone::NativeCallId) -> OriginationError {
    OriginationError::WrapConstructionFailed(format!("Native call {} is already wrapped", call_id))
}

/// Builder for [`TelephonyConnectionService`]
pub struct TelephonyServiceBuilder {
    config: ServiceConfig,
    registry: Option<Arc<ConnectionRegistry>>,
    predicate: Option<Arc<dyn CallPredicate>>,
    factory: Option<Arc<dyn ConnectionFactory>>,
}

impl TelephonyServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
            registry: None,
            predicate: None,
            factory: None,
        }
    }

    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing registry, e.g. between the GSM and CDMA services
    pub fn registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn can_call<F>(self, predicate: F) -> Self
    where
        F: Fn(&Handle) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.call_predicate(Arc::new(predicate))
    }

    pub fn call_predicate(mut self, predicate: Arc<dyn CallPredicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn connection_factory<F>(self, factory: F) -> Self
    where
        F: Fn(&ConnectionRequest, Arc<dyn NativeConnection>) -> anyhow::Result<TelephonyConnection>
            + Send
            + Sync
            + 'static,
    {
        self.with_connection_factory(Arc::new(factory))
    }

    pub fn with_connection_factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn build(self) -> Result<TelephonyConnectionService> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(ConnectionRegistry::new(self.config.event_channel_capacity)),
        };
        let predicate: Arc<dyn CallPredicate> = match self.predicate {
            Some(predicate) => predicate,
            None => Arc::new(DialableNumberPredicate {
                strip_visual_separators: self.config.strip_visual_separators,
            }),
        };
        let factory: Arc<dyn ConnectionFactory> = match self.factory {
            Some(factory) => factory,
            None => Arc::new(TechnologyConnectionFactory::new(self.config.technology.clone())),
        };

        debug!("Built telephony connection service '{}'", self.config.service_name);
        Ok(TelephonyConnectionService {
            config: self.config,
            registry,
            predicate,
            factory,
        })
    }
}

impl Default for TelephonyServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
