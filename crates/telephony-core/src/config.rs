//! Gateway configuration
//!
//! [`ServiceConfig`] can be built fluently or loaded from TOML:
//!
//! ```rust
//! use rvoip_telephony_core::config::ServiceConfig;
//!
//! let config = ServiceConfig::from_toml_str(r#"
//!     service_name = "gsm"
//!     technology = "GSM"
//!     strip_visual_separators = true
//! "#).unwrap();
//!
//! assert_eq!(config.technology, "GSM");
//! assert_eq!(config.event_channel_capacity, 64);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelephonyError};

/// Default capacity of the registry event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for a telephony connection service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name used in log lines
    pub service_name: String,
    /// Technology label given to every connection built by the default factory
    pub technology: String,
    /// Remove `-`, `.`, `/`, spaces and parentheses from numbers before dialing
    pub strip_visual_separators: bool,
    /// Label attached to subscriptions returned by lookup
    pub subscription_label: Option<String>,
    /// Buffer size of the registry event channel
    pub event_channel_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "telephony".to_string(),
            technology: "generic".to_string(),
            strip_visual_separators: false,
            subscription_label: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = technology.into();
        self
    }

    pub fn with_strip_visual_separators(mut self, strip: bool) -> Self {
        self.strip_visual_separators = strip;
        self
    }

    pub fn with_subscription_label(mut self, label: impl Into<String>) -> Self {
        self.subscription_label = Some(label.into());
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ServiceConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(TelephonyError::config("service_name must not be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(TelephonyError::config("event_channel_capacity must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.strip_visual_separators);
        assert_eq!(config.subscription_label, None);
    }

    #[test]
    fn test_fluent_setters() {
        let config = ServiceConfig::new()
            .with_service_name("cdma")
            .with_technology("CDMA")
            .with_subscription_label("SIM1")
            .with_event_channel_capacity(8);
        assert_eq!(config.service_name, "cdma");
        assert_eq!(config.subscription_label.as_deref(), Some("SIM1"));
        assert_eq!(config.event_channel_capacity, 8);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ServiceConfig::from_toml_str("event_channel_capacity = 0").unwrap_err();
        assert!(matches!(err, TelephonyError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = ServiceConfig::from_toml_str("technology = ").unwrap_err();
        assert!(matches!(err, TelephonyError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ServiceConfig::from_file("/nonexistent/telephony.toml").unwrap_err();
        assert!(matches!(err, TelephonyError::Io(_)));
    }
}
