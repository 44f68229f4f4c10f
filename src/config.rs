// ABOUTME: Session configuration loaded from YAML or from SMPP_* and BILLING_* variables
// ABOUTME: Validates settings before a session is built from them

use crate::client::{BindCredentials, KeepAliveConfig};
use crate::datatypes::{BindTransceiver, InterfaceVersion};
use crate::encoder::DEFAULT_MAX_LENGTH;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable {var} has invalid value {value:?}")]
    Env { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub interface_version: u8,
    /// Sender shown to the handset unless a request overrides it
    pub source_address: String,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub bind_timeout: Duration,
    /// How long the listener blocks on the socket before checking for shutdown
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub unbind_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub delivery_timeout: Duration,
    /// How long a receipt for an unknown message id is held
    #[serde(with = "humantime_serde")]
    pub receipt_grace: Duration,

    #[serde(with = "humantime_serde")]
    pub enquire_link_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub enquire_link_timeout: Duration,
    pub enquire_link_max_failures: u32,

    pub max_message_length: usize,
    pub billing: Option<BillingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2775,
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34 as u8,
            source_address: String::new(),
            connect_timeout: Duration::from_secs(10),
            bind_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_millis(500),
            unbind_timeout: Duration::from_secs(2),
            delivery_timeout: Duration::from_secs(15),
            receipt_grace: Duration::from_secs(10),
            enquire_link_interval: Duration::from_secs(30),
            enquire_link_timeout: Duration::from_secs(10),
            enquire_link_max_failures: 3,
            max_message_length: DEFAULT_MAX_LENGTH,
            billing: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    pub base_url: String,
    pub internal_key: String,
    #[serde(default = "default_billing_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_billing_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Config {
    /// Load and validate a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SMPP_*` and `BILLING_*` variables. Not
    /// validated, so callers can layer further overrides first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("SMPP_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("SMPP_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Env {
                var: "SMPP_PORT",
                value: port,
            })?;
        }
        if let Some(system_id) = lookup("SMPP_SYSTEM_ID") {
            config.system_id = system_id;
        }
        if let Some(password) = lookup("SMPP_PASSWORD") {
            config.password = password;
        }
        if let Some(system_type) = lookup("SMPP_SYSTEM_TYPE") {
            config.system_type = system_type;
        }
        if let Some(source) = lookup("SMPP_SOURCE_ADDR") {
            config.source_address = source;
        }
        if let Some(timeout) = lookup("SMPP_DELIVERY_TIMEOUT") {
            config.delivery_timeout =
                parse_duration(&timeout).ok_or(ConfigError::Env {
                    var: "SMPP_DELIVERY_TIMEOUT",
                    value: timeout,
                })?;
        }

        if let (Some(base_url), Some(internal_key)) =
            (lookup("BILLING_URL"), lookup("BILLING_INTERNAL_KEY"))
        {
            config.billing = Some(BillingConfig {
                base_url,
                internal_key,
                timeout: default_billing_timeout(),
            });
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.host.is_empty() {
            return invalid("host must not be empty".to_string());
        }
        if self.port == 0 {
            return invalid("port must not be 0".to_string());
        }
        if self.system_id.is_empty() {
            return invalid("system_id must not be empty".to_string());
        }
        for (field, value, max) in [
            ("system_id", &self.system_id, BindTransceiver::SYSTEM_ID_MAX),
            ("password", &self.password, BindTransceiver::PASSWORD_MAX),
            ("system_type", &self.system_type, BindTransceiver::SYSTEM_TYPE_MAX),
            ("source_address", &self.source_address, crate::datatypes::ADDRESS_MAX),
        ] {
            // limits include the terminating NUL
            if value.len() >= max {
                return invalid(format!("{field} is limited to {} characters", max - 1));
            }
        }
        if InterfaceVersion::try_from(self.interface_version).is_err() {
            return invalid(format!(
                "unsupported interface_version 0x{:02x}",
                self.interface_version
            ));
        }
        if self.read_timeout.is_zero() {
            return invalid("read_timeout must be positive".to_string());
        }
        if self.delivery_timeout.is_zero() {
            return invalid("delivery_timeout must be positive".to_string());
        }
        if self.max_message_length == 0 {
            return invalid("max_message_length must be positive".to_string());
        }
        if let Some(billing) = &self.billing {
            if billing.base_url.is_empty() {
                return invalid("billing.base_url must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// `host:port` of the SMSC
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn credentials(&self) -> BindCredentials {
        let version = InterfaceVersion::try_from(self.interface_version).unwrap_or_default();
        BindCredentials::new(&self.system_id, &self.password)
            .with_system_type(&self.system_type)
            .with_version(version)
    }

    pub fn keepalive(&self) -> KeepAliveConfig {
        if self.enquire_link_interval.is_zero() {
            return KeepAliveConfig::disabled();
        }
        KeepAliveConfig::new(self.enquire_link_interval)
            .with_timeout(self.enquire_link_timeout)
            .with_max_failures(self.enquire_link_max_failures.max(1))
    }
}

/// Bare numbers are seconds, anything else goes through humantime
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    humantime_serde::re::humantime::parse_duration(value).ok()
}
