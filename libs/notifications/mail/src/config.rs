//! SMTP transmitter configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use validator::Validate;

/// Highest port accepted by [`TxConfig::validate`]; dynamic ports are excluded.
pub const MAX_PORT: i64 = 49151;

/// Configuration loading error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Credentials and endpoint of the SMTP server
///
/// `tmp_dir` is the root under which each send creates its scoped attachment
/// directory; the system temp dir is used when it is empty.
///
/// # Example
///
/// ```ignore
/// use mail::TxConfig;
///
/// let cfg = TxConfig::new("me@example.de", "secret", "smtp.example.de", 587);
/// let cfg = TxConfig::from_env()?;
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TxConfig {
    #[validate(length(min = 1))]
    pub user: String,

    #[validate(length(min = 1))]
    pub password: String,

    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1, max = MAX_PORT))]
    pub port: i64,

    #[serde(default)]
    pub tmp_dir: String,
}

impl TxConfig {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: i64,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            tmp_dir: String::new(),
        }
    }

    /// Set the root directory for scoped attachment directories
    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<String>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    /// Root directory for scoped attachment directories
    pub fn tmp_root(&self) -> PathBuf {
        if self.tmp_dir.is_empty() {
            env::temp_dir()
        } else {
            PathBuf::from(&self.tmp_dir)
        }
    }

    /// Load the config from environment variables
    ///
    /// Environment variables:
    /// - `SMTP_USER` (required)
    /// - `SMTP_PASSWORD` (required)
    /// - `SMTP_HOST` (required)
    /// - `SMTP_PORT` (required)
    /// - `TMP_DIR` (optional) - root for attachment directories
    ///
    /// Values are not validated here; [`Transmitter::dial`](crate::Transmitter::dial) does that.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env_required("SMTP_PORT")?;
        let port = port.parse().map_err(|e| ConfigError::ParseError {
            key: "SMTP_PORT".to_string(),
            details: format!("{}", e),
        })?;

        Ok(Self {
            user: env_required("SMTP_USER")?,
            password: env_required("SMTP_PASSWORD")?,
            host: env_required("SMTP_HOST")?,
            port,
            tmp_dir: env::var("TMP_DIR").unwrap_or_default(),
        })
    }
}

impl fmt::Debug for TxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tmp_dir", &self.tmp_dir)
            .finish()
    }
}

fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}
