// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration for RouterOS API connections
//!
//! Holds the connection target, credentials, TLS options, and pool sizing.
//! The TLS flag and port default each other: port 8729 implies TLS unless
//! `tls` is set explicitly, and an explicit `tls` picks the matching
//! default port.

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use crate::connection::tls::TlsOptions;

/// Default configuration values
pub mod defaults {
    /// Plain API port
    pub const PLAIN_PORT: u16 = 8728;
    /// TLS API port
    pub const TLS_PORT: u16 = 8729;
    /// Connect + handshake + login deadline (seconds)
    pub const DIAL_TIMEOUT_SECS: u64 = 5;
    /// Per-command deadline (seconds)
    pub const COMMAND_TIMEOUT_SECS: u64 = 30;
    /// Workers per pool
    pub const POOL_SIZE: usize = 5;
    pub const USERNAME: &str = "admin";
    pub const PASSWORD: &str = "";
}

/// Environment variable names recognized by [`ClientConfig::from_env`]
pub mod env_vars {
    pub const HOST: &str = "ROUTEROS_HOST";
    pub const PORT: &str = "ROUTEROS_PORT";
    pub const USERNAME: &str = "ROUTEROS_USERNAME";
    pub const PASSWORD: &str = "ROUTEROS_PASSWORD";
    pub const TLS: &str = "ROUTEROS_TLS";
    pub const POOL_SIZE: &str = "ROUTEROS_POOL_SIZE";
}

fn default_dial_timeout() -> u64 {
    defaults::DIAL_TIMEOUT_SECS
}

fn default_command_timeout() -> Option<u64> {
    Some(defaults::COMMAND_TIMEOUT_SECS)
}

fn default_pool_size() -> usize {
    defaults::POOL_SIZE
}

/// Configuration for a single RouterOS target
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Router hostname or IP address, without port
    pub host: String,
    pub username: String,
    pub password: SecretString,
    /// API port; defaults to 8728 plain / 8729 TLS
    #[serde(default)]
    pub port: Option<u16>,
    /// Wrap the connection in TLS; defaults to `port == 8729`
    #[serde(default)]
    pub tls: Option<bool>,
    #[serde(default)]
    pub tls_options: TlsOptions,
    /// Deadline covering TCP connect, TLS handshake, and login
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_secs: u64,
    /// Per-command deadline; `None` disables it. A command that exceeds the
    /// deadline kills its connection.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: Option<u64>,
    /// Number of workers a pool built from this config owns
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl ClientConfig {
    /// Creates a config with defaults for everything but the target and
    /// credentials.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: SecretString::new(password.into().into_boxed_str()),
            port: None,
            tls: None,
            tls_options: TlsOptions::default(),
            dial_timeout_secs: defaults::DIAL_TIMEOUT_SECS,
            command_timeout_secs: Some(defaults::COMMAND_TIMEOUT_SECS),
            pool_size: defaults::POOL_SIZE,
        }
    }

    /// Whether the connection uses TLS.
    ///
    /// An explicit `tls` wins; otherwise TLS is derived from the port.
    #[must_use]
    pub fn use_tls(&self) -> bool {
        self.tls.unwrap_or(self.port == Some(defaults::TLS_PORT))
    }

    /// The port to dial: explicit port, or the default for the TLS mode.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_tls() {
            defaults::TLS_PORT
        } else {
            defaults::PLAIN_PORT
        })
    }

    #[must_use]
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Router host cannot be empty".to_string());
        }
        if self.host.contains(':') {
            return Err(format!(
                "Invalid host '{}': expected a bare hostname or IP, set `port` separately",
                self.host
            ));
        }
        if self.username.trim().is_empty() {
            return Err(format!("Username cannot be empty for '{}'", self.host));
        }
        if self.pool_size == 0 {
            return Err("Pool size must be at least 1".to_string());
        }
        Ok(())
    }

    /// Loads configuration from environment variables
    ///
    /// Unset variables fall back to the values in [`defaults`]. Returns
    /// `None` when `ROUTEROS_HOST` is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let host = std::env::var(env_vars::HOST).ok()?;
        let username =
            std::env::var(env_vars::USERNAME).unwrap_or_else(|_| defaults::USERNAME.to_string());
        let password =
            std::env::var(env_vars::PASSWORD).unwrap_or_else(|_| defaults::PASSWORD.to_string());

        let mut config = Self::new(host, username, password);

        config.port = std::env::var(env_vars::PORT)
            .ok()
            .and_then(|v| v.parse().ok());
        config.tls = std::env::var(env_vars::TLS)
            .ok()
            .and_then(|v| v.parse().ok());
        if let Some(size) = std::env::var(env_vars::POOL_SIZE)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.pool_size = size;
        }

        if let Err(e) = config.validate() {
            tracing::error!("Invalid RouterOS configuration from environment: {}", e);
            return None;
        }
        Some(config)
    }
}
