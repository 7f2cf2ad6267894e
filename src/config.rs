//! Global configuration parsing, validation, and environment overrides.

use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use axum::http::HeaderName;
use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Environment variable overriding [`GlobalConfig::log_path`].
pub const ENV_LOG_PATH: &str = "SURVEY_LOG_PATH";
/// Environment variable overriding [`GlobalConfig::http_port`].
pub const ENV_HTTP_PORT: &str = "SURVEY_HTTP_PORT";

/// How the client address is resolved when the service sits behind a proxy.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProxyConfig {
    /// Whether the forwarded-for header is trusted at all.
    #[serde(default = "default_true")]
    pub trust_forwarded_for: bool,
    /// Header carrying the original client address chain.
    #[serde(default = "default_forwarded_header")]
    pub forwarded_header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trust_forwarded_for: true,
            forwarded_header: default_forwarded_header(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_forwarded_header() -> String {
    "x-forwarded-for".into()
}

fn default_http_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_http_port() -> u16 {
    8000
}

fn default_log_path() -> PathBuf {
    PathBuf::from("data").join("survey.ndjson")
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP listener binds to.
    #[serde(default = "default_http_host")]
    pub http_host: IpAddr,
    /// HTTP port; 0 lets the OS pick one.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Append-only JSONL file receiving stored survey records.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Upper bound on accepted request body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Client address resolution.
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_path: default_log_path(),
            max_body_bytes: default_max_body_bytes(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SURVEY_LOG_PATH` / `SURVEY_HTTP_PORT` overrides from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `SURVEY_HTTP_PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the variable source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the port override does not parse.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_LOG_PATH).filter(|v| !v.trim().is_empty()) {
            self.log_path = PathBuf::from(path);
        }

        if let Some(port) = lookup(ENV_HTTP_PORT) {
            self.http_port = port.trim().parse().map_err(|err| {
                AppError::Config(format!("{ENV_HTTP_PORT} must be a port number: {err}"))
            })?;
        }

        Ok(())
    }

    /// Socket address the HTTP listener binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_host, self.http_port)
    }

    /// Parsed name of the trusted forwarded-for header, if trust is enabled.
    #[must_use]
    pub fn forwarded_header_name(&self) -> Option<HeaderName> {
        if !self.proxy.trust_forwarded_for {
            return None;
        }
        match HeaderName::from_bytes(self.proxy.forwarded_header.as_bytes()) {
            Ok(name) => Some(name),
            Err(err) => {
                warn!(header = %self.proxy.forwarded_header, %err, "invalid forwarded header name");
                None
            }
        }
    }

    /// Validate invariants that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            return Err(AppError::Config(
                "max_body_bytes must be greater than zero".into(),
            ));
        }

        if self.log_path.as_os_str().is_empty() {
            return Err(AppError::Config("log_path must not be empty".into()));
        }

        if self.proxy.trust_forwarded_for
            && HeaderName::from_bytes(self.proxy.forwarded_header.as_bytes()).is_err()
        {
            return Err(AppError::Config(format!(
                "proxy.forwarded_header is not a valid header name: {}",
                self.proxy.forwarded_header
            )));
        }

        Ok(())
    }
}
