//! Configuration types for the HTTP service
//!
//! Every section carries serde defaults, so an empty configuration source
//! yields the built-in defaults. Only the account ID has no usable default;
//! [`ServiceConfig::validate`] rejects a configuration without one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use video_notifier_core::auth::{redacted, OAuthConfig};
use video_notifier_core::client::HttpClientConfig;
use video_notifier_core::fetcher::FetcherConfig;
use video_notifier_core::forwarder::{ForwarderConfig, DEFAULT_ORIGIN_SYSTEM_ID};

use crate::errors::ConfigError;

/// Service configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Video platform API and OAuth endpoint
    pub upstream: UpstreamConfig,

    /// CMS notifier endpoint
    pub downstream: DownstreamConfig,

    /// Outbound HTTP client settings
    pub http: HttpConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Missing` for an empty account ID or URL
    /// - `ConfigError::Invalid` for an unparsable URL or a zero port
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }

        validate_url("upstream.api_url", &self.upstream.api_url)?;
        validate_url("upstream.oauth_url", &self.upstream.oauth_url)?;
        validate_url("downstream.url", &self.downstream.url)?;

        if self.upstream.account_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "upstream.account_id".to_string(),
            });
        }

        if self.downstream.origin_system_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "downstream.origin_system_id".to_string(),
            });
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::new(&self.upstream.oauth_url, &self.upstream.auth)
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig::new(&self.upstream.api_url, &self.upstream.account_id)
    }

    pub fn forwarder_config(&self) -> ForwarderConfig {
        let mut config = ForwarderConfig::new(&self.downstream.url)
            .with_origin_system_id(&self.downstream.origin_system_id);
        if let Some(auth) = &self.downstream.auth {
            config = config.with_authorization(auth);
        }
        if let Some(host) = &self.downstream.host_header {
            config = config.with_host_header(host);
        }
        config
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut config = HttpClientConfig::default()
            .with_connect_timeout(Duration::from_secs(self.http.connect_timeout_seconds))
            .with_timeout(Duration::from_secs(self.http.timeout_seconds));
        if let Some(user_agent) = &self.http.user_agent {
            config = config.with_user_agent(user_agent);
        }
        config
    }
}

/// Startup summary with secrets shown only as set or empty
impl fmt::Display for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config: [")?;
        writeln!(f, "\tserver: [{}]", self.bind_address())?;
        writeln!(f, "\tupstream: [")?;
        writeln!(f, "\t\tapi_url: [{}]", self.upstream.api_url)?;
        writeln!(f, "\t\toauth_url: [{}]", self.upstream.oauth_url)?;
        writeln!(f, "\t\taccount_id: [{}]", self.upstream.account_id)?;
        writeln!(f, "\t\tauth: [{}]", redacted(&self.upstream.auth))?;
        writeln!(f, "\t]")?;
        writeln!(f, "\tdownstream: [")?;
        writeln!(f, "\t\turl: [{}]", self.downstream.url)?;
        writeln!(
            f,
            "\t\thost_header: [{}]",
            self.downstream.host_header.as_deref().unwrap_or_default()
        )?;
        writeln!(
            f,
            "\t\tauth: [{}]",
            redacted(self.downstream.auth.as_deref().unwrap_or_default())
        )?;
        writeln!(
            f,
            "\t\torigin_system_id: [{}]",
            self.downstream.origin_system_id
        )?;
        writeln!(f, "\t]")?;
        write!(f, "]")
    }
}

fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing {
            key: key.to_string(),
        });
    }

    url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        message: format!("{} is not a valid URL ({}): {}", key, value, e),
    })?;

    Ok(())
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Video platform configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Video API base; the account ID and `/videos/{id}` are appended
    pub api_url: String,

    /// OAuth token endpoint
    pub oauth_url: String,

    /// `Authorization` header for the token endpoint,
    /// `Basic base64(client_id:client_secret)`
    pub auth: String,

    /// Account whose notifications are processed
    pub account_id: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://cms.api.brightcove.com/v1/accounts/".to_string(),
            oauth_url: "https://oauth.brightcove.com/v3/access_token".to_string(),
            auth: String::new(),
            account_id: String::new(),
        }
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_url", &self.api_url)
            .field("oauth_url", &self.oauth_url)
            .field("auth", &redacted(&self.auth))
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// CMS notifier configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Base URL; records are posted to `{url}/notify`
    pub url: String,

    /// Optional `Authorization` header
    pub auth: Option<String>,

    /// Optional `Host` header override
    pub host_header: Option<String>,

    /// Value of the `X-Origin-System-Id` header
    pub origin_system_id: String,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:13080".to_string(),
            auth: None,
            host_header: None,
            origin_system_id: DEFAULT_ORIGIN_SYSTEM_ID.to_string(),
        }
    }
}

impl fmt::Debug for DownstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamConfig")
            .field("url", &self.url)
            .field(
                "auth",
                &redacted(self.auth.as_deref().unwrap_or_default()),
            )
            .field("host_header", &self.host_header)
            .field("origin_system_id", &self.origin_system_id)
            .finish()
    }
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_seconds: u64,

    pub timeout_seconds: u64,

    /// Overrides the default `video-notifier/{version}` user agent
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 5,
            timeout_seconds: 30,
            user_agent: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level, used when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
