//! Shared outbound HTTP client.
//!
//! One `reqwest::Client` is built at startup and cloned into the credential
//! manager, the fetcher and the forwarder, so all three share a connection
//! pool and the same timeouts.

use std::time::Duration;

use crate::error::ClientError;

/// Configuration for outbound HTTP behavior.
///
/// # Examples
///
/// ```
/// use video_notifier_core::client::HttpClientConfig;
/// use std::time::Duration;
///
/// let config = HttpClientConfig::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_user_agent("video-notifier/test");
/// let client = config.build_client().unwrap();
/// # drop(client);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// User agent string for outbound requests
    pub user_agent: String,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("video-notifier/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpClientConfig {
    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Build` if the TLS backend cannot be initialized.
    pub fn build_client(&self) -> Result<reqwest::Client, ClientError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ClientError::Build {
                message: e.to_string(),
            })
    }
}
