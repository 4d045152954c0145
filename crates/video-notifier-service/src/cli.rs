//! Command-line options and configuration loading.
//!
//! Configuration sources, later ones overriding earlier ones:
//!  1. Built-in defaults of [`ServiceConfig`]
//!  2. A YAML file named by `--config-file` or `NOTIFIER_CONFIG_FILE`
//!  3. Environment variables prefixed `NOTIFIER__` (double-underscore
//!     separator), e.g. `NOTIFIER__SERVER__PORT=9090`
//!  4. The command-line options below, each of which can also be set
//!     through its own environment variable (`PORT`, `BRIGHTCOVE`, ...)

use clap::Parser;
use std::path::PathBuf;
use video_notifier_api::{ConfigError, ServiceConfig};

/// Prefix of layered configuration environment variables
pub const ENV_PREFIX: &str = "NOTIFIER";

#[derive(Debug, Default, Parser)]
#[command(name = "video-notifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Gets notified about video events, enriches the video and posts it to the CMS notifier"
)]
pub struct Args {
    /// YAML configuration file
    #[arg(long, env = "NOTIFIER_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Application port
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Video API address, e.g. https://cms.api.brightcove.com/v1/accounts/
    #[arg(long, env = "BRIGHTCOVE")]
    pub brightcove: Option<String>,

    /// OAuth token endpoint address
    #[arg(long, env = "BRIGHTCOVE_OAUTH")]
    pub brightcove_oauth: Option<String>,

    /// OAuth authorization header, `Basic base64(clientId:clientSecret)`
    #[arg(long, env = "BRIGHTCOVE_AUTH", hide_env_values = true)]
    pub brightcove_auth: Option<String>,

    /// Account whose video events are processed
    #[arg(long, env = "BRIGHTCOVE_ACCOUNT_ID")]
    pub brightcove_account_id: Option<String>,

    /// CMS notifier address
    #[arg(long, env = "CMS_NOTIFIER")]
    pub cms_notifier: Option<String>,

    /// CMS notifier authorization header
    #[arg(long, env = "CMS_NOTIFIER_AUTH", hide_env_values = true)]
    pub cms_notifier_auth: Option<String>,

    /// CMS notifier host header
    #[arg(long, env = "CMS_NOTIFIER_HOST_HEADER")]
    pub cms_notifier_host_header: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSON structured logs
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Apply explicitly given options on top of `config`
    pub fn apply_overrides(&self, config: &mut ServiceConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(api_url) = &self.brightcove {
            config.upstream.api_url = api_url.clone();
        }
        if let Some(oauth_url) = &self.brightcove_oauth {
            config.upstream.oauth_url = oauth_url.clone();
        }
        if let Some(auth) = &self.brightcove_auth {
            config.upstream.auth = auth.clone();
        }
        if let Some(account_id) = &self.brightcove_account_id {
            config.upstream.account_id = account_id.clone();
        }
        if let Some(url) = &self.cms_notifier {
            config.downstream.url = url.clone();
        }
        if let Some(auth) = &self.cms_notifier_auth {
            config.downstream.auth = Some(auth.clone()).filter(|a| !a.is_empty());
        }
        if let Some(host) = &self.cms_notifier_host_header {
            config.downstream.host_header = Some(host.clone()).filter(|h| !h.is_empty());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.json_format = true;
        }
    }
}

/// Build the service configuration from every source.
///
/// Absent files and an unconfigured environment produce the built-in
/// defaults. A malformed file, or an environment variable that cannot be
/// coerced to the field type, is an error.
pub fn load_service_config(args: &Args) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = &args.config_file {
        builder = builder.add_source(
            config::File::from(path.as_path())
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let layered = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })?;

    let mut service_config: ServiceConfig =
        layered.try_deserialize().map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })?;

    args.apply_overrides(&mut service_config);

    Ok(service_config)
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
