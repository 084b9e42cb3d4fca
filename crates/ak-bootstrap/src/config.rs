//! Bootstrap configuration.
//!
//! The configuration is assembled once from the command line and environment,
//! validated, and then passed by reference into every step of the run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{BootstrapError, BootstrapResult};
use crate::readiness::RetryPolicy;

/// Name of the file written into the output directory.
pub const AUTH_CONFIG_FILE: &str = "auth_config.json";

/// Credential acquisition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AuthStrategy {
    /// Use the pre-shared bootstrap token.
    #[default]
    BootstrapToken,
    /// Exchange the admin credentials at the OAuth2 token endpoint.
    ClientCredentials,
    /// Log in, create a service account and mint a token for it.
    ServiceAccount,
    /// Try client credentials, then fall back to a service account.
    Fallback,
}

/// Forward-auth mode of the proxy provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ForwardMode {
    /// Forward auth for a single host.
    #[default]
    #[serde(rename = "forward_single")]
    Single,
    /// Forward auth for the entire domain.
    #[serde(rename = "forward_domain")]
    Domain,
}

impl ForwardMode {
    /// Returns the value the identity provider expects in the `mode` field.
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Single => "forward_single",
            Self::Domain => "forward_domain",
        }
    }
}

/// Secret inputs for credential acquisition.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Selected strategy.
    pub strategy: AuthStrategy,
    /// Pre-shared bootstrap token.
    pub bootstrap_token: Option<String>,
    /// Administrator username.
    pub username: Option<String>,
    /// Administrator password.
    pub password: Option<String>,
    /// OAuth2 client ID for the client-credentials exchange.
    pub client_id: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("strategy", &self.strategy)
            .field("bootstrap_token", &self.bootstrap_token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Which group owns the application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupSelection {
    /// First group the identity provider lists.
    #[default]
    First,
    /// Group with this exact name.
    Named(String),
    /// No owning group.
    Skip,
}

/// Desired state of the forward-auth application and provider.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Application slug.
    pub app_slug: String,
    /// Application display name.
    pub app_name: String,
    /// Proxy provider name.
    pub provider_name: String,
    /// Authorization flow slug.
    pub authorization_flow: String,
    /// Authentication flow slug.
    pub authentication_flow: String,
    /// URL the outpost uses to reach the identity provider.
    pub internal_host: String,
    /// Base domain; the external host is `https://auth.<base_domain>`.
    pub base_domain: String,
    /// Forward-auth mode.
    pub mode: ForwardMode,
    /// Owning group.
    pub group: GroupSelection,
    /// Register the application with the embedded outpost.
    pub register_outpost: bool,
}

impl ResourceConfig {
    /// External host the provider is reachable on.
    pub fn external_host(&self) -> String {
        format!("https://auth.{}", self.base_domain)
    }
}

/// Complete, validated bootstrap configuration.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Identity provider base URL without a trailing slash.
    pub base_url: String,
    /// Directory the auth config file is written to.
    pub output_dir: PathBuf,
    /// Credential inputs.
    pub auth: AuthConfig,
    /// Resources to reconcile.
    pub resources: ResourceConfig,
    /// Readiness probe schedule.
    pub readiness: RetryPolicy,
    /// Pause between readiness and the first authenticated call.
    pub settle_delay: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl BootstrapConfig {
    /// Builds and validates the configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> BootstrapResult<Self> {
        let base_url = required(cli.url.as_deref(), "--url", "AUTHENTIK_URL")?
            .trim_end_matches('/')
            .to_string();
        let base_domain = required(cli.base_domain.as_deref(), "--base-domain", "BASE_DOMAIN")?;
        let output_dir = required(cli.output_dir.as_deref(), "--output-dir", "CADDY_CONFIG_PATH")?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BootstrapError::Config(format!(
                "AUTHENTIK_URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        let group = if cli.no_group {
            GroupSelection::Skip
        } else {
            match cli.owner_group.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => GroupSelection::Named(name.to_string()),
                _ => GroupSelection::First,
            }
        };

        let config = Self {
            base_url,
            output_dir: PathBuf::from(output_dir),
            auth: AuthConfig {
                strategy: cli.auth_strategy,
                bootstrap_token: non_empty(cli.bootstrap_token.as_deref()),
                username: non_empty(cli.admin_user.as_deref()),
                password: non_empty(cli.admin_password.as_deref()),
                client_id: non_empty(cli.client_id.as_deref()),
            },
            resources: ResourceConfig {
                app_slug: cli.app_slug.clone(),
                app_name: cli.app_name.clone(),
                provider_name: cli.provider_name.clone(),
                authorization_flow: cli.authorization_flow.clone(),
                authentication_flow: cli.authentication_flow.clone(),
                internal_host: cli.internal_host.clone(),
                base_domain,
                mode: cli.forward_mode,
                group,
                register_outpost: !cli.no_outpost,
            },
            readiness: RetryPolicy {
                max_attempts: cli.max_attempts,
                interval: Duration::from_secs(cli.retry_interval_secs),
            },
            settle_delay: Duration::from_secs(cli.settle_secs),
            request_timeout: Duration::from_secs(cli.timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// Called by [`BootstrapConfig::from_cli`]; exposed for configurations
    /// assembled by hand.
    pub fn validate(&self) -> BootstrapResult<()> {
        if self.readiness.max_attempts == 0 {
            return Err(BootstrapError::Config(
                "--max-attempts must be at least 1".to_string(),
            ));
        }
        if self.resources.base_domain.trim().is_empty() {
            return Err(BootstrapError::Config("BASE_DOMAIN is empty".to_string()));
        }

        match self.auth.strategy {
            AuthStrategy::BootstrapToken => {
                if self.auth.bootstrap_token.is_none() {
                    return Err(BootstrapError::Config(
                        "AUTHENTIK_BOOTSTRAP_TOKEN is required for the bootstrap-token strategy"
                            .to_string(),
                    ));
                }
            }
            AuthStrategy::ClientCredentials
            | AuthStrategy::ServiceAccount
            | AuthStrategy::Fallback => {
                if self.auth.username.is_none() || self.auth.password.is_none() {
                    return Err(BootstrapError::Config(
                        "AUTHENTIK_ADMIN_USER and AUTHENTIK_ADMIN_PASSWORD are required for this strategy"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn required(value: Option<&str>, flag: &str, env: &str) -> BootstrapResult<String> {
    non_empty(value)
        .ok_or_else(|| BootstrapError::Config(format!("{} ({}) is required", env, flag)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}
