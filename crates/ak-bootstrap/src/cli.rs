//! CLI argument parsing.
//!
//! Every option can also be supplied through the environment, which is how the
//! container entrypoint normally configures the bootstrap run.

use clap::Parser;

use crate::config::{AuthStrategy, ForwardMode};

/// Bootstraps forward-auth resources in Authentik for a reverse proxy.
#[derive(Debug, Parser)]
#[command(name = "ak-bootstrap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Identity provider base URL (e.g., http://authentik-server:9000).
    #[arg(long, env = "AUTHENTIK_URL")]
    pub url: Option<String>,

    /// Base domain used to build the external host name.
    #[arg(long, env = "BASE_DOMAIN")]
    pub base_domain: Option<String>,

    /// Directory the reverse-proxy configuration is written to.
    #[arg(long, env = "CADDY_CONFIG_PATH")]
    pub output_dir: Option<String>,

    /// How the API credential is obtained.
    #[arg(long, value_enum, env = "AUTHENTIK_AUTH_STRATEGY", default_value = "bootstrap-token")]
    pub auth_strategy: AuthStrategy,

    /// Pre-shared bootstrap token.
    #[arg(long, env = "AUTHENTIK_BOOTSTRAP_TOKEN", hide_env_values = true)]
    pub bootstrap_token: Option<String>,

    /// Administrator username.
    #[arg(long, env = "AUTHENTIK_ADMIN_USER")]
    pub admin_user: Option<String>,

    /// Administrator password.
    #[arg(long, env = "AUTHENTIK_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// OAuth2 client ID sent with the client-credentials exchange.
    #[arg(long, env = "AUTHENTIK_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Forward a single host or the entire domain.
    #[arg(long, value_enum, env = "FORWARD_AUTH_MODE", default_value = "single")]
    pub forward_mode: ForwardMode,

    /// URL the outpost uses to reach the identity provider.
    #[arg(
        long,
        env = "AUTHENTIK_INTERNAL_HOST",
        default_value = "http://authentik-server:9000"
    )]
    pub internal_host: String,

    /// Authorization flow slug for the provider.
    #[arg(
        long,
        env = "AUTHENTIK_AUTHORIZATION_FLOW",
        default_value = "default-provider-authorization-implicit-consent"
    )]
    pub authorization_flow: String,

    /// Authentication flow slug for the provider.
    #[arg(
        long,
        env = "AUTHENTIK_AUTHENTICATION_FLOW",
        default_value = "default-authentication-flow"
    )]
    pub authentication_flow: String,

    /// Application slug.
    #[arg(long, env = "APP_SLUG", default_value = "caddy-forward-auth")]
    pub app_slug: String,

    /// Application display name.
    #[arg(long, env = "APP_NAME", default_value = "Caddy Forward Auth")]
    pub app_name: String,

    /// Proxy provider name.
    #[arg(long, env = "PROVIDER_NAME", default_value = "Caddy Forward Auth Provider")]
    pub provider_name: String,

    /// Name of the group that owns the application (first listed group if unset).
    #[arg(long, env = "APP_OWNER_GROUP")]
    pub owner_group: Option<String>,

    /// Create the application without an owning group.
    #[arg(long, conflicts_with = "owner_group")]
    pub no_group: bool,

    /// Skip registering the application with the embedded outpost.
    #[arg(long)]
    pub no_outpost: bool,

    /// Readiness probe attempts.
    #[arg(long, default_value = "30")]
    pub max_attempts: u32,

    /// Seconds between readiness probes.
    #[arg(long, default_value = "10")]
    pub retry_interval_secs: u64,

    /// Seconds to wait after the identity provider is reachable.
    #[arg(long, default_value = "5")]
    pub settle_secs: u64,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}
