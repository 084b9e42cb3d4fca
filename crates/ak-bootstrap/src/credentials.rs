//! API credential acquisition.
//!
//! Exactly one [`CredentialProvider`] is selected per run from the configured
//! [`AuthStrategy`]. The `fallback` strategy is an explicit chain of client
//! credentials followed by a service account.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::distr::{Alphanumeric, SampleString};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::dto::{Created, FlowLogin, LoginData, NewToken, NewUser, OAuth2Token, TokenKey};
use crate::api::{ApiClient, LOGIN_PATH, OAUTH2_TOKEN_PATH, TOKENS_PATH, USERS_PATH};
use crate::config::{AuthStrategy, BootstrapConfig};
use crate::error::{BootstrapError, BootstrapResult};
use crate::output;

/// Scope requested from the OAuth2 token endpoint.
pub const API_SCOPE: &str = "goauthentik.io/api";

/// Bearer credential for the rest of the run.
#[derive(Clone)]
pub struct Credential {
    token: String,
    service_account: Option<String>,
}

impl Credential {
    /// Wraps a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            service_account: None,
        }
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Username of the service account created to mint this credential.
    pub fn service_account(&self) -> Option<&str> {
        self.service_account.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("service_account", &self.service_account)
            .finish()
    }
}

/// A way of obtaining an API credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Short name used in messages.
    fn name(&self) -> &'static str;

    /// Obtains a credential. `client` is unauthenticated.
    async fn obtain(&self, client: &ApiClient) -> BootstrapResult<Credential>;
}

/// Builds the provider selected by the configuration.
pub fn provider_for(config: &BootstrapConfig) -> BootstrapResult<Box<dyn CredentialProvider>> {
    let auth = &config.auth;
    let admin = || -> BootstrapResult<(String, String)> {
        match (&auth.username, &auth.password) {
            (Some(u), Some(p)) => Ok((u.clone(), p.clone())),
            _ => Err(BootstrapError::Config(
                "AUTHENTIK_ADMIN_USER and AUTHENTIK_ADMIN_PASSWORD are required".to_string(),
            )),
        }
    };

    let provider: Box<dyn CredentialProvider> = match auth.strategy {
        AuthStrategy::BootstrapToken => {
            let token = auth.bootstrap_token.clone().ok_or_else(|| {
                BootstrapError::Config("AUTHENTIK_BOOTSTRAP_TOKEN is required".to_string())
            })?;
            Box::new(BootstrapToken::new(token))
        }
        AuthStrategy::ClientCredentials => {
            let (username, password) = admin()?;
            Box::new(ClientCredentials::new(username, password, auth.client_id.clone()))
        }
        AuthStrategy::ServiceAccount => {
            let (username, password) = admin()?;
            Box::new(ServiceAccount::new(username, password, config.request_timeout))
        }
        AuthStrategy::Fallback => {
            let (username, password) = admin()?;
            let chain: Vec<Box<dyn CredentialProvider>> = vec![
                Box::new(ClientCredentials::new(
                    username.clone(),
                    password.clone(),
                    auth.client_id.clone(),
                )),
                Box::new(ServiceAccount::new(username, password, config.request_timeout)),
            ];
            Box::new(FallbackChain::new(chain))
        }
    };

    Ok(provider)
}

/// Pre-shared token issued when the identity provider starts.
pub struct BootstrapToken {
    token: String,
}

impl BootstrapToken {
    /// Creates the provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BootstrapToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialProvider for BootstrapToken {
    fn name(&self) -> &'static str {
        "bootstrap token"
    }

    async fn obtain(&self, _client: &ApiClient) -> BootstrapResult<Credential> {
        Ok(Credential::new(self.token.clone()))
    }
}

/// OAuth2 client-credentials exchange with the admin's username and password.
pub struct ClientCredentials {
    username: String,
    password: String,
    client_id: Option<String>,
}

impl ClientCredentials {
    /// Creates the provider.
    pub fn new(username: String, password: String, client_id: Option<String>) -> Self {
        Self {
            username,
            password,
            client_id,
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentials {
    fn name(&self) -> &'static str {
        "client credentials"
    }

    async fn obtain(&self, client: &ApiClient) -> BootstrapResult<Credential> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("scope", API_SCOPE),
        ];
        if let Some(client_id) = &self.client_id {
            form.push(("client_id", client_id.as_str()));
        }

        let token: OAuth2Token = client
            .post_form(OAUTH2_TOKEN_PATH, &form)
            .await
            .map_err(|e| BootstrapError::Auth(format!("token exchange failed: {e}")))?;

        debug!(token_type = ?token.token_type, "client-credentials exchange succeeded");
        Ok(Credential::new(token.access_token))
    }
}

/// Session login, service-account creation and token mint.
///
/// The service account is never removed, even if a later step fails.
pub struct ServiceAccount {
    username: String,
    password: String,
    timeout: Duration,
}

impl ServiceAccount {
    /// Creates the provider.
    pub fn new(username: String, password: String, timeout: Duration) -> Self {
        Self {
            username,
            password,
            timeout,
        }
    }

    async fn login(&self, session: &ApiClient) -> BootstrapResult<()> {
        let body = FlowLogin {
            flow: "default-authentication-flow".to_string(),
            component: "ak-stage-identification".to_string(),
            data: LoginData {
                username: self.username.clone(),
                password: self.password.clone(),
            },
        };
        session
            .post_no_response(LOGIN_PATH, &body)
            .await
            .map_err(|e| BootstrapError::Auth(format!("login failed: {e}")))
    }
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccount {
    fn name(&self) -> &'static str {
        "service account"
    }

    async fn obtain(&self, client: &ApiClient) -> BootstrapResult<Credential> {
        let session = ApiClient::session(client.base_url(), self.timeout)?;
        self.login(&session).await?;

        let account = service_account_username();
        let user = NewUser {
            username: account.clone(),
            name: "Initial Setup Service Account".to_string(),
            path: "service-accounts".to_string(),
            groups: Vec::new(),
            is_active: true,
            attributes: json!({ "service_account": true }),
        };
        let created: Created = session
            .post(USERS_PATH, &user)
            .await
            .map_err(|e| BootstrapError::Auth(format!("service account creation failed: {e}")))?;
        info!(username = %account, pk = %created.pk, "created service account");

        let token = NewToken {
            identifier: token_identifier(),
            user: created.pk,
            intent: "api".to_string(),
            expiring: false,
            description: "Initial setup token".to_string(),
        };
        let minted: TokenKey = session
            .post(TOKENS_PATH, &token)
            .await
            .map_err(|e| BootstrapError::Auth(format!("token creation failed: {e}")))?;

        let key = minted.key.ok_or_else(|| {
            BootstrapError::Auth("token creation response carried no key".to_string())
        })?;

        output::success("Created service account and token");
        Ok(Credential {
            token: key,
            service_account: Some(account),
        })
    }
}

/// Tries each provider in order and returns the first credential obtained.
#[derive(Debug)]
pub struct FallbackChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl FallbackChain {
    /// Creates a chain; providers are tried in the given order.
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl CredentialProvider for FallbackChain {
    fn name(&self) -> &'static str {
        "fallback chain"
    }

    async fn obtain(&self, client: &ApiClient) -> BootstrapResult<Credential> {
        let mut last = None;

        for provider in &self.providers {
            match provider.obtain(client).await {
                Ok(credential) => return Ok(credential),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "credential provider failed");
                    output::warning(&format!("{} failed: {}", provider.name(), e));
                    last = Some(e);
                }
            }
        }

        Err(last.unwrap_or_else(|| {
            BootstrapError::Auth("no credential provider configured".to_string())
        }))
    }
}

/// Random service-account username.
fn service_account_username() -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 8);
    format!("init-service-{}", suffix.to_lowercase())
}

/// Random token identifier.
fn token_identifier() -> String {
    format!("init-token-{}", Alphanumeric.sample_string(&mut rand::rng(), 12))
}
