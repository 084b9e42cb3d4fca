//! HTTP client for the identity provider's REST API.

pub mod dto;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use tracing::debug;

use crate::error::{BootstrapError, BootstrapResult};

/// Applications collection, also used as the readiness endpoint.
pub const APPLICATIONS_PATH: &str = "/api/v3/core/applications/";
/// Groups collection.
pub const GROUPS_PATH: &str = "/api/v3/core/groups/";
/// Users collection.
pub const USERS_PATH: &str = "/api/v3/core/users/";
/// Tokens collection.
pub const TOKENS_PATH: &str = "/api/v3/core/tokens/";
/// Flow executor used for session login.
pub const LOGIN_PATH: &str = "/api/v3/core/auth/flows/";
/// Proxy providers collection.
pub const PROXY_PROVIDERS_PATH: &str = "/api/v3/providers/proxy/";
/// Outposts collection.
pub const OUTPOSTS_PATH: &str = "/api/v3/outposts/";
/// OAuth2 token endpoint.
pub const OAUTH2_TOKEN_PATH: &str = "/application/o/token/";

/// API client for making requests to the identity provider.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Creates an unauthenticated API client.
    pub fn new(base_url: &str, timeout: Duration) -> BootstrapResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Creates a client that keeps session cookies between requests.
    ///
    /// Requests are marked as XHR so the flow executor answers with JSON.
    pub fn session(base_url: &str, timeout: Duration) -> BootstrapResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Returns a copy of this client that sends `token` as a bearer credential.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Makes a GET request and returns only the status code.
    pub async fn status(&self, path: &str) -> Result<StatusCode, reqwest::Error> {
        let url = self.url(path);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Ok(response.status())
    }

    /// Makes a GET request.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> BootstrapResult<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.authorize(self.client.get(&url)).send().await?;
        handle_response(response).await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> BootstrapResult<T> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Makes a POST request with a JSON body, ignoring the response body.
    pub async fn post_no_response<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> BootstrapResult<()> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        handle_empty_response(response).await
    }

    /// Makes a form-encoded POST request.
    pub async fn post_form<B: serde::Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &B,
    ) -> BootstrapResult<T> {
        let url = self.url(path);
        debug!(%url, "POST (form)");
        let response = self
            .authorize(self.client.post(&url))
            .form(form)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Makes a PATCH request.
    pub async fn patch<B: serde::Serialize>(&self, path: &str, body: &B) -> BootstrapResult<()> {
        let url = self.url(path);
        debug!(%url, "PATCH");
        let response = self
            .authorize(self.client.patch(&url))
            .json(body)
            .send()
            .await?;
        handle_empty_response(response).await
    }
}

/// Handles a response with a body.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> BootstrapResult<T> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(BootstrapError::Http)
    } else {
        Err(api_error(response).await)
    }
}

/// Handles a response without a body.
async fn handle_empty_response(response: reqwest::Response) -> BootstrapResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: reqwest::Response) -> BootstrapError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    BootstrapError::Api { status, message }
}
