//! Request and response records for the Authentik REST API.
//!
//! Only the fields the bootstrap run reads or writes are modelled; unknown
//! fields in responses are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ForwardMode;

/// Primary key of an identity-provider entity.
///
/// Applications and groups use UUID strings while providers, users and
/// outposts may use integers, depending on the server version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pk {
    /// Integer key.
    Int(i64),
    /// String key (usually a UUID).
    Str(String),
}

impl fmt::Display for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Pk {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for Pk {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Paginated listing envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    /// Items on the first page.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Object carrying only a primary key, as returned by create calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    /// Primary key of the new entity.
    pub pk: Pk,
}

/// Group entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Primary key.
    pub pk: Pk,
    /// Group name.
    #[serde(default)]
    pub name: String,
}

/// Application entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Primary key.
    pub pk: Pk,
    /// Unique slug.
    pub slug: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Request to create an application.
#[derive(Debug, Clone, Serialize)]
pub struct NewApplication {
    /// Display name.
    pub name: String,
    /// Unique slug.
    pub slug: String,
    /// Linked provider; left empty on creation.
    pub provider: Option<Pk>,
    /// Launch URL shown in the user library.
    pub meta_launch_url: String,
    /// Policy engine mode.
    pub policy_engine_mode: String,
    /// Owning group.
    pub group: Option<Pk>,
}

/// Proxy provider entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyProvider {
    /// Primary key.
    pub pk: Pk,
    /// Provider name.
    #[serde(default)]
    pub name: String,
    /// Linked application, when the server reports it.
    #[serde(default)]
    pub application: Option<Pk>,
}

/// Request to create a forward-auth proxy provider.
#[derive(Debug, Clone, Serialize)]
pub struct NewProxyProvider {
    /// Provider name.
    pub name: String,
    /// Authorization flow reference.
    pub authorization_flow: String,
    /// Authentication flow reference.
    pub authentication_flow: String,
    /// URL the outpost uses to reach the identity provider.
    pub internal_host: String,
    /// Public URL of the identity provider.
    pub external_host: String,
    /// Forward-auth mode.
    pub mode: ForwardMode,
    /// Cookie domain, required for whole-domain forwarding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_domain: Option<String>,
    /// Owning application.
    pub application: Pk,
}

/// Outpost entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outpost {
    /// Primary key.
    pub pk: Pk,
    /// Outpost name.
    pub name: String,
    /// Outpost type, e.g. `authentik_outposts.embedded`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Applications routed through this outpost.
    #[serde(default)]
    pub applications: Vec<Pk>,
}

impl Outpost {
    /// Type marker of the built-in outpost.
    pub const EMBEDDED_TYPE: &'static str = "authentik_outposts.embedded";

    /// Whether this is the built-in embedded outpost.
    pub fn is_embedded(&self) -> bool {
        self.kind.as_deref() == Some(Self::EMBEDDED_TYPE)
    }
}

/// Partial update of an outpost.
#[derive(Debug, Clone, Serialize)]
pub struct OutpostPatch {
    /// Full application list after the update.
    pub applications: Vec<Pk>,
    /// Unchanged name; the API requires it on update.
    pub name: String,
}

/// Session login through the flow executor.
#[derive(Debug, Clone, Serialize)]
pub struct FlowLogin {
    /// Flow slug.
    pub flow: String,
    /// Stage component.
    pub component: String,
    /// Stage payload.
    pub data: LoginData,
}

/// Username and password for [`FlowLogin`].
#[derive(Clone, Serialize)]
pub struct LoginData {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for LoginData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginData")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Request to create a user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    /// Username.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Directory path of the user.
    pub path: String,
    /// Group memberships.
    pub groups: Vec<Pk>,
    /// Whether the account can log in.
    pub is_active: bool,
    /// Free-form attributes.
    pub attributes: Value,
}

/// Request to mint an API token.
#[derive(Debug, Clone, Serialize)]
pub struct NewToken {
    /// Unique token identifier.
    pub identifier: String,
    /// Owning user.
    pub user: Pk,
    /// Token intent.
    pub intent: String,
    /// Whether the token expires.
    pub expiring: bool,
    /// Description shown in the admin interface.
    pub description: String,
}

/// Minted token; `key` is the bearer secret.
#[derive(Deserialize)]
pub struct TokenKey {
    /// Secret key.
    pub key: Option<String>,
}

/// OAuth2 token endpoint response.
#[derive(Deserialize)]
pub struct OAuth2Token {
    /// Access token.
    pub access_token: String,
    /// Token type, normally `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}
