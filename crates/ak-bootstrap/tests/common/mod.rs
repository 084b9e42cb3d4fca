//! In-memory Authentik stand-in built on wiremock.
//!
//! Created applications, providers and outpost changes are remembered, so a
//! second bootstrap run sees the state the first one left behind.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use ak_bootstrap::config::{
    AuthConfig, AuthStrategy, BootstrapConfig, ForwardMode, GroupSelection, ResourceConfig,
};
use ak_bootstrap::readiness::RetryPolicy;

/// Bearer token the mock accepts.
pub const TOKEN: &str = "test-token";

/// Remembered identity-provider state.
#[derive(Debug, Default)]
pub struct State {
    pub groups: Vec<Value>,
    pub applications: Vec<Value>,
    pub providers: Vec<Value>,
    pub outposts: Vec<Value>,
    pub patches: Vec<Value>,
    pub next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

type Shared = Arc<Mutex<State>>;

fn query(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn page(results: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "pagination": { "count": results.len() },
        "results": results
    }))
}

struct ListGroups(Shared);

impl Respond for ListGroups {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let state = self.0.lock().unwrap();
        let name = query(request, "name");
        let results = state
            .groups
            .iter()
            .filter(|g| name.as_deref().map_or(true, |n| g["name"] == n))
            .cloned()
            .collect();
        page(results)
    }
}

struct ListApplications(Shared);

impl Respond for ListApplications {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let state = self.0.lock().unwrap();
        let slug = query(request, "slug");
        let results = state
            .applications
            .iter()
            .filter(|a| slug.as_deref().map_or(true, |s| a["slug"] == s))
            .cloned()
            .collect();
        page(results)
    }
}

struct CreateApplication(Shared);

impl Respond for CreateApplication {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match request.body_json() {
            Ok(b) => b,
            Err(_) => return ResponseTemplate::new(400),
        };
        let mut state = self.0.lock().unwrap();
        let id = state.next_id();
        let app = json!({
            "pk": format!("app-{id}"),
            "slug": body["slug"],
            "name": body["name"],
            "group": body["group"],
            "policy_engine_mode": body["policy_engine_mode"],
            "meta_launch_url": body["meta_launch_url"],
        });
        state.applications.push(app.clone());
        ResponseTemplate::new(201).set_body_json(app)
    }
}

struct ListProviders(Shared);

impl Respond for ListProviders {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let state = self.0.lock().unwrap();
        let application = query(request, "application");
        let results = state
            .providers
            .iter()
            .filter(|p| application.as_deref().map_or(true, |a| p["application"] == a))
            .cloned()
            .collect();
        page(results)
    }
}

struct CreateProvider(Shared);

impl Respond for CreateProvider {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = match request.body_json() {
            Ok(b) => b,
            Err(_) => return ResponseTemplate::new(400),
        };
        let mut state = self.0.lock().unwrap();
        body["pk"] = json!(state.next_id());
        state.providers.push(body.clone());
        ResponseTemplate::new(201).set_body_json(body)
    }
}

struct ListOutposts(Shared);

impl Respond for ListOutposts {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        page(self.0.lock().unwrap().outposts.clone())
    }
}

struct PatchOutpost(Shared);

impl Respond for PatchOutpost {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match request.body_json() {
            Ok(b) => b,
            Err(_) => return ResponseTemplate::new(400),
        };
        let pk = request
            .url
            .path()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let mut state = self.0.lock().unwrap();
        state.patches.push(body.clone());
        let Some(outpost) = state.outposts.iter_mut().find(|o| o["pk"] == pk.as_str()) else {
            return ResponseTemplate::new(404);
        };
        outpost["applications"] = body["applications"].clone();
        outpost["name"] = body["name"].clone();
        let updated = outpost.clone();
        ResponseTemplate::new(200).set_body_json(updated)
    }
}

/// Mock identity provider with remembered state.
pub struct MockAuthentik {
    pub server: MockServer,
    pub state: Shared,
}

impl MockAuthentik {
    /// Starts a server with one group and one embedded outpost.
    pub async fn start() -> Self {
        let state = State {
            groups: vec![
                json!({"pk": "grp-admins", "name": "authentik Admins"}),
                json!({"pk": "grp-users", "name": "users"}),
            ],
            outposts: vec![
                json!({
                    "pk": "ldap-1",
                    "name": "LDAP Outpost",
                    "type": "authentik_outposts.ldap",
                    "applications": []
                }),
                json!({
                    "pk": "embedded-1",
                    "name": "authentik Embedded Outpost",
                    "type": "authentik_outposts.embedded",
                    "applications": ["other-app"]
                }),
            ],
            ..State::default()
        };
        Self::with_state(state).await
    }

    /// Starts a server with the given state.
    pub async fn with_state(state: State) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(state));
        let bearer = format!("Bearer {TOKEN}");

        Mock::given(method("GET"))
            .and(path("/api/v3/core/groups/"))
            .and(header("Authorization", bearer.as_str()))
            .respond_with(ListGroups(state.clone()))
            .mount(&server)
            .await;
        // Readiness probes come without a credential.
        Mock::given(method("GET"))
            .and(path("/api/v3/core/applications/"))
            .respond_with(ListApplications(state.clone()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v3/core/applications/"))
            .and(header("Authorization", bearer.as_str()))
            .respond_with(CreateApplication(state.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/providers/proxy/"))
            .and(header("Authorization", bearer.as_str()))
            .respond_with(ListProviders(state.clone()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v3/providers/proxy/"))
            .and(header("Authorization", bearer.as_str()))
            .respond_with(CreateProvider(state.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v3/outposts/"))
            .and(header("Authorization", bearer.as_str()))
            .respond_with(ListOutposts(state.clone()))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path_regex(r"^/api/v3/outposts/[^/]+/$"))
            .and(header("Authorization", bearer.as_str()))
            .respond_with(PatchOutpost(state.clone()))
            .mount(&server)
            .await;

        Self { server, state }
    }

    /// Base URI of the mock server.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Number of requests received with this method and path.
    pub async fn count(&self, verb: &str, url_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == url_path)
            .count()
    }
}

/// Resource settings matching the defaults of the binary.
pub fn resources(base_domain: &str) -> ResourceConfig {
    ResourceConfig {
        app_slug: "caddy-forward-auth".to_string(),
        app_name: "Caddy Forward Auth".to_string(),
        provider_name: "Caddy Forward Auth Provider".to_string(),
        authorization_flow: "default-provider-authorization-implicit-consent".to_string(),
        authentication_flow: "default-authentication-flow".to_string(),
        internal_host: "http://authentik-server:9000".to_string(),
        base_domain: base_domain.to_string(),
        mode: ForwardMode::Single,
        group: GroupSelection::First,
        register_outpost: true,
    }
}

/// A bootstrap-token configuration against `base_url` with fast retries.
pub fn config(base_url: &str, output_dir: &Path) -> BootstrapConfig {
    BootstrapConfig {
        base_url: base_url.to_string(),
        output_dir: output_dir.to_path_buf(),
        auth: AuthConfig {
            strategy: AuthStrategy::BootstrapToken,
            bootstrap_token: Some(TOKEN.to_string()),
            ..AuthConfig::default()
        },
        resources: resources("example.com"),
        readiness: RetryPolicy {
            max_attempts: 30,
            interval: Duration::from_millis(1),
        },
        settle_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
    }
}
