//! Idempotent reconciliation of the forward-auth resources.
//!
//! Every resource is looked up before it is created, so a second run against
//! the same identity provider reuses what the first one made. The lookups and
//! creates are separate requests; two runs racing each other can still both
//! create.

use tracing::{info, warn};

use crate::api::dto::{
    Application, Created, Group, NewApplication, NewProxyProvider, Outpost, OutpostPatch,
    Paginated, Pk, ProxyProvider,
};
use crate::api::{ApiClient, APPLICATIONS_PATH, GROUPS_PATH, OUTPOSTS_PATH, PROXY_PROVIDERS_PATH};
use crate::config::{ForwardMode, GroupSelection, ResourceConfig};
use crate::error::{BootstrapError, BootstrapResult};
use crate::output;

/// An identifier together with whether this run created the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Primary key.
    pub id: Pk,
    /// `true` if the entity did not exist before this run.
    pub created: bool,
}

impl Resolved {
    fn existing(id: Pk) -> Self {
        Self { id, created: false }
    }

    fn new(id: Pk) -> Self {
        Self { id, created: true }
    }
}

/// Result of registering an application with the embedded outpost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutpostUpdate {
    /// Outpost primary key.
    pub outpost_id: Pk,
    /// `false` if the application was already in the outpost's list.
    pub added: bool,
}

/// Outcome of a full reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// The forward-auth application.
    pub application: Resolved,
    /// The proxy provider.
    pub provider: Resolved,
    /// Outpost registration, if it was attempted and succeeded.
    pub outpost: Option<OutpostUpdate>,
}

/// Reconciles group, application, provider and outpost registration.
///
/// Failures are fatal except for the outpost step, which only warns.
pub async fn reconcile(client: &ApiClient, resources: &ResourceConfig) -> BootstrapResult<Reconciled> {
    let group = resolve_group(client, &resources.group).await?;
    let application = ensure_application(client, resources, group).await?;
    let provider = ensure_provider(client, resources, &application.id).await?;

    let outpost = if resources.register_outpost {
        match register_with_outpost(client, &application.id).await {
            Ok(update) => Some(update),
            Err(e) => {
                warn!(error = %e, "embedded outpost update failed");
                output::warning(&format!(
                    "Failed to update embedded outpost, forward auth may not work properly: {}",
                    e
                ));
                None
            }
        }
    } else {
        None
    };

    Ok(Reconciled {
        application,
        provider,
        outpost,
    })
}

/// Resolves the group that owns the application.
///
/// With [`GroupSelection::First`] the first listed group wins; the listing
/// order is whatever the server returns.
pub async fn resolve_group(
    client: &ApiClient,
    selection: &GroupSelection,
) -> BootstrapResult<Option<Pk>> {
    let group = match selection {
        GroupSelection::Skip => return Ok(None),
        GroupSelection::First => {
            let page: Paginated<Group> = client.get(GROUPS_PATH).await?;
            page.results
                .into_iter()
                .next()
                .ok_or_else(|| BootstrapError::not_found("Group", "any"))?
        }
        GroupSelection::Named(name) => {
            let path = format!("{}?name={}", GROUPS_PATH, urlencoding::encode(name));
            let page: Paginated<Group> = client.get(&path).await?;
            page.results
                .into_iter()
                .find(|g| &g.name == name)
                .ok_or_else(|| BootstrapError::not_found("Group", name.as_str()))?
        }
    };

    info!(pk = %group.pk, name = %group.name, "resolved owning group");
    Ok(Some(group.pk))
}

/// Finds an application by slug.
pub async fn find_application(client: &ApiClient, slug: &str) -> BootstrapResult<Option<Application>> {
    let path = format!("{}?slug={}", APPLICATIONS_PATH, urlencoding::encode(slug));
    let page: Paginated<Application> = client.get(&path).await?;
    Ok(page.results.into_iter().find(|a| a.slug == slug))
}

/// Looks up the application by slug and creates it if absent.
pub async fn ensure_application(
    client: &ApiClient,
    resources: &ResourceConfig,
    group: Option<Pk>,
) -> BootstrapResult<Resolved> {
    if let Some(existing) = find_application(client, &resources.app_slug).await? {
        output::info(&format!(
            "Application '{}' already exists, reusing it",
            resources.app_slug
        ));
        return Ok(Resolved::existing(existing.pk));
    }

    output::info("Creating application...");
    let request = NewApplication {
        name: resources.app_name.clone(),
        slug: resources.app_slug.clone(),
        provider: None,
        meta_launch_url: String::new(),
        policy_engine_mode: "all".to_string(),
        group,
    };
    let created: Created = client.post(APPLICATIONS_PATH, &request).await?;
    info!(pk = %created.pk, slug = %resources.app_slug, "created application");
    Ok(Resolved::new(created.pk))
}

/// Finds the proxy provider attached to `application`.
///
/// An entry whose `application` equals the pk always matches. For servers
/// that do not echo `application`, the name is only trusted when the filtered
/// listing holds a single entry: a longer listing means the filter was
/// ignored, and a same-named provider left over from a deleted application
/// would otherwise be reused and written to the output file.
pub async fn find_provider(
    client: &ApiClient,
    application: &Pk,
    name: &str,
) -> BootstrapResult<Option<ProxyProvider>> {
    let path = format!(
        "{}?application={}",
        PROXY_PROVIDERS_PATH,
        urlencoding::encode(&application.to_string())
    );
    let page: Paginated<ProxyProvider> = client.get(&path).await?;

    if let Some(pos) = page
        .results
        .iter()
        .position(|p| p.application.as_ref() == Some(application))
    {
        return Ok(page.results.into_iter().nth(pos));
    }

    let mut results = page.results;
    if results.len() > 1 {
        warn!(
            candidates = results.len(),
            "provider listing not filtered by application, ignoring name matches"
        );
        return Ok(None);
    }
    Ok(results
        .pop()
        .filter(|p| p.application.is_none() && p.name == name))
}

/// Looks up the provider for `application` and creates it if absent.
pub async fn ensure_provider(
    client: &ApiClient,
    resources: &ResourceConfig,
    application: &Pk,
) -> BootstrapResult<Resolved> {
    if let Some(existing) = find_provider(client, application, &resources.provider_name).await? {
        output::info(&format!(
            "Provider for application {} already exists, reusing it",
            application
        ));
        return Ok(Resolved::existing(existing.pk));
    }

    output::info("Creating provider...");
    let request = NewProxyProvider {
        name: resources.provider_name.clone(),
        authorization_flow: resources.authorization_flow.clone(),
        authentication_flow: resources.authentication_flow.clone(),
        internal_host: resources.internal_host.clone(),
        external_host: resources.external_host(),
        mode: resources.mode,
        cookie_domain: match resources.mode {
            ForwardMode::Domain => Some(resources.base_domain.clone()),
            ForwardMode::Single => None,
        },
        application: application.clone(),
    };
    let created: Created = client.post(PROXY_PROVIDERS_PATH, &request).await?;
    info!(pk = %created.pk, mode = resources.mode.as_api_str(), "created proxy provider");
    Ok(Resolved::new(created.pk))
}

/// Adds `application` to the embedded outpost's application list.
///
/// Read-modify-write without concurrency control: a concurrent writer to the
/// same outpost can lose its update.
pub async fn register_with_outpost(
    client: &ApiClient,
    application: &Pk,
) -> BootstrapResult<OutpostUpdate> {
    output::info("Updating embedded outpost...");

    let page: Paginated<Outpost> = client.get(OUTPOSTS_PATH).await?;
    let outpost = page
        .results
        .into_iter()
        .find(Outpost::is_embedded)
        .ok_or_else(|| BootstrapError::not_found("Outpost", Outpost::EMBEDDED_TYPE))?;

    let mut applications = outpost.applications;
    let added = !applications.contains(application);
    if added {
        applications.push(application.clone());
    }

    let patch = OutpostPatch {
        applications,
        name: outpost.name,
    };
    client
        .patch(&format!("{}{}/", OUTPOSTS_PATH, outpost.pk), &patch)
        .await?;

    Ok(OutpostUpdate {
        outpost_id: outpost.pk,
        added,
    })
}
