//! The bootstrap run: readiness, credential, reconciliation, persistence.
//!
//! Each step short-circuits the rest on failure. Nothing already created in
//! the identity provider is rolled back.

use chrono::Local;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::BootstrapConfig;
use crate::credentials::provider_for;
use crate::error::BootstrapResult;
use crate::output;
use crate::persist::{write_auth_config, AuthConfigRecord};
use crate::readiness::{wait_until_ready, HttpProbe};
use crate::reconcile::{reconcile, OutpostUpdate};

/// Runs the whole bootstrap and returns the record that was written.
pub async fn run(config: &BootstrapConfig) -> BootstrapResult<AuthConfigRecord> {
    config.validate()?;
    let credentials = provider_for(config)?;
    let client = ApiClient::new(&config.base_url, config.request_timeout)?;

    wait_until_ready(&HttpProbe::new(client.clone()), &config.readiness).await?;

    // Flows are provisioned shortly after the API starts answering.
    if !config.settle_delay.is_zero() {
        tokio::time::sleep(config.settle_delay).await;
    }

    info!(provider = credentials.name(), "obtaining API credential");
    let credential = credentials.obtain(&client).await?;
    output::success("Authentication successful");

    let api = client.with_token(credential.token());
    let reconciled = match reconcile(&api, &config.resources).await {
        Ok(r) => r,
        Err(e) => {
            if let Some(account) = credential.service_account() {
                warn!(%account, "service account left in place after failed run");
            }
            return Err(e);
        }
    };

    output::success(&format!(
        "Proxy provider {} ({}) for application {} ({})",
        reconciled.provider.id,
        if reconciled.provider.created { "created" } else { "existing" },
        reconciled.application.id,
        if reconciled.application.created { "created" } else { "existing" },
    ));
    if let Some(line) = outpost_summary(reconciled.outpost.as_ref()) {
        output::info(&line);
    }

    let record = AuthConfigRecord::new(
        reconciled.provider.id,
        reconciled.application.id,
        Local::now(),
    );
    let path = write_auth_config(&config.output_dir, &record)?;
    output::success(&format!("Saved configuration to {}", path.display()));

    Ok(record)
}

/// One-line report of the outpost step; `None` when it was skipped or failed.
fn outpost_summary(update: Option<&OutpostUpdate>) -> Option<String> {
    update.map(|u| {
        if u.added {
            format!("Added application to embedded outpost {}", u.outpost_id)
        } else {
            format!("Application already listed by embedded outpost {}", u.outpost_id)
        }
    })
}
