//! Readiness polling.
//!
//! The identity provider counts as up once it answers a plain GET with
//! anything below 500; an authentication-required 4xx is still an answer.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::{ApiClient, APPLICATIONS_PATH};
use crate::error::{BootstrapError, BootstrapResult};
use crate::output;

/// Fixed-interval retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of probes.
    pub max_attempts: u32,
    /// Delay between consecutive probes.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The service answered with this status.
    Ready(u16),
    /// Server error or no answer at all.
    NotReady(String),
}

/// Something that can be asked whether the identity provider is up.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Performs one probe.
    async fn probe(&self) -> ProbeOutcome;
}

/// Probes the applications collection over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: ApiClient,
}

impl HttpProbe {
    /// Creates a probe using an unauthenticated client.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn probe(&self) -> ProbeOutcome {
        match self.client.status(APPLICATIONS_PATH).await {
            Ok(status) if status.as_u16() < 500 => ProbeOutcome::Ready(status.as_u16()),
            Ok(status) => ProbeOutcome::NotReady(format!("server answered {}", status)),
            Err(e) => ProbeOutcome::NotReady(e.to_string()),
        }
    }
}

/// Probes until the service is ready or the attempts are used up.
///
/// Returns the number of the attempt that succeeded. The delay is applied
/// between attempts only, so a failing run takes `(max_attempts - 1) * interval`.
pub async fn wait_until_ready<P>(probe: &P, policy: &RetryPolicy) -> BootstrapResult<u32>
where
    P: ReadinessProbe + ?Sized,
{
    output::info("Waiting for Authentik to be ready...");

    for attempt in 1..=policy.max_attempts {
        match probe.probe().await {
            ProbeOutcome::Ready(status) => {
                info!(attempt, status, "identity provider is ready");
                output::success("Authentik is ready");
                return Ok(attempt);
            }
            ProbeOutcome::NotReady(reason) => {
                debug!(attempt, %reason, "identity provider not ready");
                output::info(&format!("Retry {}/{}...", attempt, policy.max_attempts));
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(BootstrapError::ReadinessTimeout {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes, then keeps failing.
    struct ScriptedProbe {
        outcomes: Mutex<VecDeque<ProbeOutcome>>,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(outcomes: Vec<ProbeOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReadinessProbe for ScriptedProbe {
        async fn probe(&self) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ProbeOutcome::NotReady("503".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_answer_below_500() {
        let probe = ScriptedProbe::new(vec![
            ProbeOutcome::NotReady("connection refused".into()),
            ProbeOutcome::NotReady("server answered 502".into()),
            ProbeOutcome::Ready(401),
            ProbeOutcome::Ready(200),
        ]);
        let policy = RetryPolicy::default();

        let start = tokio::time::Instant::now();
        let attempt = wait_until_ready(&probe, &policy).await.unwrap();

        assert_eq!(attempt, 3);
        assert_eq!(probe.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_exactly_max_attempts() {
        let probe = ScriptedProbe::new(Vec::new());
        let policy = RetryPolicy::default();

        let start = tokio::time::Instant::now();
        let err = wait_until_ready(&probe, &policy).await.unwrap_err();

        assert!(matches!(err, BootstrapError::ReadinessTimeout { attempts: 30 }));
        assert_eq!(probe.calls(), 30);
        assert_eq!(start.elapsed(), Duration::from_secs(29 * 10));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_first_probe_does_not_sleep() {
        let probe = ScriptedProbe::new(vec![ProbeOutcome::Ready(200)]);
        let start = tokio::time::Instant::now();

        assert_eq!(wait_until_ready(&probe, &RetryPolicy::default()).await.unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
