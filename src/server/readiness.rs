//! Readiness polling
//!
//! Probes `GET /v1/models` at a fixed interval until the server answers with
//! a success status or the wait budget is spent. No backoff.

use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

/// Fixed-interval polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Delay between two probes
    pub interval: Duration,
    /// Total time to wait before giving up
    pub timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

/// URL polled to decide whether a server accepts requests
pub fn health_url(base_url: &str) -> String {
    format!("{}/v1/models", base_url.trim_end_matches('/'))
}

/// Wait until the server at `base_url` answers the health probe.
///
/// Returns `Error::ReadyTimeout` once `policy.timeout` has elapsed without a
/// successful probe.
pub async fn wait_for_server(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    policy: &ReadinessPolicy,
) -> Result<()> {
    wait_until(client, base_url, api_key, policy, || Ok(())).await
}

/// Poll loop shared with `ServerHandle::wait_until_ready`.
///
/// `still_alive` runs before every probe; an error from it ends the wait
/// immediately.
#[instrument(skip(client, api_key, policy, still_alive), fields(url = %health_url(base_url)))]
pub(crate) async fn wait_until<F>(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    policy: &ReadinessPolicy,
    mut still_alive: F,
) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let url = health_url(base_url);
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        still_alive()?;
        attempts += 1;

        let remaining = policy.timeout.saturating_sub(start.elapsed());
        if probe(client, &url, api_key, remaining).await {
            info!(
                attempts = attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Server is ready"
            );
            return Ok(());
        }

        let waited = start.elapsed();
        if waited >= policy.timeout {
            warn!(attempts = attempts, waited_ms = waited.as_millis() as u64, "Server readiness timed out");
            return Err(Error::ReadyTimeout { url, waited });
        }

        tokio::time::sleep(policy.interval.min(policy.timeout - waited)).await;
    }
}

/// Issue one health probe; any failure means "not ready yet"
async fn probe(client: &reqwest::Client, url: &str, api_key: &str, budget: Duration) -> bool {
    let result = client
        .get(url)
        .header(AUTHORIZATION, format!("Bearer {}", api_key))
        .timeout(budget.max(Duration::from_millis(100)))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            debug!(status = %response.status(), "Health probe returned non-success status");
            false
        }
        Err(e) => {
            debug!(error = %e, "Health probe failed");
            false
        }
    }
}
