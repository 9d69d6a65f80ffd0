use anyhow::{Context, Result};
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Build the shared HTTP client. The timeout bounds every request so a hung
/// upstream surfaces as an error instead of blocking the run.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("nrfi-predictor/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[cfg(test)]
    pub fn none() -> Self {
        RetryPolicy {
            retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff with up to 50% random jitter.
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_ms = (base.as_millis() / 2) as u64;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };
        base + Duration::from_millis(jitter)
    }
}

/// GET a JSON document, retrying transport errors, 429s and 5xx responses.
/// Other 4xx responses fail immediately.
pub async fn get_json(http: &Client, url: &str, policy: RetryPolicy) -> Result<serde_json::Value> {
    let mut attempt = 0u32;
    loop {
        debug!("GET {} (attempt {})", url, attempt + 1);
        let err = match http.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON from {}", url));
                }
                let retryable = status.is_server_error() || status.as_u16() == 429;
                if !retryable {
                    anyhow::bail!("{} returned {}", url, status);
                }
                anyhow::anyhow!("{} returned {}", url, status)
            }
            Err(e) => anyhow::Error::new(e).context(format!("Request to {} failed", url)),
        };

        if attempt >= policy.retries {
            return Err(err);
        }
        let delay = policy.delay_for(attempt);
        warn!("{:#}; retrying in {:?}", err, delay);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
