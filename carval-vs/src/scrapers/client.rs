//! Shared HTTP discipline for scraper adapters
//!
//! Every adapter owns one `ScrapeClient`: a rate limiter scoped to that
//! instance (no cross-source interference), bounded exponential-backoff
//! retry on transient failures, and immediate surfacing of 4xx responses
//! as [`ScrapeError::Blocked`].

use super::ScrapeError;
use carval_common::config::ScrapeConfig;
use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Browser user-agent pool; one is picked per client instance
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Exponential backoff bounds between retry attempts
const BACKOFF_BASE_MS: u64 = 2_000;
const BACKOFF_CAP_MS: u64 = 10_000;

/// Random jitter added on top of the minimum inter-request delay
const JITTER_MAX_MS: u64 = 500;

/// Rate limiter enforcing a minimum inter-request delay per instance
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=JITTER_MAX_MS));
                let wait_time = self.min_interval - elapsed + jitter;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// HTTP client with scraper discipline, one per adapter instance
pub struct ScrapeClient {
    name: &'static str,
    http: reqwest::Client,
    limiter: RateLimiter,
    max_attempts: u32,
}

impl ScrapeClient {
    pub fn new(name: &'static str, config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let user_agent = USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())];

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .expect("static header value"),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.9".parse().expect("static header value"),
        );

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScrapeError::Transient(e.to_string()))?;

        Ok(Self {
            name,
            http,
            limiter: RateLimiter::new(config.rate_limit_ms),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Fetch a page of HTML, rate-limited and retried.
    ///
    /// Timeouts, connect failures, and 5xx responses are retried with
    /// exponential backoff up to the attempt bound; 4xx responses fail
    /// immediately, since a bad query or blocked client is structural, not
    /// transient.
    pub async fn get_html(&self, url: &str) -> Result<String, ScrapeError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            self.limiter.wait().await;

            debug!(source = %self.name, url = %url, attempt, "Fetching page");

            match self.http.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => last_error = format!("body read failed: {}", e),
                        }
                    } else if status.is_client_error() {
                        warn!(source = %self.name, status = status.as_u16(), "Blocked by source");
                        return Err(ScrapeError::Blocked(status.as_u16()));
                    } else {
                        last_error = format!("HTTP {}", status.as_u16());
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                let backoff = Duration::from_millis(
                    (BACKOFF_BASE_MS << (attempt - 1)).min(BACKOFF_CAP_MS),
                );
                debug!(source = %self.name, attempt, "Retrying after {:?}", backoff);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(ScrapeError::Transient(format!(
            "{}: {} attempts exhausted, last error: {}",
            self.name, self.max_attempts, last_error
        )))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_enforces_min_interval() {
        let limiter = RateLimiter::new(200); // short interval for test speed

        let start = Instant::now();

        // First request passes immediately
        limiter.wait().await;
        let first_elapsed = start.elapsed();

        // Second request waits at least the interval
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let delays: Vec<u64> = (1u32..=4)
            .map(|attempt| (BACKOFF_BASE_MS << (attempt - 1)).min(BACKOFF_CAP_MS))
            .collect();
        assert_eq!(delays, vec![2_000, 4_000, 8_000, 10_000]);
    }

    #[test]
    fn client_creation() {
        let client = ScrapeClient::new("test", &ScrapeConfig::default());
        assert!(client.is_ok());
    }
}
