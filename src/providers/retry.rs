use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Exponential backoff for rate-limited completions.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn next_delay(&self, current: Duration) -> Duration {
        let doubled = current.saturating_mul(2).max(self.base_delay);
        doubled.min(self.max_delay)
    }

    /// Sleeps for `delay` (or a longer `retry-after`) and returns the delay
    /// to use for the following attempt.
    pub async fn wait(
        &self,
        attempt: usize,
        delay: Duration,
        retry_after: Option<Duration>,
    ) -> Duration {
        let wait = match retry_after {
            Some(server_wait) if server_wait > delay => server_wait,
            _ => delay,
        };
        warn!(
            "completion rate limited; retrying in {:.1}s (attempt {}/{})",
            wait.as_secs_f32(),
            attempt,
            self.max_attempts
        );
        sleep(wait).await;
        self.next_delay(delay)
    }
}

pub(crate) fn is_rate_limited(status: StatusCode, body: &str) -> bool {
    if matches!(status.as_u16(), 429 | 503 | 529) {
        return true;
    }
    let lower = body.to_lowercase();
    ["rate limit", "rate_limit", "too many requests", "overloaded"]
        .iter()
        .any(|needle| lower.contains(needle))
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?.trim();
    value.parse::<u64>().ok().map(Duration::from_secs)
}
