//! # Resilient Fetch Controller
//! Drives one logical listing fetch to a terminal [`FetchState`]:
//! exponential backoff on errors, linear backoff on empty results, a minimum
//! display duration, an optional warm-up ping and a liveness guard.
//!
//! Attempts within one run are strictly sequential. Nothing is shared between
//! controller instances; each view owns its own.

pub mod http;
pub mod types;
pub mod view;

pub use types::{from_fn, FetchState, FnSource, ItemSource, Liveness, StateSink, WarmUp};
pub use view::FetchView;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_attempts_total", "Backend fetch attempts.");
        describe_counter!(
            "fetch_retries_total",
            "Retries scheduled, labelled by reason (error|empty)."
        );
        describe_counter!(
            "fetch_terminal_total",
            "Terminal states committed, labelled by state."
        );
        describe_counter!(
            "fetch_cancelled_total",
            "Runs abandoned because the owning view was torn down."
        );
        describe_histogram!(
            "fetch_duration_ms",
            "Wall time from start to terminal commit in milliseconds."
        );
    });
}

fn default_max_error_retries() -> u32 {
    3
}
fn default_max_empty_retries() -> u32 {
    2
}
fn default_min_display_ms() -> u64 {
    400
}
fn default_base_backoff_ms() -> u64 {
    600
}
fn default_empty_backoff_ms() -> u64 {
    500
}

/// Per call-site retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after a failed one.
    #[serde(default = "default_max_error_retries")]
    pub max_error_retries: u32,
    /// Extra attempts after a successful but empty response.
    #[serde(default = "default_max_empty_retries")]
    pub max_empty_retries: u32,
    /// Terminal state is never committed earlier than this after start.
    #[serde(default = "default_min_display_ms")]
    pub min_display_ms: u64,
    /// Error retry `k` (0-based) waits `base_backoff_ms * 2^k`.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Empty retry `n` (1-based) waits `empty_backoff_ms * n`.
    #[serde(default = "default_empty_backoff_ms")]
    pub empty_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_error_retries: default_max_error_retries(),
            max_empty_retries: default_max_empty_retries(),
            min_display_ms: default_min_display_ms(),
            base_backoff_ms: default_base_backoff_ms(),
            empty_backoff_ms: default_empty_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// No delays at all; handy for tools that just want the retry budget.
    pub fn immediate(max_error_retries: u32, max_empty_retries: u32) -> Self {
        Self {
            max_error_retries,
            max_empty_retries,
            min_display_ms: 0,
            base_backoff_ms: 0,
            empty_backoff_ms: 0,
        }
    }

    pub fn error_delay(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }

    pub fn empty_delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.empty_backoff_ms.saturating_mul(u64::from(retry)))
    }

    pub fn min_display(&self) -> Duration {
        Duration::from_millis(self.min_display_ms)
    }

    /// Sum of every delay the policy can insert (worst-case latency minus request time).
    pub fn worst_case_delay(&self) -> Duration {
        let errors: Duration = (0..self.max_error_retries)
            .map(|k| self.error_delay(k))
            .sum();
        let empties: Duration = (1..=self.max_empty_retries)
            .map(|n| self.empty_delay(n))
            .sum();
        errors + empties
    }
}

#[derive(Clone, Default)]
pub struct FetchController {
    policy: RetryPolicy,
    warm_up: Option<Arc<dyn WarmUp>>,
}

impl FetchController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            warm_up: None,
        }
    }

    pub fn with_warm_up(mut self, warm_up: Arc<dyn WarmUp>) -> Self {
        self.warm_up = Some(warm_up);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one fetch to completion, committing `Loading` and then exactly one
    /// terminal state to `sink`.
    ///
    /// Returns `None` when the view was torn down before the terminal commit;
    /// in that case nothing more is written to `sink`.
    pub async fn run<S>(
        &self,
        source: &S,
        sink: &dyn StateSink<S::Item>,
        liveness: &Liveness,
    ) -> Option<FetchState<S::Item>>
    where
        S: ItemSource + ?Sized,
        S::Item: Clone,
    {
        ensure_metrics_described();
        let started = Instant::now();

        if !liveness.is_alive() {
            counter!("fetch_cancelled_total", "source" => source.name()).increment(1);
            return None;
        }
        sink.commit(FetchState::Loading);

        if let Some(warm_up) = &self.warm_up {
            let warm_up = Arc::clone(warm_up);
            tokio::spawn(async move { warm_up.ping().await });
        }

        let Some(terminal) = self.converge(source, liveness).await else {
            counter!("fetch_cancelled_total", "source" => source.name()).increment(1);
            tracing::debug!(target: "fetch", source = source.name(), "view gone, dropping run");
            return None;
        };

        let min_display = self.policy.min_display();
        let elapsed = started.elapsed();
        if elapsed < min_display {
            sleep(min_display - elapsed).await;
        }

        if !liveness.is_alive() {
            counter!("fetch_cancelled_total", "source" => source.name()).increment(1);
            tracing::debug!(target: "fetch", source = source.name(), "view gone before commit");
            return None;
        }

        let ms = started.elapsed().as_secs_f64() * 1_000.0;
        histogram!("fetch_duration_ms").record(ms);
        counter!("fetch_terminal_total", "state" => terminal.kind()).increment(1);
        tracing::info!(
            target: "fetch",
            source = source.name(),
            state = terminal.kind(),
            elapsed_ms = ms as u64,
            "fetch settled"
        );

        sink.commit(terminal.clone());
        Some(terminal)
    }

    /// Attempt loop. `None` means the view went away between attempts.
    async fn converge<S>(&self, source: &S, liveness: &Liveness) -> Option<FetchState<S::Item>>
    where
        S: ItemSource + ?Sized,
    {
        let mut error_retries = 0u32;
        let mut empty_retries = 0u32;

        loop {
            if !liveness.is_alive() {
                return None;
            }
            counter!("fetch_attempts_total", "source" => source.name()).increment(1);

            match source.fetch().await {
                Ok(items) if !items.is_empty() => return Some(FetchState::Success(items)),
                Ok(_) => {
                    if empty_retries >= self.policy.max_empty_retries {
                        return Some(FetchState::Empty);
                    }
                    empty_retries += 1;
                    let delay = self.policy.empty_delay(empty_retries);
                    counter!("fetch_retries_total", "source" => source.name(), "reason" => "empty")
                        .increment(1);
                    tracing::debug!(
                        target: "fetch",
                        source = source.name(),
                        retry = empty_retries,
                        delay_ms = delay.as_millis() as u64,
                        "empty result, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    if error_retries >= self.policy.max_error_retries {
                        tracing::warn!(
                            target: "fetch",
                            source = source.name(),
                            error = %e,
                            "retries exhausted"
                        );
                        return Some(FetchState::Error(e.to_string()));
                    }
                    let delay = self.policy.error_delay(error_retries);
                    error_retries += 1;
                    counter!("fetch_retries_total", "source" => source.name(), "reason" => "error")
                        .increment(1);
                    tracing::warn!(
                        target: "fetch",
                        source = source.name(),
                        error = %e,
                        retry = error_retries,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_error_delays() {
        let p = RetryPolicy {
            base_backoff_ms: 600,
            ..RetryPolicy::default()
        };
        assert_eq!(p.error_delay(0), Duration::from_millis(600));
        assert_eq!(p.error_delay(1), Duration::from_millis(1200));
        assert_eq!(p.error_delay(2), Duration::from_millis(2400));
    }

    #[test]
    fn linear_empty_delays() {
        let p = RetryPolicy::default();
        assert_eq!(p.empty_delay(1), Duration::from_millis(500));
        assert_eq!(p.empty_delay(2), Duration::from_millis(1000));
        assert_eq!(p.empty_delay(3), Duration::from_millis(1500));
    }

    #[test]
    fn huge_retry_index_saturates() {
        let p = RetryPolicy::default();
        assert_eq!(p.error_delay(200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn worst_case_is_sum_of_steps() {
        let p = RetryPolicy {
            max_error_retries: 3,
            max_empty_retries: 2,
            min_display_ms: 0,
            base_backoff_ms: 600,
            empty_backoff_ms: 500,
        };
        // 600 + 1200 + 2400 + 500 + 1000
        assert_eq!(p.worst_case_delay(), Duration::from_millis(5700));
    }

    #[test]
    fn policy_fields_default_when_missing() {
        let p: RetryPolicy = serde_json::from_str(r#"{"max_error_retries": 5}"#).unwrap();
        assert_eq!(p.max_error_retries, 5);
        assert_eq!(p.base_backoff_ms, 600);
        assert_eq!(p.empty_backoff_ms, 500);
    }
}
