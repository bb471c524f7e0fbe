use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::fetch::RetryPolicy;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the active retry policy as gauges.
    pub fn init(policy: &RetryPolicy) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("fetch_policy_max_error_retries").set(f64::from(policy.max_error_retries));
        gauge!("fetch_policy_max_empty_retries").set(f64::from(policy.max_empty_retries));
        gauge!("fetch_policy_base_backoff_ms").set(policy.base_backoff_ms as f64);

        Ok(Self { handle })
    }

    /// Prometheus exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
