// tests/metrics.rs
use smartstox_client::fetch::from_fn;
use smartstox_client::metrics::Metrics;
use smartstox_client::{FetchController, FetchError, FetchView, RetryPolicy};

#[tokio::test(start_paused = true)]
async fn fetch_series_exposed_after_a_run() {
    let policy = RetryPolicy::immediate(1, 1);
    let metrics = Metrics::init(&policy).expect("recorder");

    let view = FetchView::new(FetchController::new(policy));
    let flaky = from_fn("flaky", || async {
        Err::<Vec<u8>, _>(FetchError::Transport("refused".into()))
    });
    view.load(&flaky).await;

    let out = metrics.render();
    for needle in [
        "fetch_attempts_total",
        "fetch_retries_total",
        "fetch_terminal_total",
        "fetch_duration_ms",
        "fetch_policy_max_error_retries",
    ] {
        assert!(out.contains(needle), "exposition missing '{needle}'\n{out}");
    }
    assert!(out.contains(r#"state="error""#));
}
