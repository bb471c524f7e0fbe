// tests/fetch_controller.rs
//
// Retry/backoff behaviour of the fetch controller on a paused Tokio clock,
// so every backoff is observable exactly and the suite stays fast.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use smartstox_client::fetch::{ItemSource, StateSink, WarmUp};
use smartstox_client::{FetchController, FetchError, FetchState, Liveness, RetryPolicy};
use tokio::time::Instant;

type Reply = Result<Vec<u32>, FetchError>;

/// Replays a fixed script, then repeats `fallback` forever.
struct Scripted {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    latency: Duration,
}

impl Scripted {
    fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemSource for Scripted {
    type Item = u32;

    async fn fetch(&self) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Records every commit together with whether the view was alive at that moment.
struct Spy {
    liveness: Liveness,
    writes: Mutex<Vec<(FetchState<u32>, bool)>>,
}

impl Spy {
    fn new(liveness: Liveness) -> Self {
        Self {
            liveness,
            writes: Mutex::new(Vec::new()),
        }
    }

    fn states(&self) -> Vec<FetchState<u32>> {
        self.writes.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }

    fn writes_after_teardown(&self) -> usize {
        self.writes.lock().unwrap().iter().filter(|(_, alive)| !alive).count()
    }
}

impl StateSink<u32> for Spy {
    fn commit(&self, state: FetchState<u32>) {
        let alive = self.liveness.is_alive();
        self.writes.lock().unwrap().push((state, alive));
    }
}

fn err(msg: &str) -> Reply {
    Err(FetchError::Transport(msg.to_string()))
}

fn policy(max_error_retries: u32, max_empty_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_error_retries,
        max_empty_retries,
        min_display_ms: 0,
        base_backoff_ms: 600,
        empty_backoff_ms: 500,
    }
}

#[tokio::test(start_paused = true)]
async fn first_attempt_success_respects_min_display() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![], Ok(vec![1, 2, 3]));
    let ctl = FetchController::new(RetryPolicy {
        min_display_ms: 800,
        ..policy(3, 2)
    });

    let t0 = Instant::now();
    let out = ctl.run(&src, &spy, &live).await;

    assert_eq!(out, Some(FetchState::Success(vec![1, 2, 3])));
    assert!(t0.elapsed() >= Duration::from_millis(800));
    assert_eq!(src.calls(), 1);
    assert_eq!(
        spy.states(),
        vec![FetchState::Loading, FetchState::Success(vec![1, 2, 3])]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_response_is_not_delayed_further() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![], Ok(vec![9])).with_latency(Duration::from_millis(1000));
    let ctl = FetchController::new(RetryPolicy {
        min_display_ms: 300,
        ..policy(0, 0)
    });

    let t0 = Instant::now();
    ctl.run(&src, &spy, &live).await;
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn empty_on_every_allowed_attempt_is_empty() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![], Ok(vec![]));
    let ctl = FetchController::new(policy(3, 2));

    let t0 = Instant::now();
    let out = ctl.run(&src, &spy, &live).await;

    assert_eq!(out, Some(FetchState::Empty));
    assert_eq!(src.calls(), 3);
    // linear: 500 + 1000
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(1500));
    assert!(elapsed < Duration::from_millis(1600), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn empty_then_items_is_success() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![Ok(vec![]), Ok(vec![])], Ok(vec![4]));
    let ctl = FetchController::new(policy(0, 2));

    assert_eq!(
        ctl.run(&src, &spy, &live).await,
        Some(FetchState::Success(vec![4]))
    );
    assert_eq!(src.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn success_on_last_allowed_attempt_counts() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![err("a"), err("b"), err("c")], Ok(vec![5]));
    let ctl = FetchController::new(policy(3, 0));

    let t0 = Instant::now();
    let out = ctl.run(&src, &spy, &live).await;

    assert_eq!(out, Some(FetchState::Success(vec![5])));
    assert_eq!(src.calls(), 4);
    // exponential: 600 + 1200 + 2400
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(4200));
    assert!(elapsed < Duration::from_millis(4300), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn too_many_failures_is_error_with_last_message() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(
        vec![err("a"), err("b"), err("c")],
        Err(FetchError::status(502, "http://x.test/api/posts")),
    );
    let ctl = FetchController::new(policy(3, 0));

    let out = ctl.run(&src, &spy, &live).await;

    assert_eq!(
        out,
        Some(FetchState::Error(
            "server returned 502 for http://x.test/api/posts".to_string()
        ))
    );
    assert_eq!(src.calls(), 4);
    assert_eq!(spy.states().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_bodies_use_the_error_budget() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![], Err(FetchError::Malformed("expected array".into())));
    let ctl = FetchController::new(policy(1, 5));

    let out = ctl.run(&src, &spy, &live).await;
    assert!(matches!(out, Some(FetchState::Error(m)) if m.contains("expected array")));
    assert_eq!(src.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn error_and_empty_budgets_are_independent() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(
        vec![err("x"), Ok(vec![]), err("y"), Ok(vec![])],
        Ok(vec![8]),
    );
    let ctl = FetchController::new(policy(2, 2));

    assert_eq!(
        ctl.run(&src, &spy, &live).await,
        Some(FetchState::Success(vec![8]))
    );
    assert_eq!(src.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_backoff_stops_all_writes() {
    let live = Liveness::new();
    let spy = Arc::new(Spy::new(live.clone()));
    let src = Arc::new(Scripted::new(vec![], err("down")));
    let ctl = FetchController::new(policy(5, 0));

    let task = {
        let (spy, src, live) = (spy.clone(), src.clone(), live.clone());
        tokio::spawn(async move { ctl.run(&*src, &*spy, &live).await })
    };

    // First attempt fails instantly, then a 600ms backoff starts.
    tokio::time::sleep(Duration::from_millis(100)).await;
    live.teardown();

    let out = task.await.unwrap();
    assert_eq!(out, None);
    assert_eq!(src.calls(), 1, "no attempt after teardown");
    assert_eq!(spy.states(), vec![FetchState::Loading]);
    assert_eq!(spy.writes_after_teardown(), 0);
}

#[tokio::test(start_paused = true)]
async fn teardown_during_inflight_request_drops_result() {
    let live = Liveness::new();
    let spy = Arc::new(Spy::new(live.clone()));
    let src = Arc::new(Scripted::new(vec![], Ok(vec![1])).with_latency(Duration::from_secs(1)));
    let ctl = FetchController::new(policy(0, 0));

    let task = {
        let (spy, src, live) = (spy.clone(), src.clone(), live.clone());
        tokio::spawn(async move { ctl.run(&*src, &*spy, &live).await })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    live.teardown();

    assert_eq!(task.await.unwrap(), None);
    assert_eq!(spy.writes_after_teardown(), 0);
    assert_eq!(spy.states(), vec![FetchState::Loading]);
}

#[tokio::test(start_paused = true)]
async fn dead_view_never_starts() {
    let live = Liveness::new();
    live.teardown();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![], Ok(vec![1]));

    let out = FetchController::new(policy(3, 3)).run(&src, &spy, &live).await;
    assert_eq!(out, None);
    assert_eq!(src.calls(), 0);
    assert!(spy.states().is_empty());
}

struct CountingWarmUp(AtomicUsize);

#[async_trait]
impl WarmUp for CountingWarmUp {
    async fn ping(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn warm_up_is_fired_once_per_run() {
    let live = Liveness::new();
    let spy = Spy::new(live.clone());
    let src = Scripted::new(vec![err("cold")], Ok(vec![1]));
    let warm = Arc::new(CountingWarmUp(AtomicUsize::new(0)));
    let ctl = FetchController::new(RetryPolicy {
        min_display_ms: 100,
        ..policy(2, 0)
    })
    .with_warm_up(warm.clone());

    ctl.run(&src, &spy, &live).await;
    assert_eq!(warm.0.load(Ordering::SeqCst), 1);

    ctl.run(&src, &spy, &live).await;
    assert_eq!(warm.0.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn independent_controllers_do_not_interfere() {
    let (la, lb) = (Liveness::new(), Liveness::new());
    let (sa, sb) = (Spy::new(la.clone()), Spy::new(lb.clone()));
    let a = Scripted::new(vec![err("a")], Ok(vec![1]));
    let b = Scripted::new(vec![], Ok(vec![]));
    let ctl = FetchController::new(policy(2, 1));

    let (ra, rb) = tokio::join!(ctl.run(&a, &sa, &la), ctl.run(&b, &sb, &lb));
    assert_eq!(ra, Some(FetchState::Success(vec![1])));
    assert_eq!(rb, Some(FetchState::Empty));
}
