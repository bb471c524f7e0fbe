// src/fetch/types.rs
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::error::FetchError;

/// What a view renders. Only `Loading` is non-terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum FetchState<T> {
    Loading,
    Success(Vec<T>),
    Empty,
    Error(String),
}

impl<T> FetchState<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            Self::Success(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Stable lower-case name, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Empty => "empty",
            Self::Error(_) => "error",
        }
    }
}

/// A read-only listing call the controller can retry.
#[async_trait::async_trait]
pub trait ItemSource: Send + Sync {
    type Item: Send;

    async fn fetch(&self) -> Result<Vec<Self::Item>, FetchError>;

    fn name(&self) -> &'static str {
        "source"
    }
}

/// Fire-and-forget ping issued before the first attempt (backend cold start).
#[async_trait::async_trait]
pub trait WarmUp: Send + Sync {
    async fn ping(&self);
}

/// Receiver of state transitions; normally the owning view.
pub trait StateSink<T>: Send + Sync {
    fn commit(&self, state: FetchState<T>);
}

/// Adapts any producer closure into an [`ItemSource`].
pub struct FnSource<F> {
    name: &'static str,
    producer: F,
}

pub fn from_fn<F>(name: &'static str, producer: F) -> FnSource<F> {
    FnSource { name, producer }
}

#[async_trait::async_trait]
impl<F, Fut, T> ItemSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
    T: Send + 'static,
{
    type Item = T;

    async fn fetch(&self) -> Result<Vec<T>, FetchError> {
        (self.producer)().await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Whether the owning view is still mounted. Clones share the flag.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn teardown(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
