//! Per-view owner of a fetch: current state, liveness flag, manual retry.

use std::sync::{Mutex, MutexGuard};

use super::types::{FetchState, ItemSource, Liveness, StateSink};
use super::FetchController;

pub struct FetchView<T> {
    state: Mutex<FetchState<T>>,
    liveness: Liveness,
    controller: FetchController,
}

impl<T: Clone + Send + Sync> FetchView<T> {
    pub fn new(controller: FetchController) -> Self {
        Self {
            state: Mutex::new(FetchState::Loading),
            liveness: Liveness::new(),
            controller,
        }
    }

    /// Initial load. Returns the terminal state, or `None` if torn down meanwhile.
    pub async fn load<S>(&self, source: &S) -> Option<FetchState<T>>
    where
        S: ItemSource<Item = T> + ?Sized,
    {
        self.controller.run(source, self, &self.liveness).await
    }

    /// Manual retry (the "Try again" button): starts over with a fresh budget.
    pub async fn retry<S>(&self, source: &S) -> Option<FetchState<T>>
    where
        S: ItemSource<Item = T> + ?Sized,
    {
        tracing::debug!(target: "fetch", source = source.name(), "manual retry");
        self.load(source).await
    }

    pub fn state(&self) -> FetchState<T> {
        self.lock().clone()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// View unmounted; in-flight runs stop writing.
    pub fn teardown(&self) {
        self.liveness.teardown();
    }

    fn lock(&self) -> MutexGuard<'_, FetchState<T>> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

impl<T: Clone + Send + Sync> StateSink<T> for FetchView<T> {
    fn commit(&self, state: FetchState<T>) {
        *self.lock() = state;
    }
}
