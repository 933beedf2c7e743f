use std::sync::Arc;

use tokio::sync::watch;

use super::ServiceError;

/// Where a controller is in its `Idle -> Loading -> {Success, Failed}` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Success,
    Failed,
}

/// Loading flag, last error and fetch generation shared by every controller state.
#[derive(Debug, Clone, Default)]
pub struct LoadState {
    generation: u64,
    loading: bool,
    loaded: bool,
    error: Option<Arc<ServiceError>>,
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&Arc<ServiceError>> {
        self.error.as_ref()
    }

    pub fn status(&self) -> Status {
        match (self.loading, &self.error, self.loaded) {
            (true, _, _) => Status::Loading,
            (false, Some(_), _) => Status::Failed,
            (false, None, true) => Status::Success,
            (false, None, false) => Status::Idle,
        }
    }

    pub(crate) fn succeed(&mut self) {
        self.loaded = true;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: Arc<ServiceError>) {
        self.error = Some(error);
    }
}

pub(crate) trait Loadable {
    fn load_mut(&mut self) -> &mut LoadState;
}

/// The result of a fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The fetched records replaced the published ones.
    Committed { count: usize },
    /// A newer fetch started before this one finished, so its result was dropped.
    Superseded,
    /// The fetch failed. Previously published records are kept.
    Failed(Arc<ServiceError>),
}

impl FetchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, FetchOutcome::Committed { .. })
    }
}

/// Marks one fetch in flight.
///
/// Starting a fetch bumps the state's generation, so only the most recently started fetch can
/// commit. Dropping the guard clears the loading flag if this fetch is still the current one,
/// which also covers a fetch whose future is dropped before completing.
pub(crate) struct LoadGuard<'a, S: Loadable> {
    state: &'a watch::Sender<S>,
    generation: u64,
}

impl<'a, S: Loadable> LoadGuard<'a, S> {
    pub(crate) fn begin(state: &'a watch::Sender<S>) -> Self {
        let mut generation = 0;
        state.send_modify(|state| {
            let load = state.load_mut();
            load.generation += 1;
            load.loading = true;
            generation = load.generation;
        });

        Self { state, generation }
    }

    /// Applies `update` if no newer fetch has started. Returns whether it was applied.
    pub(crate) fn commit(&self, update: impl FnOnce(&mut S)) -> bool {
        self.state.send_if_modified(|state| {
            if state.load_mut().generation != self.generation {
                return false;
            }

            update(state);
            true
        })
    }
}

impl<S: Loadable> Drop for LoadGuard<'_, S> {
    fn drop(&mut self) {
        let generation = self.generation;
        self.state.send_if_modified(|state| {
            let load = state.load_mut();
            if load.generation != generation {
                return false;
            }

            load.loading = false;
            true
        });
    }
}
