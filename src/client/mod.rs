//! Client library
//!
//! [`ApiClient`] speaks HTTP; [`ProjectStore`] and [`TaskStore`] keep a local
//! snapshot of the caller's projects and tasks in sync with each call.

pub mod api;
pub mod project_store;
pub mod task_store;

pub use api::{ApiClient, ClientError, ClientResult};
pub use project_store::ProjectStore;
pub use task_store::TaskStore;

use crate::board::{Project, Task};

/// Cached entries plus the status of the last store operation
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<T> {
    pub items: Vec<T>,
    pub is_loading: bool,
    /// Message of the last failed operation, cleared when the next one starts
    pub error: Option<String>,
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            error: None,
        }
    }
}

/// Entries addressable by their wire id
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Project {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

impl<T: Keyed> StoreState<T> {
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == id)
    }

    pub(crate) fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    /// Finish an operation: apply `on_ok` to the cache or record the error
    pub(crate) fn settle<R>(
        &mut self,
        result: ClientResult<R>,
        on_ok: impl FnOnce(&mut Vec<T>, &R),
    ) -> ClientResult<R> {
        self.is_loading = false;
        match &result {
            Ok(value) => on_ok(&mut self.items, value),
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }
}

/// Replace the cached entry with the same id, if any
pub(crate) fn replace_entry<T: Keyed + Clone>(items: &mut [T], fresh: &T) {
    if let Some(slot) = items.iter_mut().find(|item| item.key() == fresh.key()) {
        *slot = fresh.clone();
    }
}

/// Drop the cached entry with the given id
pub(crate) fn remove_entry<T: Keyed>(items: &mut Vec<T>, id: &str) {
    items.retain(|item| item.key() != id);
}
