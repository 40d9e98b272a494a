//! Reactive binding between a [`Store`] and a UI-side state cell.
//!
//! A [`Provider`] owns a cell seeded from the store and subscribed to it.
//! Commits made outside the binding arrive as queued
//! [`BindingAction::Replace`] entries; consumers queue
//! [`BindingAction::Dispatch`] entries through a [`ContextDispatch`]. The
//! host's render loop drains both with [`Provider::flush`], which is the
//! point where a re-render would be triggered.
//!
//! In-binding dispatches commit through the store first and the cell adopts
//! the committed tree, so the two never diverge.

use crate::subscription::{StateChange, Subscription};
use crate::{Action, ActionType, Path, Store, StoreResult};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// An entry in the binding's action queue.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingAction {
    /// A consumer-issued action, committed through the store on flush.
    Dispatch(Action),
    /// A tree committed outside the binding.
    Replace {
        /// The committed tree.
        state: Value,
        /// Its store revision.
        revision: u64,
    },
}

#[derive(Debug)]
struct Cell {
    state: Value,
    revision: u64,
    queue: VecDeque<BindingAction>,
    renders: u64,
}

impl Cell {
    /// Adopt a committed tree unless a newer one is already held.
    fn adopt(&mut self, state: Value, revision: u64) -> bool {
        if revision <= self.revision {
            tracing::trace!(revision, current = self.revision, "stale state ignored");
            return false;
        }
        self.state = state;
        self.revision = revision;
        true
    }
}

fn lock(cell: &Mutex<Cell>) -> MutexGuard<'_, Cell> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scoped provider of `{ state, dispatch }` for one UI subtree.
///
/// Dropping the provider unsubscribes it from the store.
pub struct Provider {
    store: Store,
    cell: Arc<Mutex<Cell>>,
    subscription: Subscription,
}

impl Provider {
    /// Mount a binding on `store`.
    ///
    /// The cell starts from the store's current tree, or `{}` when the store
    /// is not initialized yet.
    pub fn mount(store: &Store) -> Self {
        let cell = Arc::new(Mutex::new(Cell {
            state: Value::Object(Map::new()),
            revision: 0,
            queue: VecDeque::new(),
            renders: 0,
        }));

        // Subscribe before seeding so no commit falls between the two; any
        // notification older than the seed is dropped by revision.
        let weak = Arc::downgrade(&cell);
        let subscription = store.subscribe(move |change: &StateChange<'_>| {
            if let Some(cell) = weak.upgrade() {
                lock(&cell).queue.push_back(BindingAction::Replace {
                    state: change.state.clone(),
                    revision: change.revision,
                });
            }
        });

        if let Some((state, revision)) = store.snapshot_with_revision() {
            lock(&cell).adopt(state, revision);
        }
        tracing::debug!(subscriber = ?subscription.id(), "binding mounted");

        Self {
            store: store.clone(),
            cell,
            subscription,
        }
    }

    /// The store this binding is mounted on.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Read and write handles for consumers.
    pub fn context(&self) -> RepoContext {
        let cell = lock(&self.cell);
        RepoContext {
            state: cell.state.clone(),
            revision: cell.revision,
            dispatch: ContextDispatch {
                cell: Arc::downgrade(&self.cell),
            },
        }
    }

    /// Queue an action, as a consumer would through [`RepoContext::dispatch`].
    pub fn dispatch(
        &self,
        path: impl Into<Path>,
        action_type: impl Into<ActionType>,
        value: Value,
    ) {
        lock(&self.cell)
            .queue
            .push_back(BindingAction::Dispatch(Action::new(path, action_type, value)));
    }

    /// Drain the queue in order.
    ///
    /// Returns `Ok(true)` if the cell now holds a different tree (a re-render
    /// is due). A failing dispatch stops the drain and is returned; entries
    /// behind it stay queued. Anything adopted before the failure is still
    /// counted as a render, so check [`Provider::render_count`] after an
    /// error.
    pub fn flush(&self) -> StoreResult<bool> {
        let mut changed = false;
        let drained = loop {
            // The store call below may notify other bindings; never hold our
            // cell lock across it.
            let Some(next) = lock(&self.cell).queue.pop_front() else {
                break Ok(());
            };
            let adopted = match next {
                BindingAction::Replace { state, revision } => {
                    lock(&self.cell).adopt(state, revision)
                }
                BindingAction::Dispatch(action) => {
                    match self
                        .store
                        .commit_action(&action, Some(self.subscription.id()))
                    {
                        Ok((state, revision)) => lock(&self.cell).adopt(state, revision),
                        Err(err) => break Err(err),
                    }
                }
            };
            changed |= adopted;
        };
        if changed {
            let mut cell = lock(&self.cell);
            cell.renders += 1;
            tracing::trace!(revision = cell.revision, renders = cell.renders, "binding updated");
        }
        drained.map(|()| changed)
    }

    /// Copy of the tree the cell currently holds.
    pub fn state(&self) -> Value {
        lock(&self.cell).state.clone()
    }

    /// Store revision of the tree the cell currently holds.
    pub fn revision(&self) -> u64 {
        lock(&self.cell).revision
    }

    /// Number of queued entries.
    pub fn pending(&self) -> usize {
        lock(&self.cell).queue.len()
    }

    /// Number of flushes that changed the cell.
    pub fn render_count(&self) -> u64 {
        lock(&self.cell).renders
    }

    /// Unsubscribe and drop the cell.
    pub fn unmount(self) {
        tracing::debug!(subscriber = ?self.subscription.id(), "binding unmounted");
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("subscription", &self.subscription)
            .field("revision", &self.revision())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Write handle handed to consumers.
///
/// Holds the cell weakly: once the provider is gone, dispatches are
/// dropped and reported as such.
#[derive(Clone, Debug)]
pub struct ContextDispatch {
    cell: Weak<Mutex<Cell>>,
}

impl ContextDispatch {
    /// Queue `{path, type, value}`. Returns false if the provider is gone.
    pub fn dispatch(
        &self,
        path: impl Into<Path>,
        action_type: impl Into<ActionType>,
        value: Value,
    ) -> bool {
        self.dispatch_action(Action::new(path, action_type, value))
    }

    /// Queue a prepared action. Returns false if the provider is gone.
    pub fn dispatch_action(&self, action: Action) -> bool {
        match self.cell.upgrade() {
            Some(cell) => {
                lock(&cell).queue.push_back(BindingAction::Dispatch(action));
                true
            }
            None => {
                tracing::debug!(path = %action.path, "dispatch after unmount dropped");
                false
            }
        }
    }
}

/// `{ state, dispatch }` as seen by one consumer at one render.
#[derive(Clone, Debug)]
pub struct RepoContext {
    /// The tree at the time the context was taken.
    pub state: Value,
    /// Store revision of `state`.
    pub revision: u64,
    /// Write handle.
    pub dispatch: ContextDispatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reducer, ReducerSpec};
    use serde_json::json;

    fn counter_store() -> Store {
        let store = Store::new();
        store
            .add(
                json!({"counter": 0}),
                vec![ReducerSpec::new(
                    "counter",
                    "INC",
                    Reducer::new(|v: Value, _| json!(v.as_i64().unwrap_or(0) + 1)),
                )],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_mount_on_empty_store() {
        let store = Store::new();
        let provider = Provider::mount(&store);
        assert_eq!(provider.state(), json!({}));
        assert_eq!(provider.revision(), 0);
    }

    #[test]
    fn test_mount_seeds_from_store() {
        let store = counter_store();
        let provider = Provider::mount(&store);
        assert_eq!(provider.state(), json!({"counter": 0}));
        assert_eq!(provider.revision(), store.revision());
        assert_eq!(provider.pending(), 0);
    }

    #[test]
    fn test_in_band_dispatch_commits_to_store() {
        let store = counter_store();
        let provider = Provider::mount(&store);

        provider.dispatch("counter", "INC", Value::Null);
        assert_eq!(provider.state(), json!({"counter": 0}));

        assert!(provider.flush().unwrap());
        assert_eq!(provider.state(), json!({"counter": 1}));
        assert_eq!(store.snapshot().unwrap(), json!({"counter": 1}));
        // Own commits are not echoed back.
        assert_eq!(provider.pending(), 0);
        assert_eq!(provider.render_count(), 1);
    }

    #[test]
    fn test_stale_replace_ignored() {
        let store = counter_store();
        let provider = Provider::mount(&store);
        let rev = provider.revision();

        lock(&provider.cell).queue.push_back(BindingAction::Replace {
            state: json!({"counter": -1}),
            revision: rev,
        });
        assert!(!provider.flush().unwrap());
        assert_eq!(provider.state(), json!({"counter": 0}));
        assert_eq!(provider.render_count(), 0);
    }

    #[test]
    fn test_failed_dispatch_keeps_rest_queued() {
        let store = counter_store();
        let provider = Provider::mount(&store);
        provider.dispatch("missing", "INC", Value::Null);
        provider.dispatch("counter", "INC", Value::Null);

        assert!(provider.flush().is_err());
        assert_eq!(provider.pending(), 1);
        assert!(provider.flush().unwrap());
        assert_eq!(provider.state(), json!({"counter": 1}));
    }

    #[test]
    fn test_failed_dispatch_still_renders_adopted_replace() {
        let store = counter_store();
        let provider = Provider::mount(&store);

        store.dispatch("counter", None::<&str>, json!(5)).unwrap();
        provider.dispatch("missing", "INC", Value::Null);

        assert!(provider.flush().is_err());
        assert_eq!(provider.state(), json!({"counter": 5}));
        assert_eq!(provider.revision(), store.revision());
        assert_eq!(provider.render_count(), 1);
        assert_eq!(provider.pending(), 0);
    }

    #[test]
    fn test_context_dispatch_after_unmount() {
        let store = counter_store();
        let provider = Provider::mount(&store);
        let ctx = provider.context();
        assert!(ctx.dispatch.dispatch("counter", "INC", Value::Null));

        provider.unmount();
        assert!(!ctx.dispatch.dispatch("counter", "INC", Value::Null));
        assert_eq!(store.subscriber_count(), 0);
    }
}
