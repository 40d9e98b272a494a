//! Subscriber set for out-of-band state change notification.
//!
//! Callbacks are held by the store and invoked after every commit made
//! through `add`/`dispatch`. A [`Subscription`] removes its callback when
//! dropped.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Identifier of a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

/// A committed state change as seen by subscribers.
#[derive(Debug)]
pub struct StateChange<'a> {
    /// The committed tree. A copy: the store's own tree is never lent out.
    pub state: &'a Value,
    /// Revision of the commit. Strictly increasing per store.
    pub revision: u64,
}

type Callback = Arc<dyn Fn(&StateChange<'_>) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<SubscriberId, Callback>,
}

#[derive(Clone, Default)]
pub(crate) struct SubscriberSet {
    inner: Arc<Mutex<Subscribers>>,
}

fn lock(inner: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    // Callbacks run outside the lock, so a poisoned guard still holds a
    // consistent map.
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SubscriberSet {
    pub(crate) fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StateChange<'_>) + Send + Sync + 'static,
    {
        let mut subs = lock(&self.inner);
        let id = SubscriberId(subs.next_id);
        subs.next_id += 1;
        subs.callbacks.insert(id, Arc::new(callback));
        tracing::debug!(subscriber = id.0, total = subs.callbacks.len(), "subscriber added");
        Subscription {
            id,
            set: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every callback except `skip`.
    ///
    /// The callback list is copied first so callbacks may subscribe,
    /// unsubscribe or read the store.
    pub(crate) fn notify(&self, change: &StateChange<'_>, skip: Option<SubscriberId>) {
        let callbacks: Vec<Callback> = lock(&self.inner)
            .callbacks
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        tracing::trace!(
            revision = change.revision,
            subscribers = callbacks.len(),
            "notifying subscribers"
        );
        for callback in callbacks {
            callback(change);
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).callbacks.len()
    }

    pub(crate) fn clear(&self) {
        lock(&self.inner).callbacks.clear();
    }
}

/// Handle to a registered callback; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    set: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// Identifier of the callback.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.set.upgrade() {
            if lock(&inner).callbacks.remove(&self.id).is_some() {
                tracing::debug!(subscriber = self.id.0, "subscriber removed");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
