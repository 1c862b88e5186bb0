//! Run a job per key exactly once, no matter how many callers race to start it, and let everyone
//! else await the first caller's result.
//!
//! Used to cache repository candidate lookups (each repository caches per-package candidate
//! lists) and the shared-package store's content-addressed writes — both need "populate-once"
//! semantics under concurrent access.

use std::hash::Hash;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use tokio::sync::Notify;

enum Slot<V> {
    Pending(Arc<Notify>),
    Done(Arc<V>),
}

pub struct OnceMap<K, V> {
    slots: Mutex<FxHashMap<K, Slot<V>>>,
}

impl<K, V> Default for OnceMap<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the task computing this value was cancelled before it finished")]
    Cancelled,
}

impl<K: Eq + Hash + Clone, V> OnceMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers intent to compute `key`. Returns `true` exactly once per key: the caller that
    /// gets `true` must eventually call [`Self::done`] (or every other caller's [`Self::wait`]
    /// hangs forever). Callers that get `false` should call [`Self::wait`] instead.
    pub fn register(&self, key: K) -> bool {
        let mut slots = self.slots.lock().unwrap();
        if slots.contains_key(&key) {
            return false;
        }
        slots.insert(key, Slot::Pending(Arc::new(Notify::new())));
        true
    }

    /// Submits the result of a job this caller registered for.
    pub fn done(&self, key: K, value: V) {
        let mut slots = self.slots.lock().unwrap();
        let notify = match slots.insert(key, Slot::Done(Arc::new(value))) {
            Some(Slot::Pending(notify)) => Some(notify),
            _ => None,
        };
        drop(slots);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    /// Returns the already-computed value for `key` without waiting, if any.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match self.slots.lock().unwrap().get(key) {
            Some(Slot::Done(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Waits for the result of a job someone else registered. Hangs if nobody ever calls
    /// [`Self::done`] for `key` (these caches are only ever entered through `register`, so this
    /// invariant holds by construction).
    pub async fn wait(&self, key: &K) -> Result<Arc<V>, Error> {
        loop {
            let notify = {
                let slots = self.slots.lock().unwrap();
                match slots.get(key) {
                    Some(Slot::Done(value)) => return Ok(value.clone()),
                    Some(Slot::Pending(notify)) => notify.clone(),
                    None => return Err(Error::Cancelled),
                }
            };
            notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_registration_returns_false() {
        let map: OnceMap<String, u32> = OnceMap::new();
        assert!(map.register("a".to_string()));
        assert!(!map.register("a".to_string()));
    }

    #[tokio::test]
    async fn waiter_observes_the_value_once_done_is_called() {
        let map: OnceMap<String, u32> = OnceMap::new();
        assert!(map.register("a".to_string()));
        map.done("a".to_string(), 42);
        assert_eq!(*map.wait(&"a".to_string()).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn get_is_none_while_pending() {
        let map: OnceMap<String, u32> = OnceMap::new();
        map.register("a".to_string());
        assert!(map.get(&"a".to_string()).is_none());
    }
}
