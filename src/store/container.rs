use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use super::types::{Effect, Reducer, Subscriber, SubscriptionId};
use crate::storage::StorageError;

/// Observable state container owned by the application root.
///
/// `dispatch` applies the pure transition, runs every effect against the new
/// state, then calls every subscriber before returning. Dispatches are
/// serialized so effects and subscribers observe transitions in order.
pub struct Store<S: Reducer> {
    state: RwLock<S>,
    effects: Vec<Box<dyn Effect<S>>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<S>)>>,
    next_subscription: AtomicU64,
    dispatch_lock: ReentrantMutex<()>,
}

impl<S: Reducer> Store<S> {
    /// Create a store holding `initial`
    pub fn new(initial: S) -> Self {
        Self {
            state: RwLock::new(initial),
            effects: Vec::new(),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            dispatch_lock: ReentrantMutex::new(()),
        }
    }

    /// Register an effect run after every transition, in registration order
    pub fn with_effect(mut self, effect: impl Effect<S> + 'static) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> S {
        self.state.read().clone()
    }

    /// Read the current state without cloning it
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read())
    }

    /// Apply `action`.
    ///
    /// The in-memory transition always happens. An effect failure is logged,
    /// the remaining effects and the subscribers still run, and the first
    /// failure is returned.
    pub fn dispatch(&self, action: S::Action) -> Result<(), StorageError> {
        let _guard = self.dispatch_lock.lock();

        let next = {
            let mut state = self.state.write();
            let next = state.reduce(action);
            *state = next.clone();
            next
        };

        let mut first_error = None;
        for effect in &self.effects {
            if let Err(e) = effect.run(&next) {
                warn!(error = %e, "state effect failed");
                first_error.get_or_insert(e);
            }
        }

        // Copy out so subscribers may subscribe/unsubscribe while being notified
        let subscribers: Vec<Subscriber<S>> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(&next);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Register a callback invoked synchronously after every transition
    pub fn subscribe(&self, subscriber: impl Fn(&S) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<S: Reducer + std::fmt::Debug> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.state.read())
            .field("effects", &self.effects.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
