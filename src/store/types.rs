use std::sync::Arc;

use crate::storage::StorageError;

/// State with a pure transition function
pub trait Reducer: Clone + Send + Sync + 'static {
    type Action;

    /// Compute the next state. Must not perform side effects.
    fn reduce(&self, action: Self::Action) -> Self;
}

/// Side effect run after every transition (e.g. persistence)
pub trait Effect<S>: Send + Sync {
    fn run(&self, state: &S) -> Result<(), StorageError>;
}

impl<S, F> Effect<S> for F
where
    F: Fn(&S) -> Result<(), StorageError> + Send + Sync,
{
    fn run(&self, state: &S) -> Result<(), StorageError> {
        self(state)
    }
}

/// Callback invoked with the new state after every transition
pub type Subscriber<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// Handle returned by `Store::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
