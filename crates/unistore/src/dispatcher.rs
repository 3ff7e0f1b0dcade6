//! Dispatcher for middleware and deferred effects
//!
//! Middleware and deferred effects need to dispatch actions that re-enter the
//! full pipeline from the beginning. The Dispatcher holds a weak reference to
//! the store, so a pending effect never keeps a dropped store alive.

use crate::{ActionType, StateType, StoreType};
use std::fmt;
use std::sync::{Arc, Weak};

/// Weak handle dispatching actions back into a store
pub struct Dispatcher<S: StateType, A: ActionType> {
    store: Weak<dyn StoreType<State = S, Action = A>>,
}

impl<S: StateType, A: ActionType> Clone for Dispatcher<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: Weak::clone(&self.store),
        }
    }
}

impl<S: StateType, A: ActionType> fmt::Debug for Dispatcher<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("alive", &(self.store.strong_count() > 0))
            .finish()
    }
}

impl<S: StateType, A: ActionType> Dispatcher<S, A> {
    /// Create a dispatcher targeting `store`
    pub fn new(store: Weak<dyn StoreType<State = S, Action = A>>) -> Self {
        Self { store }
    }

    /// Create a dispatcher from a strong store handle
    pub fn of<T>(store: &Arc<T>) -> Self
    where
        T: StoreType<State = S, Action = A>,
    {
        let store: Arc<dyn StoreType<State = S, Action = A>> = store.clone();
        Self::new(Arc::downgrade(&store))
    }

    /// Dispatch an action through the full pipeline
    ///
    /// The action is dropped when the store has been released.
    pub fn dispatch(&self, action: A) {
        self.try_dispatch(action);
    }

    /// Dispatch an action; returns false when the store has been released
    pub fn try_dispatch(&self, action: A) -> bool {
        match self.store.upgrade() {
            Some(store) => {
                store.dispatch_with(action, Box::new(|_| {}));
                true
            }
            None => {
                log::debug!("Dispatcher: store released, dropping action {:?}", action);
                false
            }
        }
    }

    /// Current state of the store, if it is still alive
    pub fn state(&self) -> Option<S> {
        self.store.upgrade().map(|store| store.state())
    }

    /// True while the target store is alive
    pub fn is_alive(&self) -> bool {
        self.store.strong_count() > 0
    }
}
