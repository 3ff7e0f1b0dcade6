//! Substore - a store backed entirely by a parent store and a lens
//!
//! A substore keeps no state of its own. Reads go through the lens, dispatches
//! and action observers go to the parent unchanged, reducers are wrapped with
//! the lens and installed in the parent's registry.
//!
//! The parent is held weakly. Once it is gone the substore answers reads with
//! the last value it saw and ignores everything else.

use super::{Completion, StateType, StoreType};
use crate::reducer::{BoxReducer, Lensed};
use crate::subscription::{BoxObserver, BoxSubscriber, Subscriber, Token, Unsubscriber};
use crate::Lens;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use unistore_config::StoreConfig;

pub struct Substore<P: StoreType + ?Sized, T: StateType> {
    parent: Weak<P>,
    lens: Lens<P::State, T>,
    fallback: Mutex<T>,
    config: StoreConfig,
}

impl<P, T> Substore<P, T>
where
    P: StoreType + ?Sized,
    T: StateType,
{
    pub fn new(parent: &Arc<P>, lens: Lens<P::State, T>) -> Self {
        let fallback = lens.get(&parent.state());
        let config = StoreConfig {
            name: format!("{}.sub", parent.config().name),
            ..parent.config().clone()
        };
        Self {
            parent: Arc::downgrade(parent),
            lens,
            fallback: Mutex::new(fallback),
            config,
        }
    }

    pub fn lens(&self) -> &Lens<P::State, T> {
        &self.lens
    }

    /// The parent store, while it is alive
    pub fn parent(&self) -> Option<Arc<P>> {
        self.parent.upgrade()
    }

    fn released(&self, what: &str) {
        log::debug!("[{}] parent released, {} ignored", self.config.name, what);
    }
}

impl<P, T> StoreType for Substore<P, T>
where
    P: StoreType + ?Sized,
    T: StateType,
{
    type State = T;
    type Action = P::Action;

    fn state(&self) -> T {
        match self.parent.upgrade() {
            Some(parent) => {
                let state = self.lens.get(&parent.state());
                *self.fallback.lock() = state.clone();
                state
            }
            None => self.fallback.lock().clone(),
        }
    }

    fn dispatch_with(&self, action: P::Action, completion: Completion<T>) {
        let Some(parent) = self.parent.upgrade() else {
            self.released("dispatch");
            return;
        };
        let lens = self.lens.clone();
        parent.dispatch_with(
            action,
            Box::new(move |state: &P::State| completion(&lens.get(state))),
        );
    }

    fn connect_boxed(&self, reducer: BoxReducer<T, P::Action>) -> Unsubscriber {
        match self.parent.upgrade() {
            Some(parent) => {
                parent.connect_boxed(Box::new(Lensed::new(reducer, self.lens.clone())))
            }
            None => {
                self.released("connect");
                Unsubscriber::noop()
            }
        }
    }

    fn subscribe_boxed(&self, subscriber: BoxSubscriber<T>, send_current: bool) -> Unsubscriber {
        let Some(parent) = self.parent.upgrade() else {
            self.released("subscribe");
            return Unsubscriber::noop();
        };
        let projection = Projection {
            inner: subscriber,
            lens: self.lens.clone(),
            last: None,
            skip_repeats: self.config.skip_repeats,
        };
        parent.subscribe_boxed(Box::new(projection), send_current)
    }

    fn unsubscribe(&self, token: Token) {
        if let Some(parent) = self.parent.upgrade() {
            parent.unsubscribe(token);
        }
    }

    fn observe_actions_boxed(&self, observer: BoxObserver<P::Action>) -> Unsubscriber {
        match self.parent.upgrade() {
            Some(parent) => parent.observe_actions_boxed(observer),
            None => {
                self.released("observe_actions");
                Unsubscriber::noop()
            }
        }
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Parent subscriber delivering the lensed part to a child subscriber
struct Projection<W, T> {
    inner: BoxSubscriber<T>,
    lens: Lens<W, T>,
    last: Option<T>,
    skip_repeats: bool,
}

impl<W, T> Subscriber<W> for Projection<W, T>
where
    W: StateType,
    T: StateType,
{
    fn new_state(&mut self, state: &W, old: Option<&W>) {
        let part = self.lens.get(state);
        let previous = match self.last.take() {
            Some(last) => Some(last),
            None => old.map(|old| self.lens.get(old)),
        };
        if self.skip_repeats && previous.as_ref() == Some(&part) {
            self.last = previous;
            return;
        }
        self.inner.new_state(&part, previous.as_ref());
        self.last = Some(part);
    }

    fn will_change(&mut self, pending: &W, current: &W) {
        let pending = self.lens.get(pending);
        let current = self.lens.get(current);
        if self.skip_repeats && pending == current {
            return;
        }
        self.inner.will_change(&pending, &current);
    }
}
