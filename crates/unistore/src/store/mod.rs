//! The store interface and its three implementations
//!
//! - [`Store`]: a root store owning the state cell, the reducer registry and a
//!   serialized worker task on a tokio runtime.
//! - [`Substore`]: a projection of a parent store through a [`Lens`], with no
//!   state of its own.
//! - [`Stores`]: two independent stores presented as one [`Union`] state.
//!
//! All three implement the object-safe [`StoreType`] trait; [`StoreExt`] adds
//! the generic convenience surface on top of it for every store, including
//! `dyn StoreType`.

mod paired;
mod root;
mod substore;

pub use paired::Stores;
pub use root::{Store, StoreBuilder};
pub use substore::Substore;

use crate::error::StoreError;
use crate::reducer::{BoxReducer, Lensed, Reducer};
use crate::subscription::{BoxObserver, BoxSubscriber, Subscriber, Token, Unsubscriber};
use crate::Lens;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use unistore_config::StoreConfig;

/// Bounds every state type satisfies: value semantics and equality
pub trait StateType: Clone + PartialEq + Send + Sync + 'static {}

impl<T> StateType for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Bounds every action type satisfies
pub trait ActionType: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> ActionType for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// Callback invoked with the state once a dispatched action has settled
pub type Completion<S> = Box<dyn FnOnce(&S) + Send>;

/// Common interface of root, projected and paired stores
pub trait StoreType: Send + Sync + 'static {
    type State: StateType;
    type Action: ActionType;

    /// Current state
    fn state(&self) -> Self::State;

    /// Dispatch an action; `completion` runs once the action and its
    /// immediate follow-ups have been reduced and subscribers notified
    fn dispatch_with(&self, action: Self::Action, completion: Completion<Self::State>);

    /// Register a reducer; reducers apply in registration order
    fn connect_boxed(&self, reducer: BoxReducer<Self::State, Self::Action>) -> Unsubscriber;

    /// Register a subscriber, optionally delivering the current state first
    fn subscribe_boxed(
        &self,
        subscriber: BoxSubscriber<Self::State>,
        send_current: bool,
    ) -> Unsubscriber;

    /// Remove a subscriber, action observer or reducer by token
    fn unsubscribe(&self, token: Token);

    /// Register a callback receiving every dispatched action
    fn observe_actions_boxed(&self, observer: BoxObserver<Self::Action>) -> Unsubscriber;

    fn config(&self) -> &StoreConfig;
}

/// Generic conveniences available on every [`StoreType`]
pub trait StoreExt: StoreType {
    /// Fire-and-forget dispatch
    fn dispatch(&self, action: Self::Action) {
        self.dispatch_with(action, Box::new(|_| {}));
    }

    /// Dispatch and run `completion` with the resulting state
    fn dispatch_then<F>(&self, action: Self::Action, completion: F)
    where
        F: FnOnce(&Self::State) + Send + 'static,
    {
        self.dispatch_with(action, Box::new(completion));
    }

    /// Dispatch several actions in order
    fn dispatch_all<I>(&self, actions: I)
    where
        I: IntoIterator<Item = Self::Action>,
    {
        for action in actions {
            self.dispatch(action);
        }
    }

    /// Dispatch and wait for the resulting state
    ///
    /// Fails with [`StoreError::Released`] when the store (or a substore's
    /// parent) goes away or a middleware drops the action.
    fn dispatch_async(
        &self,
        action: Self::Action,
    ) -> impl Future<Output = Result<Self::State, StoreError>> + Send {
        let (tx, rx) = oneshot::channel();
        self.dispatch_with(
            action,
            Box::new(move |state: &Self::State| {
                let _ = tx.send(state.clone());
            }),
        );
        async move { rx.await.map_err(|_| StoreError::Released) }
    }

    /// Register a reducer over the whole state
    fn connect<R>(&self, reducer: R) -> Unsubscriber
    where
        R: Reducer<Self::State, Self::Action>,
    {
        self.connect_boxed(Box::new(reducer))
    }

    /// Register a closure reducer; argument types are inferred
    fn connect_fn<F, E>(&self, reducer: F) -> Unsubscriber
    where
        F: Fn(&Self::Action, &mut Self::State) -> E + Send + Sync + 'static,
        E: Into<crate::Effects<Self::Action>>,
    {
        self.connect_boxed(Box::new(reducer))
    }

    /// Register a reducer over the part of the state `lens` focuses on
    fn connect_lens<P, R>(&self, reducer: R, lens: Lens<Self::State, P>) -> Unsubscriber
    where
        P: Send + Sync + 'static,
        R: Reducer<P, Self::Action>,
    {
        self.connect_boxed(Box::new(Lensed::new(Box::new(reducer), lens)))
    }

    /// Subscribe; the current state is delivered immediately
    fn subscribe<S>(&self, subscriber: S) -> Unsubscriber
    where
        S: Subscriber<Self::State>,
    {
        self.subscribe_boxed(Box::new(subscriber), true)
    }

    /// Subscribe with a closure; argument types are inferred
    fn subscribe_fn<F>(&self, subscriber: F) -> Unsubscriber
    where
        F: FnMut(&Self::State, Option<&Self::State>) + Send + 'static,
    {
        self.subscribe_boxed(Box::new(subscriber), true)
    }

    /// Observe every dispatched action, whether or not it changed state
    fn observe_actions<F>(&self, observer: F) -> Unsubscriber
    where
        F: FnMut(&Self::Action) + Send + 'static,
    {
        self.observe_actions_boxed(Box::new(observer))
    }

    /// A live projection of this store through `lens`
    fn substore<P>(self: &Arc<Self>, lens: Lens<Self::State, P>) -> Arc<Substore<Self, P>>
    where
        P: StateType,
    {
        Arc::new(Substore::new(self, lens))
    }
}

impl<T: StoreType + ?Sized> StoreExt for T {}
