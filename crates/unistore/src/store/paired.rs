//! Paired store - two independent stores presented as one
//!
//! `Stores` owns no state. Its state is the [`Union`] of both children, read
//! live. Dispatches fan out to both children and complete once both are done;
//! reducers are split into one wrapped reducer per child; subscriptions are
//! made on both children and recombined.

use super::{Completion, StateType, StoreType};
use crate::dispatcher::Dispatcher;
use crate::effects::Effects;
use crate::join::Join;
use crate::middleware::{Delivery, Middleware, Pipeline, SharedMiddleware, Terminal};
use crate::reducer::{BoxReducer, Reducer};
use crate::subscription::{
    notify_all, BoxObserver, BoxSubscriber, ObserverSet, Subscriber, Subscriptions, Token,
    Unsubscriber,
};
use crate::Union;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use unistore_config::StoreConfig;

type Pair<SA, SB> = Union<<SA as StoreType>::State, <SB as StoreType>::State>;

pub struct Stores<SA, SB>
where
    SA: StoreType,
    SB: StoreType<Action = SA::Action>,
{
    store1: Arc<SA>,
    store2: Arc<SB>,
    pipeline: Pipeline<Pair<SA, SB>, SA::Action>,
    observers: ObserverSet<SA::Action>,
    pairs: Mutex<HashMap<Token, (Token, Token)>>,
    config: StoreConfig,
    this: Weak<Self>,
}

impl<SA, SB> Stores<SA, SB>
where
    SA: StoreType,
    SB: StoreType<Action = SA::Action>,
{
    pub fn new(store1: Arc<SA>, store2: Arc<SB>) -> Arc<Self> {
        Self::with_middleware(store1, store2, Vec::new())
    }

    /// Pair two stores behind a middleware chain of their own
    ///
    /// The chain runs once per dispatch, before the fan-out; each child's
    /// own chain then runs as usual.
    pub fn with_middleware(
        store1: Arc<SA>,
        store2: Arc<SB>,
        middleware: Vec<SharedMiddleware<Pair<SA, SB>, SA::Action>>,
    ) -> Arc<Self> {
        let config = StoreConfig {
            name: format!("{}+{}", store1.config().name, store2.config().name),
            ..store1.config().clone()
        };
        log::info!("[{}] paired store created", config.name);

        Arc::new_cyclic(|this: &Weak<Self>| {
            let target: Weak<dyn StoreType<State = Pair<SA, SB>, Action = SA::Action>> =
                this.clone();
            Self {
                store1,
                store2,
                pipeline: Pipeline::new(middleware, fan_out(this.clone()), Dispatcher::new(target)),
                observers: Subscriptions::new(),
                pairs: Mutex::new(HashMap::new()),
                config,
                this: this.clone(),
            }
        })
    }

    pub fn first(&self) -> &Arc<SA> {
        &self.store1
    }

    pub fn second(&self) -> &Arc<SB> {
        &self.store2
    }

    pub fn add_middleware<M: Middleware<Pair<SA, SB>, SA::Action>>(&self, middleware: M) {
        self.pipeline.add_middleware(Arc::new(middleware));
        log::debug!("[{}] middleware added", self.config.name);
    }

    pub fn set_middleware(&self, middleware: Vec<SharedMiddleware<Pair<SA, SB>, SA::Action>>) {
        self.pipeline.set_middleware(middleware);
        log::debug!("[{}] middleware replaced", self.config.name);
    }

    pub fn middleware_count(&self) -> usize {
        self.pipeline.len()
    }

    /// Dispatch to both children; complete once both have completed
    fn forward(&self, action: SA::Action, completion: Completion<Pair<SA, SB>>) {
        let this = self.this.clone();
        let observed = action.clone();
        let join = Join::new(2, move || {
            if let Some(stores) = this.upgrade() {
                notify_all(&stores.observers, &observed);
                completion(&stores.state());
            }
        });
        self.store1.dispatch_with(action.clone(), join.arm());
        self.store2.dispatch_with(action, join.arm());
    }

    fn register(&self, first: Unsubscriber, second: Unsubscriber) -> Unsubscriber {
        let token = Token::next();
        self.pairs
            .lock()
            .insert(token, (first.token(), second.token()));
        let this = self.this.clone();
        Unsubscriber::new(token, move || {
            if let Some(stores) = this.upgrade() {
                stores.unsubscribe(token);
            }
        })
    }
}

impl<SA, SB> StoreType for Stores<SA, SB>
where
    SA: StoreType,
    SB: StoreType<Action = SA::Action>,
{
    type State = Pair<SA, SB>;
    type Action = SA::Action;

    fn state(&self) -> Self::State {
        Union::new(self.store1.state(), self.store2.state())
    }

    fn dispatch_with(&self, action: SA::Action, completion: Completion<Self::State>) {
        self.pipeline.run(action, Delivery::Completion(completion));
    }

    fn connect_boxed(&self, reducer: BoxReducer<Self::State, SA::Action>) -> Unsubscriber {
        let shared: Arc<dyn Reducer<Self::State, SA::Action>> = Arc::from(reducer);

        // Each child rebuilds the pair from its own half and the sibling's
        // live state, and keeps only its own half of the result
        let first = {
            let shared = Arc::clone(&shared);
            let sibling = Sibling::new(&self.store2);
            move |action: &SA::Action, a: &mut SA::State| -> Effects<SA::Action> {
                let mut pair = Union::new(a.clone(), sibling.state());
                let effects = shared.reduce(action, &mut pair);
                *a = pair.a;
                effects
            }
        };
        let second = {
            let sibling = Sibling::new(&self.store1);
            move |action: &SA::Action, b: &mut SB::State| -> Effects<SA::Action> {
                let mut pair = Union::new(sibling.state(), b.clone());
                let effects = shared.reduce(action, &mut pair);
                *b = pair.b;
                effects
            }
        };

        let first = self.store1.connect_boxed(Box::new(first));
        let second = self.store2.connect_boxed(Box::new(second));
        log::debug!("[{}] paired reducer connected", self.config.name);
        self.register(first, second)
    }

    fn subscribe_boxed(
        &self,
        subscriber: BoxSubscriber<Self::State>,
        send_current: bool,
    ) -> Unsubscriber {
        let shared = Arc::new(Mutex::new(Paired {
            inner: subscriber,
            last: None,
            skip_repeats: self.config.skip_repeats,
        }));

        let first = {
            let sibling = Sibling::new(&self.store2);
            Half {
                shared: Arc::clone(&shared),
                combine: move |a: &SA::State| Union::new(a.clone(), sibling.state()),
            }
        };
        let second = {
            let sibling = Sibling::new(&self.store1);
            Half {
                shared,
                combine: move |b: &SB::State| Union::new(sibling.state(), b.clone()),
            }
        };

        // Only one half delivers the current pair
        let first = self.store1.subscribe_boxed(Box::new(first), false);
        let second = self.store2.subscribe_boxed(Box::new(second), send_current);
        self.register(first, second)
    }

    fn unsubscribe(&self, token: Token) {
        if self.observers.remove(token) {
            return;
        }
        let pair = self.pairs.lock().remove(&token);
        if let Some((first, second)) = pair {
            self.store1.unsubscribe(first);
            self.store2.unsubscribe(second);
        }
    }

    fn observe_actions_boxed(&self, observer: BoxObserver<SA::Action>) -> Unsubscriber {
        let token = Token::next();
        self.observers.insert(token, observer);
        let this = self.this.clone();
        Unsubscriber::new(token, move || {
            if let Some(stores) = this.upgrade() {
                stores.unsubscribe(token);
            }
        })
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}

fn fan_out<SA, SB>(stores: Weak<Stores<SA, SB>>) -> Terminal<Pair<SA, SB>, SA::Action>
where
    SA: StoreType,
    SB: StoreType<Action = SA::Action>,
{
    Arc::new(move |action: SA::Action, delivery: Delivery<Pair<SA, SB>, SA::Action>| {
        let Some(stores) = stores.upgrade() else {
            log::debug!("paired store released, dropping {:?}", action);
            return;
        };
        let completion: Completion<Pair<SA, SB>> = match delivery {
            Delivery::Completion(completion) => completion,
            // follow-ups are reduced by the children, never by the pair
            Delivery::Cascade(_) => Box::new(|_| {}),
        };
        stores.forward(action, completion);
    })
}

/// Live view of the other half, remembering the last value read
struct Sibling<S: StoreType> {
    store: Weak<S>,
    fallback: Mutex<S::State>,
}

impl<S: StoreType> Sibling<S> {
    fn new(store: &Arc<S>) -> Self {
        Self {
            store: Arc::downgrade(store),
            fallback: Mutex::new(store.state()),
        }
    }

    fn state(&self) -> S::State {
        match self.store.upgrade() {
            Some(store) => {
                let state = store.state();
                *self.fallback.lock() = state.clone();
                state
            }
            None => self.fallback.lock().clone(),
        }
    }
}

/// The outer subscriber, shared by both halves
struct Paired<S> {
    inner: BoxSubscriber<S>,
    last: Option<S>,
    skip_repeats: bool,
}

impl<S: StateType> Paired<S> {
    fn new_state(&mut self, pair: S) {
        if self.skip_repeats && self.last.as_ref() == Some(&pair) {
            return;
        }
        let previous = self.last.replace(pair.clone());
        self.inner.new_state(&pair, previous.as_ref());
    }

    fn will_change(&mut self, pending: S, current: S) {
        if self.skip_repeats && pending == current {
            return;
        }
        self.inner.will_change(&pending, &current);
    }
}

/// Child subscriber completing its half into a pair
struct Half<S, F> {
    shared: Arc<Mutex<Paired<S>>>,
    combine: F,
}

impl<T, S, F> Subscriber<T> for Half<S, F>
where
    T: StateType,
    S: StateType,
    F: Fn(&T) -> S + Send + 'static,
{
    fn new_state(&mut self, state: &T, _old: Option<&T>) {
        let pair = (self.combine)(state);
        self.shared.lock().new_state(pair);
    }

    fn will_change(&mut self, pending: &T, current: &T) {
        let pending = (self.combine)(pending);
        let current = (self.combine)(current);
        self.shared.lock().will_change(pending, current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;
    use crate::{Store, StoreExt};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Inc,
        SetB(i64),
        Copy,
        Ignored,
    }

    type Child = Store<i64, Action>;
    type Pairs = Stores<Child, Child>;

    fn children(a: i64, b: i64) -> (Arc<Child>, Arc<Child>) {
        (Store::new(a), Store::new(b))
    }

    #[tokio::test]
    async fn test_completion_fires_once_after_both_children() {
        let (store1, store2) = children(0, 0);
        store1.connect_fn(|action: &Action, n: &mut i64| {
            if let Action::Inc = action {
                *n += 1
            }
        });
        store2.connect_fn(|action: &Action, n: &mut i64| {
            if let Action::Inc = action {
                *n += 10
            }
        });
        // store2 finishes well after store1
        store2.add_middleware(
            |action: Action, _: &Dispatcher<i64, Action>, next: Next<i64, Action>| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    next.run(action);
                });
            },
        );
        let stores: Arc<Pairs> = Stores::new(store1, store2);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let (tx, rx) = oneshot::channel();
        stores.dispatch_then(Action::Inc, move |pair: &Union<i64, i64>| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(pair.clone());
        });

        assert_eq!(rx.await.unwrap(), Union::new(1, 10));
        stores.dispatch_async(Action::Ignored).await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_split_reducer_reads_live_sibling() {
        let (store1, store2) = children(1, 10);
        store2.connect_fn(|action: &Action, b: &mut i64| {
            if let Action::SetB(value) = action {
                *b = *value
            }
        });
        let stores: Arc<Pairs> = Stores::new(Arc::clone(&store1), Arc::clone(&store2));
        stores.connect_fn(|action: &Action, pair: &mut Union<i64, i64>| {
            if let Action::Copy = action {
                pair.a = pair.b
            }
        });

        assert_eq!(stores.dispatch_async(Action::Copy).await.unwrap(), Union::new(10, 10));

        // b changes behind the pair's back; the shared reducer must see it
        store2.dispatch_async(Action::SetB(42)).await.unwrap();
        assert_eq!(stores.dispatch_async(Action::Copy).await.unwrap(), Union::new(42, 42));
    }

    #[tokio::test]
    async fn test_split_reducer_writes_only_own_half() {
        let (store1, store2) = children(0, 0);
        let stores: Arc<Pairs> = Stores::new(Arc::clone(&store1), Arc::clone(&store2));
        let connection = stores.connect_fn(|action: &Action, pair: &mut Union<i64, i64>| {
            if let Action::Inc = action {
                pair.a += 1;
                pair.b += 2;
            }
        });
        assert_eq!(store1.reducer_count(), 1);
        assert_eq!(store2.reducer_count(), 1);

        assert_eq!(stores.dispatch_async(Action::Inc).await.unwrap(), Union::new(1, 2));

        connection.unsubscribe();
        assert_eq!(store1.reducer_count(), 0);
        assert_eq!(store2.reducer_count(), 0);
        assert_eq!(stores.dispatch_async(Action::Inc).await.unwrap(), Union::new(1, 2));
    }

    #[tokio::test]
    async fn test_subscriber_receives_recombined_pairs() {
        let (store1, store2) = children(1, 10);
        store1.connect_fn(|action: &Action, a: &mut i64| {
            if let Action::Inc = action {
                *a += 1
            }
        });
        store2.connect_fn(|action: &Action, b: &mut i64| {
            if let Action::SetB(value) = action {
                *b = *value
            }
        });
        let stores: Arc<Pairs> = Stores::new(Arc::clone(&store1), Arc::clone(&store2));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription =
            stores.subscribe_fn(move |pair: &Union<i64, i64>, old: Option<&Union<i64, i64>>| {
                sink.lock().push((pair.into_tuple(), old.map(|old| old.into_tuple())));
            });

        stores.dispatch_async(Action::Inc).await.unwrap();
        stores.dispatch_async(Action::SetB(20)).await.unwrap();
        assert_eq!(
            *seen.lock(),
            vec![
                ((1, 10), None),
                ((2, 10), Some((1, 10))),
                ((2, 20), Some((2, 10))),
            ]
        );

        subscription.unsubscribe();
        assert_eq!(store1.subscriber_count(), 0);
        assert_eq!(store2.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_pair_middleware_and_observers() {
        let (store1, store2) = children(0, 0);
        let stores: Arc<Pairs> = Stores::new(Arc::clone(&store1), Arc::clone(&store2));
        stores.connect_fn(|action: &Action, pair: &mut Union<i64, i64>| {
            if let Action::Inc = action {
                pair.a += 1;
                pair.b += 1;
            }
        });
        stores.add_middleware(
            |action: Action,
             _: &Dispatcher<Union<i64, i64>, Action>,
             next: Next<Union<i64, i64>, Action>| {
                if action != Action::Ignored {
                    next.run(action)
                }
            },
        );
        assert_eq!(stores.middleware_count(), 1);

        let observed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&observed);
        stores.observe_actions(move |_: &Action| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(stores.dispatch_async(Action::Ignored).await.is_err());
        assert_eq!(stores.dispatch_async(Action::Inc).await.unwrap(), Union::new(1, 1));
        // once per pair dispatch, not once per child
        assert_eq!(observed.load(Ordering::SeqCst), 1);
        assert_eq!(stores.config().name, "store+store");
    }
}
