//! Root store - owns the state cell and runs the reduction loop
//!
//! Every root store has a private worker task on its tokio runtime. `dispatch`
//! threads the action through the middleware chain in the caller's context;
//! the terminal stage queues it for the worker, which reduces one action (and
//! its immediate follow-ups) at a time:
//!
//! ```text
//! dispatch → middleware → queue → worker
//! worker: reduce → commit → notify → follow-ups → completion
//! ```

use super::{ActionType, Completion, StateType, StoreType};
use crate::dispatcher::Dispatcher;
use crate::effects::Effects;
use crate::error::StoreError;
use crate::middleware::{
    Cascade, Delivery, LoggingMiddleware, Middleware, Pipeline, SharedMiddleware, Terminal,
};
use crate::reducer::{BoxReducer, Reducer};
use crate::reentrancy::ReentrancyGuard;
use crate::subscription::{
    notify_all, BoxObserver, BoxSubscriber, ObserverSet, SubscriberSet, Subscriptions, Token,
    Unsubscriber,
};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use unistore_config::StoreConfig;

/// An action waiting for the worker, with the caller's completion
struct Envelope<S, A> {
    action: A,
    completion: Completion<S>,
}

/// Reducers keyed by token, plus their application order
struct Registry<S, A> {
    reducers: HashMap<Token, Arc<dyn Reducer<S, A>>>,
    order: Vec<Token>,
}

impl<S, A> Registry<S, A> {
    fn new() -> Self {
        Self {
            reducers: HashMap::new(),
            order: Vec::new(),
        }
    }
}

/// Store - holds the state and manages the reduction loop
pub struct Store<S: StateType, A: ActionType> {
    config: StoreConfig,
    state: RwLock<S>,
    registry: Mutex<Registry<S, A>>,
    subscribers: SubscriberSet<S>,
    observers: ObserverSet<A>,
    pipeline: Pipeline<S, A>,
    queue: mpsc::UnboundedSender<Envelope<S, A>>,
    runtime: Handle,
    guard: ReentrancyGuard,
    dispatcher: Dispatcher<S, A>,
    this: Weak<Self>,
}

impl<S: StateType, A: ActionType> Store<S, A> {
    /// Create a store with default configuration on the current runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use [`Store::builder`] to
    /// get an error instead.
    pub fn new(initial_state: S) -> Arc<Self> {
        Self::build_with(
            initial_state,
            StoreConfig::default(),
            Vec::new(),
            Vec::new(),
            Handle::current(),
        )
    }

    pub fn builder(initial_state: S) -> StoreBuilder<S, A> {
        StoreBuilder::new(initial_state)
    }

    fn build_with(
        initial_state: S,
        config: StoreConfig,
        middleware: Vec<SharedMiddleware<S, A>>,
        reducers: Vec<BoxReducer<S, A>>,
        runtime: Handle,
    ) -> Arc<Self> {
        let (queue, receiver) = mpsc::unbounded_channel();
        let store = Arc::new_cyclic(|this: &Weak<Self>| {
            let target: Weak<dyn StoreType<State = S, Action = A>> = this.clone();
            let dispatcher = Dispatcher::new(target);
            let middleware = with_logging(&config, middleware);
            Self {
                state: RwLock::new(initial_state),
                registry: Mutex::new(Registry::new()),
                subscribers: Subscriptions::new(),
                observers: Subscriptions::new(),
                pipeline: Pipeline::new(middleware, terminal(this.clone()), dispatcher.clone()),
                queue,
                runtime: runtime.clone(),
                guard: ReentrancyGuard::new(),
                dispatcher,
                this: this.clone(),
                config,
            }
        });

        for reducer in reducers {
            store.connect_boxed(reducer);
        }
        runtime.spawn(run_worker(Arc::downgrade(&store), receiver));

        log::info!(
            "[{}] store created with {} middleware, {} reducers",
            store.config.name,
            store.middleware_count(),
            store.reducer_count()
        );
        store
    }

    /// Get the dispatcher
    pub fn dispatcher(&self) -> Dispatcher<S, A> {
        self.dispatcher.clone()
    }

    /// Append middleware to the end of the chain
    pub fn add_middleware<M: Middleware<S, A>>(&self, middleware: M) {
        self.pipeline.add_middleware(Arc::new(middleware));
        log::debug!("[{}] middleware added", self.config.name);
    }

    /// Replace the whole middleware chain
    pub fn set_middleware(&self, middleware: Vec<SharedMiddleware<S, A>>) {
        self.pipeline.set_middleware(with_logging(&self.config, middleware));
        log::debug!("[{}] middleware replaced", self.config.name);
    }

    pub fn middleware_count(&self) -> usize {
        self.pipeline.len()
    }

    pub fn reducer_count(&self) -> usize {
        self.registry.lock().order.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn enqueue(&self, action: A, completion: Completion<S>) {
        log::trace!("[{}] queued {:?}", self.config.name, action);
        if self.queue.send(Envelope { action, completion }).is_err() {
            log::warn!("[{}] worker stopped, dropping action", self.config.name);
        }
    }

    /// Reduce one external action and its cascade of immediate follow-ups
    fn process(&self, envelope: Envelope<S, A>) {
        let Envelope { action, completion } = envelope;
        let cascade = Cascade::new();
        let mut ready = VecDeque::from([action]);

        while let Some(action) = ready.pop_front() {
            for follow_up in self.apply(action) {
                self.pipeline.run(follow_up, Delivery::Cascade(cascade.clone()));
            }
            ready.extend(cascade.drain());
        }

        // Follow-ups a middleware is still holding on to go through the queue
        for late in cascade.close() {
            self.enqueue(late, Box::new(|_| {}));
        }

        completion(&self.state());
    }

    /// Run one action through the reducers and publish the result
    fn apply(&self, action: A) -> Vec<A> {
        log::trace!("[{}] reducing {:?}", self.config.name, action);
        let current = self.state();
        let mut pending = current.clone();
        let effects = {
            let _entered = self.guard.enter();
            self.reduce(&action, &mut pending)
        };

        self.commit(current, pending);
        notify_all(&self.observers, &action);

        let (immediate, deferred) = effects.into_parts();
        for stream in deferred {
            self.spawn_deferred(stream);
        }
        immediate
    }

    fn reduce(&self, action: &A, state: &mut S) -> Effects<A> {
        let order = self.registry.lock().order.clone();
        let mut effects = Effects::none();
        for token in order {
            // The lock covers the lookup only, so a reducer may connect or
            // disconnect; a reducer removed mid-pass is skipped
            let reducer = self.registry.lock().reducers.get(&token).cloned();
            if let Some(reducer) = reducer {
                effects = effects.merge(reducer.reduce(action, state));
            }
        }
        effects
    }

    fn commit(&self, current: S, pending: S) {
        if pending == current {
            log::trace!("[{}] state unchanged, skipping notifications", self.config.name);
            return;
        }

        let announced: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .map(|(token, entry)| (*token, Arc::clone(entry)))
            .collect();
        for (_, entry) in &announced {
            entry.lock().will_change(&pending, &current);
        }
        let announced: BTreeSet<Token> = announced.into_iter().map(|(token, _)| token).collect();

        let entries: Vec<_> = {
            let subscribers = self.subscribers.lock();
            *self.state.write() = pending.clone();
            subscribers
                .iter()
                .map(|(token, entry)| (*token, Arc::clone(entry)))
                .collect()
        };

        for (token, entry) in entries {
            let mut subscriber = entry.lock();
            // registered while will_change was running
            if !announced.contains(&token) {
                subscriber.will_change(&pending, &current);
            }
            subscriber.new_state(&pending, Some(&current));
        }
    }

    fn spawn_deferred(&self, mut stream: BoxStream<'static, A>) {
        let dispatcher = self.dispatcher.clone();
        let name = self.config.name.clone();
        self.runtime.spawn(async move {
            while let Some(action) = stream.next().await {
                if !dispatcher.try_dispatch(action) {
                    log::warn!("[{}] store released, dropping deferred effect", name);
                    break;
                }
            }
        });
    }

    fn cancel(&self, token: Token) -> Unsubscriber {
        let this = self.this.clone();
        Unsubscriber::new(token, move || {
            if let Some(store) = this.upgrade() {
                store.unsubscribe(token);
            }
        })
    }
}

impl<S: StateType, A: ActionType> StoreType for Store<S, A> {
    type State = S;
    type Action = A;

    fn state(&self) -> S {
        self.state.read().clone()
    }

    fn dispatch_with(&self, action: A, completion: Completion<S>) {
        if self.config.strict_reentrancy {
            self.guard.check(&self.config.name);
        }
        self.pipeline.run(action, Delivery::Completion(completion));
    }

    fn connect_boxed(&self, reducer: BoxReducer<S, A>) -> Unsubscriber {
        let token = Token::next();
        {
            let mut registry = self.registry.lock();
            registry.reducers.insert(token, Arc::from(reducer));
            registry.order.push(token);
        }
        log::debug!("[{}] reducer {} connected", self.config.name, token);
        self.cancel(token)
    }

    fn subscribe_boxed(&self, subscriber: BoxSubscriber<S>, send_current: bool) -> Unsubscriber {
        let token = Token::next();
        let entry = Arc::new(Mutex::new(subscriber));

        // Hold the entry while registering so a concurrent commit cannot
        // deliver a newer state ahead of the initial one
        let mut subscriber = entry.lock();
        let current = {
            let mut subscribers = self.subscribers.lock();
            subscribers.insert(token, Arc::clone(&entry));
            self.state.read().clone()
        };
        if send_current {
            subscriber.new_state(&current, None);
        }
        drop(subscriber);

        self.cancel(token)
    }

    fn unsubscribe(&self, token: Token) {
        if self.subscribers.remove(token) || self.observers.remove(token) {
            return;
        }
        let mut registry = self.registry.lock();
        if registry.reducers.remove(&token).is_some() {
            registry.order.retain(|connected| *connected != token);
            log::debug!("[{}] reducer {} disconnected", self.config.name, token);
        }
    }

    fn observe_actions_boxed(&self, observer: BoxObserver<A>) -> Unsubscriber {
        let token = Token::next();
        self.observers.insert(token, observer);
        self.cancel(token)
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Final link of the chain: hand the action to the worker
fn terminal<S: StateType, A: ActionType>(store: Weak<Store<S, A>>) -> Terminal<S, A> {
    Arc::new(move |action: A, delivery: Delivery<S, A>| {
        let Some(store) = store.upgrade() else {
            log::debug!("store released, dropping {:?}", action);
            return;
        };
        match delivery {
            Delivery::Completion(completion) => store.enqueue(action, completion),
            Delivery::Cascade(cascade) => {
                if let Err(action) = cascade.push(action) {
                    store.enqueue(action, Box::new(|_| {}));
                }
            }
        }
    })
}

async fn run_worker<S: StateType, A: ActionType>(
    store: Weak<Store<S, A>>,
    mut receiver: mpsc::UnboundedReceiver<Envelope<S, A>>,
) {
    while let Some(envelope) = receiver.recv().await {
        let Some(store) = store.upgrade() else {
            break;
        };
        store.process(envelope);
    }
    log::debug!("store worker stopped");
}

fn with_logging<S: StateType, A: ActionType>(
    config: &StoreConfig,
    middleware: Vec<SharedMiddleware<S, A>>,
) -> Vec<SharedMiddleware<S, A>> {
    if !config.log_actions {
        return middleware;
    }
    let mut chain: Vec<SharedMiddleware<S, A>> =
        vec![Arc::new(LoggingMiddleware::labeled(config.name.clone()))];
    chain.extend(middleware);
    chain
}

/// Builder supplying the construction-time inputs of a [`Store`]
pub struct StoreBuilder<S: StateType, A: ActionType> {
    state: S,
    config: StoreConfig,
    middleware: Vec<SharedMiddleware<S, A>>,
    reducers: Vec<BoxReducer<S, A>>,
    runtime: Option<Handle>,
}

impl<S: StateType, A: ActionType> StoreBuilder<S, A> {
    pub fn new(initial_state: S) -> Self {
        Self {
            state: initial_state,
            config: StoreConfig::default(),
            middleware: Vec::new(),
            reducers: Vec::new(),
            runtime: None,
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Read the configuration from a TOML file
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Result<Self, StoreError> {
        self.config = StoreConfig::from_path(path)?;
        Ok(self)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Append middleware; the first added sees actions first
    pub fn middleware<M: Middleware<S, A>>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn reducer<R: Reducer<S, A>>(mut self, reducer: R) -> Self {
        self.reducers.push(Box::new(reducer));
        self
    }

    /// Run the worker and deferred effects on `runtime`
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<Arc<Store<S, A>>, StoreError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| StoreError::NoRuntime)?,
        };
        Ok(Store::build_with(
            self.state,
            self.config,
            self.middleware,
            self.reducers,
            runtime,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;
    use crate::{Effects, StoreExt};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Add(i64),
        Double,
        Noop,
        Start,
        Finish,
        Later,
    }

    type Seen = Arc<Mutex<Vec<(i64, Option<i64>)>>>;

    fn adder(action: &Action, n: &mut i64) {
        match action {
            Action::Add(k) => *n += k,
            Action::Double => *n *= 2,
            _ => {}
        }
    }

    fn recorder(seen: &Seen) -> impl FnMut(&i64, Option<&i64>) + Send + 'static {
        let seen = Arc::clone(seen);
        move |state: &i64, old: Option<&i64>| seen.lock().push((*state, old.copied()))
    }

    async fn settle(store: &Store<i64, Action>, expected: i64) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let unsubscriber = store.subscribe_fn(move |state: &i64, _| {
            let _ = tx.send(*state);
        });
        timeout(Duration::from_secs(2), async {
            while let Some(state) = rx.recv().await {
                if state == expected {
                    break;
                }
            }
        })
        .await
        .expect("state never settled");
        unsubscriber.unsubscribe();
    }

    #[tokio::test]
    async fn test_reducers_apply_in_registration_order() {
        let store: Arc<Store<i64, Action>> = Store::new(3);
        store.connect_fn(|_: &Action, n: &mut i64| *n *= 2);
        store.connect_fn(|_: &Action, n: &mut i64| *n += 1);

        // R2(R1(3)) = 7, R1(R2(3)) would be 8
        assert_eq!(store.dispatch_async(Action::Noop).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_state_first() {
        let store = Store::builder(5i64).reducer(adder).build().unwrap();
        let seen: Seen = Arc::default();
        store.subscribe_fn(recorder(&seen));
        assert_eq!(*seen.lock(), vec![(5, None)]);

        store.dispatch_async(Action::Add(1)).await.unwrap();
        assert_eq!(*seen.lock(), vec![(5, None), (6, Some(5))]);
    }

    #[tokio::test]
    async fn test_unchanged_state_triggers_no_notification() {
        let store = Store::builder(1i64).reducer(adder).build().unwrap();
        let seen: Seen = Arc::default();
        store.subscribe_fn(recorder(&seen));

        store.dispatch_async(Action::Noop).await.unwrap();
        store.dispatch_async(Action::Add(0)).await.unwrap();
        assert_eq!(*seen.lock(), vec![(1, None)]);
    }

    #[tokio::test]
    async fn test_will_change_precedes_new_state() {
        struct Tracer(Arc<Mutex<Vec<String>>>);

        impl crate::Subscriber<i64> for Tracer {
            fn new_state(&mut self, state: &i64, old: Option<&i64>) {
                self.0.lock().push(format!("new {} {:?}", state, old));
            }

            fn will_change(&mut self, pending: &i64, current: &i64) {
                self.0.lock().push(format!("will {} {}", pending, current));
            }
        }

        let store = Store::builder(1i64).reducer(adder).build().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        store.subscribe(Tracer(Arc::clone(&log)));
        store.dispatch_async(Action::Add(2)).await.unwrap();
        store.dispatch_async(Action::Noop).await.unwrap();

        assert_eq!(*log.lock(), vec!["new 1 None", "will 3 1", "new 3 Some(1)"]);
    }

    #[tokio::test]
    async fn test_subscriber_joining_mid_commit_gets_will_change() {
        struct Tracer(Arc<Mutex<Vec<String>>>);

        impl crate::Subscriber<i64> for Tracer {
            fn new_state(&mut self, state: &i64, old: Option<&i64>) {
                self.0.lock().push(format!("new {} {:?}", state, old));
            }

            fn will_change(&mut self, pending: &i64, current: &i64) {
                self.0.lock().push(format!("will {} {}", pending, current));
            }
        }

        struct Recruiter {
            store: Weak<Store<i64, Action>>,
            recruit: Option<Tracer>,
        }

        impl crate::Subscriber<i64> for Recruiter {
            fn new_state(&mut self, _: &i64, _: Option<&i64>) {}

            fn will_change(&mut self, _: &i64, _: &i64) {
                if let (Some(tracer), Some(store)) = (self.recruit.take(), self.store.upgrade()) {
                    store.subscribe(tracer);
                }
            }
        }

        let store = Store::builder(1i64).reducer(adder).build().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        store.subscribe(Recruiter {
            store: Arc::downgrade(&store),
            recruit: Some(Tracer(Arc::clone(&log))),
        });

        store.dispatch_async(Action::Add(2)).await.unwrap();
        assert_eq!(store.subscriber_count(), 2);
        assert_eq!(*log.lock(), vec!["new 1 None", "will 3 1", "new 3 Some(1)"]);
    }

    #[tokio::test]
    async fn test_unsubscribed_subscriber_gets_nothing_more() {
        let store = Store::builder(0i64).reducer(adder).build().unwrap();
        let seen: Seen = Arc::default();
        let unsubscriber = store.subscribe_fn(recorder(&seen));
        assert_eq!(store.subscriber_count(), 1);
        unsubscriber.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);

        store.dispatch_async(Action::Add(1)).await.unwrap();
        assert_eq!(*seen.lock(), vec![(0, None)]);
    }

    #[tokio::test]
    async fn test_disconnected_reducer_no_longer_applies() {
        let store = Store::builder(0i64).reducer(adder).build().unwrap();
        let tenfold = store.connect_fn(|action: &Action, n: &mut i64| {
            if let Action::Add(_) = action {
                *n *= 10
            }
        });
        assert_eq!(store.dispatch_async(Action::Add(1)).await.unwrap(), 10);

        tenfold.unsubscribe();
        assert_eq!(store.reducer_count(), 1);
        assert_eq!(store.dispatch_async(Action::Add(1)).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_disconnect_from_inside_a_reducer() {
        let store: Arc<Store<i64, Action>> = Store::new(0);
        let handle: Arc<Mutex<Option<Unsubscriber>>> = Arc::default();

        let slot = Arc::clone(&handle);
        store.connect_fn(move |action: &Action, _: &mut i64| {
            if let Action::Start = action {
                if let Some(unsubscriber) = slot.lock().take() {
                    unsubscriber.unsubscribe();
                }
            }
        });
        *handle.lock() = Some(store.connect_fn(|_: &Action, n: &mut i64| *n += 100));

        // The victim runs after the reducer that removes it, so it is
        // already gone during this pass
        assert_eq!(store.dispatch_async(Action::Start).await.unwrap(), 0);
        assert_eq!(store.dispatch_async(Action::Noop).await.unwrap(), 0);
        assert_eq!(store.reducer_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_inside_a_reducer_applies_next_pass() {
        let store: Arc<Store<i64, Action>> = Store::new(0);
        let weak = Arc::downgrade(&store);
        store.connect_fn(move |action: &Action, _: &mut i64| {
            if let (Action::Start, Some(store)) = (action, weak.upgrade()) {
                store.connect_fn(adder);
            }
        });

        assert_eq!(store.dispatch_async(Action::Start).await.unwrap(), 0);
        assert_eq!(store.dispatch_async(Action::Add(4)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_follow_ups_are_reduced_before_completion() {
        let store = Store::builder(0i64)
            .reducer(|action: &Action, n: &mut i64| match action {
                Action::Start => {
                    *n = 1;
                    Effects::action(Action::Finish)
                }
                Action::Finish => {
                    *n += 10;
                    Effects::none()
                }
                _ => Effects::none(),
            })
            .build()
            .unwrap();
        let seen: Seen = Arc::default();
        store.subscribe_fn(recorder(&seen));

        assert_eq!(store.dispatch_async(Action::Start).await.unwrap(), 11);
        assert_eq!(*seen.lock(), vec![(0, None), (1, Some(0)), (11, Some(1))]);
    }

    #[tokio::test]
    async fn test_deferred_effects_dispatch_when_ready() {
        let store = Store::builder(0i64)
            .reducer(|action: &Action, n: &mut i64| match action {
                Action::Later => Effects::future(async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Action::Add(7)
                }),
                other => {
                    adder(other, n);
                    Effects::none()
                }
            })
            .build()
            .unwrap();

        // Completion fires before the deferred action arrives
        assert_eq!(store.dispatch_async(Action::Later).await.unwrap(), 0);
        settle(&store, 7).await;
    }

    #[tokio::test]
    async fn test_observers_see_every_action() {
        let store = Store::builder(0i64).reducer(adder).build().unwrap();
        let actions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&actions);
        store.observe_actions(move |action: &Action| sink.lock().push(action.clone()));

        store.dispatch(Action::Add(1));
        store.dispatch_async(Action::Noop).await.unwrap();
        assert_eq!(*actions.lock(), vec![Action::Add(1), Action::Noop]);
    }

    #[tokio::test]
    async fn test_sequential_dispatches_reduce_in_call_order() {
        let store = Store::builder(1i64).reducer(adder).build().unwrap();
        store.dispatch_all([Action::Add(1), Action::Double, Action::Add(1)]);
        assert_eq!(store.dispatch_async(Action::Noop).await.unwrap(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch_is_serialized() {
        let store = Store::builder(0i64).reducer(adder).build().unwrap();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..100 {
                        store.dispatch_async(Action::Add(1)).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.state(), 800);
    }

    #[tokio::test]
    async fn test_middleware_transforms_and_drops() {
        let store = Store::builder(0i64).reducer(adder).build().unwrap();
        store.add_middleware(
            |action: Action, _: &Dispatcher<i64, Action>, next: Next<i64, Action>| match action {
                Action::Double => {} // swallowed
                Action::Add(n) => next.run(Action::Add(n * 100)),
                other => next.run(other),
            },
        );

        assert_eq!(store.dispatch_async(Action::Add(1)).await.unwrap(), 100);
        assert!(matches!(
            store.dispatch_async(Action::Double).await,
            Err(StoreError::Released)
        ));
        assert_eq!(store.state(), 100);
    }

    #[tokio::test]
    async fn test_set_middleware_replaces_chain() {
        let store = Store::builder(0i64)
            .config(StoreConfig {
                log_actions: true,
                ..StoreConfig::named("swap")
            })
            .reducer(adder)
            .middleware(|_: Action, _: &Dispatcher<i64, Action>, _: Next<i64, Action>| {})
            .build()
            .unwrap();
        assert_eq!(store.middleware_count(), 2);

        store.set_middleware(Vec::new());
        // logging stays in front
        assert_eq!(store.middleware_count(), 1);
        assert_eq!(store.dispatch_async(Action::Add(2)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_middleware_dispatches_through_dispatcher() {
        let store = Store::builder(0i64).reducer(adder).build().unwrap();
        store.add_middleware(
            |action: Action, dispatcher: &Dispatcher<i64, Action>, next: Next<i64, Action>| {
                if action == Action::Start {
                    dispatcher.dispatch(Action::Add(3));
                }
                next.run(action);
            },
        );

        store.dispatch_async(Action::Start).await.unwrap();
        assert_eq!(store.dispatch_async(Action::Noop).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reentrant_dispatch_is_queued_by_default() {
        let store: Arc<Store<i64, Action>> = Store::new(0);
        let dispatcher = store.dispatcher();
        store.connect_fn(move |action: &Action, n: &mut i64| {
            if let Action::Start = action {
                dispatcher.dispatch(Action::Add(1));
            }
            adder(action, n);
        });

        assert_eq!(store.dispatch_async(Action::Start).await.unwrap(), 0);
        assert_eq!(store.dispatch_async(Action::Noop).await.unwrap(), 1);
    }

    const STRICT_CHILD: &str = "UNISTORE_STRICT_REENTRANCY_CHILD";

    /// Runs in a child copy of the test binary, which must die before the
    /// dispatch completes
    fn trap_reducer_dispatch() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store: Arc<Store<i64, Action>> = Store::builder(0i64)
                .config(StoreConfig {
                    strict_reentrancy: true,
                    ..StoreConfig::default()
                })
                .reducer(adder)
                .build()
                .unwrap();
            let dispatcher = store.dispatcher();
            store.connect_fn(move |action: &Action, _: &mut i64| {
                if let Action::Start = action {
                    dispatcher.dispatch(Action::Add(1));
                }
            });

            let _ = timeout(Duration::from_secs(5), store.dispatch_async(Action::Start)).await;
        });
    }

    #[test]
    fn test_strict_reentrancy_aborts_the_process() {
        if std::env::var_os(STRICT_CHILD).is_some() {
            trap_reducer_dispatch();
            return;
        }

        let status = std::process::Command::new(std::env::current_exe().unwrap())
            .args([
                "--exact",
                "store::root::tests::test_strict_reentrancy_aborts_the_process",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(STRICT_CHILD, "1")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();

        assert!(!status.success());
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            // SIGABRT
            assert_eq!(status.signal(), Some(6));
        }
    }

    #[tokio::test]
    async fn test_dropping_store_releases_dispatcher() {
        let store: Arc<Store<i64, Action>> = Store::new(0);
        let dispatcher = store.dispatcher();
        assert!(dispatcher.is_alive());
        assert_eq!(dispatcher.state(), Some(0));

        drop(store);
        assert!(!dispatcher.is_alive());
        assert!(!dispatcher.try_dispatch(Action::Noop));
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = Store::<i64, Action>::builder(0).build();
        assert!(matches!(result, Err(StoreError::NoRuntime)));
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let result = Store::<i64, Action>::builder(0).config_path("/nonexistent/.unistore.toml");
        assert!(matches!(
            result,
            Err(StoreError::Config(unistore_config::ConfigError::Io { .. }))
        ));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Store::builder(0i64)
            .runtime(runtime.handle().clone())
            .reducer(adder)
            .build()
            .unwrap();
        let state = runtime.block_on(store.dispatch_async(Action::Add(2))).unwrap();
        assert_eq!(state, 2);
    }
}
