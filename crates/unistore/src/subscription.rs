//! Subscriber bookkeeping
//!
//! Subscribers are stored in a token-keyed arena. `subscribe` hands back an
//! [`Unsubscriber`] carrying the token; removal is by token, so no identity
//! hashing or weak references to subscribers are needed.

use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle identifying one subscription or reducer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    /// Allocate a token unique for the lifetime of the process
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Token(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability to undo a `subscribe`, `observe_actions` or `connect`
///
/// Dropping it keeps the registration alive; call [`Unsubscriber::unsubscribe`]
/// to remove it. Unsubscribing after the store is gone is a no-op.
pub struct Unsubscriber {
    token: Token,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscriber {
    pub(crate) fn new(token: Token, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            token,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle whose registration never took place
    pub(crate) fn noop() -> Self {
        Self {
            token: Token::next(),
            cancel: None,
        }
    }

    /// Token of the registration, usable with `StoreType::unsubscribe`
    pub fn token(&self) -> Token {
        self.token
    }

    /// Remove the registration
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Unsubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscriber")
            .field("token", &self.token)
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Receives state transitions from a store
///
/// `will_change` runs before a new state is committed, `new_state` after.
/// Neither runs when the reduction left the state equal to the previous one.
pub trait Subscriber<S>: Send + 'static {
    /// Called with the committed state and the state it replaced.
    /// `old` is `None` for the delivery made at subscription time.
    fn new_state(&mut self, state: &S, old: Option<&S>);

    /// Called with the state about to be committed and the current state
    fn will_change(&mut self, _pending: &S, _current: &S) {}
}

impl<S, F> Subscriber<S> for F
where
    F: FnMut(&S, Option<&S>) + Send + 'static,
{
    fn new_state(&mut self, state: &S, old: Option<&S>) {
        self(state, old)
    }
}

pub type BoxSubscriber<S> = Box<dyn Subscriber<S>>;

/// Callback receiving every dispatched action
pub type BoxObserver<A> = Box<dyn FnMut(&A) + Send>;

type Entry<T> = Arc<Mutex<Box<T>>>;

/// Token-keyed arena of callbacks
///
/// Each entry has its own lock so callbacks run outside the arena lock: a
/// callback may subscribe or unsubscribe without deadlocking, and a single
/// entry never receives two deliveries at once.
pub(crate) struct Subscriptions<T: ?Sized> {
    entries: Mutex<BTreeMap<Token, Entry<T>>>,
}

impl<T: ?Sized> Subscriptions<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, BTreeMap<Token, Entry<T>>> {
        self.entries.lock()
    }

    pub(crate) fn insert(&self, token: Token, value: Box<T>) -> Entry<T> {
        let entry = Arc::new(Mutex::new(value));
        self.entries.lock().insert(token, Arc::clone(&entry));
        entry
    }

    pub(crate) fn remove(&self, token: Token) -> bool {
        self.entries.lock().remove(&token).is_some()
    }

    pub(crate) fn snapshot(&self) -> Vec<Entry<T>> {
        self.entries.lock().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

pub(crate) type SubscriberSet<S> = Subscriptions<dyn Subscriber<S>>;
pub(crate) type ObserverSet<A> = Subscriptions<dyn FnMut(&A) + Send>;

/// Deliver `value` to every callback in the set
pub(crate) fn notify_all<A>(observers: &ObserverSet<A>, value: &A) {
    for entry in observers.snapshot() {
        let mut observer = entry.lock();
        (&mut **observer)(value);
    }
}
