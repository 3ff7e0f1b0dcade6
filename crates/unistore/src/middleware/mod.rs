//! Middleware system
//!
//! Middleware sits between `dispatch` and the reducer stage. The chain is an
//! onion: the first registered middleware sees the action first and decides
//! what reaches the next link.
//!
//! ## Design
//!
//! ```text
//! dispatch → Middleware 1 → Middleware 2 → … → reducer stage → State
//! ```
//!
//! Each middleware can:
//! - Inspect actions and read state through the Dispatcher
//! - Dispatch new actions (they re-enter the chain from the start)
//! - Transform the action before passing it on
//! - Delay it (move `next` into a task and run it later)
//! - Drop it (never call `next`; the dispatcher's completion never fires)
//!
//! ## Example
//!
//! ```rust
//! use unistore::{Dispatcher, Middleware, Next};
//!
//! #[derive(Debug, Clone)]
//! enum Action { Ping, Secret }
//!
//! struct DropSecrets;
//!
//! impl Middleware<u32, Action> for DropSecrets {
//!     fn handle(
//!         &self,
//!         action: Action,
//!         _dispatcher: &Dispatcher<u32, Action>,
//!         next: Next<u32, Action>,
//!     ) {
//!         match action {
//!             Action::Secret => {} // consumed
//!             other => next.run(other),
//!         }
//!     }
//! }
//! ```

mod logging;

pub use logging::LoggingMiddleware;

use crate::store::Completion;
use crate::{ActionType, Dispatcher, StateType};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Middleware trait - wraps the dispatch function
///
/// `next` can be run at most once; it carries the dispatcher's completion
/// callback to the reducer stage.
pub trait Middleware<S: StateType, A: ActionType>: Send + Sync + 'static {
    fn handle(&self, action: A, dispatcher: &Dispatcher<S, A>, next: Next<S, A>);
}

impl<S, A, F> Middleware<S, A> for F
where
    S: StateType,
    A: ActionType,
    F: Fn(A, &Dispatcher<S, A>, Next<S, A>) + Send + Sync + 'static,
{
    fn handle(&self, action: A, dispatcher: &Dispatcher<S, A>, next: Next<S, A>) {
        self(action, dispatcher, next)
    }
}

pub type SharedMiddleware<S, A> = Arc<dyn Middleware<S, A>>;

/// The remainder of the chain after the current middleware
pub struct Next<S: StateType, A: ActionType> {
    chain: Arc<Chain<S, A>>,
    index: usize,
    delivery: Delivery<S, A>,
}

impl<S: StateType, A: ActionType> Next<S, A> {
    /// Pass the (possibly transformed) action to the next link
    pub fn run(self, action: A) {
        self.chain.run_from(self.index, action, self.delivery);
    }
}

/// Where an action goes once it clears the chain
pub(crate) enum Delivery<S, A> {
    /// Externally dispatched: queue it, then call the completion
    Completion(Completion<S>),
    /// Follow-up emitted by a reducer: join the running cascade
    Cascade(Cascade<A>),
}

/// Buffer collecting follow-up actions for the cascade being processed
///
/// Once closed, pushes are refused so late arrivals (delayed by middleware)
/// fall back to the regular queue.
pub(crate) struct Cascade<A> {
    pending: Arc<Mutex<Option<Vec<A>>>>,
}

impl<A> Clone for Cascade<A> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<A> Cascade<A> {
    pub(crate) fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    pub(crate) fn push(&self, action: A) -> Result<(), A> {
        match self.pending.lock().as_mut() {
            Some(pending) => {
                pending.push(action);
                Ok(())
            }
            None => Err(action),
        }
    }

    pub(crate) fn drain(&self) -> Vec<A> {
        self.pending
            .lock()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn close(&self) -> Vec<A> {
        self.pending.lock().take().unwrap_or_default()
    }
}

/// Final link of the chain
pub(crate) type Terminal<S, A> = Arc<dyn Fn(A, Delivery<S, A>) + Send + Sync>;

pub(crate) struct Chain<S: StateType, A: ActionType> {
    middleware: Vec<SharedMiddleware<S, A>>,
    terminal: Terminal<S, A>,
    dispatcher: Dispatcher<S, A>,
}

impl<S: StateType, A: ActionType> Chain<S, A> {
    fn run_from(self: &Arc<Self>, index: usize, action: A, delivery: Delivery<S, A>) {
        match self.middleware.get(index) {
            Some(middleware) => {
                let next = Next {
                    chain: Arc::clone(self),
                    index: index + 1,
                    delivery,
                };
                middleware.handle(action, &self.dispatcher, next);
            }
            None => (self.terminal)(action, delivery),
        }
    }
}

/// The dispatch function built from a middleware list
///
/// Swapping the middleware rebuilds the chain under a write lock; actions
/// already travelling through the old chain finish on it.
pub(crate) struct Pipeline<S: StateType, A: ActionType> {
    chain: RwLock<Arc<Chain<S, A>>>,
}

impl<S: StateType, A: ActionType> Pipeline<S, A> {
    pub(crate) fn new(
        middleware: Vec<SharedMiddleware<S, A>>,
        terminal: Terminal<S, A>,
        dispatcher: Dispatcher<S, A>,
    ) -> Self {
        Self {
            chain: RwLock::new(Arc::new(Chain {
                middleware,
                terminal,
                dispatcher,
            })),
        }
    }

    pub(crate) fn run(&self, action: A, delivery: Delivery<S, A>) {
        let chain = Arc::clone(&self.chain.read());
        chain.run_from(0, action, delivery);
    }

    pub(crate) fn set_middleware(&self, middleware: Vec<SharedMiddleware<S, A>>) {
        let mut chain = self.chain.write();
        *chain = Arc::new(Chain {
            middleware,
            terminal: Arc::clone(&chain.terminal),
            dispatcher: chain.dispatcher.clone(),
        });
    }

    pub(crate) fn add_middleware(&self, middleware: SharedMiddleware<S, A>) {
        let mut chain = self.chain.write();
        let mut list = chain.middleware.clone();
        list.push(middleware);
        *chain = Arc::new(Chain {
            middleware: list,
            terminal: Arc::clone(&chain.terminal),
            dispatcher: chain.dispatcher.clone(),
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.chain.read().middleware.len()
    }
}
