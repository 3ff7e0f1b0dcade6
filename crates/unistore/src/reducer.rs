//! Reducers - the unit of business logic
//!
//! A reducer receives an action and a mutable reference to the state it is
//! connected to, mutates the state in place and returns the follow-up
//! [`Effects`]. Reducers must be total: a domain failure is a follow-up
//! action, never a panic.
//!
//! Any `Fn(&A, &mut S) -> E` closure where `E: Into<Effects<A>>` is a reducer,
//! so the common case returns `()`:
//!
//! ```rust
//! use unistore::Reducer;
//!
//! #[derive(Debug, Clone)]
//! enum Action { Increment, Reset }
//!
//! let counter = |action: &Action, count: &mut i32| match action {
//!     Action::Increment => *count += 1,
//!     Action::Reset => *count = 0,
//! };
//!
//! let mut count = 0;
//! counter.reduce(&Action::Increment, &mut count);
//! assert_eq!(count, 1);
//! ```

use crate::{Effects, Lens};
use std::marker::PhantomData;

/// A function of (action, state) producing zero or more follow-up actions
pub trait Reducer<S, A>: Send + Sync + 'static {
    fn reduce(&self, action: &A, state: &mut S) -> Effects<A>;
}

/// Boxed reducer, as stored in a store's registry
pub type BoxReducer<S, A> = Box<dyn Reducer<S, A>>;

impl<S, A, F, E> Reducer<S, A> for F
where
    A: Send + 'static,
    F: Fn(&A, &mut S) -> E + Send + Sync + 'static,
    E: Into<Effects<A>>,
{
    fn reduce(&self, action: &A, state: &mut S) -> Effects<A> {
        self(action, state).into()
    }
}

/// A reducer written against a part of the state, run against the whole
///
/// Reads the part through the lens, runs the inner reducer, writes the part
/// back. Emitted actions pass through unchanged.
pub struct Lensed<W, P, A> {
    inner: BoxReducer<P, A>,
    lens: Lens<W, P>,
}

impl<W, P, A> Lensed<W, P, A> {
    pub fn new(inner: BoxReducer<P, A>, lens: Lens<W, P>) -> Self {
        Self { inner, lens }
    }
}

impl<W, P, A> Reducer<W, A> for Lensed<W, P, A>
where
    W: Clone + Send + Sync + 'static,
    P: Send + Sync + 'static,
    A: Send + 'static,
{
    fn reduce(&self, action: &A, state: &mut W) -> Effects<A> {
        let mut part = self.lens.get(state);
        let effects = self.inner.reduce(action, &mut part);
        *state = self.lens.set(state.clone(), part);
        effects
    }
}

/// Lift a reducer over a part into a reducer over the whole
pub fn lift<R, W, P, A>(reducer: R, lens: Lens<W, P>) -> Lensed<W, P, A>
where
    R: Reducer<P, A>,
{
    Lensed::new(Box::new(reducer), lens)
}

/// A reducer that only handles the actions `select` picks out
///
/// Actions for which `select` returns `None` leave the state untouched.
pub fn on<S, A, E, Sel, F, R>(select: Sel, handler: F) -> impl Reducer<S, A>
where
    S: 'static,
    A: Send + 'static,
    E: 'static,
    Sel: Fn(&A) -> Option<&E> + Send + Sync + 'static,
    F: Fn(&E, &mut S) -> R + Send + Sync + 'static,
    R: Into<Effects<A>>,
{
    move |action: &A, state: &mut S| -> Effects<A> {
        match select(action) {
            Some(event) => handler(event, state).into(),
            None => Effects::none(),
        }
    }
}

/// Sequentially compose reducers: each sees the state left by the previous
pub fn combine<S, A>(reducers: Vec<BoxReducer<S, A>>) -> impl Reducer<S, A>
where
    S: 'static,
    A: Send + 'static,
{
    move |action: &A, state: &mut S| -> Effects<A> {
        reducers
            .iter()
            .map(|reducer| reducer.reduce(action, state))
            .collect()
    }
}

/// A reducer declaring the action variant it handles
///
/// The store never casts actions at runtime; a module picks its event out of
/// the action sum type with [`ReducerModule::select`].
pub trait ReducerModule<A>: Send + Sync + 'static {
    type State;
    type Event;

    fn select(action: &A) -> Option<&Self::Event>;

    fn reduce(&self, event: &Self::Event, state: &mut Self::State) -> Effects<A>;
}

/// Adapter turning a [`ReducerModule`] into a [`Reducer`]
pub struct Module<M, A> {
    module: M,
    _action: PhantomData<fn(&A)>,
}

impl<M, A> Module<M, A> {
    pub fn new(module: M) -> Self {
        Self {
            module,
            _action: PhantomData,
        }
    }
}

impl<M, A> Reducer<M::State, A> for Module<M, A>
where
    M: ReducerModule<A>,
    A: Send + 'static,
{
    fn reduce(&self, action: &A, state: &mut M::State) -> Effects<A> {
        match M::select(action) {
            Some(event) => self.module.reduce(event, state),
            None => Effects::none(),
        }
    }
}
