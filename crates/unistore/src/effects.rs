//! Follow-up actions emitted by reducers
//!
//! A reducer never performs side effects itself. It describes them as
//! [`Effects`]: actions that are ready now, and futures or streams that will
//! produce actions later.
//!
//! - Immediate actions are reduced in the same cascade as the action that
//!   produced them, before the dispatcher's completion fires.
//! - Deferred futures/streams are driven on the store's runtime; each action
//!   they yield re-enters the full dispatch pipeline when it arrives.

use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::future::Future;

/// Zero or more follow-up actions
pub struct Effects<A> {
    actions: Vec<A>,
    deferred: Vec<BoxStream<'static, A>>,
}

impl<A: Send + 'static> Default for Effects<A> {
    fn default() -> Self {
        Self::none()
    }
}

impl<A: fmt::Debug> fmt::Debug for Effects<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effects")
            .field("actions", &self.actions)
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

impl<A: Send + 'static> Effects<A> {
    /// No follow-up actions
    pub fn none() -> Self {
        Self {
            actions: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// A single immediate follow-up action
    pub fn action(action: A) -> Self {
        Self::actions([action])
    }

    /// Several immediate follow-up actions, dispatched in order
    pub fn actions(actions: impl IntoIterator<Item = A>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            deferred: Vec::new(),
        }
    }

    /// An action produced asynchronously
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = A> + Send + 'static,
    {
        Self::stream(stream::once(future))
    }

    /// An asynchronous computation that may or may not produce an action
    pub fn maybe<F>(future: F) -> Self
    where
        F: Future<Output = Option<A>> + Send + 'static,
    {
        Self::stream(stream::once(future).filter_map(|action| async move { action }))
    }

    /// A stream of actions, each dispatched as it arrives
    pub fn stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = A> + Send + 'static,
    {
        Self {
            actions: Vec::new(),
            deferred: vec![stream.boxed()],
        }
    }

    /// Combine two sets of effects, keeping the order of immediate actions
    pub fn merge(mut self, other: Effects<A>) -> Self {
        self.actions.extend(other.actions);
        self.deferred.extend(other.deferred);
        self
    }

    /// True when there is nothing to dispatch
    pub fn is_none(&self) -> bool {
        self.actions.is_empty() && self.deferred.is_empty()
    }

    /// Rewrap the actions into another action type
    pub fn map<B, F>(self, f: F) -> Effects<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Clone + Send + Sync + 'static,
    {
        let deferred = self
            .deferred
            .into_iter()
            .map(|s| {
                let f = f.clone();
                s.map(f).boxed()
            })
            .collect();
        Effects {
            actions: self.actions.into_iter().map(f).collect(),
            deferred,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<A>, Vec<BoxStream<'static, A>>) {
        (self.actions, self.deferred)
    }
}

impl<A: Send + 'static> From<()> for Effects<A> {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl<A: Send + 'static> From<Vec<A>> for Effects<A> {
    fn from(actions: Vec<A>) -> Self {
        Self::actions(actions)
    }
}

impl<A: Send + 'static> From<Option<A>> for Effects<A> {
    fn from(action: Option<A>) -> Self {
        Self::actions(action)
    }
}

impl<A: Send + 'static> FromIterator<Effects<A>> for Effects<A> {
    fn from_iter<I: IntoIterator<Item = Effects<A>>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Effects::merge)
    }
}
