//! Counting join for fan-out dispatch
//!
//! A paired store forwards one action to both children and must complete the
//! caller exactly once, after both children have completed.

use crate::store::Completion;
use parking_lot::Mutex;
use std::sync::Arc;

type Done = Box<dyn FnOnce() + Send>;

pub(crate) struct Join {
    state: Mutex<(usize, Option<Done>)>,
}

impl Join {
    /// Fire `done` after `count` arrivals
    pub(crate) fn new(count: usize, done: impl FnOnce() + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new((count, Some(Box::new(done)))),
        })
    }

    pub(crate) fn arrive(&self) {
        let done = {
            let mut state = self.state.lock();
            state.0 = state.0.saturating_sub(1);
            if state.0 == 0 { state.1.take() } else { None }
        };
        if let Some(done) = done {
            done();
        }
    }

    /// A completion counting as one arrival
    pub(crate) fn arm<T>(self: &Arc<Self>) -> Completion<T> {
        let join = Arc::clone(self);
        Box::new(move |_: &T| join.arrive())
    }
}
