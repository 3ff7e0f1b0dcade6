//! ClampMiddleware - bounds counter additions
//!
//! Oversized `Add` actions are rewritten to the limit and a status message is
//! dispatched explaining why.

use crate::actions::{Action, CounterAction, StatusAction};
use crate::state::AppState;
use unistore::{Dispatcher, Middleware, Next};

pub struct ClampMiddleware {
    limit: i64,
}

impl ClampMiddleware {
    pub fn new(limit: i64) -> Self {
        Self { limit: limit.abs() }
    }
}

impl Middleware<AppState, Action> for ClampMiddleware {
    fn handle(
        &self,
        action: Action,
        dispatcher: &Dispatcher<AppState, Action>,
        next: Next<AppState, Action>,
    ) {
        match action {
            Action::Counter(CounterAction::Add(n)) if n.abs() > self.limit => {
                let clamped = n.clamp(-self.limit, self.limit);
                log::warn!("ClampMiddleware: add {} clamped to {}", n, clamped);
                dispatcher.dispatch(Action::Status(StatusAction::Message(format!(
                    "add {} exceeds the limit of {}",
                    n, self.limit
                ))));
                next.run(Action::Counter(CounterAction::Add(clamped)));
            }
            other => next.run(other),
        }
    }
}
