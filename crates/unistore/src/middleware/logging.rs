//! LoggingMiddleware - logs all actions for debugging

use super::{Middleware, Next};
use crate::{ActionType, Dispatcher, StateType};

/// LoggingMiddleware - logs every action that passes through the chain
pub struct LoggingMiddleware {
    label: String,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::labeled("store")
    }

    /// Prefix log lines with `label` (usually the store name)
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateType, A: ActionType> Middleware<S, A> for LoggingMiddleware {
    fn handle(&self, action: A, _dispatcher: &Dispatcher<S, A>, next: Next<S, A>) {
        log::debug!("[{}] Action: {:?}", self.label, action);
        // Always continue to next middleware
        next.run(action);
    }
}
