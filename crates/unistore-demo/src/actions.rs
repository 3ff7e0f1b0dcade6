//! Actions of the demo
//!
//! Tagged by the slice of state they target; each reducer picks out its own
//! variant.

/// Root action enum
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Counter(CounterAction),
    Status(StatusAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Add(i64),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusAction {
    Message(String),
    Busy(bool),
}

/// Named action queues of the demo
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
pub enum QueueKey {
    Input,
}
