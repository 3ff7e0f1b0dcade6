//! Counter Reducer
//!
//! Handles counter updates and keeps a short history of previous values.

use crate::actions::{Action, CounterAction, StatusAction};
use crate::state::CounterState;
use unistore::{Effects, ReducerModule};

const HISTORY_LEN: usize = 10;

pub struct CounterReducer;

impl ReducerModule<Action> for CounterReducer {
    type State = CounterState;
    type Event = CounterAction;

    fn select(action: &Action) -> Option<&CounterAction> {
        match action {
            Action::Counter(event) => Some(event),
            _ => None,
        }
    }

    fn reduce(&self, event: &CounterAction, state: &mut CounterState) -> Effects<Action> {
        let previous = state.value;
        match event {
            CounterAction::Increment => state.value += 1,
            CounterAction::Decrement => state.value -= 1,
            CounterAction::Add(n) => state.value += n,
            CounterAction::Reset => {
                state.value = 0;
                state.history.clear();
                return Effects::action(Action::Status(StatusAction::Message(
                    "counter reset".to_string(),
                )));
            }
        }
        if state.value != previous {
            state.history.push(previous);
            if state.history.len() > HISTORY_LEN {
                state.history.remove(0);
            }
        }
        Effects::none()
    }
}
