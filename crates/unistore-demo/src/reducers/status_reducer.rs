//! Status Reducer
//!
//! Handles the status line.

use crate::actions::{Action, StatusAction};
use crate::state::StatusState;

pub fn select_status(action: &Action) -> Option<&StatusAction> {
    match action {
        Action::Status(event) => Some(event),
        _ => None,
    }
}

/// Reduce status state
pub fn reduce_status(event: &StatusAction, state: &mut StatusState) {
    match event {
        StatusAction::Message(message) => {
            state.message = Some(message.clone());
            state.shown += 1;
        }
        StatusAction::Busy(busy) => *state.busy = *busy,
    }
}
