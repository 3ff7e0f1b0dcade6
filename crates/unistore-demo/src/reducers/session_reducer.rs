//! Session Reducer
//!
//! Runs against the paired (app, session) state and counts counter commands.

use crate::actions::Action;
use crate::state::{AppState, SessionState};
use unistore::Union;

pub fn reduce_session(action: &Action, pair: &mut Union<AppState, SessionState>) {
    if let Action::Counter(_) = action {
        pair.b.commands += 1;
    }
}
