//! Reducers of the demo, one per state slice

pub mod counter_reducer;
pub mod session_reducer;
pub mod status_reducer;

pub use counter_reducer::CounterReducer;
pub use session_reducer::reduce_session;
pub use status_reducer::{reduce_status, select_status};
