use unistore::NonCacheable;

/// Counter slice
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CounterState {
    pub value: i64,
    pub history: Vec<i64>,
}

/// Status line slice
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub shown: usize,
    pub busy: NonCacheable<bool>,
}

/// State of the main store
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub counter: CounterState,
    pub status: StatusState,
}

/// State of the session store, paired with the main store
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub commands: u64,
}
