//! Unidirectional-data-flow state container
//!
//! This crate provides:
//! - Root stores with a serialized reduction loop on a tokio runtime
//! - Lenses and lens-backed substores
//! - Paired stores presenting two stores as one
//! - A middleware chain around dispatch
//! - Lockable action queues
//!
//! ```rust
//! use unistore::{lens, Store, StoreExt, StoreType};
//!
//! #[derive(Debug, Clone, PartialEq, Default)]
//! struct State {
//!     count: i64,
//!     title: String,
//! }
//!
//! #[derive(Debug, Clone)]
//! enum Action {
//!     Increment,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Store::<State, Action>::new(State::default());
//!     let counter = store.substore(lens!(State, count));
//!     counter.connect_fn(|action: &Action, count: &mut i64| match action {
//!         Action::Increment => *count += 1,
//!     });
//!
//!     let count = counter.dispatch_async(Action::Increment).await.unwrap();
//!     assert_eq!(count, 1);
//!     assert_eq!(store.state().count, 1);
//! }
//! ```

pub mod action_queue;
pub mod dispatcher;
pub mod effects;
pub mod error;
mod join;
pub mod lens;
pub mod middleware;
pub mod non_cacheable;
pub mod reducer;
mod reentrancy;
pub mod store;
pub mod subscription;
pub mod union;

pub use action_queue::{ActionQueue, ActionQueues};
pub use dispatcher::Dispatcher;
pub use effects::Effects;
pub use error::StoreError;
pub use lens::Lens;
pub use middleware::{LoggingMiddleware, Middleware, Next, SharedMiddleware};
pub use non_cacheable::NonCacheable;
pub use reducer::{BoxReducer, Lensed, Module, Reducer, ReducerModule};
pub use store::{
    ActionType, Completion, StateType, Store, StoreBuilder, StoreExt, StoreType, Stores, Substore,
};
pub use subscription::{BoxObserver, BoxSubscriber, Subscriber, Token, Unsubscriber};
pub use union::Union;
pub use unistore_config::{ConfigError, StoreConfig};
