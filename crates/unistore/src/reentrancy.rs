//! Trap for synchronous re-entrant dispatch
//!
//! A root store records which thread is running its reducer pass. With
//! `strict_reentrancy` enabled, a dispatch issued from that thread while the
//! pass is running means a reducer dispatched into its own store, which is a
//! programming error and aborts.

use parking_lot::Mutex;
use std::process;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
pub(crate) struct ReentrancyGuard {
    owner: Mutex<Option<ThreadId>>,
}

/// Marks the reducer pass as running until dropped
pub(crate) struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        *self.guard.owner.lock() = None;
    }
}

impl ReentrancyGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self) -> Entered<'_> {
        *self.owner.lock() = Some(thread::current().id());
        Entered { guard: self }
    }

    pub(crate) fn is_reducing(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }

    /// Abort the process when called from inside the reducer pass
    ///
    /// Not a panic: the worker task would catch it and keep the process alive.
    pub(crate) fn check(&self, store: &str) {
        if self.is_reducing() {
            log::error!(
                "[{}] concurrent mutation: a reducer dispatched into its own store",
                store
            );
            eprintln!("[{store}] concurrent mutation: a reducer dispatched into its own store");
            process::abort();
        }
    }
}
