//! Action queue - an ordered relay with a lock/unlock gate
//!
//! Values sent while the queue is unlocked are delivered to its subscribers
//! right away; while locked they are buffered and released in order by
//! `unlock`. Flow layers use this to hold externally triggered actions back
//! until the store is ready for them.
//!
//! Delivery is a trampoline: whoever finds the queue unlocked and idle drains
//! it. A subscriber that sends while being called only buffers its value, the
//! running drain picks it up after the current one.

use crate::subscription::{notify_all, ObserverSet, Subscriptions, Token, Unsubscriber};
use crate::{ActionType, StoreExt, StoreType};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

struct Gate<T> {
    locked: bool,
    draining: bool,
    buffer: VecDeque<T>,
}

pub struct ActionQueue<T: Send + 'static> {
    name: String,
    gate: Mutex<Gate<T>>,
    subscribers: ObserverSet<T>,
    this: Weak<Self>,
}

impl<T: Send + 'static> ActionQueue<T> {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|this| Self {
            name,
            gate: Mutex::new(Gate {
                locked: false,
                draining: false,
                buffer: VecDeque::new(),
            }),
            subscribers: Subscriptions::new(),
            this: Weak::clone(this),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn send(&self, value: T) {
        self.gate.lock().buffer.push_back(value);
        self.drain();
    }

    pub fn send_all(&self, values: impl IntoIterator<Item = T>) {
        self.gate.lock().buffer.extend(values);
        self.drain();
    }

    /// Put `value` ahead of everything still buffered
    pub fn send_first(&self, value: T) {
        self.gate.lock().buffer.push_front(value);
        self.drain();
    }

    pub fn lock(&self) {
        self.gate.lock().locked = true;
        log::debug!("[{}] queue locked", self.name);
    }

    /// Open the gate and release buffered values in order
    pub fn unlock(&self) {
        let buffered = {
            let mut gate = self.gate.lock();
            gate.locked = false;
            gate.buffer.len()
        };
        log::debug!("[{}] queue unlocked, releasing {}", self.name, buffered);
        self.drain();
    }

    pub fn is_locked(&self) -> bool {
        self.gate.lock().locked
    }

    pub fn len(&self) -> usize {
        self.gate.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive every released value
    pub fn subscribe<F>(&self, callback: F) -> Unsubscriber
    where
        F: FnMut(&T) + Send + 'static,
    {
        let token = Token::next();
        self.subscribers.insert(token, Box::new(callback));
        let this = self.this.clone();
        Unsubscriber::new(token, move || {
            if let Some(queue) = this.upgrade() {
                queue.subscribers.remove(token);
            }
        })
    }

    fn drain(&self) {
        {
            let mut gate = self.gate.lock();
            if gate.locked || gate.draining {
                return;
            }
            gate.draining = true;
        }

        loop {
            let next = {
                let mut gate = self.gate.lock();
                // relocked by a subscriber: stop, keep the rest buffered
                let next = if gate.locked { None } else { gate.buffer.pop_front() };
                if next.is_none() {
                    gate.draining = false;
                }
                next
            };
            match next {
                Some(value) => notify_all(&self.subscribers, &value),
                None => return,
            }
        }
    }
}

impl<T: Clone + Send + 'static> ActionQueue<T> {
    /// Channel receiving a copy of every released value
    pub fn receiver(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(move |value: &T| {
            let _ = tx.send(value.clone());
        });
        rx
    }
}

impl<T: ActionType> ActionQueue<T> {
    /// Dispatch every released value into `store`
    pub fn forward_to<S>(&self, store: &Arc<S>) -> Unsubscriber
    where
        S: StoreType<Action = T> + ?Sized,
    {
        let store = Arc::downgrade(store);
        let name = self.name.clone();
        self.subscribe(move |action: &T| match store.upgrade() {
            Some(store) => store.dispatch(action.clone()),
            None => log::debug!("[{}] target store released, dropping {:?}", name, action),
        })
    }
}

/// Registry handing out one queue per key
///
/// Owned by the composition root and passed to whoever needs a queue. Keys
/// are anything string-like, including `strum::AsRefStr` enums.
pub struct ActionQueues<T: Send + 'static> {
    queues: Mutex<HashMap<String, Arc<ActionQueue<T>>>>,
}

impl<T: Send + 'static> Default for ActionQueues<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ActionQueues<T> {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// The queue for `key`, created on first use
    pub fn get(&self, key: impl AsRef<str>) -> Arc<ActionQueue<T>> {
        let key = key.as_ref();
        let mut queues = self.queues.lock();
        if let Some(queue) = queues.get(key) {
            return Arc::clone(queue);
        }
        log::debug!("creating action queue {}", key);
        let queue = ActionQueue::new(key);
        queues.insert(key.to_string(), Arc::clone(&queue));
        queue
    }

    pub fn remove(&self, key: impl AsRef<str>) -> Option<Arc<ActionQueue<T>>> {
        self.queues.lock().remove(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.queues.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
