//! Field wrapper for state that must not be persisted as-is
//!
//! `NonCacheable<T>` carries a live value used at runtime and a fixed value
//! written when the state is serialized. Restoring a serialized state sets
//! both to the decoded value. Typical use is transient UI flags:
//!
//! ```rust
//! use serde::Serialize;
//! use unistore::NonCacheable;
//!
//! #[derive(Serialize)]
//! struct State {
//!     loading: NonCacheable<bool>,
//! }
//!
//! let mut state = State { loading: NonCacheable::new(false) };
//! *state.loading = true;
//! assert_eq!(serde_json::to_string(&state).unwrap(), r#"{"loading":false}"#);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

/// Equality, ordering and hashing look at the live value only.
#[derive(Clone, Default)]
pub struct NonCacheable<T> {
    value: T,
    saved: T,
}

impl<T: Clone> NonCacheable<T> {
    /// Live value and saved value start out equal
    pub fn new(value: T) -> Self {
        Self {
            saved: value.clone(),
            value,
        }
    }
}

impl<T> NonCacheable<T> {
    /// Live value `value`, serialized as `saved`
    pub fn with_saved(value: T, saved: T) -> Self {
        Self { value, saved }
    }

    pub fn saved(&self) -> &T {
        &self.saved
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for NonCacheable<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for NonCacheable<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for NonCacheable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonCacheable")
            .field("value", &self.value)
            .field("saved", &self.saved)
            .finish()
    }
}

impl<T: PartialEq> PartialEq for NonCacheable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for NonCacheable<T> {}

impl<T: PartialOrd> PartialOrd for NonCacheable<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Hash> Hash for NonCacheable<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: Serialize> Serialize for NonCacheable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.saved.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Clone> Deserialize<'de> for NonCacheable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct State {
        double: f64,
        is_loading: NonCacheable<bool>,
        is_animating: NonCacheable<bool>,
    }

    #[test]
    fn test_serializes_saved_value() {
        let mut state = State {
            double: 2.4,
            is_loading: NonCacheable::new(false),
            is_animating: NonCacheable::with_saved(true, false),
        };
        *state.is_loading = true;

        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"double":2.4,"is_loading":false,"is_animating":false}"#);

        let restored: State = serde_json::from_str(&json).unwrap();
        assert!(!*restored.is_loading);
        assert!(!*restored.is_animating);
        assert_eq!(restored.is_animating.saved(), &false);
    }

    #[test]
    fn test_equality_ignores_saved_value() {
        assert_eq!(NonCacheable::with_saved(1, 2), NonCacheable::new(1));
        assert_ne!(NonCacheable::new(1), NonCacheable::new(2));
        assert!(NonCacheable::new(1) < NonCacheable::new(2));
    }
}
