//! Lenses - composable get/set pairs focusing a whole value on a part
//!
//! A well-formed lens obeys two laws:
//!
//! ```text
//! lens.get(&lens.set(whole, part)) == part
//! lens.set(whole.clone(), lens.get(&whole)) == whole
//! ```
//!
//! Composition (`compose` / `then`) preserves both laws, so a store can focus
//! on a field of a field without any store-side support for nesting.
//!
//! ## Example
//!
//! ```rust
//! use unistore::{lens, Lens};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Settings { volume: u8 }
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct App { settings: Settings, title: String }
//!
//! let volume: Lens<App, u8> = lens!(App, settings.volume);
//! let app = App { settings: Settings { volume: 3 }, title: "demo".into() };
//!
//! assert_eq!(volume.get(&app), 3);
//! let app = volume.set(app, 7);
//! assert_eq!(app.settings.volume, 7);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

type Getter<W, P> = Arc<dyn Fn(&W) -> P + Send + Sync>;
type Setter<W, P> = Arc<dyn Fn(W, P) -> W + Send + Sync>;

/// A pure bidirectional accessor between a whole state `W` and a part `P`
///
/// Lenses are stateless; cloning one is an `Arc` bump.
pub struct Lens<W, P> {
    get: Getter<W, P>,
    set: Setter<W, P>,
}

impl<W, P> Clone for Lens<W, P> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<W, P> fmt::Debug for Lens<W, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lens")
            .field("whole", &std::any::type_name::<W>())
            .field("part", &std::any::type_name::<P>())
            .finish()
    }
}

impl<W: 'static, P: 'static> Lens<W, P> {
    /// Build a lens from a getter and a setter
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&W) -> P + Send + Sync + 'static,
        S: Fn(W, P) -> W + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// Build a lens from a plain field accessor pair
    pub fn field<R, M>(field: R, field_mut: M) -> Self
    where
        P: Clone,
        R: Fn(&W) -> &P + Send + Sync + 'static,
        M: Fn(&mut W) -> &mut P + Send + Sync + 'static,
    {
        Self::new(
            move |whole| field(whole).clone(),
            move |mut whole, part| {
                *field_mut(&mut whole) = part;
                whole
            },
        )
    }

    /// Build a lens onto an optional field
    ///
    /// `get` yields `default` while the field is `None`; `set` always writes
    /// `Some(part)`.
    pub fn optional<R, M>(field: R, field_mut: M, default: P) -> Self
    where
        P: Clone + Send + Sync,
        R: Fn(&W) -> &Option<P> + Send + Sync + 'static,
        M: Fn(&mut W) -> &mut Option<P> + Send + Sync + 'static,
    {
        Self::new(
            move |whole| field(whole).clone().unwrap_or_else(|| default.clone()),
            move |mut whole, part| {
                *field_mut(&mut whole) = Some(part);
                whole
            },
        )
    }

    /// Build a lens onto one entry of a map field
    ///
    /// A missing entry reads as `default` and is inserted on write.
    pub fn entry<K, R, M>(map: R, map_mut: M, key: K, default: P) -> Self
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        P: Clone + Send + Sync,
        R: Fn(&W) -> &HashMap<K, P> + Send + Sync + 'static,
        M: Fn(&mut W) -> &mut HashMap<K, P> + Send + Sync + 'static,
    {
        let read_key = key.clone();
        Self::new(
            move |whole| {
                map(whole)
                    .get(&read_key)
                    .cloned()
                    .unwrap_or_else(|| default.clone())
            },
            move |mut whole, part| {
                map_mut(&mut whole).insert(key.clone(), part);
                whole
            },
        )
    }

    /// Read the part out of the whole
    pub fn get(&self, whole: &W) -> P {
        (self.get)(whole)
    }

    /// Write the part into the whole, returning the updated whole
    pub fn set(&self, whole: W, part: P) -> W {
        (self.set)(whole, part)
    }

    /// Apply `f` to the focused part in place
    pub fn modify(&self, whole: &mut W, f: impl FnOnce(&mut P))
    where
        W: Clone,
    {
        let mut part = self.get(whole);
        f(&mut part);
        *whole = self.set(whole.clone(), part);
    }

    /// Focus further through `inner`
    ///
    /// `get = inner.get ∘ self.get`, `set(w, q) = self.set(w, inner.set(self.get(w), q))`
    pub fn compose<Q: 'static>(&self, inner: &Lens<P, Q>) -> Lens<W, Q> {
        let outer_get = Arc::clone(&self.get);
        let outer_for_set = self.clone();
        let inner_get = Arc::clone(&inner.get);
        let inner_set = Arc::clone(&inner.set);
        Lens {
            get: Arc::new(move |whole| inner_get(&outer_get(whole))),
            set: Arc::new(move |whole, part| {
                let focused = outer_for_set.get(&whole);
                outer_for_set.set(whole, inner_set(focused, part))
            }),
        }
    }

    /// Owned form of [`Lens::compose`]
    pub fn then<Q: 'static>(self, inner: Lens<P, Q>) -> Lens<W, Q> {
        self.compose(&inner)
    }
}

impl<W: Clone + 'static> Lens<W, W> {
    /// The lens focusing a value on itself
    pub fn identity() -> Self {
        Self::new(|whole: &W| whole.clone(), |_, part| part)
    }
}

/// Build a [`Lens`] onto a (possibly nested) field path
///
/// `lens!(State, a.b)` is `Lens::field(|s| &s.a.b, |s| &mut s.a.b)`.
#[macro_export]
macro_rules! lens {
    ($whole:ty, $($field:ident).+) => {
        $crate::Lens::<$whole, _>::field(
            |whole: &$whole| &whole.$($field).+,
            |whole: &mut $whole| &mut whole.$($field).+,
        )
    };
}
