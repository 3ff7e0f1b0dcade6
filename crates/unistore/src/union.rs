//! Paired state of two independent stores

use crate::Lens;
use serde::{Deserialize, Serialize};

/// State of a [`Stores`](crate::Stores): both halves side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Union<A, B> {
    pub a: A,
    pub b: B,
}

impl<A, B> Union<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }

    pub fn into_tuple(self) -> (A, B) {
        (self.a, self.b)
    }
}

impl<A, B> From<(A, B)> for Union<A, B> {
    fn from((a, b): (A, B)) -> Self {
        Self { a, b }
    }
}

impl<A, B> Union<A, B>
where
    A: Clone + 'static,
    B: Clone + 'static,
{
    /// Lens on the first half
    pub fn first() -> Lens<Self, A> {
        Lens::field(|union: &Self| &union.a, |union: &mut Self| &mut union.a)
    }

    /// Lens on the second half
    pub fn second() -> Lens<Self, B> {
        Lens::field(|union: &Self| &union.b, |union: &mut Self| &mut union.b)
    }
}
