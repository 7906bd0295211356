use std::{cmp::Ordering, fmt, hash::Hash, marker::PhantomData};

use serde::{Deserialize, Serialize};

/// A party index tagged with a protocol marker `K`.
///
/// `K` is only a label: `PhantomData<fn() -> K>` keeps `TypedUsize<K>` `Send + Sync + Copy`
/// for any marker, so the impls below carry no bounds on `K`.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))] // disable serde trait bounds on `K`: https://serde.rs/attr-bound.html
pub struct TypedUsize<K>(usize, PhantomData<fn() -> K>);

impl<K> TypedUsize<K> {
    pub fn from_usize(index: usize) -> Self {
        TypedUsize(index, PhantomData)
    }
    pub fn as_usize(&self) -> usize {
        self.0
    }

    pub(super) fn increment(&mut self) {
        self.0 += 1;
    }
}

impl<K> Clone for TypedUsize<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for TypedUsize<K> {}

impl<K> PartialEq for TypedUsize<K> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K> Eq for TypedUsize<K> {}

impl<K> PartialOrd for TypedUsize<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for TypedUsize<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<K> Hash for TypedUsize<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<K> fmt::Debug for TypedUsize<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedUsize({})", self.0)
    }
}

impl<K> fmt::Display for TypedUsize<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
