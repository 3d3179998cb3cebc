//! Set: a hash index whose table stores nothing.

use crate::index::{Cursor, HashIndex};
use crate::table::{Table, ValueTable};
use crate::weight::{SelfCheck, Weighted};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use rand::Rng;
use std::collections::hash_map::RandomState;

pub struct Set<K, S = RandomState> {
    pub(crate) index: HashIndex<K, ValueTable<()>, S>,
}

impl<K> Set<K> {
    /// Empty set with the default hasher.
    pub fn new() -> Self {
        Self {
            index: HashIndex::new(),
        }
    }

    /// Empty set with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashIndex::with_capacity(capacity),
        }
    }
}

impl<K, S: Default> Default for Set<K, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, S> Set<K, S> {
    /// Empty set hashing with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            index: HashIndex::with_hasher(hasher),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            index: HashIndex::with_capacity_and_hasher(capacity, hasher),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Keys in slot order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.index.keys()
    }

    pub fn cursor(&mut self) -> Cursor<'_, K, ValueTable<()>, S> {
        self.index.cursor()
    }

    /// Uniformly random element.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&K> {
        let loc = self.index.table().sample(rng)?;
        Some(self.index.key_at(loc))
    }
}

impl<K, S> Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Insert `key`. Returns whether it was already present; a present key
    /// is left untouched.
    pub fn put(&mut self, key: K) -> bool {
        self.index.forced_find(key).0
    }

    /// Whether `q` is a member.
    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index.contains(q)
    }

    /// Read-only subscript: presence is the value.
    pub fn get<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.contains(q)
    }

    /// Remove `q` if present, then run the index's post-removal trim.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self.index.remove(q).is_some();
        self.index.trim();
        removed
    }

    pub fn set_value(&mut self, key: K, value: bool) {
        if value {
            self.put(key);
        } else {
            self.remove(&key);
        }
    }

    /// Replace the contents with the keys of `src`.
    pub fn assign<I: IntoIterator<Item = K>>(&mut self, src: I) -> &mut Self {
        self.index.clear();
        self.accumulate(src)
    }

    /// Add the keys of `src`; keys already present stay as they are.
    pub fn accumulate<I: IntoIterator<Item = K>>(&mut self, src: I) -> &mut Self {
        for key in src {
            self.put(key);
        }
        self
    }

    pub fn is_legal(&self) -> bool {
        self.index.is_legal()
    }

    pub fn key_legal<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index.key_legal(q)
    }
}

impl<K: fmt::Debug, S> fmt::Debug for Set<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S> PartialEq for Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|k| other.contains(k))
    }
}

impl<K: Eq + Hash, S: BuildHasher> Eq for Set<K, S> {}

impl<K, S> Extend<K> for Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.accumulate(iter);
    }
}

impl<K, S> FromIterator<K> for Set<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut s = Self::default();
        s.accumulate(iter);
        s
    }
}

/// A set weighs its element count, not anything its elements weigh.
impl<K, S> Weighted for Set<K, S> {
    type Weight = usize;
    fn weight(&self) -> usize {
        self.len()
    }
}

impl<K: Eq + Hash, S: BuildHasher> SelfCheck for Set<K, S> {
    fn is_legal(&self) -> bool {
        Set::is_legal(self)
    }
}
