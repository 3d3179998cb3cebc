//! BoolAutoMap: the AutoMap for `bool` values, stored as a bare [`Set`].
//!
//! `false` is the default, so only `true` keys are ever stored, and a
//! stored key carries no payload: membership is the value. There is no
//! pending state between a write and its commit, so [`BoolStub::set`] and
//! [`BoolCursor::set`] act on the set directly (the cursor at its next
//! step).

use crate::index::Cursor;
use crate::set::Set;
use crate::table::ValueTable;
use crate::weight::{SelfCheck, Weighted};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use rand::Rng;
use std::collections::hash_map::RandomState;

pub struct BoolAutoMap<K, S = RandomState> {
    set: Set<K, S>,
}

impl<K> BoolAutoMap<K> {
    pub fn new() -> Self {
        Self { set: Set::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: Set::with_capacity(capacity),
        }
    }
}

impl<K, S: Default> Default for BoolAutoMap<K, S> {
    fn default() -> Self {
        Self {
            set: Set::default(),
        }
    }
}

impl<K, S> BoolAutoMap<K, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            set: Set::with_hasher(hasher),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            set: Set::with_capacity_and_hasher(capacity, hasher),
        }
    }

    /// Number of keys that read `true`.
    #[inline]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    /// Keys that read `true`.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.set.iter()
    }

    /// Uniformly random `true` key.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&K> {
        self.set.sample(rng)
    }

    /// The backing set.
    pub fn as_set(&self) -> &Set<K, S> {
        &self.set
    }
}

impl<K, S> BoolAutoMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn at(&mut self, key: K) -> BoolStub<'_, K, S> {
        let state = match self.set.index.find(&key) {
            Some(loc) => Membership::Present(loc),
            None => Membership::Absent(key),
        };
        BoolStub {
            set: &mut self.set,
            state,
        }
    }

    pub fn get<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.set.contains(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.set.contains(q)
    }

    pub fn set_value(&mut self, key: K, value: bool) {
        self.set.set_value(key, value);
    }

    /// Reset `q` to `false`. Returns whether it was `true`.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.set.remove(q)
    }

    /// Replace the contents with the `true` keys of `src`.
    pub fn assign<I: IntoIterator<Item = (K, bool)>>(&mut self, src: I) -> &mut Self {
        self.set.clear();
        self.extend(src);
        self
    }

    pub fn cursor(&mut self) -> BoolCursor<'_, K, S> {
        BoolCursor {
            inner: self.set.cursor(),
            value: true,
        }
    }

    pub fn is_legal(&self) -> bool {
        self.set.is_legal()
    }

    pub fn key_legal<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.set.key_legal(q)
    }
}

impl<K: fmt::Debug, S> fmt::Debug for BoolAutoMap<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.set.iter().map(|k| (k, true)))
            .finish()
    }
}

impl<K: Eq + Hash, S: BuildHasher> PartialEq for BoolAutoMap<K, S> {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set
    }
}

impl<K: Eq + Hash, S: BuildHasher> Eq for BoolAutoMap<K, S> {}

impl<K, S> Extend<(K, bool)> for BoolAutoMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, bool)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set_value(k, v);
        }
    }
}

impl<K, S> FromIterator<(K, bool)> for BoolAutoMap<K, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        let mut m = Self::default();
        m.extend(iter);
        m
    }
}

/// Weighs its `true` count, like the [`Set`] underneath.
impl<K, S> Weighted for BoolAutoMap<K, S> {
    type Weight = usize;
    fn weight(&self) -> usize {
        self.len()
    }
}

impl<K: Eq + Hash, S: BuildHasher> SelfCheck for BoolAutoMap<K, S> {
    fn is_legal(&self) -> bool {
        BoolAutoMap::is_legal(self)
    }
}

enum Membership<K> {
    Absent(K),
    Present(usize),
    /// Transient, only observed while switching states.
    Moving,
}

/// Handle on one key of a [`BoolAutoMap`]. Writes apply immediately.
pub struct BoolStub<'a, K, S = RandomState> {
    set: &'a mut Set<K, S>,
    state: Membership<K>,
}

impl<K, S> BoolStub<'_, K, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get(&self) -> bool {
        matches!(self.state, Membership::Present(_))
    }

    pub fn set(&mut self, value: bool) {
        self.state = match mem::replace(&mut self.state, Membership::Moving) {
            Membership::Absent(key) if value => {
                let (_, loc) = self.set.index.forced_find(key);
                Membership::Present(loc)
            }
            Membership::Present(loc) if !value => {
                let (key, ()) = self.set.index.remove_from(loc);
                self.set.index.trim();
                Membership::Absent(key)
            }
            Membership::Moving => unreachable!("membership switch interrupted"),
            unchanged => unchanged,
        };
    }

    pub fn key(&self) -> &K {
        match &self.state {
            Membership::Absent(key) => key,
            Membership::Present(loc) => self.set.index.key_at(*loc),
            Membership::Moving => unreachable!("membership switch interrupted"),
        }
    }
}

impl<K: Eq + Hash, S: BuildHasher> PartialEq<bool> for BoolStub<'_, K, S> {
    fn eq(&self, other: &bool) -> bool {
        self.get() == *other
    }
}

impl<K: Eq + Hash + fmt::Debug, S: BuildHasher> fmt::Debug for BoolStub<'_, K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoolStub")
            .field("key", self.key())
            .field("value", &self.get())
            .finish()
    }
}

/// Cursor over the `true` keys. Each element starts out `true`; setting it
/// to `false` removes it when the cursor moves on or drops.
pub struct BoolCursor<'a, K, S = RandomState> {
    inner: Cursor<'a, K, ValueTable<()>, S>,
    value: bool,
}

impl<K, S> BoolCursor<'_, K, S> {
    #[inline]
    pub fn finished(&self) -> bool {
        self.inner.finished()
    }

    pub fn key(&self) -> &K {
        self.inner.key()
    }

    pub fn get(&self) -> bool {
        self.value
    }

    pub fn set(&mut self, value: bool) {
        self.value = value;
    }

    fn sweep(&mut self) -> bool {
        let drop_current = !self.value && !self.inner.finished();
        if drop_current {
            self.inner.remove();
        }
        self.value = true;
        drop_current
    }

    pub fn advance(&mut self) {
        if !self.sweep() {
            self.inner.advance();
        }
    }

    pub fn restart(&mut self) {
        self.sweep();
        self.inner.restart();
    }
}

impl<K, S> Drop for BoolCursor<'_, K, S> {
    fn drop(&mut self) {
        self.sweep();
    }
}
