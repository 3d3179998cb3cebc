//! Map: a hash index over a value table, with a materializing subscript.

use crate::index::{Cursor, HashIndex, Iter};
use crate::table::{Table, ValueTable};
use crate::weight::SelfCheck;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use core::ops::{AddAssign, Index};
use rand::Rng;
use std::collections::hash_map::RandomState;

/// Hash map over a pluggable value table `T`.
///
/// `Map` deliberately has no `Clone`; populate one map from another with
/// [`Map::assign`] or [`Map::accumulate`].
pub struct Map<K, V, T = ValueTable<V>, S = RandomState>
where
    T: Table<Value = V>,
{
    pub(crate) index: HashIndex<K, T, S>,
    _v: PhantomData<V>,
}

impl<K, V, T: Table<Value = V>> Map<K, V, T> {
    /// Empty map with the default hasher.
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, T: Table<Value = V>, S: Default> Default for Map<K, V, T, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, T: Table<Value = V>, S> Map<K, V, T, S> {
    /// Empty map hashing with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            index: HashIndex::with_capacity_and_hasher(capacity, hasher),
            _v: PhantomData,
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

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, T> {
        self.index.iter()
    }

    /// Keys in slot order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.index.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.index.iter().map(|(_, v)| v)
    }

    /// Restartable cursor; its value accessors resolve through the map on
    /// every call.
    pub fn cursor(&mut self) -> Cursor<'_, K, T, S> {
        self.index.cursor()
    }

    /// The backing table's aggregate: the element count for a plain table,
    /// the weight sum for a sum tree.
    pub fn total_weight(&self) -> T::Total {
        self.index.table().total()
    }

    /// Entry whose cumulative weight range contains `point`.
    pub fn pick(&self, point: T::Total) -> Option<(&K, &V)> {
        let loc = self.index.table().pick(point)?;
        Some(self.index.entry_at(loc))
    }

    /// Entry drawn with probability proportional to its weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&K, &V)> {
        let loc = self.index.table().sample(rng)?;
        Some(self.index.entry_at(loc))
    }
}

impl<K, V, T, S> Map<K, V, T, S>
where
    K: Eq + Hash,
    T: Table<Value = V>,
    S: BuildHasher,
{
    /// Position of `key`, creating it in the table's cleared state if absent.
    pub(crate) fn find_and_init(&mut self, key: K) -> usize
    where
        V: Default,
    {
        self.index.forced_find(key).1
    }

    /// Mutable subscript. An absent key is created with the default value
    /// first; the returned reference is whatever shape the table hands out.
    pub fn at(&mut self, key: K) -> T::ValueMut<'_>
    where
        V: Default,
    {
        let loc = self.find_and_init(key);
        self.index.table_mut().get_mut(loc)
    }

    /// Materialize and overwrite in one step.
    pub fn set_value(&mut self, key: K, value: V) {
        let mut value = Some(value);
        let (existed, loc) = self
            .index
            .forced_find_with(key, || value.take().expect("init runs at most once"));
        if existed {
            if let Some(v) = value {
                self.index.table_mut().set(loc, v);
            }
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let loc = self.index.find(q)?;
        Some(self.index.table().get(loc))
    }

    /// Whether `q` has an entry.
    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index.contains(q)
    }

    /// Remove `q` if present, then trim.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self.index.remove(q).map(|(_, v)| v);
        self.index.trim();
        removed
    }

    /// Replace the contents with `src`; later duplicates overwrite earlier ones.
    pub fn assign<I: IntoIterator<Item = (K, V)>>(&mut self, src: I) -> &mut Self {
        self.index.clear();
        for (k, v) in src {
            self.set_value(k, v);
        }
        self
    }

    /// Add `src` elementwise: `self[k] += v`, creating absent keys at default.
    pub fn accumulate<I: IntoIterator<Item = (K, V)>>(&mut self, src: I) -> &mut Self
    where
        V: Default + AddAssign,
    {
        for (k, v) in src {
            *self.at(k) += v;
        }
        self
    }

    pub fn key_legal<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index.key_legal(q)
    }

    /// Debug self-test: index structure, table aggregates, and every stored
    /// value's own check.
    pub fn is_legal(&self) -> bool
    where
        V: SelfCheck,
    {
        if !self.index.is_legal() {
            return false;
        }
        self.index.iter().enumerate().all(|(loc, (_, v))| {
            let ok = v.is_legal();
            if !ok {
                tracing::warn!(loc, "stored value failed its self-check");
            }
            ok
        })
    }
}

impl<K, V, T, S, Q> Index<&Q> for Map<K, V, T, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if `key` is absent, like `std::collections::HashMap`.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in Map")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, T: Table<Value = V>, S> fmt::Debug for Map<K, V, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, T, S> Extend<(K, V)> for Map<K, V, T, S>
where
    K: Eq + Hash,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set_value(k, v);
        }
    }
}

impl<K, V, T, S> FromIterator<(K, V)> for Map<K, V, T, S>
where
    K: Eq + Hash,
    T: Table<Value = V>,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::default();
        m.extend(iter);
        m
    }
}

impl<K, V, T, S> SelfCheck for Map<K, V, T, S>
where
    K: Eq + Hash,
    V: SelfCheck,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn is_legal(&self) -> bool {
        Map::is_legal(self)
    }
}
