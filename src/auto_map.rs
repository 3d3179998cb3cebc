//! AutoMap: a Map in which every absent key reads as `V::default()`.
//!
//! Invariant: a present key never holds the default value. Writing the
//! default removes the key, and iteration only ever sees non-default
//! entries.
//!
//! Writes go through a [`Stub`], a scope-bound handle for "the value at
//! key K". The insert-or-remove decision is deferred to the stub's drop:
//! - Creating a stub allocates nothing. Reading through it returns the
//!   stored value, or a stub-local default when the key is absent.
//! - The first mutable access creates the slot at the default value.
//! - On drop the stub compares the value with the default. Equal removes
//!   the slot; anything else stays and its weight is re-committed.
//!
//! A compound update such as `*m.at(k) += x` that nets out to the default
//! therefore never leaves a default-valued entry behind, and the commit
//! runs on every exit path including early returns and unwinding.
//!
//! A [`DeferredStub`] skips the automatic drop commit and is closed with
//! [`Stub::finalize`]. Dropping one unfinalized panics in debug builds;
//! release builds still commit on drop.

use crate::index::{Cursor, Iter};
use crate::map::Map;
use crate::table::{Table, ValueTable};
use crate::weight::{SelfCheck, Weighted};
use core::borrow::Borrow;
use core::cell::OnceCell;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use core::ops::{AddAssign, Deref, DerefMut};
use rand::Rng;
use std::collections::hash_map::RandomState;

pub struct AutoMap<K, V, T = ValueTable<V>, S = RandomState>
where
    T: Table<Value = V>,
{
    pub(crate) map: Map<K, V, T, S>,
}

impl<K, V, T: Table<Value = V>> AutoMap<K, V, T> {
    /// Empty map; every key reads as the default.
    pub fn new() -> Self {
        Self { map: Map::new() }
    }

    /// Empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: Map::with_capacity(capacity),
        }
    }
}

impl<K, V, T: Table<Value = V>, S: Default> Default for AutoMap<K, V, T, S> {
    fn default() -> Self {
        Self {
            map: Map::default(),
        }
    }
}

impl<K, V, T: Table<Value = V>, S> AutoMap<K, V, T, S> {
    /// Empty map hashing with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            map: Map::with_hasher(hasher),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            map: Map::with_capacity_and_hasher(capacity, hasher),
        }
    }

    /// Number of non-default entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Reset every key to the default.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Non-default entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, T> {
        self.map.iter()
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.map.keys()
    }

    pub fn total_weight(&self) -> T::Total {
        self.map.total_weight()
    }

    pub fn pick(&self, point: T::Total) -> Option<(&K, &V)> {
        self.map.pick(point)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(&K, &V)> {
        self.map.sample(rng)
    }
}

impl<K, V, T, S> AutoMap<K, V, T, S>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    /// Mutable subscript. Commits on drop.
    pub fn at(&mut self, key: K) -> Stub<'_, K, V, T, S> {
        Stub::new(self, key)
    }

    /// Mutable subscript that must be closed with [`Stub::finalize`].
    pub fn deferred(&mut self, key: K) -> DeferredStub<'_, K, V, T, S> {
        Stub::new(self, key)
    }

    /// Read-only subscript. Never allocates; absent keys yield the default.
    pub fn get<Q>(&self, q: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.map.get(q).cloned().unwrap_or_default()
    }

    /// Stored value, `None` when the key reads as default.
    pub fn get_ref<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.get(q)
    }

    /// Whether `q` reads as something other than the default.
    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(q)
    }

    /// Store `value`, or remove the key when `value` is the default.
    pub fn set_value(&mut self, key: K, value: V) {
        if value == V::default() {
            self.map.remove(&key);
            debug_assert!(!self.map.contains_key(&key));
        } else {
            self.map.set_value(key, value);
        }
    }

    /// Reset `q` to the default. Returns whether it held anything else.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove(q).is_some()
    }

    /// Replace the contents with `src`; default values are dropped.
    pub fn assign<I: IntoIterator<Item = (K, V)>>(&mut self, src: I) -> &mut Self {
        self.map.clear();
        for (k, v) in src {
            self.set_value(k, v);
        }
        self
    }

    /// Add `src` elementwise. Sums that land on the default disappear.
    pub fn accumulate<I: IntoIterator<Item = (K, V)>>(&mut self, src: I) -> &mut Self
    where
        V: AddAssign,
    {
        for (k, v) in src {
            *self.at(k) += v;
        }
        self
    }

    /// Cursor that drops entries found at the default as it passes them.
    pub fn cursor(&mut self) -> AutoCursor<'_, K, V, T, S> {
        AutoCursor {
            inner: self.map.cursor(),
        }
    }

    /// Commit point for a stub positioned at `loc`.
    fn finalize_at(&mut self, loc: usize) {
        let index = &mut self.map.index;
        if *index.table().get(loc) == V::default() {
            index.remove_from(loc);
            index.trim();
        } else {
            index.table_mut().commit(loc);
        }
    }

    /// Debug self-test for one key: index-consistent, and not stored at the
    /// default.
    pub fn key_legal<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if !self.map.key_legal(q) {
            tracing::warn!("index check failed for key");
            return false;
        }
        match self.map.get(q) {
            Some(v) if *v == V::default() => {
                tracing::warn!("key present with the default value");
                false
            }
            _ => true,
        }
    }

    /// Debug self-test: the map's own checks plus no default-valued entry.
    pub fn is_legal(&self) -> bool
    where
        V: SelfCheck,
    {
        if !self.map.is_legal() {
            return false;
        }
        let default = V::default();
        match self.map.iter().position(|(_, v)| *v == default) {
            Some(loc) => {
                tracing::warn!(loc, "default-valued entry present");
                false
            }
            None => true,
        }
    }
}

impl<K, V, T, S> fmt::Debug for AutoMap<K, V, T, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
    T: Table<Value = V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.map, f)
    }
}

impl<K, V, T, S> PartialEq for AutoMap<K, V, T, S>
where
    K: Eq + Hash,
    V: PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.map.get(k) == Some(v))
    }
}

impl<K, V, T, S> Extend<(K, V)> for AutoMap<K, V, T, S>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set_value(k, v);
        }
    }
}

impl<K, V, T, S> FromIterator<(K, V)> for AutoMap<K, V, T, S>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::default();
        m.extend(iter);
        m
    }
}

/// An AutoMap weighs whatever its backing table reports: the entry count
/// for a [`ValueTable`], the weight sum for a
/// [`SumTreeTable`](crate::SumTreeTable). Sampling from an outer container
/// keeps working while entries appear and vanish inside.
impl<K, V, T: Table<Value = V>, S> Weighted for AutoMap<K, V, T, S> {
    type Weight = T::Total;
    fn weight(&self) -> T::Total {
        self.total_weight()
    }
}

impl<K, V, T, S> SelfCheck for AutoMap<K, V, T, S>
where
    K: Eq + Hash,
    V: Default + PartialEq + SelfCheck,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn is_legal(&self) -> bool {
        AutoMap::is_legal(self)
    }
}

enum Target<K> {
    /// Key absent; nothing allocated yet.
    Vacant(K),
    Occupied(usize),
    /// Commit done.
    Settled,
}

/// Scope-bound handle on the value at one key of an [`AutoMap`].
///
/// With `AUTO_FINALIZE` (the default) the commit runs on drop. The
/// non-finalizing form is [`DeferredStub`].
pub struct Stub<'a, K, V, T = ValueTable<V>, S = RandomState, const AUTO_FINALIZE: bool = true>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    map: &'a mut AutoMap<K, V, T, S>,
    target: Target<K>,
    written: bool,
    default: OnceCell<V>,
}

/// A [`Stub`] that is committed only by an explicit [`Stub::finalize`].
pub type DeferredStub<'a, K, V, T = ValueTable<V>, S = RandomState> = Stub<'a, K, V, T, S, false>;

impl<'a, K, V, T, S, const AUTO_FINALIZE: bool> Stub<'a, K, V, T, S, AUTO_FINALIZE>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn new(map: &'a mut AutoMap<K, V, T, S>, key: K) -> Self {
        let target = match map.map.index.find(&key) {
            Some(loc) => Target::Occupied(loc),
            None => Target::Vacant(key),
        };
        Self {
            map,
            target,
            written: false,
            default: OnceCell::new(),
        }
    }

    /// Slot position, creating the slot at the default value if needed.
    fn materialize(&mut self) -> usize {
        match mem::replace(&mut self.target, Target::Settled) {
            Target::Occupied(loc) => {
                self.target = Target::Occupied(loc);
                loc
            }
            Target::Vacant(key) => {
                let loc = self.map.map.find_and_init(key);
                self.target = Target::Occupied(loc);
                loc
            }
            Target::Settled => unreachable!("stub accessed after its commit"),
        }
    }

    fn settle(&mut self) {
        if let Target::Occupied(loc) = mem::replace(&mut self.target, Target::Settled) {
            if self.written {
                self.map.finalize_at(loc);
            }
        }
    }

    pub fn key(&self) -> &K {
        match &self.target {
            Target::Vacant(key) => key,
            Target::Occupied(loc) => self.map.map.index.key_at(*loc),
            Target::Settled => unreachable!("stub accessed after its commit"),
        }
    }

    /// Whether a slot currently backs this stub.
    pub fn is_materialized(&self) -> bool {
        matches!(self.target, Target::Occupied(_))
    }

    pub fn get(&self) -> V
    where
        V: Clone,
    {
        (**self).clone()
    }

    /// Overwrite the value. Writing the default to an absent key is a no-op.
    pub fn set(&mut self, value: V) {
        if matches!(self.target, Target::Vacant(_)) && value == V::default() {
            return;
        }
        let loc = self.materialize();
        self.written = true;
        self.map.map.index.table_mut().set(loc, value);
    }

    /// Commit now: remove the key if it holds the default, otherwise keep it
    /// and refresh its weight.
    pub fn finalize(mut self) {
        self.settle();
    }
}

impl<K, V, T, S, const AUTO_FINALIZE: bool> Deref for Stub<'_, K, V, T, S, AUTO_FINALIZE>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    type Target = V;

    fn deref(&self) -> &V {
        match self.target {
            Target::Occupied(loc) => self.map.map.index.table().get(loc),
            _ => self.default.get_or_init(V::default),
        }
    }
}

impl<K, V, T, S, const AUTO_FINALIZE: bool> DerefMut for Stub<'_, K, V, T, S, AUTO_FINALIZE>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn deref_mut(&mut self) -> &mut V {
        let loc = self.materialize();
        self.written = true;
        self.map.map.index.table_mut().raw_mut(loc)
    }
}

impl<K, V, T, S, const AUTO_FINALIZE: bool> PartialEq<V> for Stub<'_, K, V, T, S, AUTO_FINALIZE>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn eq(&self, other: &V) -> bool {
        **self == *other
    }
}

impl<K, V, T, S, const AUTO_FINALIZE: bool> fmt::Debug for Stub<'_, K, V, T, S, AUTO_FINALIZE>
where
    K: Eq + Hash + fmt::Debug,
    V: Default + PartialEq + fmt::Debug,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("key", self.key())
            .field("value", &**self)
            .finish()
    }
}

impl<K, V, T, S, const AUTO_FINALIZE: bool> Drop for Stub<'_, K, V, T, S, AUTO_FINALIZE>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn drop(&mut self) {
        let pending = !matches!(self.target, Target::Settled);
        self.settle();
        if !AUTO_FINALIZE && pending && cfg!(debug_assertions) && !std::thread::panicking() {
            panic!("DeferredStub dropped without finalize");
        }
    }
}

/// Cursor over an [`AutoMap`] that re-checks the default-value invariant
/// per element.
///
/// Moving past an element, or dropping the cursor while it stands on one,
/// removes that element if it holds the default. Setting a value to the
/// default through [`AutoCursor::value_mut`] therefore deletes it as soon
/// as the cursor moves on.
pub struct AutoCursor<'a, K, V, T, S = RandomState>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    inner: Cursor<'a, K, T, S>,
}

impl<K, V, T, S> AutoCursor<'_, K, V, T, S>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    #[inline]
    pub fn finished(&self) -> bool {
        self.inner.finished()
    }

    pub fn key(&self) -> &K {
        self.inner.key()
    }

    pub fn value(&self) -> &V {
        self.inner.value()
    }

    pub fn value_mut(&mut self) -> &mut V {
        self.inner.value_mut()
    }

    /// Drop the current element if it holds the default. Returns whether
    /// it was dropped; the cursor then already stands on the next element.
    fn sweep(&mut self) -> bool {
        if !self.inner.finished() && *self.inner.value() == V::default() {
            self.inner.remove();
            true
        } else {
            false
        }
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

    /// Remove the current element regardless of its value.
    pub fn remove(&mut self) -> (K, V) {
        self.inner.remove()
    }
}

impl<K, V, T, S> Drop for AutoCursor<'_, K, V, T, S>
where
    K: Eq + Hash,
    V: Default + PartialEq,
    T: Table<Value = V>,
    S: BuildHasher,
{
    fn drop(&mut self) {
        self.sweep();
    }
}
