//! HashIndex: key placement over a dense slot vector with an embedded table.
//!
//! Layout
//! - `slots[pos]` holds the key at dense position `pos` and its cached hash.
//! - `index` is a `hashbrown::HashTable<usize>` from hash to position.
//! - `table` holds the value for `slots[pos]` at the same `pos`.
//!
//! Removal swap-removes: the last slot moves into the hole and its index
//! entry is re-pointed. Positions therefore stay dense, which is what lets
//! an implicit sum tree sit underneath without gaps, and a cursor that
//! removes the element it stands on is already standing on the next
//! unvisited element afterwards. Shrinking is a separate `trim` step.
//!
//! The cached hash is used for every rehash and relocation; `K: Hash` is
//! only invoked when a key comes in from outside.

use crate::reentrancy::DebugReentrancy;
use crate::table::Table;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_table::Entry;
use hashbrown::HashTable;
use std::collections::hash_map::RandomState;

/// Capacities at or below this are never trimmed.
pub const MIN_TRIM_CAPACITY: usize = 16;
/// `trim` shrinks once `len * TRIM_RATIO < capacity`.
pub const TRIM_RATIO: usize = 4;

/// Bucket count hashbrown allocates to hold `capacity` items.
fn buckets_for(capacity: usize) -> usize {
    if capacity < 4 {
        4
    } else if capacity < 8 {
        8
    } else {
        (capacity * 8 / 7).next_power_of_two()
    }
}

/// Bucket count behind a reported hashbrown `capacity()`.
fn buckets_behind(capacity: usize) -> usize {
    if capacity < 7 {
        capacity + 1
    } else {
        capacity / 7 * 8
    }
}

/// Capacity `trim` shrinks to, or `None` when the index is dense enough or
/// shrinking would not release any buckets.
fn trim_target(len: usize, capacity: usize) -> Option<usize> {
    if capacity <= MIN_TRIM_CAPACITY || len * TRIM_RATIO >= capacity {
        return None;
    }
    let target = (len * 2).max(MIN_TRIM_CAPACITY);
    (buckets_for(target) < buckets_behind(capacity)).then_some(target)
}

#[derive(Debug, Clone)]
struct Slot<K> {
    key: K,
    hash: u64,
}

pub struct HashIndex<K, T, S = RandomState> {
    hasher: S,
    index: HashTable<usize>,
    slots: Vec<Slot<K>>,
    table: T,
    reentrancy: DebugReentrancy,
}

impl<K, T: Table> HashIndex<K, T> {
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, RandomState::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, T: Table> Default for HashIndex<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, T: Table, S> fmt::Debug for HashIndex<K, T, S>
where
    T::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .enumerate()
                    .map(|(pos, s)| (&s.key, self.table.get(pos))),
            )
            .finish()
    }
}

impl<K, T: Table, S> HashIndex<K, T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            table: T::with_capacity(capacity),
            reentrancy: DebugReentrancy::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    pub fn table(&self) -> &T {
        &self.table
    }

    #[inline]
    pub(crate) fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    /// Key stored at `loc`.
    #[inline]
    pub fn key_at(&self, loc: usize) -> &K {
        &self.slots[loc].key
    }

    /// Key and value stored at `loc`.
    #[inline]
    pub fn entry_at(&self, loc: usize) -> (&K, &T::Value) {
        (&self.slots[loc].key, self.table.get(loc))
    }

    /// Remove the slot at `loc`. The last slot takes its place.
    pub fn remove_from(&mut self, loc: usize) -> (K, T::Value) {
        let _g = self.reentrancy.enter();
        let last = self.slots.len() - 1;
        let hash = self.slots[loc].hash;
        match self.index.find_entry(hash, |&p| p == loc) {
            Ok(entry) => {
                entry.remove();
            }
            Err(_) => unreachable!("every slot position has an index entry"),
        }
        if loc != last {
            let moved = self.slots[last].hash;
            let p = self
                .index
                .find_mut(moved, |&p| p == last)
                .expect("every slot position has an index entry");
            *p = loc;
        }
        let slot = self.slots.swap_remove(loc);
        let value = self.table.swap_remove(loc);
        (slot.key, value)
    }

    /// Post-removal maintenance: release capacity once the index is mostly
    /// empty. Idempotent; never changes contents or positions.
    pub fn trim(&mut self) {
        let cap = self.index.capacity();
        let len = self.slots.len();
        let Some(target) = trim_target(len, cap) else {
            return;
        };
        let _g = self.reentrancy.enter();
        tracing::trace!(len, from = cap, to = target, "trimming hash index");
        let slots = &self.slots;
        self.index.shrink_to(target, |&p| slots[p].hash);
        self.slots.shrink_to(target);
        self.table.shrink_to(target);
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.index.clear();
        self.slots.clear();
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, T> {
        Iter {
            slots: self.slots.iter().enumerate(),
            table: &self.table,
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.slots.iter().map(|s| &s.key)
    }

    pub fn cursor(&mut self) -> Cursor<'_, K, T, S> {
        Cursor {
            index: self,
            pos: 0,
            dirty: false,
            removed: false,
        }
    }
}

impl<K, T, S> HashIndex<K, T, S>
where
    K: Eq + Hash,
    T: Table,
    S: BuildHasher,
{
    #[inline]
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Position of `q`, if present.
    pub fn find<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&p| {
                let s = &self.slots[p];
                s.hash == hash && s.key.borrow() == q
            })
            .copied()
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    /// Find `key`, creating a slot with the table's cleared value on a miss.
    /// Returns whether the key already existed and its position.
    pub fn forced_find(&mut self, key: K) -> (bool, usize)
    where
        T::Value: Default,
    {
        self.forced_find_with(key, T::Value::default)
    }

    /// Like [`HashIndex::forced_find`], but builds the new value with `init`.
    /// `init` only runs on a miss.
    pub fn forced_find_with<F>(&mut self, key: K, init: F) -> (bool, usize)
    where
        F: FnOnce() -> T::Value,
    {
        let hash = self.make_hash(&key);
        let _g = self.reentrancy.enter();
        let slots = &self.slots;
        match self.index.entry(
            hash,
            |&p| slots[p].hash == hash && slots[p].key == key,
            |&p| slots[p].hash,
        ) {
            Entry::Occupied(o) => (true, *o.get()),
            Entry::Vacant(v) => {
                let pos = self.slots.len();
                let _ = v.insert(pos);
                self.slots.push(Slot { key, hash });
                self.table.push(init());
                (false, pos)
            }
        }
    }

    /// Remove `q` if present, returning the owned key and value.
    /// Does not trim.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, T::Value)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let loc = self.find(q)?;
        Some(self.remove_from(loc))
    }

    /// Debug self-test of the slot/index/table correspondence.
    pub fn is_legal(&self) -> bool {
        let len = self.slots.len();
        if self.index.len() != len || self.table.len() != len {
            tracing::warn!(
                slots = len,
                index = self.index.len(),
                table = self.table.len(),
                "hash index parts disagree on length"
            );
            return false;
        }
        for (pos, s) in self.slots.iter().enumerate() {
            if self.make_hash(&s.key) != s.hash {
                tracing::warn!(pos, "cached hash does not match key");
                return false;
            }
            if self.index.find(s.hash, |&p| p == pos).is_none() {
                tracing::warn!(pos, "slot not reachable through the index");
                return false;
            }
            if self.find(&s.key) != Some(pos) {
                tracing::warn!(pos, "key resolves to a different slot");
                return false;
            }
        }
        self.table.is_legal()
    }

    /// Debug self-test for a single key: if present, it resolves to a slot
    /// holding that same key.
    pub fn key_legal<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.find(q) {
            Some(pos) => pos < self.slots.len() && self.slots[pos].key.borrow() == q,
            None => true,
        }
    }
}

/// Iterator over `(key, value)` in slot order.
pub struct Iter<'a, K, T: Table> {
    slots: core::iter::Enumerate<core::slice::Iter<'a, Slot<K>>>,
    table: &'a T,
}

impl<'a, K, T: Table> Iterator for Iter<'a, K, T> {
    type Item = (&'a K, &'a T::Value);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .next()
            .map(|(pos, s)| (&s.key, self.table.get(pos)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<K, T: Table> ExactSizeIterator for Iter<'_, K, T> {}

/// Restartable mutable cursor over an index.
///
/// The value accessors go back through the index on every call rather
/// than holding a reference, so the cursor stays valid across removals
/// and table relocations during the same pass. Writes made through
/// [`Cursor::value_mut`] are committed to the table when the cursor moves
/// or drops.
pub struct Cursor<'a, K, T: Table, S = RandomState> {
    index: &'a mut HashIndex<K, T, S>,
    pos: usize,
    dirty: bool,
    removed: bool,
}

impl<K, T: Table, S> Cursor<'_, K, T, S> {
    #[inline]
    pub fn finished(&self) -> bool {
        self.pos >= self.index.len()
    }

    /// Current position in slot order.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn flush(&mut self) {
        if self.dirty {
            self.dirty = false;
            if !self.finished() {
                self.index.table.commit(self.pos);
            }
        }
    }

    pub fn advance(&mut self) {
        self.flush();
        if !self.finished() {
            self.pos += 1;
        }
    }

    /// Rewind to the first element.
    pub fn restart(&mut self) {
        self.flush();
        self.pos = 0;
    }

    /// Key under the cursor. Panics when finished.
    pub fn key(&self) -> &K {
        self.index.key_at(self.pos)
    }

    /// Value under the cursor. Panics when finished.
    pub fn value(&self) -> &T::Value {
        self.index.table.get(self.pos)
    }

    pub fn value_mut(&mut self) -> &mut T::Value {
        self.dirty = true;
        self.index.table.raw_mut(self.pos)
    }

    /// Remove the element under the cursor. The cursor then stands on the
    /// element that was last, which has not been visited yet.
    pub fn remove(&mut self) -> (K, T::Value) {
        self.flush();
        self.removed = true;
        self.index.remove_from(self.pos)
    }
}

impl<K, T: Table, S> Drop for Cursor<'_, K, T, S> {
    fn drop(&mut self) {
        self.flush();
        if self.removed {
            self.index.trim();
        }
    }
}
