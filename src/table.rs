//! Value storage behind an index.
//!
//! A table stores one value per occupied slot, at the slot's dense
//! position `0..len`. The index decides positions; the table only keeps
//! values there and, for weighted tables, keeps aggregates current.

use crate::weight::Weight;
use core::ops::DerefMut;
use rand::Rng;

/// Physical value storage addressed by slot position.
///
/// Mutable access comes in two shapes:
/// - [`Table::get_mut`] returns `ValueMut`, which is either a direct
///   `&mut V` or a proxy that restores the table's aggregates when it is
///   dropped. Either way the caller just writes through it.
/// - [`Table::raw_mut`] returns a bare `&mut V` and leaves aggregates
///   stale until [`Table::commit`] is called for that position. Stubs and
///   cursors use this pair because they already own a commit point.
pub trait Table {
    type Value;
    type ValueMut<'a>: DerefMut<Target = Self::Value>
    where
        Self: 'a;
    /// Aggregate weight of the whole table.
    type Total: Weight;

    fn with_capacity(capacity: usize) -> Self;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn capacity(&self) -> usize;

    /// Append a value at position `len()`.
    fn push(&mut self, value: Self::Value);
    fn get(&self, loc: usize) -> &Self::Value;
    fn get_mut(&mut self, loc: usize) -> Self::ValueMut<'_>;
    fn raw_mut(&mut self, loc: usize) -> &mut Self::Value;
    /// Re-derive aggregates for `loc` after writes through `raw_mut`.
    fn commit(&mut self, loc: usize);
    fn set(&mut self, loc: usize, value: Self::Value);

    /// Reset the value at `loc` to its cleared state.
    fn clear_val(&mut self, loc: usize)
    where
        Self::Value: Default,
    {
        self.set(loc, Self::Value::default());
    }

    /// Remove the value at `loc`, moving the last value into its place.
    fn swap_remove(&mut self, loc: usize) -> Self::Value;
    fn clear(&mut self);
    fn shrink_to(&mut self, min_capacity: usize);

    fn total(&self) -> Self::Total;
    /// Position whose cumulative weight range contains `point`.
    fn pick(&self, point: Self::Total) -> Option<usize>;

    /// Draw a position with probability proportional to its weight.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let total = self.total();
        if !(total > Self::Total::default()) {
            return None;
        }
        self.pick(rng.gen_range(Self::Total::default()..total))
    }

    fn is_legal(&self) -> bool {
        true
    }
}

/// Plain dense storage. Every entry weighs 1, so sampling is uniform and
/// the table's total is its length.
#[derive(Debug, Clone)]
pub struct ValueTable<V> {
    values: Vec<V>,
}

impl<V> Default for ValueTable<V> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<V> Table for ValueTable<V> {
    type Value = V;
    type ValueMut<'a>
        = &'a mut V
    where
        Self: 'a;
    type Total = usize;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.values.capacity()
    }

    #[inline]
    fn push(&mut self, value: V) {
        self.values.push(value);
    }

    #[inline]
    fn get(&self, loc: usize) -> &V {
        &self.values[loc]
    }

    #[inline]
    fn get_mut(&mut self, loc: usize) -> Self::ValueMut<'_> {
        &mut self.values[loc]
    }

    #[inline]
    fn raw_mut(&mut self, loc: usize) -> &mut V {
        &mut self.values[loc]
    }

    #[inline]
    fn commit(&mut self, _loc: usize) {}

    #[inline]
    fn set(&mut self, loc: usize, value: V) {
        self.values[loc] = value;
    }

    fn swap_remove(&mut self, loc: usize) -> V {
        self.values.swap_remove(loc)
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn shrink_to(&mut self, min_capacity: usize) {
        self.values.shrink_to(min_capacity);
    }

    fn total(&self) -> usize {
        self.values.len()
    }

    fn pick(&self, point: usize) -> Option<usize> {
        (point < self.values.len()).then_some(point)
    }
}
