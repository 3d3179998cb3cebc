//! SumTreeTable: value storage with an implicit tree of partial weight sums.
//!
//! Layout
//! - `values[i]` is the value at slot position `i`.
//! - `sums` is a complete binary tree stored in an array of `2 * cap`
//!   weights, `cap` a power of two. Node 1 is the root, node `n` has
//!   children `2n` and `2n + 1`, and leaf `i` sits at `cap + i`. Node 0 is
//!   unused. Leaves past `len` hold the zero weight.
//!
//! Every write that can change a weight ends in `commit(loc)`, which
//! rewrites one leaf and the `log2(cap)` sums above it. Picking descends
//! from the root, so both are logarithmic. Growing doubles `cap` and
//! rebuilds bottom-up in linear time.

use crate::table::Table;
use crate::weight::{ByValue, WeightPolicy};
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

pub struct SumTreeTable<V, P: WeightPolicy<V> = ByValue> {
    values: Vec<V>,
    sums: Vec<P::Weight>,
    _policy: PhantomData<P>,
}

impl<V, P: WeightPolicy<V>> Default for SumTreeTable<V, P> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            sums: Vec::new(),
            _policy: PhantomData,
        }
    }
}

impl<V: fmt::Debug, P: WeightPolicy<V>> fmt::Debug for SumTreeTable<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SumTreeTable")
            .field("values", &self.values)
            .field("total", &self.total_weight())
            .finish()
    }
}

impl<V, P: WeightPolicy<V>> SumTreeTable<V, P> {
    /// Number of leaves the tree currently spans.
    #[inline]
    fn leaves(&self) -> usize {
        self.sums.len() / 2
    }

    fn total_weight(&self) -> P::Weight {
        self.sums.get(1).copied().unwrap_or_default()
    }

    /// Write leaf `loc` and refresh its ancestors.
    fn update_leaf(&mut self, loc: usize, w: P::Weight) {
        let mut n = self.leaves() + loc;
        self.sums[n] = w;
        n /= 2;
        while n >= 1 {
            self.sums[n] = self.sums[2 * n] + self.sums[2 * n + 1];
            n /= 2;
        }
    }

    /// Re-lay the tree over `leaves` leaves (a power of two, at least `len`).
    fn rebuild(&mut self, leaves: usize) {
        debug_assert!(leaves.is_power_of_two() && leaves >= self.values.len());
        tracing::trace!(
            from = self.leaves(),
            to = leaves,
            len = self.values.len(),
            "rebuilding sum tree"
        );
        let mut sums = vec![P::Weight::default(); 2 * leaves];
        for (i, v) in self.values.iter().enumerate() {
            sums[leaves + i] = P::weight(v);
        }
        for n in (1..leaves).rev() {
            sums[n] = sums[2 * n] + sums[2 * n + 1];
        }
        self.sums = sums;
    }

    /// Cumulative weight of positions `0..=loc`. Linear; for checks and tests.
    pub fn prefix_weight(&self, loc: usize) -> P::Weight {
        let cap = self.leaves();
        self.sums[cap..=cap + loc]
            .iter()
            .fold(P::Weight::default(), |acc, &w| acc + w)
    }

    /// Stored weight of the value at `loc`.
    pub fn weight_at(&self, loc: usize) -> P::Weight {
        self.sums[self.leaves() + loc]
    }
}

impl<V, P: WeightPolicy<V>> Table for SumTreeTable<V, P> {
    type Value = V;
    type ValueMut<'a>
        = SumTreeRef<'a, V, P>
    where
        Self: 'a;
    type Total = P::Weight;

    fn with_capacity(capacity: usize) -> Self {
        let mut t = Self {
            values: Vec::with_capacity(capacity),
            ..Self::default()
        };
        if capacity > 0 {
            t.rebuild(capacity.next_power_of_two());
        }
        t
    }

    #[inline]
    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.leaves()
    }

    fn push(&mut self, value: V) {
        let loc = self.values.len();
        let w = P::weight(&value);
        self.values.push(value);
        if loc == self.leaves() {
            // Rebuild picks up the new leaf.
            self.rebuild((loc + 1).next_power_of_two());
        } else {
            self.update_leaf(loc, w);
        }
    }

    #[inline]
    fn get(&self, loc: usize) -> &V {
        &self.values[loc]
    }

    fn get_mut(&mut self, loc: usize) -> SumTreeRef<'_, V, P> {
        assert!(loc < self.values.len(), "sum tree position out of range");
        SumTreeRef { table: self, loc }
    }

    #[inline]
    fn raw_mut(&mut self, loc: usize) -> &mut V {
        &mut self.values[loc]
    }

    fn commit(&mut self, loc: usize) {
        let w = P::weight(&self.values[loc]);
        self.update_leaf(loc, w);
    }

    fn set(&mut self, loc: usize, value: V) {
        self.values[loc] = value;
        self.commit(loc);
    }

    fn swap_remove(&mut self, loc: usize) -> V {
        let last = self.values.len() - 1;
        let removed = self.values.swap_remove(loc);
        if loc != last {
            self.commit(loc);
        }
        self.update_leaf(last, P::Weight::default());
        removed
    }

    fn clear(&mut self) {
        self.values.clear();
        self.sums.fill(P::Weight::default());
    }

    fn shrink_to(&mut self, min_capacity: usize) {
        self.values.shrink_to(min_capacity);
        let leaves = min_capacity.max(self.values.len()).max(1).next_power_of_two();
        if leaves < self.leaves() {
            self.rebuild(leaves);
        }
    }

    #[inline]
    fn total(&self) -> P::Weight {
        self.total_weight()
    }

    fn pick(&self, point: P::Weight) -> Option<usize> {
        let zero = P::Weight::default();
        if self.values.is_empty() || point < zero || !(point < self.total_weight()) {
            return None;
        }
        let cap = self.leaves();
        let mut rest = point;
        let mut n = 1;
        while n < cap {
            let left = self.sums[2 * n];
            let right = self.sums[2 * n + 1];
            // Only descend into weight; float rounding may leave `rest` past
            // the right subtree, which then resolves to its last positive leaf.
            if rest < left || !(right > zero) {
                n = 2 * n;
            } else {
                rest = rest - left;
                n = 2 * n + 1;
            }
        }
        let loc = n - cap;
        (loc < self.values.len()).then_some(loc)
    }

    fn is_legal(&self) -> bool {
        let cap = self.leaves();
        if self.values.len() > cap {
            tracing::warn!(len = self.values.len(), cap, "sum tree narrower than its values");
            return false;
        }
        for (i, v) in self.values.iter().enumerate() {
            let stored = self.sums[cap + i];
            let actual = P::weight(v);
            if stored != actual {
                tracing::warn!(loc = i, ?stored, ?actual, "stale sum tree leaf");
                return false;
            }
        }
        let zero = P::Weight::default();
        if let Some(i) = (self.values.len()..cap).find(|&i| self.sums[cap + i] != zero) {
            tracing::warn!(loc = i, "unused sum tree leaf carries weight");
            return false;
        }
        for n in 1..cap {
            if self.sums[n] != self.sums[2 * n] + self.sums[2 * n + 1] {
                tracing::warn!(node = n, "sum tree node disagrees with its children");
                return false;
            }
        }
        true
    }
}

/// Proxy reference into a [`SumTreeTable`]. Reads and writes go straight
/// to the value; dropping the proxy re-commits the value's weight.
pub struct SumTreeRef<'a, V, P: WeightPolicy<V>> {
    table: &'a mut SumTreeTable<V, P>,
    loc: usize,
}

impl<V, P: WeightPolicy<V>> Deref for SumTreeRef<'_, V, P> {
    type Target = V;
    fn deref(&self) -> &V {
        &self.table.values[self.loc]
    }
}

impl<V, P: WeightPolicy<V>> DerefMut for SumTreeRef<'_, V, P> {
    fn deref_mut(&mut self) -> &mut V {
        &mut self.table.values[self.loc]
    }
}

impl<V, P: WeightPolicy<V>> Drop for SumTreeRef<'_, V, P> {
    fn drop(&mut self) {
        self.table.commit(self.loc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::Uniform;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn table_of(ws: &[u64]) -> SumTreeTable<u64> {
        let mut t = SumTreeTable::default();
        for &w in ws {
            t.push(w);
        }
        t
    }

    /// Invariant: the root equals the sum of all leaf weights after pushes
    /// that cross several growth boundaries.
    #[test]
    fn total_tracks_pushes_across_growth() {
        let mut t = SumTreeTable::<u64>::default();
        let mut expected = 0;
        for w in 1..=33u64 {
            t.push(w);
            expected += w;
            assert_eq!(t.total(), expected);
            assert!(t.is_legal());
        }
        assert_eq!(t.capacity(), 64);
    }

    /// Invariant: `pick` maps each point in `[0, total)` to the position
    /// whose cumulative range contains it.
    #[test]
    fn pick_follows_cumulative_ranges() {
        let t = table_of(&[3, 0, 5, 2]);
        let expected = [0, 0, 0, 2, 2, 2, 2, 2, 3, 3];
        for (point, &loc) in expected.iter().enumerate() {
            assert_eq!(t.pick(point as u64), Some(loc), "point {point}");
        }
        assert_eq!(t.pick(10), None);
        assert_eq!(t.prefix_weight(2), 8);
    }

    /// Invariant: the proxy reference re-commits on drop, so writes through
    /// `get_mut` are reflected in the aggregate.
    #[test]
    fn proxy_commits_on_drop() {
        let mut t = table_of(&[1, 1, 1]);
        {
            let mut r = t.get_mut(1);
            *r += 9;
        }
        assert_eq!(t.total(), 12);
        assert_eq!(t.weight_at(1), 10);
        assert!(t.is_legal());
    }

    /// Invariant: raw writes leave the tree stale until `commit`.
    #[test]
    fn raw_writes_need_commit() {
        let mut t = table_of(&[4, 4]);
        *t.raw_mut(0) = 1;
        assert_eq!(t.total(), 8);
        assert!(!t.is_legal());
        t.commit(0);
        assert_eq!(t.total(), 5);
        assert!(t.is_legal());
    }

    #[test]
    fn swap_remove_keeps_sums() {
        let mut t = table_of(&[1, 2, 3, 4, 5]);
        assert_eq!(t.swap_remove(1), 2);
        assert_eq!(*t.get(1), 5);
        assert_eq!(t.total(), 13);
        assert!(t.is_legal());
        assert_eq!(t.swap_remove(3), 4);
        assert_eq!(t.total(), 9);
        assert!(t.is_legal());
    }

    #[test]
    fn shrink_rebuilds_narrower_tree() {
        let mut t = table_of(&(0..40).collect::<Vec<u64>>());
        while t.len() > 3 {
            let last = t.len() - 1;
            t.swap_remove(last);
        }
        assert_eq!(t.capacity(), 64);
        t.shrink_to(6);
        assert_eq!(t.capacity(), 8);
        assert_eq!(t.total(), 3);
        assert!(t.is_legal());
    }

    #[test]
    fn zero_total_samples_nothing() {
        let t = table_of(&[0, 0]);
        assert_eq!(t.sample(&mut StdRng::seed_from_u64(3)), None);
        assert_eq!(SumTreeTable::<u64>::default().sample(&mut StdRng::seed_from_u64(3)), None);
    }

    /// Sampling frequencies follow weights (loose bound, fixed seed).
    #[test]
    fn sampling_is_weight_proportional() {
        let t = table_of(&[1, 0, 3]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = [0usize; 3];
        for _ in 0..8000 {
            hits[t.sample(&mut rng).unwrap()] += 1;
        }
        assert_eq!(hits[1], 0);
        let ratio = hits[2] as f64 / hits[0] as f64;
        assert!((2.5..3.5).contains(&ratio), "ratio {ratio}");
    }

    /// Invariant: `pick` never lands on a zero-weight entry, including a
    /// trailing one and points just below a float total.
    #[test]
    fn pick_skips_zero_weight_entries() {
        let t = table_of(&[0, 5, 0]);
        for point in 0..5 {
            assert_eq!(t.pick(point), Some(1));
        }
        let t = table_of(&[3, 0]);
        assert_eq!(t.pick(2), Some(0));

        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..2000 {
            let n = rng.gen_range(2..40);
            let mut f = SumTreeTable::<f64>::default();
            for _ in 0..n - 1 {
                f.push(rng.gen_range(0.0..1.0) * 1e-3 + rng.gen_range(0.0..10.0));
            }
            f.push(0.0);
            let below_total = f64::from_bits(f.total().to_bits() - 1);
            let loc = f.pick(below_total).expect("positive total");
            assert!(f.weight_at(loc) > 0.0, "picked zero-weight position {loc} of {n}");
        }
    }

    /// Narrow weights aggregate in a wide type, so their sums cannot wrap.
    #[test]
    fn narrow_weights_do_not_overflow() {
        let mut t = SumTreeTable::<u8>::default();
        t.push(200);
        t.push(100);
        t.push(255);
        assert_eq!(t.total(), 555u64);
        assert_eq!(t.pick(250), Some(1));
        assert!(t.is_legal());
    }

    #[test]
    fn float_weights_and_uniform_policy() {
        let mut f = SumTreeTable::<f64>::default();
        f.push(0.5);
        f.push(1.5);
        assert_eq!(f.total(), 2.0);
        assert_eq!(f.pick(0.75), Some(1));

        let mut u = SumTreeTable::<&str, Uniform>::default();
        u.push("a");
        u.push("b");
        u.push("c");
        assert_eq!(u.total(), 3);
        assert_eq!(u.pick(2), Some(2));
    }
}
