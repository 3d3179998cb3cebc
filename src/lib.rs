//! weighted-maps: hash containers with "absent means default" semantics and
//! weighted random sampling that stays correct while entries come and go.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build AutoMap in small layers, each with its own contract.
//! - Layers:
//!   - Table<Value>: dense value storage addressed by slot position.
//!     `ValueTable` is a plain `Vec`; `SumTreeTable` adds an implicit sum
//!     tree over per-value weights for O(log n) weighted pick and update.
//!   - HashIndex<K, T, S>: key placement over a dense slot vector with a
//!     table embedded at the same positions; swap-remove keeps positions
//!     dense. Includes a debug-only reentrancy guard.
//!   - Set<K, S> and Map<K, V, T, S>: thin compositions over HashIndex.
//!     Map's `at` materializes absent keys at the default value.
//!   - AutoMap<K, V, T, S>: a Map that never stores the default. Writes go
//!     through a `Stub` that decides insert-or-remove when it drops.
//!   - BoolAutoMap<K, S>: the `bool` case, stored as a bare Set.
//!
//! Constraints
//! - Single-threaded and synchronous; no locking.
//! - No per-entry heap allocations beyond the containers' own storage.
//! - O(1) average lookups; O(log n) weighted sampling with `SumTreeTable`.
//!
//! Commit protocol
//! - Tables hand out either a plain `&mut V` or a proxy guard from
//!   `get_mut`; both leave the table consistent when dropped.
//! - Stubs and cursors instead take `raw_mut` and call `commit` themselves
//!   once the write is over, since they also decide whether the entry
//!   survives.
//! - Nested stubs drop inner-first, so an inner container has settled
//!   (and shrunk to empty, if it did) before the outer one weighs it.
//!
//! Weights
//! - A value's weight comes from `Weighted`: numbers weigh themselves,
//!   `Set`/`BoolAutoMap` weigh their size, `AutoMap` weighs its table's
//!   total. Weights are not recursive: a Map of Sets samples each inner
//!   Set by how many keys it has, not by what those keys would weigh.
//!
//! Hasher and rehashing invariants
//! - Each slot stores a precomputed `u64` hash and indexing always uses
//!   the stored hash; `K: Hash` is never invoked after insertion.
//!
//! Notes and non-goals
//! - No persistence, no concurrent access, no ordered iteration.
//! - Map and AutoMap do not implement `Clone`; populate one from another
//!   with `assign`.

mod auto_map;
mod bool_map;
pub mod index;
mod index_proptest;
mod map;
mod reentrancy;
mod set;
mod sum_tree;
mod table;
mod weight;

// Public surface
pub use auto_map::{AutoCursor, AutoMap, DeferredStub, Stub};
pub use bool_map::{BoolAutoMap, BoolCursor, BoolStub};
pub use index::{Cursor, HashIndex, Iter};
pub use map::Map;
pub use set::Set;
pub use sum_tree::{SumTreeRef, SumTreeTable};
pub use table::{Table, ValueTable};
pub use weight::{ByValue, SelfCheck, Uniform, Weight, WeightPolicy, Weighted};
