//! Weights: the scalar a stored value contributes to weighted sampling.
//!
//! Two layers:
//! - [`Weighted`] is a value's own weight. Numbers weigh themselves.
//!   Containers weigh their element count ([`Set`](crate::Set),
//!   [`BoolAutoMap`](crate::BoolAutoMap)) or the total of their backing
//!   table ([`AutoMap`](crate::AutoMap)).
//! - [`WeightPolicy`] is the strategy a [`SumTreeTable`](crate::SumTreeTable)
//!   uses to read weights out of its values. [`ByValue`] defers to
//!   `Weighted`; [`Uniform`] gives every entry weight 1.
//!
//! Nested weights are deliberately not recursive. A `Map<u32, Set<u32>>`
//! stored in a sum tree samples each inner set by how many elements it
//! holds, regardless of anything those elements might weigh themselves.
//! Outer sampling treats an inner container as one atomic choice whose
//! weight is its size.

use core::fmt::Debug;
use core::ops::{Add, Sub};
use rand::distributions::uniform::SampleUniform;

/// Scalar that can be summed in a sum tree and sampled uniformly below a total.
///
/// Only the wide types implement it: narrow numbers report their weight
/// widened (`u8`..`u32` as `u64`, `i32` as `i64`, `f32` as `f64`), so
/// partial sums of narrow values cannot overflow. Sums of `u64`/`i64`/
/// `usize` weights must themselves fit the type.
pub trait Weight:
    Copy + PartialOrd + Default + Debug + Add<Output = Self> + Sub<Output = Self> + SampleUniform
{
}

impl Weight for u64 {}
impl Weight for usize {}
impl Weight for i64 {}
impl Weight for f64 {}

macro_rules! impl_weighted {
    ($($t:ty => $wide:ty),*) => {
        $(
            impl Weighted for $t {
                type Weight = $wide;
                #[inline]
                fn weight(&self) -> $wide {
                    <$wide>::from(*self)
                }
            }

            impl SelfCheck for $t {}
        )*
    };
}

impl_weighted!(
    u8 => u64,
    u16 => u64,
    u32 => u64,
    u64 => u64,
    usize => usize,
    i32 => i64,
    i64 => i64,
    f32 => f64,
    f64 => f64
);

/// A value's own weight.
pub trait Weighted {
    type Weight: Weight;
    fn weight(&self) -> Self::Weight;
}

/// Strategy for extracting a weight from a stored value.
pub trait WeightPolicy<V: ?Sized> {
    type Weight: Weight;
    fn weight(value: &V) -> Self::Weight;
}

/// Weight is whatever the value reports through [`Weighted`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ByValue;

impl<V: Weighted + ?Sized> WeightPolicy<V> for ByValue {
    type Weight = V::Weight;
    #[inline]
    fn weight(value: &V) -> V::Weight {
        value.weight()
    }
}

/// Every value weighs 1, turning weighted sampling into uniform sampling.
#[derive(Copy, Clone, Debug, Default)]
pub struct Uniform;

impl<V: ?Sized> WeightPolicy<V> for Uniform {
    type Weight = usize;
    #[inline]
    fn weight(_: &V) -> usize {
        1
    }
}

/// Debug self-test hook. Containers override it to verify their
/// structural invariants and recurse into stored values; plain values are
/// always legal.
pub trait SelfCheck {
    fn is_legal(&self) -> bool {
        true
    }
}

impl SelfCheck for bool {}
impl SelfCheck for char {}
impl SelfCheck for () {}
impl SelfCheck for String {}
impl SelfCheck for &str {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_weigh_themselves() {
        assert_eq!(7u32.weight(), 7);
        assert_eq!((-3i64).weight(), -3);
        assert_eq!(2.5f64.weight(), 2.5);
    }

    #[test]
    fn narrow_numbers_weigh_wide() {
        let w: u64 = 200u8.weight();
        assert_eq!(w + 100u8.weight(), 300);
        let n: i64 = i32::MIN.weight();
        assert_eq!(n + i32::MIN.weight(), 2 * i64::from(i32::MIN));
        let f: f64 = 0.5f32.weight();
        assert_eq!(f, 0.5);
    }

    #[test]
    fn policies_read_weights() {
        assert_eq!(<ByValue as WeightPolicy<u64>>::weight(&42), 42);
        assert_eq!(<Uniform as WeightPolicy<String>>::weight(&"x".to_string()), 1);
        assert_eq!(<Uniform as WeightPolicy<f64>>::weight(&100.0), 1);
    }
}
