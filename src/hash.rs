//! Hash families the filter can be built with
//!
//! A filter only needs one thing from a hash family: the same item must map to the same 64-bit value
//! for as long as the filter lives. Any seeds are drawn once, when the family is constructed.

use core::hash::{Hash, Hasher};

use rand::Rng;

use crate::murmur3::Murmur3Hasher;

/// Maps an item to a 64-bit hash value
pub trait HashFamily<T: ?Sized> {
    fn hash(&self, item: &T) -> u64;
}

/// Multiply-shift hashing over 128-bit arithmetic: `(add + multiply * key) >> 64`
///
/// This is the default family for integer keys. Both constants are random, so two filters built with
/// fresh families disagree on every hash, but a single family is fully deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoIndependentMultiplyShift {
    multiply: u128,
    add: u128,
}

impl TwoIndependentMultiplyShift {
    /// Seed from the thread-local RNG
    pub fn new() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    /// Seed from a caller-provided RNG, which makes the whole filter reproducible
    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        TwoIndependentMultiplyShift {
            multiply: rng.gen(),
            add: rng.gen(),
        }
    }

    #[inline]
    fn hash_u64(&self, key: u64) -> u64 {
        (self.add.wrapping_add(self.multiply.wrapping_mul(key as u128)) >> 64) as u64
    }
}

impl Default for TwoIndependentMultiplyShift {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_multiply_shift {
    ($($t:ty),*) => {
        $(
            impl HashFamily<$t> for TwoIndependentMultiplyShift {
                #[inline]
                fn hash(&self, item: &$t) -> u64 {
                    self.hash_u64(*item as u64)
                }
            }
        )*
    };
}

impl_multiply_shift!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Seeded Murmur3 for anything implementing `Hash` (strings, byte slices, tuples, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Murmur3 {
    seed: u32,
}

impl Murmur3 {
    pub fn new(seed: u32) -> Self {
        Murmur3 { seed }
    }
}

impl<T: Hash + ?Sized> HashFamily<T> for Murmur3 {
    fn hash(&self, item: &T) -> u64 {
        let mut hasher = Murmur3Hasher::with_seed(self.seed);
        item.hash(&mut hasher);
        hasher.finish()
    }
}

/* -------------------- Unit Tests -------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn multiply_shift_is_deterministic() {
        let family = TwoIndependentMultiplyShift::with_rng(&mut ChaCha8Rng::seed_from_u64(7));
        let again = TwoIndependentMultiplyShift::with_rng(&mut ChaCha8Rng::seed_from_u64(7));
        for key in 0..1000u64 {
            assert_eq!(family.hash(&key), family.hash(&key));
            assert_eq!(family.hash(&key), again.hash(&key));
        }
    }

    #[test]
    fn multiply_shift_spreads_sequential_keys() {
        let family = TwoIndependentMultiplyShift::with_rng(&mut ChaCha8Rng::seed_from_u64(1));
        let high: HashSet<u32> = (0..10_000u64).map(|k| (family.hash(&k) >> 32) as u32).collect();
        assert!(high.len() > 9_900);
    }

    #[test]
    fn integer_widths_agree_on_small_values() {
        let family = TwoIndependentMultiplyShift::with_rng(&mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(family.hash(&5u8), family.hash(&5u64));
        assert_eq!(family.hash(&5u32), family.hash(&5usize));
    }

    #[test]
    fn murmur3_hashes_unsized_items() {
        let family = Murmur3::new(0);
        let a = family.hash("cat");
        let b = family.hash("dog");
        assert_ne!(a, b);
        assert_eq!(a, family.hash(&String::from("cat")[..]));
        assert_ne!(family.hash(&[1u8, 2, 3][..]), family.hash(&[1u8, 2, 4][..]));
    }

    #[test]
    fn murmur3_seed_matters() {
        assert_ne!(Murmur3::new(0).hash("cat"), Murmur3::new(1).hash("cat"));
    }
}
