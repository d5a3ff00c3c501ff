//! # Bucket table
//!
//! A fixed array of single-slot buckets. Every bucket packs three fields into one `u64`:
//!
//! | bits            | field                                                   |
//! |-----------------|---------------------------------------------------------|
//! | `0`             | visited mark, only set while a relocation walk is running |
//! | `1 ..= w`       | tag (fingerprint), `w` bits wide                        |
//! | `w + 1 ..= 63`  | father: the other candidate bucket of the stored tag    |
//!
//! A father equal to the all-ones sentinel means the bucket is empty. Because every occupied bucket
//! remembers where else its tag may live, the table can move a tag without knowing anything about
//! the item or the hash that produced it.
//!
//! Following fathers from any bucket walks a graph where each node has at most one outgoing edge, so
//! the walk either reaches an empty bucket (a root) or loops back onto itself. Insertion follows that
//! walk and gives up as soon as a bucket is seen twice, which bounds every insertion by the number of
//! buckets without any eviction budget.

use core::fmt;
use core::mem;

pub(crate) type BucketIndex = usize;
pub(crate) type Tag = u32;

/// One packed bucket
type Bucket = u64;

const BUCKET_BITS: u32 = Bucket::BITS;
const VISITED: Bucket = 1;
const TAG_SHIFT: u32 = 1;

#[derive(Debug, Clone)]
pub(crate) struct BucketTable {
    buckets: Vec<Bucket>,
    tag_bits: u32,
    /// Father value reserved for empty buckets
    sentinel: Bucket,
    /// Scratch space for the relocation walk, always empty between calls
    path: Vec<BucketIndex>,
}

impl BucketTable {
    /// Width of the father field for a given tag width
    const fn father_bits(tag_bits: u32) -> u32 {
        BUCKET_BITS - 1 - tag_bits
    }

    /// Largest power-of-two bucket count whose indices all stay below the sentinel
    pub(crate) fn max_buckets(tag_bits: u32) -> usize {
        let limit: u64 = 1 << (Self::father_bits(tag_bits) - 1);
        usize::try_from(limit).unwrap_or(1 << (usize::BITS - 1))
    }

    /// Allocate `num_buckets` empty buckets. The caller has already checked the count against
    /// [`BucketTable::max_buckets`].
    pub(crate) fn new(num_buckets: usize, tag_bits: u32) -> BucketTable {
        debug_assert!(num_buckets <= Self::max_buckets(tag_bits));
        let sentinel = (1 << Self::father_bits(tag_bits)) - 1;
        BucketTable {
            buckets: vec![sentinel << (TAG_SHIFT + tag_bits); num_buckets],
            tag_bits,
            sentinel,
            path: Vec::new(),
        }
    }

    pub(crate) fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    pub(crate) fn size_in_bytes(&self) -> usize {
        self.buckets.len() * mem::size_of::<Bucket>()
    }

    #[inline]
    fn tag_mask(&self) -> Bucket {
        (1 << self.tag_bits) - 1
    }

    #[inline]
    fn father_shift(&self) -> u32 {
        TAG_SHIFT + self.tag_bits
    }

    #[inline]
    fn pack(&self, tag: Tag, father: BucketIndex) -> Bucket {
        ((father as Bucket) << self.father_shift()) | ((tag as Bucket & self.tag_mask()) << TAG_SHIFT)
    }

    #[inline]
    fn tag_at(&self, index: BucketIndex) -> Tag {
        ((self.buckets[index] >> TAG_SHIFT) & self.tag_mask()) as Tag
    }

    #[inline]
    fn father_at(&self, index: BucketIndex) -> Bucket {
        self.buckets[index] >> self.father_shift()
    }

    #[inline]
    fn is_occupied(&self, index: BucketIndex) -> bool {
        self.father_at(index) != self.sentinel
    }

    #[inline]
    fn is_visited(&self, index: BucketIndex) -> bool {
        self.buckets[index] & VISITED != 0
    }

    /// Place `tag`, whose two candidate buckets are `i1` and `i2`.
    ///
    /// False means neither walk reached an empty bucket. Other parts of the table may still be free.
    pub(crate) fn insert(&mut self, i1: BucketIndex, i2: BucketIndex, tag: Tag) -> bool {
        self.relocate(i1, i2, tag) || self.relocate(i2, i1, tag)
    }

    /// Store `tag` at `cur` (its other candidate being `alt`), first pushing the chain of occupants
    /// starting at `cur` one step along their fathers.
    ///
    /// The walk marks every occupied bucket it passes. Reaching a marked bucket means the chain closes
    /// on itself, and the table is left exactly as it was. Marks are cleared on both outcomes.
    fn relocate(&mut self, cur: BucketIndex, alt: BucketIndex, tag: Tag) -> bool {
        let mut path = mem::take(&mut self.path);
        let mut node = cur;
        let found_root = loop {
            if self.is_visited(node) {
                break false;
            }
            if !self.is_occupied(node) {
                break true;
            }
            self.buckets[node] |= VISITED;
            path.push(node);
            node = self.father_at(node) as BucketIndex;
        };

        if found_root {
            // Deepest occupant moves first, into the empty bucket at the end of the chain
            let mut target = node;
            for &source in path.iter().rev() {
                self.buckets[target] = self.pack(self.tag_at(source), source);
                target = source;
            }
            self.buckets[cur] = self.pack(tag, alt);
        } else {
            log::trace!(
                "relocation from bucket {} closed a cycle after {} buckets",
                cur,
                path.len()
            );
            for &index in &path {
                self.buckets[index] &= !VISITED;
            }
        }

        path.clear();
        self.path = path;
        found_root
    }

    /// Tag equality only: any item deriving the same tag at either bucket matches.
    pub(crate) fn lookup(&self, i1: BucketIndex, i2: BucketIndex, tag: Tag) -> bool {
        self.holds(i1, tag) || self.holds(i2, tag)
    }

    #[inline]
    fn holds(&self, index: BucketIndex, tag: Tag) -> bool {
        self.is_occupied(index) && self.tag_at(index) == tag
    }
}

impl fmt::Display for BucketTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Total # of rows: {}", self.num_buckets())
    }
}

#[cfg(test)]
impl BucketTable {
    pub(crate) fn raw(&self) -> &[u64] {
        &self.buckets
    }

    pub(crate) fn no_visited_marks(&self) -> bool {
        self.buckets.iter().all(|b| b & VISITED == 0)
    }

    fn occupant(&self, index: BucketIndex) -> Option<(Tag, BucketIndex)> {
        self.is_occupied(index)
            .then(|| (self.tag_at(index), self.father_at(index) as BucketIndex))
    }
}

/* -------------------- Unit Tests -------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    const TAG_BITS: u32 = 12;

    fn alt(index: BucketIndex, tag: Tag, num_buckets: usize) -> BucketIndex {
        index ^ ((tag.wrapping_mul(0x5bd1_e995) as usize) & (num_buckets - 1))
    }

    #[test]
    fn new_table_is_empty() {
        let table = BucketTable::new(64, TAG_BITS);
        assert_eq!(table.num_buckets(), 64);
        assert_eq!(table.size_in_bytes(), 64 * 8);
        for i in 0..64 {
            assert_eq!(table.occupant(i), None);
            assert!(!table.lookup(i, i, 0));
        }
        assert!(table.no_visited_marks());
    }

    #[test]
    fn sentinel_stays_above_every_index() {
        for bits in 1..=32 {
            let max = BucketTable::max_buckets(bits) as u64;
            let sentinel = (1u64 << BucketTable::father_bits(bits)) - 1;
            assert!(max.is_power_of_two());
            assert!(max - 1 < sentinel, "bits={}", bits);
        }
        assert_eq!(BucketTable::max_buckets(12), 1 << 50);
    }

    #[test]
    fn insert_into_empty_bucket() {
        let mut table = BucketTable::new(16, TAG_BITS);
        assert!(table.insert(3, 9, 0xabc));
        assert_eq!(table.occupant(3), Some((0xabc, 9)));
        assert!(table.lookup(3, 9, 0xabc));
        assert!(table.lookup(9, 3, 0xabc));
        assert!(!table.lookup(3, 9, 0xabd));
    }

    #[test]
    fn occupant_moves_to_its_father() {
        let mut table = BucketTable::new(8, TAG_BITS);
        assert!(table.insert(0, 1, 7));
        assert!(table.insert(0, 2, 9));
        assert_eq!(table.occupant(0), Some((9, 2)));
        assert_eq!(table.occupant(1), Some((7, 0)));
        assert!(table.no_visited_marks());
    }

    #[test]
    fn long_chain_shifts_every_occupant() {
        let mut table = BucketTable::new(8, TAG_BITS);
        for k in 0..7 {
            assert!(table.insert(k, k + 1, 100 + k as Tag));
        }
        assert!(table.insert(0, 5, 42));
        assert_eq!(table.occupant(0), Some((42, 5)));
        for k in 0..7 {
            assert_eq!(table.occupant(k + 1), Some((100 + k as Tag, k)));
        }
        assert!(table.no_visited_marks());
    }

    #[test]
    fn falls_back_to_second_candidate() {
        let mut table = BucketTable::new(8, TAG_BITS);
        // 0 and 1 point at each other
        assert!(table.insert(0, 1, 1));
        assert!(table.insert(1, 0, 2));
        assert!(table.insert(0, 4, 3));
        assert_eq!(table.occupant(4), Some((3, 0)));
        assert_eq!(table.occupant(0), Some((1, 1)));
        assert!(table.no_visited_marks());
    }

    #[test]
    fn closed_cycle_leaves_table_untouched() {
        let mut table = BucketTable::new(8, TAG_BITS);
        assert!(table.insert(0, 1, 1));
        assert!(table.insert(1, 0, 2));
        let before = table.raw().to_vec();
        // Buckets 2..8 are still free, but neither chain reaches them
        assert!(!table.insert(0, 1, 3));
        assert_eq!(table.raw(), &before[..]);
        assert!(table.no_visited_marks());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut table = BucketTable::new(4, TAG_BITS);
        assert!(table.insert(2, 2, 5));
        let before = table.raw().to_vec();
        assert!(!table.insert(2, 2, 6));
        assert_eq!(table.raw(), &before[..]);
        assert!(table.no_visited_marks());
    }

    #[test]
    fn table_wide_cycle_terminates() {
        const N: usize = 1 << 16;
        let mut table = BucketTable::new(N, TAG_BITS);
        for k in 0..N {
            assert!(table.insert(k, (k + 1) % N, 1 + (k as Tag % 4000)));
        }
        let before = table.raw().to_vec();
        assert!(!table.insert(5, 9, 77));
        assert_eq!(table.raw(), &before[..]);
        assert!(table.no_visited_marks());
    }

    #[test]
    fn fathers_track_the_other_candidate() {
        const N: usize = 256;
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut table = BucketTable::new(N, TAG_BITS);
        let mut placed = Vec::new();
        for _ in 0..N {
            let i1 = rng.gen_range(0..N);
            let tag = rng.gen_range(1..(1 << TAG_BITS));
            let i2 = alt(i1, tag, N);
            if table.insert(i1, i2, tag) {
                placed.push((i1, i2, tag));
            }
            assert!(table.no_visited_marks());
        }
        assert!(!placed.is_empty());
        for index in 0..N {
            if let Some((tag, father)) = table.occupant(index) {
                assert_eq!(father, alt(index, tag, N));
            }
        }
        for (i1, i2, tag) in placed {
            assert!(table.lookup(i1, i2, tag));
        }
    }
}
