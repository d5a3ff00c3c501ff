//! # Cuckoo Filter
//!
//! Each item is reduced to a bucket index and a short tag. The tag may live in one of two buckets: the
//! index itself, or the index XORed with a scrambled copy of the tag. Since the XOR is its own
//! inverse, either bucket can compute the other from the tag alone, which is all the bucket table
//! needs to move tags around on insertion.
//!
//! Buckets hold a single tag. When both candidates of a new item sit on saturated relocation chains,
//! the item is parked in a one-slot victim cache and the filter stops accepting inserts.

use core::fmt;
use core::marker::PhantomData;

use log::{debug, warn};

use crate::error::Error;
use crate::hash::{HashFamily, TwoIndependentMultiplyShift};
use crate::table::{BucketIndex, BucketTable, Tag};

/// Tag width used when none is configured
pub const DEFAULT_TAG_BITS: u32 = 12;
/// Widest supported tag
pub const MAX_TAG_BITS: u32 = 32;
/// Above this initial load the bucket count is doubled once more
const MAX_INITIAL_LOAD: f64 = 0.96;
/// Odd multiplier scrambling the tag before it is XORed into the index (from MurmurHash2)
const ALT_INDEX_MULTIPLIER: u32 = 0x5bd1_e995;

/// Sizing parameters for a [`CuckooFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    /// Number of items the filter is sized for
    pub capacity: usize,
    /// Width of each stored tag in bits; the false positive rate shrinks by half per extra bit
    pub tag_bits: u32,
}

impl FilterConfig {
    pub fn new(capacity: usize) -> Self {
        FilterConfig {
            capacity,
            tag_bits: DEFAULT_TAG_BITS,
        }
    }

    pub fn with_tag_bits(mut self, tag_bits: u32) -> Self {
        self.tag_bits = tag_bits;
        self
    }

    /// Number of buckets a filter built from this config allocates.
    ///
    /// The capacity is rounded up to a power of two so that indices can be masked instead of taken
    /// modulo. If that leaves the table more than 96% full it is doubled again, since relocation
    /// chains get long well before a table is full.
    pub fn num_buckets(&self) -> Result<usize, Error> {
        if !(1..=MAX_TAG_BITS).contains(&self.tag_bits) {
            return Err(Error::InvalidTagWidth {
                bits: self.tag_bits,
            });
        }
        if self.capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        let limit = BucketTable::max_buckets(self.tag_bits);
        let too_many = Error::CapacityExceedsBucketLimit {
            buckets: self.capacity,
            limit,
        };
        let mut num_buckets = self
            .capacity
            .checked_next_power_of_two()
            .ok_or(too_many)?;
        if self.capacity as f64 / num_buckets as f64 > MAX_INITIAL_LOAD {
            num_buckets = num_buckets.checked_mul(2).ok_or(too_many)?;
        }
        if num_buckets > limit {
            return Err(Error::CapacityExceedsBucketLimit {
                buckets: num_buckets,
                limit,
            });
        }
        Ok(num_buckets)
    }
}

/// Holds the one item we couldn't place in the table.
///
/// An item being here means the filter is full: not every bucket is necessarily used, but the
/// relocation chains reachable from this item's candidates are.
#[derive(Debug, Clone, Copy)]
struct Victim {
    index: BucketIndex,
    tag: Tag,
    used: bool,
}

impl Victim {
    fn new() -> Victim {
        Victim {
            index: 0,
            tag: 0,
            used: false,
        }
    }

    fn matches(&self, i1: BucketIndex, i2: BucketIndex, tag: Tag) -> bool {
        self.used && self.tag == tag && (self.index == i1 || self.index == i2)
    }
}

/// A single-slot cuckoo filter with cycle-safe relocation
///
/// ### Notes
///
/// - There are no false negatives for items that were accepted, whether they landed in the table
///   or in the victim cache.
/// - `len` counts only items placed in the table. The item that fills the victim cache is reported
///   as added but is not counted, so `len` can be one less than the number of accepted items.
/// - Insertion needs `&mut self`; wrap the filter in a lock to share it between threads.
pub struct CuckooFilter<T: ?Sized, H = TwoIndependentMultiplyShift> {
    table: BucketTable,
    victim: Victim,
    num_items: usize,
    hasher: H,
    _item: PhantomData<fn(&T)>,
}

impl<T: ?Sized> CuckooFilter<T, TwoIndependentMultiplyShift>
where
    TwoIndependentMultiplyShift: HashFamily<T>,
{
    /// Filter for `capacity` items with 12-bit tags and a freshly seeded multiply-shift hash
    pub fn new(capacity: usize) -> Result<Self, Error> {
        Self::with_config(FilterConfig::new(capacity))
    }

    pub fn with_config(config: FilterConfig) -> Result<Self, Error> {
        Self::with_hasher(config, TwoIndependentMultiplyShift::new())
    }
}

impl<T: ?Sized, H: HashFamily<T>> CuckooFilter<T, H> {
    /// Build a filter from a config and a hash family
    ///
    /// Fails if the tag width is unsupported or the capacity needs more buckets than the relocation
    /// pointer can address at that tag width.
    pub fn with_hasher(config: FilterConfig, hasher: H) -> Result<Self, Error> {
        let num_buckets = config.num_buckets()?;
        let table = BucketTable::new(num_buckets, config.tag_bits);
        debug!(
            "cuckoo filter for {} items: {} buckets, {}-bit tags, {} bytes",
            config.capacity,
            num_buckets,
            config.tag_bits,
            table.size_in_bytes()
        );
        Ok(CuckooFilter {
            table,
            victim: Victim::new(),
            num_items: 0,
            hasher,
            _item: PhantomData,
        })
    }

    /// Bucket index from the upper half of the hash, tag from the lower bits.
    ///
    /// A tag of 0 becomes 1, so tags are never zero.
    fn index_and_tag(&self, item: &T) -> (BucketIndex, Tag) {
        let hash = self.hasher.hash(item);
        let index = ((hash >> 32) as BucketIndex) & (self.table.num_buckets() - 1);
        let mut tag = (hash & ((1u64 << self.table.tag_bits()) - 1)) as Tag;
        tag += (tag == 0) as Tag;
        (index, tag)
    }

    /// The other bucket a tag may live in. Applying it twice gives back `index`.
    fn alt_index(&self, index: BucketIndex, tag: Tag) -> BucketIndex {
        let scrambled = tag.wrapping_mul(ALT_INDEX_MULTIPLIER) as BucketIndex;
        index ^ (scrambled & (self.table.num_buckets() - 1))
    }

    /// Add item to filter.
    ///
    /// Returns `Err(Error::NotEnoughSpace)` once the victim cache is taken. The insert that fills the
    /// victim cache itself still returns `Ok`.
    pub fn add(&mut self, item: &T) -> Result<(), Error> {
        if self.victim.used {
            return Err(Error::NotEnoughSpace);
        }

        let (index, tag) = self.index_and_tag(item);
        let alt = self.alt_index(index, tag);

        if self.table.insert(index, alt, tag) {
            self.num_items += 1;
            return Ok(());
        }

        warn!(
            "cuckoo filter full after {} items, holding last item in victim cache",
            self.num_items
        );
        self.victim = Victim {
            index,
            tag,
            used: true,
        };
        Ok(())
    }

    /// Check if item is (probably) in the filter
    pub fn contains(&self, item: &T) -> bool {
        let (i1, tag) = self.index_and_tag(item);
        let i2 = self.alt_index(i1, tag);
        debug_assert_eq!(i1, self.alt_index(i2, tag));
        self.victim.matches(i1, i2, tag) || self.table.lookup(i1, i2, tag)
    }
}

impl<T: ?Sized, H> CuckooFilter<T, H> {
    /// Number of items stored in the table (the victim cache is not counted)
    pub fn len(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0 && !self.victim.used
    }

    /// Is the filter refusing new items?
    pub fn is_full(&self) -> bool {
        self.victim.used
    }

    pub fn num_buckets(&self) -> usize {
        self.table.num_buckets()
    }

    pub fn tag_bits(&self) -> u32 {
        self.table.tag_bits()
    }

    /// Bytes used by the bucket table
    pub fn size_in_bytes(&self) -> usize {
        self.table.size_in_bytes()
    }

    /// Stored items per bucket
    pub fn load_factor(&self) -> f64 {
        self.num_items as f64 / self.table.num_buckets() as f64
    }

    /// Table bits spent per stored item, `None` while nothing is stored
    pub fn bits_per_item(&self) -> Option<f64> {
        (self.num_items > 0).then(|| 8.0 * self.size_in_bytes() as f64 / self.num_items as f64)
    }

    /// Multi-line status report
    pub fn info(&self) -> String {
        self.to_string()
    }
}

impl<T: ?Sized, H> fmt::Display for CuckooFilter<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CuckooFilter Status:")?;
        writeln!(f, "\t\t{}", self.table)?;
        writeln!(f, "\t\tKeys stored: {}", self.len())?;
        writeln!(f, "\t\tLoad factor: {}", self.load_factor())?;
        writeln!(f, "\t\tHashtable size: {} KB", self.size_in_bytes() >> 10)
    }
}

impl<T: ?Sized, H: fmt::Debug> fmt::Debug for CuckooFilter<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuckooFilter")
            .field("num_buckets", &self.table.num_buckets())
            .field("tag_bits", &self.table.tag_bits())
            .field("num_items", &self.num_items)
            .field("victim", &self.victim)
            .field("hasher", &self.hasher)
            .finish()
    }
}

/* -------------------- Unit Tests -------------------- */
