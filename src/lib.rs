//! # Smart Cuckoo Filter
//!
//! A Cuckoo Filter answers "have I (probably) seen this before?" with a small, fixed-size table of
//! fingerprints. False positives happen at a rate set by the tag width; false negatives never happen
//! for items the filter accepted.
//!
//! This variant uses single-slot buckets and replaces the usual random eviction walk with a
//! deterministic one: each bucket records the other place its tag could go, so insertion follows that
//! chain to an empty bucket and detects loops instead of giving up after a fixed number of kicks.
//! Every insertion terminates after visiting each bucket at most once.
//!
//! ```
//! use smart_cuckoo_filter::{CuckooFilter, Error};
//!
//! let mut filter = CuckooFilter::<u64>::new(1000)?;
//! filter.add(&42)?;
//! assert!(filter.contains(&42));
//! # Ok::<(), Error>(())
//! ```
//!
//! Items are hashed by a [`HashFamily`]. Integer keys default to [`TwoIndependentMultiplyShift`];
//! anything implementing `Hash` can use [`Murmur3`].

mod error;
mod filter;
mod hash;
mod murmur3;
mod table;

pub use error::Error;
pub use filter::{CuckooFilter, FilterConfig, DEFAULT_TAG_BITS, MAX_TAG_BITS};
pub use hash::{HashFamily, Murmur3, TwoIndependentMultiplyShift};
pub use murmur3::Murmur3Hasher;
