//! Error type shared by filter construction and insertion

/// Possible errors for the Cuckoo Filter
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The victim slot already holds an item, so the filter takes no more inserts
    #[error("not enough space to store this item")]
    NotEnoughSpace,
    /// Tags must be between 1 and 16 bits wide
    #[error("tag width of {bits} bits is not supported (expected 1..=16)")]
    InvalidTagWidth { bits: u32 },
    /// A filter must be sized for at least one item
    #[error("filter capacity must be greater than zero")]
    ZeroCapacity,
    /// Requested capacity needs more buckets than the relocation pointer can address
    #[error("{buckets} buckets exceed the limit of {limit} for this tag width")]
    CapacityExceedsBucketLimit { buckets: usize, limit: usize },
}

/* -------------------- Unit Tests -------------------- */
