//! Fixed-size batching of loaded layers.

use bandmerge_shared::{BandMergeError, Result};

/// Split `items` into consecutive groups of `size`; the last group may be shorter.
pub fn split_into_batches<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(BandMergeError::validation("batch size must be at least 1"));
    }
    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}
