//! Batching
//!
//! Splits records into contiguous chunks so that every bulk statement carries
//! a bounded payload.

use anyhow::{anyhow, Result};

pub const DEFAULT_BATCH_SIZE: usize = 20_000;

pub struct BatchConfig {
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Split `records` into order-preserving batches of at most `batch_size`.
/// Only the last batch may be shorter; an empty input yields no batches.
pub fn create_batches<T>(records: &[T], batch_size: usize) -> Result<Vec<&[T]>> {
    if batch_size == 0 {
        return Err(anyhow!("Batch size must be greater than zero"));
    }
    Ok(records.chunks(batch_size).collect())
}
