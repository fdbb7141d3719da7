//! Error type for fallible table operations.
//!
//! Missing keys are not errors: `get`, `get_mut` and `remove` return
//! `None` for them, which stays distinct from a stored `None`-like value.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The bucket array or a key copy could not be allocated.
    #[error("allocation failed: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// Growing the bucket array past this many buckets overflows `usize`.
    #[error("bucket count overflow while growing from {0} buckets")]
    CapacityOverflow(usize),
}
