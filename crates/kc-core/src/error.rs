//! Errors produced by cluster allocation.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while allocating or releasing a cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// Every cluster in the inventory currently has an active lease.
    #[error("all clusters are in use")]
    Exhausted,

    /// The access configuration could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The requested lease duration is outside the allowed range.
    #[error("Invalid lease duration: {requested}s (allowed 1..={max}s)")]
    InvalidDuration {
        /// Requested duration in seconds.
        requested: u64,
        /// Maximum allowed duration in seconds.
        max: u64,
    },

    /// No active lease exists for the given token.
    #[error("Lease not found: {0}")]
    LeaseNotFound(Uuid),
}

impl AllocationError {
    /// Returns true if the error means the pool has no free capacity.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, AllocationError::Exhausted)
    }
}

/// Result type for allocation operations.
pub type AllocationResult<T> = Result<T, AllocationError>;
