//! Custom error types for the data pool.
//!
//! This module defines the primary error type, `PoolError`, for the whole crate.
//! Using the `thiserror` crate, it gives every pool operation one consistent way
//! to report failure, from registry lookups and admission checks to codec and
//! file I/O problems.
//!
//! ## Error Hierarchy
//!
//! - **`NotFound`**: the identifier is unknown, or the record was already released.
//! - **`Locked`**: the operation needs the record to be unlocked (all reads and
//!   `get_info`).
//! - **`Unauthorized`**: wrong source on a write, a write to a record that is not
//!   locked, or a subscriber that was never added tried to read or acknowledge.
//! - **`InvalidConfiguration`**: missing kind parameters, missing folder for a
//!   file-backed record, bad chunk/overlap arguments, invalid config values.
//! - **`Format`**: bytes that do not decode to the record's sample type, or a
//!   payload whose sample type does not match the record.
//! - **`Domain`**: numeric domain violations (log interpolation with a
//!   non-positive frequency, `start > end`, unordered limit points).
//! - **`Io`** / **`Config`**: wrapped `std::io::Error` and `figment::Error`.
//!
//! Nothing is retried internally; every error surfaces synchronously to the caller.

use crate::data::codec::SampleType;
use thiserror::Error;

/// Convenience alias for results using the pool error type.
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Errors raised by the storage engine and the pool.
#[derive(Error, Debug)]
pub enum PoolError {
    /// No record with this identifier is registered.
    #[error("Data {0} not found")]
    NotFound(String),

    /// The record is locked, or a store or conversion is in progress.
    #[error("Data {0} is locked and cannot be accessed")]
    Locked(String),

    /// The caller is not the registering source, is not a bound subscriber,
    /// or wrote to an unlocked record.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad arguments or kind parameters.
    #[error("Configuration validation error: {0}")]
    InvalidConfiguration(String),

    /// A payload or file that does not decode as its declared shape.
    #[error("Format error: {0}")]
    Format(String),

    /// Samples of the wrong element type for the record.
    #[error("Sample type mismatch: expected {expected}, got {found}")]
    SampleTypeMismatch {
        /// Type of the record.
        expected: SampleType,
        /// Type that was supplied.
        found: SampleType,
    },

    /// A computation outside its domain, e.g. log interpolation over zero.
    #[error("Domain error: {0}")]
    Domain(String),

    /// Backend file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file or environment could not be extracted.
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),
}

impl From<figment::Error> for PoolError {
    fn from(value: figment::Error) -> Self {
        PoolError::Config(Box::new(value))
    }
}

impl PoolError {
    /// Whether the caller can reasonably retry after changing state
    /// (unlocking, adding a subscriber, fixing arguments).
    ///
    /// Format, I/O and configuration-file errors are permanent for the
    /// record or process that produced them.
    #[must_use]
    pub fn can_recover(&self) -> bool {
        match self {
            PoolError::NotFound(_)
            | PoolError::Locked(_)
            | PoolError::Unauthorized(_)
            | PoolError::InvalidConfiguration(_)
            | PoolError::Domain(_) => true,
            PoolError::Format(_)
            | PoolError::SampleTypeMismatch { .. }
            | PoolError::Io(_)
            | PoolError::Config(_) => false,
        }
    }

    /// True when the error is (or wraps) a format problem, including type mismatches.
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            PoolError::Format(_) | PoolError::SampleTypeMismatch { .. }
        )
    }
}
