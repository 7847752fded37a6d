//! # Signal Pool Core Library
//!
//! An in-process, typed data store for scientific signal data. Records live
//! either in memory or in a single binary file, can be streamed in fixed-size
//! or overlapping windows, randomly accessed by chunk index, and are handed
//! off from one producer ("source") to any number of consumers
//! ("subscribers") without premature deletion.
//!
//! ## Crate Structure
//!
//! - **`data`**: the storage engine. `codec` packs samples, `backend` keeps a
//!   record in RAM or on disk, `reader` provides lazy chunk iterators, `kind`
//!   describes what a record means and `record` ties them together.
//! - **`pool`**: the `DataPool` registry with source/subscriber bindings, the
//!   acknowledgment barrier that releases fully consumed records, and
//!   lifecycle events.
//! - **`error`**: the `PoolError` enum shared by every operation.
//! - **`config`**: figment-based configuration (`PoolConfig`).
//! - **`tracing_setup`**: `tracing-subscriber` initialisation.
//! - **`validation`**: small argument validators.
//!
//! ## Example
//!
//! ```
//! use signal_pool::prelude::*;
//!
//! # fn main() -> Result<(), PoolError> {
//! let pool = DataPool::default();
//! let id = pool.register(
//!     KindTag::TemporalSignal,
//!     "vibration",
//!     "acquisition",
//!     false,
//!     StorageMode::Ram,
//!     KindParams::temporal(0.01, "V"),
//! )?;
//! pool.store(&id, vec![0.1f32, 0.2, 0.3], "acquisition", None)?;
//! pool.add_subscriber(&id, "fft")?;
//! let chunks: Vec<Samples> = pool
//!     .get_chunk_generator(&id, "fft", 2)?
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(chunks.len(), 2);
//! assert!(matches!(pool.get_info(&id), Err(PoolError::NotFound(_))));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod pool;
pub mod tracing_setup;
pub mod validation;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::PoolConfig;
    pub use crate::data::backend::StorageMode;
    pub use crate::data::codec::{SampleType, Samples};
    pub use crate::data::kind::{DataKind, InterpolationMode, KindParams, KindTag};
    pub use crate::data::record::{RecordInfo, Streamable};
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::barrier::RecordState;
    pub use crate::pool::events::PoolEvent;
    pub use crate::pool::DataPool;
}
