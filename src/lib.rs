//! Spanout
//!
//! A library for building op-stack batcher channels. Batches are packed into
//! compressed channels, and channels are cut into frames ready for L1
//! submission.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]
#![forbid(unsafe_code)]

/// Telemetry
pub mod telemetry;

/// Configuration
pub mod config;

/// Common Errors
pub mod errors;

/// Batch types and their wire formats
pub mod batch;

/// L2 block to batch conversion
pub mod block;

/// Compressors
pub mod compression;

/// Frames
pub mod frame;

/// Channel builders
pub mod channel_out;

/// Channel Manager
pub mod channels;

/// Channel reading
pub mod reader;

/// Test fixtures
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Re-export Spanout Types
pub mod prelude {
    pub use crate::batch::*;
    pub use crate::channel_out::*;
    pub use crate::channels::*;
    pub use crate::compression::*;
    pub use crate::config::*;
    pub use crate::errors::*;
    pub use crate::frame::*;
    pub use crate::telemetry::*;
}
