//! Compression strategies for channel data.
//!
//! Every strategy wraps zlib streams and differs only in how it decides that
//! the target output size has been reached.

mod traits;
pub use traits::{Compressor, CompressorResult, CompressorWriter};

mod zlib;
pub use zlib::ZlibCompressor;

mod non;
pub use non::NonCompressor;

mod ratio;
pub use ratio::RatioCompressor;

mod shadow;
pub use shadow::{ShadowCompressor, CLOSE_OVERHEAD_ZLIB, SAFE_COMPRESSION_OVERHEAD};

mod blind;
pub use blind::BlindCompressor;

mod config;
pub use config::{
    CompressorConfig, CompressorKind, DEFAULT_APPROX_COMPR_RATIO, DEFAULT_TARGET_OUTPUT_SIZE,
};

mod variant;
pub use variant::VariantCompressor;
