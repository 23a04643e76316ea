//! Compressor configuration.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// The default compressed size a channel aims for.
pub const DEFAULT_TARGET_OUTPUT_SIZE: u64 = 100_000;

/// The default assumed compression ratio for the ratio compressor.
pub const DEFAULT_APPROX_COMPR_RATIO: f64 = 0.6;

/// The kind of compression strategy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressorKind {
    /// Exact size checks against a flushed shadow stream.
    #[default]
    Shadow,
    /// Input size estimates under an assumed ratio.
    Ratio,
    /// Level 0 zlib.
    #[serde(alias = "none")]
    Non,
    /// Buffered input, compressed near the target.
    Blind,
}

impl fmt::Display for CompressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Shadow => "shadow",
            Self::Ratio => "ratio",
            Self::Non => "non",
            Self::Blind => "blind",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CompressorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shadow" => Ok(Self::Shadow),
            "ratio" => Ok(Self::Ratio),
            "non" | "none" => Ok(Self::Non),
            "blind" => Ok(Self::Blind),
            other => Err(ConfigError::UnknownCompressorKind(other.to_string())),
        }
    }
}

/// Configuration for the compressor itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    /// The kind of compressor to use.
    pub kind: CompressorKind,
    /// The target size that the compressed data should reach. The shadow
    /// compressor guarantees the compressed data stays below it. The ratio
    /// compressor might go over.
    pub target_output_size: u64,
    /// The compression ratio to assume (ratio compressor only). Should be
    /// slightly smaller than the observed average to avoid small leftover frames.
    pub approx_compr_ratio: f64,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            kind: CompressorKind::default(),
            target_output_size: DEFAULT_TARGET_OUTPUT_SIZE,
            approx_compr_ratio: DEFAULT_APPROX_COMPR_RATIO,
        }
    }
}

impl CompressorConfig {
    /// Checks the target and ratio.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_output_size == 0 {
            return Err(ConfigError::ZeroTargetOutputSize)
        }
        if self.approx_compr_ratio.is_nan() || self.approx_compr_ratio <= 0.0 {
            return Err(ConfigError::InvalidComprRatio(self.approx_compr_ratio))
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Shadow".parse::<CompressorKind>().unwrap(), CompressorKind::Shadow);
        assert_eq!("none".parse::<CompressorKind>().unwrap(), CompressorKind::Non);
        assert_eq!(
            "brotli".parse::<CompressorKind>().unwrap_err(),
            ConfigError::UnknownCompressorKind("brotli".to_string())
        );
    }

    #[test]
    fn test_validate() {
        assert!(CompressorConfig::default().validate().is_ok());
        let zero = CompressorConfig { target_output_size: 0, ..Default::default() };
        assert_eq!(zero.validate().unwrap_err(), ConfigError::ZeroTargetOutputSize);
        let ratio = CompressorConfig { approx_compr_ratio: 0.0, ..Default::default() };
        assert_eq!(ratio.validate().unwrap_err(), ConfigError::InvalidComprRatio(0.0));
    }
}
