//! A variant over the compression strategies.

use crate::compression::{
    BlindCompressor, Compressor, CompressorConfig, CompressorKind, CompressorResult,
    CompressorWriter, NonCompressor, RatioCompressor, ShadowCompressor,
};

/// A [Compressor] chosen by [CompressorKind] at configuration time.
#[derive(Debug)]
pub enum VariantCompressor {
    /// The shadow compressor.
    Shadow(ShadowCompressor),
    /// The ratio compressor.
    Ratio(RatioCompressor),
    /// The non compressor.
    Non(NonCompressor),
    /// The blind compressor.
    Blind(BlindCompressor),
}

macro_rules! dispatch {
    ($self:ident, $c:ident => $e:expr) => {
        match $self {
            Self::Shadow($c) => $e,
            Self::Ratio($c) => $e,
            Self::Non($c) => $e,
            Self::Blind($c) => $e,
        }
    };
}

impl VariantCompressor {
    /// Returns the [CompressorKind] of the variant.
    pub fn kind(&self) -> CompressorKind {
        match self {
            Self::Shadow(_) => CompressorKind::Shadow,
            Self::Ratio(_) => CompressorKind::Ratio,
            Self::Non(_) => CompressorKind::Non,
            Self::Blind(_) => CompressorKind::Blind,
        }
    }
}

impl From<&CompressorConfig> for VariantCompressor {
    fn from(config: &CompressorConfig) -> Self {
        let target = config.target_output_size;
        match config.kind {
            CompressorKind::Shadow => Self::Shadow(ShadowCompressor::new(target)),
            CompressorKind::Ratio => {
                Self::Ratio(RatioCompressor::new(target, config.approx_compr_ratio))
            }
            CompressorKind::Non => Self::Non(NonCompressor::new(target)),
            CompressorKind::Blind => Self::Blind(BlindCompressor::new(target)),
        }
    }
}

impl CompressorWriter for VariantCompressor {
    fn write(&mut self, data: &[u8]) -> CompressorResult<usize> {
        dispatch!(self, c => c.write(data))
    }

    fn flush(&mut self) -> CompressorResult<()> {
        dispatch!(self, c => c.flush())
    }

    fn close(&mut self) -> CompressorResult<()> {
        dispatch!(self, c => c.close())
    }

    fn reset(&mut self) {
        dispatch!(self, c => c.reset())
    }

    fn len(&self) -> usize {
        dispatch!(self, c => c.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> CompressorResult<usize> {
        dispatch!(self, c => c.read(buf))
    }
}

impl Compressor for VariantCompressor {
    fn full_err(&self) -> CompressorResult<()> {
        dispatch!(self, c => c.full_err())
    }

    fn target_output_size(&self) -> u64 {
        dispatch!(self, c => c.target_output_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        for kind in [
            CompressorKind::Shadow,
            CompressorKind::Ratio,
            CompressorKind::Non,
            CompressorKind::Blind,
        ] {
            let config = CompressorConfig { kind, target_output_size: 1_234, ..Default::default() };
            let c = VariantCompressor::from(&config);
            assert_eq!(c.kind(), kind);
            assert_eq!(c.target_output_size(), 1_234);
            assert_eq!(c.len(), 0);
        }
    }
}
