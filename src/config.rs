use std::path::{Path, PathBuf};

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    batch::BatchType,
    channel_out::MAX_RLP_BYTES_PER_CHANNEL,
    compression::{CompressorConfig, CompressorKind},
    errors::ConfigError,
    frame::{FRAME_V0_OVERHEAD_SIZE, MAX_FRAME_LEN},
};

/// The prefix of environment variables read into the [Config].
pub const ENV_PREFIX: &str = "SPANOUT_";

/// The default maximum size of a frame, sized to fit a single L1 transaction.
pub const DEFAULT_MAX_FRAME_SIZE: u64 = 120_000;

/// A system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The rollup parameters batches are built against.
    pub rollup: RollupConfig,
    /// Channel construction parameters.
    pub channel: ChannelConfig,
}

/// Rollup parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    /// The timestamp of the L2 genesis block.
    pub genesis_l2_time: u64,
    /// The L2 chain id.
    pub l2_chain_id: u64,
    /// Seconds between L2 blocks.
    pub block_time: u64,
    /// The timestamp the Ecotone upgrade activates at, if scheduled.
    pub ecotone_time: Option<u64>,
    /// The hard cap on the uncompressed size of a channel.
    pub max_rlp_bytes_per_channel: usize,
}

impl Default for RollupConfig {
    fn default() -> Self {
        // OP Mainnet
        Self {
            genesis_l2_time: 1_686_068_903,
            l2_chain_id: 10,
            block_time: 2,
            ecotone_time: Some(1_710_374_401),
            max_rlp_bytes_per_channel: MAX_RLP_BYTES_PER_CHANNEL,
        }
    }
}

impl RollupConfig {
    /// Returns true if Ecotone is active at the given timestamp.
    pub fn is_ecotone_active(&self, timestamp: u64) -> bool {
        self.ecotone_time.map_or(false, |t| timestamp >= t)
    }

    /// Returns true if the block at the given timestamp is the first Ecotone block.
    pub fn is_ecotone_activation_block(&self, timestamp: u64) -> bool {
        self.is_ecotone_active(timestamp) &&
            timestamp >= self.block_time &&
            !self.is_ecotone_active(timestamp - self.block_time)
    }
}

/// Channel construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// How batches are packed into a channel.
    pub batch_type: BatchType,
    /// The maximum encoded size of a frame.
    pub max_frame_size: u64,
    /// The compressor settings.
    pub compressor: CompressorConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            batch_type: BatchType::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            compressor: CompressorConfig::default(),
        }
    }
}

impl Config {
    /// The default config file location, `~/.spanout/spanout.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".spanout/spanout.toml"))
    }

    /// Layers the defaults, the toml file, and `SPANOUT_` environment variables.
    ///
    /// Nested keys are split on `__`, so `SPANOUT_CHANNEL__MAX_FRAME_SIZE`
    /// sets `channel.max_frame_size`.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates a [Config].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::extract(Self::figment(path))
    }

    /// Extracts and validates a [Config] from the given [Figment].
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config =
            figment.extract().map_err(|e| ConfigError::Extract(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values that would make channel construction fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.channel.compressor.validate()?;
        if self.channel.max_frame_size < FRAME_V0_OVERHEAD_SIZE {
            return Err(ConfigError::MaxFrameSizeTooSmall(self.channel.max_frame_size))
        }
        if self.channel.max_frame_size > MAX_FRAME_LEN as u64 + FRAME_V0_OVERHEAD_SIZE {
            return Err(ConfigError::MaxFrameSizeTooLarge(self.channel.max_frame_size))
        }
        if self.rollup.max_rlp_bytes_per_channel == 0 {
            return Err(ConfigError::ZeroMaxRlpBytes)
        }
        Ok(())
    }
}

/// The spanout CLI
#[derive(Debug, Parser)]
#[clap(name = "spanout", version, about = "Packs L2 batches into compressed channel frames")]
pub struct Cli {
    /// Path to a toml config file. Defaults to ~/.spanout/spanout.toml.
    #[clap(short = 'c', long, env = "SPANOUT_CONFIG")]
    pub config: Option<PathBuf>,
    /// A JSON file of batches, or of hex frame payloads with --inspect.
    #[clap(short = 'i', long)]
    pub input: PathBuf,
    /// The compressed size each channel aims for.
    #[clap(long)]
    pub target_output_size: Option<u64>,
    /// The maximum encoded size of a frame.
    #[clap(long)]
    pub max_frame_size: Option<u64>,
    /// The compression strategy: shadow, ratio, non, or blind.
    #[clap(long)]
    pub compressor: Option<CompressorKind>,
    /// The batch type: span or singular.
    #[clap(long)]
    pub batch_type: Option<BatchType>,
    /// Decode frames from the input instead of building them.
    #[clap(long)]
    pub inspect: bool,
    /// Enables debug logging.
    #[clap(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Convert the CLI arguments into a config, on top of the file and env layers.
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let mut figment = Config::figment(self.config.as_deref());
        if let Some(target) = self.target_output_size {
            figment = figment
                .merge(Serialized::default("channel.compressor.target_output_size", target));
        }
        if let Some(max_frame_size) = self.max_frame_size {
            figment = figment.merge(Serialized::default("channel.max_frame_size", max_frame_size));
        }
        if let Some(kind) = self.compressor {
            figment = figment.merge(Serialized::default("channel.compressor.kind", kind));
        }
        if let Some(batch_type) = self.batch_type {
            figment = figment.merge(Serialized::default("channel.batch_type", batch_type));
        }
        Config::extract(figment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecotone_activation() {
        let config = RollupConfig { ecotone_time: Some(100), block_time: 2, ..Default::default() };
        assert!(!config.is_ecotone_active(99));
        assert!(config.is_ecotone_active(100));
        assert!(config.is_ecotone_activation_block(100));
        assert!(config.is_ecotone_activation_block(101));
        assert!(!config.is_ecotone_activation_block(102));

        let never = RollupConfig { ecotone_time: None, ..Default::default() };
        assert!(!never.is_ecotone_active(u64::MAX));
        assert!(!never.is_ecotone_activation_block(u64::MAX));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.channel.max_frame_size = 22;
        assert_eq!(config.validate().unwrap_err(), ConfigError::MaxFrameSizeTooSmall(22));

        let largest = MAX_FRAME_LEN as u64 + FRAME_V0_OVERHEAD_SIZE;
        config.channel.max_frame_size = largest;
        assert!(config.validate().is_ok());
        config.channel.max_frame_size = largest + 1;
        assert_eq!(config.validate().unwrap_err(), ConfigError::MaxFrameSizeTooLarge(largest + 1));

        let mut config = Config::default();
        config.rollup.max_rlp_bytes_per_channel = 0;
        assert_eq!(config.validate().unwrap_err(), ConfigError::ZeroMaxRlpBytes);
    }
}
