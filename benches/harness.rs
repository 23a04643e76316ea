use rand::{rngs::StdRng, SeedableRng};

use spanout::{
    batch::{BatchType, SingularBatch, SpanBatch},
    channel_out::{new_channel_out, ChannelOut},
    compression::CompressorKind,
    config::Config,
    test_utils::{random_singular_batches, seq_num},
};

/// The channel setups measured by every bench.
pub const SETUPS: [(BatchType, CompressorKind); 8] = [
    (BatchType::Span, CompressorKind::Shadow),
    (BatchType::Span, CompressorKind::Ratio),
    (BatchType::Span, CompressorKind::Non),
    (BatchType::Span, CompressorKind::Blind),
    (BatchType::Singular, CompressorKind::Shadow),
    (BatchType::Singular, CompressorKind::Ratio),
    (BatchType::Singular, CompressorKind::Non),
    (BatchType::Singular, CompressorKind::Blind),
];

/// Deterministic batches, each holding `tx_count` random transactions.
pub fn batches(count: usize, tx_count: usize) -> Vec<SingularBatch> {
    let mut rng = StdRng::seed_from_u64(0xbe4c);
    random_singular_batches(&mut rng, count, tx_count, 1_000)
}

/// A config large enough that no bench fills its channel.
pub fn config(batch_type: BatchType, kind: CompressorKind) -> Config {
    let mut config = Config::default();
    config.rollup.genesis_l2_time = 0;
    config.channel.batch_type = batch_type;
    config.channel.compressor.kind = kind;
    config.channel.compressor.target_output_size = 10_000_000;
    config
}

/// A fresh channel holding the given batches.
pub fn channel_with(config: &Config, batches: &[SingularBatch]) -> Box<dyn ChannelOut> {
    let mut co = new_channel_out(config).unwrap();
    for batch in batches {
        co.add_singular_batch(batch.clone(), seq_num(batch)).unwrap();
    }
    co
}

/// A span batch holding the given batches.
pub fn span_with(batches: &[SingularBatch]) -> SpanBatch {
    let mut span = SpanBatch::new(0, 10);
    for batch in batches {
        span.append_singular_batch(batch.clone(), seq_num(batch)).unwrap();
    }
    span
}
