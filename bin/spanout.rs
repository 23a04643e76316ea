use std::{fs, path::Path};

use clap::Parser;
use eyre::{Result, WrapErr};
use serde::Deserialize;

use spanout::{
    batch::{BatchData, SingularBatch},
    channels::ChannelManager,
    config::{Cli, Config},
    reader::read_channel,
    telemetry,
};

/// A batch and its sequence number within its epoch.
#[derive(Debug, Deserialize)]
struct InputBatch {
    batch: SingularBatch,
    seq_num: u64,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    telemetry::init(cli.verbose)?;
    telemetry::register_shutdown();

    let config = cli.to_config()?;
    let result = if cli.inspect { inspect(&config, &cli.input) } else { build(config, &cli.input) };
    if let Err(e) = &result {
        tracing::error!(target: "spanout", "spanout exited with error: {:?}", e);
    }
    result
}

/// Packs the input batches into channels and prints one line per frame.
fn build(config: Config, input: &Path) -> Result<()> {
    let raw = fs::read_to_string(input).wrap_err_with(|| format!("reading {}", input.display()))?;
    let batches: Vec<InputBatch> = serde_json::from_str(&raw)?;
    tracing::info!(target: "spanout", "loaded {} batches", batches.len());

    let mut manager = ChannelManager::new(config)?;
    for InputBatch { batch, seq_num } in batches {
        manager.add_batch(batch, seq_num)?;
        for tx in manager.drain_tx_data()? {
            println!("{} 0x{}", tx.id, hex::encode(&tx.data));
        }
    }
    manager.close()?;
    for tx in manager.drain_tx_data()? {
        println!("{} 0x{}", tx.id, hex::encode(&tx.data));
    }
    tracing::info!(target: "spanout", "emitted {} frames", manager.pending_txs());
    Ok(())
}

/// Reads a channel back from hex frame payloads and prints its batches.
fn inspect(config: &Config, input: &Path) -> Result<()> {
    let raw = fs::read_to_string(input).wrap_err_with(|| format!("reading {}", input.display()))?;
    let payloads: Vec<String> = serde_json::from_str(&raw)?;
    let payloads = payloads
        .iter()
        .map(|p| hex::decode(p.trim_start_matches("0x")))
        .collect::<Result<Vec<_>, _>>()?;

    let batches = read_channel(payloads.iter().map(Vec::as_slice))?;
    for batch in batches {
        match batch {
            BatchData::Singular(batch) => println!("{}", serde_json::to_string(&batch)?),
            BatchData::Span(raw) => {
                for element in raw.derive(config.rollup.genesis_l2_time)? {
                    println!("{:?}", element);
                }
            }
        }
    }
    Ok(())
}
