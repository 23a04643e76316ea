//! Deterministic fixtures for tests and benches.

use ethers_core::types::{Bytes, Transaction, H256, U256, U64};
use rand::Rng;

use crate::{batch::SingularBatch, block::DEPOSIT_TX_TYPE};

/// Number of L2 blocks per epoch in [random_singular_batches].
pub const BLOCKS_PER_EPOCH: u64 = 6;

/// Seconds between the batches of [random_singular_batches].
pub const BLOCK_TIME: u64 = 2;

/// Random, incompressible EIP-1559 style transaction bytes.
pub fn random_tx<R: Rng>(rng: &mut R) -> Bytes {
    let len = rng.gen_range(100..300);
    let mut tx = vec![0x02u8; len];
    rng.fill(&mut tx[1..]);
    tx.into()
}

/// A batch at the given timestamp holding `tx_count` random transactions.
pub fn random_singular_batch<R: Rng>(
    rng: &mut R,
    tx_count: usize,
    timestamp: u64,
) -> SingularBatch {
    SingularBatch {
        parent_hash: H256::from(rng.gen::<[u8; 32]>()),
        epoch_num: timestamp / (BLOCK_TIME * BLOCKS_PER_EPOCH),
        epoch_hash: H256::from(rng.gen::<[u8; 32]>()),
        timestamp,
        transactions: (0..tx_count).map(|_| random_tx(rng)).collect(),
    }
}

/// A valid run of batches starting at `start_timestamp`, [BLOCK_TIME] apart,
/// moving to the next epoch every [BLOCKS_PER_EPOCH] batches.
pub fn random_singular_batches<R: Rng>(
    rng: &mut R,
    count: usize,
    tx_count: usize,
    start_timestamp: u64,
) -> Vec<SingularBatch> {
    (0..count as u64)
        .map(|i| random_singular_batch(rng, tx_count, start_timestamp + i * BLOCK_TIME))
        .collect()
}

/// The sequence number of a batch within its epoch, as assigned by [random_singular_batches].
pub fn seq_num(batch: &SingularBatch) -> u64 {
    (batch.timestamp / BLOCK_TIME) % BLOCKS_PER_EPOCH
}

/// A deposit transaction with the given calldata.
pub fn deposit_tx(input: Bytes) -> Transaction {
    Transaction {
        transaction_type: Some(U64::from(DEPOSIT_TX_TYPE)),
        input,
        ..Default::default()
    }
}

/// A legacy transaction distinguished by its nonce.
pub fn user_tx(nonce: u64) -> Transaction {
    Transaction {
        nonce: U256::from(nonce),
        gas: U256::from(21_000),
        gas_price: Some(U256::from(1_000_000_000u64)),
        value: U256::from(1),
        v: U64::from(37),
        r: U256::from(1),
        s: U256::from(2),
        ..Default::default()
    }
}
