//! Conversion of L2 blocks into [SingularBatch]es.

use ethers_core::types::{Block, Bytes, Transaction, H256, U256, U64};

use crate::{batch::SingularBatch, config::RollupConfig, errors::BlockConversionError};

/// The EIP-2718 type of a deposit transaction.
pub const DEPOSIT_TX_TYPE: u64 = 0x7E;

/// The selector of `setL1BlockValues(...)`.
pub const L1_INFO_BEDROCK_SELECTOR: [u8; 4] = [0x01, 0x5d, 0x8e, 0xb9];

/// The selector of `setL1BlockValuesEcotone()`.
pub const L1_INFO_ECOTONE_SELECTOR: [u8; 4] = [0x44, 0x0a, 0x5e, 0x20];

/// The calldata length of a Bedrock L1 info deposit.
pub const L1_INFO_BEDROCK_LEN: usize = 4 + 32 * 8;

/// The calldata length of an Ecotone L1 info deposit.
pub const L1_INFO_ECOTONE_LEN: usize = 4 + 32 * 5;

/// The L1 attributes carried by the first deposit of every L2 block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct L1BlockInfo {
    /// The L1 origin block number.
    pub number: u64,
    /// The L1 origin block timestamp.
    pub time: u64,
    /// The L1 base fee.
    pub base_fee: U256,
    /// The L1 origin block hash.
    pub block_hash: H256,
    /// The position of the L2 block within its epoch.
    pub sequence_number: u64,
    /// The batcher address, left-padded to 32 bytes.
    pub batcher_hash: H256,
    /// Bedrock only.
    pub l1_fee_overhead: U256,
    /// Bedrock only.
    pub l1_fee_scalar: U256,
    /// Ecotone only.
    pub base_fee_scalar: u32,
    /// Ecotone only.
    pub blob_base_fee_scalar: u32,
    /// Ecotone only.
    pub blob_base_fee: U256,
}

impl L1BlockInfo {
    /// Decodes Bedrock calldata: the selector followed by eight 32-byte words.
    pub fn decode_bedrock(data: &[u8]) -> Result<Self, BlockConversionError> {
        check_calldata(data, L1_INFO_BEDROCK_SELECTOR, L1_INFO_BEDROCK_LEN)?;
        let word = |i: usize| &data[4 + 32 * i..4 + 32 * (i + 1)];
        Ok(Self {
            number: word_to_u64(word(0), "number")?,
            time: word_to_u64(word(1), "time")?,
            base_fee: U256::from_big_endian(word(2)),
            block_hash: H256::from_slice(word(3)),
            sequence_number: word_to_u64(word(4), "sequence_number")?,
            batcher_hash: H256::from_slice(word(5)),
            l1_fee_overhead: U256::from_big_endian(word(6)),
            l1_fee_scalar: U256::from_big_endian(word(7)),
            ..Default::default()
        })
    }

    /// Decodes packed Ecotone calldata.
    pub fn decode_ecotone(data: &[u8]) -> Result<Self, BlockConversionError> {
        check_calldata(data, L1_INFO_ECOTONE_SELECTOR, L1_INFO_ECOTONE_LEN)?;
        let u32_at =
            |i: usize| u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
        let u64_at = |i: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&data[i..i + 8]);
            u64::from_be_bytes(buf)
        };
        Ok(Self {
            base_fee_scalar: u32_at(4),
            blob_base_fee_scalar: u32_at(8),
            sequence_number: u64_at(12),
            time: u64_at(20),
            number: u64_at(28),
            base_fee: U256::from_big_endian(&data[36..68]),
            blob_base_fee: U256::from_big_endian(&data[68..100]),
            block_hash: H256::from_slice(&data[100..132]),
            batcher_hash: H256::from_slice(&data[132..164]),
            ..Default::default()
        })
    }

    /// Encodes the Bedrock calldata.
    pub fn encode_bedrock(&self) -> Bytes {
        let mut buf = Vec::with_capacity(L1_INFO_BEDROCK_LEN);
        buf.extend_from_slice(&L1_INFO_BEDROCK_SELECTOR);
        for value in [U256::from(self.number), U256::from(self.time), self.base_fee] {
            buf.extend_from_slice(&u256_word(value));
        }
        buf.extend_from_slice(self.block_hash.as_bytes());
        buf.extend_from_slice(&u256_word(U256::from(self.sequence_number)));
        buf.extend_from_slice(self.batcher_hash.as_bytes());
        buf.extend_from_slice(&u256_word(self.l1_fee_overhead));
        buf.extend_from_slice(&u256_word(self.l1_fee_scalar));
        buf.into()
    }

    /// Encodes the packed Ecotone calldata.
    pub fn encode_ecotone(&self) -> Bytes {
        let mut buf = Vec::with_capacity(L1_INFO_ECOTONE_LEN);
        buf.extend_from_slice(&L1_INFO_ECOTONE_SELECTOR);
        buf.extend_from_slice(&self.base_fee_scalar.to_be_bytes());
        buf.extend_from_slice(&self.blob_base_fee_scalar.to_be_bytes());
        buf.extend_from_slice(&self.sequence_number.to_be_bytes());
        buf.extend_from_slice(&self.time.to_be_bytes());
        buf.extend_from_slice(&self.number.to_be_bytes());
        buf.extend_from_slice(&u256_word(self.base_fee));
        buf.extend_from_slice(&u256_word(self.blob_base_fee));
        buf.extend_from_slice(self.block_hash.as_bytes());
        buf.extend_from_slice(self.batcher_hash.as_bytes());
        buf.into()
    }
}

/// Converts an L2 block into a [SingularBatch] and the [L1BlockInfo] of its first deposit.
///
/// Deposits are dropped from the batch since they are re-derived from L1.
pub fn block_to_singular_batch(
    config: &RollupConfig,
    block: &Block<Transaction>,
) -> Result<(SingularBatch, L1BlockInfo), BlockConversionError> {
    let info_tx = block.transactions.first().ok_or(BlockConversionError::EmptyBlock)?;
    if !is_deposit(info_tx) {
        return Err(BlockConversionError::NotDepositTx)
    }
    if block.timestamp > U256::from(u64::MAX) {
        return Err(BlockConversionError::FieldOverflow("timestamp"))
    }
    let timestamp = block.timestamp.as_u64();

    let info = if config.is_ecotone_active(timestamp) &&
        !config.is_ecotone_activation_block(timestamp)
    {
        L1BlockInfo::decode_ecotone(&info_tx.input)?
    } else {
        L1BlockInfo::decode_bedrock(&info_tx.input)?
    };

    let transactions =
        block.transactions.iter().filter(|tx| !is_deposit(tx)).map(Transaction::rlp).collect();

    let batch = SingularBatch {
        parent_hash: block.parent_hash,
        epoch_num: info.number,
        epoch_hash: info.block_hash,
        timestamp,
        transactions,
    };
    Ok((batch, info))
}

fn is_deposit(tx: &Transaction) -> bool {
    tx.transaction_type == Some(U64::from(DEPOSIT_TX_TYPE))
}

fn check_calldata(
    data: &[u8],
    selector: [u8; 4],
    expected: usize,
) -> Result<(), BlockConversionError> {
    if data.len() != expected {
        return Err(BlockConversionError::InvalidL1InfoLength { expected, actual: data.len() })
    }
    if data[..4] != selector {
        return Err(BlockConversionError::InvalidL1InfoSelector(hex::encode(&data[..4])))
    }
    Ok(())
}

fn word_to_u64(word: &[u8], field: &'static str) -> Result<u64, BlockConversionError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(BlockConversionError::FieldOverflow(field))
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deposit_tx, user_tx};

    fn info() -> L1BlockInfo {
        L1BlockInfo {
            number: 17_000_000,
            time: 1_700_000_000,
            base_fee: U256::from(30_000_000_000u64),
            block_hash: H256::repeat_byte(0xab),
            sequence_number: 3,
            batcher_hash: H256::repeat_byte(0x0c),
            ..Default::default()
        }
    }

    fn block(timestamp: u64, calldata: Bytes) -> Block<Transaction> {
        Block {
            parent_hash: H256::repeat_byte(0x01),
            timestamp: U256::from(timestamp),
            transactions: vec![
                deposit_tx(calldata),
                user_tx(0),
                deposit_tx(Bytes::default()),
                user_tx(1),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_bedrock_calldata_roundtrip() {
        let info = L1BlockInfo {
            l1_fee_overhead: U256::from(188),
            l1_fee_scalar: U256::from(684_000),
            ..info()
        };
        let data = info.encode_bedrock();
        assert_eq!(data.len(), L1_INFO_BEDROCK_LEN);
        assert_eq!(L1BlockInfo::decode_bedrock(&data).unwrap(), info);
    }

    #[test]
    fn test_ecotone_calldata_roundtrip() {
        let info = L1BlockInfo {
            base_fee_scalar: 1_368,
            blob_base_fee_scalar: 810_949,
            blob_base_fee: U256::from(1),
            ..info()
        };
        let data = info.encode_ecotone();
        assert_eq!(data.len(), L1_INFO_ECOTONE_LEN);
        assert_eq!(L1BlockInfo::decode_ecotone(&data).unwrap(), info);
    }

    #[test]
    fn test_calldata_rejects_bad_input() {
        let data = info().encode_bedrock();
        assert_eq!(
            L1BlockInfo::decode_ecotone(&data).unwrap_err(),
            BlockConversionError::InvalidL1InfoLength { expected: 164, actual: 260 }
        );
        let mut data = data.to_vec();
        data[0] = 0xff;
        assert_eq!(
            L1BlockInfo::decode_bedrock(&data).unwrap_err(),
            BlockConversionError::InvalidL1InfoSelector("ff5d8eb9".to_string())
        );
    }

    #[test]
    fn test_block_to_singular_batch_bedrock() {
        let config = RollupConfig { ecotone_time: None, ..Default::default() };
        let block = block(1_700_000_010, info().encode_bedrock());
        let (batch, l1_info) = block_to_singular_batch(&config, &block).unwrap();

        assert_eq!(l1_info, info());
        assert_eq!(batch.parent_hash, block.parent_hash);
        assert_eq!(batch.epoch_num, 17_000_000);
        assert_eq!(batch.epoch_hash, H256::repeat_byte(0xab));
        assert_eq!(batch.timestamp, 1_700_000_010);
        let expected = vec![block.transactions[1].rlp(), block.transactions[3].rlp()];
        assert_eq!(batch.transactions, expected);
    }

    #[test]
    fn test_block_to_singular_batch_ecotone() {
        let config = RollupConfig { ecotone_time: Some(100), block_time: 2, ..Default::default() };

        // The activation block still carries Bedrock calldata.
        let first = block(100, info().encode_bedrock());
        assert_eq!(block_to_singular_batch(&config, &first).unwrap().1, info());

        let later = block(102, info().encode_ecotone());
        let (batch, l1_info) = block_to_singular_batch(&config, &later).unwrap();
        assert_eq!(l1_info, info());
        assert_eq!(batch.epoch_num, info().number);
    }

    #[test]
    fn test_block_without_deposit() {
        let config = RollupConfig::default();
        let empty = Block::<Transaction>::default();
        let err = block_to_singular_batch(&config, &empty).unwrap_err();
        assert_eq!(err, BlockConversionError::EmptyBlock);

        let block = Block { transactions: vec![user_tx(0)], ..Default::default() };
        let err = block_to_singular_batch(&config, &block).unwrap_err();
        assert_eq!(err, BlockConversionError::NotDepositTx);
    }
}
