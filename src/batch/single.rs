use ethers_core::{
    types::{Bytes, H256},
    utils::rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream},
};
use serde::{Deserialize, Serialize};

/// A single L2 block's worth of batch data.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingularBatch {
    /// Block hash of the previous L2 block.
    pub parent_hash: H256,
    /// The batch epoch number. Same as the first L1 block number in the epoch.
    pub epoch_num: u64,
    /// The block hash of the first L1 block in the epoch.
    pub epoch_hash: H256,
    /// The L2 block timestamp of this batch.
    pub timestamp: u64,
    /// The L2 block transactions in this batch, as opaque EIP-2718 envelopes.
    pub transactions: Vec<Bytes>,
}

impl SingularBatch {
    /// Returns the epoch as a number and hash pair.
    pub fn epoch(&self) -> (u64, H256) {
        (self.epoch_num, self.epoch_hash)
    }
}

impl Encodable for SingularBatch {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5);
        s.append(&self.parent_hash.as_bytes().to_vec());
        s.append(&self.epoch_num);
        s.append(&self.epoch_hash.as_bytes().to_vec());
        s.append(&self.timestamp);
        s.begin_list(self.transactions.len());
        for tx in &self.transactions {
            s.append(&tx.to_vec());
        }
    }
}

impl Decodable for SingularBatch {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 5 {
            return Err(DecoderError::RlpIncorrectListLen)
        }
        let transactions: Vec<Vec<u8>> = rlp.list_at(4)?;
        Ok(Self {
            parent_hash: decode_hash(&rlp.at(0)?)?,
            epoch_num: rlp.val_at(1)?,
            epoch_hash: decode_hash(&rlp.at(2)?)?,
            timestamp: rlp.val_at(3)?,
            transactions: transactions.into_iter().map(Bytes::from).collect(),
        })
    }
}

fn decode_hash(rlp: &Rlp<'_>) -> Result<H256, DecoderError> {
    let raw: Vec<u8> = rlp.as_val()?;
    if raw.len() != 32 {
        return Err(DecoderError::Custom("hash must be 32 bytes"))
    }
    Ok(H256::from_slice(&raw))
}
