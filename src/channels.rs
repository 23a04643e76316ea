use std::{
    collections::{BTreeMap, VecDeque},
    fmt::{self, Display},
    mem,
};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    batch::SingularBatch,
    channel_out::{new_channel_out, AddOutcome, ChannelId, ChannelOut},
    config::Config,
    errors::ChannelOutError,
    frame::DERIVATION_VERSION_0,
};

/// Channel Manager
///
/// Fills channels with batches, opening a fresh channel whenever the current
/// one fills up, and hands out the frames of sealed channels as L1
/// transaction payloads.
#[derive(Debug)]
pub struct ChannelManager {
    config: Config,
    /// The channel batches are currently added to.
    current: Box<dyn ChannelOut>,
    /// Closed channels with frames left to emit, oldest first.
    sealed: VecDeque<Box<dyn ChannelOut>>,
    /// Transactions handed out and not yet confirmed.
    pending_txs: BTreeMap<TransactionID, Bytes>,
    /// Failed transactions to hand out again.
    retry_txs: VecDeque<TaggedData>,
}

impl ChannelManager {
    /// Constructs a new Channel Manager
    pub fn new(config: Config) -> Result<Self, ChannelOutError> {
        let current = new_channel_out(&config)?;
        Ok(Self {
            config,
            current,
            sealed: VecDeque::new(),
            pending_txs: BTreeMap::new(),
            retry_txs: VecDeque::new(),
        })
    }

    /// Adds a batch to the current channel.
    ///
    /// If the channel is full the batch is retried once in a fresh channel.
    pub fn add_batch(&mut self, batch: SingularBatch, seq_num: u64) -> Result<(), ChannelOutError> {
        match self.current.add_singular_batch(batch.clone(), seq_num) {
            Ok(AddOutcome::Accepted(_)) => Ok(()),
            Ok(AddOutcome::Oversized(size)) => {
                warn!(
                    target: "spanout::manager",
                    "batch at {} compressed to {} bytes, above target",
                    batch.timestamp,
                    size
                );
                self.seal()
            }
            Err(ChannelOutError::CompressorFull) => {
                self.seal()?;
                self.retry(batch, seq_num)
            }
            Err(ChannelOutError::TooManyRlpBytes { .. }) if self.current.batch_count() > 0 => {
                self.seal()?;
                self.retry(batch, seq_num)
            }
            Err(e) => Err(e),
        }
    }

    fn retry(&mut self, batch: SingularBatch, seq_num: u64) -> Result<(), ChannelOutError> {
        if let AddOutcome::Oversized(size) = self.current.add_singular_batch(batch, seq_num)? {
            warn!(
                target: "spanout::manager",
                "batch alone compressed to {} bytes, above target",
                size
            );
            self.seal()?;
        }
        Ok(())
    }

    /// Closes the current channel, queues it for framing, and opens a fresh one.
    fn seal(&mut self) -> Result<(), ChannelOutError> {
        if !self.current.is_closed() {
            self.current.close()?;
        }
        let fresh = new_channel_out(&self.config)?;
        let sealed = mem::replace(&mut self.current, fresh);
        info!(
            target: "spanout::manager",
            "sealed channel {} with {} batches, {} compressed bytes",
            hex::encode(sealed.id()),
            sealed.batch_count(),
            sealed.ready_bytes()
        );
        self.sealed.push_back(sealed);
        Ok(())
    }

    /// Seals the current channel if it holds any batches.
    pub fn close(&mut self) -> Result<(), ChannelOutError> {
        if self.current.batch_count() > 0 {
            self.seal()?;
        }
        Ok(())
    }

    /// The number of sealed channels with frames left to emit.
    pub fn sealed_channels(&self) -> usize {
        self.sealed.len()
    }

    /// Returns the next L1 transaction payload, if any.
    ///
    /// Each payload is the derivation version byte followed by one frame.
    pub fn tx_data(&mut self) -> Result<Option<TaggedData>, ChannelOutError> {
        if let Some(tagged) = self.retry_txs.pop_front() {
            self.pending_txs.insert(tagged.id.clone(), tagged.data.clone());
            return Ok(Some(tagged))
        }
        let channel = match self.sealed.front_mut() {
            Some(channel) => channel,
            None => return Ok(None),
        };

        let mut data = vec![DERIVATION_VERSION_0];
        let status = channel.output_frame(&mut data, self.config.channel.max_frame_size)?;
        let id = TransactionID { channel_id: channel.id(), frame_number: status.frame_number() };
        if status.is_last() {
            self.sealed.pop_front();
        }
        debug!(target: "spanout::manager", "emitting tx {} of {} bytes", id, data.len());

        let data = Bytes::from(data);
        self.pending_txs.insert(id.clone(), data.clone());
        Ok(Some(TaggedData { id, data }))
    }

    /// Drains every available L1 transaction payload.
    pub fn drain_tx_data(&mut self) -> Result<Vec<TaggedData>, ChannelOutError> {
        let mut txs = Vec::new();
        while let Some(tx) = self.tx_data()? {
            txs.push(tx);
        }
        Ok(txs)
    }

    /// Marks a transaction as included on L1.
    pub fn tx_confirmed(&mut self, id: &TransactionID) {
        if self.pending_txs.remove(id).is_none() {
            warn!(target: "spanout::manager", "confirmed unknown tx {}", id);
        }
    }

    /// Queues a failed transaction to be handed out again.
    pub fn tx_failed(&mut self, id: &TransactionID) {
        match self.pending_txs.remove(id) {
            Some(data) => self.retry_txs.push_back(TaggedData { id: id.clone(), data }),
            None => warn!(target: "spanout::manager", "failed unknown tx {}", id),
        }
    }

    /// Transactions handed out and not yet confirmed.
    pub fn pending_txs(&self) -> usize {
        self.pending_txs.len()
    }

    /// Clear
    ///
    /// Clears the channel manager.
    /// All of channel state is cleared.
    /// Clear is intended to be used after an L2 reorg.
    pub fn clear(&mut self) -> Result<(), ChannelOutError> {
        self.current = new_channel_out(&self.config)?;
        self.sealed.clear();
        self.pending_txs.clear();
        self.retry_txs.clear();
        Ok(())
    }
}

/// TransactionID identifies the frame an L1 transaction carries.
/// This ID must be trivially comparable & work as a map key.
#[derive(Debug, Hash, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionID {
    /// The channel id
    pub channel_id: ChannelId,
    /// The frame number
    pub frame_number: u16,
}

impl Display for TransactionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.channel_id), self.frame_number)
    }
}

/// TaggedData tags raw byte data with an associated [TransactionID]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedData {
    /// The associated transaction id
    pub id: TransactionID,
    /// The internal data
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        batch::{BatchData, SpanBatchElement},
        frame::Frame,
        reader::read_channel,
        test_utils::{random_singular_batches, seq_num},
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn config(target: u64) -> Config {
        let mut config = Config::default();
        config.rollup.genesis_l2_time = 0;
        config.channel.compressor.target_output_size = target;
        config.channel.max_frame_size = 1_000;
        config
    }

    #[test]
    fn test_transaction_id_display() {
        let id = TransactionID { channel_id: [0xab; 16], frame_number: 7 };
        assert_eq!(id.to_string(), format!("{}:7", "ab".repeat(16)));
    }

    #[test]
    fn test_fills_several_channels() {
        let mut manager = ChannelManager::new(config(2_000)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let batches = random_singular_batches(&mut rng, 30, 2, 100);
        for batch in batches.iter().cloned() {
            let seq = seq_num(&batch);
            manager.add_batch(batch, seq).unwrap();
        }
        manager.close().unwrap();
        assert!(manager.sealed_channels() > 1);

        let txs = manager.drain_tx_data().unwrap();
        assert_eq!(manager.pending_txs(), txs.len());

        let mut by_channel: BTreeMap<ChannelId, Vec<&[u8]>> = BTreeMap::new();
        for tx in &txs {
            assert_eq!(tx.data[0], DERIVATION_VERSION_0);
            assert!(tx.data.len() as u64 <= 1_000 + 1);
            let frame = &Frame::parse_frames(&tx.data).unwrap()[0];
            assert_eq!(frame.number, tx.id.frame_number);
            by_channel.entry(tx.id.channel_id).or_default().push(&tx.data[..]);
        }

        // Channel ids are random, so order channels by their first batch.
        let mut decoded = Vec::new();
        for payloads in by_channel.into_values() {
            let mut channel = Vec::new();
            for data in read_channel(payloads).unwrap() {
                match data {
                    BatchData::Span(raw) => channel.extend(raw.derive(0).unwrap()),
                    other => panic!("unexpected batch {other:?}"),
                }
            }
            decoded.push(channel);
        }
        decoded.sort_by_key(|c| c[0].timestamp);
        let decoded: Vec<_> = decoded.into_iter().flatten().collect();
        let expected: Vec<SpanBatchElement> = batches.iter().map(Into::into).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_failed_tx_is_handed_out_again() {
        let mut manager = ChannelManager::new(config(100_000)).unwrap();
        let mut rng = StdRng::seed_from_u64(10);
        for batch in random_singular_batches(&mut rng, 3, 1, 100) {
            let seq = seq_num(&batch);
            manager.add_batch(batch, seq).unwrap();
        }
        manager.close().unwrap();

        let first = manager.tx_data().unwrap().unwrap();
        manager.tx_failed(&first.id);
        assert_eq!(manager.pending_txs(), 0);
        let again = manager.tx_data().unwrap().unwrap();
        assert_eq!(again, first);
        manager.tx_confirmed(&again.id);
        assert_eq!(manager.pending_txs(), 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut manager = ChannelManager::new(config(100_000)).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for batch in random_singular_batches(&mut rng, 3, 1, 100) {
            let seq = seq_num(&batch);
            manager.add_batch(batch, seq).unwrap();
        }
        manager.close().unwrap();
        manager.tx_data().unwrap();
        manager.clear().unwrap();
        assert_eq!(manager.sealed_channels(), 0);
        assert_eq!(manager.pending_txs(), 0);
        assert!(manager.tx_data().unwrap().is_none());
        manager.close().unwrap();
        assert_eq!(manager.sealed_channels(), 0);
    }
}
