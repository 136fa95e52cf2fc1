use std::sync::Arc;

use bitcoin::{BlockHash, Txid, hashes::Hash};
use indexmap::{IndexMap, IndexSet};

use crate::{
    error::Error,
    index::{
        tables::{
            FeeBands, FeesByHeightKV, ScriptActivityKV, ScriptActivityKey, ScriptLabelKV,
            SpendingInput, SpentByTxoRefKV, TipKV, TxHeightKV, TxoByTxoRefKV,
        },
        types::{ScriptId, Txo, TxoRef},
    },
    rpc::ChainRpc,
    storage::{kv_store::StorageHandler, table::Table},
};

/// Cap on script activity entries walked when the caller does not bound the
/// scan itself.
pub const DEFAULT_TXO_SCAN_LIMIT: usize = 10_000;

/// Bound for a script activity scan: a plain entry count, or an
/// `(offset, end)` window into the walk for paged continuation.
#[derive(Debug, Clone, Copy)]
pub enum ScanLimit {
    Count(usize),
    Window { offset: usize, end: usize },
}

/// Where a paged scan stopped: the highest height walked and how many
/// entries were walked, usable to resume a follow-up scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPosition {
    pub height: u32,
    pub offset: usize,
}

/// A script activity entry resolved from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptTxo {
    pub tx_id: Txid,
    pub vout: u32,
    pub script_id: ScriptId,
    pub height: u32,
}

/// Entry of the recent fee-rate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeHistoryEntry {
    pub height: u32,
    pub bands: FeeBands,
    pub size: u64,
}

/// Read side of the indexes. Each call observes a consistent snapshot of the
/// store; nothing is promised across calls.
pub struct QueryEngine {
    store: StorageHandler,
    rpc: Arc<dyn ChainRpc>,
}

impl QueryEngine {
    pub fn new(store: StorageHandler, rpc: Arc<dyn ChainRpc>) -> Self {
        Self { store, rpc }
    }

    pub fn tip(&self) -> Result<Option<BlockHash>, Error> {
        Ok(self
            .store
            .get::<TipKV>(&())?
            .map(|tip| BlockHash::from_byte_array(tip.hash)))
    }

    pub fn tip_height(&self) -> Result<Option<u32>, Error> {
        Ok(self.store.get::<TipKV>(&())?.map(|tip| tip.height))
    }

    pub fn block_height_by_transaction_id(&self, tx_id: &Txid) -> Result<Option<u32>, Error> {
        Ok(self
            .store
            .get::<TxHeightKV>(&tx_id.to_byte_array())?
            .map(|record| record.height))
    }

    /// Resolves the confirming block hash through the node's height mapping.
    pub async fn block_id_by_transaction_id(
        &self,
        tx_id: &Txid,
    ) -> Result<Option<BlockHash>, Error> {
        match self.block_height_by_transaction_id(tx_id)? {
            Some(height) => Ok(Some(self.rpc.block_hash_at_height(height).await?)),
            None => Ok(None),
        }
    }

    pub fn txo(&self, tx_id: &Txid, vout: u32) -> Result<Option<Txo>, Error> {
        self.store.get::<TxoByTxoRefKV>(&TxoRef {
            tx_hash: tx_id.to_byte_array(),
            txo_index: vout,
        })
    }

    pub fn spent_from_txo(&self, outpoint: &TxoRef) -> Result<Option<SpendingInput>, Error> {
        self.store.get::<SpentByTxoRefKV>(outpoint)
    }

    /// Whether any output has ever committed to this script id.
    pub fn seen_script_id(&self, script_id: &ScriptId) -> Result<bool, Error> {
        let range = ScriptActivityKV::encode_prefix_range(script_id);

        match self.store.iter::<ScriptActivityKV>(range).next() {
            Some(entry) => {
                entry?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Outputs committing to a script id from `from_height` on, deduplicated
    /// by outpoint and keyed by it, in scan order.
    pub fn txos_by_script_id(
        &self,
        script_id: &ScriptId,
        from_height: u32,
        limit: Option<usize>,
    ) -> Result<IndexMap<TxoRef, ScriptTxo>, Error> {
        let limit = limit.unwrap_or(DEFAULT_TXO_SCAN_LIMIT);

        let (entries, _) = self.txo_activity(script_id, from_height, ScanLimit::Count(limit))?;

        let mut txos = IndexMap::with_capacity(entries.len());

        for key in entries {
            let outpoint = TxoRef {
                tx_hash: key.tx_hash,
                txo_index: key.txo_index,
            };

            txos.insert(
                outpoint,
                ScriptTxo {
                    tx_id: Txid::from_byte_array(key.tx_hash),
                    vout: key.txo_index,
                    script_id: key.script_id,
                    height: key.height,
                },
            );
        }

        Ok(txos)
    }

    /// Transactions touching a script id: every producer of a matching
    /// output plus, via the spent index, every consumer of one. The returned
    /// position allows paged continuation.
    pub fn transaction_ids_by_script_id(
        &self,
        script_id: &ScriptId,
        from_height: u32,
        limit: ScanLimit,
    ) -> Result<(IndexSet<Txid>, ScanPosition), Error> {
        let (entries, position) = self.txo_activity(script_id, from_height, limit)?;

        let mut tx_ids = IndexSet::new();

        for key in entries {
            tx_ids.insert(Txid::from_byte_array(key.tx_hash));

            let outpoint = TxoRef {
                tx_hash: key.tx_hash,
                txo_index: key.txo_index,
            };

            if let Some(spend) = self.store.get::<SpentByTxoRefKV>(&outpoint)? {
                tx_ids.insert(Txid::from_byte_array(spend.tx_hash));
            }
        }

        Ok((tx_ids, position))
    }

    /// Fee-rate summaries for the most recent `count` heights up to the tip,
    /// in height order.
    pub fn fees(&self, count: usize) -> Result<Vec<FeeHistoryEntry>, Error> {
        let Some(tip) = self.store.get::<TipKV>(&())? else {
            return Ok(Vec::new());
        };

        let back = u32::try_from(count.saturating_sub(1)).unwrap_or(u32::MAX);
        let start = tip.height.saturating_sub(back);

        let range = FeesByHeightKV::encode_range(Some(&start), None::<&()>);

        let mut window = Vec::with_capacity(count);

        for kv in self.store.iter::<FeesByHeightKV>(range).take(count) {
            let (height, summary) = kv?;

            window.push(FeeHistoryEntry {
                height,
                bands: summary.bands,
                size: summary.size,
            });
        }

        Ok(window)
    }

    /// Labels attached to a script id, in label order.
    pub fn script_labels(&self, script_id: &ScriptId) -> Result<Vec<Vec<u8>>, Error> {
        let range = ScriptLabelKV::encode_prefix_range(script_id);

        let mut labels = Vec::new();

        for kv in self.store.iter::<ScriptLabelKV>(range) {
            let (key, ()) = kv?;
            labels.push(key.label.0);
        }

        Ok(labels)
    }

    // Walks script activity entries from (script_id, from_height) upwards,
    // discarding the first `offset` — an O(offset) pager kept for
    // compatibility with existing callers.
    fn txo_activity(
        &self,
        script_id: &ScriptId,
        from_height: u32,
        limit: ScanLimit,
    ) -> Result<(Vec<ScriptActivityKey>, ScanPosition), Error> {
        let (offset, end) = match limit {
            ScanLimit::Count(count) => (0, count),
            ScanLimit::Window { offset, end } => (offset, end),
        };

        let range = ScriptActivityKV::encode_range(
            Some(&(*script_id, from_height)),
            Some(&(*script_id, u32::MAX)),
        );

        let mut entries = Vec::new();
        let mut position = ScanPosition {
            height: from_height,
            offset: 0,
        };

        for kv in self.store.iter::<ScriptActivityKV>(range) {
            if position.offset >= end {
                break;
            }

            let (key, ()) = kv?;

            position.height = position.height.max(key.height);
            position.offset += 1;

            if position.offset > offset {
                entries.push(key);
            }
        }

        Ok((entries, position))
    }
}
