use std::sync::Arc;

use bitcoin::{BlockHash, hashes::Hash};
use tracing::info;

use crate::{
    error::Error,
    rpc::ChainRpc,
    storage::{encdec::Tail, kv_store::StorageHandler},
};

use events::{EventBus, IndexerEvent};
use tables::{
    ChainTip, ScriptActivityKV, ScriptActivityKey, ScriptLabelKV, ScriptLabelKey, SpendingInput,
    SpentByTxoRefKV, TipKV, TxHeight, TxHeightKV, TxoByTxoRefKV,
};
use types::{ScriptId, Txo, TxoRef};

pub mod events;
pub mod fees;
pub mod tables;
pub mod types;

/*
    Indexer

    Applies validated blocks to the secondary indexes, one atomic batch per
    block, and undoes them on reorg. A single logical writer drives
    connect/disconnect serially; readers use QueryEngine on their own
    snapshots.
*/

pub struct Indexer {
    store: StorageHandler,
    rpc: Arc<dyn ChainRpc>,
    events: EventBus,
}

impl Indexer {
    /// Must be called within a tokio runtime, which hosts the event drainer.
    pub fn new(store: StorageHandler, rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            store,
            rpc,
            events: EventBus::new(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Applies the block at the tip and returns the node's next block hash,
    /// if it has one.
    ///
    /// The primary batch (spends, outputs, script activity, tx heights, tip)
    /// commits atomically, then the fee pass commits its own batch. A fee
    /// pass failure surfaces with the primary batch left in place; recovery
    /// is the caller's responsibility. Queued events reach subscribers only
    /// after both batches commit, and only after this call has returned.
    pub async fn connect(
        &self,
        block_hash: &BlockHash,
        expected_height: u32,
    ) -> Result<Option<BlockHash>, Error> {
        let block = self.rpc.block(block_hash).await?;

        // a reorg may have raced whoever decided on this height
        if block.height != expected_height {
            return Err(Error::HeightMismatch {
                expected: expected_height,
                found: block.height,
            });
        }

        let mut batch = self.store.atomic();
        let mut queued = Vec::new();

        for tx in &block.transactions {
            let tx_hash = tx.tx_id.to_byte_array();

            for (vin, input) in tx.inputs.iter().enumerate() {
                if input.coinbase {
                    continue;
                }

                let outpoint = input.prevout();

                batch.set::<SpentByTxoRefKV>(
                    &outpoint,
                    &SpendingInput {
                        tx_hash,
                        vin: vin as u32,
                    },
                );

                queued.push(IndexerEvent::Spent {
                    outpoint,
                    spent_by: tx.tx_id,
                });
            }

            for output in &tx.outputs {
                batch.set::<ScriptActivityKV>(
                    &ScriptActivityKey {
                        script_id: output.script_id,
                        height: block.height,
                        tx_hash,
                        txo_index: output.vout,
                    },
                    &(),
                );

                batch.set::<TxoByTxoRefKV>(
                    &TxoRef {
                        tx_hash,
                        txo_index: output.vout,
                    },
                    &Txo {
                        satoshis: output.value,
                        script: output.script.clone(),
                    },
                );

                queued.push(IndexerEvent::Script {
                    script_id: output.script_id,
                    tx_id: tx.tx_id,
                    raw_tx: tx.raw.clone(),
                });
            }

            batch.set::<TxHeightKV>(
                &tx_hash,
                &TxHeight {
                    height: block.height,
                },
            );

            queued.push(IndexerEvent::Transaction {
                tx_id: tx.tx_id,
                raw_tx: tx.raw.clone(),
                block_hash: *block_hash,
            });
        }

        queued.push(IndexerEvent::Block {
            block_hash: *block_hash,
            height: block.height,
        });

        batch.set::<TipKV>(
            &(),
            &ChainTip {
                hash: block_hash.to_byte_array(),
                height: block.height,
            },
        );

        batch.commit()?;

        // second-order pass, in its own batch
        fees::index_block_fees(&self.store, &block)?;

        info!(
            height = block.height,
            txs = block.transactions.len(),
            "connected block {block_hash}"
        );

        self.events.dispatch(queued);

        Ok(block.next_block_hash)
    }

    /// Undoes the tip block on a reorg: deletes every entry its connect
    /// installed and rolls the tip back to its parent. Emits nothing; the fee
    /// summary for the height is kept as a historical record.
    pub async fn disconnect(&self, block_hash: &BlockHash) -> Result<(), Error> {
        let block = self.rpc.block(block_hash).await?;

        let mut batch = self.store.atomic();

        for tx in &block.transactions {
            let tx_hash = tx.tx_id.to_byte_array();

            for input in &tx.inputs {
                if input.coinbase {
                    continue;
                }

                batch.delete::<SpentByTxoRefKV>(&input.prevout());
            }

            for output in &tx.outputs {
                batch.delete::<ScriptActivityKV>(&ScriptActivityKey {
                    script_id: output.script_id,
                    height: block.height,
                    tx_hash,
                    txo_index: output.vout,
                });

                batch.delete::<TxoByTxoRefKV>(&TxoRef {
                    tx_hash,
                    txo_index: output.vout,
                });
            }

            batch.delete::<TxHeightKV>(&tx_hash);
        }

        batch.set::<TipKV>(
            &(),
            &ChainTip {
                hash: block.previous_block_hash.to_byte_array(),
                height: block.height.saturating_sub(1),
            },
        );

        batch.commit()?;

        info!(height = block.height, "disconnected block {block_hash}");

        Ok(())
    }

    /// Attaches a label to a script id. Labels are independent of block
    /// lifecycle and survive reorgs; re-adding an existing label is a no-op.
    pub fn add_script_label(&self, script_id: ScriptId, label: &[u8]) -> Result<(), Error> {
        let mut batch = self.store.atomic();

        batch.set::<ScriptLabelKV>(
            &ScriptLabelKey {
                script_id,
                label: Tail(label.to_vec()),
            },
            &(),
        );

        batch.commit()
    }
}
