#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::{BlockHash, Txid, hashes::Hash};
use tempfile::TempDir;

use spindle::index::types::ScriptId;
use spindle::rpc::{BlockBody, BlockTransaction, ChainRpc, RpcError, TxInput, TxOutput};
use spindle::storage::kv_store::StorageHandler;
use spindle::{Indexer, QueryEngine};

pub fn block_hash(seed: u8) -> BlockHash {
    BlockHash::from_byte_array([seed; 32])
}

pub fn txid(seed: u8) -> Txid {
    Txid::from_byte_array([seed; 32])
}

pub fn script_id(seed: u8) -> ScriptId {
    [seed; 32]
}

pub fn coinbase_tx(seed: u8, value: u64, script_id: ScriptId) -> BlockTransaction {
    BlockTransaction {
        tx_id: txid(seed),
        raw: vec![seed; 4],
        vsize: 120,
        inputs: vec![TxInput {
            coinbase: true,
            prev_tx_id: txid(0),
            vout: u32::MAX,
        }],
        outputs: vec![TxOutput {
            script_id,
            script: vec![0x51],
            value,
            vout: 0,
        }],
    }
}

pub fn spend_tx(
    seed: u8,
    prevout: (Txid, u32),
    outputs: &[(ScriptId, u64)],
    vsize: u64,
) -> BlockTransaction {
    BlockTransaction {
        tx_id: txid(seed),
        raw: vec![seed; 4],
        vsize,
        inputs: vec![TxInput {
            coinbase: false,
            prev_tx_id: prevout.0,
            vout: prevout.1,
        }],
        outputs: outputs
            .iter()
            .enumerate()
            .map(|(vout, (script_id, value))| TxOutput {
                script_id: *script_id,
                script: vec![0x76],
                value: *value,
                vout: vout as u32,
            })
            .collect(),
    }
}

pub fn block_body(
    height: u32,
    prev: BlockHash,
    next: Option<BlockHash>,
    transactions: Vec<BlockTransaction>,
) -> BlockBody {
    BlockBody {
        height,
        size: 1000 + height as u64,
        previous_block_hash: prev,
        next_block_hash: next,
        transactions,
    }
}

#[derive(Default)]
pub struct MockRpc {
    blocks: HashMap<BlockHash, BlockBody>,
    heights: HashMap<u32, BlockHash>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, hash: BlockHash, body: BlockBody) {
        self.heights.insert(body.height, hash);
        self.blocks.insert(hash, body);
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn block(&self, hash: &BlockHash) -> Result<BlockBody, RpcError> {
        self.blocks
            .get(hash)
            .cloned()
            .ok_or(RpcError::BlockNotFound(*hash))
    }

    async fn block_hash_at_height(&self, height: u32) -> Result<BlockHash, RpcError> {
        self.heights
            .get(&height)
            .copied()
            .ok_or(RpcError::HeightNotFound(height))
    }
}

/// A store in a fresh tempdir plus the indexer/query pair wired to the mock
/// node. The tempdir must stay alive for as long as the store is used.
pub fn setup(rpc: MockRpc) -> (TempDir, StorageHandler, Indexer, QueryEngine) {
    let dir = tempfile::tempdir().unwrap();
    let store = StorageHandler::open(dir.path().join("db")).unwrap();

    let rpc: Arc<dyn ChainRpc> = Arc::new(rpc);
    let indexer = Indexer::new(store.clone(), rpc.clone());
    let query = QueryEngine::new(store.clone(), rpc);

    (dir, store, indexer, query)
}
