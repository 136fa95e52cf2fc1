use async_trait::async_trait;
use bitcoin::{BlockHash, Txid, hashes::Hash};
use thiserror::Error;

use crate::index::types::{ScriptId, TxoRef};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("block not found: {0}")]
    BlockNotFound(BlockHash),

    #[error("no block at height {0}")]
    HeightNotFound(u32),

    #[error("transport: {0}")]
    Transport(String),
}

/// Trusted chain node used to fetch block bodies and height to hash
/// mappings. The node has already validated everything it hands out, so no
/// header, proof-of-work or script checks happen on this side.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn block(&self, hash: &BlockHash) -> Result<BlockBody, RpcError>;

    async fn block_hash_at_height(&self, height: u32) -> Result<BlockHash, RpcError>;
}

/// Pre-parsed block body as served by the node.
#[derive(Debug, Clone)]
pub struct BlockBody {
    pub height: u32,
    pub size: u64,
    pub previous_block_hash: BlockHash,
    pub next_block_hash: Option<BlockHash>,
    pub transactions: Vec<BlockTransaction>,
}

#[derive(Debug, Clone)]
pub struct BlockTransaction {
    pub tx_id: Txid,
    /// Raw serialized transaction, passed through to event subscribers.
    pub raw: Vec<u8>,
    pub vsize: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl BlockTransaction {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.iter().any(|input| input.coinbase)
    }
}

#[derive(Debug, Clone)]
pub struct TxInput {
    pub coinbase: bool,
    pub prev_tx_id: Txid,
    pub vout: u32,
}

impl TxInput {
    /// The outpoint this input consumes.
    pub fn prevout(&self) -> TxoRef {
        TxoRef {
            tx_hash: self.prev_tx_id.to_byte_array(),
            txo_index: self.vout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TxOutput {
    /// Fixed-width commitment to the locking script, used for address-style
    /// lookups.
    pub script_id: ScriptId,
    pub script: Vec<u8>,
    pub value: u64,
    pub vout: u32,
}
