use thiserror::Error;

use crate::{index::types::TxoRef, rpc::RpcError, storage::encdec::DecodingError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    #[error("rocksdb error: {0}")]
    Rocks(#[from] rocksdb::Error),

    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("block height {found} does not match expected height {expected}")]
    HeightMismatch { expected: u32, found: u32 },

    #[error("missing txo {0:?}")]
    MissingTxo(TxoRef),
}
