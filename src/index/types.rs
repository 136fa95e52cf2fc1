use spindle_macros::{Decode, Encode};

/// Fixed-width opaque commitment to an output's locking script.
pub type ScriptId = [u8; 32];

/// Reference to a specific transaction output.
#[derive(Encode, Decode, PartialEq, Hash, Eq, Clone, Copy, Debug)]
pub struct TxoRef {
    pub tx_hash: [u8; 32],
    pub txo_index: u32,
}

/// A transaction output as stored by the txo index.
#[derive(Encode, Decode, PartialEq, Eq, Clone, Debug)]
pub struct Txo {
    /// Amount of satoshis locked in the output
    pub satoshis: u64,
    /// Raw locking script
    pub script: Vec<u8>,
}
