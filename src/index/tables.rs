use spindle_macros::{Decode, Encode};

use crate::{define_table, storage::encdec::Tail};

use super::types::{ScriptId, Txo, TxoRef};

/// One tag byte per index. Tags must stay distinct so the tables occupy
/// disjoint contiguous key ranges; they are part of the persisted layout.
#[repr(u8)]
pub enum IndexTag {
    Tip = b'T',
    TxHeight = b'X',
    TxoByTxoRef = b'O',
    SpentByTxoRef = b'S',
    ScriptActivity = b'A',
    FeesByHeight = b'F',
    ScriptLabel = b'L',
}

// Singleton tip entry, overwritten on every connect/disconnect.
define_table! {
    name: TipKV,
    tag: IndexTag::Tip,
    key: (),
    value: ChainTip
}

// txid -> height of the block that confirmed it.
define_table! {
    name: TxHeightKV,
    tag: IndexTag::TxHeight,
    key: [u8; 32],
    value: TxHeight
}

// Outpoint -> the output it identifies.
define_table! {
    name: TxoByTxoRefKV,
    tag: IndexTag::TxoByTxoRef,
    key: TxoRef,
    value: Txo
}

// Outpoint -> the input that consumed it.
define_table! {
    name: SpentByTxoRefKV,
    tag: IndexTag::SpentByTxoRef,
    key: TxoRef,
    value: SpendingInput
}

// One entry per output committing to a script id; the key carries all the
// data, ordered so a forward scan walks one script's activity by height.
define_table! {
    name: ScriptActivityKV,
    tag: IndexTag::ScriptActivity,
    key: ScriptActivityKey,
    value: ()
}

// height -> fee-rate summary of the block at that height.
define_table! {
    name: FeesByHeightKV,
    tag: IndexTag::FeesByHeight,
    key: u32,
    value: FeeSummary
}

// (script id, label) pairs attached on demand, outside block lifecycle.
define_table! {
    name: ScriptLabelKV,
    tag: IndexTag::ScriptLabel,
    key: ScriptLabelKey,
    value: ()
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTip {
    pub hash: [u8; 32],
    pub height: u32,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHeight {
    pub height: u32,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendingInput {
    /// Transaction that consumed the outpoint
    pub tx_hash: [u8; 32],
    /// Index of the consuming input within that transaction
    pub vin: u32,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptActivityKey {
    pub script_id: ScriptId,
    pub height: u32,
    pub tx_hash: [u8; 32],
    pub txo_index: u32,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBands {
    pub q1: i64,
    pub median: i64,
    pub q3: i64,
}

#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSummary {
    pub bands: FeeBands,
    /// Serialized size of the block in bytes
    pub size: u64,
}

#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ScriptLabelKey {
    pub script_id: ScriptId,
    pub label: Tail,
}

#[cfg(test)]
mod tests {
    use crate::storage::table::Table;

    use super::*;

    #[test]
    fn tags_are_distinct() {
        let tags = [
            TipKV::TAG,
            TxHeightKV::TAG,
            TxoByTxoRefKV::TAG,
            SpentByTxoRefKV::TAG,
            ScriptActivityKV::TAG,
            FeesByHeightKV::TAG,
            ScriptLabelKV::TAG,
        ];

        for (i, tag) in tags.iter().enumerate() {
            assert!(!tags[i + 1..].contains(tag));
        }
    }

    #[test]
    fn script_activity_keys_order_by_tuple() {
        let key = |script_id: u8, height: u32, tx: u8, txo_index: u32| {
            ScriptActivityKV::encode_key(&ScriptActivityKey {
                script_id: [script_id; 32],
                height,
                tx_hash: [tx; 32],
                txo_index,
            })
        };

        // ordered exactly as the declared tuple order
        let ordered = [
            key(1, 5, 9, 1),
            key(1, 6, 0, 0),
            key(1, 6, 0, 2),
            key(1, 6, 1, 0),
            key(2, 0, 0, 0),
        ];

        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn script_activity_range_covers_height_window() {
        let script_id: ScriptId = [7; 32];

        let range = ScriptActivityKV::encode_range(
            Some(&(script_id, 10u32)),
            Some(&(script_id, u32::MAX)),
        );

        let below = ScriptActivityKV::encode_key(&ScriptActivityKey {
            script_id,
            height: 9,
            tx_hash: [0xff; 32],
            txo_index: u32::MAX,
        });
        let inside = ScriptActivityKV::encode_key(&ScriptActivityKey {
            script_id,
            height: 10,
            tx_hash: [0; 32],
            txo_index: 0,
        });
        let other_script = ScriptActivityKV::encode_key(&ScriptActivityKey {
            script_id: [8; 32],
            height: 10,
            tx_hash: [0; 32],
            txo_index: 0,
        });

        assert!(below < range.start);
        assert!(range.start <= inside && inside < range.end);
        assert!(other_script >= range.end);
    }

    #[test]
    fn tip_key_is_just_the_tag() {
        assert_eq!(TipKV::encode_key(&()), vec![IndexTag::Tip as u8]);
    }
}
