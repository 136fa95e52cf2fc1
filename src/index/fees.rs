use std::collections::{HashMap, HashSet};

use crate::{error::Error, rpc::BlockBody, storage::kv_store::StorageHandler};

use super::{
    tables::{FeeBands, FeeSummary, FeesByHeightKV, TxoByTxoRefKV},
    types::TxoRef,
};

/// Second-order indexing pass: derives the block's fee-rate summary by
/// resolving input values against outputs committed by earlier blocks (or by
/// this block's own primary batch) and commits it in its own batch.
///
/// Runs after the primary batch; a failure here leaves the primary batch in
/// place and the caller decides how to recover.
pub(crate) fn index_block_fees(store: &StorageHandler, block: &BlockBody) -> Result<(), Error> {
    let input_refs = block
        .transactions
        .iter()
        .filter(|tx| !tx.is_coinbase())
        .flat_map(|tx| tx.inputs.iter())
        .map(|input| input.prevout())
        .collect::<HashSet<_>>();

    // one fanned-out lookup for every consumed txo
    let fetched = store.multi_get::<TxoByTxoRefKV>(input_refs.into_iter().collect())?;

    let mut resolver = HashMap::with_capacity(fetched.len());

    for (txo_ref, maybe_txo) in fetched {
        // an absent txo means the index disagrees with the chain
        let txo = maybe_txo.ok_or(Error::MissingTxo(txo_ref))?;
        resolver.insert(txo_ref, txo.satoshis);
    }

    let mut sample = Vec::with_capacity(block.transactions.len());

    for tx in &block.transactions {
        if tx.is_coinbase() {
            sample.push(0);
            continue;
        }

        let mut in_accum: u64 = 0;

        for input in &tx.inputs {
            let satoshis = resolver
                .get(&input.prevout())
                .ok_or(Error::MissingTxo(input.prevout()))?;

            in_accum += satoshis;
        }

        let out_accum: u64 = tx.outputs.iter().map(|output| output.value).sum();

        let fee = in_accum as i64 - out_accum as i64;

        let fee_rate = if tx.vsize == 0 {
            0
        } else {
            fee.div_euclid(tx.vsize as i64)
        };

        sample.push(fee_rate);
    }

    sample.sort_unstable();

    let mut batch = store.atomic();

    batch.set::<FeesByHeightKV>(
        &block.height,
        &FeeSummary {
            bands: box_summary(&sample),
            size: block.size,
        },
    );

    batch.commit()
}

/// Box summary of an ascending sample by index picks: q1 at n/4, median at
/// n/2, q3 at n/2 + n/4 (integer division), all zero for an empty sample.
fn box_summary(sorted: &[i64]) -> FeeBands {
    if sorted.is_empty() {
        return FeeBands {
            q1: 0,
            median: 0,
            q3: 0,
        };
    }

    let quarter = sorted.len() / 4;
    let middle = sorted.len() / 2;

    FeeBands {
        q1: sorted[quarter],
        median: sorted[middle],
        q3: sorted[middle + quarter],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_is_all_zero() {
        assert_eq!(
            box_summary(&[]),
            FeeBands {
                q1: 0,
                median: 0,
                q3: 0
            }
        );
    }

    #[test]
    fn single_sample_fills_every_band() {
        assert_eq!(
            box_summary(&[40]),
            FeeBands {
                q1: 40,
                median: 40,
                q3: 40
            }
        );
    }

    #[test]
    fn two_samples_pick_low_and_high() {
        assert_eq!(
            box_summary(&[3, 9]),
            FeeBands {
                q1: 3,
                median: 9,
                q3: 9
            }
        );
    }

    #[test]
    fn four_samples_pick_by_index() {
        // picks land on indexes 1, 2 and 3
        assert_eq!(
            box_summary(&[1, 2, 3, 4]),
            FeeBands {
                q1: 2,
                median: 3,
                q3: 4
            }
        );
    }

    #[test]
    fn five_samples_pick_by_index() {
        assert_eq!(
            box_summary(&[10, 20, 30, 40, 50]),
            FeeBands {
                q1: 20,
                median: 30,
                q3: 40
            }
        );
    }
}
