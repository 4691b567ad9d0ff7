//! Odd-even merge: merges two adjacent blocks that already form a bitonic
//! sequence into one sorted block, via `log2(block_len)` layers of
//! compare-exchange at halving stride — Batcher's classic network. Index
//! pairs at every layer are public (only row contents are secret), so the
//! whole merge is one sequence of gather/compare/select/scatter rounds.

use orq_error::{OrqError, OrqResult};
use orq_protocol::{gt, Communicator, ProtocolParty, WireCodec};
use orq_vector::Elem;

use crate::select::select_table;
use crate::table::EncodedTable;

/// One layer of compare-exchange over disjoint index pairs: for each `(lo,
/// hi)` pair, the smaller key ends up at `lo` (ascending) or `hi`
/// (descending).
fn compare_exchange<T, C>(
    table: &EncodedTable<T>,
    lo_idx: &[usize],
    hi_idx: &[usize],
    key: &str,
    ascending: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let lo_rows = table.gather(lo_idx)?;
    let hi_rows = table.gather(hi_idx)?;
    let lo_key = lo_rows.column_b(key)?;
    let hi_key = hi_rows.column_b(key)?;

    // `out_of_order` is 1 exactly when the pair must swap to respect the
    // requested direction.
    let out_of_order = if ascending { gt(lo_key, hi_key, party)? } else { gt(hi_key, lo_key, party)? };

    let new_lo = select_table(&out_of_order, &hi_rows, &lo_rows, party)?;
    let new_hi = select_table(&out_of_order, &lo_rows, &hi_rows, party)?;

    let scattered = table.scatter_rows(lo_idx, &new_lo)?;
    scattered.scatter_rows(hi_idx, &new_hi)
}

/// Merge the bitonic block `table[start..end)` into ascending (or
/// descending) order by `key`. `end - start` must be a power of two.
pub fn odd_even_merge<T, C>(
    table: &EncodedTable<T>,
    key: &str,
    start: usize,
    end: usize,
    ascending: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let len = end.checked_sub(start).ok_or_else(|| OrqError::invalid_shape("odd_even_merge: start > end"))?;
    if len == 0 || (len & (len - 1)) != 0 {
        return Err(OrqError::invalid_shape("odd_even_merge: block length must be a power of two"));
    }
    if end > table.len() {
        return Err(OrqError::invalid_shape("odd_even_merge: block out of bounds"));
    }

    let mut current = table.clone();
    let mut stride = len / 2;
    while stride >= 1 {
        let mut lo_idx = Vec::new();
        let mut hi_idx = Vec::new();
        let mut i = start;
        while i < end {
            for k in 0..stride {
                lo_idx.push(i + k);
                hi_idx.push(i + k + stride);
            }
            i += stride * 2;
        }
        current = compare_exchange(&current, &lo_idx, &hi_idx, key, ascending, party)?;
        stride /= 2;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_crypto::{DummyOle, OleProvider};
    use orq_evector::{BSharedVector, EVector};
    use orq_protocol::{open_b, LoopbackCommunicator, Scheme};
    use orq_vector::Vector;

    use crate::table::Column;

    fn b_col(values: Vec<i64>) -> BSharedVector<i64> {
        BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(values)], 0).unwrap())
    }

    #[test]
    fn odd_even_merge_sorts_a_bitonic_block() {
        // 1,3,5,7 ascending then 8,6,4,2 descending forms one bitonic
        // sequence of length 8.
        let plain: Vec<i64> = vec![1, 3, 5, 7, 8, 6, 4, 2];
        let s0 = vec![9i64; 8];
        let s1: Vec<i64> = plain.iter().zip(&s0).map(|(p, a)| p ^ a).collect();
        let valid0 = vec![1i64; 8];
        let valid1: Vec<i64> = vec![0i64; 8];

        let key = [44u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        // 3 layers, each layer does 4 gt calls (w=64, 2 ANDs/bit) plus
        // selects (one AND per select for the bit broadcast, one mul per
        // arithmetic select, none needed here since key is the only
        // column): budget very generously.
        p0.triples.reserve_and_triples(&mut ole0, 20_000).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 20_000).unwrap();

        let t0 = EncodedTable::new(
            vec![("[K]".to_string(), Column::Boolean(b_col(s0)))],
            b_col(valid0),
        )
        .unwrap();
        let t1 = EncodedTable::new(
            vec![("[K]".to_string(), Column::Boolean(b_col(s1)))],
            b_col(valid1),
        )
        .unwrap();

        let h1 = std::thread::spawn(move || {
            let merged1 = odd_even_merge(&t1, "[K]", 0, 8, true, &mut p1).unwrap();
            open_b(merged1.column_b("[K]").unwrap(), &mut p1).unwrap()
        });
        let merged0 = odd_even_merge(&t0, "[K]", 0, 8, true, &mut p0).unwrap();
        let opened0 = open_b(merged0.column_b("[K]").unwrap(), &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(opened1, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
