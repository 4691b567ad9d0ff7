//! Distinct: sorts by `keys` (invalid rows last) and keeps only the first
//! row of every resulting run — exactly what `boundary_bits` already
//! marks — narrowing `VALID` to those representatives and recording them
//! in `UNIQ`.

use orq_crypto::CommonPrg;
use orq_error::{OrqError, OrqResult};
use orq_protocol::{and_b, Communicator, ProtocolParty, WireCodec};
use orq_vector::Elem;

use crate::segment::boundary_bits;
use crate::sort::{drop_column, sort_table, SortKey, SortingProtocol};
use crate::table::{Column, EncodedTable, VALID};

/// Keep exactly the first row of every `keys`-equal run, marking it
/// `UNIQ` and dropping the rest via `VALID`.
pub fn distinct<T, C>(
    table: &EncodedTable<T>,
    keys: &[String],
    protocol: SortingProtocol,
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if keys.is_empty() {
        return Err(OrqError::invalid_shape("distinct: at least one key column is required"));
    }

    let mut with_valid = table.clone();
    with_valid.set_column(VALID, Column::Boolean(table.valid().clone()))?;
    let mut sort_keys = vec![SortKey::desc(VALID)];
    sort_keys.extend(keys.iter().map(|k| SortKey::asc(k.clone())));
    let sorted_with_valid = sort_table(&with_valid, &sort_keys, protocol, perm_prg, is_pi_holder, party)?;
    let sorted = drop_column(&sorted_with_valid, VALID)?;

    let key_cols: Vec<&orq_evector::BSharedVector<T>> = keys.iter().map(|k| sorted.column_b(k)).collect::<OrqResult<_>>()?;
    let delta = boundary_bits(&key_cols, party)?;

    let mut out = sorted;
    out.set_uniq(delta.clone())?;
    let new_valid = and_b(out.valid(), &delta, party)?;
    out.set_valid(new_valid)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_crypto::{DummyOle, OleProvider};
    use orq_evector::{BSharedVector, EVector};
    use orq_protocol::{open_b, LoopbackCommunicator, Scheme};
    use orq_vector::Vector;

    fn b_col(values: Vec<i64>) -> BSharedVector<i64> {
        BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(values)], 0).unwrap())
    }

    fn split_xor(plain: &[i64], mask: &[i64]) -> Vec<i64> {
        plain.iter().zip(mask).map(|(p, m)| p ^ m).collect()
    }

    #[test]
    fn keeps_one_row_per_key() {
        // already-sorted keys [1,1,2,3,3,3]: one survivor each for 1, 2, 3.
        let key = [41u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, 20_000).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 20_000).unwrap();

        let keys_plain = vec![1i64, 1, 2, 3, 3, 3];
        let keys_mask = vec![5i64, 6, 7, 8, 9, 10];
        let k_b0 = b_col(split_xor(&keys_plain, &keys_mask));
        let k_b1 = b_col(keys_mask);
        let valid0 = b_col(vec![1i64; 6]);
        let valid1 = b_col(vec![0i64; 6]);

        let build = |k: BSharedVector<i64>, valid: BSharedVector<i64>| {
            EncodedTable::new(vec![("[K]".to_string(), Column::Boolean(k))], valid).unwrap()
        };

        let t1 = build(k_b1, valid1);
        let h1 = std::thread::spawn(move || {
            let out = distinct(&t1, &["[K]".to_string()], SortingProtocol::Bitonic, &mut CommonPrg::from_key([3u8; 16]), false, &mut p1).unwrap();
            open_b(out.valid(), &mut p1).unwrap()
        });

        let t0 = build(k_b0, valid0);
        let out0 = distinct(&t0, &["[K]".to_string()], SortingProtocol::Bitonic, &mut CommonPrg::from_key([3u8; 16]), true, &mut p0).unwrap();
        let valid0_opened = open_b(out0.valid(), &mut p0).unwrap();
        let valid1_opened = h1.join().unwrap();

        let survivors: i64 = valid0_opened.iter().map(|b| b & 1).sum();
        assert_eq!(survivors, 3);
        assert_eq!(valid0_opened, vec![1, 0, 1, 1, 0, 0]);
        assert_eq!(valid1_opened, valid0_opened);
    }
}
