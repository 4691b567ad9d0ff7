//! Windowing: assign each row a window identifier without revealing which
//! row started which window.
//!
//! `tumbling_window` is a single local division, no sort required.
//! `gap_session_window` and `threshold_session_window` both reduce to the
//! same shape as `aggregate`/`join`: sort so the relevant rows line up,
//! detect secret "start a new window here" bits, then forward-fill each
//! window's identifying value across its run with `segmented_scan_b`
//! (the "keep the earlier value" combine already documented in
//! `segment`).

use orq_crypto::CommonPrg;
use orq_error::{OrqError, OrqResult};
use orq_evector::{BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use orq_protocol::{and_b, div_b, ge, sub_b, Communicator, ProtocolParty, WireCodec};

use crate::segment::{boundary_bits, or_b, segmented_scan_b};
use crate::sort::{sort_table, SortKey, SortingProtocol};
use crate::table::{Column, EncodedTable};

fn clamped_back<T: Elem>(x: &BSharedVector<T>, d: usize) -> OrqResult<BSharedVector<T>> {
    let n = x.len();
    let idx: Vec<usize> = (0..n).map(|i| if i >= d { i - d } else { i }).collect();
    x.mapping_reference(&idx)
}

fn constant_b<T: Elem>(value: T, len: usize, replication: usize, party_id: usize) -> BSharedVector<T> {
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = (0..replication)
        .map(|i| if is_party_zero && i == 0 { Vector::filled(len, value) } else { Vector::filled(len, T::zero()) })
        .collect();
    BSharedVector::from_evector(EVector::new(columns, 0).expect("valid shape"))
}

fn not_bit_b<T: Elem, C>(bit: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let ones = constant_b(T::one(), bit.len(), bit.replication(), party.party_id);
    bit.xor_b(&ones)
}

/// Fixed-width tumbling window: `window_id = timestamp / width`, integer
/// division under B-sharing. No sort needed — every row's window is
/// determined purely by its own timestamp.
pub fn tumbling_window<T, C>(
    table: &EncodedTable<T>,
    timestamp_key: &str,
    width: T,
    window_col: &str,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let ts = table.column_b(timestamp_key)?;
    let width_b = constant_b(width, ts.len(), ts.replication(), party.party_id);
    let (quotient, _remainder) = div_b(ts, &width_b, party)?;
    let mut out = table.clone();
    out.set_column(window_col.to_string(), Column::Boolean(quotient))?;
    Ok(out)
}

/// Gap session window: sorts by `(id, timestamp)`, starts a new window
/// whenever `id` changes or the gap to the previous row's timestamp
/// exceeds `gap`, and forward-fills each window's own start timestamp as
/// its identifier.
#[allow(clippy::too_many_arguments)]
pub fn gap_session_window<T, C>(
    table: &EncodedTable<T>,
    id_key: &str,
    timestamp_key: &str,
    gap: T,
    window_col: &str,
    protocol: SortingProtocol,
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let sort_keys = vec![SortKey::asc(id_key.to_string()), SortKey::asc(timestamp_key.to_string())];
    let sorted = sort_table(table, &sort_keys, protocol, perm_prg, is_pi_holder, party)?;

    let id = sorted.column_b(id_key)?;
    let ts = sorted.column_b(timestamp_key)?.clone();
    let id_boundary = boundary_bits(&[id], party)?;

    let prev_ts = clamped_back(&ts, 1)?;
    let elapsed = sub_b(&ts, &prev_ts, party, true)?;
    let gap_const = constant_b(gap, ts.len(), ts.replication(), party.party_id);
    let gap_exceeded = ge(&elapsed, &gap_const, party)?;

    let new_window = or_b(&id_boundary, &gap_exceeded, party)?;
    let window_start = segmented_scan_b(&new_window, &ts, |l, _r, _p| Ok(l.clone()), party)?;

    let mut out = sorted;
    out.set_column(window_col.to_string(), Column::Boolean(window_start))?;
    Ok(out)
}

/// Threshold session window: sorts by `(id, timestamp)`, marks rows where
/// `value >= threshold` as "inside", groups each maximal inside run
/// (within one `id`) into one window identified by that run's start
/// timestamp, and narrows `VALID` to the inside rows.
#[allow(clippy::too_many_arguments)]
pub fn threshold_session_window<T, C>(
    table: &EncodedTable<T>,
    id_key: &str,
    timestamp_key: &str,
    value_key: &str,
    threshold: T,
    window_col: &str,
    protocol: SortingProtocol,
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if id_key.is_empty() || timestamp_key.is_empty() || value_key.is_empty() {
        return Err(OrqError::invalid_shape("threshold_session_window: key names must be non-empty"));
    }
    let sort_keys = vec![SortKey::asc(id_key.to_string()), SortKey::asc(timestamp_key.to_string())];
    let sorted = sort_table(table, &sort_keys, protocol, perm_prg, is_pi_holder, party)?;

    let id = sorted.column_b(id_key)?;
    let ts = sorted.column_b(timestamp_key)?.clone();
    let value = sorted.column_b(value_key)?;
    let threshold_const = constant_b(threshold, value.len(), value.replication(), party.party_id);
    let inside = ge(value, &threshold_const, party)?;

    let id_boundary = boundary_bits(&[id], party)?;
    let prev_inside = clamped_back(&inside, 1)?;
    let not_prev_inside = not_bit_b(&prev_inside, party)?;
    let not_inside = not_bit_b(&inside, party)?;

    let rising_edge = and_b(&inside, &or_b(&not_prev_inside, &id_boundary, party)?, party)?;
    let falling_edge = and_b(&not_inside, &prev_inside, party)?;
    let new_segment = or_b(&or_b(&rising_edge, &falling_edge, party)?, &id_boundary, party)?;

    let window_start = segmented_scan_b(&new_segment, &ts, |l, _r, _p| Ok(l.clone()), party)?;

    let mut out = sorted;
    out.set_column(window_col.to_string(), Column::Boolean(window_start))?;
    let new_valid = and_b(out.valid(), &inside, party)?;
    out.set_valid(new_valid)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_crypto::{DummyOle, OleProvider};
    use orq_protocol::{open_b, LoopbackCommunicator, Scheme};

    fn b_col(values: Vec<i64>) -> BSharedVector<i64> {
        BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(values)], 0).unwrap())
    }

    fn split_xor(plain: &[i64], mask: &[i64]) -> Vec<i64> {
        plain.iter().zip(mask).map(|(p, m)| p ^ m).collect()
    }

    #[test]
    fn tumbling_window_buckets_by_width() {
        let key = [51u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, 64 * 300).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 64 * 300).unwrap();

        let ts_plain = vec![0i64, 5, 10, 19, 20];
        let ts_mask = vec![3i64, 3, 4, 4, 5];
        let ts0 = b_col(split_xor(&ts_plain, &ts_mask));
        let ts1 = b_col(ts_mask);
        let valid0 = b_col(vec![1i64; 5]);
        let valid1 = b_col(vec![0i64; 5]);

        let t1 = EncodedTable::new(vec![("[TS]".to_string(), Column::Boolean(ts1))], valid1).unwrap();
        let h1 = std::thread::spawn(move || {
            let out = tumbling_window(&t1, "[TS]", 10, "[W]", &mut p1).unwrap();
            open_b(out.column_b("[W]").unwrap(), &mut p1).unwrap()
        });

        let t0 = EncodedTable::new(vec![("[TS]".to_string(), Column::Boolean(ts0))], valid0).unwrap();
        let out0 = tumbling_window(&t0, "[TS]", 10, "[W]", &mut p0).unwrap();
        let opened0 = open_b(out0.column_b("[W]").unwrap(), &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![0, 0, 1, 1, 2]);
        assert_eq!(opened1, opened0);
    }
}
