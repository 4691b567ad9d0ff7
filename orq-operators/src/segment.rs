//! Segmented scan: aggregate's running combinator, join's payload
//! propagation across a matched run, and the windowing operators'
//! "carry the window start forward" all reduce to the same shape — scan a
//! column while resetting at a secret group boundary. Built once here.
//!
//! Runs as Hillis-Steele doubling, the same technique `prefix_sum::tree`
//! uses, generalised to a *segmented* scan by carrying a second flag
//! column alongside the value and OR-ing it forward identically: round
//! `d` merges row `i` with row `i-d` unless a boundary lies between them,
//! so after `ceil(log2 n)` rounds every row holds the combine of its
//! whole group. `O(n log n)` work, `O(log n)` sequential rounds, same
//! trade as the rest of this crate's tree-shaped scans.

use orq_error::OrqResult;
use orq_evector::{ASharedVector, BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use orq_protocol::{and_b, ne, Communicator, ProtocolParty, WireCodec};

use crate::select::{select_a, select_b};

/// A public boolean constant, broadcast with the single-contributor
/// convention `sort::constant_true_b` uses: only party 0's home share
/// column carries the real values, every other column stays zero, so XOR
/// reconstruction lands on the intended plaintext vector regardless of
/// party count or replication factor.
fn constant_b<T: Elem>(values: Vec<T>, replication: usize, party_id: usize) -> BSharedVector<T> {
    let len = values.len();
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = (0..replication)
        .map(|i| if is_party_zero && i == 0 { Vector::from_vec(values.clone()) } else { Vector::filled(len, T::zero()) })
        .collect();
    BSharedVector::from_evector(EVector::new(columns, 0).expect("valid shape"))
}

/// `x | y` for single-bit B-shares: `a^b^(a&b)`. `orq-protocol` only
/// exports `and_b`/`xor_b` natively; OR is reconstructed from those the
/// same way `division::select` builds its masks.
pub(crate) fn or_b<T, C>(x: &BSharedVector<T>, y: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let both = and_b(x, y, party)?;
    x.xor_b(y)?.xor_b(&both)
}

fn clamped_back(n: usize, d: usize) -> Vec<usize> {
    (0..n).map(|i| if i >= d { i - d } else { i }).collect()
}

fn clamped_fwd(n: usize, d: usize) -> Vec<usize> {
    (0..n).map(|i| if i + d < n { i + d } else { i }).collect()
}

/// Row index list that reverses row order; its own inverse, since
/// applying it twice is the identity.
pub(crate) fn reversed_indices(n: usize) -> Vec<usize> {
    (0..n).rev().collect()
}

/// delta_i = OR over `keys` of `(key_i != key_{i-1})`, forced to 1 at row
/// 0 (group boundaries under a secret sort key).
pub(crate) fn boundary_bits<T, C>(keys: &[&BSharedVector<T>], party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = keys[0].len();
    let replication = keys[0].replication();
    let prev_idx = clamped_back(n, 1);
    let mut first_row = vec![T::zero(); n];
    if n > 0 {
        first_row[0] = T::one();
    }
    let mut delta = constant_b(first_row, replication, party.party_id);
    for k in keys {
        let prev = k.mapping_reference(&prev_idx)?;
        let neq = ne(k, &prev, party)?;
        delta = or_b(&delta, &neq, party)?;
    }
    Ok(delta)
}

/// Marks the last row of each group, given that group's start-of-group
/// boundary bits (forward scans carry their result on the group's last
/// row).
pub(crate) fn last_of_group<T, C>(delta: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = delta.len();
    let next_idx = clamped_fwd(n, 1);
    let next_delta = delta.mapping_reference(&next_idx)?;
    let mut last_row = vec![T::zero(); n];
    if n > 0 {
        last_row[n - 1] = T::one();
    }
    let last_mask = constant_b(last_row, delta.replication(), party.party_id);
    or_b(&next_delta, &last_mask, party)
}

fn splice_prefix_a<T: Elem>(original: &ASharedVector<T>, updated: &ASharedVector<T>, prefix_len: usize) -> ASharedVector<T> {
    let n = original.len();
    let p = prefix_len.min(n);
    let columns: Vec<Vector<T>> = original
        .inner
        .columns()
        .iter()
        .zip(updated.inner.columns().iter())
        .map(|(o, u)| Vector::from_vec((0..n).map(|i| if i < p { o.get(i) } else { u.get(i) }).collect()))
        .collect();
    ASharedVector::from_evector(EVector::new(columns, original.precision()).expect("same shape"))
}

fn splice_prefix_b<T: Elem>(original: &BSharedVector<T>, updated: &BSharedVector<T>, prefix_len: usize) -> BSharedVector<T> {
    let n = original.len();
    let p = prefix_len.min(n);
    let columns: Vec<Vector<T>> = original
        .inner
        .columns()
        .iter()
        .zip(updated.inner.columns().iter())
        .map(|(o, u)| Vector::from_vec((0..n).map(|i| if i < p { o.get(i) } else { u.get(i) }).collect()))
        .collect();
    BSharedVector::from_evector(EVector::new(columns, 0).expect("same shape"))
}

/// Forward inclusive segmented scan: row `i` ends up holding
/// `combine(..combine(combine(v_k, v_{k+1}), v_{k+2}).., v_i)` for `k` the
/// start of `i`'s group. `combine` is always called `(earlier, later)`
/// and need not be commutative (join/window use this for "keep the
/// earlier value", i.e. forward-fill).
pub(crate) fn segmented_scan_a<T, C>(
    delta: &BSharedVector<T>,
    values: &ASharedVector<T>,
    combine: impl Fn(&ASharedVector<T>, &ASharedVector<T>, &mut ProtocolParty<T, C>) -> OrqResult<ASharedVector<T>>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = values.len();
    if n <= 1 {
        return Ok(values.clone());
    }
    let mut value = values.clone();
    let mut flag = delta.clone();
    let mut d = 1;
    while d < n {
        let idx = clamped_back(n, d);
        let shifted_value = value.mapping_reference(&idx)?;
        let shifted_flag = flag.mapping_reference(&idx)?;
        let combined = combine(&shifted_value, &value, party)?;
        let candidate = select_a(&flag, &value, &combined, party)?;
        let new_flag = or_b(&flag, &shifted_flag, party)?;
        value = splice_prefix_a(&value, &candidate, d);
        flag = splice_prefix_b(&flag, &new_flag, d);
        d *= 2;
    }
    Ok(value)
}

/// Boolean analogue of [`segmented_scan_a`].
pub(crate) fn segmented_scan_b<T, C>(
    delta: &BSharedVector<T>,
    values: &BSharedVector<T>,
    combine: impl Fn(&BSharedVector<T>, &BSharedVector<T>, &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = values.len();
    if n <= 1 {
        return Ok(values.clone());
    }
    let mut value = values.clone();
    let mut flag = delta.clone();
    let mut d = 1;
    while d < n {
        let idx = clamped_back(n, d);
        let shifted_value = value.mapping_reference(&idx)?;
        let shifted_flag = flag.mapping_reference(&idx)?;
        let combined = combine(&shifted_value, &value, party)?;
        let candidate = select_b(&flag, &value, &combined, party)?;
        let new_flag = or_b(&flag, &shifted_flag, party)?;
        value = splice_prefix_b(&value, &candidate, d);
        flag = splice_prefix_b(&flag, &new_flag, d);
        d *= 2;
    }
    Ok(value)
}

/// Forward-scan `values` under `combine`, then carry each group's final
/// (last-row) result backward onto every row of that group — the shape
/// join's payload propagation needs ("every row of the match sees the
/// group's combined value"), distinct from `segmented_scan_a`'s own
/// contract of landing the result on the group's last row only.
pub(crate) fn broadcast_group_a<T, C>(
    delta: &BSharedVector<T>,
    values: &ASharedVector<T>,
    combine: impl Fn(&ASharedVector<T>, &ASharedVector<T>, &mut ProtocolParty<T, C>) -> OrqResult<ASharedVector<T>>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let scanned = segmented_scan_a(delta, values, combine, party)?;
    let last = last_of_group(delta, party)?;
    let rev_last = BSharedVector::from_evector(last.inner.reverse());
    let rev_scanned = ASharedVector::from_evector(scanned.inner.reverse());
    let rev_broadcast = segmented_scan_a(&rev_last, &rev_scanned, |l, _r, _p| Ok(l.clone()), party)?;
    Ok(ASharedVector::from_evector(rev_broadcast.inner.reverse()))
}

/// Boolean analogue of [`broadcast_group_a`].
pub(crate) fn broadcast_group_b<T, C>(
    delta: &BSharedVector<T>,
    values: &BSharedVector<T>,
    combine: impl Fn(&BSharedVector<T>, &BSharedVector<T>, &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let scanned = segmented_scan_b(delta, values, combine, party)?;
    let last = last_of_group(delta, party)?;
    let rev_last = BSharedVector::from_evector(last.inner.reverse());
    let rev_scanned = BSharedVector::from_evector(scanned.inner.reverse());
    let rev_broadcast = segmented_scan_b(&rev_last, &rev_scanned, |l, _r, _p| Ok(l.clone()), party)?;
    Ok(BSharedVector::from_evector(rev_broadcast.inner.reverse()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_crypto::{DummyOle, OleProvider};
    use orq_protocol::{open_a, open_b, LoopbackCommunicator, Scheme};

    fn b_col(values: Vec<i64>) -> BSharedVector<i64> {
        BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(values)], 0).unwrap())
    }

    fn a_col(values: Vec<i64>) -> ASharedVector<i64> {
        ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(values)], 0).unwrap())
    }

    fn split_xor(plain: &[i64], mask: &[i64]) -> Vec<i64> {
        plain.iter().zip(mask).map(|(p, m)| p ^ m).collect()
    }

    fn split_add(plain: &[i64], mask: &[i64]) -> Vec<i64> {
        plain.iter().zip(mask).map(|(p, m)| p.wrapping_sub(*m)).collect()
    }

    #[test]
    fn segmented_sum_matches_plaintext_group_sums() {
        // groups: [1,1,1] [2,2] [3], keys [0,0,0,1,1,2], data all 1s, so
        // each row's inclusive-sum-within-group should be 1,2,3,1,2,1.
        let key = [7u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, 4_000).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 4_000).unwrap();
        p0.triples.reserve_mul_triples(&mut ole0, 2_000).unwrap();
        p1.triples.reserve_mul_triples(&mut ole1, 2_000).unwrap();

        let keys_plain = vec![0i64, 0, 0, 1, 1, 2];
        let keys_mask = vec![3i64, 1, 4, 1, 5, 9];
        let k_b0 = b_col(split_xor(&keys_plain, &keys_mask));
        let k_b1 = b_col(keys_mask);
        let ones_mask = vec![2i64, 2, 2, 2, 2, 2];
        let ones0 = a_col(split_add(&[1; 6], &ones_mask));
        let ones1 = a_col(ones_mask);

        let h1 = std::thread::spawn(move || {
            let delta = boundary_bits(&[&k_b1], &mut p1).unwrap();
            let scanned = segmented_scan_a(&delta, &ones1, |l, r, _p| l.add_a(r), &mut p1).unwrap();
            open_a(&scanned, &mut p1).unwrap()
        });
        let delta0 = boundary_bits(&[&k_b0], &mut p0).unwrap();
        let scanned0 = segmented_scan_a(&delta0, &ones0, |l, r, _p| l.add_a(r), &mut p0).unwrap();
        let opened0 = open_a(&scanned0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![1, 2, 3, 1, 2, 1]);
        assert_eq!(opened1, vec![1, 2, 3, 1, 2, 1]);
    }

    #[test]
    fn last_of_group_marks_group_ends() {
        let key = [8u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, 2_000).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 2_000).unwrap();

        let keys_plain = vec![0i64, 0, 1, 1, 1, 2];
        let keys_mask = vec![6i64, 6, 7, 7, 8, 8];
        let k_b0 = b_col(split_xor(&keys_plain, &keys_mask));
        let k_b1 = b_col(keys_mask);

        let h1 = std::thread::spawn(move || {
            let delta = boundary_bits(&[&k_b1], &mut p1).unwrap();
            let last = last_of_group(&delta, &mut p1).unwrap();
            open_b(&last, &mut p1).unwrap()
        });
        let delta0 = boundary_bits(&[&k_b0], &mut p0).unwrap();
        let last0 = last_of_group(&delta0, &mut p0).unwrap();
        let opened0 = open_b(&last0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![0, 1, 0, 0, 1, 1]);
        assert_eq!(opened1, vec![0, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn broadcast_group_a_spreads_group_sum_to_every_row() {
        // same groups as the segmented-sum test: [1,1,1] [2,2] [3], so every
        // row should end up holding its own group's total: 3,3,3,2,2,1.
        let key = [13u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, 6_000).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 6_000).unwrap();
        p0.triples.reserve_mul_triples(&mut ole0, 3_000).unwrap();
        p1.triples.reserve_mul_triples(&mut ole1, 3_000).unwrap();

        let keys_plain = vec![0i64, 0, 0, 1, 1, 2];
        let keys_mask = vec![3i64, 1, 4, 1, 5, 9];
        let k_b0 = b_col(split_xor(&keys_plain, &keys_mask));
        let k_b1 = b_col(keys_mask);
        let ones_mask = vec![2i64, 2, 2, 2, 2, 2];
        let ones0 = a_col(split_add(&[1; 6], &ones_mask));
        let ones1 = a_col(ones_mask);

        let h1 = std::thread::spawn(move || {
            let delta = boundary_bits(&[&k_b1], &mut p1).unwrap();
            let spread = broadcast_group_a(&delta, &ones1, |l, r, _p| l.add_a(r), &mut p1).unwrap();
            open_a(&spread, &mut p1).unwrap()
        });
        let delta0 = boundary_bits(&[&k_b0], &mut p0).unwrap();
        let spread0 = broadcast_group_a(&delta0, &ones0, |l, r, _p| l.add_a(r), &mut p0).unwrap();
        let opened0 = open_a(&spread0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![3, 3, 3, 2, 2, 1]);
        assert_eq!(opened1, vec![3, 3, 3, 2, 2, 1]);
    }
}
