//! Oblivious sort: three protocols sharing the same row-level primitives
//! (`select_table` from `select.rs`, `shuffle_table` from `shuffle.rs`).
//!
//! `bitonic_sort` builds Batcher's network directly from repeated
//! compare-exchange passes, generalised from `merge::odd_even_merge` to a
//! compound, possibly-multi-column key (lexicographic: later keys only
//! decide ties left by earlier ones). It needs a power-of-two row count,
//! like the merge it is built from.
//!
//! `radix_sort` and `quicksort` both route rows by a *secret* destination
//! rank rather than a public compare-exchange index grid, so neither can
//! use `apply_mapping` directly (that API takes a plaintext permutation
//! identical on both sides of the wire). Both go through `partition_by_bit`,
//! which derives the rank from a boundary bit under B-sharing, shuffles the
//! table and that rank together with a fresh sharded-permutation
//! correlation so the rank is no longer linkable to original row identity,
//! and only then opens it to drive `apply_mapping` — the same
//! shuffle-then-reveal decorrelation `shuffle_table` itself relies on,
//! composed with one extra reveal. This ties radix/quicksort's
//! obliviousness to the two-party sharded-permutation correlation, same
//! restriction `shuffle_table` already carries.

use orq_error::{OrqError, OrqResult};
use orq_crypto::{CommonPrg, ShardedPermutationGenerator};
use orq_evector::{ASharedVector, BSharedVector, EVector};
use orq_vector::{Elem, Vector};
use num_traits::ToPrimitive;

use orq_protocol::{and_b, b2a_bit, equal, gt, open_a, Communicator, ProtocolParty, WireCodec};

use crate::prefix_sum::{exclusive_prefix_sum, prefix_sum_direct};
use crate::select::select_table;
use crate::shuffle::shuffle_table;
use crate::table::{Column, EncodedTable};

/// One column to sort by, plus its direction. A table's rows are ordered
/// lexicographically across a `&[SortKey]` list: later keys break ties
/// left by earlier ones.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub name: String,
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(name: impl Into<String>) -> Self {
        SortKey { name: name.into(), ascending: true }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        SortKey { name: name.into(), ascending: false }
    }

    fn flipped(&self) -> Self {
        SortKey { name: self.name.clone(), ascending: !self.ascending }
    }
}

/// Which network realises `sort_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortingProtocol {
    /// Batcher's bitonic network: `O(n log^2 n)` comparisons, any key
    /// type, table length must be a power of two.
    Bitonic,
    /// LSD stable partition by one key bit at a time: no pairwise
    /// comparisons at all, but each pass reveals that pass's destination
    /// ranks (decorrelated from row identity by a fresh shuffle first —
    /// see module docs). Two-party only.
    Radix,
    /// Oblivious quicksort: every level issues every comparison against
    /// the pivot (no branching on the outcome), then partitions exactly
    /// like one `radix_sort` bit-pass. Two-party only, same ranking
    /// caveat as `Radix`.
    Quicksort,
}

/// Entry point dispatching on `protocol`. `perm_prg` and `is_pi_holder`
/// are only consumed by `Radix`/`Quicksort`; `Bitonic` ignores them.
pub fn sort_table<T, C>(
    table: &EncodedTable<T>,
    keys: &[SortKey],
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
        return Err(OrqError::invalid_shape("sort_table: at least one sort key is required"));
    }
    log::debug!("sort_table: {} rows via {:?}", table.len(), protocol);
    match protocol {
        SortingProtocol::Bitonic => bitonic_sort(table, keys, party),
        SortingProtocol::Radix => radix_sort(table, keys, perm_prg, is_pi_holder, party),
        SortingProtocol::Quicksort => quicksort(table, keys, perm_prg, is_pi_holder, party),
    }
}

fn bit_width<T: Elem>() -> u32 {
    std::mem::size_of::<T>() as u32 * 8
}

/// Public constant `true`, B-shared: only party 0's home column carries
/// it, every other column stays zero (the same single-contributor
/// convention `orq-protocol`'s adders use for public constants) so XOR
/// reconstruction cancels correctly regardless of party count.
fn constant_true_b<T: Elem>(len: usize, replication: usize, party_id: usize) -> BSharedVector<T> {
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = (0..replication)
        .map(|i| if is_party_zero && i == 0 { Vector::filled(len, T::one()) } else { Vector::filled(len, T::zero()) })
        .collect();
    BSharedVector::from_evector(EVector::new(columns, 0).expect("valid shape"))
}

fn not_bit<T: Elem>(bit: &BSharedVector<T>, party_id: usize) -> OrqResult<BSharedVector<T>> {
    bit.xor_b(&constant_true_b(bit.len(), bit.replication(), party_id))
}

/// Single bit at `pos`, shifted down to position 0 (mirrors
/// `orq_protocol::comparison::shift_down_and_mask`, private to that
/// crate).
fn bit_at<T: Elem>(x: &BSharedVector<T>, pos: u32) -> OrqResult<BSharedVector<T>> {
    x.shr(pos).band_public(T::one())
}

/// `1 - x` for an arithmetic 0/1 share: negate every column, then bump
/// party 0's home column by the public constant 1 (arithmetic shares
/// reconstruct by summing, so a public constant only needs to land on
/// one contributor).
fn one_minus_a<T: Elem>(x: &ASharedVector<T>, party_id: usize) -> ASharedVector<T> {
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = x
        .inner
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let bump = is_party_zero && i == 0;
            let data: Vec<T> = c
                .to_plain_vec()
                .into_iter()
                .map(|v| {
                    let negated = T::zero().wrapping_sub(&v);
                    if bump { negated.wrapping_add(&T::one()) } else { negated }
                })
                .collect();
            Vector::from_vec(data)
        })
        .collect();
    ASharedVector::from_evector(EVector::new(columns, x.precision()).expect("same shape"))
}

/// Replicate the last (inclusive-sum) entry of `x` across every position
/// — local, since each party simply repeats its own share value.
fn broadcast_last<T: Elem>(x: &ASharedVector<T>) -> ASharedVector<T> {
    let n = x.len();
    let columns: Vec<Vector<T>> =
        x.inner.columns().iter().map(|c| Vector::filled(n, c.get(n.saturating_sub(1)))).collect();
    ASharedVector::from_evector(EVector::new(columns, x.precision()).expect("same shape"))
}

fn select_a<T, C>(
    mask_bit: &BSharedVector<T>,
    on_true: &ASharedVector<T>,
    on_false: &ASharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    use orq_protocol::mul_a;
    let mask_a = b2a_bit(mask_bit, party)?;
    let diff = on_true.sub_a(on_false)?;
    let scaled = mul_a(&diff, &mask_a, party, true)?;
    on_false.add_a(&scaled)
}

/// Drop a transient column (sort's helper columns never reuse bracket
/// names from the caller's schema).
pub(crate) fn drop_column<T: Elem>(table: &EncodedTable<T>, name: &str) -> OrqResult<EncodedTable<T>> {
    let columns: Vec<(String, Column<T>)> = table
        .names()
        .iter()
        .filter(|n| n.as_str() != name)
        .map(|n| Ok((n.clone(), table.column(n)?.clone())))
        .collect::<OrqResult<_>>()?;
    let mut out = EncodedTable::new(columns, table.valid().clone())?;
    if let Some(u) = table.uniq() {
        out.set_uniq(u.clone())?;
    }
    Ok(out)
}

// ---------------------------------------------------------------------
// Bitonic
// ---------------------------------------------------------------------

/// Lexicographic row comparator across every key: a later key only
/// contributes once every earlier key has compared equal (same
/// accumulate-eq/accumulate-gt pattern `comparison::compare` uses
/// per-bit, lifted here to per-column).
fn row_gt<T, C>(
    lo_rows: &EncodedTable<T>,
    hi_rows: &EncodedTable<T>,
    keys: &[SortKey],
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let m = lo_rows.len();
    let replication = lo_rows.valid().replication();
    let party_id = party.party_id;
    let mut gt_acc: BSharedVector<T> = BSharedVector::from_evector(EVector::zeros(m, replication, 0));
    let mut eq_acc: BSharedVector<T> = constant_true_b(m, replication, party_id);
    for key in keys {
        let lo_key = lo_rows.column_b(&key.name)?;
        let hi_key = hi_rows.column_b(&key.name)?;
        let this_gt = if key.ascending { gt(lo_key, hi_key, party)? } else { gt(hi_key, lo_key, party)? };
        let this_eq = equal(lo_key, hi_key, party)?;
        let contributes = and_b(&eq_acc, &this_gt, party)?;
        gt_acc = gt_acc.xor_b(&contributes)?;
        eq_acc = and_b(&eq_acc, &this_eq, party)?;
    }
    Ok(gt_acc)
}

fn compare_exchange_multi<T, C>(
    table: &EncodedTable<T>,
    lo_idx: &[usize],
    hi_idx: &[usize],
    keys: &[SortKey],
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let lo_rows = table.gather(lo_idx)?;
    let hi_rows = table.gather(hi_idx)?;
    let out_of_order = row_gt(&lo_rows, &hi_rows, keys, party)?;
    let new_lo = select_table(&out_of_order, &hi_rows, &lo_rows, party)?;
    let new_hi = select_table(&out_of_order, &lo_rows, &hi_rows, party)?;
    let scattered = table.scatter_rows(lo_idx, &new_lo)?;
    scattered.scatter_rows(hi_idx, &new_hi)
}

/// Merge `table[start..end)`, already bitonic under `keys`, into sorted
/// order (`merge::odd_even_merge` generalised to a compound key).
fn merge_block<T, C>(
    table: &EncodedTable<T>,
    keys: &[SortKey],
    start: usize,
    end: usize,
    ascending: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let flipped: Vec<SortKey>;
    let effective_keys: &[SortKey] = if ascending {
        keys
    } else {
        flipped = keys.iter().map(SortKey::flipped).collect();
        &flipped
    };

    let mut current = table.clone();
    let mut stride = (end - start) / 2;
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
        current = compare_exchange_multi(&current, &lo_idx, &hi_idx, effective_keys, party)?;
        stride /= 2;
    }
    Ok(current)
}

/// Batcher's bitonic sort, built bottom-up: at stage `k` adjacent
/// already-sorted blocks of size `k/2` in alternating direction form a
/// bitonic sequence of size `k`, and merging it (the same network that
/// sorts a length-1 "block" trivially at `k=2`) grows the sorted block.
pub fn bitonic_sort<T, C>(
    table: &EncodedTable<T>,
    keys: &[SortKey],
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = table.len();
    if n == 0 || n == 1 {
        return Ok(table.clone());
    }
    if n & (n - 1) != 0 {
        return Err(OrqError::invalid_shape("bitonic_sort: table length must be a power of two"));
    }
    let mut current = table.clone();
    let mut k = 2;
    while k <= n {
        let mut start = 0;
        while start < n {
            let block_ascending = (start / k) % 2 == 0;
            current = merge_block(&current, keys, start, start + k, block_ascending, party)?;
            start += k;
        }
        k *= 2;
    }
    Ok(current)
}

// ---------------------------------------------------------------------
// Partition-by-bit: shared routing step for radix and quicksort
// ---------------------------------------------------------------------

/// Stable two-way partition by a secret 0/1 `mask` (rows with `mask=0`
/// before rows with `mask=1`, relative order inside each group
/// preserved). Returns the repartitioned table and the size of the
/// `mask=0` group.
///
/// The destination rank is computed under arithmetic sharing (prefix sum
/// of the bit), then routed by shuffling table and rank together with a
/// fresh sharded-permutation correlation and opening the rank only after
/// that shuffle — by then it no longer links back to which original row
/// it came from, so revealing it exposes the partition's *shape*, not
/// the `mask` bit of any particular original row.
fn partition_by_bit<T, C>(
    table: &EncodedTable<T>,
    mask: &BSharedVector<T>,
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<(EncodedTable<T>, usize)>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = table.len();
    let party_id = party.party_id;
    let mask_a = b2a_bit(mask, party)?;
    let not_mask_a = one_minus_a(&mask_a, party_id);

    let zeros_before = exclusive_prefix_sum(&not_mask_a);
    let ones_before = exclusive_prefix_sum(&mask_a);
    let total_zeros = broadcast_last(&prefix_sum_direct(&not_mask_a));
    let ones_dest = ones_before.add_a(&total_zeros)?;
    let rank = select_a(mask, &ones_dest, &zeros_before, party)?;

    let mut tagged = table.clone();
    tagged.set_column("__RANK__", Column::Arithmetic(rank))?;

    let gen = ShardedPermutationGenerator::new(is_pi_holder);
    let (mut a_perm, mut b_perm) = gen.get_next_pair::<T>(perm_prg, n);
    let shuffled = shuffle_table(&tagged, &mut a_perm, &mut b_perm, party, is_pi_holder)?;

    let rank_col = shuffled.column_a("__RANK__")?.clone();
    let rank_plain = open_a(&rank_col, party)?;
    let split_plain = open_a(&total_zeros.slice(0, 1)?, party)?;
    let split =
        split_plain[0].to_usize().ok_or_else(|| OrqError::invalid_shape("partition_by_bit: split out of usize range"))?;

    let mut inv = vec![0usize; n];
    for (i, r) in rank_plain.iter().enumerate() {
        let dest = r.to_usize().ok_or_else(|| OrqError::invalid_shape("partition_by_bit: rank out of usize range"))?;
        if dest >= n {
            return Err(OrqError::invalid_shape("partition_by_bit: rank out of bounds"));
        }
        inv[dest] = i;
    }
    let routed = shuffled.apply_mapping(&inv)?;
    Ok((drop_column(&routed, "__RANK__")?, split))
}

// ---------------------------------------------------------------------
// Radix
// ---------------------------------------------------------------------

/// LSD radix sort: one `partition_by_bit` pass per bit, least-significant
/// first. Multiple keys compose the usual stable-sort way — process the
/// *last* key's bits first so later (higher-priority) keys' passes
/// preserve the order already established by it. Descending keys
/// partition on the complemented bit, which reverses the final order
/// because an unsigned bitwise complement reverses unsigned numeric order
/// bit-for-bit.
pub fn radix_sort<T, C>(
    table: &EncodedTable<T>,
    keys: &[SortKey],
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let w = bit_width::<T>();
    let party_id = party.party_id;
    let mut current = table.clone();
    for key in keys.iter().rev() {
        for bit in 0..w {
            let col = current.column_b(&key.name)?;
            let digit = bit_at(col, bit)?;
            let mask = if key.ascending { digit } else { not_bit(&digit, party_id)? };
            current = partition_by_bit(&current, &mask, perm_prg, is_pi_holder, party)?.0;
        }
    }
    Ok(current)
}

// ---------------------------------------------------------------------
// Quicksort
// ---------------------------------------------------------------------

/// Oblivious quicksort: every row is compared against the pivot
/// regardless of where the split will land (no branch reveals the
/// comparison outcome), and the partition step is exactly one
/// `partition_by_bit` call. The first row of the current range is always
/// the pivot and, by construction, keeps rank 0 within the `mask=0`
/// group, so it never needs to move again once partitioned; recursion
/// excludes it from both halves.
pub fn quicksort<T, C>(
    table: &EncodedTable<T>,
    keys: &[SortKey],
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    quicksort_range(table, keys, 0, table.len(), perm_prg, is_pi_holder, party)
}

fn quicksort_range<T, C>(
    table: &EncodedTable<T>,
    keys: &[SortKey],
    lo: usize,
    hi: usize,
    perm_prg: &mut CommonPrg,
    is_pi_holder: bool,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if hi.saturating_sub(lo) <= 1 {
        return Ok(table.clone());
    }
    let sub = table.slice(lo, hi)?;
    let n = sub.len();
    let pivot_row = sub.slice(0, 1)?;
    let pivot_broadcast = pivot_row.gather(&vec![0usize; n])?;

    let mask = row_gt(&sub, &pivot_broadcast, keys, party)?;
    let (partitioned, split) = partition_by_bit(&sub, &mask, perm_prg, is_pi_holder, party)?;

    let range_idx: Vec<usize> = (lo..hi).collect();
    let merged = table.scatter_rows(&range_idx, &partitioned)?;

    let left = quicksort_range(&merged, keys, lo + 1, lo + split.max(1), perm_prg, is_pi_holder, party)?;
    quicksort_range(&left, keys, lo + split.max(1), hi, perm_prg, is_pi_holder, party)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_crypto::{DummyOle, OleProvider};
    use orq_evector::EVector;
    use orq_protocol::{open_b, LoopbackCommunicator, Scheme};
    use orq_vector::Vector as V;

    fn b_col(values: Vec<i64>) -> BSharedVector<i64> {
        BSharedVector::from_evector(EVector::new(vec![V::from_vec(values)], 0).unwrap())
    }

    fn setup(n_and: usize, n_mul: usize) -> (ProtocolParty<i64, LoopbackCommunicator>, ProtocolParty<i64, LoopbackCommunicator>) {
        let key = [8u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, n_and).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, n_and).unwrap();
        p0.triples.reserve_mul_triples(&mut ole0, n_mul).unwrap();
        p1.triples.reserve_mul_triples(&mut ole1, n_mul).unwrap();
        (p0, p1)
    }

    fn shared_table(plain: Vec<i64>, mask0: Vec<i64>) -> (EncodedTable<i64>, EncodedTable<i64>) {
        let s1: Vec<i64> = plain.iter().zip(&mask0).map(|(p, m)| p ^ m).collect();
        let n = plain.len();
        let t0 =
            EncodedTable::new(vec![("[K]".to_string(), Column::Boolean(b_col(mask0)))], b_col(vec![1; n])).unwrap();
        let t1 = EncodedTable::new(vec![("[K]".to_string(), Column::Boolean(b_col(s1)))], b_col(vec![0; n])).unwrap();
        (t0, t1)
    }

    #[test]
    fn bitonic_sort_orders_ascending() {
        let plain = vec![4i64, 1, 3, 2];
        let mask0 = vec![9i64, 9, 9, 9];
        let (t0, t1) = shared_table(plain, mask0);
        let (mut p0, mut p1) = setup(20_000, 2_000);

        let h1 = std::thread::spawn(move || {
            let sorted1 = bitonic_sort(&t1, &[SortKey::asc("[K]")], &mut p1).unwrap();
            open_b(sorted1.column_b("[K]").unwrap(), &mut p1).unwrap()
        });
        let sorted0 = bitonic_sort(&t0, &[SortKey::asc("[K]")], &mut p0).unwrap();
        let opened0 = open_b(sorted0.column_b("[K]").unwrap(), &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![1, 2, 3, 4]);
        assert_eq!(opened1, vec![1, 2, 3, 4]);
    }

    #[test]
    fn radix_sort_orders_ascending() {
        let plain = vec![3i8 as i64, 0, 2, 1];
        let mask0 = vec![5i64, 5, 5, 5];
        let (t0, t1) = shared_table(plain, mask0);
        let (mut p0, mut p1) = setup(200, 200);

        let key0 = [40u8; 16];
        let key1 = [40u8; 16];
        let mut prg0 = CommonPrg::from_key(key0);
        let mut prg1 = CommonPrg::from_key(key1);

        let h1 = std::thread::spawn(move || {
            let sorted1 = radix_sort(&t1, &[SortKey::asc("[K]")], &mut prg1, false, &mut p1).unwrap();
            open_b(sorted1.column_b("[K]").unwrap(), &mut p1).unwrap()
        });
        let sorted0 = radix_sort(&t0, &[SortKey::asc("[K]")], &mut prg0, true, &mut p0).unwrap();
        let opened0 = open_b(sorted0.column_b("[K]").unwrap(), &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![0, 1, 2, 3]);
        assert_eq!(opened1, vec![0, 1, 2, 3]);
    }

    #[test]
    fn quicksort_orders_ascending() {
        let plain = vec![3i64, 1, 0, 2];
        let mask0 = vec![5i64, 5, 5, 5];
        let (t0, t1) = shared_table(plain, mask0);
        let (mut p0, mut p1) = setup(20_000, 2_000);

        let key0 = [41u8; 16];
        let key1 = [41u8; 16];
        let mut prg0 = CommonPrg::from_key(key0);
        let mut prg1 = CommonPrg::from_key(key1);

        let h1 = std::thread::spawn(move || {
            let sorted1 = quicksort(&t1, &[SortKey::asc("[K]")], &mut prg1, false, &mut p1).unwrap();
            open_b(sorted1.column_b("[K]").unwrap(), &mut p1).unwrap()
        });
        let sorted0 = quicksort(&t0, &[SortKey::asc("[K]")], &mut prg0, true, &mut p0).unwrap();
        let opened0 = open_b(sorted0.column_b("[K]").unwrap(), &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, vec![0, 1, 2, 3]);
        assert_eq!(opened1, vec![0, 1, 2, 3]);
    }
}
