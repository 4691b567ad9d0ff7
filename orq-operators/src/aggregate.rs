//! Aggregate: sorts so each `K`-group becomes a contiguous run, computes
//! the group boundary bits, then folds every requested column across its
//! group with a per-column combinator via `segment`'s segmented scan. The
//! combinator's result lands on the group's last row (forward, the
//! default) or first row (`reverse`), matching `segmented_scan_a`/
//! `segmented_scan_b`'s own contract — reversing the row order before and
//! after the scan turns "last of group" into "first of group" for free,
//! since `last_of_group(delta)` read backwards is exactly `delta` read
//! forwards.

use orq_crypto::CommonPrg;
use orq_error::{OrqError, OrqResult};
use orq_evector::{ASharedVector, BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use orq_protocol::{and_b, gt, lt, Communicator, ProtocolParty, WireCodec};

use crate::segment::{boundary_bits, last_of_group, or_b, segmented_scan_a, segmented_scan_b};
use crate::select::select_b;
use crate::sort::{drop_column, sort_table, SortKey, SortingProtocol};
use crate::table::{Column, EncodedTable, VALID};

/// How a column folds across a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Sum,
    Min,
    Max,
    Count,
    BitOr,
    Copy,
}

/// One output column of an `aggregate` call: fold `input` across each
/// group with `combinator` and write the result to `output`. `input` is
/// ignored for `Count`.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub input: Option<String>,
    pub output: String,
    pub combinator: Combinator,
}

impl Assignment {
    pub fn new(input: impl Into<String>, output: impl Into<String>, combinator: Combinator) -> Self {
        Assignment { input: Some(input.into()), output: output.into(), combinator }
    }

    pub fn count(output: impl Into<String>) -> Self {
        Assignment { input: None, output: output.into(), combinator: Combinator::Count }
    }
}

fn ones_a<T: Elem>(n: usize, replication: usize, party_id: usize) -> ASharedVector<T> {
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = (0..replication)
        .map(|i| if is_party_zero && i == 0 { Vector::filled(n, T::one()) } else { Vector::filled(n, T::zero()) })
        .collect();
    ASharedVector::from_evector(EVector::new(columns, 0).expect("valid shape"))
}

fn reverse_a<T: Elem>(v: &ASharedVector<T>) -> ASharedVector<T> {
    ASharedVector::from_evector(v.inner.reverse())
}

fn reverse_b<T: Elem>(v: &BSharedVector<T>) -> BSharedVector<T> {
    BSharedVector::from_evector(v.inner.reverse())
}

/// Run a segmented scan either forward (result on the group's last row) or,
/// if `reverse`, over the row-reversed array (result on the group's first
/// row). The reversed boundary flags are just `last_of_group(delta)` read
/// backwards, so no second `boundary_bits` pass is needed.
fn directional_scan_a<T, C>(
    delta: &BSharedVector<T>,
    last: &BSharedVector<T>,
    values: &ASharedVector<T>,
    reverse: bool,
    combine: impl Fn(&ASharedVector<T>, &ASharedVector<T>, &mut ProtocolParty<T, C>) -> OrqResult<ASharedVector<T>>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if !reverse {
        return segmented_scan_a(delta, values, combine, party);
    }
    let rev_delta = reverse_b(last);
    let rev_values = reverse_a(values);
    let scanned = segmented_scan_a(&rev_delta, &rev_values, combine, party)?;
    Ok(reverse_a(&scanned))
}

fn directional_scan_b<T, C>(
    delta: &BSharedVector<T>,
    last: &BSharedVector<T>,
    values: &BSharedVector<T>,
    reverse: bool,
    combine: impl Fn(&BSharedVector<T>, &BSharedVector<T>, &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if !reverse {
        return segmented_scan_b(delta, values, combine, party);
    }
    let rev_delta = reverse_b(last);
    let rev_values = reverse_b(values);
    let scanned = segmented_scan_b(&rev_delta, &rev_values, combine, party)?;
    Ok(reverse_b(&scanned))
}

/// Group `table` by `keys` and fold each `assignments` entry across its
/// group (`aggregate`).
///
/// `do_sort` runs the grouping sort first (set `false` only when the
/// caller already sorted the table by `keys`, invalid rows last). The
/// pre-sort always orders by `VALID` descending ahead of `keys`, so
/// already-dropped rows never split a live group. `mark_valid` narrows
/// `VALID` down to one representative row per group (the row the
/// combinators' results land on); `reverse` picks that representative as
/// the group's first row instead of its last.
#[allow(clippy::too_many_arguments)]
pub fn aggregate<T, C>(
    table: &EncodedTable<T>,
    keys: &[String],
    assignments: &[Assignment],
    do_sort: bool,
    mark_valid: bool,
    reverse: bool,
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
        return Err(OrqError::invalid_shape("aggregate: at least one group-by key is required"));
    }

    let sorted = if do_sort {
        let mut with_valid = table.clone();
        with_valid.set_column(VALID, Column::Boolean(table.valid().clone()))?;
        let mut sort_keys = vec![SortKey::desc(VALID)];
        sort_keys.extend(keys.iter().map(|k| SortKey::asc(k.clone())));
        let sorted_with_valid = sort_table(&with_valid, &sort_keys, protocol, perm_prg, is_pi_holder, party)?;
        drop_column(&sorted_with_valid, VALID)?
    } else {
        table.clone()
    };

    let key_cols: Vec<&BSharedVector<T>> = keys.iter().map(|k| sorted.column_b(k)).collect::<OrqResult<_>>()?;
    let delta = boundary_bits(&key_cols, party)?;
    let last = last_of_group(&delta, party)?;
    let representative = if reverse { delta.clone() } else { last.clone() };

    let mut out = sorted.clone();
    for a in assignments {
        match a.combinator {
            Combinator::Count => {
                let ones = ones_a::<T>(sorted.len(), sorted.valid().replication(), party.party_id);
                let scanned = directional_scan_a(&delta, &last, &ones, reverse, |l, r, _p| l.add_a(r), party)?;
                out.set_column(a.output.clone(), Column::Arithmetic(scanned))?;
            }
            Combinator::Sum => {
                let name = a.input.as_ref().ok_or_else(|| OrqError::invalid_shape("aggregate: Sum needs an input column"))?;
                let input = sorted.column_a(name)?;
                let scanned = directional_scan_a(&delta, &last, input, reverse, |l, r, _p| l.add_a(r), party)?;
                out.set_column(a.output.clone(), Column::Arithmetic(scanned))?;
            }
            Combinator::Min => {
                let name = a.input.as_ref().ok_or_else(|| OrqError::invalid_shape("aggregate: Min needs an input column"))?;
                let input = sorted.column_b(name)?;
                let scanned = directional_scan_b(
                    &delta,
                    &last,
                    input,
                    reverse,
                    |l, r, p| {
                        let l_lt_r = lt(l, r, p)?;
                        select_b(&l_lt_r, l, r, p)
                    },
                    party,
                )?;
                out.set_column(a.output.clone(), Column::Boolean(scanned))?;
            }
            Combinator::Max => {
                let name = a.input.as_ref().ok_or_else(|| OrqError::invalid_shape("aggregate: Max needs an input column"))?;
                let input = sorted.column_b(name)?;
                let scanned = directional_scan_b(
                    &delta,
                    &last,
                    input,
                    reverse,
                    |l, r, p| {
                        let l_gt_r = gt(l, r, p)?;
                        select_b(&l_gt_r, l, r, p)
                    },
                    party,
                )?;
                out.set_column(a.output.clone(), Column::Boolean(scanned))?;
            }
            Combinator::BitOr => {
                let name = a.input.as_ref().ok_or_else(|| OrqError::invalid_shape("aggregate: BitOr needs an input column"))?;
                let input = sorted.column_b(name)?;
                let scanned = directional_scan_b(&delta, &last, input, reverse, |l, r, p| or_b(l, r, p), party)?;
                out.set_column(a.output.clone(), Column::Boolean(scanned))?;
            }
            Combinator::Copy => {
                let name = a.input.as_ref().ok_or_else(|| OrqError::invalid_shape("aggregate: Copy needs an input column"))?;
                let col = sorted.column(name)?.clone();
                out.set_column(a.output.clone(), col)?;
            }
        }
    }

    if mark_valid {
        let new_valid = and_b(out.valid(), &representative, party)?;
        out.set_valid(new_valid)?;
    }

    Ok(out)
}
