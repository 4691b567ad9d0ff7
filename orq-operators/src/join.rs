//! Join: concatenates both sides with a side tag, sorts by `(K, side)` so
//! each matched group becomes one contiguous run with its left row(s)
//! first, then propagates payload columns across the run and rewrites
//! `VALID` according to the requested `JoinKind`.
//!
//! Payload columns absent on one side are zero/false-padded before the
//! concatenation; propagating them across the matched run via `Sum`
//! (arithmetic) or `BitOr` (boolean) reproduces "copy the one real value
//! present" without ever branching on which side actually held it,
//! *provided* at most one row per side contributes a non-padding value per
//! key (a foreign-key/unique-key join; see DESIGN.md). True multi-row
//! fan-out across either side is out of scope.

use orq_crypto::CommonPrg;
use orq_error::{OrqError, OrqResult};
use orq_evector::{ASharedVector, BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use orq_protocol::{and_b, gt, lt, Communicator, ProtocolParty, WireCodec};

use crate::aggregate::Combinator;
use crate::segment::{boundary_bits, broadcast_group_a, broadcast_group_b, or_b};
use crate::select::select_b;
use crate::sort::{sort_table, SortKey, SortingProtocol};
use crate::table::{Column, EncodedTable};

/// Which rows survive a join and whose `VALID` drives the result.
/// `Inner`/`Semi`/`Anti` only ever keep rows on one side of the
/// concatenation (right for `Inner`, left for `Semi`/`Anti`); the outer
/// variants keep one or both sides unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Semi,
    Anti,
    LeftOuter,
    RightOuter,
    FullOuter,
}

/// One payload column to propagate across a matched key-group. At least
/// one of `left`/`right` must be set; `combinator` must match the
/// column's own encoding (`Sum`/`Copy` for arithmetic, `BitOr`/`Min`/`Max`/
/// `Copy` for boolean).
#[derive(Debug, Clone)]
pub struct JoinAssignment {
    pub left: Option<String>,
    pub right: Option<String>,
    pub output: String,
    pub combinator: Combinator,
}

impl JoinAssignment {
    pub fn both(left: impl Into<String>, right: impl Into<String>, output: impl Into<String>, combinator: Combinator) -> Self {
        JoinAssignment { left: Some(left.into()), right: Some(right.into()), output: output.into(), combinator }
    }

    pub fn left_only(left: impl Into<String>, output: impl Into<String>, combinator: Combinator) -> Self {
        JoinAssignment { left: Some(left.into()), right: None, output: output.into(), combinator }
    }

    pub fn right_only(right: impl Into<String>, output: impl Into<String>, combinator: Combinator) -> Self {
        JoinAssignment { left: None, right: Some(right.into()), output: output.into(), combinator }
    }
}

fn side_tag_b<T: Elem>(n_left: usize, n_right: usize, replication: usize, party_id: usize) -> BSharedVector<T> {
    let mut plain = vec![T::zero(); n_left];
    plain.extend(std::iter::repeat(T::one()).take(n_right));
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = (0..replication)
        .map(|i| if is_party_zero && i == 0 { Vector::from_vec(plain.clone()) } else { Vector::filled(n_left + n_right, T::zero()) })
        .collect();
    BSharedVector::from_evector(EVector::new(columns, 0).expect("valid shape"))
}

fn constant_one_b<T: Elem>(len: usize, replication: usize, party_id: usize) -> BSharedVector<T> {
    let is_party_zero = party_id == 0;
    let columns: Vec<Vector<T>> = (0..replication)
        .map(|i| if is_party_zero && i == 0 { Vector::filled(len, T::one()) } else { Vector::filled(len, T::zero()) })
        .collect();
    BSharedVector::from_evector(EVector::new(columns, 0).expect("valid shape"))
}

fn not_bit_b<T: Elem, C>(bit: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let ones = constant_one_b::<T>(bit.len(), bit.replication(), party.party_id);
    bit.xor_b(&ones)
}

fn zero_a<T: Elem>(n: usize, replication: usize, precision: u32) -> ASharedVector<T> {
    ASharedVector::from_evector(EVector::zeros(n, replication, precision))
}

fn zero_b<T: Elem>(n: usize, replication: usize) -> BSharedVector<T> {
    BSharedVector::from_evector(EVector::zeros(n, replication, 0))
}

fn concat_a<T: Elem>(l: &ASharedVector<T>, r: &ASharedVector<T>) -> OrqResult<ASharedVector<T>> {
    if l.precision() != r.precision() {
        return Err(OrqError::invalid_shape("join: precision mismatch between sides"));
    }
    let columns: Vec<Vector<T>> = l
        .inner
        .columns()
        .iter()
        .zip(r.inner.columns())
        .map(|(a, b)| {
            let mut v = a.to_plain_vec();
            v.extend(b.to_plain_vec());
            Vector::from_vec(v)
        })
        .collect();
    Ok(ASharedVector::from_evector(EVector::new(columns, l.precision())?))
}

fn concat_b<T: Elem>(l: &BSharedVector<T>, r: &BSharedVector<T>) -> OrqResult<BSharedVector<T>> {
    let columns: Vec<Vector<T>> = l
        .inner
        .columns()
        .iter()
        .zip(r.inner.columns())
        .map(|(a, b)| {
            let mut v = a.to_plain_vec();
            v.extend(b.to_plain_vec());
            Vector::from_vec(v)
        })
        .collect();
    Ok(BSharedVector::from_evector(EVector::new(columns, 0)?))
}

/// Join `left` and `right` on `keys`. `keys` names must resolve in both
/// tables, boolean-encoded. Returns a table whose schema is `keys`
/// followed by every `assignments` output; `VALID` is rewritten per
/// `kind`.
#[allow(clippy::too_many_arguments)]
pub fn join<T, C>(
    left: &EncodedTable<T>,
    right: &EncodedTable<T>,
    keys: &[String],
    assignments: &[JoinAssignment],
    kind: JoinKind,
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
        return Err(OrqError::invalid_shape("join: at least one key column is required"));
    }
    let n_left = left.len();
    let n_right = right.len();
    log::debug!("join: {n_left} left rows, {n_right} right rows, kind {kind:?}, keys {keys:?}");
    let replication = left.valid().replication();
    let party_id = party.party_id;

    let mut columns: Vec<(String, Column<T>)> = Vec::new();
    for k in keys {
        let l = left.column_b(k)?;
        let r = right.column_b(k)?;
        columns.push((k.clone(), Column::Boolean(concat_b(l, r)?)));
    }

    const SIDE: &str = "[__JOIN_SIDE__]";
    columns.push((SIDE.to_string(), Column::Boolean(side_tag_b::<T>(n_left, n_right, replication, party_id))));

    let mut src_names = Vec::with_capacity(assignments.len());
    for (idx, a) in assignments.iter().enumerate() {
        let left_col = a.left.as_ref().map(|n| left.column(n)).transpose()?.cloned();
        let right_col = a.right.as_ref().map(|n| right.column(n)).transpose()?.cloned();
        let (combined, is_boolean) = match (&left_col, &right_col) {
            (Some(Column::Arithmetic(lv)), None) => (Column::Arithmetic(concat_a(lv, &zero_a::<T>(n_right, replication, lv.precision()))?), false),
            (None, Some(Column::Arithmetic(rv))) => (Column::Arithmetic(concat_a(&zero_a::<T>(n_left, replication, rv.precision()), rv)?), false),
            (Some(Column::Arithmetic(lv)), Some(Column::Arithmetic(rv))) => (Column::Arithmetic(concat_a(lv, rv)?), false),
            (Some(Column::Boolean(lv)), None) => (Column::Boolean(concat_b(lv, &zero_b::<T>(n_right, replication))?), true),
            (None, Some(Column::Boolean(rv))) => (Column::Boolean(concat_b(&zero_b::<T>(n_left, replication), rv)?), true),
            (Some(Column::Boolean(lv)), Some(Column::Boolean(rv))) => (Column::Boolean(concat_b(lv, rv)?), true),
            _ => return Err(OrqError::invalid_shape("join: assignment needs at least one of left/right, with matching encodings")),
        };
        let src_name = if is_boolean { format!("[__JOIN_SRC_{idx}__]") } else { format!("__JOIN_SRC_{idx}__") };
        columns.push((src_name.clone(), combined));
        src_names.push(src_name);
    }

    let valid = concat_b(left.valid(), right.valid())?;
    let work = EncodedTable::new(columns, valid)?;

    let mut sort_keys: Vec<SortKey> = keys.iter().map(|k| SortKey::asc(k.clone())).collect();
    sort_keys.push(SortKey::asc(SIDE.to_string()));
    let sorted = sort_table(&work, &sort_keys, protocol, perm_prg, is_pi_holder, party)?;

    let key_cols: Vec<&BSharedVector<T>> = keys.iter().map(|k| sorted.column_b(k)).collect::<OrqResult<_>>()?;
    let delta = boundary_bits(&key_cols, party)?;

    let tag = sorted.column_b(SIDE)?.clone();
    let not_tag = not_bit_b(&tag, party)?;
    let base_valid = sorted.valid().clone();
    let left_ind = and_b(&not_tag, &base_valid, party)?;
    let right_ind = and_b(&tag, &base_valid, party)?;
    let has_left = broadcast_group_b(&delta, &left_ind, |x, y, p| or_b(x, y, p), party)?;
    let has_right = broadcast_group_b(&delta, &right_ind, |x, y, p| or_b(x, y, p), party)?;

    let mut out_columns: Vec<(String, Column<T>)> = Vec::new();
    for k in keys {
        out_columns.push((k.clone(), sorted.column(k)?.clone()));
    }
    for (idx, a) in assignments.iter().enumerate() {
        let src = &src_names[idx];
        let propagated = match sorted.column(src)? {
            Column::Arithmetic(v) => match a.combinator {
                Combinator::Sum | Combinator::Copy => Column::Arithmetic(broadcast_group_a(&delta, v, |x, y, _p| x.add_a(y), party)?),
                _ => return Err(OrqError::invalid_shape("join: combinator unsupported for an arithmetic column")),
            },
            Column::Boolean(v) => match a.combinator {
                Combinator::BitOr | Combinator::Copy => Column::Boolean(broadcast_group_b(&delta, v, |x, y, p| or_b(x, y, p), party)?),
                Combinator::Max => Column::Boolean(broadcast_group_b(
                    &delta,
                    v,
                    |x, y, p| {
                        let g = gt(x, y, p)?;
                        select_b(&g, x, y, p)
                    },
                    party,
                )?),
                Combinator::Min => Column::Boolean(broadcast_group_b(
                    &delta,
                    v,
                    |x, y, p| {
                        let l = lt(x, y, p)?;
                        select_b(&l, x, y, p)
                    },
                    party,
                )?),
                _ => return Err(OrqError::invalid_shape("join: combinator unsupported for a boolean column")),
            },
        };
        out_columns.push((a.output.clone(), propagated));
    }

    let new_valid = match kind {
        JoinKind::Inner => and_b(&and_b(&tag, &base_valid, party)?, &has_left, party)?,
        JoinKind::Semi => and_b(&and_b(&not_tag, &base_valid, party)?, &has_right, party)?,
        JoinKind::Anti => {
            let not_has_right = not_bit_b(&has_right, party)?;
            and_b(&and_b(&not_tag, &base_valid, party)?, &not_has_right, party)?
        }
        JoinKind::LeftOuter => and_b(&not_tag, &base_valid, party)?,
        JoinKind::RightOuter => and_b(&tag, &base_valid, party)?,
        JoinKind::FullOuter => base_valid.clone(),
    };

    EncodedTable::new(out_columns, new_valid)
}
