//! Oblivious multiplexer: pick between two already-computed values based on
//! a secret 0/1 bit, without ever branching on it. Every comparison-driven
//! operator below (sort's compare-exchange, join's boundary logic, window's
//! crossing detection) bottoms out in one of these selects.

use orq_error::OrqResult;
use orq_evector::{ASharedVector, BSharedVector};
use orq_vector::Elem;

use orq_protocol::{and_b, b2a_bit, mul_a, negate_b, Communicator, ProtocolParty, WireCodec};

use crate::table::{Column, EncodedTable};

/// Broadcast a single 0/1 bit (held at bit position 0) to an all-zero or
/// all-ones word, via two's-complement negation (the same trick
/// `orq_protocol::division` uses to turn a sign bit into a select mask).
fn broadcast<T, C>(bit: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    negate_b(bit, party, true)
}

/// `mask ? on_true : on_false`, boolean-shared.
pub(crate) fn select_b<T, C>(
    mask_bit: &BSharedVector<T>,
    on_true: &BSharedVector<T>,
    on_false: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let mask = broadcast(mask_bit, party)?;
    let diff = on_true.xor_b(on_false)?;
    let chosen = and_b(&mask, &diff, party)?;
    on_false.xor_b(&chosen)
}

/// `mask ? on_true : on_false`, arithmetic-shared. `mask_bit` is boolean
/// 0/1; it is lifted to arithmetic before use.
pub(crate) fn select_a<T, C>(
    mask_bit: &BSharedVector<T>,
    on_true: &ASharedVector<T>,
    on_false: &ASharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let mask_a = b2a_bit(mask_bit, party)?;
    let diff = on_true.sub_a(on_false)?;
    let scaled = mul_a(&diff, &mask_a, party, true)?;
    on_false.add_a(&scaled)
}

pub(crate) fn select_column<T, C>(
    mask_bit: &BSharedVector<T>,
    on_true: &Column<T>,
    on_false: &Column<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<Column<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    match (on_true, on_false) {
        (Column::Arithmetic(t), Column::Arithmetic(f)) => Ok(Column::Arithmetic(select_a(mask_bit, t, f, party)?)),
        (Column::Boolean(t), Column::Boolean(f)) => Ok(Column::Boolean(select_b(mask_bit, t, f, party)?)),
        _ => Err(orq_error::OrqError::invalid_shape("select_column: encoding mismatch")),
    }
}

/// Row-wise select across two equal-schema tables, one bit per row
/// (every oblivious operator moves whole rows together).
pub(crate) fn select_table<T, C>(
    mask_bit: &BSharedVector<T>,
    on_true: &EncodedTable<T>,
    on_false: &EncodedTable<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let mut columns = Vec::with_capacity(on_true.names().len());
    for name in on_true.names() {
        let t = on_true.column(name)?;
        let f = on_false.column(name)?;
        columns.push((name.clone(), select_column(mask_bit, t, f, party)?));
    }
    let valid = select_b(mask_bit, on_true.valid(), on_false.valid(), party)?;
    let mut out = EncodedTable::new(columns, valid)?;
    if let (Some(ut), Some(uf)) = (on_true.uniq(), on_false.uniq()) {
        out.set_uniq(select_b(mask_bit, ut, uf, party)?)?;
    }
    Ok(out)
}
