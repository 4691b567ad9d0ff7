//! Binary adders over B-shared vectors: ripple-carry (depth
//! `w`, `w-1` ANDs, used when batch size amortises rounds) and
//! parallel-prefix / Kogge-Stone (depth `ceil(log2 w)`, `O(w log w)` ANDs,
//! used when latency dominates, e.g. a single division). Subtraction
//! composes either adder with the two's-complement of the subtrahend.

use orq_error::OrqResult;
use orq_evector::{BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use crate::boolean::and_b;
use crate::communicator::{Communicator, WireCodec};
use crate::party::ProtocolParty;

fn bit_width<T: Elem>() -> u32 {
    std::mem::size_of::<T>() as u32 * 8
}

/// Isolate bit `i` of a B-shared value, left in place at position `i`
/// rather than shifted down, which is the form every caller here needs.
pub(crate) fn bit_at<T: Elem>(x: &BSharedVector<T>, i: u32) -> OrqResult<BSharedVector<T>> {
    x.band_public(T::one() << i as usize)
}

fn zero_like<T: Elem>(x: &BSharedVector<T>) -> BSharedVector<T> {
    constant_b(x, T::zero(), false)
}

/// Ripple-carry adder: `w-1` sequential AND rounds, each producing the
/// carry bit for the next position from the previous one. The base sum
/// `x xor y` already has every bit correct except for the carry chain, so
/// each round only needs to XOR the carry-in bit into its position.
pub fn ripple_carry_add<T, C>(
    x: &BSharedVector<T>,
    y: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let w = bit_width::<T>();
    let base = x.xor_b(y)?;
    let mut carry_accum = zero_like(x);

    let x0 = bit_at(x, 0)?;
    let y0 = bit_at(y, 0)?;
    let mut carry = and_b(&x0, &y0, party)?; // carry out of bit 0, held at position 0

    for i in 1..w {
        carry_accum = carry_accum.xor_b(&carry.shl(i))?;
        if i + 1 == w {
            break;
        }
        let xi = bit_at(x, i)?;
        let yi = bit_at(y, i)?;
        let propagate = xi.xor_b(&yi)?;
        let carry_term = and_b(&propagate, &carry, party)?;
        let generate = and_b(&xi, &yi, party)?;
        carry = generate.xor_b(&carry_term)?;
    }
    base.xor_b(&carry_accum)
}

/// Parallel-prefix (Kogge-Stone) adder: `ceil(log2 w)` rounds of
/// propagate/generate combination. Operates bit-sliced across the whole
/// word at once, so no per-bit masking is needed.
pub fn parallel_prefix_add<T, C>(
    x: &BSharedVector<T>,
    y: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let w = bit_width::<T>();
    let mut propagate = x.xor_b(y)?;
    let mut generate = and_b(x, y, party)?;

    let mut stride = 1u32;
    while stride < w {
        let shifted_g = generate.shl(stride);
        let shifted_p = propagate.shl(stride);
        let new_g_term = and_b(&propagate, &shifted_g, party)?;
        let new_generate = generate.xor_b(&new_g_term)?;
        let new_propagate = and_b(&propagate, &shifted_p, party)?;
        generate = new_generate;
        propagate = new_propagate;
        stride *= 2;
    }
    // Carry-in to bit i is the generate signal out of bit i-1.
    let carry_in = generate.shl(1);
    x.xor_b(y)?.xor_b(&carry_in)
}

/// Bitwise NOT of the underlying plaintext value: flip the home column on
/// exactly one party (`is_party_zero`) so that, combined across every
/// party's shares, the XOR reconstructs to `~plain` exactly once.
/// Flipping every party's home column independently is *not* equivalent:
/// an even number of parties (2PC, 4PC) would cancel the flip entirely,
/// since `~a ^ ~b == a ^ b`.
pub(crate) fn complement<T: Elem>(x: &BSharedVector<T>, is_party_zero: bool) -> BSharedVector<T> {
    if !is_party_zero {
        return x.clone();
    }
    let cols = x.inner.columns();
    let mut new_cols = cols.to_vec();
    new_cols[0] = new_cols[0].not();
    let ev = EVector::new(new_cols, 0).expect("same shape as input");
    BSharedVector::from_evector(ev)
}

/// A public constant as a B-share: folded into exactly one party's home
/// column (`is_party_zero`), zero everywhere else, for the same reason as
/// [`complement`].
pub(crate) fn constant_b<T: Elem>(shape_like: &BSharedVector<T>, value: T, is_party_zero: bool) -> BSharedVector<T> {
    let n = shape_like.len();
    let r = shape_like.replication();
    let home = if is_party_zero { value } else { T::zero() };
    let mut cols = Vec::with_capacity(r);
    cols.push(Vector::filled(n, home));
    for _ in 1..r {
        cols.push(Vector::filled(n, T::zero()));
    }
    BSharedVector::from_evector(EVector::new(cols, 0).expect("valid shape"))
}

/// Two's-complement negation of a B-shared value: `~x + 1`.
pub fn negate_b<T, C>(
    x: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
    use_ripple: bool,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let is_party_zero = party.party_id == 0;
    let flipped = complement(x, is_party_zero);
    let one = constant_b(x, T::one(), is_party_zero);
    if use_ripple {
        ripple_carry_add(&flipped, &one, party)
    } else {
        parallel_prefix_add(&flipped, &one, party)
    }
}

/// Subtraction composes the adder with the two's complement of `y`.
pub fn sub_b<T, C>(
    x: &BSharedVector<T>,
    y: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
    use_ripple: bool,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let neg_y = negate_b(y, party, use_ripple)?;
    if use_ripple {
        ripple_carry_add(x, &neg_y, party)
    } else {
        parallel_prefix_add(x, &neg_y, party)
    }
}
