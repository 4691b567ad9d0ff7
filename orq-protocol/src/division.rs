//! Private division: non-restoring division over B-shares.
//! The dividend and divisor are promoted from A-shares via [`crate::a2b`]
//! if the caller holds them arithmetically; the quotient is left B-shared.
//!
//! This is the bit-serial form of non-restoring division (the sequential
//! shift-subtract-or-add divider taught alongside the parallel/array
//! form): the accumulator starts at zero, one dividend bit is folded in
//! per round MSB-first, and the running remainder is conditionally added
//! to or subtracted from the divisor depending on the *previous* round's
//! sign, extracted locally with [`crate::ltz`]. `w` rounds, each one
//! adder plus one AND to select between the add/subtract candidates.

use orq_error::{OrqError, OrqResult};
use orq_evector::BSharedVector;
use orq_vector::Elem;

use crate::adders::{bit_at, complement, negate_b, ripple_carry_add};
use crate::boolean::and_b;
use crate::comparison::ltz;
use crate::communicator::{Communicator, WireCodec};
use crate::party::ProtocolParty;

fn bit_width<T: Elem>() -> u32 {
    std::mem::size_of::<T>() as u32 * 8
}

/// Select between two candidate B-shares based on a full-width 0/all-ones
/// mask: `mask & (on_true xor on_false) xor on_false`.
fn select<T, C>(
    mask: &BSharedVector<T>,
    on_true: &BSharedVector<T>,
    on_false: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let diff = on_true.xor_b(on_false)?;
    let chosen = and_b(mask, &diff, party)?;
    on_false.xor_b(&chosen)
}

/// Broadcast a single 0/1 bit (held at position 0) into an all-zero or
/// all-ones mask spanning the whole word, by two's-complement negation:
/// `-0 = 0`, `-1 = 0xFF..F`.
fn broadcast_sign<T, C>(bit: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    negate_b(bit, party, true)
}

/// Non-restoring division of two w-bit B-shared vectors (`div_b`). Returns
/// `(quotient, remainder)`, both B-shared. Operands are treated as
/// unsigned magnitudes; callers working with fixed-point signed values
/// are expected to have already handled the sign separately.
pub fn div_b<T, C>(
    dividend: &BSharedVector<T>,
    divisor: &BSharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<(BSharedVector<T>, BSharedVector<T>)>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if dividend.len() != divisor.len() {
        return Err(OrqError::invalid_shape("div_b: length mismatch"));
    }
    if dividend.replication() != divisor.replication() {
        return Err(OrqError::invalid_shape("div_b: replication mismatch"));
    }

    let w = bit_width::<T>();
    let neg_divisor = negate_b(divisor, party, true)?;

    let mut remainder = zero_shaped(dividend);
    let mut quotient = zero_shaped(dividend);
    // First round always subtracts, matching the textbook algorithm's
    // `R >= 0` initial assumption; represented as an all-zero select mask.
    let mut select_mask = zero_shaped(dividend);

    for i in (0..w).rev() {
        let bit_i = bit_at(dividend, i)?.shr(i);
        remainder = remainder.shl(1).xor_b(&bit_i)?;

        let candidate_add = ripple_carry_add(&remainder, divisor, party)?;
        let candidate_sub = ripple_carry_add(&remainder, &neg_divisor, party)?;
        remainder = select(&select_mask, &candidate_add, &candidate_sub, party)?;

        let sign = ltz(&remainder);
        let quotient_bit = complement(&sign, party.party_id == 0);
        quotient = quotient.xor_b(&quotient_bit.shl(i))?;

        select_mask = broadcast_sign(&sign, party)?;
    }

    // Final correction: if the remainder is still negative, add the
    // divisor back once more.
    let final_sign = ltz(&remainder);
    let final_mask = broadcast_sign(&final_sign, party)?;
    let restored = ripple_carry_add(&remainder, divisor, party)?;
    remainder = select(&final_mask, &restored, &remainder, party)?;

    Ok((quotient, remainder))
}

fn zero_shaped<T: Elem>(shape_like: &BSharedVector<T>) -> BSharedVector<T> {
    shape_like.band_public(T::zero()).expect("mask by 0 never fails")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::LoopbackCommunicator;
    use crate::open::open_b;
    use crate::party::Scheme;
    use orq_crypto::{DummyOle, OleProvider};
    use orq_evector::EVector;
    use orq_vector::Vector;

    fn two_party_setup(
        x0: Vec<u32>,
        x1: Vec<u32>,
        y0: Vec<u32>,
        y1: Vec<u32>,
        n_triples: usize,
    ) -> (
        ProtocolParty<u32, LoopbackCommunicator>,
        ProtocolParty<u32, LoopbackCommunicator>,
        BSharedVector<u32>,
        BSharedVector<u32>,
        BSharedVector<u32>,
        BSharedVector<u32>,
    ) {
        let key = [9u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, n_triples).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, n_triples).unwrap();
        let xv0 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(x0)], 0).unwrap());
        let xv1 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(x1)], 0).unwrap());
        let yv0 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(y0)], 0).unwrap());
        let yv1 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(y1)], 0).unwrap());
        (p0, p1, xv0, xv1, yv0, yv1)
    }

    #[test]
    fn div_b_matches_plaintext_division() {
        let plain_n: Vec<u32> = vec![100, 7, 4096];
        let plain_d: Vec<u32> = vec![7, 3, 64];
        let n0 = vec![11u32, 5, 9];
        let n1: Vec<u32> = plain_n.iter().zip(&n0).map(|(p, a)| p ^ a).collect();
        let d0 = vec![2u32, 1, 4];
        let d1: Vec<u32> = plain_d.iter().zip(&d0).map(|(p, a)| p ^ a).collect();

        // 32 rounds, each at most three ripple-carry adds (2 candidates +
        // one correction shared across rounds) plus one select AND: budget
        // generously.
        let (mut p0, mut p1, nv0, nv1, dv0, dv1) = two_party_setup(n0, n1, d0, d1, 32 * 260);

        let h1 = std::thread::spawn(move || {
            let (q1, r1) = div_b(&nv1, &dv1, &mut p1).unwrap();
            (open_b(&q1, &mut p1).unwrap(), open_b(&r1, &mut p1).unwrap())
        });
        let (q0, r0) = div_b(&nv0, &dv0, &mut p0).unwrap();
        let opened_q0 = open_b(&q0, &mut p0).unwrap();
        let opened_r0 = open_b(&r0, &mut p0).unwrap();
        let (opened_q1, opened_r1) = h1.join().unwrap();

        let expected_q: Vec<u32> = plain_n.iter().zip(&plain_d).map(|(n, d)| n / d).collect();
        let expected_r: Vec<u32> = plain_n.iter().zip(&plain_d).map(|(n, d)| n % d).collect();
        assert_eq!(opened_q0, expected_q);
        assert_eq!(opened_r0, expected_r);
        assert_eq!(opened_q1, expected_q);
        assert_eq!(opened_r1, expected_r);
    }
}
