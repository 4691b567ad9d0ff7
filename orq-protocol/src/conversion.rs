//! Share conversion: `b2a_bit`/`b2a_full` convert a B-shared value to
//! A-shared; `a2b` goes the other way via a full adder evaluation.
//!
//! `a2b` is the simple direction: it reuses the ripple-carry/parallel-prefix
//! adders already built, recomputing via a full binary-adder evaluation of
//! the R summands.
//!
//! `b2a` has no single-round trick that stays correct for every replication
//! factor this crate supports (R=1, 2, 3), so it is built from a sequence
//! of `N-1` pairwise XOR-to-arithmetic folds: each party's home B-share bit
//! is lifted into an N-wide arithmetic sharing that is zero everywhere
//! except that one party's column (the same single-contributor convention
//! `constant_b` uses for public constants), and the standard identity
//! `a xor b = a + b - 2ab` combines consecutive contributions using the
//! existing `mul_a`. This costs `N-1` multiplication rounds per bit rather
//! than the single round a dedicated OLE-based conversion would take, but
//! every round is `mul_a` itself, so correctness carries over directly
//! from its already-tested implementation.

use orq_error::OrqResult;
use orq_evector::{ASharedVector, BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use crate::adders::{bit_at, parallel_prefix_add, ripple_carry_add};
use crate::arithmetic::mul_a;
use crate::communicator::{Communicator, WireCodec};
use crate::party::ProtocolParty;

fn bit_width<T: Elem>() -> u32 {
    std::mem::size_of::<T>() as u32 * 8
}

/// Build the N-wide arithmetic sharing that is zero everywhere except
/// `contributor`'s column, which holds `value` (a 0/1 integer). Every
/// party runs this identically and independently decides, per `i`,
/// whether `contributor == party.party_id`.
fn single_contributor_a<T: Elem>(value: &Vector<T>, replication: usize, is_contributor: bool) -> ASharedVector<T> {
    let n = value.len();
    let mut cols = Vec::with_capacity(replication);
    cols.push(if is_contributor { value.clone() } else { Vector::filled(n, T::zero()) });
    for _ in 1..replication {
        cols.push(Vector::filled(n, T::zero()));
    }
    ASharedVector::from_evector(EVector::new(cols, 0).expect("valid shape"))
}

/// Convert a single-bit B-shared vector to an A-shared one (`b2a_bit`).
/// Values must be 0/1 per element; every other bit is ignored by the
/// caller's framing (callers isolate one bit before calling this, as
/// `b2a_full` does).
pub fn b2a_bit<T, C>(bit: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let replication = bit.replication();
    let num_parties = party.scheme.num_parties();
    let home = bit.inner.column(0).clone();

    let mut acc = single_contributor_a(&home, replication, party.party_id == 0);
    for i in 1..num_parties {
        let contribution = single_contributor_a(&home, replication, party.party_id == i);
        let cross = mul_a(&acc, &contribution, party, true)?;
        let sum = acc.add_a(&contribution)?;
        let doubled = cross.mul_public(T::one() + T::one(), true)?;
        acc = sum.sub_a(&doubled)?;
    }
    Ok(acc)
}

/// Decompose a w-bit B-shared vector into `w` single-bit conversions and
/// recombine with shifts (`b2a_full`).
pub fn b2a_full<T, C>(x: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let w = bit_width::<T>();
    let replication = x.replication();
    let n = x.len();
    let mut acc = ASharedVector::from_evector(EVector::zeros(n, replication, 0));
    for i in 0..w {
        let isolated = bit_at(x, i)?;
        let shifted_down = isolated.shr(i);
        let bit_arith = b2a_bit(&shifted_down, party)?;
        let placed = bit_arith.mul_public(T::one() << i as usize, true)?;
        acc = acc.add_a(&placed)?;
    }
    Ok(acc)
}

/// Recompute an A-shared value's B-sharing via a full binary-adder
/// evaluation of its `R` summands (`a2b`): treat each of the party's own R
/// arithmetic columns as an independent single-contributor B-share (same
/// construction as `b2a`'s lift, mirrored), and sum them with the adder
/// network.
pub fn a2b<T, C>(x: &ASharedVector<T>, party: &mut ProtocolParty<T, C>, use_ripple: bool) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let replication = x.replication();
    let num_parties = party.scheme.num_parties();
    let n = x.len();

    let home = x.inner.column(0).clone();
    let mut acc = single_contributor_b(&home, replication, party.party_id == 0, n);
    for i in 1..num_parties {
        let contribution = single_contributor_b(&home, replication, party.party_id == i, n);
        acc = if use_ripple {
            ripple_carry_add(&acc, &contribution, party)?
        } else {
            parallel_prefix_add(&acc, &contribution, party)?
        };
    }
    Ok(acc)
}

fn single_contributor_b<T: Elem>(value: &Vector<T>, replication: usize, is_contributor: bool, n: usize) -> BSharedVector<T> {
    let mut cols = Vec::with_capacity(replication);
    cols.push(if is_contributor { value.clone() } else { Vector::filled(n, T::zero()) });
    for _ in 1..replication {
        cols.push(Vector::filled(n, T::zero()));
    }
    BSharedVector::from_evector(EVector::new(cols, 0).expect("valid shape"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::LoopbackCommunicator;
    use crate::open::{open_a, open_b};
    use crate::party::Scheme;
    use orq_crypto::{DummyOle, OleProvider};

    fn two_party_setup(n_triples: usize) -> (ProtocolParty<i32, LoopbackCommunicator>, ProtocolParty<i32, LoopbackCommunicator>) {
        let key = [21u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_mul_triples(&mut ole0, n_triples).unwrap();
        p1.triples.reserve_mul_triples(&mut ole1, n_triples).unwrap();
        (p0, p1)
    }

    #[test]
    fn b2a_bit_matches_plaintext_bit() {
        let plain: Vec<i32> = vec![0, 1, 1, 0];
        let s0 = vec![1i32, 0, 1, 1];
        let s1: Vec<i32> = plain.iter().zip(&s0).map(|(p, a)| p ^ a).collect();

        let (mut p0, mut p1) = two_party_setup(plain.len());
        let v0 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(s0)], 0).unwrap());
        let v1 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(s1)], 0).unwrap());

        let h1 = std::thread::spawn(move || {
            let a1 = b2a_bit(&v1, &mut p1).unwrap();
            open_a(&a1, &mut p1).unwrap()
        });
        let a0 = b2a_bit(&v0, &mut p0).unwrap();
        let opened0 = open_a(&a0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, plain);
        assert_eq!(opened1, plain);
    }

    #[test]
    fn b2a_full_round_trips_through_a2b() {
        let plain: Vec<i32> = vec![5, -3, 0, 42];
        let s0 = vec![7i32, 7, 7, 7];
        let s1: Vec<i32> = plain.iter().zip(&s0).map(|(p, a)| p ^ a).collect();

        // w=32 bits, each needing one b2a_bit (1 mul for N=2): budget 40.
        let (mut p0, mut p1) = two_party_setup(40);
        let v0 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(s0)], 0).unwrap());
        let v1 = BSharedVector::from_evector(EVector::new(vec![Vector::from_vec(s1)], 0).unwrap());

        let h1 = std::thread::spawn(move || {
            let a1 = b2a_full(&v1, &mut p1).unwrap();
            open_a(&a1, &mut p1).unwrap()
        });
        let a0 = b2a_full(&v0, &mut p0).unwrap();
        let opened0 = open_a(&a0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, plain);
        assert_eq!(opened1, plain);
    }

    #[test]
    fn a2b_matches_plaintext_sum() {
        let plain_a: Vec<i32> = vec![10, -5];
        let plain_b: Vec<i32> = vec![3, 8];
        let combined: Vec<i32> = plain_a.iter().zip(&plain_b).map(|(a, b)| a.wrapping_add(*b)).collect();

        let a0 = vec![4i32, 4];
        let a1: Vec<i32> = plain_a.iter().zip(&a0).map(|(p, s)| p.wrapping_sub(*s)).collect();
        let b0 = vec![1i32, 1];
        let b1: Vec<i32> = plain_b.iter().zip(&b0).map(|(p, s)| p.wrapping_sub(*s)).collect();

        let sum0: Vec<i32> = a0.iter().zip(&b0).map(|(x, y)| x.wrapping_add(*y)).collect();
        let sum1: Vec<i32> = a1.iter().zip(&b1).map(|(x, y)| x.wrapping_add(*y)).collect();

        let key = [22u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);
        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_and_triples(&mut ole0, 2 * 64).unwrap();
        p1.triples.reserve_and_triples(&mut ole1, 2 * 64).unwrap();

        let sv0 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(sum0)], 0).unwrap());
        let sv1 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(sum1)], 0).unwrap());

        let h1 = std::thread::spawn(move || {
            let b1 = a2b(&sv1, &mut p1, true).unwrap();
            open_b(&b1, &mut p1).unwrap()
        });
        let b0 = a2b(&sv0, &mut p0, true).unwrap();
        let opened0 = open_b(&b0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, combined);
        assert_eq!(opened1, combined);
    }
}
