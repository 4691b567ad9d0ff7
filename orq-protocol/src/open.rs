//! Open / reveal. Every scheme this crate names is `(N, N-1)`
//! replicated: additive 2PC (R=1, N=2), replicated 3PC (R=2, N=3),
//! replicated 4PC (R=3, N=4) all satisfy `R = N-1`, i.e. each party holds
//! every global share except the one "belonging" to its ring predecessor.
//! Reconstruction therefore needs exactly one exchange regardless of R:
//! each party sends its share to its successor ring-neighbour, and the
//! R=2 and R=3 variants exchange the non-held share only.
//!
//! Column `j` of a party's `EVector` holds global share `(party_id + j) mod
//! N`; column 0 is always this party's "home" share and the only one ever
//! sent (every other party already derives it transitively or doesn't need
//! it). The one share missing from a party's window is its predecessor's
//! home share, fetched in one round.

use orq_error::OrqResult;
use orq_evector::{ASharedVector, BSharedVector};
use orq_vector::Elem;

use crate::communicator::{Communicator, WireCodec};
use crate::party::ProtocolParty;

fn open_generic<T, C, F>(
    columns: &[orq_vector::Vector<T>],
    party: &mut ProtocolParty<T, C>,
    combine: F,
) -> OrqResult<Vec<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
    F: Fn(T, T) -> T,
{
    let n = columns[0].len();
    log::trace!("opening {n} shares to plaintext");
    let home: Vec<T> = columns[0].to_plain_vec();
    let successor = party.successor();
    let predecessor = party.predecessor();
    let tag = party.fresh_tag();

    let missing: Vec<T> = if party.scheme.num_parties() > 1 {
        party.comm.send_share(&home, successor, tag)?;
        party.comm.receive_share(predecessor, n, tag)?
    } else {
        vec![T::zero(); n]
    };

    let mut total = vec![T::zero(); n];
    for col in columns {
        for i in 0..n {
            total[i] = combine(total[i], col.get(i));
        }
    }
    for i in 0..n {
        total[i] = combine(total[i], missing[i]);
    }
    Ok(total)
}

/// Reconstruct an A-shared vector by summing shares mod 2^w.
pub fn open_a<T, C>(shares: &ASharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<Vec<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    open_generic(shares.inner.columns(), party, |a, b| a.wrapping_add(&b))
}

/// Reconstruct a B-shared vector by XOR-ing shares.
pub fn open_b<T, C>(shares: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<Vec<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    open_generic(shares.inner.columns(), party, |a, b| a ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::LoopbackCommunicator;
    use crate::party::Scheme;
    use orq_evector::EVector;
    use orq_vector::Vector;

    /// Two-party additive open: party 0 holds share s0, party 1 holds s1,
    /// s0 + s1 == plaintext.
    #[test]
    fn two_party_additive_open_reconstructs() {
        let plain = vec![11i64, 22, 33];
        let s0 = vec![5i64, 5, 5];
        let s1: Vec<i64> = plain.iter().zip(&s0).map(|(p, a)| p.wrapping_sub(*a)).collect();

        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());

        let v0 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(s0)], 0).unwrap());
        let v1 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(s1)], 0).unwrap());

        let h1 = std::thread::spawn(move || open_a(&v1, &mut p1).unwrap());
        let opened0 = open_a(&v0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        assert_eq!(opened0, plain);
        assert_eq!(opened1, plain);
    }

    /// Three-party replicated-(3,2) open: global shares g0,g1,g2 sum to the
    /// plaintext; party i's columns are [g_i, g_{i+1 mod 3}].
    #[test]
    fn three_party_replicated_open_reconstructs() {
        let plain = vec![100i64, 200];
        let g0 = vec![1i64, 2];
        let g1 = vec![3i64, 4];
        let g2: Vec<i64> = (0..2).map(|i| plain[i].wrapping_sub(g0[i]).wrapping_sub(g1[i])).collect();
        let shares = [g0, g1, g2];

        let comms = LoopbackCommunicator::mesh(3);
        let mut parties: Vec<_> = comms
            .into_iter()
            .enumerate()
            .map(|(i, c)| ProtocolParty::new(i, Scheme::Replicated3pc, c))
            .collect();

        let evectors: Vec<ASharedVector<i64>> = (0..3)
            .map(|i| {
                let next = (i + 1) % 3;
                let cols = vec![Vector::from_vec(shares[i].clone()), Vector::from_vec(shares[next].clone())];
                ASharedVector::from_evector(EVector::new(cols, 0).unwrap())
            })
            .collect();

        let mut handles = Vec::new();
        let mut iter_parties = parties.drain(..);
        let mut p0 = iter_parties.next().unwrap();
        let mut p1 = iter_parties.next().unwrap();
        let mut p2 = iter_parties.next().unwrap();
        let v0 = evectors[0].clone();
        let v1 = evectors[1].clone();
        let v2 = evectors[2].clone();

        handles.push(std::thread::spawn(move || open_a(&v1, &mut p1).unwrap()));
        handles.push(std::thread::spawn(move || open_a(&v2, &mut p2).unwrap()));
        let opened0 = open_a(&v0, &mut p0).unwrap();

        let opened1 = handles.remove(0).join().unwrap();
        let opened2 = handles.remove(0).join().unwrap();

        assert_eq!(opened0, plain);
        assert_eq!(opened1, plain);
        assert_eq!(opened2, plain);
    }
}
