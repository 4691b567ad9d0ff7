//! Boolean protocols: `xor_b` and shifts are already local
//! (`orq-evector`); `and_b` is the AND analogue of `mul_a` — a triple in
//! 2PC, a local-cross-term-plus-exchange in the replicated schemes.

use orq_error::{OrqError, OrqResult};
use orq_evector::{BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use crate::communicator::{Communicator, WireCodec};
use crate::party::{ProtocolParty, Scheme};

pub fn and_b<T, C>(x: &BSharedVector<T>, y: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if x.len() != y.len() {
        return Err(OrqError::invalid_shape("and_b: length mismatch"));
    }
    if x.replication() != y.replication() {
        return Err(OrqError::invalid_shape("and_b: replication mismatch"));
    }
    match party.scheme {
        Scheme::Additive2pc | Scheme::Malicious2pc => and_b_2pc(x, y, party),
        Scheme::Replicated3pc | Scheme::Replicated4pc => and_b_replicated(x, y, party),
    }
}

fn and_b_2pc<T, C>(x: &BSharedVector<T>, y: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = x.len();
    let triples = party.triples.next_and_triples(n)?.to_vec();
    party.stats.record_and_consume(n as u64);

    let x_col = x.inner.column(0);
    let y_col = y.inner.column(0);
    let d_share: Vec<T> = (0..n).map(|i| x_col.get(i) ^ triples[i].a).collect();
    let e_share: Vec<T> = (0..n).map(|i| y_col.get(i) ^ triples[i].b).collect();

    let peer = party.successor();
    let tag_d = party.fresh_tag();
    let d_other = party.comm.exchange_shares(&d_share, peer, n, tag_d)?;
    let tag_e = party.fresh_tag();
    let e_other = party.comm.exchange_shares(&e_share, peer, n, tag_e)?;
    let d_plain: Vec<T> = (0..n).map(|i| d_share[i] ^ d_other[i]).collect();
    let e_plain: Vec<T> = (0..n).map(|i| e_share[i] ^ e_other[i]).collect();

    let is_first = party.party_id == 0;
    let z: Vec<T> = (0..n)
        .map(|i| {
            let mut acc = triples[i].c;
            acc = acc ^ (d_plain[i] & triples[i].b);
            acc = acc ^ (e_plain[i] & triples[i].a);
            if is_first {
                acc = acc ^ (d_plain[i] & e_plain[i]);
            }
            acc
        })
        .collect();
    let ev = EVector::new(vec![Vector::from_vec(z)], 0)?;
    Ok(BSharedVector::from_evector(ev))
}

fn and_b_replicated<T, C>(x: &BSharedVector<T>, y: &BSharedVector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = x.len();
    let r = x.replication();
    let x_cols: Vec<Vec<T>> = (0..r).map(|j| x.inner.column(j).to_plain_vec()).collect();
    let y_cols: Vec<Vec<T>> = (0..r).map(|j| y.inner.column(j).to_plain_vec()).collect();

    let z_home: Vec<T> = (0..n)
        .map(|i| {
            let mut acc = x_cols[0][i] & y_cols[0][i];
            if r > 1 {
                acc = acc ^ (x_cols[0][i] & y_cols[1][i]);
                acc = acc ^ (x_cols[1][i] & y_cols[0][i]);
            }
            acc
        })
        .collect();

    let tag = party.fresh_tag();
    let predecessor = party.predecessor();
    let successor = party.successor();
    party.comm.send_share(&z_home, predecessor, tag)?;
    let z_next = party.comm.receive_share(successor, n, tag)?;

    let mut columns = vec![Vector::from_vec(z_home)];
    for _ in 1..r {
        columns.push(Vector::from_vec(z_next.clone()));
    }
    let ev = EVector::new(columns, 0)?;
    Ok(BSharedVector::from_evector(ev))
}
