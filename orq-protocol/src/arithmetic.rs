//! Arithmetic protocols: `add_a`/`sub_a` are already local
//! (`orq-evector`); `mul_a` is the one arithmetic op that needs a
//! correlation and a peer round trip. 2PC consumes one Beaver triple per
//! element; the replicated schemes compute the cross terms locally and
//! reshare with a single one-hop exchange, mirroring `open`'s ring pattern.

use orq_error::{OrqError, OrqResult};
use orq_evector::{ASharedVector, EVector};
use orq_vector::{Elem, Vector};

use crate::communicator::{Communicator, WireCodec};
use crate::party::{ProtocolParty, Scheme};

/// Arithmetic multiplication of two A-shared vectors (`mul_a`).
/// `truncate` controls whether the fixed-point precision is rescaled down
/// immediately or left doubled for the caller to rescale later.
pub fn mul_a<T, C>(
    x: &ASharedVector<T>,
    y: &ASharedVector<T>,
    party: &mut ProtocolParty<T, C>,
    truncate: bool,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if x.len() != y.len() {
        return Err(OrqError::invalid_shape("mul_a: length mismatch"));
    }
    if x.replication() != y.replication() {
        return Err(OrqError::invalid_shape("mul_a: replication mismatch"));
    }
    let result = match party.scheme {
        Scheme::Additive2pc | Scheme::Malicious2pc => mul_a_2pc(x, y, party)?,
        Scheme::Replicated3pc | Scheme::Replicated4pc => mul_a_replicated(x, y, party)?,
    };
    let precision = if truncate { x.precision() } else { x.precision() * 2 };
    let mut result = result;
    result.inner_mut().set_precision(precision);
    Ok(result)
}

/// Beaver-triple multiplication: `d = x-a`, `e = y-b` opened to both
/// parties, then `z = c + d*b + e*a + d*e` (the `d*e` term added once, by
/// party 0, to avoid double-counting).
fn mul_a_2pc<T, C>(
    x: &ASharedVector<T>,
    y: &ASharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = x.len();
    let triples = party.triples.next_mul_triples(n)?.to_vec();
    party.stats.record_mul_consume(n as u64);

    let x_col = x.inner.column(0);
    let y_col = y.inner.column(0);
    let d_share: Vec<T> = (0..n).map(|i| x_col.get(i).wrapping_sub(&triples[i].a)).collect();
    let e_share: Vec<T> = (0..n).map(|i| y_col.get(i).wrapping_sub(&triples[i].b)).collect();

    let d_plain = open_share_pair(&d_share, party)?;
    let e_plain = open_share_pair(&e_share, party)?;

    let is_first = party.party_id == 0;
    let z: Vec<T> = (0..n)
        .map(|i| {
            let mut acc = triples[i].c;
            acc = acc.wrapping_add(&d_plain[i].wrapping_mul(&triples[i].b));
            acc = acc.wrapping_add(&e_plain[i].wrapping_mul(&triples[i].a));
            if is_first {
                acc = acc.wrapping_add(&d_plain[i].wrapping_mul(&e_plain[i]));
            }
            acc
        })
        .collect();
    let ev = EVector::new(vec![Vector::from_vec(z)], x.precision())?;
    Ok(ASharedVector::from_evector(ev))
}

/// Open a single masked-difference vector between the two 2PC parties
/// (a lighter-weight sibling of [`open_a`] for values that are already
/// additive, not replicated, and don't need the ring machinery).
fn open_share_pair<T, C>(share: &[T], party: &mut ProtocolParty<T, C>) -> OrqResult<Vec<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let tag = party.fresh_tag();
    let peer = party.successor();
    let other = party.comm.exchange_shares(share, peer, share.len(), tag)?;
    Ok((0..share.len()).map(|i| share[i].wrapping_add(&other[i])).collect())
}

/// Replicated multiplication (Araki et al. style): each party locally
/// computes the cross terms from its two held shares of `x` and `y`, masks
/// the result with a fresh zero-sharing, then reshares with one exchange
/// identical in shape to `open`'s ring step.
fn mul_a_replicated<T, C>(
    x: &ASharedVector<T>,
    y: &ASharedVector<T>,
    party: &mut ProtocolParty<T, C>,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let n = x.len();
    let r = x.replication();
    let x_cols: Vec<Vec<T>> = (0..r).map(|j| x.inner.column(j).to_plain_vec()).collect();
    let y_cols: Vec<Vec<T>> = (0..r).map(|j| y.inner.column(j).to_plain_vec()).collect();

    // Local share of the product at this party's "home" index: sum over
    // every pair of held indices (j,k) with j+k == home contribution,
    // restricted to the adjacent-pair case used by (N,N-1) replication.
    let z_home: Vec<T> = (0..n)
        .map(|i| {
            let mut acc = x_cols[0][i].wrapping_mul(&y_cols[0][i]);
            if r > 1 {
                acc = acc.wrapping_add(&x_cols[0][i].wrapping_mul(&y_cols[1][i]));
                acc = acc.wrapping_add(&x_cols[1][i].wrapping_mul(&y_cols[0][i]));
            }
            acc
        })
        .collect();

    // `z_home` alone is a deterministic function of this party's own shares
    // of `x` and `y` — resharing it unmasked would hand the predecessor a
    // value correlated with the secret inputs. Every party draws its own
    // element of a zero-sharing (sums to zero across the whole group) and
    // folds it in first, so what actually crosses the wire is uniform while
    // the total each party holds, summed across the group, is unchanged.
    let mask = party.draw_arithmetic_zero_share(n)?;
    let masked_home: Vec<T> = (0..n).map(|i| z_home[i].wrapping_add(&mask.get(i))).collect();

    let tag = party.fresh_tag();
    let predecessor = party.predecessor();
    let successor = party.successor();
    party.comm.send_share(&masked_home, predecessor, tag)?;
    let z_next = party.comm.receive_share(successor, n, tag)?;

    let mut columns = vec![Vector::from_vec(masked_home)];
    for _ in 1..r {
        columns.push(Vector::from_vec(z_next.clone()));
    }
    let ev = EVector::new(columns, x.precision())?;
    Ok(ASharedVector::from_evector(ev))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communicator::LoopbackCommunicator;

    #[test]
    fn two_party_mul_a_opens_to_product() {
        use crate::open::open_a;
        use orq_crypto::{DummyOle, OleProvider};

        let plain_x = vec![6i64, -3];
        let plain_y = vec![7i64, 5];
        let x0 = vec![2i64, 9];
        let x1: Vec<i64> = plain_x.iter().zip(&x0).map(|(p, a)| p.wrapping_sub(*a)).collect();
        let y0 = vec![1i64, -2];
        let y1: Vec<i64> = plain_y.iter().zip(&y0).map(|(p, a)| p.wrapping_sub(*a)).collect();

        let key = [1u8; 16];
        let mut ole0 = DummyOle::new(key, true);
        let mut ole1 = DummyOle::new(key, false);

        let comms = LoopbackCommunicator::mesh(2);
        let mut it = comms.into_iter();
        let mut p0 = ProtocolParty::new(0, Scheme::Additive2pc, it.next().unwrap());
        let mut p1 = ProtocolParty::new(1, Scheme::Additive2pc, it.next().unwrap());
        p0.triples.reserve_mul_triples(&mut ole0, 2).unwrap();
        p1.triples.reserve_mul_triples(&mut ole1, 2).unwrap();

        let xv0 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(x0)], 0).unwrap());
        let xv1 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(x1)], 0).unwrap());
        let yv0 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(y0)], 0).unwrap());
        let yv1 = ASharedVector::from_evector(EVector::new(vec![Vector::from_vec(y1)], 0).unwrap());

        let h1 = std::thread::spawn(move || {
            let z1 = mul_a(&xv1, &yv1, &mut p1, false).unwrap();
            open_a(&z1, &mut p1).unwrap()
        });
        let z0 = mul_a(&xv0, &yv0, &mut p0, false).unwrap();
        let opened0 = open_a(&z0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();

        let expected: Vec<i64> = plain_x.iter().zip(&plain_y).map(|(a, b)| a.wrapping_mul(*b)).collect();
        assert_eq!(opened0, expected);
        assert_eq!(opened1, expected);
    }

    /// Three-party replicated `mul_a` must both open to the correct product
    /// and reshare something other than the raw, unmasked cross term —
    /// otherwise the predecessor learns a value correlated with the local
    /// shares of `x` and `y`.
    #[test]
    fn three_party_replicated_mul_a_opens_to_product_and_masks_the_reshare() {
        use crate::communicator::LoopbackCommunicator;
        use crate::open::open_a;
        use orq_crypto::{CommonPrg, CommonPrgManager};
        use orq_vector::Vector;

        let plain_x = vec![6i64, -3];
        let plain_y = vec![7i64, 5];
        let gx0 = vec![2i64, 9];
        let gx1 = vec![4i64, -1];
        let gx2: Vec<i64> = (0..2).map(|i| plain_x[i].wrapping_sub(gx0[i]).wrapping_sub(gx1[i])).collect();
        let gx = [gx0, gx1, gx2];

        let gy0 = vec![1i64, -2];
        let gy1 = vec![3i64, 6];
        let gy2: Vec<i64> = (0..2).map(|i| plain_y[i].wrapping_sub(gy0[i]).wrapping_sub(gy1[i])).collect();
        let gy = [gy0, gy1, gy2];

        // Raw, unmasked cross term party 0 would reshare without the fix.
        let raw_home_0: Vec<i64> = (0..2)
            .map(|i| {
                let mut acc = gx[0][i].wrapping_mul(gy[0][i]);
                acc = acc.wrapping_add(gx[0][i].wrapping_mul(gy[1][i]));
                acc = acc.wrapping_add(gx[1][i].wrapping_mul(gy[0][i]));
                acc
            })
            .collect();

        let keys = [[11u8; 16], [22u8; 16], [33u8; 16]];
        let mut mgrs: Vec<CommonPrgManager> = (0..3).map(|_| CommonPrgManager::new(3)).collect();
        mgrs[0].add_rank(1, CommonPrg::from_key(keys[0]));
        mgrs[1].add_rank(-1, CommonPrg::from_key(keys[0]));
        mgrs[0].add_rank(2, CommonPrg::from_key(keys[1]));
        mgrs[2].add_rank(-2, CommonPrg::from_key(keys[1]));
        mgrs[1].add_rank(1, CommonPrg::from_key(keys[2]));
        mgrs[2].add_rank(-1, CommonPrg::from_key(keys[2]));

        let comms = LoopbackCommunicator::mesh(3);
        let mut parties: Vec<ProtocolParty<i64, LoopbackCommunicator>> = comms
            .into_iter()
            .zip(mgrs)
            .enumerate()
            .map(|(i, (c, mgr))| {
                ProtocolParty::new(i, Scheme::Replicated3pc, c).with_replicated_randomness(mgr)
            })
            .collect();

        let xv: Vec<ASharedVector<i64>> = (0..3)
            .map(|i| {
                let next = (i + 1) % 3;
                let cols = vec![Vector::from_vec(gx[i].clone()), Vector::from_vec(gx[next].clone())];
                ASharedVector::from_evector(EVector::new(cols, 0).unwrap())
            })
            .collect();
        let yv: Vec<ASharedVector<i64>> = (0..3)
            .map(|i| {
                let next = (i + 1) % 3;
                let cols = vec![Vector::from_vec(gy[i].clone()), Vector::from_vec(gy[next].clone())];
                ASharedVector::from_evector(EVector::new(cols, 0).unwrap())
            })
            .collect();

        let mut iter_parties = parties.drain(..);
        let mut p0 = iter_parties.next().unwrap();
        let mut p1 = iter_parties.next().unwrap();
        let mut p2 = iter_parties.next().unwrap();
        let (x0, x1, x2) = (xv[0].clone(), xv[1].clone(), xv[2].clone());
        let (y0, y1, y2) = (yv[0].clone(), yv[1].clone(), yv[2].clone());

        let h1 = std::thread::spawn(move || {
            let z1 = mul_a(&x1, &y1, &mut p1, false).unwrap();
            open_a(&z1, &mut p1).unwrap()
        });
        let h2 = std::thread::spawn(move || {
            let z2 = mul_a(&x2, &y2, &mut p2, false).unwrap();
            open_a(&z2, &mut p2).unwrap()
        });
        let z0 = mul_a(&x0, &y0, &mut p0, false).unwrap();
        let masked_home_0 = z0.inner.column(0).to_plain_vec();
        let opened0 = open_a(&z0, &mut p0).unwrap();
        let opened1 = h1.join().unwrap();
        let opened2 = h2.join().unwrap();

        let expected: Vec<i64> = plain_x.iter().zip(&plain_y).map(|(a, b)| a.wrapping_mul(*b)).collect();
        assert_eq!(opened0, expected);
        assert_eq!(opened1, expected);
        assert_eq!(opened2, expected);

        assert_ne!(
            masked_home_0, raw_home_0,
            "reshared value must not equal the raw, unmasked cross term"
        );
    }
}
