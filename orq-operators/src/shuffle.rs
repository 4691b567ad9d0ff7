//! Shuffle: consumes one sharded-permutation correlation of the table's
//! size and applies it to every column in place, so the resulting row
//! order is uniform and unknown to any party.
//!
//! Online protocol, built directly from the correlation's defining
//! relation `pi(A) = B + C` (arithmetic) / `pi(A) = B ^ C` (boolean): mask
//! the pi-holder's share with `A` and open the masked value (one
//! exchange), apply `pi` to the opened value locally, then reshare by
//! handing the pi-holder `B + pi(masked)` and the peer `C` unchanged —
//! their sum telescopes to `pi(x)` because `B + C = pi(A)` cancels the mask
//! exactly. Scoped to the two-party additive scheme, matching the
//! sharded-permutation generator's two-party variant.

use orq_error::{OrqError, OrqResult};
use orq_crypto::{PermEncoding, ShardedPermutation};
use orq_evector::{ASharedVector, BSharedVector, EVector};
use orq_vector::{Elem, Vector};

use orq_protocol::{Communicator, ProtocolParty, Scheme, WireCodec};

use crate::table::{Column, EncodedTable};

fn require_two_party<T: Elem, C>(party: &ProtocolParty<T, C>) -> OrqResult<()>
where
    C: Communicator,
{
    if party.scheme != Scheme::Additive2pc {
        return Err(OrqError::invalid_shape(
            "shuffle: sharded-permutation correlations are two-party only",
        ));
    }
    Ok(())
}

/// Exchange a vector of plaintext-shaped values symmetrically with the
/// sole peer in a 2PC session (mirrors `arithmetic::open_share_pair`, the
/// same lightweight one-hop exchange shuffle's masking step needs).
fn exchange_vec<T, C>(v: &Vector<T>, party: &mut ProtocolParty<T, C>) -> OrqResult<Vector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let tag = party.fresh_tag();
    let peer = party.successor();
    let data = v.to_plain_vec();
    let other = party.comm.exchange_shares(&data, peer, data.len(), tag)?;
    Ok(Vector::from_vec(other))
}

/// Apply one already-reserved permutation correlation to a single
/// plaintext-shaped vector, returning this party's fresh share of the
/// permuted result. `is_pi_holder` selects which side of the telescoping
/// sum this party contributes.
fn shuffle_vec<T, C>(
    home: &Vector<T>,
    perm: &ShardedPermutation<T>,
    party: &mut ProtocolParty<T, C>,
    is_pi_holder: bool,
    xor_mode: bool,
) -> OrqResult<Vector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    let masked = if xor_mode { home.bitxor(&perm.a)? } else { home.sub(&perm.a)? };
    let peer_masked = exchange_vec(&masked, party)?;
    let opened = if xor_mode { masked.bitxor(&peer_masked)? } else { masked.add(&peer_masked)? };
    let permuted = opened.apply_mapping(&perm.pi)?;
    if is_pi_holder {
        if xor_mode { perm.b.bitxor(&permuted) } else { perm.b.add(&permuted) }
    } else {
        Ok(perm.c.clone())
    }
}

/// Shuffle one arithmetic-shared column.
pub fn shuffle_a<T, C>(
    x: &ASharedVector<T>,
    perm: &ShardedPermutation<T>,
    party: &mut ProtocolParty<T, C>,
    is_pi_holder: bool,
) -> OrqResult<ASharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    require_two_party(party)?;
    if perm.encoding != PermEncoding::Arithmetic {
        return Err(OrqError::invalid_shape("shuffle_a: correlation is not arithmetic-encoded"));
    }
    if x.len() != perm.size() {
        return Err(OrqError::invalid_shape("shuffle_a: correlation size mismatch"));
    }
    let home = x.inner.column(0).clone();
    let shuffled = shuffle_vec(&home, perm, party, is_pi_holder, false)?;
    Ok(ASharedVector::from_evector(EVector::new(vec![shuffled], x.precision())?))
}

/// Shuffle one boolean-shared column.
pub fn shuffle_b<T, C>(
    x: &BSharedVector<T>,
    perm: &ShardedPermutation<T>,
    party: &mut ProtocolParty<T, C>,
    is_pi_holder: bool,
) -> OrqResult<BSharedVector<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    require_two_party(party)?;
    if perm.encoding != PermEncoding::Boolean {
        return Err(OrqError::invalid_shape("shuffle_b: correlation is not boolean-encoded"));
    }
    if x.len() != perm.size() {
        return Err(OrqError::invalid_shape("shuffle_b: correlation size mismatch"));
    }
    let home = x.inner.column(0).clone();
    let shuffled = shuffle_vec(&home, perm, party, is_pi_holder, true)?;
    Ok(BSharedVector::from_evector(EVector::new(vec![shuffled], 0)?))
}

/// Shuffle every column of a table (plus `VALID`/`UNIQ`) by the same
/// permutation correlation, consuming it exactly once.
pub fn shuffle_table<T, C>(
    table: &EncodedTable<T>,
    a_perm: &mut ShardedPermutation<T>,
    b_perm: &mut ShardedPermutation<T>,
    party: &mut ProtocolParty<T, C>,
    is_pi_holder: bool,
) -> OrqResult<EncodedTable<T>>
where
    T: Elem + WireCodec,
    C: Communicator,
{
    if a_perm.size() != table.len() || b_perm.size() != table.len() {
        return Err(OrqError::invalid_shape("shuffle_table: correlation size mismatch"));
    }
    a_perm.assert_correlated()?;
    b_perm.assert_correlated()?;
    a_perm.take()?;
    b_perm.take()?;

    let mut columns = Vec::with_capacity(table.names().len());
    for name in table.names() {
        let col = table.column(name)?;
        let shuffled = match col {
            Column::Arithmetic(v) => Column::Arithmetic(shuffle_a(v, a_perm, party, is_pi_holder)?),
            Column::Boolean(v) => Column::Boolean(shuffle_b(v, b_perm, party, is_pi_holder)?),
        };
        columns.push((name.clone(), shuffled));
    }
    let valid = shuffle_b(table.valid(), b_perm, party, is_pi_holder)?;
    let mut out = EncodedTable::new(columns, valid)?;
    if let Some(u) = table.uniq() {
        out.set_uniq(shuffle_b(u, b_perm, party, is_pi_holder)?)?;
    }
    Ok(out)
}
