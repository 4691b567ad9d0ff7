//! Malicious check: an end-of-session MAC-verification pass for the
//! authenticated `Scheme::Malicious2pc` build. Honest-majority schemes carry
//! no in-protocol integrity check by design — `malicious_check` is a no-op
//! for them.

use orq_crypto::RandomElem;
use orq_error::{OrqError, OrqResult};
use orq_protocol::{Communicator, ProtocolParty, Scheme, WireCodec};
use orq_vector::Elem;

/// Open a random linear combination of every outstanding `(value, mac)`
/// pair this party recorded since the last check, and compare the opened
/// MAC against `key * value`. Aborts the session with `IntegrityFailed` on
/// mismatch, leaves no partial result returned.
pub fn malicious_check<T, C>(party: &mut ProtocolParty<T, C>) -> OrqResult<()>
where
    T: Elem + WireCodec + RandomElem,
    C: Communicator,
{
    if !party.scheme.is_authenticated() {
        return Ok(());
    }
    let key = party
        .mac_key
        .ok_or_else(|| OrqError::invalid_shape("malicious_check: no MAC key set for authenticated scheme"))?;
    let log: Vec<(T, T)> = party.mac_log().to_vec();
    if log.is_empty() {
        party.clear_mac_log();
        return Ok(());
    }

    let coeffs: Vec<T> = (0..log.len()).map(|_| party.local_prg.get_next()).collect();
    let combined_value = log
        .iter()
        .zip(&coeffs)
        .fold(T::zero(), |acc, ((v, _), r)| acc.wrapping_add(&r.wrapping_mul(v)));
    let combined_mac = log
        .iter()
        .zip(&coeffs)
        .fold(T::zero(), |acc, ((_, m), r)| acc.wrapping_add(&r.wrapping_mul(m)));

    let peer = party.successor();
    let value_tag = party.fresh_tag();
    let opened_values =
        party.comm.exchange_shares(&[combined_value], peer, 1, value_tag)?;
    let mac_tag = party.fresh_tag();
    let opened_macs = party.comm.exchange_shares(&[combined_mac], peer, 1, mac_tag)?;

    let value = combined_value.wrapping_add(&opened_values[0]);
    let mac = combined_mac.wrapping_add(&opened_macs[0]);
    let expected = key.wrapping_mul(&value);

    party.clear_mac_log();

    if mac != expected {
        return Err(OrqError::integrity_failed("malicious_check: MAC does not match session key times opened value"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_protocol::communicator::LoopbackCommunicator;

    #[test]
    fn honest_majority_scheme_is_a_no_op() {
        let comm = LoopbackCommunicator::mesh(1).pop().unwrap();
        let mut party: ProtocolParty<i64, _> = ProtocolParty::new(0, Scheme::Replicated3pc, comm);
        party.record_mac(5, 999); // a bogus pair that would fail if checked
        assert!(malicious_check(&mut party).is_ok());
    }

    #[test]
    fn consistent_macs_pass_and_inconsistent_ones_fail() {
        let mut comms = LoopbackCommunicator::mesh(2).into_iter();
        let comm0 = comms.next().unwrap();
        let comm1 = comms.next().unwrap();

        let key = 7i64;
        let value = 41i64;
        let value0 = 12i64;
        let value1 = value.wrapping_sub(value0);
        let mac = key.wrapping_mul(&value);
        let mac0 = 3i64;
        let mac1 = mac.wrapping_sub(mac0);

        let mut p0: ProtocolParty<i64, _> = ProtocolParty::new(0, Scheme::Malicious2pc, comm0).with_mac_key(key);
        let mut p1: ProtocolParty<i64, _> = ProtocolParty::new(1, Scheme::Malicious2pc, comm1).with_mac_key(key);
        p0.record_mac(value0, mac0);
        p1.record_mac(value1, mac1);

        let h1 = std::thread::spawn(move || malicious_check(&mut p1));
        let r0 = malicious_check(&mut p0);
        let r1 = h1.join().unwrap();
        assert!(r0.is_ok());
        assert!(r1.is_ok());
    }

    #[test]
    fn tampered_mac_is_rejected() {
        let mut comms = LoopbackCommunicator::mesh(2).into_iter();
        let comm0 = comms.next().unwrap();
        let comm1 = comms.next().unwrap();

        let key = 7i64;
        let mut p0: ProtocolParty<i64, _> = ProtocolParty::new(0, Scheme::Malicious2pc, comm0).with_mac_key(key);
        let mut p1: ProtocolParty<i64, _> = ProtocolParty::new(1, Scheme::Malicious2pc, comm1).with_mac_key(key);
        p0.record_mac(10, 70); // honest: mac = key*value
        p1.record_mac(0, 1);   // tampered: does not satisfy mac = key*value

        let h1 = std::thread::spawn(move || malicious_check(&mut p1));
        let r0 = malicious_check(&mut p0);
        let r1 = h1.join().unwrap();
        assert!(r0.is_err());
        assert!(r1.is_err());
    }
}
