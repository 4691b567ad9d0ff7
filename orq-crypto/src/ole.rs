//! OLE / rOT provider: two-party oblivious-linear-evaluation,
//! the primitive Beaver triples are built from in the 2PC setting.
//! Pluggable: this crate ships the *dummy* variant (a shared PRG, insecure,
//! test-only); a real silent-OT backend is an external collaborator.

use orq_error::{OrqError, OrqResult};
use orq_vector::Elem;

use crate::common_prg::CommonPrg;
use crate::random_elem::RandomElem;

/// One half of an OLE/rOT pair: `(a, b)` such that, paired with the peer's
/// `(a', b')`, `a + a' = b * b'` (arithmetic) or `a ^ a' = b & b'` (binary).
#[derive(Debug, Clone)]
pub struct OleHalf<T> {
    pub a: T,
    pub b: T,
}

pub trait OleProvider<T: Elem> {
    /// Produce `n` arithmetic OLE halves for this party.
    fn next_arithmetic(&mut self, n: usize) -> OrqResult<Vec<OleHalf<T>>>;

    /// Produce `n` binary rOT/OLE halves for this party.
    fn next_binary(&mut self, n: usize) -> OrqResult<Vec<OleHalf<T>>>;

    /// Sanity check consumed by every correlation generator's tests:
    /// given both parties' halves, confirm the algebraic relation holds.
    /// Only meaningful with test data where both sides are visible; real
    /// sessions never see the peer's half directly.
    fn assert_correlated_arithmetic(mine: &OleHalf<T>, theirs: &OleHalf<T>) -> bool
    where
        T: PartialEq + Copy + std::ops::Add<Output = T> + std::ops::Mul<Output = T>,
    {
        mine.a + theirs.a == mine.b * theirs.b
    }
}

/// Dummy OLE: uses a PRG shared with the peer instead of a real silent-OT
/// exchange. Not secure, test-only, but it gives both sides of the pair a
/// correlation with the right algebraic shape so Beaver-triple tests can
/// run without a network.
pub struct DummyOle {
    shared: CommonPrg,
    is_sender: bool,
}

impl DummyOle {
    pub fn new(shared_key: [u8; 16], is_sender: bool) -> Self {
        DummyOle { shared: CommonPrg::from_key(shared_key), is_sender }
    }
}

impl<T: Elem + RandomElem> OleProvider<T> for DummyOle
where
    T: std::ops::Mul<Output = T> + std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
{
    fn next_arithmetic(&mut self, n: usize) -> OrqResult<Vec<OleHalf<T>>> {
        if n == 0 {
            return Err(OrqError::exhausted("next_arithmetic: requested zero elements"));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            // Both sides draw the same (b, b') and (a_sender) from the
            // shared stream; the receiver's `a` is derived to satisfy
            // a + a' = b * b'.
            let b_mine: T = self.shared.get_next();
            let b_theirs: T = self.shared.get_next();
            let product = b_mine * b_theirs;
            if self.is_sender {
                let a_mine: T = self.shared.get_next();
                out.push(OleHalf { a: a_mine, b: b_mine });
            } else {
                let a_sender: T = self.shared.get_next();
                let a_mine = product - a_sender;
                out.push(OleHalf { a: a_mine, b: b_theirs });
            }
        }
        Ok(out)
    }

    fn next_binary(&mut self, n: usize) -> OrqResult<Vec<OleHalf<T>>> {
        if n == 0 {
            return Err(OrqError::exhausted("next_binary: requested zero elements"));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let b_mine: T = self.shared.get_next();
            let b_theirs: T = self.shared.get_next();
            let product = b_mine & b_theirs;
            if self.is_sender {
                let a_mine: T = self.shared.get_next();
                out.push(OleHalf { a: a_mine, b: b_mine });
            } else {
                let a_sender: T = self.shared.get_next();
                let a_mine = product ^ a_sender;
                out.push(OleHalf { a: a_mine, b: b_theirs });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_ole_arithmetic_is_correlated() {
        let key = [42u8; 16];
        let mut sender = DummyOle::new(key, true);
        let mut receiver = DummyOle::new(key, false);
        let mine = sender.next_arithmetic::<i64>(3).unwrap();
        let theirs = receiver.next_arithmetic::<i64>(3).unwrap();
        for (m, t) in mine.iter().zip(theirs.iter()) {
            assert_eq!(m.a.wrapping_add(t.a), m.b.wrapping_mul(t.b));
        }
    }

    #[test]
    fn dummy_ole_binary_is_correlated() {
        let key = [7u8; 16];
        let mut sender = DummyOle::new(key, true);
        let mut receiver = DummyOle::new(key, false);
        let mine = sender.next_binary::<u64>(3).unwrap();
        let theirs = receiver.next_binary::<u64>(3).unwrap();
        for (m, t) in mine.iter().zip(theirs.iter()) {
            assert_eq!(m.a ^ t.a, m.b & t.b);
        }
    }
}
