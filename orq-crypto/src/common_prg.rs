//! Common PRG: a keyed AES-CTR generator whose key is agreed at startup by
//! a party group. Only parties holding the key can derive its
//! stream; the nonce increments monotonically so repeated calls never
//! reuse a keystream block.

use std::collections::BTreeMap;

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use ctr::Ctr128BE;
use orq_error::{OrqError, OrqResult};
use orq_vector::{Elem, Vector};

use crate::random_elem::RandomElem;

type Aes128Ctr = Ctr128BE<Aes128>;

/// A non-empty, order-independent set of party ids sharing a key.
pub type PartyGroup = std::collections::BTreeSet<usize>;

pub struct CommonPrg {
    key: [u8; 16],
    nonce: u64,
}

impl CommonPrg {
    /// Construct from a key agreed out-of-band — e.g. via a key-exchange
    /// handshake the communicator layer runs once at session start; that
    /// handshake itself is out of scope here.
    pub fn from_key(key: [u8; 16]) -> Self {
        CommonPrg { key, nonce: 0 }
    }

    fn keystream(&mut self, len_bytes: usize) -> Vec<u8> {
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&self.nonce.to_be_bytes());
        let mut cipher = Aes128Ctr::new((&self.key).into(), (&iv).into());
        let mut buf = vec![0u8; len_bytes];
        cipher.apply_keystream(&mut buf);
        self.increment_nonce();
        buf
    }

    pub fn increment_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }

    pub fn get_next<T: RandomElem + Elem>(&mut self) -> T {
        let bytes = self.keystream(std::mem::size_of::<T>());
        let mut rdr = RawByteRng { bytes, pos: 0 };
        T::random_from(&mut rdr)
    }

    pub fn get_next_vector<T: Elem + RandomElem>(&mut self, len: usize) -> Vector<T> {
        let elem_size = std::mem::size_of::<T>();
        let bytes = self.keystream(elem_size * len);
        let mut rdr = RawByteRng { bytes, pos: 0 };
        let data: Vec<T> = (0..len).map(|_| T::random_from(&mut rdr)).collect();
        Vector::from_vec(data)
    }
}

/// Minimal `RngCore` adapter over a pre-drawn keystream, so `RandomElem`
/// impls can consume it the same way they consume any other RNG.
struct RawByteRng {
    bytes: Vec<u8>,
    pos: usize,
}

impl rand::RngCore for RawByteRng {
    fn next_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        self.fill_bytes(&mut b);
        u32::from_le_bytes(b)
    }
    fn next_u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        self.fill_bytes(&mut b);
        u64::from_le_bytes(b)
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for d in dest {
            *d = self.bytes[self.pos % self.bytes.len().max(1)];
            self.pos += 1;
        }
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Acts as a mapping from relative party rank (or party group) to the
/// `CommonPrg` shared with that peer/group.
pub struct CommonPrgManager {
    num_parties: usize,
    by_rank: Vec<Option<CommonPrg>>,
    by_group: BTreeMap<PartyGroup, CommonPrg>,
}

impl CommonPrgManager {
    pub fn new(num_parties: usize) -> Self {
        let mut by_rank = Vec::with_capacity(num_parties);
        for _ in 0..num_parties {
            by_rank.push(None);
        }
        CommonPrgManager { num_parties, by_rank, by_group: BTreeMap::new() }
    }

    pub fn add_rank(&mut self, relative_rank: i64, prg: CommonPrg) {
        let n = self.num_parties as i64;
        let index = (((relative_rank % n) + n) % n) as usize;
        self.by_rank[index] = Some(prg);
    }

    pub fn add_group(&mut self, group: PartyGroup, prg: CommonPrg) {
        self.by_group.insert(group, prg);
    }

    pub fn get_rank(&mut self, relative_rank: i64) -> OrqResult<&mut CommonPrg> {
        let n = self.num_parties as i64;
        let index = (((relative_rank % n) + n) % n) as usize;
        self.by_rank[index]
            .as_mut()
            .ok_or_else(|| OrqError::invalid_shape(format!("no CommonPRG for relative rank {relative_rank}")))
    }

    pub fn get_group(&mut self, group: &PartyGroup) -> OrqResult<&mut CommonPrg> {
        self.by_group
            .get_mut(group)
            .ok_or_else(|| OrqError::invalid_shape("no CommonPRG for requested group"))
    }

    /// Fill `v` with bytes identical in every member of `group`.
    pub fn populate_common_random<T: Elem + RandomElem>(
        &mut self,
        group: &PartyGroup,
        len: usize,
    ) -> OrqResult<Vector<T>> {
        Ok(self.get_group(group)?.get_next_vector(len))
    }
}

/// Enumerate all `C(n, k)` combinations of `{0..n}` in lexicographic order.
/// One key is instantiated per enumerated set by the caller.
pub fn enumerate_groups(n: usize, k: usize) -> Vec<PartyGroup> {
    if k == 0 || k > n {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut combo: Vec<usize> = (0..k).collect();
    loop {
        result.push(combo.iter().copied().collect());
        // advance to next combination in lexicographic order
        let mut i = k;
        loop {
            if i == 0 {
                return result;
            }
            i -= 1;
            if combo[i] != i + n - k {
                break;
            }
        }
        combo[i] += 1;
        for j in i + 1..k {
            combo[j] = combo[j - 1] + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_same_stream() {
        let mut a = CommonPrg::from_key([7u8; 16]);
        let mut b = CommonPrg::from_key([7u8; 16]);
        let va: Vector<u64> = a.get_next_vector(8);
        let vb: Vector<u64> = b.get_next_vector(8);
        assert_eq!(va.to_plain_vec(), vb.to_plain_vec());
    }

    #[test]
    fn nonce_increment_changes_stream() {
        let mut a = CommonPrg::from_key([7u8; 16]);
        let first: Vec<u64> = a.get_next_vector(4).to_plain_vec();
        let second: Vec<u64> = a.get_next_vector(4).to_plain_vec();
        assert_ne!(first, second);
    }

    #[test]
    fn enumerate_groups_is_lexicographic_c_n_k() {
        let groups = enumerate_groups(4, 2);
        assert_eq!(groups.len(), 6);
        let expected: Vec<PartyGroup> = vec![
            [0, 1].into_iter().collect(),
            [0, 2].into_iter().collect(),
            [0, 3].into_iter().collect(),
            [1, 2].into_iter().collect(),
            [1, 3].into_iter().collect(),
            [2, 3].into_iter().collect(),
        ];
        assert_eq!(groups, expected);
    }
}
