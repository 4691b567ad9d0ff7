//! Zero-sharing generator: given the N-1 pairwise common PRGs this party
//! holds, produces a share whose sum across all N parties is zero. Used to
//! re-randomize intermediate values without changing the secret they encode.

use orq_error::OrqResult;
use orq_vector::{Elem, Vector};

use crate::common_prg::{CommonPrgManager, PartyGroup};
use crate::random_elem::RandomElem;

pub struct ZeroSharingGenerator {
    party_id: usize,
    num_parties: usize,
}

impl ZeroSharingGenerator {
    pub fn new(party_id: usize, num_parties: usize) -> Self {
        ZeroSharingGenerator { party_id, num_parties }
    }

    /// Arithmetic zero share of length `len`: every pairwise common PRG
    /// contributes `+x` to one party and `-x` to the other, so the sum
    /// across all N parties' outputs is zero mod 2^w.
    pub fn get_next_arithmetic<T: Elem + RandomElem>(
        &self,
        prgs: &mut CommonPrgManager,
        len: usize,
    ) -> Vector<T> {
        let mut acc = vec![T::zero(); len];
        for r in 1..self.num_parties {
            let peer = (self.party_id + r) % self.num_parties;
            let sign_is_positive = self.party_id < peer;
            // relative rank from this party's perspective
            let relative_rank = r as i64;
            if let Ok(prg) = prgs.get_rank(relative_rank) {
                let draw: Vec<T> = prg.get_next_vector::<T>(len).to_plain_vec();
                for i in 0..len {
                    acc[i] = if sign_is_positive {
                        acc[i].wrapping_add(&draw[i])
                    } else {
                        acc[i].wrapping_sub(&draw[i])
                    };
                }
            }
        }
        Vector::from_vec(acc)
    }

    /// Boolean zero share: XOR-sum of all pairwise draws is zero because
    /// every draw appears exactly twice (once for each side of the pair).
    pub fn get_next_binary<T: Elem + RandomElem>(&self, prgs: &mut CommonPrgManager, len: usize) -> Vector<T> {
        let mut acc = vec![T::zero(); len];
        for r in 1..self.num_parties {
            let relative_rank = r as i64;
            if let Ok(prg) = prgs.get_rank(relative_rank) {
                let draw: Vec<T> = prg.get_next_vector::<T>(len).to_plain_vec();
                for i in 0..len {
                    acc[i] = acc[i] ^ draw[i];
                }
            }
        }
        Vector::from_vec(acc)
    }

    /// Extend to a zero-sharing across an arbitrary group of parties
    /// instead of the whole session.
    pub fn group_get_next_arithmetic<T: Elem + RandomElem>(
        &self,
        prgs: &mut CommonPrgManager,
        group: &PartyGroup,
        len: usize,
    ) -> OrqResult<Vector<T>> {
        let mut acc = vec![T::zero(); len];
        let members: Vec<usize> = group.iter().copied().collect();
        if let Some(my_pos) = members.iter().position(|&p| p == self.party_id) {
            for (pos, &other) in members.iter().enumerate() {
                if other == self.party_id {
                    continue;
                }
                let sign_is_positive = my_pos < pos;
                let draw: Vec<T> = prgs.populate_common_random::<T>(group, len)?.to_plain_vec();
                for i in 0..len {
                    acc[i] = if sign_is_positive {
                        acc[i].wrapping_add(&draw[i])
                    } else {
                        acc[i].wrapping_sub(&draw[i])
                    };
                }
            }
        }
        Ok(Vector::from_vec(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_prg::CommonPrg;

    #[test]
    fn three_party_arithmetic_zero_share_sums_to_zero() {
        // Symmetric keys: party i<->j share key derived as min(i,j),max(i,j).
        let keys = [[1u8; 16], [2u8; 16], [3u8; 16]];
        let mut mgrs: Vec<CommonPrgManager> = (0..3).map(|_| CommonPrgManager::new(3)).collect();
        // pair (0,1) uses keys[0], (0,2) uses keys[1], (1,2) uses keys[2]
        mgrs[0].add_rank(1, CommonPrg::from_key(keys[0]));
        mgrs[1].add_rank(-1, CommonPrg::from_key(keys[0]));
        mgrs[0].add_rank(2, CommonPrg::from_key(keys[1]));
        mgrs[2].add_rank(-2, CommonPrg::from_key(keys[1]));
        mgrs[1].add_rank(1, CommonPrg::from_key(keys[2]));
        mgrs[2].add_rank(-1, CommonPrg::from_key(keys[2]));

        let gens: Vec<ZeroSharingGenerator> =
            (0..3).map(|i| ZeroSharingGenerator::new(i, 3)).collect();
        let shares: Vec<Vec<i64>> = (0..3)
            .map(|i| gens[i].get_next_arithmetic::<i64>(&mut mgrs[i], 4).to_plain_vec())
            .collect();

        for pos in 0..4 {
            let sum: i64 = shares.iter().map(|s| s[pos]).fold(0i64, |a, b| a.wrapping_add(b));
            assert_eq!(sum, 0);
        }
    }
}
