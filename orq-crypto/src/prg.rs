//! Local PRG: per-party, seeded from OS entropy at startup, used to draw
//! plaintext randomness nobody else needs to reproduce.

use orq_vector::{Elem, Vector};
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::random_elem::RandomElem;

pub struct LocalPrg {
    rng: StdRng,
}

impl LocalPrg {
    /// Seed from the OS entropy source.
    pub fn new() -> Self {
        LocalPrg { rng: StdRng::from_entropy() }
    }

    /// Deterministic seed, used by tests and by the dummy OLE/permutation
    /// generators that need reproducible runs.
    pub fn from_seed(seed: u64) -> Self {
        LocalPrg { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn get_next<T: RandomElem>(&mut self) -> T {
        T::random_from(&mut self.rng)
    }

    pub fn get_next_vector<T: Elem + RandomElem>(&mut self, len: usize) -> Vector<T> {
        let data: Vec<T> = (0..len).map(|_| self.get_next()).collect();
        Vector::from_vec(data)
    }

    pub fn fill_bytes(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }
}

impl Default for LocalPrg {
    fn default() -> Self {
        Self::new()
    }
}
