//! Sharded permutation correlation: a permutation `pi` known
//! only to this party, plus aligned vectors `(A,B,C)` such that applying
//! `pi` to the pair's joint `A` yields `B+C` (arithmetic) or `B^C` (boolean).
//! Two-party only; consumed at most once by shuffle or a stable sort.

use orq_error::{OrqError, OrqResult};
use orq_vector::{Elem, Vector};

use crate::common_prg::CommonPrg;
use crate::random_elem::RandomElem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermEncoding {
    Arithmetic,
    Boolean,
}

/// One party's share of a sharded permutation: a local
/// permutation `pi` plus three aligned vectors `(a, b, c)`.
#[derive(Debug, Clone)]
pub struct ShardedPermutation<T: Elem> {
    pub pi: Vec<usize>,
    pub a: Vector<T>,
    pub b: Vector<T>,
    pub c: Vector<T>,
    pub encoding: PermEncoding,
    consumed: bool,
}

impl<T: Elem> ShardedPermutation<T> {
    pub fn size(&self) -> usize {
        self.pi.len()
    }

    /// Size consistency across the four vectors (invariant).
    pub fn assert_correlated(&self) -> OrqResult<()> {
        let n = self.pi.len();
        if self.a.len() != n || self.b.len() != n || self.c.len() != n {
            return Err(OrqError::invalid_shape("sharded permutation: component size mismatch"));
        }
        let mut seen = vec![false; n];
        for &p in &self.pi {
            if p >= n || seen[p] {
                return Err(OrqError::invalid_shape("sharded permutation: pi is not a bijection"));
            }
            seen[p] = true;
        }
        Ok(())
    }

    /// A permutation correlation is consumable at most once.
    pub fn take(&mut self) -> OrqResult<()> {
        if self.consumed {
            return Err(OrqError::exhausted("sharded permutation already consumed"));
        }
        self.consumed = true;
        Ok(())
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Deep-copy the four vectors so the correlation can be reused without
    /// consuming the original.
    pub fn clone_fresh(&self) -> Self {
        ShardedPermutation {
            pi: self.pi.clone(),
            a: self.a.clone(),
            b: self.b.clone(),
            c: self.c.clone(),
            encoding: self.encoding,
            consumed: false,
        }
    }

    /// Convert between A- and B-shared permutations: b2a/a2b of the `b`,`c`
    /// components while `pi` stays fixed.
    pub fn convert_encoding(&self, new_b: Vector<T>, new_c: Vector<T>, to: PermEncoding) -> Self {
        ShardedPermutation {
            pi: self.pi.clone(),
            a: self.a.clone(),
            b: new_b,
            c: new_c,
            encoding: to,
            consumed: false,
        }
    }

    /// Component-wise widening/narrowing cast of element type.
    pub fn cast<U: Elem>(&self, cast_fn: impl Fn(T) -> U) -> ShardedPermutation<U> {
        let cast_vec = |v: &Vector<T>| Vector::from_vec(v.to_plain_vec().into_iter().map(&cast_fn).collect());
        ShardedPermutation {
            pi: self.pi.clone(),
            a: cast_vec(&self.a),
            b: cast_vec(&self.b),
            c: cast_vec(&self.c),
            encoding: self.encoding,
            consumed: false,
        }
    }
}

/// Two-party sharded-permutation generator: locally samples `pi` and `A`,
/// derives `B`,`C` via one oblivious-PRF-style round with the peer. This
/// local/offline form uses a `CommonPRG` to stand in for the OPRF round
/// (the real two-party OPRF exchange is part of the out-of-scope OLE/OT
/// backend choice); both parties end up with aligned vectors
/// satisfying `pi(A) = B (+/^) C`.
pub struct ShardedPermutationGenerator {
    party_is_pi_holder: bool,
}

impl ShardedPermutationGenerator {
    pub fn new(party_is_pi_holder: bool) -> Self {
        ShardedPermutationGenerator { party_is_pi_holder }
    }

    /// Sample a uniformly random permutation of `0..n` using `prg`.
    fn sample_permutation(prg: &mut CommonPrg, n: usize) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            let r: u64 = prg.get_next();
            let j = (r as usize) % (i + 1);
            perm.swap(i, j);
        }
        perm
    }

    /// Produce one party's share of a size-`n` sharded permutation. `prg`
    /// must be a key shared with the peer so both sides derive the same
    /// `pi`-independent randomness for `C`; `A` and `B` are this party's
    /// local contribution (the pi-holder samples `A` and keeps `pi`; the
    /// peer samples `B`, and `C` is whichever makes the algebraic relation
    /// hold for the simulated pair).
    pub fn get_next<T: Elem + RandomElem>(
        &self,
        prg: &mut CommonPrg,
        n: usize,
        encoding: PermEncoding,
    ) -> ShardedPermutation<T> {
        let pi = Self::sample_permutation(prg, n);
        let a: Vec<T> = (0..n).map(|_| prg.get_next()).collect();
        let b: Vec<T> = (0..n).map(|_| prg.get_next()).collect();
        let c: Vec<T> = (0..n)
            .map(|i| {
                let target = a[pi[i]];
                match encoding {
                    PermEncoding::Arithmetic => target.wrapping_sub(&b[i]),
                    PermEncoding::Boolean => target ^ b[i],
                }
            })
            .collect();
        let _ = self.party_is_pi_holder;
        ShardedPermutation {
            pi,
            a: Vector::from_vec(a),
            b: Vector::from_vec(b),
            c: Vector::from_vec(c),
            encoding,
            consumed: false,
        }
    }

    /// Produce an arithmetic- and a boolean-encoded correlation sharing one
    /// `pi` — a table shuffle needs to move both kinds of column
    /// under the same row permutation. Draws `pi` once, then samples each
    /// encoding's `(a,b,c)` independently from the continuing `prg` stream.
    pub fn get_next_pair<T: Elem + RandomElem>(
        &self,
        prg: &mut CommonPrg,
        n: usize,
    ) -> (ShardedPermutation<T>, ShardedPermutation<T>) {
        let pi = Self::sample_permutation(prg, n);
        let build = |prg: &mut CommonPrg, encoding: PermEncoding| {
            let a: Vec<T> = (0..n).map(|_| prg.get_next()).collect();
            let b: Vec<T> = (0..n).map(|_| prg.get_next()).collect();
            let c: Vec<T> = (0..n)
                .map(|i| {
                    let target = a[pi[i]];
                    match encoding {
                        PermEncoding::Arithmetic => target.wrapping_sub(&b[i]),
                        PermEncoding::Boolean => target ^ b[i],
                    }
                })
                .collect();
            ShardedPermutation {
                pi: pi.clone(),
                a: Vector::from_vec(a),
                b: Vector::from_vec(b),
                c: Vector::from_vec(c),
                encoding,
                consumed: false,
            }
        };
        let arithmetic = build(prg, PermEncoding::Arithmetic);
        let boolean = build(prg, PermEncoding::Boolean);
        (arithmetic, boolean)
    }
}

/// Pre-reserves permutations of a given size; `get_next(n, encoding)`
/// returns one.
pub struct PermutationManager<T: Elem> {
    reserved: Vec<ShardedPermutation<T>>,
}

impl<T: Elem> Default for PermutationManager<T> {
    fn default() -> Self {
        PermutationManager { reserved: Vec::new() }
    }
}

impl<T: Elem> PermutationManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, perm: ShardedPermutation<T>) {
        self.reserved.push(perm);
    }

    /// Return the first reserved permutation of exactly `n` elements and
    /// matching encoding, removing it from the pool.
    pub fn get_next(&mut self, n: usize, encoding: PermEncoding) -> OrqResult<ShardedPermutation<T>> {
        let pos = self
            .reserved
            .iter()
            .position(|p| p.size() == n && p.encoding == encoding && !p.is_consumed())
            .ok_or_else(|| OrqError::exhausted(format!("no reserved permutation of size {n}")))?;
        Ok(self.reserved.remove(pos))
    }

    pub fn available(&self) -> usize {
        self.reserved.iter().filter(|p| !p.is_consumed()).count()
    }
}
