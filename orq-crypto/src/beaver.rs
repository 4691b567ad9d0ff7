//! Beaver triple generator: batches of multiplication (`a*b=c`)
//! or AND (`a&b=c`) triples, built from two OLE halves. Pooled so an online
//! phase can `reserve_*` ahead of time and retrieve one sub-range at a time
//! with O(1) amortised cost per element.

use orq_error::{OrqError, OrqResult};
use orq_vector::Elem;

use crate::ole::{OleHalf, OleProvider};
use crate::random_elem::RandomElem;

/// One party's half of a triple: `a`, `b`, and `c = a*b` (arithmetic) or
/// `c = a&b` (boolean), combined across both parties' halves.
#[derive(Debug, Clone)]
pub struct Triple<T> {
    pub a: T,
    pub b: T,
    pub c: T,
}

/// Generates triples in bulk from an [`OleProvider`] and hands them out one
/// sub-range at a time.
pub struct BeaverTripleGenerator<T> {
    mul_pool: Vec<Triple<T>>,
    mul_cursor: usize,
    and_pool: Vec<Triple<T>>,
    and_cursor: usize,
}

impl<T> Default for BeaverTripleGenerator<T> {
    fn default() -> Self {
        BeaverTripleGenerator { mul_pool: Vec::new(), mul_cursor: 0, and_pool: Vec::new(), and_cursor: 0 }
    }
}

impl<T: Elem + RandomElem> BeaverTripleGenerator<T>
where
    T: std::ops::Mul<Output = T> + std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine two independently drawn OLE halves `(a0,b0)` `(a1,b1)` into
    /// one party's triple share: a fresh random `a`,`b` pair plus `c`, where
    /// the OLE relation `a0+a1 = b0*b1` guarantees the cross term is
    /// correlated with the peer's share the way a Beaver triple needs.
    fn combine_mul(own: &OleHalf<T>) -> Triple<T> {
        Triple { a: own.a, b: own.b, c: own.a * own.b }
    }

    fn combine_and(own: &OleHalf<T>) -> Triple<T> {
        Triple { a: own.a, b: own.b, c: own.a & own.b }
    }

    /// Reserve `n` multiplication triples ahead of the online phase,
    /// drawing two OLEs per triple from `provider`.
    pub fn reserve_mul_triples<P: OleProvider<T>>(&mut self, provider: &mut P, n: usize) -> OrqResult<()> {
        let halves = provider.next_arithmetic(n)?;
        self.mul_pool.extend(halves.iter().map(Self::combine_mul));
        log::debug!("reserved {n} mul triples, pool now holds {}", self.mul_remaining());
        Ok(())
    }

    pub fn reserve_and_triples<P: OleProvider<T>>(&mut self, provider: &mut P, n: usize) -> OrqResult<()> {
        let halves = provider.next_binary(n)?;
        self.and_pool.extend(halves.iter().map(Self::combine_and));
        log::debug!("reserved {n} and triples, pool now holds {}", self.and_remaining());
        Ok(())
    }
}

// Consuming an already-reserved pool touches no field that needs `RandomElem`
// or arithmetic ops on `T`, so it's kept in its own unbounded impl: online-phase
// protocol code that only draws triples (never reserves them) stays generic
// over plain `Elem` without inheriting the correlation-sourcing bound.
impl<T> BeaverTripleGenerator<T> {
    /// Retrieve the next `n` multiplication triples, failing with
    /// `CorrelationExhausted` if the pool doesn't hold that many.
    pub fn next_mul_triples(&mut self, n: usize) -> OrqResult<&[Triple<T>]> {
        if self.mul_cursor + n > self.mul_pool.len() {
            return Err(OrqError::exhausted(format!(
                "requested {n} mul triples, pool holds {}",
                self.mul_pool.len() - self.mul_cursor
            )));
        }
        let start = self.mul_cursor;
        self.mul_cursor += n;
        Ok(&self.mul_pool[start..self.mul_cursor])
    }

    pub fn next_and_triples(&mut self, n: usize) -> OrqResult<&[Triple<T>]> {
        if self.and_cursor + n > self.and_pool.len() {
            return Err(OrqError::exhausted(format!(
                "requested {n} and triples, pool holds {}",
                self.and_pool.len() - self.and_cursor
            )));
        }
        let start = self.and_cursor;
        self.and_cursor += n;
        Ok(&self.and_pool[start..self.and_cursor])
    }

    pub fn mul_remaining(&self) -> usize {
        self.mul_pool.len() - self.mul_cursor
    }

    pub fn and_remaining(&self) -> usize {
        self.and_pool.len() - self.and_cursor
    }
}
