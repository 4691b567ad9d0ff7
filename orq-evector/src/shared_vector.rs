//! `ASharedVector<T>` / `BSharedVector<T>`: an `EVector<T>` tagged with its
//! share encoding. Every operation here is the local half of the
//! protocol surface — additions/XORs/shifts/public constants that need no
//! correlation or peer round-trip. Multiplications, ANDs, comparisons, and
//! conversions that consume cryptographic correlations live one layer up,
//! in `orq-protocol`, which takes these types as its operands.

use orq_error::{OrqError, OrqResult};
use orq_vector::{Elem, Vector};

use crate::evector::EVector;

/// Two share encodings: arithmetic shares reconstruct by summing
/// mod 2^w, boolean shares reconstruct by XOR-ing. `Serialize`/`Deserialize`
/// let this tag travel alongside a share in any persisted or wire record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Encoding {
    Arithmetic,
    Boolean,
}

#[derive(Debug, Clone)]
pub struct ASharedVector<T: Elem> {
    pub inner: EVector<T>,
}

#[derive(Debug, Clone)]
pub struct BSharedVector<T: Elem> {
    pub inner: EVector<T>,
}

impl<T: Elem> ASharedVector<T> {
    pub fn from_evector(inner: EVector<T>) -> Self {
        ASharedVector { inner }
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::Arithmetic
    }

    pub fn inner(&self) -> &EVector<T> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut EVector<T> {
        &mut self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn replication(&self) -> usize {
        self.inner.replication()
    }

    pub fn precision(&self) -> u32 {
        self.inner.precision()
    }

    /// Local arithmetic addition: each share column summed independently.
    pub fn add_a(&self, other: &Self) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.add_local(&other.inner)? })
    }

    pub fn sub_a(&self, other: &Self) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.sub_local(&other.inner)? })
    }

    /// Multiply by a public constant, local (edge policy: public
    /// constants on the right-hand side only).
    pub fn mul_public(&self, constant: T, truncate: bool) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.mul_public(constant, truncate)? })
    }

    pub fn div_public(&self, constant: T) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.div_public(constant)? })
    }

    pub fn slice(&self, from: usize, to: usize) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.slice(from, to)? })
    }

    pub fn mapping_reference(&self, idx: &[usize]) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.mapping_reference(idx)? })
    }

    pub fn apply_mapping(&self, perm: &[usize]) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.apply_mapping(perm)? })
    }

    pub fn scatter(&self, idx: &[usize], values: &Self) -> OrqResult<Self> {
        Ok(ASharedVector { inner: self.inner.scatter(idx, &values.inner)? })
    }

    /// Reconstruct in the clear by summing all R share columns mod 2^w.
    /// This models the local half of `open`/`reveal`; the
    /// runtime-level exchange of shares between parties happens in
    /// `orq-protocol::open`.
    pub fn reconstruct_local(&self) -> Vec<T> {
        let n = self.len();
        let mut out = vec![T::zero(); n];
        for col in self.inner.columns() {
            for i in 0..n {
                out[i] = out[i].wrapping_add(&col.get(i));
            }
        }
        out
    }
}

impl<T: Elem> BSharedVector<T> {
    pub fn from_evector(inner: EVector<T>) -> Self {
        BSharedVector { inner }
    }

    pub fn encoding(&self) -> Encoding {
        Encoding::Boolean
    }

    pub fn inner(&self) -> &EVector<T> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut EVector<T> {
        &mut self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn replication(&self) -> usize {
        self.inner.replication()
    }

    /// Local XOR: boolean shares compose by XOR-ing each column.
    pub fn xor_b(&self, other: &Self) -> OrqResult<Self> {
        Ok(BSharedVector { inner: self.inner.xor_local(&other.inner)? })
    }

    pub fn shl(&self, bits: u32) -> Self {
        BSharedVector { inner: self.inner.shl(bits) }
    }

    pub fn shr(&self, bits: u32) -> Self {
        BSharedVector { inner: self.inner.shr(bits) }
    }

    /// Bitwise AND with a public mask, local (see `EVector::band_public`).
    pub fn band_public(&self, mask: T) -> OrqResult<Self> {
        Ok(BSharedVector { inner: self.inner.band_public(mask)? })
    }

    pub fn slice(&self, from: usize, to: usize) -> OrqResult<Self> {
        Ok(BSharedVector { inner: self.inner.slice(from, to)? })
    }

    pub fn mapping_reference(&self, idx: &[usize]) -> OrqResult<Self> {
        Ok(BSharedVector { inner: self.inner.mapping_reference(idx)? })
    }

    pub fn apply_mapping(&self, perm: &[usize]) -> OrqResult<Self> {
        Ok(BSharedVector { inner: self.inner.apply_mapping(perm)? })
    }

    pub fn scatter(&self, idx: &[usize], values: &Self) -> OrqResult<Self> {
        Ok(BSharedVector { inner: self.inner.scatter(idx, &values.inner)? })
    }

    /// Reconstruct in the clear by XOR-ing all R share columns.
    pub fn reconstruct_local(&self) -> Vec<T> {
        let n = self.len();
        let mut out = vec![T::zero(); n];
        for col in self.inner.columns() {
            for i in 0..n {
                out[i] = out[i] ^ col.get(i);
            }
        }
        out
    }
}

/// Plaintext-side helper: split a plaintext value into `r` arithmetic
/// shares summing to it mod 2^w, given `r-1` random masks. Used by tests
/// and by the (out-of-scope) data-owner encoder to seed a session; the
/// core itself never generates shares from a full plaintext view of
/// another party's data.
pub fn share_arithmetic<T: Elem>(plain: &[T], masks: &[Vec<T>]) -> OrqResult<Vec<Vector<T>>> {
    let r = masks.len() + 1;
    if r == 0 {
        return Err(OrqError::invalid_shape("share_arithmetic: need at least one mask row"));
    }
    for m in masks {
        if m.len() != plain.len() {
            return Err(OrqError::invalid_shape("share_arithmetic: mask length mismatch"));
        }
    }
    let mut columns: Vec<Vec<T>> = masks.to_vec();
    let mut last = plain.to_vec();
    for m in &masks[..] {
        for i in 0..last.len() {
            last[i] = last[i].wrapping_sub(&m[i]);
        }
    }
    columns.push(last);
    Ok(columns.into_iter().map(Vector::from_vec).collect())
}

/// Plaintext-side helper, boolean analogue of [`share_arithmetic`]: XOR
/// masks instead of subtracting them.
pub fn share_boolean<T: Elem>(plain: &[T], masks: &[Vec<T>]) -> OrqResult<Vec<Vector<T>>> {
    for m in masks {
        if m.len() != plain.len() {
            return Err(OrqError::invalid_shape("share_boolean: mask length mismatch"));
        }
    }
    let mut columns: Vec<Vec<T>> = masks.to_vec();
    let mut last = plain.to_vec();
    for m in masks {
        for i in 0..last.len() {
            last[i] = last[i] ^ m[i];
        }
    }
    columns.push(last);
    Ok(columns.into_iter().map(Vector::from_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_share_reconstructs() {
        let plain = vec![10i64, 20, 30];
        let masks = vec![vec![1i64, 2, 3], vec![4, 5, 6]];
        let cols = share_arithmetic(&plain, &masks).unwrap();
        let ev = EVector::new(cols, 0).unwrap();
        let shared = ASharedVector::from_evector(ev);
        assert_eq!(shared.reconstruct_local(), plain);
    }

    #[test]
    fn boolean_share_reconstructs() {
        let plain = vec![0b101i64, 0b010, 0b111];
        let masks = vec![vec![0b001i64, 0b011, 0b100]];
        let cols = share_boolean(&plain, &masks).unwrap();
        let ev = EVector::new(cols, 0).unwrap();
        let shared = BSharedVector::from_evector(ev);
        assert_eq!(shared.reconstruct_local(), plain);
    }

    #[test]
    fn add_a_opens_to_sum() {
        let a = share_arithmetic(&[5i32, 7], &[vec![1, 1]]).unwrap();
        let b = share_arithmetic(&[2i32, 3], &[vec![9, 9]]).unwrap();
        let av = ASharedVector::from_evector(EVector::new(a, 0).unwrap());
        let bv = ASharedVector::from_evector(EVector::new(b, 0).unwrap());
        let sum = av.add_a(&bv).unwrap();
        assert_eq!(sum.reconstruct_local(), vec![7, 10]);
    }
}
