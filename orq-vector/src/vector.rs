//! `Vector<T>`: an owned, contiguous sequence of machine integers plus an
//! optional access mapping. This layer carries no cryptography;
//! it is pure data-parallel algebra shared by every share encoding above it.

use std::sync::Arc;

use num_traits::{PrimInt, WrappingAdd, WrappingMul, WrappingSub};
use orq_error::{OrqError, OrqResult};

use crate::mapping::Mapping;

/// Bound satisfied by every share/plaintext element type ORQ moves: the
/// machine integers (i8..i128 and unsigned peers). Sharing is additive mod
/// 2^w, so every arithmetic combinator below goes through the `Wrapping*`
/// ops rather than the panicking-on-overflow defaults `PrimInt`'s `Num`
/// bound would otherwise pull in.
pub trait Elem:
    PrimInt + WrappingAdd + WrappingSub + WrappingMul + Default + std::fmt::Debug + Send + Sync + 'static
{
}
impl<T> Elem for T where
    T: PrimInt + WrappingAdd + WrappingSub + WrappingMul + Default + std::fmt::Debug + Send + Sync + 'static
{
}

/// An owned sequence of `T` with a lazy access mapping.
///
/// Storage is reference-counted (`Arc`) so that slicing and other view
/// constructors are zero-copy: they clone the `Arc` and attach a new
/// `Mapping`, never the underlying buffer. A mutating operation performs a
/// copy-on-write materialisation of storage (`Arc::make_mut`) the first
/// time it needs exclusive access.
#[derive(Debug, Clone)]
pub struct Vector<T: Elem> {
    storage: Arc<Vec<T>>,
    mapping: Mapping,
}

impl<T: Elem> Vector<T> {
    /// Construct from a plaintext buffer (takes ownership, no mapping).
    pub fn from_vec(data: Vec<T>) -> Self {
        let len = data.len();
        Vector {
            storage: Arc::new(data),
            mapping: Mapping::identity(len),
        }
    }

    /// Size + fill constructor.
    pub fn filled(size: usize, value: T) -> Self {
        Vector::from_vec(vec![value; size])
    }

    /// Logical length: the mapping's length, which may differ from storage
    /// length for a view.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn storage_len(&self) -> usize {
        self.storage.len()
    }

    /// Total (underlying) storage size. Never less than `len`.
    pub fn total_size(&self) -> usize {
        self.storage_len()
    }

    pub fn get(&self, i: usize) -> T {
        self.storage[self.mapping.resolve(i)]
    }

    fn with_mapping(&self, mapping: Mapping) -> Self {
        Vector {
            storage: Arc::clone(&self.storage),
            mapping,
        }
    }

    /// `slice(from, to)`: contiguous logical sub-range, zero-copy.
    pub fn slice(&self, from: usize, to: usize) -> OrqResult<Self> {
        if from > to || to > self.len() {
            return Err(OrqError::invalid_shape(format!(
                "slice({from},{to}) out of range for length {}",
                self.len()
            )));
        }
        let base: Vec<usize> = (from..to).map(|i| self.mapping.resolve(i)).collect();
        Ok(self.with_mapping(Mapping::Arbitrary { indices: base }))
    }

    pub fn simple_subset_reference(&self, start: usize, stride: usize, count: usize) -> OrqResult<Self> {
        let m = Mapping::Range { start, stride, count };
        self.composed_view(m)
    }

    pub fn alternating_subset_reference(&self, n1: usize, n0: usize) -> OrqResult<Self> {
        if n1 == 0 {
            return Err(OrqError::invalid_shape("alternating_subset_reference: n1 must be > 0"));
        }
        let period = n1 + n0;
        let periods = self.len() / period;
        let remainder = (self.len() % period).min(n1);
        let len = periods * n1 + remainder;
        self.composed_view(Mapping::Alternating { n1, n0, len })
    }

    pub fn reversed_alternating_subset_reference(&self, n1: usize, n0: usize) -> OrqResult<Self> {
        if n1 == 0 {
            return Err(OrqError::invalid_shape(
                "reversed_alternating_subset_reference: n1 must be > 0",
            ));
        }
        let period = n1 + n0;
        let periods = self.len() / period;
        let remainder = (self.len() % period).min(n1);
        let len = periods * n1 + remainder;
        self.composed_view(Mapping::ReversedAlternating { n1, n0, len })
    }

    pub fn repeated_subset_reference(&self, k: usize) -> OrqResult<Self> {
        if k == 0 {
            return Err(OrqError::invalid_shape("repeated_subset_reference: k must be > 0"));
        }
        let len = self.len() * k;
        self.composed_view(Mapping::Repeated { k, len })
    }

    pub fn cyclic_subset_reference(&self, k: usize) -> OrqResult<Self> {
        if self.is_empty() && k > 0 {
            return Err(OrqError::invalid_shape("cyclic_subset_reference: empty base vector"));
        }
        let base_len = self.len();
        self.composed_view(Mapping::Cyclic {
            base_len,
            len: base_len * k,
        })
    }

    pub fn directed_subset_reference(&self, step: i64) -> OrqResult<Self> {
        if step != 1 && step != -1 {
            return Err(OrqError::invalid_shape("directed_subset_reference: step must be +-1"));
        }
        let len = self.len();
        self.composed_view(Mapping::Directed { step, len })
    }

    /// Select logical positions where `mask[i]` is true, compacting.
    pub fn included_reference(&self, mask: &[bool]) -> OrqResult<Self> {
        if mask.len() != self.len() {
            return Err(OrqError::invalid_shape("included_reference: mask length mismatch"));
        }
        let indices: Vec<usize> = (0..self.len()).filter(|&i| mask[i]).collect();
        self.composed_view(Mapping::Arbitrary { indices })
    }

    /// Arbitrary gather by explicit logical index list.
    pub fn mapping_reference(&self, index_list: &[usize]) -> OrqResult<Self> {
        for &i in index_list {
            if i >= self.len() {
                return Err(OrqError::invalid_shape("mapping_reference: index out of range"));
            }
        }
        self.composed_view(Mapping::Arbitrary {
            indices: index_list.to_vec(),
        })
    }

    fn composed_view(&self, outer: Mapping) -> OrqResult<Self> {
        if outer.is_empty() {
            return Err(OrqError::invalid_shape("mapping-over-mapping yields zero length"));
        }
        Ok(self.with_mapping(self.mapping.compose(&outer)))
    }

    /// Walk the mapping once into fresh contiguous storage (identity map).
    pub fn materialize(&self) -> Self {
        if matches!(self.mapping, Mapping::Identity { .. }) {
            return self.clone();
        }
        let data: Vec<T> = (0..self.len()).map(|i| self.get(i)).collect();
        Vector::from_vec(data)
    }

    /// Apply an explicit permutation (a full reordering of this vector's
    /// logical elements) and materialize it.
    pub fn apply_mapping(&self, perm: &[usize]) -> OrqResult<Self> {
        if perm.len() != self.len() {
            return Err(OrqError::invalid_shape("apply_mapping: permutation length mismatch"));
        }
        let data: Vec<T> = perm.iter().map(|&i| self.get(i)).collect();
        Ok(Vector::from_vec(data))
    }

    pub fn reverse(&self) -> Self {
        self.directed_subset_reference(-1).expect("directed_subset_reference(-1) is always valid")
    }

    fn zip_check(&self, other: &Self) -> OrqResult<()> {
        if self.len() != other.len() {
            return Err(OrqError::invalid_shape(format!(
                "binary op size mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        Ok(())
    }

    fn elementwise<F: Fn(T, T) -> T>(&self, other: &Self, f: F) -> OrqResult<Self> {
        self.zip_check(other)?;
        let data: Vec<T> = (0..self.len()).map(|i| f(self.get(i), other.get(i))).collect();
        Ok(Vector::from_vec(data))
    }

    pub fn add(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| a.wrapping_add(&b))
    }

    pub fn sub(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| a.wrapping_sub(&b))
    }

    pub fn mul(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| a.wrapping_mul(&b))
    }

    pub fn div(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| if b.is_zero() { T::zero() } else { a / b })
    }

    pub fn bitand(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| a & b)
    }

    pub fn bitor(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| a | b)
    }

    pub fn bitxor(&self, other: &Self) -> OrqResult<Self> {
        self.elementwise(other, |a, b| a ^ b)
    }

    pub fn not(&self) -> Self {
        let data: Vec<T> = (0..self.len()).map(|i| !self.get(i)).collect();
        Vector::from_vec(data)
    }

    pub fn shl(&self, bits: u32) -> Self {
        let data: Vec<T> = (0..self.len()).map(|i| self.get(i) << bits as usize).collect();
        Vector::from_vec(data)
    }

    pub fn shr(&self, bits: u32) -> Self {
        let data: Vec<T> = (0..self.len()).map(|i| self.get(i) >> bits as usize).collect();
        Vector::from_vec(data)
    }

    pub fn eq_vec(&self, other: &Self) -> OrqResult<Vector<T>> {
        self.elementwise(other, |a, b| if a == b { T::one() } else { T::zero() })
    }

    pub fn lt_vec(&self, other: &Self) -> OrqResult<Vector<T>> {
        self.elementwise(other, |a, b| if a < b { T::one() } else { T::zero() })
    }

    pub fn gt_vec(&self, other: &Self) -> OrqResult<Vector<T>> {
        self.elementwise(other, |a, b| if a > b { T::one() } else { T::zero() })
    }

    /// Apply a boolean mask in place (COW): zeroes out positions where
    /// `m[i]` is false.
    pub fn mask(&mut self, m: &[bool]) -> OrqResult<()> {
        if m.len() != self.len() {
            return Err(OrqError::invalid_shape("mask: length mismatch"));
        }
        let idx = self.mapping.to_indices();
        let buf = Arc::make_mut(&mut self.storage);
        for (i, &storage_i) in idx.iter().enumerate() {
            if !m[i] {
                buf[storage_i] = T::zero();
            }
        }
        Ok(())
    }

    /// Zero every logical element in place (COW).
    pub fn zero(&mut self) {
        let idx = self.mapping.to_indices();
        let buf = Arc::make_mut(&mut self.storage);
        for storage_i in idx {
            buf[storage_i] = T::zero();
        }
    }

    /// Overwrite logical positions `[start, end)` with zero, in place.
    pub fn set_bits(&mut self, start: usize, end: usize) -> OrqResult<()> {
        if start > end || end > self.len() {
            return Err(OrqError::invalid_shape("set_bits: range out of bounds"));
        }
        let idx = self.mapping.to_indices();
        let buf = Arc::make_mut(&mut self.storage);
        for storage_i in &idx[start..end] {
            buf[*storage_i] = T::zero();
        }
        Ok(())
    }

    /// Overwrite the logical positions named by `idx` with `values`,
    /// leaving every other position as-is. `idx` may be any length and
    /// need not be a bijection; later entries win on repeats.
    pub fn scatter(&self, idx: &[usize], values: &Self) -> OrqResult<Self> {
        if idx.len() != values.len() {
            return Err(OrqError::invalid_shape("scatter: index/value length mismatch"));
        }
        let mut out = self.to_plain_vec();
        for (k, &i) in idx.iter().enumerate() {
            if i >= out.len() {
                return Err(OrqError::invalid_shape("scatter: index out of bounds"));
            }
            out[i] = values.get(k);
        }
        Ok(Vector::from_vec(out))
    }

    /// Inclusive scan (Hillis-Steele), restricted to the mapping.
    pub fn prefix_sum(&self) -> Self {
        let mut acc: Vec<T> = (0..self.len()).map(|i| self.get(i)).collect();
        let n = acc.len();
        let mut stride = 1;
        while stride < n {
            for i in (stride..n).rev() {
                acc[i] = acc[i].wrapping_add(&acc[i - stride]);
            }
            stride *= 2;
        }
        Vector::from_vec(acc)
    }

    /// Sum over contiguous, non-overlapping runs of `k` logical elements.
    /// `len` must be a multiple of `k`.
    pub fn chunked_sum(&self, k: usize) -> OrqResult<Self> {
        if k == 0 || self.len() % k != 0 {
            return Err(OrqError::invalid_shape("chunked_sum: length not a multiple of k"));
        }
        let mut out = Vec::with_capacity(self.len() / k);
        for chunk_start in (0..self.len()).step_by(k) {
            let mut acc = T::zero();
            for i in chunk_start..chunk_start + k {
                acc = acc.wrapping_add(&self.get(i));
            }
            out.push(acc);
        }
        Ok(Vector::from_vec(out))
    }

    pub fn dot_product(&self, other: &Self) -> OrqResult<T> {
        self.zip_check(other)?;
        let mut acc = T::zero();
        for i in 0..self.len() {
            acc = acc.wrapping_add(&self.get(i).wrapping_mul(&other.get(i)));
        }
        Ok(acc)
    }

    pub fn to_plain_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

/// Bit-packing: lays the logical vector's bits of `width` each contiguously
/// into the storage type `U`, left-to-right in stream order.
pub fn pack<T: Elem, U: Elem>(v: &Vector<T>, width: u32) -> OrqResult<Vector<U>> {
    let u_bits = std::mem::size_of::<U>() as u32 * 8;
    if width == 0 || width > u_bits {
        return Err(OrqError::invalid_shape("pack: width out of range for target type"));
    }
    let total_bits = v.len() as u64 * width as u64;
    let out_len = ((total_bits + u_bits as u64 - 1) / u_bits as u64) as usize;
    let mut out = vec![U::zero(); out_len.max(1)];
    let mut bit_cursor: u64 = 0;
    for i in 0..v.len() {
        let value = v.get(i);
        for b in (0..width).rev() {
            let bit = (value >> (b as usize)) & T::one();
            let word = (bit_cursor / u_bits as u64) as usize;
            let pos_in_word = u_bits - 1 - (bit_cursor % u_bits as u64) as u32;
            if !bit.is_zero() {
                out[word] = out[word] | (U::one() << pos_in_word as usize);
            }
            bit_cursor += 1;
        }
    }
    Ok(Vector::from_vec(out))
}

/// Inverse of [`pack`]: unpack `count` elements of `width` bits each from
/// packed storage type `U` back into `T`.
pub fn unpack<U: Elem, T: Elem>(v: &Vector<U>, width: u32, count: usize) -> OrqResult<Vector<T>> {
    let u_bits = std::mem::size_of::<U>() as u32 * 8;
    if width == 0 || width > std::mem::size_of::<T>() as u32 * 8 {
        return Err(OrqError::invalid_shape("unpack: width out of range for target type"));
    }
    if (count as u64) * (width as u64) > v.len() as u64 * u_bits as u64 {
        return Err(OrqError::invalid_shape("unpack: not enough packed bits for count"));
    }
    let mut out = Vec::with_capacity(count);
    let mut bit_cursor: u64 = 0;
    for _ in 0..count {
        let mut value = T::zero();
        for _ in 0..width {
            let word = (bit_cursor / u_bits as u64) as usize;
            let pos_in_word = u_bits - 1 - (bit_cursor % u_bits as u64) as u32;
            let bit = (v.get(word) >> pos_in_word as usize) & U::one();
            value = value << 1usize;
            if !bit.is_zero() {
                value = value | T::one();
            }
            bit_cursor += 1;
        }
        out.push(value);
    }
    Ok(Vector::from_vec(out))
}
