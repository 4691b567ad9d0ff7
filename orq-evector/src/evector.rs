//! `EVector<T>`: R parallel `Vector<T>` columns plus a fixed-point precision.
//! Every operation here replicates the equivalent `Vector<T>`
//! op to each column identically; this layer is pure data-parallel algebra
//! and never talks to a correlation provider or a peer.

use orq_error::{OrqError, OrqResult};
use orq_vector::{Elem, Vector};

#[derive(Debug, Clone)]
pub struct EVector<T: Elem> {
    columns: Vec<Vector<T>>,
    precision: u32,
}

impl<T: Elem> EVector<T> {
    pub fn new(columns: Vec<Vector<T>>, precision: u32) -> OrqResult<Self> {
        if columns.is_empty() {
            return Err(OrqError::invalid_shape("EVector requires at least one column"));
        }
        let len = columns[0].len();
        if columns.iter().any(|c| c.len() != len) {
            return Err(OrqError::invalid_shape("EVector columns must share a logical length"));
        }
        Ok(EVector { columns, precision })
    }

    /// Construct R columns of zeroes, `size` elements each.
    pub fn zeros(size: usize, replication: usize, precision: u32) -> Self {
        let columns = (0..replication).map(|_| Vector::filled(size, T::zero())).collect();
        EVector { columns, precision }
    }

    pub fn replication(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn set_precision(&mut self, p: u32) {
        self.precision = p;
    }

    pub fn column(&self, i: usize) -> &Vector<T> {
        &self.columns[i]
    }

    pub fn columns(&self) -> &[Vector<T>] {
        &self.columns
    }

    fn check_compat(&self, other: &Self) -> OrqResult<()> {
        if self.replication() != other.replication() {
            return Err(OrqError::invalid_shape("EVector replication factor mismatch"));
        }
        if self.len() != other.len() {
            return Err(OrqError::invalid_shape("EVector length mismatch"));
        }
        Ok(())
    }

    fn replicate<F>(&self, other: &Self, f: F) -> OrqResult<Vec<Vector<T>>>
    where
        F: Fn(&Vector<T>, &Vector<T>) -> OrqResult<Vector<T>>,
    {
        self.check_compat(other)?;
        self.columns
            .iter()
            .zip(other.columns.iter())
            .map(|(a, b)| f(a, b))
            .collect()
    }

    /// Element-wise addition of every column, precision preserved if equal.
    pub fn add_local(&self, other: &Self) -> OrqResult<Self> {
        if self.precision != other.precision {
            return Err(OrqError::invalid_shape("add: precision mismatch"));
        }
        let columns = self.replicate(other, |a, b| a.add(b))?;
        Ok(EVector { columns, precision: self.precision })
    }

    pub fn sub_local(&self, other: &Self) -> OrqResult<Self> {
        if self.precision != other.precision {
            return Err(OrqError::invalid_shape("sub: precision mismatch"));
        }
        let columns = self.replicate(other, |a, b| a.sub(b))?;
        Ok(EVector { columns, precision: self.precision })
    }

    pub fn xor_local(&self, other: &Self) -> OrqResult<Self> {
        let columns = self.replicate(other, |a, b| a.bitxor(b))?;
        Ok(EVector { columns, precision: self.precision })
    }

    /// Multiply every share column by a public constant. Local, doubles
    /// precision unless `truncate` asks for an immediate rescale back down.
    pub fn mul_public(&self, constant: T, truncate: bool) -> OrqResult<Self> {
        let columns: Vec<Vector<T>> = self
            .columns
            .iter()
            .map(|c| c.mul(&Vector::filled(c.len(), constant)))
            .collect::<OrqResult<_>>()?;
        let precision = if truncate { self.precision } else { self.precision * 2 };
        Ok(EVector { columns, precision })
    }

    pub fn div_public(&self, constant: T) -> OrqResult<Self> {
        let columns: Vec<Vector<T>> = self
            .columns
            .iter()
            .map(|c| c.div(&Vector::filled(c.len(), constant)))
            .collect::<OrqResult<_>>()?;
        Ok(EVector { columns, precision: self.precision })
    }

    /// Bitwise AND every share column with a public mask, local. Valid
    /// because AND distributes over XOR: `(a^b)&m == (a&m)^(b&m)`, so
    /// masking each column independently preserves the boolean encoding.
    pub fn band_public(&self, mask: T) -> OrqResult<Self> {
        let columns: Vec<Vector<T>> = self
            .columns
            .iter()
            .map(|c| c.bitand(&Vector::filled(c.len(), mask)))
            .collect::<OrqResult<_>>()?;
        Ok(EVector { columns, precision: self.precision })
    }

    pub fn shl(&self, bits: u32) -> Self {
        let columns = self.columns.iter().map(|c| c.shl(bits)).collect();
        EVector { columns, precision: self.precision }
    }

    pub fn shr(&self, bits: u32) -> Self {
        let columns = self.columns.iter().map(|c| c.shr(bits)).collect();
        EVector { columns, precision: self.precision }
    }

    pub fn slice(&self, from: usize, to: usize) -> OrqResult<Self> {
        let columns: Vec<Vector<T>> = self.columns.iter().map(|c| c.slice(from, to)).collect::<OrqResult<_>>()?;
        Ok(EVector { columns, precision: self.precision })
    }

    pub fn mapping_reference(&self, idx: &[usize]) -> OrqResult<Self> {
        let columns: Vec<Vector<T>> = self
            .columns
            .iter()
            .map(|c| c.mapping_reference(idx))
            .collect::<OrqResult<_>>()?;
        Ok(EVector { columns, precision: self.precision })
    }

    /// Overwrite the rows named by `idx` with `values`'s rows, column by
    /// column (the inverse of `mapping_reference`). `values` has `idx.len()`
    /// rows, not necessarily `self.len()`.
    pub fn scatter(&self, idx: &[usize], values: &Self) -> OrqResult<Self> {
        if self.replication() != values.replication() {
            return Err(OrqError::invalid_shape("scatter: replication mismatch"));
        }
        if self.precision != values.precision {
            return Err(OrqError::invalid_shape("scatter: precision mismatch"));
        }
        let columns: Vec<Vector<T>> = self
            .columns
            .iter()
            .zip(values.columns.iter())
            .map(|(a, b)| a.scatter(idx, b))
            .collect::<OrqResult<_>>()?;
        Ok(EVector { columns, precision: self.precision })
    }

    pub fn apply_mapping(&self, perm: &[usize]) -> OrqResult<Self> {
        let columns: Vec<Vector<T>> = self
            .columns
            .iter()
            .map(|c| c.apply_mapping(perm))
            .collect::<OrqResult<_>>()?;
        Ok(EVector { columns, precision: self.precision })
    }

    pub fn materialize(&self) -> Self {
        let columns = self.columns.iter().map(|c| c.materialize()).collect();
        EVector { columns, precision: self.precision }
    }

    pub fn reverse(&self) -> Self {
        let columns = self.columns.iter().map(|c| c.reverse()).collect();
        EVector { columns, precision: self.precision }
    }
}
