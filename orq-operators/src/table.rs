//! `EncodedTable<T>`: an ordered mapping from column name to shared
//! vector, plus the two system columns every operator below reasons
//! about — `VALID` (live-row marker) and `UNIQ` (group-representative
//! marker, populated lazily by the operators that need it).
//!
//! Sorts, filters, joins and aggregations never shrink storage: they
//! mutate `VALID` in place and the only way to actually drop rows is
//! `head`/`tail` on a table already sorted by `VALID`.
//!
//! Column names follow the bracket convention: `[Name]` is boolean-shared,
//! a bare `Name` is arithmetic-shared. The arena is addressed by index —
//! the handle is an index into a column arena, not a pointer, so table
//! reshaping does not invalidate references.

use std::collections::HashMap;

use orq_error::{OrqError, OrqResult};
use orq_evector::{ASharedVector, BSharedVector};
use orq_vector::Elem;

/// One arena slot: either encoding, tagged so callers can match on it
/// without guessing from the column name a second time.
#[derive(Debug, Clone)]
pub enum Column<T: Elem> {
    Arithmetic(ASharedVector<T>),
    Boolean(BSharedVector<T>),
}

impl<T: Elem> Column<T> {
    pub fn len(&self) -> usize {
        match self {
            Column::Arithmetic(v) => v.len(),
            Column::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_arithmetic(&self) -> OrqResult<&ASharedVector<T>> {
        match self {
            Column::Arithmetic(v) => Ok(v),
            Column::Boolean(_) => Err(OrqError::invalid_shape("column is boolean-shared, expected arithmetic")),
        }
    }

    pub fn as_boolean(&self) -> OrqResult<&BSharedVector<T>> {
        match self {
            Column::Boolean(v) => Ok(v),
            Column::Arithmetic(_) => Err(OrqError::invalid_shape("column is arithmetic-shared, expected boolean")),
        }
    }

    /// Apply an explicit row permutation, identical in kind across either
    /// encoding (`apply_mapping`, replicated by `EVector`).
    pub fn apply_mapping(&self, perm: &[usize]) -> OrqResult<Self> {
        match self {
            Column::Arithmetic(v) => Ok(Column::Arithmetic(v.apply_mapping(perm)?)),
            Column::Boolean(v) => Ok(Column::Boolean(v.apply_mapping(perm)?)),
        }
    }

    pub fn slice(&self, from: usize, to: usize) -> OrqResult<Self> {
        match self {
            Column::Arithmetic(v) => Ok(Column::Arithmetic(v.slice(from, to)?)),
            Column::Boolean(v) => Ok(Column::Boolean(v.slice(from, to)?)),
        }
    }

    /// Gather rows named by `idx` (not necessarily a bijection, unlike
    /// `apply_mapping`) — the compare-exchange networks below use this to
    /// pull out the two sides of each pair before comparing them.
    pub fn gather(&self, idx: &[usize]) -> OrqResult<Self> {
        match self {
            Column::Arithmetic(v) => Ok(Column::Arithmetic(v.mapping_reference(idx)?)),
            Column::Boolean(v) => Ok(Column::Boolean(v.mapping_reference(idx)?)),
        }
    }

    /// Inverse of `gather`: overwrite the rows named by `idx` with `values`.
    pub fn scatter(&self, idx: &[usize], values: &Self) -> OrqResult<Self> {
        match (self, values) {
            (Column::Arithmetic(v), Column::Arithmetic(vals)) => Ok(Column::Arithmetic(v.scatter(idx, vals)?)),
            (Column::Boolean(v), Column::Boolean(vals)) => Ok(Column::Boolean(v.scatter(idx, vals)?)),
            _ => Err(OrqError::invalid_shape("scatter: encoding mismatch between column and values")),
        }
    }
}

/// True for names using the bracket convention (`[Name]`), i.e. boolean
/// encoding.
pub fn is_boolean_name(name: &str) -> bool {
    name.starts_with('[') && name.ends_with(']') && name.len() >= 2
}

pub const VALID: &str = "[VALID]";
pub const UNIQ: &str = "[UNIQ]";

/// Column-schema table built from named shared vectors.
#[derive(Debug, Clone)]
pub struct EncodedTable<T: Elem> {
    names: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Column<T>>,
    valid: BSharedVector<T>,
    uniq: Option<BSharedVector<T>>,
}

impl<T: Elem> EncodedTable<T> {
    /// Build a table from named columns plus its `VALID` marker. Every
    /// column (and `VALID`) must share one logical length; the bracket
    /// convention on each name must match its actual encoding.
    pub fn new(columns: Vec<(String, Column<T>)>, valid: BSharedVector<T>) -> OrqResult<Self> {
        let len = valid.len();
        let mut names = Vec::with_capacity(columns.len());
        let mut index = HashMap::with_capacity(columns.len());
        let mut arena = Vec::with_capacity(columns.len());
        for (name, col) in columns {
            if col.len() != len {
                return Err(OrqError::invalid_shape(format!(
                    "column '{name}' length {} does not match table length {len}",
                    col.len()
                )));
            }
            let boolean_name = is_boolean_name(&name);
            let is_boolean_col = matches!(col, Column::Boolean(_));
            if boolean_name != is_boolean_col {
                return Err(OrqError::invalid_shape(format!(
                    "column '{name}' bracket convention does not match its encoding"
                )));
            }
            if index.contains_key(&name) {
                return Err(OrqError::invalid_shape(format!("duplicate column name '{name}'")));
            }
            index.insert(name.clone(), arena.len());
            names.push(name);
            arena.push(col);
        }
        Ok(EncodedTable { names, index, columns: arena, valid, uniq: None })
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> OrqResult<&Column<T>> {
        let idx = *self.index.get(name).ok_or_else(|| OrqError::invalid_shape(format!("no column named '{name}'")))?;
        Ok(&self.columns[idx])
    }

    pub fn column_a(&self, name: &str) -> OrqResult<&ASharedVector<T>> {
        self.column(name)?.as_arithmetic()
    }

    pub fn column_b(&self, name: &str) -> OrqResult<&BSharedVector<T>> {
        self.column(name)?.as_boolean()
    }

    /// Insert or overwrite a column; the bracket convention must match.
    pub fn set_column(&mut self, name: impl Into<String>, col: Column<T>) -> OrqResult<()> {
        let name = name.into();
        if col.len() != self.len() {
            return Err(OrqError::invalid_shape(format!(
                "column '{name}' length {} does not match table length {}",
                col.len(),
                self.len()
            )));
        }
        let boolean_name = is_boolean_name(&name);
        if boolean_name != matches!(col, Column::Boolean(_)) {
            return Err(OrqError::invalid_shape(format!("column '{name}' bracket convention does not match its encoding")));
        }
        if let Some(&idx) = self.index.get(&name) {
            self.columns[idx] = col;
        } else {
            self.index.insert(name.clone(), self.columns.len());
            self.names.push(name);
            self.columns.push(col);
        }
        Ok(())
    }

    pub fn valid(&self) -> &BSharedVector<T> {
        &self.valid
    }

    pub fn set_valid(&mut self, valid: BSharedVector<T>) -> OrqResult<()> {
        if valid.len() != self.len() {
            return Err(OrqError::invalid_shape("set_valid: length mismatch"));
        }
        self.valid = valid;
        Ok(())
    }

    pub fn uniq(&self) -> Option<&BSharedVector<T>> {
        self.uniq.as_ref()
    }

    pub fn set_uniq(&mut self, uniq: BSharedVector<T>) -> OrqResult<()> {
        if uniq.len() != self.len() {
            return Err(OrqError::invalid_shape("set_uniq: length mismatch"));
        }
        self.uniq = Some(uniq);
        Ok(())
    }

    /// Apply one explicit permutation to every column, `VALID`, and `UNIQ`
    /// (used by shuffle, every sort, and join/aggregate's internal
    /// reorderings). Storage never shrinks.
    pub fn apply_mapping(&self, perm: &[usize]) -> OrqResult<Self> {
        if perm.len() != self.len() {
            return Err(OrqError::invalid_shape("apply_mapping: permutation length mismatch"));
        }
        let columns: Vec<(String, Column<T>)> = self
            .names
            .iter()
            .map(|n| Ok((n.clone(), self.column(n)?.apply_mapping(perm)?)))
            .collect::<OrqResult<_>>()?;
        let valid = self.valid.apply_mapping(perm)?;
        let mut out = EncodedTable::new(columns, valid)?;
        if let Some(u) = &self.uniq {
            out.set_uniq(u.apply_mapping(perm)?)?;
        }
        Ok(out)
    }

    /// Contiguous logical slice of every column (`slice`, replicated
    /// across the whole table).
    pub fn slice(&self, from: usize, to: usize) -> OrqResult<Self> {
        let columns: Vec<(String, Column<T>)> =
            self.names.iter().map(|n| Ok((n.clone(), self.column(n)?.slice(from, to)?))).collect::<OrqResult<_>>()?;
        let valid = self.valid.slice(from, to)?;
        let mut out = EncodedTable::new(columns, valid)?;
        if let Some(u) = &self.uniq {
            out.set_uniq(u.slice(from, to)?)?;
        }
        Ok(out)
    }

    /// Gather rows named by `idx` into a new table of length `idx.len()`
    /// (`mapping_reference`, replicated across the whole table; used by
    /// the compare-exchange networks to pull out row pairs).
    pub fn gather(&self, idx: &[usize]) -> OrqResult<Self> {
        let columns: Vec<(String, Column<T>)> =
            self.names.iter().map(|n| Ok((n.clone(), self.column(n)?.gather(idx)?))).collect::<OrqResult<_>>()?;
        let valid = self.valid.mapping_reference(idx)?;
        let mut out = EncodedTable::new(columns, valid)?;
        if let Some(u) = &self.uniq {
            out.set_uniq(u.mapping_reference(idx)?)?;
        }
        Ok(out)
    }

    /// Overwrite the rows named by `idx` with `rows` (the inverse of
    /// `gather`), returning a new table the same length as `self`.
    pub fn scatter_rows(&self, idx: &[usize], rows: &Self) -> OrqResult<Self> {
        if idx.len() != rows.len() {
            return Err(OrqError::invalid_shape("scatter_rows: index/row-count mismatch"));
        }
        let columns: Vec<(String, Column<T>)> = self
            .names
            .iter()
            .map(|n| Ok((n.clone(), self.column(n)?.scatter(idx, rows.column(n)?)?)))
            .collect::<OrqResult<_>>()?;
        let valid = self.valid.scatter(idx, rows.valid())?;
        let mut out = EncodedTable::new(columns, valid)?;
        if let Some(u) = &self.uniq {
            let rows_uniq = rows.uniq().ok_or_else(|| OrqError::invalid_shape("scatter_rows: missing UNIQ in rows"))?;
            out.set_uniq(u.scatter(idx, rows_uniq)?)?;
        }
        Ok(out)
    }

    /// First `n` rows (trimming happens only via `head`/`tail` on a
    /// `VALID`-sorted table — the caller is responsible for having sorted
    /// so the live rows are at the front).
    pub fn head(&self, n: usize) -> OrqResult<Self> {
        self.slice(0, n.min(self.len()))
    }

    /// Last `n` rows.
    pub fn tail(&self, n: usize) -> OrqResult<Self> {
        let len = self.len();
        let start = len.saturating_sub(n);
        self.slice(start, len)
    }
}
