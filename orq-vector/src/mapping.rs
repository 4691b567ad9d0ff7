//! Access mappings: deferred permutation/subset views over a `Vector<T>`'s
//! owned storage. A mapping never allocates; it is materialised only when
//! an operation can't be expressed through it.

/// A lazy index transform from a logical position to a storage position.
///
/// Composing two mappings (a view-of-a-view) composes the descriptors
/// instead of walking either one, so `v.slice(..).reverse()` stays a
/// zero-copy view until something forces materialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Storage position == logical position.
    Identity { len: usize },
    /// `start + i * stride` for `i in 0..count`.
    Range {
        start: usize,
        stride: usize,
        count: usize,
    },
    /// Alternates `n1` "selected" storage slots with `n0` "skipped" ones,
    /// repeating over the whole buffer; logical length is the number of
    /// selected slots.
    Alternating { n1: usize, n0: usize, len: usize },
    /// Same period as `Alternating` but the selected run is read back to
    /// front within each period.
    ReversedAlternating { n1: usize, n0: usize, len: usize },
    /// Every source element repeated `k` times in place:
    /// `storage[i / k]`.
    Repeated { k: usize, len: usize },
    /// Source read cyclically `k` times: `storage[i % base_len]`.
    Cyclic { base_len: usize, len: usize },
    /// Forward (`step = 1`) or reverse (`step = -1`) traversal.
    Directed { step: i64, len: usize },
    /// Arbitrary materialised index list (covers `included_reference`'s
    /// compacted mask and `mapping_reference`'s explicit index list).
    Arbitrary { indices: Vec<usize> },
}

impl Mapping {
    pub fn identity(len: usize) -> Self {
        Mapping::Identity { len }
    }

    pub fn len(&self) -> usize {
        match self {
            Mapping::Identity { len } => *len,
            Mapping::Range { count, .. } => *count,
            Mapping::Alternating { len, .. } => *len,
            Mapping::ReversedAlternating { len, .. } => *len,
            Mapping::Repeated { len, .. } => *len,
            Mapping::Cyclic { len, .. } => *len,
            Mapping::Directed { len, .. } => *len,
            Mapping::Arbitrary { indices } => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a logical index to a storage index. Panics (programmer
    /// error, outside the error taxonomy's domain) if out of range.
    pub fn resolve(&self, i: usize) -> usize {
        match self {
            Mapping::Identity { len } => {
                assert!(i < *len, "index out of range");
                i
            }
            Mapping::Range {
                start,
                stride,
                count,
            } => {
                assert!(i < *count, "index out of range");
                start + i * stride
            }
            Mapping::Alternating { n1, n0, len } => {
                assert!(i < *len, "index out of range");
                let period = n1 + n0;
                (i / *n1) * period + (i % *n1)
            }
            Mapping::ReversedAlternating { n1, n0, len } => {
                assert!(i < *len, "index out of range");
                let period = n1 + n0;
                (i / *n1) * period + (*n1 - 1 - (i % *n1))
            }
            Mapping::Repeated { k, len } => {
                assert!(i < *len, "index out of range");
                i / *k
            }
            Mapping::Cyclic { base_len, len } => {
                assert!(i < *len, "index out of range");
                i % *base_len
            }
            Mapping::Directed { step, len } => {
                assert!(i < *len, "index out of range");
                if *step >= 0 {
                    i
                } else {
                    *len - 1 - i
                }
            }
            Mapping::Arbitrary { indices } => indices[i],
        }
    }

    /// Compose `self` (applied first, as the inner/base view) with `outer`
    /// (a mapping expressed in terms of `self`'s logical indices). The
    /// result is a single mapping from the outer's logical space directly
    /// to the base storage, i.e. `composed.resolve(i) == self.resolve(outer.resolve(i))`.
    pub fn compose(&self, outer: &Mapping) -> Mapping {
        let len = outer.len();
        let indices: Vec<usize> = (0..len).map(|i| self.resolve(outer.resolve(i))).collect();
        Mapping::Arbitrary { indices }
    }

    /// Materialise into a plain index list; the canonical, base-case form
    /// every mapping variant can be converted to.
    pub fn to_indices(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.resolve(i)).collect()
    }

    pub fn reversed(&self) -> Mapping {
        let mut idx = self.to_indices();
        idx.reverse();
        Mapping::Arbitrary { indices: idx }
    }
}
