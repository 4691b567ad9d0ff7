//! Prefix sum: additive shares make the running sum entirely local —
//! `sum(shares) = share(sum)` — so neither variant here talks to a peer
//! or consumes a correlation. `direct` is the textbook O(n) sequential
//! scan; `tree` is Hillis-Steele doubling, O(n log n) work but O(log n)
//! sequential depth, already implemented once at `Vector::prefix_sum`
//! and reused per column here.

use orq_evector::{ASharedVector, EVector};
use orq_vector::{Elem, Vector};

/// Inclusive running sum, one sequential pass per column.
pub fn prefix_sum_direct<T: Elem>(x: &ASharedVector<T>) -> ASharedVector<T> {
    let columns: Vec<Vector<T>> = x
        .inner
        .columns()
        .iter()
        .map(|c| {
            let mut acc = T::zero();
            let data: Vec<T> = c
                .to_plain_vec()
                .into_iter()
                .map(|v| {
                    acc = acc.wrapping_add(&v);
                    acc
                })
                .collect();
            Vector::from_vec(data)
        })
        .collect();
    ASharedVector::from_evector(EVector::new(columns, x.precision()).expect("same shape as input"))
}

/// Inclusive running sum via Hillis-Steele doubling.
pub fn prefix_sum_tree<T: Elem>(x: &ASharedVector<T>) -> ASharedVector<T> {
    let columns: Vec<Vector<T>> = x.inner.columns().iter().map(|c| c.prefix_sum()).collect();
    ASharedVector::from_evector(EVector::new(columns, x.precision()).expect("same shape as input"))
}

/// Exclusive prefix sum (sum of elements strictly before `i`): `inclusive
/// - x`, a local subtraction.
pub fn exclusive_prefix_sum<T: Elem>(x: &ASharedVector<T>) -> ASharedVector<T> {
    let inclusive = prefix_sum_direct(x);
    inclusive.sub_a(x).expect("same shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_vector::Vector as V;

    fn a_col(values: Vec<i64>) -> ASharedVector<i64> {
        ASharedVector::from_evector(EVector::new(vec![V::from_vec(values)], 0).unwrap())
    }

    #[test]
    fn direct_and_tree_agree() {
        let x = a_col(vec![1, 2, 3, 4, 5]);
        assert_eq!(prefix_sum_direct(&x).reconstruct_local(), prefix_sum_tree(&x).reconstruct_local());
        assert_eq!(prefix_sum_direct(&x).reconstruct_local(), vec![1, 3, 6, 10, 15]);
    }

    #[test]
    fn exclusive_drops_self() {
        let x = a_col(vec![1, 2, 3, 4]);
        assert_eq!(exclusive_prefix_sum(&x).reconstruct_local(), vec![0, 1, 3, 6]);
    }
}
