//! Share-level vector algebra: R parallel columns with a fixed-point
//! precision, plus the A/B encoding tags. Pure data-parallel
//! algebra — no cryptography. `orq-protocol` layers correlation-consuming
//! operations (multiplication, AND, comparisons, conversions) on top.

pub mod evector;
pub mod shared_vector;

pub use evector::EVector;
pub use shared_vector::{share_arithmetic, share_boolean, ASharedVector, BSharedVector, Encoding};
