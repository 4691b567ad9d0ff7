//! Oblivious relational operators built on `EncodedTable`:
//! shuffle, sort, aggregate, join, distinct, windowing. Every
//! operator here takes shares and correlations and returns shares —
//! nothing in this crate ever sees plaintext.

pub mod aggregate;
pub mod distinct;
pub mod join;
pub mod merge;
pub mod prefix_sum;
mod select;
pub mod shuffle;
pub mod sort;
pub mod table;
pub mod window;

pub use table::{is_boolean_name, Column, EncodedTable, UNIQ, VALID};
pub use shuffle::{shuffle_a, shuffle_b, shuffle_table};
pub use sort::{sort_table, SortKey, SortingProtocol};
pub use merge::odd_even_merge;
pub use prefix_sum::{prefix_sum_direct, prefix_sum_tree};
pub use aggregate::{aggregate, Combinator};
pub use join::{join, JoinKind};
pub use distinct::distinct;
pub use window::{gap_session_window, threshold_session_window, tumbling_window};
