//! Randomness & correlation layer: local PRG, common PRG keyed
//! to party groups, zero-sharing, OLE/rOT, Beaver triples, sharded
//! permutations. Everything above this crate consumes correlations by
//! reference-counted handle; nothing here talks to a network peer directly
//! — that's `orq-protocol`'s job, layered on top.

pub mod beaver;
pub mod common_prg;
pub mod ole;
pub mod permutation;
pub mod prg;
pub mod random_elem;
pub mod stats;
pub mod zero_sharing;

pub use beaver::{BeaverTripleGenerator, Triple};
pub use common_prg::{enumerate_groups, CommonPrg, CommonPrgManager, PartyGroup};
pub use ole::{DummyOle, OleHalf, OleProvider};
pub use permutation::{PermEncoding, PermutationManager, ShardedPermutation, ShardedPermutationGenerator};
pub use prg::LocalPrg;
pub use random_elem::RandomElem;
pub use stats::CorrelationStats;
pub use zero_sharing::ZeroSharingGenerator;
