//! Protocol layer: the online protocols that sit on top of the
//! correlation layer (`orq-crypto`) and the share-level algebra
//! (`orq-evector`). Local-only ops (`add_a`, `xor_b`, shifts) already live
//! on the shared-vector types themselves; everything here needs either a
//! correlation (multiplication, AND, conversion, division) or a peer
//! round-trip (open/reveal), so it is parameterised over a
//! [`party::ProtocolParty`] and a [`communicator::Communicator`] backend.

pub mod adders;
pub mod arithmetic;
pub mod boolean;
pub mod communicator;
pub mod comparison;
pub mod conversion;
pub mod division;
pub mod open;
pub mod party;

pub use adders::{negate_b, parallel_prefix_add, ripple_carry_add, sub_b};
pub use arithmetic::mul_a;
pub use boolean::and_b;
pub use communicator::{Communicator, LoopbackCommunicator, WireCodec};
pub use comparison::{compare, equal, equal_public, ge, gt, le, lt, ltz, ne};
pub use conversion::{a2b, b2a_bit, b2a_full};
pub use division::div_b;
pub use open::{open_a, open_b};
pub use party::{ProtocolParty, Scheme};
