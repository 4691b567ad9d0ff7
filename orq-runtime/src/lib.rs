//! Runtime, batching, and communication : the layer
//! that owns a party's worker threads, correlation pool, and batch
//! parameters, and drives the protocol/operator layers above it. Nothing
//! in the rest of the workspace opens a socket or spawns a thread itself —
//! that only happens here.

pub mod batching;
pub mod malicious;
pub mod runtime;

pub use batching::{autotune_batch_size, batch_ranges, dispatch_batches, AutoBatchSize};
pub use malicious::malicious_check;
pub use runtime::{Runtime, Worker};
