//! ORQ: a secure multi-party relational-analytics engine.
//!
//! This crate is the public facade over the six layers — vector algebra,
//! encoded vectors, randomness/correlations, protocol, oblivious operators,
//! and the runtime that schedules them — re-exported under one namespace so
//! a driver only needs `orq::...` rather than one `use` per sub-crate. The
//! driver programs themselves (query planning, CSV I/O, CLI argument
//! parsing, the cross-check harness) are out of scope and are not built
//! here.

pub mod vector {
    pub use orq_vector::*;
}

pub mod evector {
    pub use orq_evector::*;
}

pub mod crypto {
    pub use orq_crypto::*;
}

pub mod protocol {
    pub use orq_protocol::*;
}

pub mod operators {
    pub use orq_operators::*;
}

pub mod runtime {
    pub use orq_runtime::*;
}

pub use orq_error::{OrqError, OrqResult};

/// Initialize `env_logger` from the `RUST_LOG` environment variable,
/// defaulting to `info`. A driver binary calls this once at startup;
/// library code never initializes logging on its own.
pub fn init_logging() {
    use env_logger::Env;
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_reexports_are_reachable() {
        let v: vector::Vector<i64> = vector::Vector::from_vec(vec![1, 2, 3]);
        assert_eq!(v.len(), 3);
        let scheme = protocol::Scheme::Replicated3pc;
        assert_eq!(scheme.num_parties(), 3);
    }

    #[test]
    fn init_logging_does_not_panic_when_called_twice() {
        init_logging();
        init_logging();
    }
}
