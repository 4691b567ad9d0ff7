//! Correlation pool statistics, grounded on a benchmark harness's counters
//! but simplified to an in-memory counter struct — file-backed benchmarking
//! is out of scope. Surfaced by the runtime's `print_statistics`.

use std::fmt;

/// Running counts of correlations reserved and consumed, per kind. Cheap to
/// clone; the runtime holds one per correlation pool shard.
#[derive(Debug, Clone, Default)]
pub struct CorrelationStats {
    pub mul_triples_reserved: u64,
    pub mul_triples_consumed: u64,
    pub and_triples_reserved: u64,
    pub and_triples_consumed: u64,
    pub permutations_reserved: u64,
    pub permutations_consumed: u64,
}

impl CorrelationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mul_reserve(&mut self, n: u64) {
        self.mul_triples_reserved += n;
    }

    pub fn record_mul_consume(&mut self, n: u64) {
        self.mul_triples_consumed += n;
    }

    pub fn record_and_reserve(&mut self, n: u64) {
        self.and_triples_reserved += n;
    }

    pub fn record_and_consume(&mut self, n: u64) {
        self.and_triples_consumed += n;
    }

    pub fn record_permutation_reserve(&mut self, n: u64) {
        self.permutations_reserved += n;
    }

    pub fn record_permutation_consume(&mut self, n: u64) {
        self.permutations_consumed += n;
    }

    pub fn merge(&mut self, other: &CorrelationStats) {
        self.mul_triples_reserved += other.mul_triples_reserved;
        self.mul_triples_consumed += other.mul_triples_consumed;
        self.and_triples_reserved += other.and_triples_reserved;
        self.and_triples_consumed += other.and_triples_consumed;
        self.permutations_reserved += other.permutations_reserved;
        self.permutations_consumed += other.permutations_consumed;
    }
}

impl fmt::Display for CorrelationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mul triples:  {}/{} consumed/reserved",
            self.mul_triples_consumed, self.mul_triples_reserved
        )?;
        writeln!(
            f,
            "and triples:  {}/{} consumed/reserved",
            self.and_triples_consumed, self.and_triples_reserved
        )?;
        write!(
            f,
            "permutations: {}/{} consumed/reserved",
            self.permutations_consumed, self.permutations_reserved
        )
    }
}
