//! `Runtime`: per-process party id, worker pool, batch size, randomness
//! manager, communicators, and correlation pool. Every operator and
//! protocol in the workspace is driven through one of these.

use std::collections::BTreeSet;

use orq_crypto::{enumerate_groups, CommonPrgManager, CorrelationStats, LocalPrg, OleProvider, PartyGroup, RandomElem};
use orq_error::{OrqError, OrqResult};
use orq_protocol::{Communicator, ProtocolParty, Scheme, WireCodec};
use orq_vector::{Elem, Vector};

use crate::batching;

/// One worker thread's full execution context: each thread owns a
/// communicator object, a randomness manager, and its share of the
/// correlation pool; there is no implicit cross-thread sharing of
/// cryptographic state.
pub struct Worker<T: Elem, C: Communicator> {
    pub party: ProtocolParty<T, C>,
}

/// Default batch size before the first `set_batch_size`/autotune call —
/// the midpoint of the `{2^10..2^20}` autotuning sweep range.
const DEFAULT_BATCH_SIZE: usize = 1 << 15;

pub struct Runtime<T: Elem, C: Communicator> {
    party_id: usize,
    scheme: Scheme,
    batch_size: usize,
    workers: Vec<Worker<T, C>>,
    common_prgs: CommonPrgManager,
}

impl<T: Elem + WireCodec, C: Communicator + Send> Runtime<T, C> {
    /// Build a runtime from one communicator per worker thread — a fixed
    /// pool of W threads. `common_prgs` must already hold the per-rank and
    /// per-group keys agreed at session start; key agreement itself is an
    /// external collaborator.
    pub fn new(party_id: usize, scheme: Scheme, comms: Vec<C>, common_prgs: CommonPrgManager) -> OrqResult<Self> {
        if comms.is_empty() {
            return Err(OrqError::invalid_shape("Runtime::new: at least one worker thread required"));
        }
        let workers =
            comms.into_iter().map(|comm| Worker { party: ProtocolParty::new(party_id, scheme, comm) }).collect();
        Ok(Runtime { party_id, scheme, batch_size: DEFAULT_BATCH_SIZE, workers, common_prgs })
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn get_num_threads(&self) -> usize {
        self.workers.len()
    }

    pub fn get_party_id(&self) -> usize {
        self.party_id
    }

    pub fn get_num_parties(&self) -> usize {
        self.scheme.num_parties()
    }

    pub fn get_replication_number(&self) -> usize {
        self.scheme.replication_factor()
    }

    /// Every non-empty group this party belongs to, in lexicographic
    /// `C(N,k)` order for each group size `k`.
    pub fn get_groups(&self) -> Vec<PartyGroup> {
        let n = self.scheme.num_parties();
        (1..=n).flat_map(|k| enumerate_groups(n, k)).filter(|g| g.contains(&self.party_id)).collect()
    }

    /// Worker 0's randomness manager.
    pub fn rand0(&mut self) -> &mut LocalPrg {
        &mut self.workers[0].party.local_prg
    }

    /// Worker 0's communicator.
    pub fn comm0(&mut self) -> &mut C {
        &mut self.workers[0].party.comm
    }

    pub fn worker(&mut self, i: usize) -> OrqResult<&mut Worker<T, C>> {
        self.workers.get_mut(i).ok_or_else(|| OrqError::invalid_shape(format!("no worker thread {i}")))
    }

    pub fn workers_mut(&mut self) -> &mut [Worker<T, C>] {
        &mut self.workers
    }

    /// Fill a vector of plaintext local randomness via worker 0's PRG.
    pub fn populate_local_random(&mut self, len: usize) -> Vector<T>
    where
        T: RandomElem,
    {
        self.rand0().get_next_vector(len)
    }

    /// Fill a vector identical across every member of `group`.
    pub fn populate_common_random(&mut self, group: &BTreeSet<usize>, len: usize) -> OrqResult<Vector<T>>
    where
        T: RandomElem,
    {
        self.common_prgs.populate_common_random(group, len)
    }

    /// Reserve `n` multiplication triples ahead of the online phase, split
    /// evenly across worker shards — one OLE provider per worker;
    /// correlation pools are sharded by thread.
    pub fn reserve_mul_triples<P: OleProvider<T>>(&mut self, providers: &mut [P], n: usize) -> OrqResult<()> {
        self.for_each_shard(providers, n, |party, provider, share| {
            party.triples.reserve_mul_triples(provider, share)?;
            party.stats.record_mul_reserve(share as u64);
            Ok(())
        })
    }

    pub fn reserve_and_triples<P: OleProvider<T>>(&mut self, providers: &mut [P], n: usize) -> OrqResult<()> {
        self.for_each_shard(providers, n, |party, provider, share| {
            party.triples.reserve_and_triples(provider, share)?;
            party.stats.record_and_reserve(share as u64);
            Ok(())
        })
    }

    fn for_each_shard<P: OleProvider<T>>(
        &mut self,
        providers: &mut [P],
        n: usize,
        mut reserve: impl FnMut(&mut ProtocolParty<T, C>, &mut P, usize) -> OrqResult<()>,
    ) -> OrqResult<()> {
        if providers.len() != self.workers.len() {
            return Err(OrqError::invalid_shape("reserve: one OLE provider required per worker thread"));
        }
        if n == 0 {
            return Ok(());
        }
        let per_worker = n.div_ceil(self.workers.len());
        for (worker, provider) in self.workers.iter_mut().zip(providers.iter_mut()) {
            reserve(&mut worker.party, provider, per_worker)?;
        }
        Ok(())
    }

    /// Merged correlation-pool statistics across every worker shard.
    pub fn print_statistics(&self) {
        let mut total = CorrelationStats::new();
        for w in &self.workers {
            total.merge(&w.party.stats);
        }
        log::info!("correlation pool statistics:\n{total}");
    }

    /// Session topology summary — per-pair byte/message counters live on
    /// the communicator backend itself; this reports the shape of the
    /// session driving them.
    pub fn print_communicator_statistics(&self) {
        log::info!(
            "runtime: party {} of {} ({:?}, {} worker threads, batch size {})",
            self.party_id,
            self.scheme.num_parties(),
            self.scheme,
            self.workers.len(),
            self.batch_size
        );
    }

    /// Batched dispatch over `len` rows: split into batches of
    /// `self.batch_size` and run `f` on the worker owning each batch's
    /// contiguous row range.
    pub fn dispatch<F, R>(&mut self, len: usize, f: F) -> Vec<R>
    where
        F: Fn(&mut Worker<T, C>, usize, usize) -> R + Sync,
        R: Send,
        Worker<T, C>: Send,
    {
        batching::dispatch_batches(&mut self.workers, len, self.batch_size, f)
    }

    /// Run the session-end MAC verification pass on every worker shard;
    /// a no-op under honest-majority schemes.
    pub fn malicious_check(&mut self) -> OrqResult<()>
    where
        T: RandomElem,
    {
        for w in self.workers.iter_mut() {
            crate::malicious::malicious_check(&mut w.party)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orq_protocol::communicator::LoopbackCommunicator;

    fn runtime_pair() -> (Runtime<i64, LoopbackCommunicator>, Runtime<i64, LoopbackCommunicator>) {
        let mut comms = LoopbackCommunicator::mesh(2).into_iter();
        let r0 = Runtime::new(0, Scheme::Additive2pc, vec![comms.next().unwrap()], CommonPrgManager::new(2)).unwrap();
        let r1 = Runtime::new(1, Scheme::Additive2pc, vec![comms.next().unwrap()], CommonPrgManager::new(2)).unwrap();
        (r0, r1)
    }

    #[test]
    fn accessors_report_scheme_shape() {
        let (r0, _r1) = runtime_pair();
        assert_eq!(r0.get_party_id(), 0);
        assert_eq!(r0.get_num_parties(), 2);
        assert_eq!(r0.get_replication_number(), 1);
        assert_eq!(r0.get_num_threads(), 1);
    }

    #[test]
    fn set_batch_size_is_observed_by_dispatch() {
        let (mut r0, _r1) = runtime_pair();
        r0.set_batch_size(4);
        let batches = r0.dispatch(10, |_w, s, e| e - s);
        assert_eq!(batches, vec![4, 4, 2]);
    }

    #[test]
    fn get_groups_for_two_parties_is_singletons_and_the_pair() {
        let (r0, _r1) = runtime_pair();
        let groups = r0.get_groups();
        assert_eq!(groups.len(), 2); // {0}, {0,1}
        assert!(groups.iter().all(|g| g.contains(&0)));
    }

    #[test]
    fn reserve_requires_one_provider_per_worker() {
        use orq_crypto::DummyOle;
        let (mut r0, _r1) = runtime_pair();
        let mut providers: Vec<DummyOle> = Vec::new();
        assert!(r0.reserve_mul_triples(&mut providers, 4).is_err());
    }

    #[test]
    fn statistics_merge_across_workers_without_panicking() {
        let (r0, _r1) = runtime_pair();
        r0.print_statistics();
        r0.print_communicator_statistics();
    }
}
