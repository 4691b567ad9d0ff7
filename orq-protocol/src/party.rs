//! `ProtocolParty`: the per-thread context every protocol function in this
//! crate is parameterised over — this party's id, the replication scheme,
//! its correlation pools, and its communicator. Each thread owns a
//! communicator object, a randomness manager, and its share of the
//! correlation pool; there is no implicit cross-thread sharing.

use orq_crypto::{BeaverTripleGenerator, CommonPrgManager, CorrelationStats, LocalPrg, RandomElem, ZeroSharingGenerator};
use orq_error::{OrqError, OrqResult};
use orq_vector::{Elem, Vector};

use crate::communicator::{Communicator, WireCodec};

/// Replication factor / sharing scheme, fixed at build time: additive
/// (2PC), replicated (3PC), replicated (4PC), and malicious 2PC with
/// authenticated (MAC'd) shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Additive2pc,
    Replicated3pc,
    Replicated4pc,
    Malicious2pc,
}

impl Scheme {
    pub fn replication_factor(self) -> usize {
        match self {
            Scheme::Additive2pc | Scheme::Malicious2pc => 1,
            Scheme::Replicated3pc => 2,
            Scheme::Replicated4pc => 3,
        }
    }

    pub fn num_parties(self) -> usize {
        match self {
            Scheme::Additive2pc | Scheme::Malicious2pc => 2,
            Scheme::Replicated3pc => 3,
            Scheme::Replicated4pc => 4,
        }
    }

    /// Whether this scheme carries a per-share MAC and an end-of-session
    /// `malicious_check` pass. Honest-majority schemes have no in-protocol
    /// integrity check by design.
    pub fn is_authenticated(self) -> bool {
        matches!(self, Scheme::Malicious2pc)
    }
}

/// A single party's protocol-level execution context, one per worker
/// thread. Owns its correlation pool for the element width `T` it is
/// currently working with, its local PRG, and a communicator.
pub struct ProtocolParty<T: Elem, C: Communicator> {
    pub party_id: usize,
    pub scheme: Scheme,
    pub comm: C,
    pub triples: BeaverTripleGenerator<T>,
    pub local_prg: LocalPrg,
    pub stats: CorrelationStats,
    /// This party's share of the session MAC key, under the authenticated
    /// (`Scheme::Malicious2pc`) build. `None` for every honest-majority
    /// scheme.
    pub mac_key: Option<T>,
    mac_log: Vec<(T, T)>,
    next_tag: u64,
    /// Pairwise common PRGs for the replicated schemes, keyed out-of-band at
    /// session setup. `None` under `Additive2pc`/`Malicious2pc`, which never
    /// reshare and so never need a zero-sharing.
    common_prgs: Option<CommonPrgManager>,
    zero_sharing: Option<ZeroSharingGenerator>,
}

impl<T: Elem, C: Communicator> ProtocolParty<T, C> {
    pub fn new(party_id: usize, scheme: Scheme, comm: C) -> Self {
        ProtocolParty {
            party_id,
            scheme,
            comm,
            triples: BeaverTripleGenerator::new(),
            local_prg: LocalPrg::new(),
            stats: CorrelationStats::new(),
            mac_key: None,
            mac_log: Vec::new(),
            next_tag: 0,
            common_prgs: None,
            zero_sharing: None,
        }
    }

    /// Attach this party's share of the session MAC key, for the
    /// authenticated-share build.
    pub fn with_mac_key(mut self, key: T) -> Self {
        self.mac_key = Some(key);
        self
    }

    /// Attach the pairwise common PRGs a replicated scheme needs to
    /// re-randomize reshared values. Required before `mul_a` is called
    /// under `Replicated3pc`/`Replicated4pc`; unused otherwise.
    pub fn with_replicated_randomness(mut self, prgs: CommonPrgManager) -> Self {
        self.zero_sharing = Some(ZeroSharingGenerator::new(self.party_id, self.scheme.num_parties()));
        self.common_prgs = Some(prgs);
        self
    }

    /// Draw an arithmetic zero-sharing of length `len`: one share per row
    /// whose sum across all parties is zero, used to re-randomize a value
    /// before resharing it without changing the secret it encodes.
    pub fn draw_arithmetic_zero_share(&mut self, len: usize) -> OrqResult<Vector<T>>
    where
        T: RandomElem,
    {
        match (&self.zero_sharing, &mut self.common_prgs) {
            (Some(zs), Some(prgs)) => Ok(zs.get_next_arithmetic::<T>(prgs, len)),
            _ => Err(OrqError::invalid_shape(
                "draw_arithmetic_zero_share: party has no replicated-randomness source (call with_replicated_randomness)",
            )),
        }
    }

    /// Record one outstanding `(value_share, mac_share)` pair so the
    /// runtime's end-of-session `malicious_check` can verify it.
    pub fn record_mac(&mut self, value_share: T, mac_share: T) {
        self.mac_log.push((value_share, mac_share));
    }

    pub fn mac_log(&self) -> &[(T, T)] {
        &self.mac_log
    }

    pub fn clear_mac_log(&mut self) {
        self.mac_log.clear();
    }

    /// Allocate a fresh tag for one protocol invocation — each call gets
    /// its own so concurrent invocations on the same pair never
    /// cross-deliver frames.
    pub fn fresh_tag(&mut self) -> u64 {
        self.next_tag += 1;
        self.next_tag
    }

    pub fn successor(&self) -> usize {
        (self.party_id + 1) % self.scheme.num_parties()
    }

    pub fn predecessor(&self) -> usize {
        (self.party_id + self.scheme.num_parties() - 1) % self.scheme.num_parties()
    }
}

pub(crate) fn _assert_wire_codec<T: WireCodec>() {}
