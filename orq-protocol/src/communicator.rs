//! Communicator: per-pair reliable byte transport. The protocol layer
//! never opens a socket itself — it calls `send_share` / `receive_share` /
//! `exchange_shares` against whatever backend the runtime wires in (TCP,
//! MPI, or the lock-free same-process variant used here for tests and
//! single-machine simulation).

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

use orq_error::{OrqError, OrqResult};
use orq_vector::Elem;

use orq_crypto::RandomElem;

/// Byte (de)serialization for wire transport: native-endian, fixed-width —
/// packed shares in the native integer type of the sender; endianness is
/// sender-machine-native. Also a source of fresh correlated randomness
/// (`RandomElem`): every type this crate moves across the wire is one the
/// crypto layer can draw uniformly at random, so protocol code that needs
/// both never has to juggle two bounds.
pub trait WireCodec: Sized + RandomElem {
    fn to_le_bytes_vec(&self) -> Vec<u8>;
    fn from_le_bytes_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_codec {
    ($($t:ty),*) => {
        $(
            impl WireCodec for $t {
                fn to_le_bytes_vec(&self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
                fn from_le_bytes_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_wire_codec!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

/// Per-pair reliable byte transport. Exchanges preserve FIFO order per
/// (peer, tag); different tags may interleave.
pub trait Communicator {
    fn send_share<T: Elem + WireCodec>(&mut self, v: &[T], peer: usize, tag: u64) -> OrqResult<()>;
    fn receive_share<T: Elem + WireCodec>(&mut self, peer: usize, len: usize, tag: u64) -> OrqResult<Vec<T>>;

    /// Send `send` to `peer` and receive `recv_len` elements back from the
    /// same peer under the same tag, in one logical round trip.
    fn exchange_shares<T: Elem + WireCodec>(
        &mut self,
        send: &[T],
        peer: usize,
        recv_len: usize,
        tag: u64,
    ) -> OrqResult<Vec<T>> {
        self.send_share(send, peer, tag)?;
        self.receive_share(peer, recv_len, tag)
    }
}

/// Lock-free, copy-elision communicator sharing memory between cooperating
/// threads on the same machine — used here for deterministic in-process
/// multi-party simulation in tests. Backed by one `mpsc` channel per
/// ordered (sender, receiver, tag) pair.
pub struct LoopbackCommunicator {
    party_id: usize,
    num_parties: usize,
    senders: Vec<Sender<(u64, Vec<u8>)>>,
    receivers: Vec<Receiver<(u64, Vec<u8>)>>,
    // Reorder buffer: frames that arrived out of the tag the caller wants
    // right now are parked here until requested.
    pending: Vec<VecDeque<(u64, Vec<u8>)>>,
}

impl LoopbackCommunicator {
    /// Build a fully-connected mesh of `n` loopback communicators, one per
    /// party, that can exchange bytes with each other in-process.
    pub fn mesh(n: usize) -> Vec<LoopbackCommunicator> {
        // channel[i][j] carries frames sent from i to j
        let mut senders: Vec<Vec<Sender<(u64, Vec<u8>)>>> = (0..n).map(|_| Vec::with_capacity(n)).collect();
        let mut receivers: Vec<Vec<Option<Receiver<(u64, Vec<u8>)>>>> =
            (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
        for i in 0..n {
            for j in 0..n {
                let (tx, rx) = std::sync::mpsc::channel();
                senders[i].push(tx);
                receivers[j][i] = Some(rx);
            }
        }
        (0..n)
            .map(|i| LoopbackCommunicator {
                party_id: i,
                num_parties: n,
                senders: senders[i].clone(),
                receivers: receivers[i].iter_mut().map(|r| r.take().unwrap()).collect(),
                pending: (0..n).map(|_| VecDeque::new()).collect(),
            })
            .collect()
    }

    fn recv_raw(&mut self, peer: usize, tag: u64) -> OrqResult<Vec<u8>> {
        if let Some(pos) = self.pending[peer].iter().position(|(t, _)| *t == tag) {
            return Ok(self.pending[peer].remove(pos).unwrap().1);
        }
        loop {
            let (t, bytes) = self.receivers[peer]
                .recv()
                .map_err(|e| OrqError::comm_failed(format!("peer {peer} channel closed: {e}")))?;
            if t == tag {
                return Ok(bytes);
            }
            self.pending[peer].push_back((t, bytes));
        }
    }
}

impl Communicator for LoopbackCommunicator {
    fn send_share<T: Elem + WireCodec>(&mut self, v: &[T], peer: usize, tag: u64) -> OrqResult<()> {
        if peer >= self.num_parties || peer == self.party_id {
            return Err(OrqError::invalid_shape(format!("invalid peer id {peer}")));
        }
        let mut bytes = Vec::with_capacity(v.len() * std::mem::size_of::<T>());
        for x in v {
            bytes.extend(x.to_le_bytes_vec());
        }
        self.senders[peer]
            .send((tag, bytes))
            .map_err(|e| OrqError::comm_failed(format!("send to peer {peer} failed: {e}")))
    }

    fn receive_share<T: Elem + WireCodec>(&mut self, peer: usize, len: usize, tag: u64) -> OrqResult<Vec<T>> {
        if peer >= self.num_parties || peer == self.party_id {
            return Err(OrqError::invalid_shape(format!("invalid peer id {peer}")));
        }
        let bytes = self.recv_raw(peer, tag)?;
        let width = std::mem::size_of::<T>();
        if bytes.len() != len * width {
            return Err(OrqError::invalid_shape(format!(
                "receive_share: expected {} bytes, got {}",
                len * width,
                bytes.len()
            )));
        }
        Ok((0..len).map(|i| T::from_le_bytes_slice(&bytes[i * width..(i + 1) * width])).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_mesh_round_trips() {
        let mut parties = LoopbackCommunicator::mesh(3);
        let v = vec![10i64, 20, 30];
        parties[0].send_share(&v, 1, 42).unwrap();
        let got: Vec<i64> = parties[1].receive_share(0, 3, 42).unwrap();
        assert_eq!(got, v);
    }

    #[test]
    fn exchange_is_symmetric() {
        let mut parties = LoopbackCommunicator::mesh(2);
        let (mut p0, mut p1) = {
            let mut it = parties.drain(..);
            (it.next().unwrap(), it.next().unwrap())
        };
        let handle = std::thread::spawn(move || p0.exchange_shares(&[1i32, 2, 3], 1, 3, 7).unwrap());
        let got1 = p1.exchange_shares(&[4i32, 5, 6], 0, 3, 7).unwrap();
        let got0 = handle.join().unwrap();
        assert_eq!(got0, vec![4, 5, 6]);
        assert_eq!(got1, vec![1, 2, 3]);
    }

    #[test]
    fn interleaved_tags_do_not_corrupt_each_other() {
        let mut parties = LoopbackCommunicator::mesh(2);
        let (mut p0, mut p1) = {
            let mut it = parties.drain(..);
            (it.next().unwrap(), it.next().unwrap())
        };
        p0.send_share(&[1i32], 1, 1).unwrap();
        p0.send_share(&[2i32], 1, 2).unwrap();
        // request tag 2 first; tag 1 frame should be parked and still
        // retrievable afterwards.
        let second: Vec<i32> = p1.receive_share(0, 1, 2).unwrap();
        let first: Vec<i32> = p1.receive_share(0, 1, 1).unwrap();
        assert_eq!(second, vec![2]);
        assert_eq!(first, vec![1]);
    }
}
