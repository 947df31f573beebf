//! A money-holding participant in the network: the Chandy–Lamport node
//! half of the protocol (marker/recording state machine plus balance
//! bookkeeping).
//!
//! Structurally grounded on `timely::worker::Worker`: one struct owns all
//! of its channel endpoints plus whatever per-entity bookkeeping the
//! protocol needs, and exposes a small set of methods the `Controller`
//! calls one at a time: one command, one atomic step.

use std::collections::HashMap;

use crate::channel::{Channel, FifoChannel};
use crate::error::SimError;
use crate::message::Message;

/// A single network participant.
///
/// Snapshot-local fields (`recorded_balance`, `recording`, `channel_state`,
/// `remain`) are only meaningful while `remain > 0`; outside a snapshot
/// they hold their "idle" value (`None`/empty/`0`).
pub struct Node {
    id: u64,
    balance: u64,

    outgoing: HashMap<u64, Channel<Message>>,
    incoming: HashMap<u64, Channel<Message>>,
    observer_out: Channel<Message>,
    observer_in: Channel<Message>,

    recorded_balance: Option<u64>,
    recording: HashMap<u64, bool>,
    channel_state: HashMap<u64, u64>,
    remain: usize,
}

impl Node {
    /// Creates a node with no peer wiring yet; `connect_peer` wires each
    /// peer in as it is created by the controller.
    pub fn new(id: u64, balance: u64, observer_in: Channel<Message>, observer_out: Channel<Message>) -> Self {
        Node {
            id,
            balance,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            observer_out,
            observer_in,
            recorded_balance: None,
            recording: HashMap::new(),
            channel_state: HashMap::new(),
            remain: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// True while the node is between `start_recording` and
    /// `finish_recording`.
    pub fn is_recording(&self) -> bool {
        self.remain > 0
    }

    /// Wires this node's outgoing channel to `peer` and its incoming
    /// channel from `peer`. Called once per peer at `CreateNode` time, in
    /// both directions, for every existing node (the topology invariant:
    /// every pair of nodes has channels in both directions).
    pub fn connect_peer(&mut self, peer: u64, outgoing: Channel<Message>, incoming: Channel<Message>) {
        self.outgoing.insert(peer, outgoing);
        self.incoming.insert(peer, incoming);
    }

    /// Preconditions: `dst` is a known peer, `amount` fits in `u64`
    /// (non-negative by construction). Fails with `InsufficientFunds` if
    /// `amount > balance`, leaving the node unchanged. Otherwise atomic:
    /// balance decrements and the `Transfer` is enqueued as one step.
    pub fn send(&mut self, dst: u64, amount: u64) -> Result<(), SimError> {
        let channel = self
            .outgoing
            .get(&dst)
            .ok_or(SimError::UnknownPeer { node: dst })?;
        if amount > self.balance {
            return Err(SimError::InsufficientFunds { node: self.id, amount, balance: self.balance });
        }
        self.balance -= amount;
        channel.enqueue(Message::Transfer(amount));
        Ok(())
    }

    /// Dequeues one message from the (src→self) channel, or no-ops if it's
    /// empty. `src` must be a known peer.
    pub fn receive(&mut self, src: u64) -> Result<(), SimError> {
        let channel = self
            .incoming
            .get(&src)
            .ok_or(SimError::UnknownPeer { node: src })?
            .clone();
        match channel.dequeue() {
            None => Ok(()),
            Some(Message::Transfer(v)) => {
                self.balance += v;
                if self.remain > 0 && *self.recording.get(&src).unwrap_or(&false) {
                    *self.channel_state.entry(src).or_insert(0) += v;
                }
                Ok(())
            }
            Some(Message::Marker) => self.handle_marker(src),
            Some(other) => Err(SimError::ProtocolViolation {
                reason: format!("unexpected {other:?} on node→node channel from {src}"),
            }),
        }
    }

    fn handle_marker(&mut self, src: u64) -> Result<(), SimError> {
        if self.remain == 0 {
            self.start_recording(Some(src));
            return Ok(());
        }
        match self.recording.get(&src).copied() {
            Some(true) => {
                self.recording.insert(src, false);
                self.remain -= 1;
                if self.remain == 0 {
                    self.finish_recording();
                }
                Ok(())
            }
            // Channel already closed for recording: tolerated no-op,
            // not propagated as a hard error.
            Some(false) => Ok(()),
            None => Err(SimError::ProtocolViolation {
                reason: format!("marker from unknown peer {src}"),
            }),
        }
    }

    /// All peer ids this node has a wired channel pair with.
    pub fn peer_ids(&self) -> Vec<u64> {
        self.incoming.keys().copied().collect()
    }

    /// True if the (peer→self) channel has a message waiting. `peer` must
    /// be a known peer.
    pub fn has_pending_from(&self, peer: u64) -> bool {
        self.incoming.get(&peer).is_some_and(|c| c.peek_nonempty())
    }

    /// True if the observer has a pending command for this node
    /// (`TakeSnapshot`, in practice).
    pub fn has_pending_observer_command(&self) -> bool {
        self.observer_in.peek_nonempty()
    }

    /// Receives one message from an arbitrary non-empty incoming peer
    /// channel, or no-ops if every peer channel is empty. Used by the
    /// `Receive` command when no source peer is named. Deterministic
    /// (lowest peer id with a pending message) rather than truly random;
    /// the protocol only requires *some* non-empty channel be chosen.
    pub fn receive_any(&mut self) -> Result<(), SimError> {
        let mut peers: Vec<u64> = self.incoming.keys().copied().collect();
        peers.sort_unstable();
        for peer in peers {
            if self.incoming[&peer].peek_nonempty() {
                return self.receive(peer);
            }
        }
        Ok(())
    }

    /// Consumes a pending `TakeSnapshot` from the observer, if any, and
    /// becomes the snapshot initiator. Returns `true` if a snapshot was
    /// started by this call (the caller prints `Started by Node <id>`
    /// exactly once for that case).
    pub fn receive_observer(&mut self) -> Result<bool, SimError> {
        match self.observer_in.dequeue() {
            None => Ok(false),
            Some(Message::TakeSnapshot) => {
                self.start_recording(None);
                Ok(true)
            }
            Some(other) => Err(SimError::ProtocolViolation {
                reason: format!("unexpected {other:?} on observer→node channel"),
            }),
        }
    }

    /// Precondition: not already recording (`remain == 0`). Records the
    /// current balance, emits a `Marker` on every outgoing channel *before*
    /// any later send can reach those channels (marker-before-postmarker-
    /// send), and sets up per-incoming-channel bookkeeping.
    ///
    /// `src` is `Some(p)` when this call is triggered by a `Marker`
    /// arriving from peer `p` (that channel is immediately closed for
    /// recording, since the marker itself delimits it); `None` when
    /// triggered by `TakeSnapshot`, making this node the initiator.
    fn start_recording(&mut self, src: Option<u64>) {
        debug_assert_eq!(self.remain, 0, "start_recording called while already recording");

        self.recorded_balance = Some(self.balance);
        for channel in self.outgoing.values() {
            channel.enqueue(Message::Marker);
        }

        let peers: Vec<u64> = self.incoming.keys().copied().collect();
        let mut remain = 0usize;
        for peer in peers {
            if Some(peer) == src {
                self.recording.insert(peer, false);
                self.channel_state.insert(peer, 0);
            } else {
                self.recording.insert(peer, true);
                self.channel_state.insert(peer, 0);
                remain += 1;
            }
        }
        self.remain = remain;

        if self.remain == 0 {
            self.finish_recording();
        }
    }

    /// Emits the collected `NodeState`/`ChannelState` fragments to the
    /// observer and clears all snapshot-local state back to idle.
    fn finish_recording(&mut self) {
        let balance = self.recorded_balance.take().unwrap_or(self.balance);
        self.observer_out.enqueue(Message::NodeState(balance));
        self.observer_out
            .enqueue(Message::ChannelState(self.channel_state.iter().map(|(&k, &v)| (k, v)).collect()));

        self.recording.clear();
        self.channel_state.clear();
        self.remain = 0;
    }
}
