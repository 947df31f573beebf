//! The singleton coordinator that starts a snapshot at a chosen initiator,
//! collects recorded fragments from every node, and renders the global
//! state.
//!
//! Structurally the nearest analogue in the teacher is a single root
//! (`Worker`) that collects state reported by many per-channel sources;
//! here that generalizes from "one root per process" to "one observer per
//! simulated network".

use std::collections::{BTreeMap, BTreeSet};

use crate::channel::{Channel, FifoChannel};
use crate::error::SimError;
use crate::message::Message;

/// Coordinates one Chandy–Lamport run across the whole node set.
///
/// Has no balance of its own; it only ever relays `TakeSnapshot` to the
/// initiator and collects what nodes report back.
pub struct Observer {
    node_states: BTreeMap<u64, u64>,
    channel_states: BTreeMap<(u64, u64), u64>,
    reported: BTreeSet<u64>,
    snapshot_in_progress: bool,
    initiator: Option<u64>,
}

impl Observer {
    pub fn new() -> Self {
        Observer {
            node_states: BTreeMap::new(),
            channel_states: BTreeMap::new(),
            reported: BTreeSet::new(),
            snapshot_in_progress: false,
            initiator: None,
        }
    }

    pub fn snapshot_in_progress(&self) -> bool {
        self.snapshot_in_progress
    }

    /// Commands `initiator_id` to start a snapshot by enqueuing
    /// `TakeSnapshot` on the (observer→initiator) channel. No-op if a
    /// snapshot is already in progress: at most one runs at a time.
    /// Returns `true` if this call actually started one (the caller logs
    /// "Started by Node N" only in that case).
    pub fn begin_snapshot(&mut self, initiator_id: u64, initiator_channel: &Channel<Message>) -> Result<bool, SimError> {
        if self.snapshot_in_progress {
            return Err(SimError::SnapshotAlreadyInProgress);
        }
        initiator_channel.enqueue(Message::TakeSnapshot);
        self.snapshot_in_progress = true;
        self.initiator = Some(initiator_id);
        Ok(true)
    }

    /// Drains one (node→observer) channel pair, sorting whatever is
    /// present into `node_states`/`channel_states`. Safe to call before
    /// every node has reported: it's monotonic, never overwrites a report
    /// already recorded for that node in this round.
    pub fn collect_one(&mut self, node_id: u64, channel: &Channel<Message>) -> Result<(), SimError> {
        while channel.peek_nonempty() {
            match channel.dequeue() {
                None => break,
                Some(Message::NodeState(balance)) => {
                    self.node_states.insert(node_id, balance);
                }
                Some(Message::ChannelState(map)) => {
                    for (src, amount) in map {
                        self.channel_states.insert((src, node_id), amount);
                    }
                    self.reported.insert(node_id);
                }
                Some(other) => {
                    return Err(SimError::ProtocolViolation {
                        reason: format!("unexpected {other:?} on node→observer channel from {node_id}"),
                    })
                }
            }
        }
        Ok(())
    }

    /// True once every node in `all_node_ids` has reported both fragments
    /// for the current round. The controller uses this to decide when
    /// `collect_state` has finished and the snapshot can be considered
    /// complete.
    pub fn round_complete(&self, all_node_ids: &[u64]) -> bool {
        all_node_ids.iter().all(|id| self.reported.contains(id))
    }

    /// Marks the in-progress snapshot as finished, allowing a new one to
    /// be started. Called once `round_complete` holds.
    pub fn finish_round(&mut self) {
        self.snapshot_in_progress = false;
        self.initiator = None;
    }

    /// Renders the collected snapshot in the stable, test-visible format
    /// and clears both maps. Pure with respect to I/O: callers decide
    /// where the string goes.
    pub fn format_snapshot(&mut self) -> String {
        let mut out = String::new();
        out.push_str("---Node states\n");
        for (&id, &balance) in &self.node_states {
            out.push_str(&format!("node {id} = {balance}\n"));
        }
        out.push_str("---Channel states\n");
        for (&(src, dst), &amount) in self.channel_states.iter() {
            out.push_str(&format!("channel ({src} -> {dst}) = {amount}\n"));
        }
        self.node_states.clear();
        self.channel_states.clear();
        self.reported.clear();
        out
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_snapshot_enqueues_take_snapshot_and_sets_the_flag() {
        let mut obs = Observer::new();
        let channel = Channel::new();
        let started = obs.begin_snapshot(1, &channel).unwrap();
        assert!(started);
        assert!(obs.snapshot_in_progress());
        assert_eq!(channel.dequeue(), Some(Message::TakeSnapshot));
    }

    #[test]
    fn begin_snapshot_while_already_in_progress_is_rejected() {
        let mut obs = Observer::new();
        let channel = Channel::new();
        obs.begin_snapshot(1, &channel).unwrap();
        let err = obs.begin_snapshot(2, &channel).unwrap_err();
        assert_eq!(err, SimError::SnapshotAlreadyInProgress);
        // no second TakeSnapshot was enqueued
        assert_eq!(channel.dequeue(), Some(Message::TakeSnapshot));
        assert_eq!(channel.dequeue(), None);
    }

    #[test]
    fn collect_one_accumulates_both_fragments_and_round_complete_waits_for_all() {
        let mut obs = Observer::new();
        let c1 = Channel::new();
        let c2 = Channel::new();
        c1.enqueue(Message::NodeState(60));
        c1.enqueue(Message::ChannelState(BTreeMap::from([(2, 0)])));
        obs.collect_one(1, &c1).unwrap();
        assert!(!obs.round_complete(&[1, 2]));

        c2.enqueue(Message::NodeState(90));
        c2.enqueue(Message::ChannelState(BTreeMap::from([(1, 0)])));
        obs.collect_one(2, &c2).unwrap();
        assert!(obs.round_complete(&[1, 2]));
    }

    #[test]
    fn format_snapshot_sorts_and_clears() {
        let mut obs = Observer::new();
        let c1 = Channel::new();
        let c2 = Channel::new();
        c2.enqueue(Message::NodeState(50));
        c2.enqueue(Message::ChannelState(BTreeMap::from([(1, 40)])));
        c1.enqueue(Message::NodeState(60));
        c1.enqueue(Message::ChannelState(BTreeMap::from([(2, 0)])));
        obs.collect_one(2, &c2).unwrap();
        obs.collect_one(1, &c1).unwrap();

        let rendered = obs.format_snapshot();
        assert_eq!(
            rendered,
            "---Node states\nnode 1 = 60\nnode 2 = 50\n---Channel states\nchannel (1 -> 2) = 40\nchannel (2 -> 1) = 0\n"
        );
        assert_eq!(obs.format_snapshot(), "---Node states\n---Channel states\n");
    }
}
