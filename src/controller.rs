//! The step/scheduler harness: owns the topology, hands commands to nodes
//! and the observer, and advances per-channel message delivery on request.
//!
//! Grounded on `timely::execute::execute_directly`'s
//! `while worker.step_or_park(None) {}` shape for the drive-to-exhaustion
//! loop, and on `communication::initialize` for a single struct owning
//! every per-peer channel endpoint.

use std::collections::BTreeMap;
use std::io::Write;

use crate::channel::{Channel, FifoChannel};
use crate::command::Command;
use crate::error::SimError;
use crate::message::{EndpointId, Message};
use crate::node::Node;
use crate::observer::Observer;

/// Owns every `Node`, the `Observer`, and the channel matrix connecting
/// them; dispatches one `Command` at a time, matching the "one command,
/// one atomic step" concurrency contract.
pub struct Controller<W: Write> {
    nodes: BTreeMap<u64, Node>,
    observer: Observer,
    obs_in: BTreeMap<u64, Channel<Message>>,
    obs_out: BTreeMap<u64, Channel<Message>>,
    out: W,
}

impl<W: Write> Controller<W> {
    pub fn new(out: W) -> Self {
        Controller {
            nodes: BTreeMap::new(),
            observer: Observer::new(),
            obs_in: BTreeMap::new(),
            obs_out: BTreeMap::new(),
            out,
        }
    }

    /// Gives back the output sink, consuming the controller. Tests use
    /// this to inspect everything that was ever written.
    pub fn into_output(self) -> W {
        self.out
    }

    pub fn dispatch(&mut self, command: Command) {
        let _span = tracing::debug_span!("dispatch", ?command).entered();
        match command {
            Command::StartMaster => self.start_master(),
            Command::CreateNode { id, money } => self.create_node(id, money),
            Command::Send { src, dst, amount } => self.send(src, dst, amount),
            Command::Receive { dst, src } => self.receive(dst, src),
            Command::ReceiveAll => self.receive_all(),
            Command::BeginSnapshot { id } => self.begin_snapshot(id),
            Command::CollectState => self.collect_state(),
            Command::PrintSnapshot => self.print_snapshot(),
            Command::KillAll => self.start_master(), // teardown == re-initialize to empty
        }
    }

    fn start_master(&mut self) {
        self.nodes.clear();
        self.observer = Observer::new();
        self.obs_in.clear();
        self.obs_out.clear();
    }

    fn create_node(&mut self, id: u64, money: u64) {
        if self.nodes.contains_key(&id) {
            tracing::debug!(id, "CreateNode on an existing id, ignored");
            return;
        }
        let obs_in = Channel::new();
        let obs_out = Channel::new();
        let mut node = Node::new(id, money, obs_in.clone(), obs_out.clone());

        let peer_ids: Vec<u64> = self.nodes.keys().copied().collect();
        for peer_id in peer_ids {
            let new_to_peer = Channel::new();
            let peer_to_new = Channel::new();
            node.connect_peer(peer_id, new_to_peer.clone(), peer_to_new.clone());
            self.nodes
                .get_mut(&peer_id)
                .expect("just read this id from self.nodes")
                .connect_peer(id, peer_to_new, new_to_peer);
        }

        self.nodes.insert(id, node);
        self.obs_in.insert(id, obs_in);
        self.obs_out.insert(id, obs_out);
        tracing::info!(endpoint = %EndpointId::Node(id), money, "node created");
    }

    fn send(&mut self, src: u64, dst: u64, amount: u64) {
        let Some(node) = self.nodes.get_mut(&src) else {
            tracing::debug!(endpoint = %EndpointId::Node(src), "Send from an unknown node, ignored");
            return;
        };
        tracing::debug!(from = %EndpointId::Node(src), to = %EndpointId::Node(dst), amount, "send");
        self.report(node.send(dst, amount));
    }

    fn receive(&mut self, dst: u64, src: Option<u64>) {
        let Some(node) = self.nodes.get_mut(&dst) else {
            tracing::debug!(dst, "Receive on an unknown node, ignored");
            return;
        };
        let result = match src {
            Some(src) => node.receive(src),
            None => node.receive_any(),
        };
        self.report(result);
    }

    /// Drives the network until every Node→Node channel and every
    /// observer→node channel is empty. Node→observer report channels are
    /// untouched here; only `CollectState` drains those.
    fn receive_all(&mut self) {
        loop {
            let mut made_progress = false;
            let ids: Vec<u64> = self.nodes.keys().copied().collect();

            for &id in &ids {
                let peers: Vec<u64> = self.nodes[&id].peer_ids();
                for peer in peers {
                    if self.nodes[&id].has_pending_from(peer) {
                        let result = self.nodes.get_mut(&id).unwrap().receive(peer);
                        self.report(result);
                        made_progress = true;
                    }
                }
            }

            for &id in &ids {
                if self.nodes[&id].has_pending_observer_command() {
                    let started = self.nodes.get_mut(&id).unwrap().receive_observer();
                    match started {
                        Ok(true) => {
                            writeln!(self.out, "Started by Node {id}").ok();
                            tracing::info!(id, "snapshot recording started");
                        }
                        Ok(false) => {}
                        Err(e) => self.report(Err(e)),
                    }
                    made_progress = true;
                }
            }

            if !made_progress {
                return;
            }
        }
    }

    fn begin_snapshot(&mut self, id: u64) {
        let Some(channel) = self.obs_in.get(&id) else {
            tracing::debug!(id, "BeginSnapshot on an unknown node, ignored");
            return;
        };
        match self.observer.begin_snapshot(id, channel) {
            Ok(_) => tracing::info!(
                from = %EndpointId::Observer,
                to = %EndpointId::Node(id),
                "snapshot requested"
            ),
            Err(e) => self.report(Err(e)),
        }
    }

    fn collect_state(&mut self) {
        let ids: Vec<u64> = self.nodes.keys().copied().collect();
        for &id in &ids {
            let channel = self.obs_out[&id].clone();
            if let Err(e) = self.observer.collect_one(id, &channel) {
                self.report(Err(e));
            }
        }
        if self.observer.round_complete(&ids) {
            self.observer.finish_round();
        }
    }

    fn print_snapshot(&mut self) {
        let rendered = self.observer.format_snapshot();
        write!(self.out, "{rendered}").ok();
    }

    fn report(&mut self, result: Result<(), SimError>) {
        if let Err(e) = result {
            if let Some(token) = e.stdout_token() {
                writeln!(self.out, "{token}").ok();
                tracing::warn!(error = %e, "recoverable error surfaced to output");
            } else {
                tracing::debug!(error = %e, "recoverable error, no stdout token");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parse;

    fn run(controller: &mut Controller<Vec<u8>>, script: &str) {
        for line in script.lines() {
            if let Some(command) = parse(line) {
                controller.dispatch(command);
            }
        }
    }

    fn output(controller: Controller<Vec<u8>>) -> String {
        String::from_utf8(controller.into_output()).unwrap()
    }

    #[test]
    fn single_transfer_moves_balance_and_drains_the_channel() {
        let mut c = Controller::new(Vec::new());
        run(
            &mut c,
            "StartMaster\nCreateNode 1 100\nCreateNode 2 50\nSend 1 2 30\nReceive 2 1\n",
        );
        assert_eq!(c.nodes[&1].balance(), 70);
        assert_eq!(c.nodes[&2].balance(), 80);
    }

    #[test]
    fn overdraft_reports_err_send_and_leaves_balances_untouched() {
        let mut c = Controller::new(Vec::new());
        run(&mut c, "StartMaster\nCreateNode 1 10\nCreateNode 2 10\nSend 1 2 20\n");
        assert_eq!(c.nodes[&1].balance(), 10);
        assert_eq!(c.nodes[&2].balance(), 10);
        assert!(output(c).contains("ERR_SEND"));
    }

    #[test]
    fn begin_snapshot_on_unknown_node_is_a_silent_no_op() {
        let mut c = Controller::new(Vec::new());
        run(&mut c, "StartMaster\nCreateNode 1 100\nBeginSnapshot 99\nReceiveAll\n");
        assert!(!output(c).contains("Started by"));
    }

    #[test]
    fn basic_snapshot_with_no_in_flight_money_reports_full_balances() {
        let mut c = Controller::new(Vec::new());
        run(
            &mut c,
            "StartMaster\nCreateNode 1 100\nCreateNode 2 100\nBeginSnapshot 1\nReceiveAll\nCollectState\nPrintSnapshot\n",
        );
        let text = output(c);
        assert!(text.contains("Started by Node 1"));
        assert!(text.contains("node 1 = 100"));
        assert!(text.contains("node 2 = 100"));
        assert!(text.contains("channel (1 -> 2) = 0"));
        assert!(text.contains("channel (2 -> 1) = 0"));
    }

    #[test]
    fn concurrent_snapshot_request_is_rejected() {
        let mut c = Controller::new(Vec::new());
        run(
            &mut c,
            "StartMaster\nCreateNode 1 100\nCreateNode 2 100\nBeginSnapshot 1\nBeginSnapshot 2\nReceiveAll\nCollectState\nPrintSnapshot\n",
        );
        let text = output(c);
        assert_eq!(text.matches("Started by").count(), 1);
        assert!(text.contains("Started by Node 1"));
    }
}
