//! The message envelope and endpoint addressing carried by every channel.
//!
//! Endpoints are a tagged variant rather than string-keyed: a prior design
//! mixed node ids with sentinel strings ("m", "o") in one untyped map,
//! which this type replaces with something the compiler can check.

use std::collections::BTreeMap;

/// Identifies one side of a channel: a node by id, or the observer.
///
/// The controller itself is never an addressable endpoint: it is the
/// scheduler that drives steps, not a participant in the channel matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EndpointId {
    Node(u64),
    Observer,
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointId::Node(id) => write!(f, "{id}"),
            EndpointId::Observer => write!(f, "observer"),
        }
    }
}

/// A message in flight on a channel.
///
/// `Transfer` and `Marker` travel Node→Node channels. `TakeSnapshot`
/// travels Observer→Node. `NodeState`/`ChannelState` travel Node→Observer.
/// All four kinds are carried by the same `Channel<Message>` type; nothing
/// in the channel itself enforces which kinds are valid on which matrix
/// entry; that's a caller-side invariant upheld by `Node` and `Observer`
/// only ever enqueueing the kind assigned to that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Application payload: moves `amount` from sender to receiver.
    Transfer(u64),
    /// Snapshot token with no payload.
    Marker,
    /// Observer-to-node command that starts a snapshot at the receiver.
    TakeSnapshot,
    /// Node-to-observer report fragment: the node's recorded balance.
    NodeState(u64),
    /// Node-to-observer report fragment: recorded in-flight amounts,
    /// keyed by the sender node id the amount was recorded against.
    ChannelState(BTreeMap<u64, u64>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display_matches_protocol_vocabulary() {
        assert_eq!(EndpointId::Node(3).to_string(), "3");
        assert_eq!(EndpointId::Observer.to_string(), "observer");
    }

    #[test]
    fn endpoints_order_by_variant_then_id() {
        let mut ids = vec![EndpointId::Observer, EndpointId::Node(2), EndpointId::Node(1)];
        ids.sort();
        assert_eq!(ids, vec![EndpointId::Node(1), EndpointId::Node(2), EndpointId::Observer]);
    }
}
