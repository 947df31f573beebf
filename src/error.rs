//! Recoverable error kinds produced by the core simulator.
//!
//! None of these are fatal: every caller in `controller` catches them,
//! reports whatever is externally visible for that kind, and leaves all
//! invariants intact.

use thiserror::Error;

/// An error raised by a `Node` or `Observer` operation.
///
/// Every variant is recoverable: the operation that raised it is a no-op
/// (or partially applied only up to the atomic boundary documented on the
/// operation itself), and the simulator continues accepting commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// `Send` would drive the sender's balance negative.
    #[error("node {node} has insufficient funds: balance {balance} < amount {amount}")]
    InsufficientFunds {
        node: u64,
        amount: u64,
        balance: u64,
    },

    /// `Send`/`Receive` referenced a node id that was never created.
    #[error("node {node} is not a known peer")]
    UnknownPeer { node: u64 },

    /// `BeginSnapshot` while a snapshot is already in progress.
    #[error("a snapshot is already in progress")]
    SnapshotAlreadyInProgress,

    /// A marker arrived on a channel already closed for recording, or a
    /// message violated protocol shape in some other way.
    #[error("protocol violation: {reason}")]
    ProtocolViolation { reason: String },
}

impl SimError {
    /// The stdout-visible error token for this error, if the command
    /// protocol assigns one. Only `InsufficientFunds` is ever surfaced to
    /// the command-protocol output; every other kind is logged but
    /// otherwise silent.
    pub fn stdout_token(&self) -> Option<&'static str> {
        match self {
            SimError::InsufficientFunds { .. } => Some("ERR_SEND"),
            SimError::UnknownPeer { .. }
            | SimError::SnapshotAlreadyInProgress
            | SimError::ProtocolViolation { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_insufficient_funds_has_a_stdout_token() {
        assert_eq!(
            SimError::InsufficientFunds { node: 1, amount: 5, balance: 2 }.stdout_token(),
            Some("ERR_SEND")
        );
        assert_eq!(SimError::UnknownPeer { node: 9 }.stdout_token(), None);
        assert_eq!(SimError::SnapshotAlreadyInProgress.stdout_token(), None);
        assert_eq!(
            SimError::ProtocolViolation { reason: "x".into() }.stdout_token(),
            None
        );
    }
}
