//! Core simulator library: channel matrix, node/observer state machines,
//! the command protocol, and the controller that ties them together.
//! `main.rs` is a thin CLI shell over this crate; `tests/` exercises it
//! the same way `main.rs` does, through `Controller::dispatch`.

pub mod channel;
pub mod command;
pub mod controller;
pub mod error;
pub mod logging;
pub mod message;
pub mod node;
pub mod observer;
