//! Deterministic simulation harness for topdeck testing.
//!
//! [`SimWorld`] runs the real [`ServerDriver`](topdeck_server::ServerDriver)
//! against a virtual clock. Scheduled timers sit in a queue
//! ordered by due time and only happen when the test advances time, so a
//! whole match plays out in microseconds and every run with the same seed is
//! identical.
//!
//! # Model-Based Testing
//!
//! The `model` module tracks what each participant should believe from the
//! messages it receives: its own deck, the opponent's card count, whose turn
//! it is and where the round cycle stands. Every delivered message is checked
//! against that belief, and each participant's room is compared with the
//! server's.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod world;

pub use model::{
    ClientId, ModelClient, ModelViolation, ModelWorld, ObservableState, Operation, RoundPhase,
};
pub use sim_env::SimEnv;
pub use world::{Delivered, SimWorld};
