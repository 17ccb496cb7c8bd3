//! Topdeck core.
//!
//! Authoritative room lifecycle and match engine for two-participant
//! card-comparison duels. Pure state machines: every operation commits its
//! transition synchronously and returns the addressed outbound messages and
//! the timers for a driver to execute.
//!
//! # Components
//!
//! - [`Catalog`]: immutable, shared set of comparable cards
//! - [`SessionRegistry`]: code → room mapping, the only owner of rooms
//! - [`Room`]: two-seat lobby holding at most one match
//! - [`Match`]: turn/round state machine and adjudication
//! - [`Environment`]: time and randomness, injected for determinism

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod code;
pub mod env;
pub mod error;
pub mod game;
pub mod registry;
pub mod room;

pub use catalog::{AttributeId, CardId, Catalog};
pub use code::RoomCode;
pub use env::Environment;
pub use error::{CatalogError, MatchError, RoomError};
pub use game::{
    Match, MatchConfig, MatchId, MatchInput, MatchOutput, MatchTimer, Phase, Round, Seat,
    TimerKind, adjudicate,
};
pub use registry::{MAX_CODE_ATTEMPTS, Seated, SessionRegistry};
pub use room::{Participant, Room, RoomAction, RoomTimer, RoomView, SessionId};
