//! Reference model for model-based testing.
//!
//! The model is what a participant can derive from its own messages, with no
//! access to the server's state. It serves as the oracle against which the
//! real driver's emissions are verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Observation only: Beliefs change only when a message arrives
//! - Deterministic: Same inputs produce same outputs

mod client;
pub mod operation;
mod world;

pub use client::{ModelClient, ModelViolation, RoundPhase};
pub use operation::{ClientId, Operation};
pub use world::{ModelWorld, ObservableState};
