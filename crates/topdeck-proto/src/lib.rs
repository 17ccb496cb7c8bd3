//! Topdeck wire protocol.
//!
//! Every real-time message is a named event with a payload object:
//!
//! ```json
//! { "event": "selectStat", "data": { "stat": "Cuteness" } }
//! ```
//!
//! Text frames carry the envelope as JSON. Binary frames carry the same
//! envelope encoded as CBOR, for clients that prefer a compact encoding.
//!
//! # Components
//!
//! - [`ClientMessage`]: events sent by a participant to the server
//! - [`ServerMessage`]: events sent by the server to one participant
//! - [`CatalogItem`]: a comparable card, as shown to participants
//! - [`ProtocolError`]: encode/decode failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod card;
mod codec;
mod error;
pub mod message;

pub use card::{Attribute, CatalogItem};
pub use error::ProtocolError;
pub use message::{ClientMessage, PlayerView, RoundOutcome, ServerMessage};
