//! Core error types.

use thiserror::Error;

use crate::code::RoomCode;

/// Errors from room lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// No live room holds this code.
    #[error("room not found: {0}")]
    RoomNotFound(RoomCode),

    /// Both seats of the room are taken.
    #[error("room is full: {0}")]
    RoomFull(RoomCode),

    /// The participant already sits in this room.
    #[error("already seated in room {0}")]
    AlreadySeated(RoomCode),

    /// No free code was found after resampling.
    #[error("no free room code after {attempts} attempts")]
    CodeSpaceExhausted {
        /// Number of codes sampled before giving up.
        attempts: u32,
    },
}

impl RoomError {
    /// Text reported to the participant, if this error is reported at all.
    ///
    /// Only input-rejection errors reach the participant. A repeated join of
    /// one's own room is dropped like any other duplicate message.
    pub fn client_message(&self) -> Option<&'static str> {
        match self {
            Self::RoomNotFound(_) => Some("Room not found"),
            Self::RoomFull(_) => Some("Room is full"),
            Self::CodeSpaceExhausted { .. } => Some("Could not create room"),
            Self::AlreadySeated(_) => None,
        }
    }

    /// Returns true if the operation failed for an internal reason.
    ///
    /// Fatal errors end the single operation, never the process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::CodeSpaceExhausted { .. } => true,
            Self::RoomNotFound(_) | Self::RoomFull(_) | Self::AlreadySeated(_) => false,
        }
    }
}

/// Errors from building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A match needs at least one card per seat.
    #[error("catalog needs at least 2 items, got {0}")]
    TooFewItems(usize),

    /// Items carry no attributes to compare.
    #[error("catalog items have no attributes")]
    NoAttributes,

    /// An item's attribute names differ from the first item's.
    #[error("item {item:?} has attributes {found:?}, expected {expected:?}")]
    InconsistentAttributes {
        /// Offending item name.
        item: String,
        /// Attribute names of the first item.
        expected: Vec<String>,
        /// Attribute names of the offending item.
        found: Vec<String>,
    },

    /// The same attribute name appears twice on one item.
    #[error("duplicate attribute {0:?}")]
    DuplicateAttribute(String),

    /// Catalog file was not a JSON array of items.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from building a match out of explicit decks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The decks are not a partition of the catalog.
    #[error("decks must hold every catalog card exactly once")]
    InvalidPartition,

    /// A seat would start with no cards.
    #[error("both decks must be non-empty")]
    EmptyDeck,
}
