//! Client and server event types.
//!
//! Field names are camelCase on the wire. Every event carries a `data`
//! object, empty for events without a payload.

use serde::{Deserialize, Serialize};

use crate::card::CatalogItem;

/// Events sent by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Open a new room and take its first seat.
    CreateRoom {
        /// Display name of the creator
        player_name: String,
    },

    /// Take the free seat of an existing room.
    JoinRoom {
        /// Display name of the joiner
        player_name: String,
        /// Code of the room to join
        room_code: String,
    },

    /// Deal a match in the caller's room.
    StartGame {},

    /// Pick the attribute compared this round.
    SelectStat {
        /// Attribute name
        stat: String,
    },
}

/// A seated participant as shown in room rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Opaque participant id
    pub id: String,
    /// Display name
    pub name: String,
}

/// Round outcome from the receiving participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    /// Receiver's card had the higher value
    Win,
    /// Receiver's card had the lower value
    Lose,
    /// Values were equal
    Draw,
}

impl RoundOutcome {
    /// The same round seen from the other seat.
    pub fn complement(self) -> Self {
        match self {
            Self::Win => Self::Lose,
            Self::Lose => Self::Win,
            Self::Draw => Self::Draw,
        }
    }
}

/// Events sent by the server to a single participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledges `createRoom`.
    RoomCreated {
        /// Issued room code
        code: String,
        /// Current roster
        players: Vec<PlayerView>,
    },

    /// Acknowledges `joinRoom`.
    RoomJoined {
        /// Joined room code
        code: String,
        /// Current roster
        players: Vec<PlayerView>,
    },

    /// Broadcast to the room when its roster grows.
    PlayerJoined {
        /// Room code
        code: String,
        /// Current roster
        players: Vec<PlayerView>,
    },

    /// A request was rejected.
    Error {
        /// Human-readable reason
        message: String,
    },

    /// A match was dealt. Only the receiver's own deck is revealed.
    GameStarted {
        /// Receiver's deck, front first
        my_deck: Vec<CatalogItem>,
        /// Number of cards the opponent holds
        opponent_deck_length: usize,
        /// Opponent display name
        opponent_name: String,
        /// Whether the receiver picks the first attribute
        is_my_turn: bool,
    },

    /// Both front cards, shown before the round is adjudicated.
    CardRevealed {
        /// Receiver's front card
        my_card: CatalogItem,
        /// Opponent's front card
        opponent_card: CatalogItem,
        /// Attribute being compared
        selected_stat: String,
    },

    /// Outcome of the round, delivered after the reveal delay.
    RoundResult {
        /// Outcome for the receiver
        result: RoundOutcome,
        /// Receiver's card this round
        my_card: CatalogItem,
        /// Opponent's card this round
        opponent_card: CatalogItem,
        /// Receiver's deck size after the transfer
        my_deck_count: usize,
        /// Opponent's deck size after the transfer
        opponent_deck_count: usize,
    },

    /// The match is over.
    GameOver {
        /// Whether the receiver won
        winner: bool,
    },

    /// A new round is open.
    NextRound {
        /// Receiver's new front card
        my_card: CatalogItem,
        /// Whether the receiver picks the attribute
        is_my_turn: bool,
    },

    /// The opponent disconnected. Terminal for the receiver's match.
    PlayerLeft {},
}

impl ServerMessage {
    /// Wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RoomCreated { .. } => "roomCreated",
            Self::RoomJoined { .. } => "roomJoined",
            Self::PlayerJoined { .. } => "playerJoined",
            Self::Error { .. } => "error",
            Self::GameStarted { .. } => "gameStarted",
            Self::CardRevealed { .. } => "cardRevealed",
            Self::RoundResult { .. } => "roundResult",
            Self::GameOver { .. } => "gameOver",
            Self::NextRound { .. } => "nextRound",
            Self::PlayerLeft {} => "playerLeft",
        }
    }
}
