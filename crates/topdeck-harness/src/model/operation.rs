//! Operations for model-based testing.
//!
//! Operations represent everything participants (and the clock) can do. They
//! are generated randomly and applied to the simulated world; the model then
//! checks what every participant received.

use arbitrary::Arbitrary;

/// Participant slot (0-indexed, reduced modulo the number of slots).
pub type ClientId = u8;

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Participant opens a room.
    CreateRoom {
        /// Acting participant
        client_id: ClientId,
    },

    /// Participant joins the room another participant believes it sits in.
    JoinRoom {
        /// Acting participant
        client_id: ClientId,
        /// Participant whose room code is used
        target: ClientId,
        /// Use a code that cannot exist instead
        bogus: bool,
    },

    /// Participant asks for a match to be dealt.
    StartGame {
        /// Acting participant
        client_id: ClientId,
    },

    /// Participant picks an attribute by index into the catalog attributes.
    ///
    /// Out-of-range indices send an unknown attribute name.
    SelectStat {
        /// Acting participant
        client_id: ClientId,
        /// Attribute index
        stat: u8,
    },

    /// Participant drops its connection and immediately reconnects with a
    /// fresh one.
    Reconnect {
        /// Acting participant
        client_id: ClientId,
    },

    /// Advance virtual time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// Release every queued timer.
    Settle,
}

impl Operation {
    /// Participant performing the operation, if any.
    pub fn client(&self) -> Option<ClientId> {
        match self {
            Self::CreateRoom { client_id }
            | Self::JoinRoom { client_id, .. }
            | Self::StartGame { client_id }
            | Self::SelectStat { client_id, .. }
            | Self::Reconnect { client_id } => Some(*client_id),
            Self::AdvanceTime { .. } | Self::Settle => None,
        }
    }
}
