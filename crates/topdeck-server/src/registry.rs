//! Connection registry.
//!
//! Tracks every accepted connection and the room it currently sits in, so the
//! driver can answer "who is connected" without asking the session registry.

use std::{collections::HashMap, time::Instant};

use topdeck_core::{RoomCode, SessionId};

/// What the server knows about one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Connection id, doubling as the participant's session id
    pub session_id: SessionId,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Name given on the last create or join
    pub player_name: Option<String>,
    /// Room the participant sits in
    pub room: Option<RoomCode>,
}

impl SessionInfo {
    /// A freshly accepted, unseated connection.
    pub fn new(session_id: SessionId, connected_at: Instant) -> Self {
        Self { session_id, connected_at, player_name: None, room: None }
    }
}

/// Live connections keyed by session id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, SessionInfo>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns false if the id was already taken.
    pub fn register(&mut self, info: SessionInfo) -> bool {
        if self.sessions.contains_key(&info.session_id) {
            return false;
        }
        self.sessions.insert(info.session_id, info);
        true
    }

    /// Remove a connection.
    pub fn unregister(&mut self, session_id: SessionId) -> Option<SessionInfo> {
        self.sessions.remove(&session_id)
    }

    /// Connection by id.
    pub fn get(&self, session_id: SessionId) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// Mutable connection by id.
    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut SessionInfo> {
        self.sessions.get_mut(&session_id)
    }

    /// Check if a connection is registered.
    pub fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions seated in a room.
    pub fn sessions_in_room(&self, code: RoomCode) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.values().filter(move |s| s.room == Some(code)).map(|s| s.session_id)
    }
}
