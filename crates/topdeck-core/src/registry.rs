//! Session Registry
//!
//! Owns every live room and the session → room index.
//!
//! ## Responsibilities
//!
//! - Room Lifecycle: Issue unique codes, create rooms, destroy them when empty
//! - Seating: A session sits in at most one room at a time
//! - Dispatch: Route start, stat choices and timers to the session's room
//! - Action Generation: Return actions for the driver to execute
//!
//! ## Design
//!
//! - Explicit object: constructed at startup and handed to the driver, so
//!   tests can run many independent registries side by side
//! - Action-based: All methods return actions, no direct I/O
//! - Callers serialise access (`&mut self`); one registry call is one atomic
//!   transition

use std::collections::HashMap;

use crate::{
    catalog::Catalog,
    code::RoomCode,
    env::Environment,
    error::RoomError,
    game::{Match, MatchConfig, MatchId},
    room::{Participant, Room, RoomAction, RoomTimer, RoomView, SessionId},
};

/// Give up on code generation after this many collisions in a row.
pub const MAX_CODE_ATTEMPTS: u32 = 32;

/// A successful create or join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seated {
    /// Roster of the room the session now sits in
    pub view: RoomView,
    /// Actions produced by leaving the session's previous room
    pub actions: Vec<RoomAction>,
}

/// Process-wide mapping from room code to room.
pub struct SessionRegistry {
    /// Shared card catalog
    catalog: Catalog,
    /// Match delivery delays
    config: MatchConfig,
    /// Live rooms
    rooms: HashMap<RoomCode, Room>,
    /// Which room each seated session is in
    seats: HashMap<SessionId, RoomCode>,
    /// Next match id to hand out
    next_match_id: MatchId,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(catalog: Catalog, config: MatchConfig) -> Self {
        Self { catalog, config, rooms: HashMap::new(), seats: HashMap::new(), next_match_id: 1 }
    }

    /// Shared catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Delivery delays.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Check if a room exists.
    pub fn has_room(&self, code: RoomCode) -> bool {
        self.rooms.contains_key(&code)
    }

    /// Room by code.
    pub fn room(&self, code: RoomCode) -> Option<&Room> {
        self.rooms.get(&code)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Code of the room a session sits in.
    pub fn room_of(&self, session_id: SessionId) -> Option<RoomCode> {
        self.seats.get(&session_id).copied()
    }

    /// Creates a room with a fresh code and seats the creator.
    ///
    /// A creator already seated elsewhere leaves that room first.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::CodeSpaceExhausted` if no free code was drawn in
    /// [`MAX_CODE_ATTEMPTS`] tries.
    pub fn create_room<E: Environment>(
        &mut self,
        creator: Participant,
        env: &E,
    ) -> Result<Seated, RoomError> {
        let code = self.fresh_code(env)?;
        let actions = self.leave(creator.session_id);

        let session_id = creator.session_id;
        let name = creator.name.clone();
        let room = Room::new(code, creator, env.now());
        let view = room.view();
        self.rooms.insert(code, room);
        self.seats.insert(session_id, code);

        tracing::info!("room {} created by {}", code, name);
        Ok(Seated { view, actions })
    }

    /// Check that a room can take another participant.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::RoomNotFound` for an unknown code and
    /// `RoomError::RoomFull` if both seats are taken.
    pub fn joinable(&self, code: RoomCode) -> Result<&Room, RoomError> {
        let room = self.rooms.get(&code).ok_or(RoomError::RoomNotFound(code))?;
        if room.is_full() {
            return Err(RoomError::RoomFull(code));
        }
        Ok(room)
    }

    /// Seats a participant in an existing room.
    ///
    /// The target room is validated before anything changes. A participant
    /// seated elsewhere then leaves that room.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::AlreadySeated` if the participant already sits in
    /// this room, `RoomError::RoomNotFound` for an unknown code and
    /// `RoomError::RoomFull` if both seats are taken.
    pub fn join_room(
        &mut self,
        code: RoomCode,
        participant: Participant,
    ) -> Result<Seated, RoomError> {
        if self.room_of(participant.session_id) == Some(code) {
            return Err(RoomError::AlreadySeated(code));
        }
        self.joinable(code)?;

        let actions = self.leave(participant.session_id);
        let session_id = participant.session_id;
        let name = participant.name.clone();

        let room = self.rooms.get_mut(&code).ok_or(RoomError::RoomNotFound(code))?;
        let view = room.seat(participant)?;
        self.seats.insert(session_id, code);

        tracing::info!("{} joined room {}", name, code);
        Ok(Seated { view, actions })
    }

    /// Removes a session from whichever room holds it.
    ///
    /// Tears down any match, notifies the remaining participant, and destroys
    /// the room once it is empty. A no-op for an unseated session.
    pub fn leave(&mut self, session_id: SessionId) -> Vec<RoomAction> {
        let Some(code) = self.seats.remove(&session_id) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Vec::new();
        };

        let actions = room.unseat(session_id).unwrap_or_default();
        if room.is_empty() {
            self.rooms.remove(&code);
            tracing::info!("room {} deleted", code);
        }
        actions
    }

    /// Deals a match in the session's room.
    ///
    /// Silently ignored unless the room is full and idle.
    pub fn start<E: Environment>(&mut self, session_id: SessionId, env: &E) -> Vec<RoomAction> {
        let Some(room) = self.room_of(session_id).and_then(|code| self.rooms.get_mut(&code)) else {
            return Vec::new();
        };
        if !room.is_full() || room.game().is_some() {
            tracing::debug!("room {}: start ignored", room.code());
            return Vec::new();
        }

        let match_id = self.next_match_id;
        self.next_match_id += 1;
        room.start(match_id, &self.catalog, &mut env.rng())
    }

    /// Installs a pre-dealt match in the session's room.
    ///
    /// Same guards as [`SessionRegistry::start`]. The match id of `game` must
    /// have been obtained from [`SessionRegistry::allocate_match_id`].
    pub fn start_with(&mut self, session_id: SessionId, game: Match) -> Vec<RoomAction> {
        self.room_of(session_id)
            .and_then(|code| self.rooms.get_mut(&code))
            .map(|room| room.begin(game))
            .unwrap_or_default()
    }

    /// Reserve a match id for [`SessionRegistry::start_with`].
    pub fn allocate_match_id(&mut self) -> MatchId {
        let id = self.next_match_id;
        self.next_match_id += 1;
        id
    }

    /// Forwards a stat choice to the session's match.
    ///
    /// Silently ignored when the session holds no turn or a round is
    /// resolving.
    pub fn select_stat(&mut self, session_id: SessionId, stat: String) -> Vec<RoomAction> {
        let config = self.config;
        self.room_of(session_id)
            .and_then(|code| self.rooms.get_mut(&code))
            .map(|room| room.select_stat(session_id, stat, &config))
            .unwrap_or_default()
    }

    /// Delivers a fired timer. Timers of destroyed rooms or matches are
    /// dropped.
    pub fn fire(&mut self, timer: RoomTimer) -> Vec<RoomAction> {
        let config = self.config;
        self.rooms
            .get_mut(&timer.code)
            .map(|room| room.fire(timer.timer, &config))
            .unwrap_or_default()
    }

    fn fresh_code<E: Environment>(&self, env: &E) -> Result<RoomCode, RoomError> {
        let mut rng = env.rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = RoomCode::random(&mut rng);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
            tracing::debug!("room code {} collided, resampling", code);
        }
        Err(RoomError::CodeSpaceExhausted { attempts: MAX_CODE_ATTEMPTS })
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("room_count", &self.rooms.len())
            .field("seated", &self.seats.len())
            .field("catalog_len", &self.catalog.len())
            .finish()
    }
}
