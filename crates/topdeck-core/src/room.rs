//! Two-seat rooms.
//!
//! A room maps seats to participants and owns at most one match. It turns
//! seat-addressed match outputs into session-addressed [`RoomAction`]s.

use std::time::{Duration, Instant};

use rand::Rng;
use topdeck_proto::{PlayerView, ServerMessage};

use crate::{
    catalog::Catalog,
    code::RoomCode,
    error::RoomError,
    game::{Match, MatchConfig, MatchId, MatchInput, MatchOutput, MatchTimer, Seat, TimerKind},
};

/// Opaque per-connection participant identity.
pub type SessionId = u64;

/// Maximum number of seated participants.
pub const SEATS: usize = 2;

/// A seated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Connection identity
    pub session_id: SessionId,
    /// Display name
    pub name: String,
}

impl Participant {
    /// Create a participant. The name is trimmed.
    pub fn new(session_id: SessionId, name: &str) -> Self {
        Self { session_id, name: name.trim().to_string() }
    }

    /// Roster entry.
    pub fn view(&self) -> PlayerView {
        PlayerView { id: format!("{:016x}", self.session_id), name: self.name.clone() }
    }
}

/// Roster snapshot returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    /// Room code
    pub code: RoomCode,
    /// Seated participants in seat order
    pub players: Vec<PlayerView>,
}

/// A timer scheduled by a room's match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomTimer {
    /// Room the timer belongs to
    pub code: RoomCode,
    /// Match-level timer
    pub timer: MatchTimer,
}

/// Actions returned by rooms for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Deliver a message to a session.
    Send {
        /// Recipient
        session_id: SessionId,
        /// Message to deliver
        message: ServerMessage,
    },

    /// Fire a timer back into the registry.
    Schedule {
        /// Timer to fire
        timer: RoomTimer,
        /// Delay before firing
        after: Duration,
    },
}

impl RoomAction {
    /// Delivery to a session.
    pub fn send(session_id: SessionId, message: ServerMessage) -> Self {
        Self::Send { session_id, message }
    }
}

/// A two-seat lobby and its optional match.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    participants: Vec<Participant>,
    game: Option<Match>,
    created_at: Instant,
}

impl Room {
    /// Open a room with its creator seated.
    pub fn new(code: RoomCode, creator: Participant, created_at: Instant) -> Self {
        Self { code, participants: vec![creator], game: None, created_at }
    }

    /// Room code.
    pub fn code(&self) -> RoomCode {
        self.code
    }

    /// When the room was opened.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Seated participants in seat order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// True when both seats are taken.
    pub fn is_full(&self) -> bool {
        self.participants.len() >= SEATS
    }

    /// True when nobody is seated.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// The active match, if any.
    pub fn game(&self) -> Option<&Match> {
        self.game.as_ref()
    }

    /// Seat of a session.
    pub fn seat_of(&self, session_id: SessionId) -> Option<Seat> {
        match self.participants.iter().position(|p| p.session_id == session_id)? {
            0 => Some(Seat::First),
            1 => Some(Seat::Second),
            _ => None,
        }
    }

    /// Session seated at `seat`.
    pub fn session_at(&self, seat: Seat) -> Option<SessionId> {
        self.participants.get(seat.index()).map(|p| p.session_id)
    }

    /// Roster snapshot.
    pub fn view(&self) -> RoomView {
        RoomView { code: self.code, players: self.participants.iter().map(Participant::view).collect() }
    }

    /// Take the free seat.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::RoomFull` if both seats are taken and
    /// `RoomError::AlreadySeated` if the session already sits here.
    pub fn seat(&mut self, participant: Participant) -> Result<RoomView, RoomError> {
        if self.seat_of(participant.session_id).is_some() {
            return Err(RoomError::AlreadySeated(self.code));
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.code));
        }
        self.participants.push(participant);
        Ok(self.view())
    }

    /// Remove a session, tearing down any match.
    ///
    /// The remaining participant, if any, is told that their opponent left.
    /// Returns `None` if the session was not seated here.
    pub fn unseat(&mut self, session_id: SessionId) -> Option<Vec<RoomAction>> {
        let index = self.participants.iter().position(|p| p.session_id == session_id)?;
        let left = self.participants.remove(index);

        if let Some(game) = self.game.take() {
            tracing::info!(
                "room {}: match {} ended by {} leaving",
                self.code,
                game.id(),
                left.name
            );
        }

        Some(
            self.participants
                .iter()
                .map(|p| RoomAction::send(p.session_id, ServerMessage::PlayerLeft {}))
                .collect(),
        )
    }

    /// Deal a match.
    ///
    /// A no-op unless both seats are taken and no match is active.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        match_id: MatchId,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Vec<RoomAction> {
        if !self.is_full() || self.game.is_some() {
            tracing::debug!("room {}: start ignored", self.code);
            return Vec::new();
        }
        let game = Match::deal(match_id, catalog.clone(), rng);
        self.begin(game)
    }

    /// Install an already dealt match.
    ///
    /// Same guards as [`Room::start`]; used when the deal is fixed up front.
    pub fn begin(&mut self, game: Match) -> Vec<RoomAction> {
        if !self.is_full() || self.game.is_some() {
            return Vec::new();
        }

        let actions = Seat::BOTH
            .into_iter()
            .filter_map(|seat| {
                let session_id = self.session_at(seat)?;
                let opponent = self.participants.get(seat.opponent().index())?;
                Some(RoomAction::send(session_id, game.opening(seat, &opponent.name)))
            })
            .collect();

        tracing::info!(
            "room {}: match {} dealt {}/{}",
            self.code,
            game.id(),
            game.deck_len(Seat::First),
            game.deck_len(Seat::Second)
        );
        self.game = Some(game);
        actions
    }

    /// Forward a stat choice from a session to the match.
    pub fn select_stat(
        &mut self,
        session_id: SessionId,
        stat: String,
        config: &MatchConfig,
    ) -> Vec<RoomAction> {
        let Some(seat) = self.seat_of(session_id) else {
            return Vec::new();
        };
        let Some(game) = self.game.as_mut() else {
            tracing::debug!("room {}: stat choice without a match", self.code);
            return Vec::new();
        };
        let outputs = game.apply(MatchInput::ChooseStat { seat, stat }, config);
        self.route(outputs)
    }

    /// Deliver a fired timer.
    pub fn fire(&mut self, timer: MatchTimer, config: &MatchConfig) -> Vec<RoomAction> {
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        if game.id() != timer.match_id {
            return Vec::new();
        }

        if timer.kind == TimerKind::Conclude {
            if game.is_finished() {
                tracing::info!("room {}: match {} concluded", self.code, game.id());
                self.game = None;
            }
            return Vec::new();
        }

        let outputs = game.apply(MatchInput::Timer(timer), config);
        self.route(outputs)
    }

    fn route(&self, outputs: Vec<MatchOutput>) -> Vec<RoomAction> {
        outputs
            .into_iter()
            .filter_map(|output| match output {
                MatchOutput::Emit { seat, message } => {
                    Some(RoomAction::Send { session_id: self.session_at(seat)?, message })
                },
                MatchOutput::Schedule { timer, after } => {
                    Some(RoomAction::Schedule { timer: RoomTimer { code: self.code, timer }, after })
                },
            })
            .collect()
    }
}
