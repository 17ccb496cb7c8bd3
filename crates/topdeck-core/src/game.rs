//! Match engine.
//!
//! Turn and round state machine over the two decks of a full room.
//!
//! ## States
//!
//! ```text
//! deal ──► InRound ──choose──► Resolving ──announce──► Resolving ──open──► InRound
//!                        │
//!                        └──(deck emptied)──► Finished ──announce──► conclude
//! ```
//!
//! ## Design
//!
//! - Single entry point: every transition goes through [`Match::apply`], which
//!   commits the new state and returns the outbound emissions in one step
//! - Action-based: outputs are addressed by [`Seat`]; delayed work is a
//!   [`MatchTimer`] the driver feeds back, the engine never waits
//! - Guards are silent: inputs that are not legal in the current state return
//!   no outputs and change nothing
//!
//! ## Conservation
//!
//! A round removes exactly one card from the front of each deck and appends
//! exactly those two cards to deck tails. The total number of cards therefore
//! always equals the catalog size. The winner of a round (or either seat, on
//! a draw) always ends the round holding at least the cards it just won back,
//! so both decks can never be empty at once.

use std::{collections::VecDeque, time::Duration};

use rand::{Rng, seq::SliceRandom};
use topdeck_proto::{CatalogItem, RoundOutcome, ServerMessage};

use crate::{
    catalog::{AttributeId, CardId, Catalog},
    error::MatchError,
};

/// Unique id of a dealt match within a registry.
pub type MatchId = u64;

/// One of the two seats of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    /// First seated participant (the creator)
    First,
    /// Second seated participant
    Second,
}

impl Seat {
    /// Both seats, first seat first.
    pub const BOTH: [Self; 2] = [Self::First, Self::Second];

    /// Position in the room's participant list.
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// The other seat.
    pub fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Delivery delays.
///
/// The delays give the presentation layer time to animate the reveal. They
/// become timer delays, never awaited by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Delay between the reveal and the round result
    pub result_delay: Duration,
    /// Further delay between the round result and the next round
    pub next_round_delay: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            result_delay: Duration::from_millis(1000),
            next_round_delay: Duration::from_millis(2000),
        }
    }
}

/// Where the match is in its round cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the turn holder to pick an attribute.
    InRound,
    /// Round adjudicated, result and next round pending delivery.
    Resolving,
    /// A deck emptied.
    Finished {
        /// Seat holding every card
        winner: Seat,
    },
}

/// Timers a match schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Show the result of the given round.
    Announce {
        /// Round the timer belongs to
        round: u32,
    },
    /// Reopen play after the given round's result was shown.
    OpenRound {
        /// Round the timer belongs to
        round: u32,
    },
    /// Discard the finished match once its result was shown.
    Conclude,
}

/// A scheduled callback into a specific match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchTimer {
    /// Match that scheduled the timer
    pub match_id: MatchId,
    /// What to do when it fires
    pub kind: TimerKind,
}

/// Inputs accepted by [`Match::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchInput {
    /// A seat picks the attribute to compare.
    ChooseStat {
        /// Acting seat
        seat: Seat,
        /// Attribute name as sent by the participant
        stat: String,
    },
    /// A previously scheduled timer fired.
    Timer(MatchTimer),
}

/// Outputs produced by [`Match::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutput {
    /// Deliver a message to one seat.
    Emit {
        /// Recipient
        seat: Seat,
        /// Message to deliver
        message: ServerMessage,
    },
    /// Feed `timer` back into the match after `after`.
    Schedule {
        /// Timer to fire
        timer: MatchTimer,
        /// Delay relative to the transition
        after: Duration,
    },
}

/// Result of one adjudicated round, from the acting seat's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round {
    /// Seat that picked the attribute
    pub acting: Seat,
    /// Compared attribute
    pub attribute: AttributeId,
    /// Acting seat's card
    pub acting_card: CardId,
    /// Opponent's card
    pub opponent_card: CardId,
    /// Outcome for the acting seat
    pub outcome: RoundOutcome,
}

/// Compare two attribute values from the acting seat's point of view.
pub fn adjudicate(acting: i64, opponent: i64) -> RoundOutcome {
    match acting.cmp(&opponent) {
        std::cmp::Ordering::Greater => RoundOutcome::Win,
        std::cmp::Ordering::Less => RoundOutcome::Lose,
        std::cmp::Ordering::Equal => RoundOutcome::Draw,
    }
}

/// An active duel between the two seats of a room.
#[derive(Debug, Clone)]
pub struct Match {
    id: MatchId,
    catalog: Catalog,
    decks: [VecDeque<CardId>; 2],
    turn_holder: Seat,
    phase: Phase,
    round: u32,
    /// Last adjudicated round, until its result is announced
    pending: Option<Round>,
}

impl Match {
    /// Shuffle the catalog and deal it.
    ///
    /// Every permutation is equally likely (Fisher–Yates). The first seat
    /// gets `floor(n / 2)` cards, the second seat the rest, and the first
    /// seat holds the first turn.
    pub fn deal<R: Rng + ?Sized>(id: MatchId, catalog: Catalog, rng: &mut R) -> Self {
        let mut cards: Vec<CardId> = catalog.card_ids().collect();
        cards.shuffle(rng);
        let second = cards.split_off(cards.len() / 2);

        Self {
            id,
            catalog,
            decks: [cards.into(), second.into()],
            turn_holder: Seat::First,
            phase: Phase::InRound,
            round: 0,
            pending: None,
        }
    }

    /// Build a match from explicit decks, first seat to act.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::EmptyDeck` if either deck is empty and
    /// `MatchError::InvalidPartition` unless the decks hold every catalog card
    /// exactly once.
    pub fn with_decks(
        id: MatchId,
        catalog: Catalog,
        first: Vec<CardId>,
        second: Vec<CardId>,
    ) -> Result<Self, MatchError> {
        if first.is_empty() || second.is_empty() {
            return Err(MatchError::EmptyDeck);
        }

        let game = Self {
            id,
            catalog,
            decks: [first.into(), second.into()],
            turn_holder: Seat::First,
            phase: Phase::InRound,
            round: 0,
            pending: None,
        };
        if !game.is_partition() {
            return Err(MatchError::InvalidPartition);
        }
        Ok(game)
    }

    /// Match id.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Seat allowed to pick the next attribute.
    pub fn turn_holder(&self) -> Seat {
        self.turn_holder
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True from an accepted stat choice until the next round opens.
    pub fn round_in_progress(&self) -> bool {
        self.phase != Phase::InRound
    }

    /// True once a deck has emptied.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished { .. })
    }

    /// Number of rounds adjudicated so far.
    pub fn rounds_played(&self) -> u32 {
        self.round
    }

    /// Card ids of a seat's deck, front first.
    pub fn deck(&self, seat: Seat) -> impl ExactSizeIterator<Item = CardId> + '_ {
        self.decks[seat.index()].iter().copied()
    }

    /// Number of cards a seat holds.
    pub fn deck_len(&self, seat: Seat) -> usize {
        self.decks[seat.index()].len()
    }

    /// Cards of a seat's deck, front first.
    pub fn deck_cards(&self, seat: Seat) -> Vec<CatalogItem> {
        self.deck(seat).filter_map(|id| self.catalog.get(id).cloned()).collect()
    }

    /// Total number of cards in both decks.
    pub fn card_count(&self) -> usize {
        self.decks.iter().map(VecDeque::len).sum()
    }

    /// True if the decks together hold every catalog card exactly once.
    pub fn is_partition(&self) -> bool {
        let mut seen = vec![false; self.catalog.len()];
        for id in self.decks.iter().flatten() {
            match seen.get_mut(id.0) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Opening message for a seat.
    pub fn opening(&self, seat: Seat, opponent_name: &str) -> ServerMessage {
        ServerMessage::GameStarted {
            my_deck: self.deck_cards(seat),
            opponent_deck_length: self.deck_len(seat.opponent()),
            opponent_name: opponent_name.to_string(),
            is_my_turn: self.turn_holder == seat,
        }
    }

    /// Apply an input, committing the transition and returning its outputs.
    ///
    /// Returns no outputs, and changes nothing, for inputs that are not legal
    /// in the current state.
    pub fn apply(&mut self, input: MatchInput, config: &MatchConfig) -> Vec<MatchOutput> {
        match input {
            MatchInput::ChooseStat { seat, stat } => self.choose_stat(seat, &stat, config),
            MatchInput::Timer(timer) if timer.match_id == self.id => match timer.kind {
                TimerKind::Announce { round } => self.announce(round, config),
                TimerKind::OpenRound { round } => self.open_round(round),
                TimerKind::Conclude => Vec::new(),
            },
            MatchInput::Timer(timer) => {
                tracing::debug!("match {} ignoring timer of match {}", self.id, timer.match_id);
                Vec::new()
            },
        }
    }

    fn choose_stat(&mut self, seat: Seat, stat: &str, config: &MatchConfig) -> Vec<MatchOutput> {
        if seat != self.turn_holder {
            tracing::debug!("match {}: {:?} chose out of turn", self.id, seat);
            return Vec::new();
        }
        if self.round_in_progress() {
            tracing::debug!("match {}: choice while {:?}", self.id, self.phase);
            return Vec::new();
        }
        let Some(attribute) = self.catalog.attribute(stat) else {
            tracing::debug!("match {}: unknown attribute {:?}", self.id, stat);
            return Vec::new();
        };
        let Some(round) = self.resolve(seat, attribute) else {
            return Vec::new();
        };

        let mut outputs = self.reveal(&round);
        outputs.push(self.timer(TimerKind::Announce { round: self.round }, config.result_delay));
        self.pending = Some(round);
        outputs
    }

    fn announce(&mut self, round: u32, config: &MatchConfig) -> Vec<MatchOutput> {
        if round != self.round {
            tracing::debug!("match {}: stale announce timer for round {}", self.id, round);
            return Vec::new();
        }
        let Some(resolved) = self.pending.take() else {
            return Vec::new();
        };

        let mut outputs = self.results(&resolved);
        match self.phase {
            Phase::Finished { winner } => {
                tracing::info!("match {} finished after {} rounds", self.id, self.round);
                outputs.extend(Seat::BOTH.map(|seat| MatchOutput::Emit {
                    seat,
                    message: ServerMessage::GameOver { winner: seat == winner },
                }));
                outputs.push(self.timer(TimerKind::Conclude, Duration::ZERO));
            },
            Phase::Resolving => {
                let open = TimerKind::OpenRound { round: self.round };
                outputs.push(self.timer(open, config.next_round_delay));
            },
            Phase::InRound => {},
        }
        outputs
    }

    fn timer(&self, kind: TimerKind, after: Duration) -> MatchOutput {
        MatchOutput::Schedule { timer: MatchTimer { match_id: self.id, kind }, after }
    }

    /// Adjudicate a round and transfer the two front cards.
    ///
    /// Sets the phase before returning, so a second choice arriving before
    /// the next round opens is rejected by the phase guard.
    fn resolve(&mut self, acting: Seat, attribute: AttributeId) -> Option<Round> {
        let opponent = acting.opponent();
        let acting_card = *self.decks[acting.index()].front()?;
        let opponent_card = *self.decks[opponent.index()].front()?;
        let acting_value = self.catalog.value(acting_card, attribute)?;
        let opponent_value = self.catalog.value(opponent_card, attribute)?;

        self.decks[acting.index()].pop_front();
        self.decks[opponent.index()].pop_front();

        let outcome = adjudicate(acting_value, opponent_value);
        match outcome {
            RoundOutcome::Win => {
                let deck = &mut self.decks[acting.index()];
                deck.push_back(opponent_card);
                deck.push_back(acting_card);
            },
            RoundOutcome::Lose => {
                let deck = &mut self.decks[opponent.index()];
                deck.push_back(acting_card);
                deck.push_back(opponent_card);
                self.turn_holder = opponent;
            },
            RoundOutcome::Draw => {
                self.decks[acting.index()].push_back(acting_card);
                self.decks[opponent.index()].push_back(opponent_card);
            },
        }
        self.round += 1;

        debug_assert!(self.is_partition(), "round must conserve cards");

        self.phase = match Seat::BOTH.into_iter().find(|s| self.decks[s.index()].is_empty()) {
            Some(loser) => Phase::Finished { winner: loser.opponent() },
            None => Phase::Resolving,
        };

        tracing::info!(
            "match {} round {}: {:?} chose {:?}, {:?} ({} vs {})",
            self.id,
            self.round,
            acting,
            self.catalog.attribute_name(attribute).unwrap_or_default(),
            outcome,
            acting_value,
            opponent_value
        );

        Some(Round { acting, attribute, acting_card, opponent_card, outcome })
    }

    fn open_round(&mut self, round: u32) -> Vec<MatchOutput> {
        if self.phase != Phase::Resolving || round != self.round || self.pending.is_some() {
            tracing::debug!("match {}: stale open timer for round {}", self.id, round);
            return Vec::new();
        }
        self.phase = Phase::InRound;

        Seat::BOTH
            .into_iter()
            .filter_map(|seat| {
                let card = self.front_card(seat)?;
                Some(MatchOutput::Emit {
                    seat,
                    message: ServerMessage::NextRound {
                        my_card: card,
                        is_my_turn: self.turn_holder == seat,
                    },
                })
            })
            .collect()
    }

    fn reveal(&self, round: &Round) -> Vec<MatchOutput> {
        let stat = self.catalog.attribute_name(round.attribute).unwrap_or_default();
        self.framed(round, |my_card, opponent_card, _| ServerMessage::CardRevealed {
            my_card,
            opponent_card,
            selected_stat: stat.to_string(),
        })
        .into_iter()
        .map(|(seat, message)| MatchOutput::Emit { seat, message })
        .collect()
    }

    fn results(&self, round: &Round) -> Vec<MatchOutput> {
        self.framed(round, |my_card, opponent_card, seat| ServerMessage::RoundResult {
            result: if seat == round.acting { round.outcome } else { round.outcome.complement() },
            my_card,
            opponent_card,
            my_deck_count: self.deck_len(seat),
            opponent_deck_count: self.deck_len(seat.opponent()),
        })
        .into_iter()
        .map(|(seat, message)| MatchOutput::Emit { seat, message })
        .collect()
    }

    /// Build one message per seat, each framed from that seat's perspective.
    fn framed<F>(&self, round: &Round, build: F) -> Vec<(Seat, ServerMessage)>
    where
        F: Fn(CatalogItem, CatalogItem, Seat) -> ServerMessage,
    {
        let (Some(acting), Some(opponent)) =
            (self.catalog.get(round.acting_card), self.catalog.get(round.opponent_card))
        else {
            return Vec::new();
        };

        vec![
            (round.acting, build(acting.clone(), opponent.clone(), round.acting)),
            (
                round.acting.opponent(),
                build(opponent.clone(), acting.clone(), round.acting.opponent()),
            ),
        ]
    }

    fn front_card(&self, seat: Seat) -> Option<CatalogItem> {
        self.decks[seat.index()].front().and_then(|id| self.catalog.get(*id)).cloned()
    }
}
