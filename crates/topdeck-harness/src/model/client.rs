//! Model participant.
//!
//! Tracks what one participant should believe, using nothing but the
//! messages it receives: the cards of its own deck in order, the opponent's
//! card count, whose turn it is and where the round cycle stands. Each
//! message is checked against those beliefs before they are updated.

use std::{cmp::Ordering, collections::VecDeque};

use topdeck_proto::{CatalogItem, PlayerView, RoundOutcome, ServerMessage};

use super::operation::ClientId;

/// Where a participant believes its match is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundPhase {
    /// No match (before the first deal, after `playerLeft` or a new room).
    Lobby,
    /// Waiting for the turn holder's choice.
    Choosing,
    /// Cards shown, result pending.
    Revealed {
        /// Compared attribute
        stat: String,
        /// Own card
        my_card: CatalogItem,
        /// Opponent's card
        opponent_card: CatalogItem,
    },
    /// Result shown, next round or game over pending.
    Resulted {
        /// Whether this participant holds the next turn
        my_turn_next: bool,
    },
    /// Match finished.
    Over,
}

/// A message that contradicts what its recipient was entitled to expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelViolation {
    /// Recipient
    pub client_id: ClientId,
    /// Event name of the offending message
    pub event: &'static str,
    /// What was wrong
    pub reason: String,
}

/// Model participant state.
#[derive(Debug, Clone)]
pub struct ModelClient {
    id: ClientId,
    room: Option<String>,
    players: Vec<PlayerView>,
    deck: VecDeque<String>,
    opponent_count: usize,
    total: usize,
    my_turn: bool,
    phase: RoundPhase,
}

impl ModelClient {
    /// A freshly connected participant.
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            room: None,
            players: Vec::new(),
            deck: VecDeque::new(),
            opponent_count: 0,
            total: 0,
            my_turn: false,
            phase: RoundPhase::Lobby,
        }
    }

    /// Participant slot.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Code of the room the participant believes it sits in.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Last roster seen.
    pub fn players(&self) -> &[PlayerView] {
        &self.players
    }

    /// Own card names, front first.
    pub fn deck(&self) -> impl Iterator<Item = &str> {
        self.deck.iter().map(String::as_str)
    }

    /// Believed opponent card count.
    pub fn opponent_count(&self) -> usize {
        self.opponent_count
    }

    /// Whether the participant believes it may choose now.
    pub fn may_choose(&self) -> bool {
        self.my_turn && self.phase == RoundPhase::Choosing
    }

    /// Round cycle position.
    pub fn phase(&self) -> &RoundPhase {
        &self.phase
    }

    /// Forget everything, as after a reconnect.
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    /// Check a received message and update beliefs.
    ///
    /// # Errors
    ///
    /// Returns a `ModelViolation` describing the first contradiction found.
    pub fn observe(&mut self, message: &ServerMessage) -> Result<(), ModelViolation> {
        let event = message.event_name();
        let client_id = self.id;
        let fail = move |reason: String| ModelViolation { client_id, event, reason };

        match message {
            ServerMessage::RoomCreated { code, players } => {
                if players.len() != 1 {
                    return Err(fail(format!("new room lists {} players", players.len())));
                }
                self.enter(code, players);
            },
            ServerMessage::RoomJoined { code, players } => {
                if players.len() != 2 {
                    return Err(fail(format!("joined room lists {} players", players.len())));
                }
                self.enter(code, players);
            },
            ServerMessage::PlayerJoined { code, players } => {
                if self.room.as_deref() != Some(code) {
                    return Err(fail(format!(
                        "join broadcast for {code}, sitting in {:?}",
                        self.room
                    )));
                }
                self.players.clone_from(players);
            },
            ServerMessage::Error { message } => {
                let known = ["Room not found", "Room is full", "Could not create room"];
                if !known.contains(&message.as_str()) {
                    return Err(fail(format!("unexpected error text {message:?}")));
                }
            },
            ServerMessage::GameStarted { my_deck, opponent_deck_length, is_my_turn, .. } => {
                if !matches!(self.phase, RoundPhase::Lobby | RoundPhase::Over) {
                    return Err(fail(format!("deal during {:?}", self.phase)));
                }
                if self.room.is_none() || my_deck.is_empty() || *opponent_deck_length == 0 {
                    return Err(fail("deal without a room or with an empty deck".to_string()));
                }
                self.deck = my_deck.iter().map(|c| c.name.clone()).collect();
                self.opponent_count = *opponent_deck_length;
                self.total = self.deck.len() + self.opponent_count;
                self.my_turn = *is_my_turn;
                self.phase = RoundPhase::Choosing;
            },
            ServerMessage::CardRevealed { my_card, opponent_card, selected_stat } => {
                if self.phase != RoundPhase::Choosing {
                    return Err(fail(format!("reveal during {:?}", self.phase)));
                }
                if self.deck.front() != Some(&my_card.name) {
                    return Err(fail(format!(
                        "revealed {} but front card is {:?}",
                        my_card.name,
                        self.deck.front()
                    )));
                }
                if my_card.value(selected_stat).is_none()
                    || opponent_card.value(selected_stat).is_none()
                {
                    return Err(fail(format!("unknown attribute {selected_stat:?} revealed")));
                }
                self.phase = RoundPhase::Revealed {
                    stat: selected_stat.clone(),
                    my_card: my_card.clone(),
                    opponent_card: opponent_card.clone(),
                };
            },
            ServerMessage::RoundResult {
                result,
                my_card,
                opponent_card,
                my_deck_count,
                opponent_deck_count,
            } => {
                let RoundPhase::Revealed { stat, my_card: shown, opponent_card: shown_opp } =
                    &self.phase
                else {
                    return Err(fail(format!("result during {:?}", self.phase)));
                };
                if shown != my_card || shown_opp != opponent_card {
                    return Err(fail("result cards differ from the reveal".to_string()));
                }

                let mine = my_card.value(stat).unwrap_or_default();
                let theirs = opponent_card.value(stat).unwrap_or_default();
                let expected = match mine.cmp(&theirs) {
                    Ordering::Greater => RoundOutcome::Win,
                    Ordering::Less => RoundOutcome::Lose,
                    Ordering::Equal => RoundOutcome::Draw,
                };
                if *result != expected {
                    return Err(fail(format!("{mine} vs {theirs} reported as {result:?}")));
                }

                self.deck.pop_front();
                self.opponent_count = self.opponent_count.saturating_sub(1);
                match result {
                    RoundOutcome::Win => {
                        self.deck.push_back(opponent_card.name.clone());
                        self.deck.push_back(my_card.name.clone());
                    },
                    RoundOutcome::Lose => self.opponent_count += 2,
                    RoundOutcome::Draw => {
                        self.deck.push_back(my_card.name.clone());
                        self.opponent_count += 1;
                    },
                }

                if (*my_deck_count, *opponent_deck_count) != (self.deck.len(), self.opponent_count)
                {
                    return Err(fail(format!(
                        "counts {my_deck_count}/{opponent_deck_count}, expected {}/{}",
                        self.deck.len(),
                        self.opponent_count
                    )));
                }
                if my_deck_count + opponent_deck_count != self.total {
                    return Err(fail(format!("cards not conserved, total {}", self.total)));
                }

                // the acting seat keeps the turn unless it lost
                let my_turn_next = if self.my_turn {
                    *result != RoundOutcome::Lose
                } else {
                    *result == RoundOutcome::Win
                };
                self.phase = RoundPhase::Resulted { my_turn_next };
            },
            ServerMessage::GameOver { winner } => {
                if !matches!(self.phase, RoundPhase::Resulted { .. }) {
                    return Err(fail(format!("game over during {:?}", self.phase)));
                }
                let decided = self.deck.is_empty() || self.opponent_count == 0;
                if !decided || *winner != (self.opponent_count == 0) {
                    return Err(fail(format!(
                        "winner={winner} with {}/{} cards",
                        self.deck.len(),
                        self.opponent_count
                    )));
                }
                self.phase = RoundPhase::Over;
            },
            ServerMessage::NextRound { my_card, is_my_turn } => {
                let RoundPhase::Resulted { my_turn_next } = self.phase else {
                    return Err(fail(format!("next round during {:?}", self.phase)));
                };
                if self.deck.is_empty() || self.opponent_count == 0 {
                    return Err(fail("next round after a deck emptied".to_string()));
                }
                if *is_my_turn != my_turn_next {
                    return Err(fail(format!("turn {is_my_turn}, expected {my_turn_next}")));
                }
                if self.deck.front() != Some(&my_card.name) {
                    return Err(fail(format!("next card {} is not the front card", my_card.name)));
                }
                self.my_turn = *is_my_turn;
                self.phase = RoundPhase::Choosing;
            },
            ServerMessage::PlayerLeft {} => {
                if self.room.is_none() {
                    return Err(fail("opponent left while not in a room".to_string()));
                }
                self.players.truncate(1);
                self.end_match();
            },
        }
        Ok(())
    }

    fn enter(&mut self, code: &str, players: &[PlayerView]) {
        self.room = Some(code.to_string());
        self.players = players.to_vec();
        self.end_match();
    }

    fn end_match(&mut self) {
        self.deck.clear();
        self.opponent_count = 0;
        self.total = 0;
        self.my_turn = false;
        self.phase = RoundPhase::Lobby;
    }
}

#[cfg(test)]
mod tests {
    use topdeck_proto::Attribute;

    use super::*;

    fn card(name: &str, power: i64) -> CatalogItem {
        CatalogItem::new(name, "UK", vec![Attribute::new("power", power)])
    }

    fn seated() -> ModelClient {
        let mut client = ModelClient::new(0);
        let players = vec![PlayerView { id: "1".to_string(), name: "Ada".to_string() }];
        client.observe(&ServerMessage::RoomCreated { code: "ABC123".to_string(), players }).unwrap();
        client
            .observe(&ServerMessage::GameStarted {
                my_deck: vec![card("A", 10), card("B", 5)],
                opponent_deck_length: 2,
                opponent_name: "Bob".to_string(),
                is_my_turn: true,
            })
            .unwrap();
        client
    }

    #[test]
    fn tracks_a_won_round() {
        let mut client = seated();
        client
            .observe(&ServerMessage::CardRevealed {
                my_card: card("A", 10),
                opponent_card: card("C", 8),
                selected_stat: "power".to_string(),
            })
            .unwrap();
        client
            .observe(&ServerMessage::RoundResult {
                result: RoundOutcome::Win,
                my_card: card("A", 10),
                opponent_card: card("C", 8),
                my_deck_count: 3,
                opponent_deck_count: 1,
            })
            .unwrap();

        assert_eq!(client.deck().collect::<Vec<_>>(), vec!["B", "C", "A"]);
        assert_eq!(client.phase(), &RoundPhase::Resulted { my_turn_next: true });
    }

    #[test]
    fn rejects_wrong_outcome() {
        let mut client = seated();
        client
            .observe(&ServerMessage::CardRevealed {
                my_card: card("A", 10),
                opponent_card: card("C", 8),
                selected_stat: "power".to_string(),
            })
            .unwrap();
        let err = client
            .observe(&ServerMessage::RoundResult {
                result: RoundOutcome::Draw,
                my_card: card("A", 10),
                opponent_card: card("C", 8),
                my_deck_count: 2,
                opponent_deck_count: 2,
            })
            .unwrap_err();
        assert_eq!(err.event, "roundResult");
    }

    #[test]
    fn rejects_reveal_of_a_card_not_in_front() {
        let mut client = seated();
        let err = client
            .observe(&ServerMessage::CardRevealed {
                my_card: card("B", 5),
                opponent_card: card("C", 8),
                selected_stat: "power".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.event, "cardRevealed");
    }

    #[test]
    fn player_left_returns_to_lobby() {
        let mut client = seated();
        client.observe(&ServerMessage::PlayerLeft {}).unwrap();
        assert_eq!(client.phase(), &RoundPhase::Lobby);
        assert_eq!(client.room(), Some("ABC123"));
        assert!(!client.may_choose());
    }
}
