//! Session registry tests

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use topdeck_core::{
    CardId, Catalog, MAX_CODE_ATTEMPTS, Match, MatchConfig, Participant, RoomAction, RoomCode,
    RoomError, RoomTimer, SessionRegistry, TimerKind, env::Environment,
};
use topdeck_proto::{Attribute, CatalogItem, ServerMessage};

// Seeded test environment, shared RNG so every call draws fresh bytes
#[derive(Clone)]
struct TestEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl TestEnv {
    fn seeded(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for TestEnv {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }
}

// Environment whose randomness never changes, so every code collides
#[derive(Clone)]
struct StuckEnv;

impl Environment for StuckEnv {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0);
    }
}

fn registry() -> SessionRegistry {
    SessionRegistry::new(Catalog::builtin().unwrap(), MatchConfig::default())
}

fn duel_catalog() -> Catalog {
    Catalog::new(vec![
        CatalogItem::new("Strong", "UK", vec![Attribute::new("power", 10)]),
        CatalogItem::new("Weak", "UK", vec![Attribute::new("power", 1)]),
    ])
    .unwrap()
}

fn messages_for(actions: &[RoomAction], session: u64) -> Vec<ServerMessage> {
    actions
        .iter()
        .filter_map(|a| match a {
            RoomAction::Send { session_id, message, .. } if *session_id == session => {
                Some(message.clone())
            },
            _ => None,
        })
        .collect()
}

fn timers(actions: &[RoomAction]) -> Vec<RoomTimer> {
    actions
        .iter()
        .filter_map(|a| match a {
            RoomAction::Schedule { timer, .. } => Some(*timer),
            RoomAction::Send { .. } => None,
        })
        .collect()
}

/// Registry with a full room: session 1 created it, session 2 joined.
fn full_room(env: &TestEnv) -> (SessionRegistry, RoomCode) {
    let mut registry = registry();
    let code = registry.create_room(Participant::new(1, "Ada"), env).unwrap().view.code;
    registry.join_room(code, Participant::new(2, "Bob")).unwrap();
    (registry, code)
}

#[test]
fn registry_new_has_no_rooms() {
    let registry = registry();
    assert_eq!(registry.room_count(), 0);
    assert_eq!(registry.room_of(1), None);
}

#[test]
fn create_room_seats_creator() {
    let env = TestEnv::seeded(1);
    let mut registry = registry();

    let seated = registry.create_room(Participant::new(1, "  Ada "), &env).unwrap();
    let code = seated.view.code;

    assert!(registry.has_room(code));
    assert_eq!(registry.room_of(1), Some(code));
    assert_eq!(seated.view.players.len(), 1);
    assert_eq!(seated.view.players[0].name, "Ada");
    assert_eq!(seated.view.players[0].id, "0000000000000001");
    assert!(seated.actions.is_empty());
    assert_eq!(code.as_str().len(), 6);
    assert!(code.as_str().bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
}

#[test]
fn create_multiple_rooms_have_distinct_codes() {
    let env = TestEnv::seeded(2);
    let mut registry = registry();

    let codes: Vec<RoomCode> = (0..50)
        .map(|i| registry.create_room(Participant::new(i, "p"), &env).unwrap().view.code)
        .collect();

    let mut unique = codes.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), codes.len());
    assert_eq!(registry.room_count(), 50);
}

#[test]
fn create_room_gives_up_when_codes_keep_colliding() {
    let mut registry = registry();
    registry.create_room(Participant::new(1, "Ada"), &StuckEnv).unwrap();

    let result = registry.create_room(Participant::new(2, "Bob"), &StuckEnv);
    assert_eq!(result, Err(RoomError::CodeSpaceExhausted { attempts: MAX_CODE_ATTEMPTS }));
    assert_eq!(registry.room_count(), 1);
    assert_eq!(registry.room_of(2), None);
}

#[test]
fn join_unknown_room_fails() {
    let mut registry = registry();
    let code = RoomCode::parse("ZZZZZZ").unwrap();

    let result = registry.join_room(code, Participant::new(2, "Bob"));
    assert_eq!(result, Err(RoomError::RoomNotFound(code)));
    assert_eq!(result.unwrap_err().client_message(), Some("Room not found"));
}

#[test]
fn join_room_returns_both_players_in_seat_order() {
    let env = TestEnv::seeded(3);
    let mut registry = registry();
    let code = registry.create_room(Participant::new(1, "Ada"), &env).unwrap().view.code;

    let seated = registry.join_room(code, Participant::new(2, "Bob")).unwrap();
    let names: Vec<&str> = seated.view.players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Bob"]);
    assert_eq!(registry.room_of(2), Some(code));
}

#[test]
fn join_full_room_fails_without_side_effects() {
    let env = TestEnv::seeded(4);
    let (mut registry, code) = full_room(&env);

    let result = registry.join_room(code, Participant::new(3, "Cy"));
    assert_eq!(result, Err(RoomError::RoomFull(code)));
    assert_eq!(registry.room_of(3), None);
    assert_eq!(registry.room(code).unwrap().participants().len(), 2);
}

#[test]
fn join_own_room_is_rejected_quietly() {
    let env = TestEnv::seeded(5);
    let mut registry = registry();
    let code = registry.create_room(Participant::new(1, "Ada"), &env).unwrap().view.code;

    let err = registry.join_room(code, Participant::new(1, "Ada")).unwrap_err();
    assert_eq!(err, RoomError::AlreadySeated(code));
    assert_eq!(err.client_message(), None);
    assert_eq!(registry.room(code).unwrap().participants().len(), 1);
}

#[test]
fn joining_elsewhere_leaves_previous_room() {
    let env = TestEnv::seeded(6);
    let (mut registry, first) = full_room(&env);
    let second = registry.create_room(Participant::new(3, "Cy"), &env).unwrap().view.code;

    let seated = registry.join_room(second, Participant::new(2, "Bob")).unwrap();

    assert_eq!(messages_for(&seated.actions, 1), vec![ServerMessage::PlayerLeft {}]);
    assert_eq!(registry.room_of(2), Some(second));
    assert_eq!(registry.room(first).unwrap().participants().len(), 1);
}

#[test]
fn failed_join_keeps_previous_seat() {
    let env = TestEnv::seeded(7);
    let (mut registry, code) = full_room(&env);
    let missing = RoomCode::parse("000000").unwrap();

    assert!(registry.join_room(missing, Participant::new(2, "Bob")).is_err());
    assert_eq!(registry.room_of(2), Some(code));
    assert!(registry.room(code).unwrap().is_full());
}

#[test]
fn create_while_seated_destroys_emptied_room() {
    let env = TestEnv::seeded(8);
    let mut registry = registry();
    let old = registry.create_room(Participant::new(1, "Ada"), &env).unwrap().view.code;

    let new = registry.create_room(Participant::new(1, "Ada"), &env).unwrap().view.code;

    assert_ne!(old, new);
    assert!(!registry.has_room(old));
    assert_eq!(registry.room_of(1), Some(new));
    assert_eq!(registry.room_count(), 1);
}

#[test]
fn leave_notifies_remaining_participant() {
    let env = TestEnv::seeded(9);
    let (mut registry, code) = full_room(&env);

    let actions = registry.leave(1);
    assert_eq!(messages_for(&actions, 2), vec![ServerMessage::PlayerLeft {}]);
    assert!(messages_for(&actions, 1).is_empty());
    assert_eq!(registry.room_of(1), None);
    assert!(registry.has_room(code));

    assert!(registry.leave(2).is_empty());
    assert!(!registry.has_room(code));
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn leave_unseated_session_is_noop() {
    let mut registry = registry();
    assert!(registry.leave(99).is_empty());
}

#[test]
fn start_requires_two_participants() {
    let env = TestEnv::seeded(10);
    let mut registry = registry();
    let code = registry.create_room(Participant::new(1, "Ada"), &env).unwrap().view.code;

    assert!(registry.start(1, &env).is_empty());
    assert!(registry.room(code).unwrap().game().is_none());
}

#[test]
fn start_deals_whole_catalog_and_announces_to_both() {
    let env = TestEnv::seeded(11);
    let (mut registry, code) = full_room(&env);

    let actions = registry.start(2, &env);

    let game = registry.room(code).unwrap().game().unwrap();
    assert_eq!(game.card_count(), 30);
    assert!(game.is_partition());

    let ServerMessage::GameStarted { my_deck, opponent_name, is_my_turn, .. } =
        &messages_for(&actions, 1)[0]
    else {
        panic!("creator must receive GameStarted");
    };
    assert_eq!(my_deck.len(), 15);
    assert_eq!(opponent_name, "Bob");
    assert!(*is_my_turn);

    let ServerMessage::GameStarted { opponent_name, is_my_turn, .. } =
        &messages_for(&actions, 2)[0]
    else {
        panic!("joiner must receive GameStarted");
    };
    assert_eq!(opponent_name, "Ada");
    assert!(!*is_my_turn);
}

#[test]
fn start_is_ignored_while_match_active() {
    let env = TestEnv::seeded(12);
    let (mut registry, _) = full_room(&env);

    assert!(!registry.start(1, &env).is_empty());
    assert!(registry.start(1, &env).is_empty());
}

#[test]
fn stat_choice_out_of_turn_is_ignored() {
    let env = TestEnv::seeded(13);
    let (mut registry, _) = full_room(&env);
    registry.start(1, &env);

    assert!(registry.select_stat(2, "Size".to_string()).is_empty());
    assert!(registry.select_stat(1, "Wingspan".to_string()).is_empty());
    assert!(!registry.select_stat(1, "Size".to_string()).is_empty());
}

#[test]
fn leaving_mid_match_tears_it_down() {
    let env = TestEnv::seeded(14);
    let (mut registry, code) = full_room(&env);
    registry.start(1, &env);
    let pending = timers(&registry.select_stat(1, "Cuteness".to_string()));

    let actions = registry.leave(2);
    assert_eq!(messages_for(&actions, 1), vec![ServerMessage::PlayerLeft {}]);
    assert!(registry.room(code).unwrap().game().is_none());

    // timers of the torn-down match go nowhere
    for timer in pending {
        assert!(registry.fire(timer).is_empty());
    }
}

#[test]
fn timers_for_missing_rooms_are_dropped() {
    let env = TestEnv::seeded(15);
    let (mut registry, code) = full_room(&env);
    registry.start(1, &env);
    let pending = timers(&registry.select_stat(1, "Size".to_string()));

    registry.leave(1);
    registry.leave(2);
    assert!(!registry.has_room(code));
    for timer in pending {
        assert!(registry.fire(timer).is_empty());
    }
}

#[test]
fn finished_match_concludes_and_allows_rematch() {
    let env = TestEnv::seeded(16);
    let mut registry = SessionRegistry::new(duel_catalog(), MatchConfig::default());
    let code = registry.create_room(Participant::new(1, "Ada"), &env).unwrap().view.code;
    registry.join_room(code, Participant::new(2, "Bob")).unwrap();

    let id = registry.allocate_match_id();
    let game = Match::with_decks(id, duel_catalog(), vec![CardId(0)], vec![CardId(1)]).unwrap();
    assert_eq!(messages_for(&registry.start_with(1, game), 1).len(), 1);

    let revealed = registry.select_stat(1, "power".to_string());
    assert!(registry.room(code).unwrap().game().unwrap().is_finished());

    // no rematch until the result was shown
    assert!(registry.start(1, &env).is_empty());

    let announce = timers(&revealed);
    assert_eq!(announce.len(), 1);
    let actions = registry.fire(announce[0]);
    assert!(messages_for(&actions, 1).contains(&ServerMessage::GameOver { winner: true }));
    assert!(messages_for(&actions, 2).contains(&ServerMessage::GameOver { winner: false }));

    let pending = timers(&actions);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].timer.kind, TimerKind::Conclude);
    assert!(registry.fire(pending[0]).is_empty());
    assert!(registry.room(code).unwrap().game().is_none());

    let rematch = registry.start(2, &env);
    assert_eq!(rematch.len(), 2);
    assert_ne!(registry.room(code).unwrap().game().unwrap().id(), id);
}

#[test]
fn result_of_an_abandoned_round_is_never_shown() {
    let env = TestEnv::seeded(18);
    let (mut registry, code) = full_room(&env);
    registry.start(1, &env);
    let announce = timers(&registry.select_stat(1, "Size".to_string()));

    registry.leave(2);
    registry.join_room(code, Participant::new(3, "Cy")).unwrap();
    registry.start(1, &env);

    for timer in announce {
        assert!(registry.fire(timer).is_empty());
    }
    assert!(!registry.room(code).unwrap().game().unwrap().round_in_progress());
}

#[test]
fn open_round_timer_reopens_play() {
    let env = TestEnv::seeded(17);
    let (mut registry, code) = full_room(&env);
    registry.start(1, &env);

    let actions = registry.select_stat(1, "Rarity".to_string());
    let game = registry.room(code).unwrap().game().unwrap();
    assert!(game.round_in_progress());

    let turn = match game.turn_holder() {
        topdeck_core::Seat::First => 1,
        topdeck_core::Seat::Second => 2,
    };

    // nobody may act until the round reopens
    assert!(registry.select_stat(turn, "Rarity".to_string()).is_empty());

    let announced: Vec<RoomAction> =
        timers(&actions).into_iter().flat_map(|t| registry.fire(t)).collect();
    assert!(registry.room(code).unwrap().game().unwrap().round_in_progress());

    let opened: Vec<RoomAction> =
        timers(&announced).into_iter().flat_map(|t| registry.fire(t)).collect();
    assert!(
        messages_for(&opened, 1)
            .iter()
            .any(|m| matches!(m, ServerMessage::NextRound { .. }))
    );
    assert!(!registry.room(code).unwrap().game().unwrap().round_in_progress());
    assert!(!registry.select_stat(turn, "Rarity".to_string()).is_empty());
}
