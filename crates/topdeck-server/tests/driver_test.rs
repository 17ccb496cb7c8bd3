//! Server driver tests

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use topdeck_core::{Catalog, MatchConfig, RoomCode, RoomTimer, SessionId, env::Environment};
use topdeck_proto::{ClientMessage, ServerMessage};
use topdeck_server::{DriverConfig, DriverError, LogLevel, ServerAction, ServerDriver, ServerEvent};

// Seeded test environment
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

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async move {
            tokio::time::sleep(duration).await;
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }
}

const ADA: SessionId = 1;
const BOB: SessionId = 2;
const CY: SessionId = 3;

fn driver_with(config: DriverConfig) -> ServerDriver<TestEnv> {
    let mut driver = ServerDriver::new(TestEnv::seeded(42), Catalog::builtin().unwrap(), config);
    for conn_id in [ADA, BOB, CY] {
        driver.process_event(ServerEvent::ConnectionAccepted { conn_id }).unwrap();
    }
    driver
}

fn driver() -> ServerDriver<TestEnv> {
    driver_with(DriverConfig::default())
}

fn send(
    driver: &mut ServerDriver<TestEnv>,
    conn_id: SessionId,
    message: ClientMessage,
) -> Vec<ServerAction> {
    driver.process_event(ServerEvent::MessageReceived { conn_id, message }).unwrap()
}

fn sends(actions: &[ServerAction]) -> Vec<(SessionId, ServerMessage)> {
    actions
        .iter()
        .filter_map(|a| match a {
            ServerAction::SendToSession { session_id, message } => {
                Some((*session_id, message.clone()))
            },
            _ => None,
        })
        .collect()
}

fn messages_to(actions: &[ServerAction], session: SessionId) -> Vec<ServerMessage> {
    sends(actions).into_iter().filter(|(s, _)| *s == session).map(|(_, m)| m).collect()
}

fn timers(actions: &[ServerAction]) -> Vec<(RoomTimer, Duration)> {
    actions
        .iter()
        .filter_map(|a| match a {
            ServerAction::ScheduleTimer { timer, after } => Some((*timer, *after)),
            _ => None,
        })
        .collect()
}

fn create(driver: &mut ServerDriver<TestEnv>, conn_id: SessionId, name: &str) -> String {
    let actions =
        send(driver, conn_id, ClientMessage::CreateRoom { player_name: name.to_string() });
    match messages_to(&actions, conn_id).pop() {
        Some(ServerMessage::RoomCreated { code, .. }) => code,
        other => panic!("expected roomCreated, got {other:?}"),
    }
}

fn join(
    driver: &mut ServerDriver<TestEnv>,
    conn_id: SessionId,
    name: &str,
    code: &str,
) -> Vec<ServerAction> {
    send(
        driver,
        conn_id,
        ClientMessage::JoinRoom { player_name: name.to_string(), room_code: code.to_string() },
    )
}

fn error_text(actions: &[ServerAction], session: SessionId) -> Option<String> {
    messages_to(actions, session).into_iter().find_map(|m| match m {
        ServerMessage::Error { message } => Some(message),
        _ => None,
    })
}

#[test]
fn accept_rejects_duplicate_connection() {
    let mut driver = driver();
    let result = driver.process_event(ServerEvent::ConnectionAccepted { conn_id: ADA });
    assert_eq!(result, Err(DriverError::DuplicateConnection(ADA)));
    assert_eq!(driver.session_count(), 3);
}

#[test]
fn accept_enforces_connection_limit() {
    let mut driver = driver_with(DriverConfig { max_connections: 3, ..Default::default() });
    let result = driver.process_event(ServerEvent::ConnectionAccepted { conn_id: 4 });
    assert_eq!(result, Err(DriverError::ConnectionLimit { max: 3 }));

    driver
        .process_event(ServerEvent::ConnectionClosed { conn_id: CY, reason: "bye".to_string() })
        .unwrap();
    assert!(driver.process_event(ServerEvent::ConnectionAccepted { conn_id: 4 }).is_ok());
}

#[test]
fn message_from_unknown_connection_is_an_error() {
    let mut driver = driver();
    let result = driver.process_event(ServerEvent::MessageReceived {
        conn_id: 99,
        message: ClientMessage::StartGame {},
    });
    assert_eq!(result, Err(DriverError::UnknownConnection(99)));
}

#[test]
fn create_room_acknowledges_creator() {
    let mut driver = driver();
    let actions =
        send(&mut driver, ADA, ClientMessage::CreateRoom { player_name: " Ada ".to_string() });

    let sent = sends(&actions);
    let [(to, ServerMessage::RoomCreated { code, players })] = &sent[..] else {
        panic!("expected a single roomCreated: {actions:?}");
    };
    assert_eq!(*to, ADA);
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].name, "Ada");

    let code = RoomCode::parse(code).unwrap();
    assert_eq!(driver.rooms().room_of(ADA), Some(code));
    assert_eq!(driver.connections().get(ADA).unwrap().room, Some(code));
    assert_eq!(driver.connections().get(ADA).unwrap().player_name.as_deref(), Some("Ada"));
}

#[test]
fn join_acknowledges_joiner_then_broadcasts_to_everyone() {
    let mut driver = driver();
    let code = create(&mut driver, ADA, "Ada");

    let actions = join(&mut driver, BOB, "Bob", &code);
    let sent = sends(&actions);

    assert_eq!(sent.len(), 3);
    assert!(matches!(&sent[0], (BOB, ServerMessage::RoomJoined { .. })));
    let recipients: Vec<SessionId> = sent[1..].iter().map(|(s, _)| *s).collect();
    assert_eq!(recipients, vec![ADA, BOB]);

    for (_, message) in &sent[1..] {
        let ServerMessage::PlayerJoined { code: joined, players } = message else {
            panic!("expected playerJoined, got {message:?}");
        };
        assert_eq!(joined, &code);
        let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);
    }

    let room = RoomCode::parse(&code).unwrap();
    let mut seated: Vec<SessionId> = driver.sessions_in_room(room).collect();
    seated.sort_unstable();
    assert_eq!(seated, vec![ADA, BOB]);
}

#[test]
fn join_normalises_the_code() {
    let mut driver = driver();
    let code = create(&mut driver, ADA, "Ada");

    let actions = join(&mut driver, BOB, "Bob", &format!("  {}  ", code.to_lowercase()));
    assert!(matches!(messages_to(&actions, BOB)[0], ServerMessage::RoomJoined { .. }));
}

#[test]
fn join_unknown_or_malformed_code_reports_not_found() {
    let mut driver = driver();

    let actions = join(&mut driver, BOB, "Bob", "ZZZZZZ");
    assert_eq!(error_text(&actions, BOB).as_deref(), Some("Room not found"));

    let actions = join(&mut driver, BOB, "Bob", "not-a-code");
    assert_eq!(error_text(&actions, BOB).as_deref(), Some("Room not found"));
    assert!(
        actions
            .iter()
            .any(|a| matches!(a, ServerAction::Log { level: LogLevel::Warn, .. }))
    );
}

#[test]
fn third_join_reports_room_full() {
    let mut driver = driver();
    let code = create(&mut driver, ADA, "Ada");
    join(&mut driver, BOB, "Bob", &code);

    let actions = join(&mut driver, CY, "Cy", &code);
    assert_eq!(error_text(&actions, CY).as_deref(), Some("Room is full"));
    assert!(messages_to(&actions, ADA).is_empty());
    assert_eq!(driver.rooms().room_of(CY), None);
}

#[test]
fn start_requires_a_full_room() {
    let mut driver = driver();
    create(&mut driver, ADA, "Ada");
    assert!(sends(&send(&mut driver, ADA, ClientMessage::StartGame {})).is_empty());
}

#[test]
fn round_cycle_runs_on_timers() {
    let mut driver = driver();
    let code = create(&mut driver, ADA, "Ada");
    join(&mut driver, BOB, "Bob", &code);

    let started = send(&mut driver, BOB, ClientMessage::StartGame {});
    assert_eq!(sends(&started).len(), 2);

    let revealed = send(&mut driver, ADA, ClientMessage::SelectStat { stat: "Size".to_string() });
    let sent = sends(&revealed);
    let config = MatchConfig::default();

    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0], (ADA, ServerMessage::CardRevealed { .. })));
    assert!(matches!(sent[1], (BOB, ServerMessage::CardRevealed { .. })));

    let pending = timers(&revealed);
    let [(announce, after)] = pending[..] else {
        panic!("expected one timer: {revealed:?}");
    };
    assert_eq!(after, config.result_delay);

    let announced = driver.process_event(ServerEvent::TimerFired(announce)).unwrap();
    for session in [ADA, BOB] {
        assert!(matches!(messages_to(&announced, session)[0], ServerMessage::RoundResult { .. }));
    }

    let pending = timers(&announced);
    let [(open, after)] = pending[..] else {
        panic!("expected one timer: {announced:?}");
    };
    assert_eq!(after, config.next_round_delay);

    let next = driver.process_event(ServerEvent::TimerFired(open)).unwrap();
    for session in [ADA, BOB] {
        assert!(matches!(messages_to(&next, session)[0], ServerMessage::NextRound { .. }));
    }
}

#[test]
fn result_is_not_shown_after_the_opponent_left() {
    let mut driver = driver();
    let code = create(&mut driver, ADA, "Ada");
    join(&mut driver, BOB, "Bob", &code);
    send(&mut driver, BOB, ClientMessage::StartGame {});

    let revealed = send(&mut driver, ADA, ClientMessage::SelectStat { stat: "Size".to_string() });
    driver
        .process_event(ServerEvent::ConnectionClosed { conn_id: BOB, reason: "gone".to_string() })
        .unwrap();

    for (timer, _) in timers(&revealed) {
        assert!(sends(&driver.process_event(ServerEvent::TimerFired(timer)).unwrap()).is_empty());
    }
}

#[test]
fn disconnect_mid_match_notifies_peer() {
    let mut driver = driver();
    let code = create(&mut driver, ADA, "Ada");
    join(&mut driver, BOB, "Bob", &code);
    send(&mut driver, ADA, ClientMessage::StartGame {});

    let actions = driver
        .process_event(ServerEvent::ConnectionClosed { conn_id: BOB, reason: "gone".to_string() })
        .unwrap();
    assert_eq!(messages_to(&actions, ADA), vec![ServerMessage::PlayerLeft {}]);

    let room = RoomCode::parse(&code).unwrap();
    assert!(driver.rooms().room(room).unwrap().game().is_none());
    assert!(driver.connections().get(BOB).is_none());

    driver
        .process_event(ServerEvent::ConnectionClosed { conn_id: ADA, reason: "gone".to_string() })
        .unwrap();
    assert!(!driver.rooms().has_room(room));
}

#[test]
fn closing_twice_is_harmless() {
    let mut driver = driver();
    let close = || ServerEvent::ConnectionClosed { conn_id: ADA, reason: "gone".to_string() };
    assert!(!driver.process_event(close()).unwrap().is_empty());
    assert!(driver.process_event(close()).unwrap().is_empty());
}

#[test]
fn creating_again_moves_the_creator() {
    let mut driver = driver();
    let first = create(&mut driver, ADA, "Ada");
    join(&mut driver, BOB, "Bob", &first);

    let actions =
        send(&mut driver, ADA, ClientMessage::CreateRoom { player_name: "Ada".to_string() });
    assert_eq!(messages_to(&actions, BOB), vec![ServerMessage::PlayerLeft {}]);
    assert!(matches!(messages_to(&actions, ADA)[0], ServerMessage::RoomCreated { .. }));

    let first = RoomCode::parse(&first).unwrap();
    assert_eq!(driver.rooms().room(first).unwrap().participants().len(), 1);
    assert_ne!(driver.connections().get(ADA).unwrap().room, Some(first));
}
