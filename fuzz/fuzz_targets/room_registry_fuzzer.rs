//! Fuzz target for the room and match lifecycle
//!
//! Drives the real driver through the simulated world with arbitrary
//! participant operations, and checks every delivered message against the
//! recipient's model.
//!
//! # Invariants
//!
//! - Every message agrees with what its recipient was entitled to expect
//! - A participant sits in the room it believes it sits in
//! - Every active match holds the whole catalog, each card exactly once
//! - A room never holds more than two participants
//! - NEVER panic on any operation sequence

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use topdeck_core::SessionId;
use topdeck_harness::{ClientId, ModelWorld, Operation, SimWorld};
use topdeck_proto::ClientMessage;

const SLOTS: u8 = 3;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    ops: Vec<Operation>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(mut sim) = SimWorld::new(input.seed) else {
        return;
    };
    let mut model = ModelWorld::new(SLOTS);
    let stats: Vec<String> = sim.driver().rooms().catalog().attributes().to_vec();
    let total = sim.driver().rooms().catalog().len();

    let mut conns: Vec<SessionId> = (1..=SessionId::from(SLOTS)).collect();
    let mut next_conn = conns.len() as SessionId + 1;
    for conn in &conns {
        sim.connect(*conn).expect("fresh connection must be accepted");
    }

    for op in input.ops.iter().take(256) {
        let slot = op.client().map(|c| usize::from(c % SLOTS));
        let conn = slot.map(|s| conns[s]);

        match (op, conn) {
            (Operation::Reconnect { .. }, Some(conn)) => {
                let slot = conns.iter().position(|c| *c == conn).unwrap_or_default();
                sim.disconnect(conn);
                model.reset(slot as ClientId);
                conns[slot] = next_conn;
                next_conn += 1;
                sim.connect(conns[slot]).expect("fresh connection must be accepted");
            },
            (Operation::CreateRoom { .. }, Some(conn)) => {
                let message = ClientMessage::CreateRoom { player_name: format!("p{conn}") };
                sim.send(conn, message).expect("open connection");
            },
            (Operation::JoinRoom { target, bogus, .. }, Some(conn)) => {
                let room_code = if *bogus {
                    "?".to_string()
                } else {
                    model
                        .client(target % SLOTS)
                        .and_then(|c| c.room())
                        .unwrap_or("AAAAAA")
                        .to_string()
                };
                let message = ClientMessage::JoinRoom { player_name: format!("p{conn}"), room_code };
                sim.send(conn, message).expect("open connection");
            },
            (Operation::StartGame { .. }, Some(conn)) => {
                sim.send(conn, ClientMessage::StartGame {}).expect("open connection");
            },
            (Operation::SelectStat { stat, .. }, Some(conn)) => {
                let stat = stats
                    .get(usize::from(*stat) % (stats.len() + 1))
                    .cloned()
                    .unwrap_or_else(|| "Wingspan".to_string());
                sim.send(conn, ClientMessage::SelectStat { stat }).expect("open connection");
            },
            (Operation::AdvanceTime { millis }, _) => {
                sim.advance(Duration::from_millis(u64::from(*millis)));
            },
            (Operation::Settle, _) => sim.settle(),
            _ => {},
        }

        for (slot, conn) in conns.iter().enumerate() {
            for delivered in sim.take_inbox(*conn) {
                if let Err(violation) = model.observe(slot as ClientId, &delivered.message) {
                    panic!("{violation:?} after {op:?}");
                }
            }
        }

        let rooms = sim.driver().rooms();
        for (slot, conn) in conns.iter().enumerate() {
            let actual = rooms.room_of(*conn).map(|code| code.to_string());
            let believed = model.client(slot as ClientId).and_then(|c| c.room());
            assert_eq!(actual.as_deref(), believed, "slot {slot} after {op:?}");

            if let Some(room) = rooms.room_of(*conn).and_then(|code| rooms.room(code)) {
                assert!(room.participants().len() <= 2);
                if let Some(game) = room.game() {
                    assert_eq!(game.card_count(), total);
                    assert!(game.is_partition());
                }
            }
        }
    }
});
