//! Simulated server world.
//!
//! Drives a real `ServerDriver` and plays the part of the runtime: sends land
//! in per-connection inboxes, timers go into a virtual queue released by
//! [`SimWorld::advance`].

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use topdeck_core::{Catalog, CatalogError, RoomTimer, SessionId};
use topdeck_proto::{ClientMessage, ServerMessage};
use topdeck_server::{DriverConfig, DriverError, ServerAction, ServerDriver, ServerEvent};

use crate::sim_env::SimEnv;

/// A message as it arrived at a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Virtual time of arrival
    pub at: Duration,
    /// Message
    pub message: ServerMessage,
}

/// Real driver plus a virtual scheduler.
#[derive(Debug)]
pub struct SimWorld {
    env: SimEnv,
    driver: ServerDriver<SimEnv>,
    /// Pending timers keyed by (due time, insertion order)
    queue: BTreeMap<(Duration, u64), RoomTimer>,
    next_seq: u64,
    /// Messages of open connections, oldest first
    inboxes: HashMap<SessionId, Vec<Delivered>>,
}

impl SimWorld {
    /// World over the built-in catalog with default delays.
    pub fn new(seed: u64) -> Result<Self, CatalogError> {
        Ok(Self::with_catalog(seed, Catalog::builtin()?, DriverConfig::default()))
    }

    /// World over a given catalog and configuration.
    pub fn with_catalog(seed: u64, catalog: Catalog, config: DriverConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let driver = ServerDriver::new(env.clone(), catalog, config);
        Self { env, driver, queue: BTreeMap::new(), next_seq: 0, inboxes: HashMap::new() }
    }

    /// The driver under test.
    pub fn driver(&self) -> &ServerDriver<SimEnv> {
        &self.driver
    }

    /// Virtual time.
    pub fn now(&self) -> Duration {
        self.env.elapsed()
    }

    /// Number of queued timers.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Open a connection.
    pub fn connect(&mut self, conn_id: SessionId) -> Result<(), DriverError> {
        let actions = self.driver.process_event(ServerEvent::ConnectionAccepted { conn_id })?;
        self.inboxes.insert(conn_id, Vec::new());
        self.execute(actions);
        Ok(())
    }

    /// Deliver a client message.
    pub fn send(&mut self, conn_id: SessionId, message: ClientMessage) -> Result<(), DriverError> {
        let actions =
            self.driver.process_event(ServerEvent::MessageReceived { conn_id, message })?;
        self.execute(actions);
        Ok(())
    }

    /// Close a connection. Its inbox is discarded.
    pub fn disconnect(&mut self, conn_id: SessionId) {
        self.inboxes.remove(&conn_id);
        let event = ServerEvent::ConnectionClosed { conn_id, reason: "closed".to_string() };
        if let Ok(actions) = self.driver.process_event(event) {
            self.execute(actions);
        }
    }

    /// Advance virtual time, releasing everything due on the way in order.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        while let Some(entry) = self.queue.first_entry() {
            let (due, _) = *entry.key();
            if due > target {
                break;
            }
            let timer = entry.remove();
            self.env.advance_to(due);
            if let Ok(actions) = self.driver.process_event(ServerEvent::TimerFired(timer)) {
                self.execute(actions);
            }
        }
        self.env.advance_to(target);
    }

    /// Advance until the queue is empty.
    pub fn settle(&mut self) {
        while let Some((&(due, _), _)) = self.queue.first_key_value() {
            let by = due.saturating_sub(self.now());
            self.advance(by);
        }
    }

    /// Messages received by a connection so far.
    pub fn inbox(&self, conn_id: SessionId) -> &[Delivered] {
        self.inboxes.get(&conn_id).map_or(&[], Vec::as_slice)
    }

    /// Drain a connection's inbox.
    pub fn take_inbox(&mut self, conn_id: SessionId) -> Vec<Delivered> {
        self.inboxes.get_mut(&conn_id).map(std::mem::take).unwrap_or_default()
    }

    fn execute(&mut self, actions: Vec<ServerAction>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, message } => {
                    self.deliver(session_id, message);
                },
                ServerAction::ScheduleTimer { timer, after } => {
                    let due = self.now() + after;
                    self.queue.insert((due, self.next_seq), timer);
                    self.next_seq += 1;
                },
                ServerAction::Log { .. } => {},
            }
        }
    }

    fn deliver(&mut self, session_id: SessionId, message: ServerMessage) {
        let at = self.now();
        // closed connections drop their mail
        if let Some(inbox) = self.inboxes.get_mut(&session_id) {
            inbox.push(Delivered { at, message });
        }
    }
}
