//! Sans-IO server driver.
//!
//! The driver turns transport events into actions. It owns the session
//! registry and the connection table, and never touches a socket or a clock
//! itself: the runtime (or the simulation harness) feeds it events and
//! executes what it returns.
//!
//! ```text
//! ServerEvent ──► ServerDriver::process_event ──► Vec<ServerAction>
//!                    │                               │
//!                    ├─ ConnectionRegistry           ├─ SendToSession
//!                    └─ SessionRegistry              ├─ ScheduleTimer
//!                                                    └─ Log
//! ```
//!
//! # Ordering
//!
//! Actions are returned in delivery order. Sends must reach each connection
//! in the order they appear. Everything that happens later is a timer.

use std::time::Duration;

use topdeck_core::{
    Catalog, MatchConfig, Participant, RoomAction, RoomCode, RoomError, RoomTimer, Seated,
    SessionId, SessionRegistry, env::Environment,
};
use topdeck_proto::{ClientMessage, ServerMessage};

use crate::{
    registry::{ConnectionRegistry, SessionInfo},
    server_error::DriverError,
};

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Connections beyond this are refused on accept
    pub max_connections: usize,
    /// Delivery delays of every match
    pub game: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000, game: MatchConfig::default() }
    }
}

/// Events fed into the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A transport accepted a new connection.
    ConnectionAccepted {
        /// Id chosen by the transport
        conn_id: SessionId,
    },

    /// A connection delivered a decoded message.
    MessageReceived {
        /// Sending connection
        conn_id: SessionId,
        /// Decoded message
        message: ClientMessage,
    },

    /// A connection went away.
    ConnectionClosed {
        /// Closed connection
        conn_id: SessionId,
        /// Human-readable cause
        reason: String,
    },

    /// A timer scheduled by an earlier `ScheduleTimer` fired.
    TimerFired(RoomTimer),
}

/// Log severity of a [`ServerAction::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Ignored protocol violations
    Debug,
    /// Lifecycle events
    Info,
    /// Rejected inputs and refused connections
    Warn,
    /// Failed operations
    Error,
}

/// Actions for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Deliver a message to one connection.
    SendToSession {
        /// Recipient
        session_id: SessionId,
        /// Message to deliver
        message: ServerMessage,
    },

    /// Feed a timer back as [`ServerEvent::TimerFired`] after a delay.
    ScheduleTimer {
        /// Timer to fire
        timer: RoomTimer,
        /// Delay before firing
        after: Duration,
    },

    /// Emit a log line.
    Log {
        /// Severity
        level: LogLevel,
        /// Message text
        message: String,
    },
}

impl ServerAction {
    fn send(session_id: SessionId, message: ServerMessage) -> Self {
        Self::SendToSession { session_id, message }
    }

    fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log { level, message: message.into() }
    }
}

impl From<RoomAction> for ServerAction {
    fn from(action: RoomAction) -> Self {
        match action {
            RoomAction::Send { session_id, message } => Self::SendToSession { session_id, message },
            RoomAction::Schedule { timer, after } => Self::ScheduleTimer { timer, after },
        }
    }
}

/// Sans-IO orchestrator over the session registry.
pub struct ServerDriver<E: Environment> {
    env: E,
    rooms: SessionRegistry,
    connections: ConnectionRegistry,
    config: ServerConfig,
}

impl<E: Environment> ServerDriver<E> {
    /// Create a driver serving `catalog`.
    pub fn new(env: E, catalog: Catalog, config: ServerConfig) -> Self {
        Self {
            env,
            rooms: SessionRegistry::new(catalog, config.game),
            connections: ConnectionRegistry::new(),
            config,
        }
    }

    /// Driver configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Environment the driver draws time and randomness from.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Session registry.
    pub fn rooms(&self) -> &SessionRegistry {
        &self.rooms
    }

    /// Connection table.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Number of live connections.
    pub fn session_count(&self) -> usize {
        self.connections.len()
    }

    /// Sessions seated in a room.
    pub fn sessions_in_room(&self, code: RoomCode) -> impl Iterator<Item = SessionId> + '_ {
        self.connections.sessions_in_room(code)
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::ConnectionLimit` or
    /// `DriverError::DuplicateConnection` when a connection cannot be
    /// accepted, and `DriverError::UnknownConnection` for messages from a
    /// connection that was never accepted. The driver state is unchanged in
    /// every error case.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { conn_id } => self.accept(conn_id),
            ServerEvent::MessageReceived { conn_id, message } => {
                if !self.connections.contains(conn_id) {
                    return Err(DriverError::UnknownConnection(conn_id));
                }
                let actions = self.handle_message(conn_id, message);
                self.sync_room(conn_id);
                Ok(actions)
            },
            ServerEvent::ConnectionClosed { conn_id, reason } => Ok(self.close(conn_id, &reason)),
            ServerEvent::TimerFired(timer) => {
                Ok(self.rooms.fire(timer).into_iter().map(ServerAction::from).collect())
            },
        }
    }

    fn accept(&mut self, conn_id: SessionId) -> Result<Vec<ServerAction>, DriverError> {
        if self.connections.contains(conn_id) {
            return Err(DriverError::DuplicateConnection(conn_id));
        }
        if self.connections.len() >= self.config.max_connections {
            return Err(DriverError::ConnectionLimit { max: self.config.max_connections });
        }

        self.connections.register(SessionInfo::new(conn_id, self.env.now()));
        Ok(vec![ServerAction::log(LogLevel::Debug, format!("connection {conn_id:016x} accepted"))])
    }

    fn close(&mut self, conn_id: SessionId, reason: &str) -> Vec<ServerAction> {
        if self.connections.unregister(conn_id).is_none() {
            return Vec::new();
        }

        let mut actions: Vec<ServerAction> =
            self.rooms.leave(conn_id).into_iter().map(ServerAction::from).collect();
        actions.push(ServerAction::log(
            LogLevel::Info,
            format!("connection {conn_id:016x} closed: {reason}"),
        ));
        actions
    }

    fn handle_message(&mut self, conn_id: SessionId, message: ClientMessage) -> Vec<ServerAction> {
        match message {
            ClientMessage::CreateRoom { player_name } => self.create_room(conn_id, &player_name),
            ClientMessage::JoinRoom { player_name, room_code } => {
                self.join_room(conn_id, &player_name, &room_code)
            },
            ClientMessage::StartGame {} => {
                self.rooms.start(conn_id, &self.env).into_iter().map(ServerAction::from).collect()
            },
            ClientMessage::SelectStat { stat } => {
                self.rooms.select_stat(conn_id, stat).into_iter().map(ServerAction::from).collect()
            },
        }
    }

    fn create_room(&mut self, conn_id: SessionId, player_name: &str) -> Vec<ServerAction> {
        let participant = Participant::new(conn_id, player_name);
        self.remember_name(conn_id, &participant.name);

        match self.rooms.create_room(participant, &self.env) {
            Ok(Seated { view, actions }) => {
                let mut out: Vec<ServerAction> =
                    actions.into_iter().map(ServerAction::from).collect();
                out.push(ServerAction::send(
                    conn_id,
                    ServerMessage::RoomCreated { code: view.code.to_string(), players: view.players },
                ));
                out
            },
            Err(err) => Self::rejected(conn_id, &err),
        }
    }

    fn join_room(
        &mut self,
        conn_id: SessionId,
        player_name: &str,
        room_code: &str,
    ) -> Vec<ServerAction> {
        let Some(code) = RoomCode::parse(room_code) else {
            return vec![
                ServerAction::send(
                    conn_id,
                    ServerMessage::Error { message: "Room not found".to_string() },
                ),
                ServerAction::log(LogLevel::Warn, format!("malformed room code {room_code:?}")),
            ];
        };

        let participant = Participant::new(conn_id, player_name);
        let name = participant.name.clone();

        match self.rooms.join_room(code, participant) {
            Ok(Seated { view, actions }) => {
                self.remember_name(conn_id, &name);
                let mut out: Vec<ServerAction> =
                    actions.into_iter().map(ServerAction::from).collect();
                let code = view.code.to_string();

                out.push(ServerAction::send(
                    conn_id,
                    ServerMessage::RoomJoined { code: code.clone(), players: view.players.clone() },
                ));

                let seated: Vec<SessionId> = self
                    .rooms
                    .room(view.code)
                    .map(|room| room.participants().iter().map(|p| p.session_id).collect())
                    .unwrap_or_default();
                out.extend(seated.into_iter().map(|session_id| {
                    ServerAction::send(
                        session_id,
                        ServerMessage::PlayerJoined {
                            code: code.clone(),
                            players: view.players.clone(),
                        },
                    )
                }));
                out
            },
            Err(err) => Self::rejected(conn_id, &err),
        }
    }

    /// Report a rejected create or join.
    fn rejected(conn_id: SessionId, err: &RoomError) -> Vec<ServerAction> {
        let Some(text) = err.client_message() else {
            return vec![ServerAction::log(LogLevel::Debug, format!("{conn_id:016x}: {err}"))];
        };

        let level = if err.is_fatal() { LogLevel::Error } else { LogLevel::Warn };
        vec![
            ServerAction::send(conn_id, ServerMessage::Error { message: text.to_string() }),
            ServerAction::log(level, format!("{conn_id:016x}: {err}")),
        ]
    }

    fn remember_name(&mut self, conn_id: SessionId, name: &str) {
        if let Some(info) = self.connections.get_mut(conn_id) {
            info.player_name = Some(name.to_string());
        }
    }

    fn sync_room(&mut self, conn_id: SessionId) {
        let room = self.rooms.room_of(conn_id);
        if let Some(info) = self.connections.get_mut(conn_id) {
            info.room = room;
        }
    }
}

impl<E: Environment> std::fmt::Debug for ServerDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("rooms", &self.rooms)
            .field("connections", &self.connections.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
