//! WebSocket transport.
//!
//! Serves the health endpoint and the `/ws` upgrade, decodes frames into
//! [`ServerEvent`]s and executes the driver's [`ServerAction`]s.
//!
//! Every connection gets an unbounded outbound channel drained by a writer
//! task. Actions are dispatched while the driver lock is held, so messages
//! from consecutive transitions reach each channel in transition order.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{Method, header},
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use topdeck_core::{SessionId, env::Environment};
use topdeck_proto::{ClientMessage, ServerMessage};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    driver::{LogLevel, ServerAction, ServerDriver, ServerEvent},
    system_env::SystemEnv,
};

/// Shared state of the WebSocket endpoint.
#[derive(Clone)]
pub struct Gateway {
    driver: Arc<Mutex<ServerDriver<SystemEnv>>>,
    peers: Arc<DashMap<SessionId, mpsc::UnboundedSender<ServerMessage>>>,
    env: SystemEnv,
}

impl Gateway {
    /// Wrap a driver.
    pub fn new(driver: ServerDriver<SystemEnv>) -> Self {
        let env = driver.env().clone();
        Self { driver: Arc::new(Mutex::new(driver)), peers: Arc::new(DashMap::new()), env }
    }

    /// HTTP routes: `GET /` health and `GET /ws` upgrade.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(health))
            .route("/ws", get(ws_handler))
            .layer(
                CorsLayer::new()
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([header::CONTENT_TYPE])
                    .allow_origin(Any),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Number of connections with a live outbound channel.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Feed one event to the driver and execute the result.
    async fn submit(&self, event: ServerEvent) {
        let mut driver = self.driver.lock().await;
        match driver.process_event(event) {
            Ok(actions) => self.dispatch(actions),
            Err(e) => tracing::warn!("event rejected: {}", e),
        }
    }

    /// Execute actions.
    ///
    /// Sends go out now. Timers re-enter the driver once they fire.
    fn dispatch(&self, actions: Vec<ServerAction>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, message } => {
                    self.deliver(session_id, message);
                },
                ServerAction::ScheduleTimer { timer, after } => {
                    let gateway = self.clone();
                    tokio::spawn(async move {
                        gateway.env.sleep(after).await;
                        gateway.submit(ServerEvent::TimerFired(timer)).await;
                    });
                },
                ServerAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                    LogLevel::Error => tracing::error!("{}", message),
                },
            }
        }
    }

    fn deliver(&self, session_id: SessionId, message: ServerMessage) {
        let Some(tx) = self.peers.get(&session_id) else {
            tracing::debug!(
                "dropping {} for gone connection {:016x}",
                message.event_name(),
                session_id
            );
            return;
        };
        if tx.send(message).is_err() {
            tracing::warn!("outbound channel of {:016x} closed", session_id);
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "topdeck server running" }))
}

async fn ws_handler(State(gateway): State<Gateway>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(gateway, socket))
}

/// Handle a single WebSocket connection.
async fn handle_socket(gateway: Gateway, socket: WebSocket) {
    let conn_id = gateway.env.random_u64();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    // set once the peer sends a binary frame, replies then switch to CBOR
    let binary = Arc::new(AtomicBool::new(false));

    let mut driver = gateway.driver.lock().await;
    let accepted = driver.process_event(ServerEvent::ConnectionAccepted { conn_id });
    match accepted {
        Ok(actions) => {
            gateway.peers.insert(conn_id, tx);
            gateway.dispatch(actions);
            drop(driver);
        },
        Err(e) => {
            drop(driver);
            tracing::warn!("refusing connection: {}", e);
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        },
    }

    let writer_binary = Arc::clone(&binary);
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let frame = if writer_binary.load(Ordering::Relaxed) {
                message.to_cbor().map(Message::Binary)
            } else {
                message.to_json().map(Message::Text)
            };
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("failed to encode {}: {}", message.event_name(), e);
                    continue;
                },
            };
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let reason = loop {
        let frame = match ws_rx.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break format!("read error: {e}"),
            None => break "stream ended".to_string(),
        };

        let decoded = match frame {
            Message::Text(text) => ClientMessage::from_json(&text),
            Message::Binary(bytes) => {
                binary.store(true, Ordering::Relaxed);
                ClientMessage::from_cbor(&bytes)
            },
            Message::Close(_) => break "closed by peer".to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match decoded {
            Ok(message) => {
                gateway.submit(ServerEvent::MessageReceived { conn_id, message }).await;
            },
            Err(e) => tracing::debug!("connection {:016x}: undecodable frame: {}", conn_id, e),
        }
    };

    gateway.submit(ServerEvent::ConnectionClosed { conn_id, reason }).await;
    gateway.peers.remove(&conn_id);
    if let Err(e) = writer.await {
        tracing::debug!("writer task of {:016x} failed: {}", conn_id, e);
    }
}
