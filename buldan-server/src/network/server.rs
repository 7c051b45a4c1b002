//! WebSocket Game Server
//!
//! Async WebSocket front-end for the session engine.
//! Each connection may join one game; while joined, the player's event
//! queue is forwarded into the socket. When the socket closes the
//! registry slot is released through `SessionEngine::unsubscribe`.
//!
//! Connections that have not joined a game are closed after the idle
//! timeout; joined connections stay open until the client disconnects.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::core::id::GameId;
use crate::core::names::generate_name;
use crate::game::state::{GameInstance, GameSettings, Player};
use crate::game::store::InMemoryStore;
use crate::network::protocol::{
    ClientMessage, ErrorCode, LobbySummary, ServerError, ServerMessage,
};
use crate::session::{EngineError, ErrorKind, SessionEngine, Subscription};

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client bookkeeping.
struct ConnectedClient {
    /// Game joined by this connection.
    game_id: Option<GameId>,
    /// Connection time.
    connected_at: Instant,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Session engine shared by all connections.
    engine: Arc<SessionEngine>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server with a fresh in-memory engine.
    pub fn new(config: ServerConfig) -> Self {
        let engine = SessionEngine::with_queue_capacity(
            InMemoryStore::new(),
            config.event_queue_capacity,
        );
        Self::with_engine(config, Arc::new(engine))
    }

    /// Create a server around an existing engine.
    pub fn with_engine(config: ServerConfig, engine: Arc<SessionEngine>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            engine,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                reject_connection(stream, addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let engine = self.engine.clone();
        let idle_timeout = self.config.idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            clients.write().await.insert(addr, ConnectedClient {
                game_id: None,
                connected_at: Instant::now(),
            });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut connection = Connection {
                addr,
                engine,
                clients: clients.clone(),
                outbound: msg_tx.clone(),
                membership: None,
            };

            loop {
                let idle_check = !connection.is_joined();
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => connection.handle_client_message(client_msg).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::Error(ServerError::new(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        ))
                                    }
                                };
                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                                connection.start_forwarding();
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = tokio::time::sleep(idle_timeout), if idle_check => {
                        info!("Closing idle connection {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            connection.leave().await;
            drop(msg_tx);
            drop(connection);
            let _ = sender_task.await;

            if let Some(client) = clients.write().await.remove(&addr) {
                debug!(
                    "Client {} connected for {:?}",
                    addr,
                    client.connected_at.elapsed()
                );
            }
            info!("Client {} cleaned up", addr);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Wait up to `grace` for connections to flush and close after
    /// `shutdown`. Returns whether every connection finished in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while self.connection_count().await > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of connections that joined a game.
    pub async fn joined_count(&self) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.game_id.is_some())
            .count()
    }

    /// Shared session engine.
    pub fn engine(&self) -> &Arc<SessionEngine> {
        &self.engine
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Game joined by a connection and the task forwarding its events.
///
/// The subscription stays `pending` until the join reply is queued, so the
/// client never sees a game event before its `joined`.
struct Membership {
    game_id: GameId,
    player: Player,
    pending: Option<Subscription>,
    forwarder: Option<JoinHandle<()>>,
}

/// Per-connection request handling.
struct Connection {
    addr: SocketAddr,
    engine: Arc<SessionEngine>,
    clients: Clients,
    outbound: mpsc::Sender<ServerMessage>,
    membership: Option<Membership>,
}

impl Connection {
    /// Handle a client message, returning the direct reply.
    async fn handle_client_message(&mut self, msg: ClientMessage) -> ServerMessage {
        let result = match msg {
            ClientMessage::CreateGame { name } => self.handle_create(&name).await,
            ClientMessage::JoinGame { game_id, name } => {
                let name = name.unwrap_or_else(generate_name);
                self.handle_join(&game_id, &name).await
            }
            ClientMessage::StartGame => self.handle_start().await,
            ClientMessage::Guess { text } => self.handle_guess(&text).await,
            ClientMessage::UpdateSettings { rounds } => self.handle_settings(rounds).await,
            ClientMessage::ListLobbies => {
                let games = self
                    .engine
                    .open_lobbies()
                    .await
                    .iter()
                    .map(LobbySummary::from)
                    .collect();
                Ok(ServerMessage::Lobbies { games })
            }
            ClientMessage::SuggestName => Ok(ServerMessage::NameSuggestion {
                name: generate_name(),
            }),
            ClientMessage::Ping { timestamp } => Ok(ServerMessage::Pong {
                timestamp,
                server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
            }),
            ClientMessage::Leave => match self.leave().await {
                Some(game_id) => Ok(ServerMessage::Left { game_id }),
                None => Err(not_in_game()),
            },
        };

        result.unwrap_or_else(ServerMessage::Error)
    }

    async fn handle_create(&mut self, name: &str) -> Result<ServerMessage, ServerError> {
        self.ensure_not_joined()?;
        let game = self.engine.new_game(name).await.map_err(|e| self.engine_error(e))?;
        info!("Creating new game {} for {} (admin {})", game.id, self.addr, game.admin.name);

        // Queued ahead of the `joined` reply on the same channel
        let _ = self
            .outbound
            .send(ServerMessage::GameCreated { game: game.clone() })
            .await;

        // The creator is joined straight away under the admin identity
        let joined = self.engine.join_as(&game.id, game.admin).await;
        self.complete_join(joined).await
    }

    async fn handle_join(&mut self, game_id: &GameId, name: &str) -> Result<ServerMessage, ServerError> {
        self.ensure_not_joined()?;
        let joined = self.engine.join_game(game_id, name).await;
        self.complete_join(joined).await
    }

    async fn complete_join(
        &mut self,
        joined: Result<(GameInstance, Subscription), EngineError>,
    ) -> Result<ServerMessage, ServerError> {
        let (game, subscription) = joined.map_err(|e| self.engine_error(e))?;
        let player = game
            .player(&subscription.player_id())
            .cloned()
            .ok_or_else(|| ServerError::new(ErrorCode::InternalError, "Joined player missing"))?;

        self.membership = Some(Membership {
            game_id: game.id.clone(),
            player: player.clone(),
            pending: Some(subscription),
            forwarder: None,
        });

        if let Some(client) = self.clients.write().await.get_mut(&self.addr) {
            client.game_id = Some(game.id.clone());
        }

        debug!("Opening event stream for ({}/{})", game.id, player.name);
        Ok(ServerMessage::Joined { game, player })
    }

    /// Start forwarding a freshly joined subscription.
    fn start_forwarding(&mut self) {
        if let Some(membership) = self.membership.as_mut() {
            if let Some(subscription) = membership.pending.take() {
                membership.forwarder = Some(spawn_forwarder(subscription, self.outbound.clone()));
            }
        }
    }

    fn is_joined(&self) -> bool {
        self.membership.is_some()
    }

    async fn handle_start(&mut self) -> Result<ServerMessage, ServerError> {
        let game_id = self.joined_game()?.clone();
        let game = self
            .engine
            .start_game(&game_id)
            .await
            .map_err(|e| self.engine_error(e))?;
        Ok(ServerMessage::GameStarted { game })
    }

    async fn handle_guess(&mut self, text: &str) -> Result<ServerMessage, ServerError> {
        let (game_id, player_id) = match &self.membership {
            Some(m) => (m.game_id.clone(), m.player.id),
            None => return Err(not_in_game()),
        };
        let result = self
            .engine
            .guess(&game_id, &player_id, text)
            .await
            .map_err(|e| self.engine_error(e))?;
        Ok(ServerMessage::GuessResult(result))
    }

    async fn handle_settings(&mut self, rounds: u32) -> Result<ServerMessage, ServerError> {
        let game_id = self.joined_game()?.clone();
        let settings = GameSettings { rounds };
        self.engine
            .update_settings(&game_id, settings)
            .await
            .map_err(|e| self.engine_error(e))?;
        Ok(ServerMessage::SettingsUpdated { settings })
    }

    /// Drop the membership and release the registry slot.
    async fn leave(&mut self) -> Option<GameId> {
        let membership = self.membership.take()?;
        if let Some(forwarder) = membership.forwarder {
            forwarder.abort();
        }
        self.engine
            .unsubscribe(&membership.game_id, &membership.player.id)
            .await;

        if let Some(client) = self.clients.write().await.get_mut(&self.addr) {
            client.game_id = None;
        }

        info!(
            "Player {} in game {} walked away",
            membership.player.name, membership.game_id
        );
        Some(membership.game_id)
    }

    fn joined_game(&self) -> Result<&GameId, ServerError> {
        self.membership
            .as_ref()
            .map(|m| &m.game_id)
            .ok_or_else(not_in_game)
    }

    fn ensure_not_joined(&self) -> Result<(), ServerError> {
        match &self.membership {
            Some(m) => Err(ServerError::new(
                ErrorCode::AlreadyInGame,
                format!("Already joined game {}", m.game_id),
            )),
            None => Ok(()),
        }
    }

    fn engine_error(&self, err: EngineError) -> ServerError {
        if err.kind() == ErrorKind::Internal {
            error!("Request from {} failed: {}", self.addr, err);
        } else {
            debug!("Request from {} rejected: {}", self.addr, err);
        }
        ServerError::from(&err)
    }
}

fn not_in_game() -> ServerError {
    ServerError::new(ErrorCode::NotInGame, "Join a game first")
}

/// Tell a client over the connection limit why it is turned away.
fn reject_connection(stream: TcpStream, addr: SocketAddr) {
    tokio::spawn(async move {
        let mut ws = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                debug!("Handshake with rejected client {} failed: {}", addr, e);
                return;
            }
        };
        let msg = ServerMessage::Error(ServerError::new(
            ErrorCode::ServerOverloaded,
            "Server is at capacity, try again later",
        ));
        if let Ok(text) = msg.to_json() {
            let _ = ws.send(Message::Text(text)).await;
        }
        let _ = ws.close(None).await;
    });
}

/// Pump a subscription into the connection's outbound queue until either
/// side closes.
fn spawn_forwarder(mut subscription: Subscription, outbound: mpsc::Sender<ServerMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            if outbound.send(ServerMessage::Event { event }).await.is_err() {
                break;
            }
        }
        debug!(
            "Game {} for {} is closed",
            subscription.game_id(),
            subscription.player_id().short()
        );
    })
}
