//! Session Engine
//!
//! Bridges the game store to connected players. Owns the per-game
//! subscriber registry and serializes every mutating operation behind one
//! exclusive lock, so the store mutation, the broadcast and the registry
//! update of an operation are observed as a single step.
//!
//! Lock order: engine lock first, then (inside the store) the store lock.
//! The store never calls back into the engine.

use std::collections::BTreeMap;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::core::id::{GameId, PlayerId};
use crate::game::events::GameEvent;
use crate::game::state::{GameInstance, GameSettings, GameStatus, Guess, GuessResult, Player};
use crate::game::store::{GameStore, InMemoryStore};
use crate::session::error::EngineError;
use crate::session::subscription::Subscription;

/// Default capacity of a subscriber's event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

type Subscribers = BTreeMap<PlayerId, mpsc::Sender<GameEvent>>;

/// Coordinates games and their subscribers.
pub struct SessionEngine<S: GameStore = InMemoryStore> {
    /// Game storage backend.
    store: S,
    /// Game id -> connected players and their queues.
    registry: Mutex<BTreeMap<GameId, Subscribers>>,
    /// Capacity of each subscriber queue.
    queue_capacity: usize,
}

impl SessionEngine<InMemoryStore> {
    /// Engine over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S: GameStore> SessionEngine<S> {
    /// Create an engine over `store` with the default queue capacity.
    pub fn new(store: S) -> Self {
        Self::with_queue_capacity(store, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an engine with a custom subscriber queue capacity (min 1).
    pub fn with_queue_capacity(store: S, queue_capacity: usize) -> Self {
        Self {
            store,
            registry: Mutex::new(BTreeMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a lobby administered by a new player called `admin_name`.
    ///
    /// The admin is not added to `players`; they join like everyone else,
    /// using `join_as` with `game.admin`.
    #[instrument(skip(self))]
    pub async fn new_game(&self, admin_name: &str) -> Result<GameInstance, EngineError> {
        let name = validate_name(admin_name)?;

        let mut registry = self.registry.lock().await;
        let game = self.store.create_lobby(Player::new(name)).await?;
        registry.insert(game.id.clone(), BTreeMap::new());

        info!("Created game {} (admin {})", game.id, game.admin.name);
        Ok(game)
    }

    /// Join a game as a new player named `name`.
    pub async fn join_game(
        &self,
        game_id: &GameId,
        name: &str,
    ) -> Result<(GameInstance, Subscription), EngineError> {
        let name = validate_name(name)?;
        self.join_as(game_id, Player::new(name)).await
    }

    /// Join a game as an existing player value (e.g. the admin).
    ///
    /// Already-connected subscribers are told about the newcomer; the
    /// newcomer receives nothing for its own join.
    #[instrument(skip(self, player), fields(player = %player.id.short()))]
    pub async fn join_as(
        &self,
        game_id: &GameId,
        player: Player,
    ) -> Result<(GameInstance, Subscription), EngineError> {
        let mut registry = self.registry.lock().await;
        let subscribers = registry
            .get_mut(game_id)
            .ok_or_else(|| EngineError::UnknownGame(game_id.clone()))?;

        subscribers.retain(|_, tx| !tx.is_closed());
        if subscribers.contains_key(&player.id) {
            return Err(EngineError::PlayerAlreadyConnected(player.id));
        }

        let current = self
            .store
            .get(game_id)
            .await
            .ok_or_else(|| EngineError::UnknownGame(game_id.clone()))?;
        if current.status != GameStatus::Lobby {
            return Err(EngineError::GameNotJoinable(game_id.clone()));
        }

        let game = self.store.join_game(game_id, player.clone()).await?;

        broadcast(
            game_id,
            subscribers,
            Some(&player.id),
            GameEvent::PlayerJoined {
                player: player.clone(),
            },
        );

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        subscribers.insert(player.id, tx);

        info!(
            "Player {} joined game {} ({} players)",
            player.name,
            game_id,
            game.players.len()
        );
        Ok((game, Subscription::new(game_id.clone(), player.id, rx)))
    }

    /// Start a lobby and announce the first turn to every subscriber.
    #[instrument(skip(self))]
    pub async fn start_game(&self, game_id: &GameId) -> Result<GameInstance, EngineError> {
        let mut registry = self.registry.lock().await;
        let subscribers = registry
            .get_mut(game_id)
            .ok_or_else(|| EngineError::UnknownGame(game_id.clone()))?;

        let game = self.store.start_game(game_id).await?;

        if let (Some(first_player), Some(letter)) = (game.current_player(), game.current_letter) {
            broadcast(
                game_id,
                subscribers,
                None,
                GameEvent::GameStarted {
                    letter,
                    first_player: first_player.clone(),
                },
            );
        }

        info!(
            "Game {} started with {} players on letter {:?}",
            game_id,
            game.players.len(),
            game.current_letter
        );
        Ok(game)
    }

    /// Submit a guess for the player whose turn it is.
    ///
    /// Other subscribers see the guess, then the round/turn outcome. When
    /// the game finishes every subscriber slot is released, ending each
    /// subscription once drained.
    #[instrument(skip(self, text))]
    pub async fn guess(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        text: &str,
    ) -> Result<GuessResult, EngineError> {
        let mut registry = self.registry.lock().await;
        let subscribers = registry
            .get_mut(game_id)
            .ok_or_else(|| EngineError::UnknownGame(game_id.clone()))?;

        let result = self.store.guess(game_id, player_id, text).await?;
        let game = self
            .store
            .get(game_id)
            .await
            .ok_or_else(|| EngineError::UnknownGame(game_id.clone()))?;

        if let Some(player) = game.player(player_id) {
            broadcast(
                game_id,
                subscribers,
                Some(player_id),
                GameEvent::GuessSubmitted {
                    player: player.clone(),
                    text: text.to_string(),
                    correct: result.correct,
                },
            );
        }

        if result.round_finished {
            let finished_round = if result.game_finished {
                game.round
            } else {
                game.round.saturating_sub(1)
            };
            broadcast(
                game_id,
                subscribers,
                None,
                GameEvent::RoundFinished {
                    round: finished_round,
                    next_letter: result.next_letter,
                },
            );
        }

        if result.game_finished {
            broadcast(
                game_id,
                subscribers,
                None,
                GameEvent::GameFinished {
                    standings: game.standings(),
                },
            );
            // Dropping the senders ends every subscription once drained; the
            // entry stays so later calls surface the store's status errors.
            subscribers.clear();
            info!("Game {} finished", game_id);
        } else if let Some(letter) = result.next_letter {
            broadcast(
                game_id,
                subscribers,
                None,
                GameEvent::TurnAdvanced {
                    player: result.next_player.clone(),
                    letter,
                },
            );
        }

        Ok(result)
    }

    /// Replace the settings of a lobby and notify subscribers.
    #[instrument(skip(self))]
    pub async fn update_settings(
        &self,
        game_id: &GameId,
        settings: GameSettings,
    ) -> Result<(), EngineError> {
        let mut registry = self.registry.lock().await;
        let subscribers = registry
            .get_mut(game_id)
            .ok_or_else(|| EngineError::UnknownGame(game_id.clone()))?;

        self.store.update_settings(game_id, settings).await?;
        broadcast(
            game_id,
            subscribers,
            None,
            GameEvent::SettingsUpdated { settings },
        );
        Ok(())
    }

    /// Release a player's registry slot, e.g. when their stream ended.
    ///
    /// Returns whether a slot was removed. Remaining subscribers are told.
    pub async fn unsubscribe(&self, game_id: &GameId, player_id: &PlayerId) -> bool {
        let mut registry = self.registry.lock().await;
        let subscribers = match registry.get_mut(game_id) {
            Some(s) => s,
            None => return false,
        };

        if subscribers.remove(player_id).is_none() {
            return false;
        }

        broadcast(
            game_id,
            subscribers,
            Some(player_id),
            GameEvent::PlayerLeft {
                player_id: *player_id,
            },
        );
        debug!("Player {} unsubscribed from game {}", player_id.short(), game_id);
        true
    }

    /// Snapshot of a game.
    pub async fn game(&self, game_id: &GameId) -> Option<GameInstance> {
        self.store.get(game_id).await
    }

    /// Games still waiting for players.
    pub async fn open_lobbies(&self) -> Vec<GameInstance> {
        self.store.open_lobbies().await
    }

    /// Guess history of a game.
    pub async fn guesses(&self, game_id: &GameId) -> Result<Vec<Guess>, EngineError> {
        Ok(self.store.guesses(game_id).await?)
    }

    /// Number of live subscribers of a game.
    pub async fn subscriber_count(&self, game_id: &GameId) -> usize {
        let registry = self.registry.lock().await;
        registry
            .get(game_id)
            .map(|subs| subs.values().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Default for SessionEngine<InMemoryStore> {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Trimmed, non-empty display name.
fn validate_name(name: &str) -> Result<&str, EngineError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::InvalidInput(
            "A name must be provided".to_string(),
        ));
    }
    Ok(name)
}

/// Enqueue `event` for every subscriber except `exclude` without blocking.
///
/// A full queue drops the event for that subscriber; a closed queue
/// (receiver dropped) loses its slot. Returns the number of deliveries.
fn broadcast(
    game_id: &GameId,
    subscribers: &mut Subscribers,
    exclude: Option<&PlayerId>,
    event: GameEvent,
) -> usize {
    let mut delivered = 0;
    let mut closed = Vec::new();

    for (player_id, tx) in subscribers.iter() {
        if Some(player_id) == exclude {
            continue;
        }
        match tx.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Event queue full for player {} in game {}, dropping {}",
                    player_id.short(),
                    game_id,
                    event.kind()
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*player_id),
        }
    }

    for player_id in closed {
        subscribers.remove(&player_id);
        debug!("Pruned closed subscriber {} from game {}", player_id.short(), game_id);
    }

    debug!("Broadcast {} in game {} to {} subscribers", event.kind(), game_id, delivered);
    delivered
}
