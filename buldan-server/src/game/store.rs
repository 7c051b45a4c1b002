//! Game Store
//!
//! Canonical state of every game instance plus its guess history.
//! `GameStore` is the capability set any backend provides; the engine only
//! talks to this trait. `InMemoryStore` keeps everything behind a single
//! lock, each operation being one short critical section.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::core::id::{GameId, PlayerId};
use crate::core::rng::LetterRng;
use crate::game::rules;
use crate::game::state::{GameInstance, GameSettings, GameStatus, Guess, GuessResult, Player};

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No game with this id.
    #[error("No game found with id: {0}")]
    NotFound(GameId),

    /// A player with the same id is already registered.
    #[error("A player is already registered with this id: {0}")]
    DuplicatePlayer(PlayerId),

    /// Guess submitted out of turn.
    #[error("Expected player {expected} to play but it was {actual}")]
    WrongTurn {
        /// Player whose turn it is.
        expected: PlayerId,
        /// Player who tried to play.
        actual: PlayerId,
    },

    /// Operation needs a running game.
    #[error("Game {0} is not running")]
    NotRunning(GameId),

    /// Cannot start a game nobody joined.
    #[error("Game {0} has no players")]
    NoPlayers(GameId),

    /// Status change not allowed from the current status.
    #[error("Game {id} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        /// Game id.
        id: GameId,
        /// Current status.
        from: GameStatus,
        /// Requested status.
        to: GameStatus,
    },

    /// Settings outside the allowed range.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Backend fault (id generation, storage).
    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Storage backend for game instances.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Create a new lobby administered by `admin`.
    async fn create_lobby(&self, admin: Player) -> Result<GameInstance, StoreError>;

    /// Snapshot of a game, if it exists.
    async fn get(&self, id: &GameId) -> Option<GameInstance>;

    /// Append `player` to the game's players.
    async fn join_game(&self, id: &GameId, player: Player) -> Result<GameInstance, StoreError>;

    /// Move a lobby to Running and draw the first letter.
    async fn start_game(&self, id: &GameId) -> Result<GameInstance, StoreError>;

    /// Record a guess by the current player and advance the turn.
    async fn guess(
        &self,
        id: &GameId,
        player_id: &PlayerId,
        text: &str,
    ) -> Result<GuessResult, StoreError>;

    /// Replace the game's settings.
    async fn update_settings(&self, id: &GameId, settings: GameSettings) -> Result<(), StoreError>;

    /// All games still in the lobby.
    async fn open_lobbies(&self) -> Vec<GameInstance>;

    /// Guess history of a game in submission order.
    async fn guesses(&self, id: &GameId) -> Result<Vec<Guess>, StoreError>;
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

struct StoreInner {
    /// Instances keyed by id.
    instances: BTreeMap<GameId, GameInstance>,
    /// Creation order, for stable lobby listing.
    order: Vec<GameId>,
    /// Guess history per game.
    guesses: BTreeMap<GameId, Vec<Guess>>,
    /// Letter source.
    rng: LetterRng,
}

impl StoreInner {
    fn next_game_id(&self) -> Result<GameId, StoreError> {
        loop {
            let id = GameId::random().map_err(|e| {
                error!("Game id generation failed: {}", e);
                StoreError::Internal(format!("id generation failed: {e}"))
            })?;
            if !self.instances.contains_key(&id) {
                return Ok(id);
            }
            debug!("Game id collision on {}, retrying", id);
        }
    }

    fn game_mut(&mut self, id: &GameId) -> Result<&mut GameInstance, StoreError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

/// Store keeping every game in process memory.
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    /// Create an empty store with an entropy-seeded letter RNG.
    pub fn new() -> Self {
        Self::with_rng(LetterRng::from_entropy())
    }

    /// Create an empty store with a fixed letter seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(LetterRng::new(seed))
    }

    fn with_rng(rng: LetterRng) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                instances: BTreeMap::new(),
                order: Vec::new(),
                guesses: BTreeMap::new(),
                rng,
            }),
        }
    }

    /// Number of games ever created.
    pub async fn game_count(&self) -> usize {
        self.inner.read().await.instances.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn create_lobby(&self, admin: Player) -> Result<GameInstance, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_game_id()?;
        let game = GameInstance::new_lobby(id.clone(), admin);

        inner.instances.insert(id.clone(), game.clone());
        inner.order.push(id.clone());
        inner.guesses.insert(id, Vec::new());
        Ok(game)
    }

    async fn get(&self, id: &GameId) -> Option<GameInstance> {
        self.inner.read().await.instances.get(id).cloned()
    }

    async fn join_game(&self, id: &GameId, player: Player) -> Result<GameInstance, StoreError> {
        let mut inner = self.inner.write().await;
        let game = inner.game_mut(id)?;

        if game.has_player(&player.id) {
            return Err(StoreError::DuplicatePlayer(player.id));
        }

        game.players.push(player);
        Ok(game.clone())
    }

    async fn start_game(&self, id: &GameId) -> Result<GameInstance, StoreError> {
        let mut inner = self.inner.write().await;
        let StoreInner { instances, rng, .. } = &mut *inner;
        let game = instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if !game.status.can_transition_to(GameStatus::Running) {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                from: game.status,
                to: GameStatus::Running,
            });
        }
        if game.players.is_empty() {
            return Err(StoreError::NoPlayers(id.clone()));
        }

        rules::begin(game, rng);
        Ok(game.clone())
    }

    async fn guess(
        &self,
        id: &GameId,
        player_id: &PlayerId,
        text: &str,
    ) -> Result<GuessResult, StoreError> {
        let mut inner = self.inner.write().await;
        let StoreInner {
            instances,
            guesses,
            rng,
            ..
        } = &mut *inner;
        let game = instances
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if game.status != GameStatus::Running {
            return Err(StoreError::NotRunning(id.clone()));
        }

        let expected = match game.current_player() {
            Some(p) => p.clone(),
            None => return Err(StoreError::NotRunning(id.clone())),
        };
        if expected.id != *player_id {
            return Err(StoreError::WrongTurn {
                expected: expected.id,
                actual: *player_id,
            });
        }

        let history = guesses.entry(id.clone()).or_default();
        let correct = rules::evaluate_guess(game, history, text);
        history.push(Guess {
            game_id: id.clone(),
            player: expected.clone(),
            text: text.to_string(),
            round: game.round,
            correct,
        });

        Ok(rules::apply_guess(game, &expected, correct, rng))
    }

    async fn update_settings(&self, id: &GameId, settings: GameSettings) -> Result<(), StoreError> {
        if !settings.is_valid() {
            return Err(StoreError::InvalidSettings(format!(
                "rounds must be between 1 and {}, got {}",
                crate::game::state::MAX_ROUNDS,
                settings.rounds
            )));
        }

        let mut inner = self.inner.write().await;
        let game = inner.game_mut(id)?;
        if game.status != GameStatus::Lobby {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                from: game.status,
                to: GameStatus::Lobby,
            });
        }

        game.settings = settings;
        Ok(())
    }

    async fn open_lobbies(&self) -> Vec<GameInstance> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.instances.get(id))
            .filter(|g| g.status == GameStatus::Lobby)
            .cloned()
            .collect()
    }

    async fn guesses(&self, id: &GameId) -> Result<Vec<Guess>, StoreError> {
        let inner = self.inner.read().await;
        inner
            .guesses
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    async fn lobby_with(store: &InMemoryStore, names: &[&str]) -> (GameInstance, Vec<Player>) {
        let game = store.create_lobby(Player::new("alice")).await.unwrap();
        let mut players = Vec::new();
        for name in names {
            let player = Player::new(*name);
            store.join_game(&game.id, player.clone()).await.unwrap();
            players.push(player);
        }
        (game, players)
    }

    #[tokio::test]
    async fn test_create_lobby() {
        let store = InMemoryStore::with_seed(1);
        let admin = Player::new("alice");
        let game = store.create_lobby(admin.clone()).await.unwrap();

        assert_eq!(game.status, GameStatus::Lobby);
        assert_eq!(game.admin, admin);
        assert!(game.players.is_empty());
        assert!(!game.id.as_str().is_empty());
        assert_eq!(store.get(&game.id).await.unwrap().id, game.id);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let store = InMemoryStore::with_seed(1);
        assert!(store.get(&GameId::new("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_join_unknown_game() {
        let store = InMemoryStore::with_seed(1);
        let result = store.join_game(&GameId::new("does-not-exist"), Player::new("bob")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.game_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_duplicate_player() {
        let store = InMemoryStore::with_seed(1);
        let (game, players) = lobby_with(&store, &["bob"]).await;

        let result = store.join_game(&game.id, players[0].clone()).await;
        assert_eq!(result.unwrap_err(), StoreError::DuplicatePlayer(players[0].id));
        assert_eq!(store.get(&game.id).await.unwrap().players.len(), 1);
    }

    #[tokio::test]
    async fn test_join_preserves_order() {
        let store = InMemoryStore::with_seed(1);
        let (game, players) = lobby_with(&store, &["bob", "carol", "dave"]).await;
        let game = store.get(&game.id).await.unwrap();
        assert_eq!(game.players, players);
    }

    #[tokio::test]
    async fn test_start_game() {
        let store = InMemoryStore::with_seed(1);
        let (game, _) = lobby_with(&store, &["bob"]).await;

        let started = store.start_game(&game.id).await.unwrap();
        assert_eq!(started.status, GameStatus::Running);
        let letter = started.current_letter.unwrap();
        assert!(letter.is_ascii_uppercase());
    }

    #[tokio::test]
    async fn test_start_requires_players_and_lobby() {
        let store = InMemoryStore::with_seed(1);
        let (empty, _) = lobby_with(&store, &[]).await;
        assert!(matches!(
            store.start_game(&empty.id).await,
            Err(StoreError::NoPlayers(_))
        ));

        let (game, _) = lobby_with(&store, &["bob"]).await;
        store.start_game(&game.id).await.unwrap();
        assert!(matches!(
            store.start_game(&game.id).await,
            Err(StoreError::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.start_game(&GameId::new("nope")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_guess_wrong_turn() {
        let store = InMemoryStore::with_seed(1);
        let (game, players) = lobby_with(&store, &["bob", "carol"]).await;
        store.start_game(&game.id).await.unwrap();

        let result = store.guess(&game.id, &players[1].id, "anything").await;
        assert!(matches!(result, Err(StoreError::WrongTurn { .. })));

        let after = store.get(&game.id).await.unwrap();
        assert_eq!(after.current_player_index, 0);
        assert!(store.guesses(&game.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guess_before_start() {
        let store = InMemoryStore::with_seed(1);
        let (game, players) = lobby_with(&store, &["bob"]).await;
        let result = store.guess(&game.id, &players[0].id, "apple").await;
        assert!(matches!(result, Err(StoreError::NotRunning(_))));
    }

    #[tokio::test]
    async fn test_guess_advances_turn() {
        let store = InMemoryStore::with_seed(1);
        let (game, players) = lobby_with(&store, &["bob", "carol", "dave"]).await;
        let started = store.start_game(&game.id).await.unwrap();
        let letter = started.current_letter.unwrap();

        let word = format!("{letter}ARDVARK");
        let result = store.guess(&game.id, &players[0].id, &word).await.unwrap();
        assert!(result.correct);
        assert_eq!(result.next_player, players[1]);
        assert!(!result.round_finished);

        let after = store.get(&game.id).await.unwrap();
        assert_eq!(after.current_player_index, 1);
        assert_eq!(after.score(&players[0].id), 1);

        let history = store.guesses(&game.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, word);
        assert_eq!(history[0].player, players[0]);
    }

    #[tokio::test]
    async fn test_full_game_to_finish() {
        let store = InMemoryStore::with_seed(9);
        let (game, players) = lobby_with(&store, &["bob", "carol"]).await;
        store
            .update_settings(&game.id, GameSettings { rounds: 2 })
            .await
            .unwrap();
        store.start_game(&game.id).await.unwrap();

        let mut last = None;
        for turn in 0..4 {
            let current = store.get(&game.id).await.unwrap();
            let letter = current.current_letter.unwrap();
            let player = &players[turn % 2];
            last = Some(
                store
                    .guess(&game.id, &player.id, &format!("{letter}X"))
                    .await
                    .unwrap(),
            );
        }

        let last = last.unwrap();
        assert!(last.game_finished);
        let finished = store.get(&game.id).await.unwrap();
        assert_eq!(finished.status, GameStatus::Finished);
        assert_eq!(finished.used_letters.len(), 2);
        assert!(matches!(
            store.guess(&game.id, &players[0].id, "x").await,
            Err(StoreError::NotRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_update_settings() {
        let store = InMemoryStore::with_seed(1);
        let (game, _) = lobby_with(&store, &["bob"]).await;

        store
            .update_settings(&game.id, GameSettings { rounds: 3 })
            .await
            .unwrap();
        assert_eq!(store.get(&game.id).await.unwrap().settings.rounds, 3);

        assert!(matches!(
            store.update_settings(&game.id, GameSettings { rounds: 0 }).await,
            Err(StoreError::InvalidSettings(_))
        ));
        assert!(matches!(
            store
                .update_settings(&GameId::new("nope"), GameSettings::default())
                .await,
            Err(StoreError::NotFound(_))
        ));

        store.start_game(&game.id).await.unwrap();
        assert!(matches!(
            store.update_settings(&game.id, GameSettings { rounds: 4 }).await,
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_lobbies() {
        let store = InMemoryStore::with_seed(1);
        let (first, _) = lobby_with(&store, &["bob"]).await;
        let (second, _) = lobby_with(&store, &[]).await;
        store.start_game(&first.id).await.unwrap();

        let lobbies = store.open_lobbies().await;
        assert_eq!(lobbies.len(), 1);
        assert_eq!(lobbies[0].id, second.id);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_created_ids_are_unique(count in 1usize..200) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let ids = rt.block_on(async {
                let store = InMemoryStore::with_seed(1);
                let mut ids = BTreeSet::new();
                for _ in 0..count {
                    let game = store.create_lobby(Player::new("admin")).await.unwrap();
                    ids.insert(game.id);
                }
                ids
            });
            prop_assert_eq!(ids.len(), count);
        }

        #[test]
        fn prop_turn_rotation(players in 1usize..6, turns in 0usize..20) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (index, history) = rt.block_on(async {
                let store = InMemoryStore::with_seed(5);
                let names: Vec<String> = (0..players).map(|i| format!("p{i}")).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                let (game, joined) = lobby_with(&store, &refs).await;
                store
                    .update_settings(&game.id, GameSettings { rounds: crate::game::state::MAX_ROUNDS })
                    .await
                    .unwrap();
                store.start_game(&game.id).await.unwrap();

                // Stay below the total number of turns in the game
                let turns = turns.min(players * 26 - 1);
                for t in 0..turns {
                    store.guess(&game.id, &joined[t % players].id, "zz").await.unwrap();
                }
                let game = store.get(&game.id).await.unwrap();
                let history = store.guesses(&game.id).await.unwrap();
                (game.current_player_index, history.len())
            });
            let turns = turns.min(players * 26 - 1);
            prop_assert_eq!(index, turns % players);
            prop_assert_eq!(history, turns);
        }
    }
}
