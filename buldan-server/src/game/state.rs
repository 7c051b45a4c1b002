//! Game State Definitions
//!
//! All state types for a game instance.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::id::{GameId, PlayerId};

/// Rounds played when the admin does not change settings.
pub const DEFAULT_ROUNDS: u32 = 5;

/// Upper bound on rounds: one per letter of the alphabet.
pub const MAX_ROUNDS: u32 = 26;

// =============================================================================
// PLAYER
// =============================================================================

/// A participant of one game. Immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Generated identifier, unique within the process.
    pub id: PlayerId,
    /// Display name chosen by the player (may be shared by others).
    pub name: String,
}

impl Player {
    /// Create a player with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::generate(),
            name: name.into(),
        }
    }
}

// =============================================================================
// STATUS / SETTINGS
// =============================================================================

/// Lifecycle of a game: Lobby -> Running -> Finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Waiting for players.
    Lobby,
    /// Turns are being played.
    Running,
    /// All rounds played.
    Finished,
}

impl GameStatus {
    /// Whether `next` is a legal successor of this status.
    pub fn can_transition_to(self, next: GameStatus) -> bool {
        matches!(
            (self, next),
            (GameStatus::Lobby, GameStatus::Running) | (GameStatus::Running, GameStatus::Finished)
        )
    }
}

/// Settings chosen by the admin before the game starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Number of rounds (one letter per round).
    pub rounds: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl GameSettings {
    /// Check that rounds is within 1..=MAX_ROUNDS.
    pub fn is_valid(&self) -> bool {
        (1..=MAX_ROUNDS).contains(&self.rounds)
    }
}

// =============================================================================
// GAME INSTANCE
// =============================================================================

/// One game session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameInstance {
    /// Unique game identifier.
    pub id: GameId,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Player who created the game. Not automatically part of `players`.
    pub admin: Player,
    /// Joined players in join order.
    pub players: Vec<Player>,
    /// Letter of the current round (only while Running).
    pub current_letter: Option<char>,
    /// Index into `players` of whose turn it is (only while Running).
    pub current_player_index: usize,
    /// Current round, 1-based (0 before start).
    pub round: u32,
    /// Letters already played in this game.
    pub used_letters: Vec<char>,
    /// Correct guesses per player.
    pub scores: BTreeMap<PlayerId, u32>,
    /// Game settings.
    pub settings: GameSettings,
    /// When the game was created.
    pub start_time: DateTime<Utc>,
}

impl GameInstance {
    /// Create a fresh lobby.
    pub fn new_lobby(id: GameId, admin: Player) -> Self {
        Self {
            id,
            status: GameStatus::Lobby,
            admin,
            players: Vec::new(),
            current_letter: None,
            current_player_index: 0,
            round: 0,
            used_letters: Vec::new(),
            scores: BTreeMap::new(),
            settings: GameSettings::default(),
            start_time: Utc::now(),
        }
    }

    /// Player whose turn it is, if the game is running.
    pub fn current_player(&self) -> Option<&Player> {
        if self.status != GameStatus::Running {
            return None;
        }
        self.players.get(self.current_player_index)
    }

    /// Look up a joined player.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    /// Whether a player with this id has joined.
    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Score of a player (0 if unknown).
    pub fn score(&self, id: &PlayerId) -> u32 {
        self.scores.get(id).copied().unwrap_or(0)
    }

    /// Players sorted by score, best first; ties keep join order.
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .iter()
            .map(|p| Standing {
                player: p.clone(),
                score: self.score(&p.id),
            })
            .collect();
        standings.sort_by(|a, b| b.score.cmp(&a.score));
        standings
    }
}

/// Final score line of a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Player.
    pub player: Player,
    /// Correct guesses.
    pub score: u32,
}

// =============================================================================
// GUESSES
// =============================================================================

/// Immutable record of a submitted guess.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    /// Game the guess belongs to.
    pub game_id: GameId,
    /// Player who guessed.
    pub player: Player,
    /// Raw text as submitted.
    pub text: String,
    /// Round the guess was made in.
    pub round: u32,
    /// Whether the guess was accepted.
    pub correct: bool,
}

/// Outcome of a guess, derived per submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessResult {
    /// Whether the word was accepted.
    pub correct: bool,
    /// Player whose turn it is now.
    pub next_player: Player,
    /// Letter for the next turn (None once the game is finished).
    pub next_letter: Option<char>,
    /// This guess closed the round.
    pub round_finished: bool,
    /// This guess closed the game.
    pub game_finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> GameInstance {
        GameInstance::new_lobby(GameId::new("ABCDEF012345"), Player::new("alice"))
    }

    #[test]
    fn test_new_lobby_defaults() {
        let game = lobby();
        assert_eq!(game.status, GameStatus::Lobby);
        assert!(game.players.is_empty());
        assert_eq!(game.settings.rounds, DEFAULT_ROUNDS);
        assert_eq!(game.current_letter, None);
        assert!(game.current_player().is_none());
    }

    #[test]
    fn test_status_transitions() {
        use GameStatus::*;
        assert!(Lobby.can_transition_to(Running));
        assert!(Running.can_transition_to(Finished));
        assert!(!Running.can_transition_to(Lobby));
        assert!(!Finished.can_transition_to(Running));
        assert!(!Lobby.can_transition_to(Finished));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn test_settings_validation() {
        assert!(GameSettings::default().is_valid());
        assert!(!GameSettings { rounds: 0 }.is_valid());
        assert!(GameSettings { rounds: MAX_ROUNDS }.is_valid());
        assert!(!GameSettings { rounds: MAX_ROUNDS + 1 }.is_valid());
    }

    #[test]
    fn test_same_name_distinct_players() {
        let a = Player::new("bob");
        let b = Player::new("bob");
        assert_ne!(a.id, b.id);
        assert_ne!(a, b);
    }

    #[test]
    fn test_standings_order() {
        let mut game = lobby();
        let bob = Player::new("bob");
        let carol = Player::new("carol");
        game.players = vec![bob.clone(), carol.clone()];
        game.scores.insert(carol.id, 3);
        game.scores.insert(bob.id, 1);

        let standings = game.standings();
        assert_eq!(standings[0].player, carol);
        assert_eq!(standings[0].score, 3);
        assert_eq!(standings[1].player, bob);
    }

    #[test]
    fn test_instance_json_has_scores_by_player_id() {
        let mut game = lobby();
        let bob = Player::new("bob");
        game.scores.insert(bob.id, 2);
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["scores"][bob.id.to_string()], 2);
        assert_eq!(json["status"], "lobby");
    }
}
