//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::core::id::GameId;
use crate::game::events::GameEvent;
use crate::game::state::{GameInstance, GameSettings, GuessResult, Player};
use crate::session::error::{EngineError, ErrorKind};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a lobby; the sender becomes its admin and is joined to it.
    CreateGame { name: String },

    /// Join an existing lobby. A name is generated when omitted.
    JoinGame {
        game_id: GameId,
        #[serde(default)]
        name: Option<String>,
    },

    /// Start the joined game.
    StartGame,

    /// Play a word in the joined game.
    Guess { text: String },

    /// Change the joined lobby's settings.
    UpdateSettings { rounds: u32 },

    /// List games waiting for players.
    ListLobbies,

    /// Ask for a generated display name.
    SuggestName,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },

    /// Leave the joined game.
    Leave,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Lobby created by this connection; followed by `Joined` for its admin.
    GameCreated { game: GameInstance },

    /// Joined a game; `player` is the identity used for this connection.
    Joined { game: GameInstance, player: Player },

    /// Event from the joined game.
    Event { event: GameEvent },

    /// Outcome of the sender's own guess.
    GuessResult(GuessResult),

    /// Game started (reply to the starter).
    GameStarted { game: GameInstance },

    /// Settings accepted.
    SettingsUpdated { settings: GameSettings },

    /// Open lobbies.
    Lobbies { games: Vec<LobbySummary> },

    /// Generated display name.
    NameSuggestion { name: String },

    /// Left the game.
    Left { game_id: GameId },

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Compact lobby listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    /// Game identifier.
    pub game_id: GameId,
    /// Admin display name.
    pub admin: String,
    /// Joined players.
    pub player_count: usize,
    /// Configured rounds.
    pub rounds: u32,
}

impl From<&GameInstance> for LobbySummary {
    fn from(game: &GameInstance) -> Self {
        Self {
            game_id: game.id.clone(),
            admin: game.admin.name.clone(),
            player_count: game.players.len(),
            rounds: game.settings.rounds,
        }
    }
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&EngineError> for ServerError {
    fn from(err: &EngineError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            ErrorKind::NotFound => ErrorCode::GameNotFound,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::WrongTurn => ErrorCode::WrongTurn,
            ErrorKind::Internal => ErrorCode::InternalError,
        };
        // Internal details stay in the server log
        let message = match code {
            ErrorCode::InternalError => "Internal server error".to_string(),
            _ => err.to_string(),
        };
        Self { code, message }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Invalid input.
    InvalidInput,
    /// Game not found.
    GameNotFound,
    /// Request conflicts with game state.
    Conflict,
    /// Not the sender's turn.
    WrongTurn,
    /// Connection already joined a game.
    AlreadyInGame,
    /// Connection has not joined a game.
    NotInGame,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::store::StoreError;

    #[test]
    fn test_client_message_parsing() {
        let msg = ClientMessage::from_json(r#"{"type":"join_game","game_id":"ABC123"}"#).unwrap();
        match msg {
            ClientMessage::JoinGame { game_id, name } => {
                assert_eq!(game_id.as_str(), "ABC123");
                assert!(name.is_none());
            }
            other => panic!("Wrong message type: {:?}", other),
        }

        let msg = ClientMessage::from_json(r#"{"type":"guess","text":"apple"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Guess { text } if text == "apple"));

        assert!(ClientMessage::from_json(r#"{"type":"start_game"}"#).is_ok());
        assert!(ClientMessage::from_json(r#"{"type":"fly"}"#).is_err());
    }

    #[test]
    fn test_event_message_nests_event() {
        let msg = ServerMessage::Event {
            event: GameEvent::RoundFinished {
                round: 2,
                next_letter: Some('K'),
            },
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"]["type"], "round_finished");
        assert_eq!(json["event"]["next_letter"], "K");
    }

    #[test]
    fn test_error_mapping() {
        let err = EngineError::Store(StoreError::WrongTurn {
            expected: crate::core::id::PlayerId::generate(),
            actual: crate::core::id::PlayerId::generate(),
        });
        let server_err = ServerError::from(&err);
        assert_eq!(server_err.code, ErrorCode::WrongTurn);

        let internal = EngineError::Store(StoreError::Internal("rng exploded".into()));
        let server_err = ServerError::from(&internal);
        assert_eq!(server_err.code, ErrorCode::InternalError);
        assert!(!server_err.message.contains("rng"));
    }

    #[test]
    fn test_game_created_tag() {
        let game = GameInstance::new_lobby(GameId::new("G1"), Player::new("alice"));
        let json: serde_json::Value =
            serde_json::from_str(&ServerMessage::GameCreated { game }.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "game_created");
        assert_eq!(json["game"]["id"], "G1");
    }

    #[test]
    fn test_lobby_summary() {
        let mut game = GameInstance::new_lobby(GameId::new("G1"), Player::new("alice"));
        game.players.push(Player::new("bob"));
        let summary = LobbySummary::from(&game);
        assert_eq!(summary.admin, "alice");
        assert_eq!(summary.player_count, 1);
        assert_eq!(summary.rounds, 5);
    }
}
