//! Engine errors and their caller-facing classification.

use crate::core::id::{GameId, PlayerId};
use crate::game::store::StoreError;

/// Broad error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed caller input.
    InvalidInput,
    /// Referenced game does not exist.
    NotFound,
    /// Request conflicts with current state.
    Conflict,
    /// Guess submitted out of turn.
    WrongTurn,
    /// Backend fault.
    Internal,
}

/// Session engine errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Caller supplied an unusable value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No subscriber registry for this game.
    #[error("Unknown game: {0}")]
    UnknownGame(GameId),

    /// The player already holds a live subscription.
    #[error("Player already exists and is connected: {0}")]
    PlayerAlreadyConnected(PlayerId),

    /// The game no longer accepts players.
    #[error("Game {0} has already started")]
    GameNotJoinable(GameId),

    /// Error from the game store, passed through.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::UnknownGame(_) => ErrorKind::NotFound,
            EngineError::PlayerAlreadyConnected(_) | EngineError::GameNotJoinable(_) => {
                ErrorKind::Conflict
            }
            EngineError::Store(err) => match err {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::WrongTurn { .. } => ErrorKind::WrongTurn,
                StoreError::InvalidSettings(_) => ErrorKind::InvalidInput,
                StoreError::DuplicatePlayer(_)
                | StoreError::NotRunning(_)
                | StoreError::NoPlayers(_)
                | StoreError::InvalidTransition { .. } => ErrorKind::Conflict,
                StoreError::Internal(_) => ErrorKind::Internal,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_kind() {
        let id = GameId::new("G1");
        let not_found: EngineError = StoreError::NotFound(id.clone()).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.to_string(), "No game found with id: G1");

        let internal: EngineError = StoreError::Internal("boom".into()).into();
        assert_eq!(internal.kind(), ErrorKind::Internal);

        let dup: EngineError = StoreError::DuplicatePlayer(PlayerId::generate()).into();
        assert_eq!(dup.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_engine_error_kinds() {
        assert_eq!(
            EngineError::InvalidInput("name".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            EngineError::UnknownGame(GameId::new("x")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EngineError::PlayerAlreadyConnected(PlayerId::generate()).kind(),
            ErrorKind::Conflict
        );
    }
}
