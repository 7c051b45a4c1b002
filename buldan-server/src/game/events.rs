//! Game Events
//!
//! Notifications fanned out to the subscribers of a game.

use serde::{Deserialize, Serialize};

use crate::core::id::PlayerId;
use crate::game::state::{GameSettings, Player, Standing};

/// Event delivered to a subscriber's queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A player joined the lobby.
    PlayerJoined {
        player: Player,
    },

    /// A subscriber disconnected.
    PlayerLeft {
        player_id: PlayerId,
    },

    /// The admin changed the settings.
    SettingsUpdated {
        settings: GameSettings,
    },

    /// The game left the lobby.
    GameStarted {
        letter: char,
        first_player: Player,
    },

    /// Someone played a word.
    GuessSubmitted {
        player: Player,
        text: String,
        correct: bool,
    },

    /// It is now `player`'s turn on `letter`.
    TurnAdvanced {
        player: Player,
        letter: char,
    },

    /// A round closed; the next one is played on `next_letter`.
    RoundFinished {
        round: u32,
        next_letter: Option<char>,
    },

    /// All rounds played.
    GameFinished {
        standings: Vec<Standing>,
    },
}

impl GameEvent {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::PlayerJoined { .. } => "player_joined",
            GameEvent::PlayerLeft { .. } => "player_left",
            GameEvent::SettingsUpdated { .. } => "settings_updated",
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::GuessSubmitted { .. } => "guess_submitted",
            GameEvent::TurnAdvanced { .. } => "turn_advanced",
            GameEvent::RoundFinished { .. } => "round_finished",
            GameEvent::GameFinished { .. } => "game_finished",
        }
    }

    /// Whether this is the last event a game produces.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::GameFinished { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_tag() {
        let event = GameEvent::TurnAdvanced {
            player: Player::new("bob"),
            letter: 'Q',
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "turn_advanced");
        assert_eq!(json["letter"], "Q");
        assert_eq!(json["player"]["name"], "bob");
        assert_eq!(event.kind(), "turn_advanced");
    }

    #[test]
    fn test_terminal_event() {
        assert!(GameEvent::GameFinished { standings: vec![] }.is_terminal());
        assert!(!GameEvent::PlayerLeft {
            player_id: PlayerId::generate()
        }
        .is_terminal());
    }
}
