//! Game Logic Module
//!
//! ## Module Structure
//!
//! - `state`: Game instance, players, settings, guesses
//! - `rules`: Word evaluation, turn rotation, round completion
//! - `events`: Events fanned out to subscribers
//! - `store`: Storage trait and in-memory backend

pub mod events;
pub mod rules;
pub mod state;
pub mod store;

// Re-export key types
pub use events::GameEvent;
pub use state::{GameInstance, GameSettings, GameStatus, Guess, GuessResult, Player, Standing};
pub use store::{GameStore, InMemoryStore, StoreError};
