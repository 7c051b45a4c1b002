//! # Buldan Server
//!
//! Session engine for a multiplayer, turn-based word game: players join a
//! game, take turns playing words that start with the round's letter, and
//! receive real-time events about everything happening in their game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BULDAN SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Primitives                              │
//! │  ├── id.rs         - Game / player identifiers               │
//! │  ├── rng.rs        - Seedable letter PRNG                    │
//! │  └── names.rs      - Display-name generator                  │
//! │                                                              │
//! │  game/             - Game state and rules                    │
//! │  ├── state.rs      - Instances, players, guesses             │
//! │  ├── rules.rs      - Word checks, turns, rounds              │
//! │  ├── events.rs     - Subscriber events                       │
//! │  └── store.rs      - Storage trait + in-memory backend       │
//! │                                                              │
//! │  session/          - Live coordination                       │
//! │  ├── engine.rs     - Locking, registry, broadcast            │
//! │  └── subscription.rs - Per-player event queue                │
//! │                                                              │
//! │  network/          - WebSocket transport                     │
//! │  ├── protocol.rs   - Message types                           │
//! │  └── server.rs     - Connection handling                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Every mutation goes through `SessionEngine`, which holds one exclusive
//! lock for the whole operation (store call, broadcast, registry update).
//! Broadcasts never block: each subscriber has a bounded queue and events
//! that do not fit are dropped for that subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;
pub mod session;

// Re-export commonly used types
pub use config::ServerConfig;
pub use crate::core::id::{GameId, PlayerId};
pub use game::events::GameEvent;
pub use game::state::{GameInstance, GameSettings, GameStatus, Guess, GuessResult, Player};
pub use game::store::{GameStore, InMemoryStore, StoreError};
pub use session::{EngineError, ErrorKind, SessionEngine, Subscription};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
