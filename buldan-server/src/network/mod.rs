//! Network Layer
//!
//! WebSocket transport in front of the session engine.
//! Holds no game state of its own.

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ErrorCode, LobbySummary, ServerError, ServerMessage};
pub use server::{GameServer, GameServerError};
