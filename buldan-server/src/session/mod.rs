//! Session Layer
//!
//! Live coordination of games: the engine serializing mutations, the
//! per-game subscriber registry and the handles players drain events from.

pub mod engine;
pub mod error;
pub mod subscription;

pub use engine::{SessionEngine, DEFAULT_QUEUE_CAPACITY};
pub use error::{EngineError, ErrorKind};
pub use subscription::Subscription;
