//! Core primitives: identifiers, letter RNG and name generation.

pub mod id;
pub mod names;
pub mod rng;

pub use id::{GameId, PlayerId};
pub use names::generate_name;
pub use rng::{LetterRng, ALPHABET};
