//! Word Rules
//!
//! Guess evaluation, turn rotation and round/game completion.
//! Pure functions over `GameInstance`; the store supplies the letter RNG
//! and the guess history.

use crate::core::rng::LetterRng;
use crate::game::state::{GameInstance, GameStatus, Guess, GuessResult, Player};

/// Canonical form of a guess: trimmed and uppercased.
pub fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Decide whether `text` is an acceptable word for this turn.
///
/// A word is accepted when it is alphabetic, starts with the round letter
/// and has not already been accepted earlier in the same round.
pub fn evaluate_guess(game: &GameInstance, history: &[Guess], text: &str) -> bool {
    let word = normalize(text);
    let letter = match game.current_letter {
        Some(letter) => letter,
        None => return false,
    };

    if word.is_empty() || !word.chars().all(char::is_alphabetic) {
        return false;
    }
    if !word.starts_with(letter) {
        return false;
    }

    !history
        .iter()
        .filter(|g| g.round == game.round && g.correct)
        .any(|g| normalize(&g.text) == word)
}

/// Put a lobby into the first round.
pub fn begin(game: &mut GameInstance, rng: &mut LetterRng) {
    let letter = rng.next_letter();
    game.status = GameStatus::Running;
    game.round = 1;
    game.current_player_index = 0;
    game.current_letter = Some(letter);
    game.used_letters.push(letter);
}

/// Apply a guess that has already been evaluated.
///
/// Awards the point, advances the turn and closes the round (and possibly
/// the game) when the turn wraps back to the first player.
pub fn apply_guess(
    game: &mut GameInstance,
    player: &Player,
    correct: bool,
    rng: &mut LetterRng,
) -> GuessResult {
    if correct {
        *game.scores.entry(player.id).or_insert(0) += 1;
    }

    let next_index = advance_index(game.current_player_index, game.players.len());
    game.current_player_index = next_index;

    let round_finished = next_index == 0;
    let mut game_finished = false;

    if round_finished {
        if game.round >= game.settings.rounds {
            game.status = GameStatus::Finished;
            game.current_letter = None;
            game_finished = true;
        } else {
            let letter = rng.next_unused_letter(&game.used_letters);
            game.round += 1;
            game.current_letter = Some(letter);
            game.used_letters.push(letter);
        }
    }

    GuessResult {
        correct,
        next_player: game.players[next_index].clone(),
        next_letter: game.current_letter,
        round_finished,
        game_finished,
    }
}

/// Next turn index, wrapping to 0.
#[inline]
pub fn advance_index(current: usize, player_count: usize) -> usize {
    if player_count == 0 {
        return 0;
    }
    (current + 1) % player_count
}
