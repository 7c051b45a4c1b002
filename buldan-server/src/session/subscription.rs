//! Subscriber handle returned by a join.

use tokio::sync::mpsc;

use crate::core::id::{GameId, PlayerId};
use crate::game::events::GameEvent;

/// Receiving end of a player's bounded event queue.
///
/// The transport drains it until `recv` returns `None` (the engine released
/// the slot) or the client goes away. Dropping the handle closes the queue,
/// after which the engine treats the slot as disconnected.
#[derive(Debug)]
pub struct Subscription {
    game_id: GameId,
    player_id: PlayerId,
    rx: mpsc::Receiver<GameEvent>,
}

impl Subscription {
    pub(crate) fn new(game_id: GameId, player_id: PlayerId, rx: mpsc::Receiver<GameEvent>) -> Self {
        Self {
            game_id,
            player_id,
            rx,
        }
    }

    /// Game this subscription belongs to.
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Subscribed player.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Wait for the next event. `None` once the engine released the slot.
    pub async fn recv(&mut self) -> Option<GameEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is queued.
    pub fn try_recv(&mut self) -> Option<GameEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting events; queued events can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
