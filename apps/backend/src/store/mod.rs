//! State store adapter: narrow per-entity operations scoped to a room.
//!
//! The trait carries no game logic. Every mutating operation on the
//! Redis backend refreshes the touched entity's TTL so abandoned rooms
//! expire on their own.

pub mod memory;
pub mod redis;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::cards::Card;
use crate::domain::state::{GamePhase, RoomInfo, RoomStatus, RoomSummary, TurnInfo};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("corrupt record: {detail}")]
    Corrupt { detail: String },
}

impl StoreError {
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt {
            detail: detail.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait GameStore: Send + Sync {
    // Rooms
    async fn create_room(
        &self,
        room_id: &str,
        host_player_id: &str,
        max_players: u8,
    ) -> StoreResult<()>;
    async fn room(&self, room_id: &str) -> StoreResult<Option<RoomInfo>>;
    async fn set_room_status(&self, room_id: &str, status: RoomStatus) -> StoreResult<()>;
    /// Delete every key belonging to the room.
    async fn delete_room(&self, room_id: &str) -> StoreResult<()>;
    async fn list_waiting_rooms(&self) -> StoreResult<Vec<RoomSummary>>;

    // Members
    async fn add_player(&self, room_id: &str, player_id: &str, nickname: &str) -> StoreResult<()>;
    async fn remove_player(&self, room_id: &str, player_id: &str) -> StoreResult<()>;
    async fn player_count(&self, room_id: &str) -> StoreResult<usize>;
    async fn nickname_of(&self, room_id: &str, player_id: &str) -> StoreResult<Option<String>>;
    /// Nicknames in join order; join order is turn order.
    async fn nicknames(&self, room_id: &str) -> StoreResult<Vec<String>>;
    async fn is_nickname_taken(&self, room_id: &str, nickname: &str) -> StoreResult<bool>;

    // Deck
    async fn initialize_deck(&self, room_id: &str, deck: Vec<Card>) -> StoreResult<()>;
    /// Remove and return one card, or `None` when the deck is empty.
    async fn draw_card(&self, room_id: &str) -> StoreResult<Option<Card>>;
    async fn deck_count(&self, room_id: &str) -> StoreResult<usize>;

    // Fields
    async fn field(&self, room_id: &str, nickname: &str) -> StoreResult<Vec<Card>>;
    async fn add_to_field(&self, room_id: &str, nickname: &str, card: Card) -> StoreResult<()>;
    /// Clear the field and return the cards it held.
    async fn clear_field(&self, room_id: &str, nickname: &str) -> StoreResult<Vec<Card>>;
    /// Remove exactly one instance of `card` from the field.
    async fn remove_card_from_field(
        &self,
        room_id: &str,
        nickname: &str,
        card: Card,
    ) -> StoreResult<()>;
    async fn all_fields(&self, room_id: &str) -> StoreResult<BTreeMap<String, Vec<Card>>>;

    // Scores
    async fn initialize_scores(&self, room_id: &str, nicknames: &[String]) -> StoreResult<()>;
    /// Add points and return the new total.
    async fn add_score(&self, room_id: &str, nickname: &str, points: u32) -> StoreResult<u32>;
    async fn all_scores(&self, room_id: &str) -> StoreResult<BTreeMap<String, u32>>;

    // Turn
    async fn turn(&self, room_id: &str) -> StoreResult<Option<TurnInfo>>;
    /// Write the turn record. A `None` drawn card clears any recorded
    /// one; callers pass `Some` only when entering the Steal phase.
    async fn set_turn(
        &self,
        room_id: &str,
        current_nickname: &str,
        phase: GamePhase,
        drawn_card: Option<Card>,
    ) -> StoreResult<()>;
    async fn set_phase(&self, room_id: &str, phase: GamePhase) -> StoreResult<()>;
}
