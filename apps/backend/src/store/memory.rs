//! In-process store used by the test suite.
//!
//! Mirrors the Redis key semantics (join-ordered member list, RPOP
//! draws from the deck tail, single-instance field removal) without a
//! server. TTLs are not modeled; tests delete rooms explicitly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GameStore, StoreResult};
use crate::domain::cards::Card;
use crate::domain::state::{GamePhase, RoomInfo, RoomStatus, RoomSummary, TurnInfo};

#[derive(Debug)]
struct RoomEntry {
    status: RoomStatus,
    max_players: u8,
    host_player_id: String,
    /// (player_id, nickname) pairs in join order.
    players: Vec<(String, String)>,
    deck: Vec<Card>,
    fields: HashMap<String, Vec<Card>>,
    scores: BTreeMap<String, u32>,
    turn: Option<TurnInfo>,
}

#[derive(Default)]
pub struct MemoryStore {
    rooms: Mutex<BTreeMap<String, RoomEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_room<T>(&self, room_id: &str, f: impl FnOnce(&mut RoomEntry) -> T) -> Option<T> {
        let mut rooms = self.rooms.lock().expect("memory store poisoned");
        rooms.get_mut(room_id).map(f)
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn create_room(
        &self,
        room_id: &str,
        host_player_id: &str,
        max_players: u8,
    ) -> StoreResult<()> {
        let mut rooms = self.rooms.lock().expect("memory store poisoned");
        rooms.insert(
            room_id.to_string(),
            RoomEntry {
                status: RoomStatus::Waiting,
                max_players,
                host_player_id: host_player_id.to_string(),
                players: Vec::new(),
                deck: Vec::new(),
                fields: HashMap::new(),
                scores: BTreeMap::new(),
                turn: None,
            },
        );
        Ok(())
    }

    async fn room(&self, room_id: &str) -> StoreResult<Option<RoomInfo>> {
        Ok(self.with_room(room_id, |entry| RoomInfo {
            room_id: room_id.to_string(),
            status: entry.status,
            max_players: entry.max_players,
            host_player_id: entry.host_player_id.clone(),
        }))
    }

    async fn set_room_status(&self, room_id: &str, status: RoomStatus) -> StoreResult<()> {
        self.with_room(room_id, |entry| entry.status = status);
        Ok(())
    }

    async fn delete_room(&self, room_id: &str) -> StoreResult<()> {
        let mut rooms = self.rooms.lock().expect("memory store poisoned");
        rooms.remove(room_id);
        Ok(())
    }

    async fn list_waiting_rooms(&self) -> StoreResult<Vec<RoomSummary>> {
        let rooms = self.rooms.lock().expect("memory store poisoned");
        Ok(rooms
            .iter()
            .filter(|(_, entry)| entry.status == RoomStatus::Waiting)
            .map(|(room_id, entry)| RoomSummary {
                room_id: room_id.clone(),
                player_count: entry.players.len(),
                max_players: entry.max_players,
            })
            .collect())
    }

    async fn add_player(&self, room_id: &str, player_id: &str, nickname: &str) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            entry
                .players
                .push((player_id.to_string(), nickname.to_string()));
        });
        Ok(())
    }

    async fn remove_player(&self, room_id: &str, player_id: &str) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            entry.players.retain(|(pid, _)| pid != player_id);
        });
        Ok(())
    }

    async fn player_count(&self, room_id: &str) -> StoreResult<usize> {
        Ok(self
            .with_room(room_id, |entry| entry.players.len())
            .unwrap_or(0))
    }

    async fn nickname_of(&self, room_id: &str, player_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .with_room(room_id, |entry| {
                entry
                    .players
                    .iter()
                    .find(|(pid, _)| pid == player_id)
                    .map(|(_, nickname)| nickname.clone())
            })
            .flatten())
    }

    async fn nicknames(&self, room_id: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .with_room(room_id, |entry| {
                entry
                    .players
                    .iter()
                    .map(|(_, nickname)| nickname.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_nickname_taken(&self, room_id: &str, nickname: &str) -> StoreResult<bool> {
        Ok(self
            .with_room(room_id, |entry| {
                entry.players.iter().any(|(_, n)| n == nickname)
            })
            .unwrap_or(false))
    }

    async fn initialize_deck(&self, room_id: &str, deck: Vec<Card>) -> StoreResult<()> {
        self.with_room(room_id, |entry| entry.deck = deck);
        Ok(())
    }

    async fn draw_card(&self, room_id: &str) -> StoreResult<Option<Card>> {
        Ok(self
            .with_room(room_id, |entry| entry.deck.pop())
            .unwrap_or(None))
    }

    async fn deck_count(&self, room_id: &str) -> StoreResult<usize> {
        Ok(self
            .with_room(room_id, |entry| entry.deck.len())
            .unwrap_or(0))
    }

    async fn field(&self, room_id: &str, nickname: &str) -> StoreResult<Vec<Card>> {
        Ok(self
            .with_room(room_id, |entry| {
                entry.fields.get(nickname).cloned().unwrap_or_default()
            })
            .unwrap_or_default())
    }

    async fn add_to_field(&self, room_id: &str, nickname: &str, card: Card) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            entry.fields.entry(nickname.to_string()).or_default().push(card);
        });
        Ok(())
    }

    async fn clear_field(&self, room_id: &str, nickname: &str) -> StoreResult<Vec<Card>> {
        Ok(self
            .with_room(room_id, |entry| {
                entry.fields.remove(nickname).unwrap_or_default()
            })
            .unwrap_or_default())
    }

    async fn remove_card_from_field(
        &self,
        room_id: &str,
        nickname: &str,
        card: Card,
    ) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            if let Some(field) = entry.fields.get_mut(nickname) {
                if let Some(idx) = field.iter().position(|&c| c == card) {
                    field.remove(idx);
                }
            }
        });
        Ok(())
    }

    async fn all_fields(&self, room_id: &str) -> StoreResult<BTreeMap<String, Vec<Card>>> {
        Ok(self
            .with_room(room_id, |entry| {
                entry
                    .players
                    .iter()
                    .map(|(_, nickname)| {
                        let field = entry.fields.get(nickname).cloned().unwrap_or_default();
                        (nickname.clone(), field)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn initialize_scores(&self, room_id: &str, nicknames: &[String]) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            entry.scores = nicknames.iter().map(|n| (n.clone(), 0)).collect();
        });
        Ok(())
    }

    async fn add_score(&self, room_id: &str, nickname: &str, points: u32) -> StoreResult<u32> {
        Ok(self
            .with_room(room_id, |entry| {
                let score = entry.scores.entry(nickname.to_string()).or_insert(0);
                *score += points;
                *score
            })
            .unwrap_or(points))
    }

    async fn all_scores(&self, room_id: &str) -> StoreResult<BTreeMap<String, u32>> {
        Ok(self
            .with_room(room_id, |entry| entry.scores.clone())
            .unwrap_or_default())
    }

    async fn turn(&self, room_id: &str) -> StoreResult<Option<TurnInfo>> {
        Ok(self
            .with_room(room_id, |entry| entry.turn.clone())
            .unwrap_or(None))
    }

    async fn set_turn(
        &self,
        room_id: &str,
        current_nickname: &str,
        phase: GamePhase,
        drawn_card: Option<Card>,
    ) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            entry.turn = Some(TurnInfo {
                current_nickname: current_nickname.to_string(),
                phase,
                drawn_card,
            });
        });
        Ok(())
    }

    async fn set_phase(&self, room_id: &str, phase: GamePhase) -> StoreResult<()> {
        self.with_room(room_id, |entry| {
            if let Some(turn) = entry.turn.as_mut() {
                turn.phase = phase;
            }
        });
        Ok(())
    }
}
