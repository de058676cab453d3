//! Redis-backed store.
//!
//! One logical key family per room entity; values are stored as
//! strings. Every write refreshes the touched key's TTL so abandoned
//! rooms self-expire without a reaper task.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{GameStore, StoreError, StoreResult};
use crate::domain::cards::Card;
use crate::domain::state::{GamePhase, RoomInfo, RoomStatus, RoomSummary, TurnInfo};

/// Seconds an untouched room survives (3 hours).
pub const ROOM_TTL_SECS: i64 = 10_800;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    fn room_key(room_id: &str) -> String {
        format!("room:{room_id}")
    }

    fn players_key(room_id: &str) -> String {
        format!("room:{room_id}:players")
    }

    fn nicknames_key(room_id: &str) -> String {
        format!("room:{room_id}:nicknames")
    }

    fn deck_key(room_id: &str) -> String {
        format!("game:{room_id}:deck")
    }

    fn field_key(room_id: &str, nickname: &str) -> String {
        format!("game:{room_id}:field:{nickname}")
    }

    fn scores_key(room_id: &str) -> String {
        format!("game:{room_id}:scores")
    }

    fn turn_key(room_id: &str) -> String {
        format!("game:{room_id}:turn")
    }

    async fn touch(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.expire::<_, ()>(key, ROOM_TTL_SECS).await?;
        Ok(())
    }

    fn parse_card(raw: &str) -> StoreResult<Card> {
        raw.parse::<Card>()
            .map_err(|_| StoreError::corrupt(format!("card value '{raw}' is not a number")))
    }

    async fn card_list(&self, key: &str) -> StoreResult<Vec<Card>> {
        let mut conn = self.conn();
        let raw: Vec<String> = conn.lrange(key, 0, -1).await?;
        raw.iter().map(|v| Self::parse_card(v)).collect()
    }
}

#[async_trait]
impl GameStore for RedisStore {
    async fn create_room(
        &self,
        room_id: &str,
        host_player_id: &str,
        max_players: u8,
    ) -> StoreResult<()> {
        let key = Self::room_key(room_id);
        let mut conn = self.conn();
        conn.hset_multiple::<_, _, _, ()>(
            &key,
            &[
                ("status", RoomStatus::Waiting.as_str().to_string()),
                ("max_players", max_players.to_string()),
                ("host_player_id", host_player_id.to_string()),
            ],
        )
        .await?;
        self.touch(&key).await
    }

    async fn room(&self, room_id: &str) -> StoreResult<Option<RoomInfo>> {
        let mut conn = self.conn();
        let data: HashMap<String, String> = conn.hgetall(Self::room_key(room_id)).await?;
        if data.is_empty() {
            return Ok(None);
        }
        let status = data
            .get("status")
            .and_then(|s| RoomStatus::parse(s))
            .ok_or_else(|| StoreError::corrupt(format!("room '{room_id}' has no valid status")))?;
        let max_players = data
            .get("max_players")
            .and_then(|v| v.parse::<u8>().ok())
            .ok_or_else(|| {
                StoreError::corrupt(format!("room '{room_id}' has no valid max_players"))
            })?;
        let host_player_id = data.get("host_player_id").cloned().ok_or_else(|| {
            StoreError::corrupt(format!("room '{room_id}' has no host_player_id"))
        })?;
        Ok(Some(RoomInfo {
            room_id: room_id.to_string(),
            status,
            max_players,
            host_player_id,
        }))
    }

    async fn set_room_status(&self, room_id: &str, status: RoomStatus) -> StoreResult<()> {
        let key = Self::room_key(room_id);
        let mut conn = self.conn();
        conn.hset::<_, _, _, ()>(&key, "status", status.as_str())
            .await?;
        self.touch(&key).await
    }

    async fn delete_room(&self, room_id: &str) -> StoreResult<()> {
        let nicknames = self.nicknames(room_id).await?;
        let mut keys = vec![
            Self::room_key(room_id),
            Self::players_key(room_id),
            Self::nicknames_key(room_id),
            Self::deck_key(room_id),
            Self::scores_key(room_id),
            Self::turn_key(room_id),
        ];
        for nickname in &nicknames {
            keys.push(Self::field_key(room_id, nickname));
        }
        let mut conn = self.conn();
        conn.del::<_, ()>(keys).await?;
        Ok(())
    }

    async fn list_waiting_rooms(&self) -> StoreResult<Vec<RoomSummary>> {
        // SCAN needs its own connection; the iterator borrows it.
        let mut scan_conn = self.conn();
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = scan_conn.scan_match::<_, String>("room:*").await?;
            while let Some(key) = iter.next_item().await {
                let key = key?;
                // Skip room:{id}:players and other sub-keys.
                if key.split(':').count() == 2 {
                    keys.push(key);
                }
            }
        }

        let mut conn = self.conn();
        let mut rooms = Vec::new();
        for key in keys {
            let Some(room_id) = key.split(':').nth(1).map(str::to_string) else {
                continue;
            };
            let data: HashMap<String, String> = conn.hgetall(&key).await?;
            if data.get("status").map(String::as_str) != Some(RoomStatus::Waiting.as_str()) {
                continue;
            }
            let max_players = data
                .get("max_players")
                .and_then(|v| v.parse::<u8>().ok())
                .unwrap_or(0);
            let player_count = self.player_count(&room_id).await?;
            rooms.push(RoomSummary {
                room_id,
                player_count,
                max_players,
            });
        }
        Ok(rooms)
    }

    async fn add_player(&self, room_id: &str, player_id: &str, nickname: &str) -> StoreResult<()> {
        let players_key = Self::players_key(room_id);
        let nicknames_key = Self::nicknames_key(room_id);
        let mut conn = self.conn();
        conn.rpush::<_, _, ()>(&players_key, player_id).await?;
        conn.hset::<_, _, _, ()>(&nicknames_key, player_id, nickname)
            .await?;
        self.touch(&players_key).await?;
        self.touch(&nicknames_key).await
    }

    async fn remove_player(&self, room_id: &str, player_id: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.lrem::<_, _, ()>(Self::players_key(room_id), 0, player_id)
            .await?;
        conn.hdel::<_, _, ()>(Self::nicknames_key(room_id), player_id)
            .await?;
        Ok(())
    }

    async fn player_count(&self, room_id: &str) -> StoreResult<usize> {
        let mut conn = self.conn();
        Ok(conn.llen(Self::players_key(room_id)).await?)
    }

    async fn nickname_of(&self, room_id: &str, player_id: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        Ok(conn.hget(Self::nicknames_key(room_id), player_id).await?)
    }

    async fn nicknames(&self, room_id: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        let player_ids: Vec<String> = conn.lrange(Self::players_key(room_id), 0, -1).await?;
        let mut nicknames = Vec::with_capacity(player_ids.len());
        for player_id in &player_ids {
            if let Some(nickname) = self.nickname_of(room_id, player_id).await? {
                nicknames.push(nickname);
            }
        }
        Ok(nicknames)
    }

    async fn is_nickname_taken(&self, room_id: &str, nickname: &str) -> StoreResult<bool> {
        let mut conn = self.conn();
        let all: HashMap<String, String> = conn.hgetall(Self::nicknames_key(room_id)).await?;
        Ok(all.values().any(|n| n == nickname))
    }

    async fn initialize_deck(&self, room_id: &str, deck: Vec<Card>) -> StoreResult<()> {
        let key = Self::deck_key(room_id);
        let mut conn = self.conn();
        conn.del::<_, ()>(&key).await?;
        if !deck.is_empty() {
            let values: Vec<String> = deck.iter().map(Card::to_string).collect();
            conn.rpush::<_, _, ()>(&key, values).await?;
        }
        self.touch(&key).await
    }

    async fn draw_card(&self, room_id: &str) -> StoreResult<Option<Card>> {
        let mut conn = self.conn();
        let raw: Option<String> = conn.rpop(Self::deck_key(room_id), None).await?;
        raw.as_deref().map(Self::parse_card).transpose()
    }

    async fn deck_count(&self, room_id: &str) -> StoreResult<usize> {
        let mut conn = self.conn();
        Ok(conn.llen(Self::deck_key(room_id)).await?)
    }

    async fn field(&self, room_id: &str, nickname: &str) -> StoreResult<Vec<Card>> {
        self.card_list(&Self::field_key(room_id, nickname)).await
    }

    async fn add_to_field(&self, room_id: &str, nickname: &str, card: Card) -> StoreResult<()> {
        let key = Self::field_key(room_id, nickname);
        let mut conn = self.conn();
        conn.rpush::<_, _, ()>(&key, card.to_string()).await?;
        self.touch(&key).await
    }

    async fn clear_field(&self, room_id: &str, nickname: &str) -> StoreResult<Vec<Card>> {
        let key = Self::field_key(room_id, nickname);
        let cards = self.card_list(&key).await?;
        let mut conn = self.conn();
        conn.del::<_, ()>(&key).await?;
        Ok(cards)
    }

    async fn remove_card_from_field(
        &self,
        room_id: &str,
        nickname: &str,
        card: Card,
    ) -> StoreResult<()> {
        let mut conn = self.conn();
        conn.lrem::<_, _, ()>(Self::field_key(room_id, nickname), 1, card.to_string())
            .await?;
        Ok(())
    }

    async fn all_fields(&self, room_id: &str) -> StoreResult<BTreeMap<String, Vec<Card>>> {
        let mut fields = BTreeMap::new();
        for nickname in self.nicknames(room_id).await? {
            let field = self.field(room_id, &nickname).await?;
            fields.insert(nickname, field);
        }
        Ok(fields)
    }

    async fn initialize_scores(&self, room_id: &str, nicknames: &[String]) -> StoreResult<()> {
        let key = Self::scores_key(room_id);
        let mut conn = self.conn();
        conn.del::<_, ()>(&key).await?;
        if !nicknames.is_empty() {
            let zeros: Vec<(&str, String)> = nicknames
                .iter()
                .map(|n| (n.as_str(), "0".to_string()))
                .collect();
            conn.hset_multiple::<_, _, _, ()>(&key, &zeros).await?;
        }
        self.touch(&key).await
    }

    async fn add_score(&self, room_id: &str, nickname: &str, points: u32) -> StoreResult<u32> {
        let key = Self::scores_key(room_id);
        let mut conn = self.conn();
        let total: i64 = conn.hincr(&key, nickname, i64::from(points)).await?;
        self.touch(&key).await?;
        u32::try_from(total)
            .map_err(|_| StoreError::corrupt(format!("score for '{nickname}' is negative")))
    }

    async fn all_scores(&self, room_id: &str) -> StoreResult<BTreeMap<String, u32>> {
        let mut conn = self.conn();
        let raw: HashMap<String, String> = conn.hgetall(Self::scores_key(room_id)).await?;
        let mut scores = BTreeMap::new();
        for (nickname, value) in raw {
            let score = value.parse::<u32>().map_err(|_| {
                StoreError::corrupt(format!("score '{value}' for '{nickname}' is not a number"))
            })?;
            scores.insert(nickname, score);
        }
        Ok(scores)
    }

    async fn turn(&self, room_id: &str) -> StoreResult<Option<TurnInfo>> {
        let mut conn = self.conn();
        let data: HashMap<String, String> = conn.hgetall(Self::turn_key(room_id)).await?;
        if data.is_empty() {
            return Ok(None);
        }
        let current_nickname = data.get("current_nickname").cloned().ok_or_else(|| {
            StoreError::corrupt(format!("turn record for '{room_id}' has no current player"))
        })?;
        let phase = data
            .get("phase")
            .and_then(|p| GamePhase::parse(p))
            .ok_or_else(|| {
                StoreError::corrupt(format!("turn record for '{room_id}' has no valid phase"))
            })?;
        let drawn_card = data
            .get("drawn_card")
            .map(|v| Self::parse_card(v))
            .transpose()?;
        Ok(Some(TurnInfo {
            current_nickname,
            phase,
            drawn_card,
        }))
    }

    async fn set_turn(
        &self,
        room_id: &str,
        current_nickname: &str,
        phase: GamePhase,
        drawn_card: Option<Card>,
    ) -> StoreResult<()> {
        let key = Self::turn_key(room_id);
        let mut conn = self.conn();
        match drawn_card {
            Some(card) => {
                conn.hset_multiple::<_, _, _, ()>(
                    &key,
                    &[
                        ("current_nickname", current_nickname.to_string()),
                        ("phase", phase.as_str().to_string()),
                        ("drawn_card", card.to_string()),
                    ],
                )
                .await?;
            }
            None => {
                conn.hdel::<_, _, ()>(&key, "drawn_card").await?;
                conn.hset_multiple::<_, _, _, ()>(
                    &key,
                    &[
                        ("current_nickname", current_nickname.to_string()),
                        ("phase", phase.as_str().to_string()),
                    ],
                )
                .await?;
            }
        }
        self.touch(&key).await
    }

    async fn set_phase(&self, room_id: &str, phase: GamePhase) -> StoreResult<()> {
        let key = Self::turn_key(room_id);
        let mut conn = self.conn();
        conn.hset::<_, _, _, ()>(&key, "phase", phase.as_str())
            .await?;
        self.touch(&key).await
    }
}
