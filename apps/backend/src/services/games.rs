//! Session engine: room lifecycle, the turn state machine, and
//! end-of-game ranking.
//!
//! All game rules live here. The engine reads and writes room state
//! through the [`GameStore`] contract and reaches connections only
//! through the [`RoomHub`] port. Phase checks are re-validated from the
//! store at the start of every action; no cached turn state is trusted.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::cards::{self, Card};
use crate::domain::errors::GameError;
use crate::domain::rules::{self, MIN_PLAYERS};
use crate::domain::state::{next_player, rank_players, GamePhase, RoomStatus, TurnInfo};
use crate::services::locks::RoomLocks;
use crate::store::GameStore;
use crate::ws::hub::{ConnId, RoomHub, LOBBY};
use crate::ws::protocol::ServerMsg;

pub struct GameService {
    store: Arc<dyn GameStore>,
    hub: Arc<dyn RoomHub>,
    locks: RoomLocks,
}

impl GameService {
    pub fn new(store: Arc<dyn GameStore>, hub: Arc<dyn RoomHub>) -> Self {
        Self {
            store,
            hub,
            locks: RoomLocks::new(),
        }
    }

    // ------------------------------------------------------------------
    // Room lifecycle
    // ------------------------------------------------------------------

    /// Create a Waiting room with the caller as host and sole member.
    /// The fresh room id cannot be contended, so no lock is taken.
    pub async fn create_room(
        &self,
        conn: ConnId,
        player_id: &str,
        nickname: &str,
        max_players: u8,
    ) -> Result<String, GameError> {
        let room_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        self.store
            .create_room(&room_id, player_id, max_players)
            .await?;
        self.store.add_player(&room_id, player_id, nickname).await?;
        self.hub.move_to_group(&room_id, conn);
        self.hub.send(
            conn,
            &ServerMsg::RoomCreated {
                room_id: room_id.clone(),
            },
        );
        self.broadcast_player_joined(&room_id, nickname, max_players)
            .await?;
        info!(%room_id, player_id, "room created");
        Ok(room_id)
    }

    /// Join a Waiting room, or re-associate the connection when the
    /// player is already a member (reconnect; idempotent).
    pub async fn join_room(
        &self,
        conn: ConnId,
        player_id: &str,
        room_id: &str,
        nickname: &str,
    ) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let room = self
            .store
            .room(room_id)
            .await?
            .ok_or_else(|| GameError::RoomNotFound {
                room_id: room_id.to_string(),
            })?;

        if let Some(existing) = self.store.nickname_of(room_id, player_id).await? {
            self.hub.move_to_group(room_id, conn);
            self.broadcast_player_joined(room_id, &existing, room.max_players)
                .await?;
            info!(%room_id, player_id, "player reconnected");
            return Ok(());
        }

        if room.status != RoomStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.store.player_count(room_id).await? >= room.max_players as usize {
            return Err(GameError::RoomFull);
        }
        if self.store.is_nickname_taken(room_id, nickname).await? {
            return Err(GameError::NicknameTaken {
                nickname: nickname.to_string(),
            });
        }

        self.store.add_player(room_id, player_id, nickname).await?;
        self.hub.move_to_group(room_id, conn);
        self.broadcast_player_joined(room_id, nickname, room.max_players)
            .await?;
        info!(%room_id, player_id, "player joined");
        Ok(())
    }

    /// Host-only: shuffle the deck, zero the scores, begin turn one.
    pub async fn start_game(&self, player_id: &str, room_id: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let room = self
            .store
            .room(room_id)
            .await?
            .ok_or_else(|| GameError::RoomNotFound {
                room_id: room_id.to_string(),
            })?;
        if room.status != RoomStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        if room.host_player_id != player_id {
            return Err(GameError::NotHost);
        }
        let players = self.store.nicknames(room_id).await?;
        if players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }

        self.store
            .set_room_status(room_id, RoomStatus::Playing)
            .await?;
        self.store
            .initialize_deck(room_id, cards::shuffled_deck())
            .await?;
        self.store.initialize_scores(room_id, &players).await?;

        let deck_count = self.store.deck_count(room_id).await?;
        let first_player = players[0].clone();
        self.hub.broadcast(
            room_id,
            &ServerMsg::GameStarted {
                players: players.clone(),
                deck_count,
                first_player: first_player.clone(),
            },
        );
        info!(%room_id, first_player, "game started");
        self.start_turn(room_id, &first_player).await
    }

    /// Remove the membership row. An empty room mid-game is deleted
    /// immediately; otherwise field and score survive for a reconnect.
    pub async fn handle_disconnect(&self, player_id: &str, room_id: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let nickname = self.store.nickname_of(room_id, player_id).await?;
        self.store.remove_player(room_id, player_id).await?;
        let remaining = self.store.player_count(room_id).await?;
        let room = self.store.room(room_id).await?;
        if remaining == 0 && room.is_some_and(|r| r.status == RoomStatus::Playing) {
            self.store.delete_room(room_id).await?;
            self.locks.remove(room_id);
            info!(%room_id, "room deleted (empty while playing)");
        } else {
            info!(%room_id, player_id, nickname = nickname.as_deref(), "player disconnected");
        }
        Ok(())
    }

    /// Explicit leave: same as a disconnect, plus the connection moves
    /// back to the lobby group.
    pub async fn leave_room(
        &self,
        conn: ConnId,
        player_id: &str,
        room_id: &str,
    ) -> Result<(), GameError> {
        self.handle_disconnect(player_id, room_id).await?;
        self.hub.move_to_group(LOBBY, conn);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Turn actions
    // ------------------------------------------------------------------

    /// Bank the field: clear it and add the sum of its values to the
    /// caller's score. Legal only in Score with a non-empty field.
    pub async fn score_cards(&self, player_id: &str, room_id: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let (nickname, _) = self
            .validate_turn(room_id, player_id, Some(GamePhase::Score))
            .await?;

        let field = self.store.field(room_id, &nickname).await?;
        if field.is_empty() {
            return Err(GameError::InvalidPhase {
                detail: "no cards on the field to score".to_string(),
            });
        }

        let cards = self.store.clear_field(room_id, &nickname).await?;
        let points: u32 = cards.iter().map(|&c| u32::from(c)).sum();
        let total = self.store.add_score(room_id, &nickname, points).await?;

        self.hub.broadcast(
            room_id,
            &ServerMsg::CardsScored {
                player: nickname.clone(),
                cards,
                score: total,
            },
        );
        self.store.set_phase(room_id, GamePhase::Draw).await?;
        self.broadcast_game_state(room_id).await
    }

    /// Draw one card. Legal in Draw or Drawn. An empty deck ends the
    /// game without consuming a turn. Burst is checked first, then deck
    /// exhaustion, then steal targets.
    pub async fn draw_card(&self, player_id: &str, room_id: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let (nickname, turn) = self.validate_turn(room_id, player_id, None).await?;
        if !matches!(turn.phase, GamePhase::Draw | GamePhase::Drawn) {
            return Err(GameError::InvalidPhase {
                detail: format!("current phase is '{}'", turn.phase.as_str()),
            });
        }

        let Some(card) = self.store.draw_card(room_id).await? else {
            return self.end_game(room_id).await;
        };

        self.store.add_to_field(room_id, &nickname, card).await?;
        let field = self.store.field(room_id, &nickname).await?;
        self.hub.broadcast(
            room_id,
            &ServerMsg::CardDrawn {
                player: nickname.clone(),
                card,
                field: field.clone(),
            },
        );

        if rules::is_burst(&field, card) {
            return self.handle_burst(room_id, &nickname).await;
        }

        if self.store.deck_count(room_id).await? == 0 {
            return self.end_game(room_id).await;
        }

        let targets = self.find_steal_targets(room_id, &nickname, card).await?;
        if targets.is_empty() {
            self.store
                .set_turn(room_id, &nickname, GamePhase::Drawn, None)
                .await?;
        } else {
            self.store
                .set_turn(room_id, &nickname, GamePhase::Steal, Some(card))
                .await?;
        }
        self.broadcast_game_state(room_id).await
    }

    /// Take one instance of the drawn card from an opponent's field,
    /// straight into the caller's score.
    pub async fn steal_card(
        &self,
        player_id: &str,
        room_id: &str,
        target_nickname: &str,
        card_number: Card,
    ) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let (nickname, turn) = self
            .validate_turn(room_id, player_id, Some(GamePhase::Steal))
            .await?;

        if turn.drawn_card != Some(card_number) {
            return Err(GameError::CannotSteal {
                detail: "only the just-drawn card can be stolen".to_string(),
            });
        }
        let target_field = self.store.field(room_id, target_nickname).await?;
        if !target_field.contains(&card_number) {
            return Err(GameError::CannotSteal {
                detail: format!(
                    "player '{target_nickname}' has no card {card_number} on the field"
                ),
            });
        }

        self.store
            .remove_card_from_field(room_id, target_nickname, card_number)
            .await?;
        self.store
            .add_score(room_id, &nickname, u32::from(card_number))
            .await?;
        self.hub.broadcast(
            room_id,
            &ServerMsg::CardStolen {
                from_player: target_nickname.to_string(),
                to_player: nickname.clone(),
                card: card_number,
            },
        );
        self.store
            .set_turn(room_id, &nickname, GamePhase::Drawn, None)
            .await?;
        self.broadcast_game_state(room_id).await
    }

    /// Decline the steal opportunity; the turn continues in Drawn.
    pub async fn skip_steal(&self, player_id: &str, room_id: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let (nickname, _) = self
            .validate_turn(room_id, player_id, Some(GamePhase::Steal))
            .await?;
        self.store
            .set_turn(room_id, &nickname, GamePhase::Drawn, None)
            .await?;
        self.broadcast_game_state(room_id).await
    }

    /// Hand the turn to the next member in join order.
    pub async fn end_turn(&self, player_id: &str, room_id: &str) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let (nickname, _) = self
            .validate_turn(room_id, player_id, Some(GamePhase::Drawn))
            .await?;
        self.advance_turn(room_id, &nickname).await
    }

    // ------------------------------------------------------------------
    // Internal helpers (all called with the room lock held)
    // ------------------------------------------------------------------

    /// Re-validate room status, membership, turn ownership, and phase
    /// from the store.
    async fn validate_turn(
        &self,
        room_id: &str,
        player_id: &str,
        expected_phase: Option<GamePhase>,
    ) -> Result<(String, TurnInfo), GameError> {
        let room = self.store.room(room_id).await?;
        if !room.is_some_and(|r| r.status == RoomStatus::Playing) {
            return Err(GameError::GameNotStarted);
        }
        let nickname = self
            .store
            .nickname_of(room_id, player_id)
            .await?
            .ok_or(GameError::NotYourTurn)?;
        let turn = self
            .store
            .turn(room_id)
            .await?
            .ok_or(GameError::GameNotStarted)?;
        if turn.current_nickname != nickname {
            return Err(GameError::NotYourTurn);
        }
        if let Some(expected) = expected_phase {
            if turn.phase != expected {
                return Err(GameError::InvalidPhase {
                    detail: format!("current phase is '{}'", turn.phase.as_str()),
                });
            }
        }
        Ok((nickname, turn))
    }

    async fn broadcast_player_joined(
        &self,
        room_id: &str,
        nickname: &str,
        max_players: u8,
    ) -> Result<(), GameError> {
        let players = self.store.nicknames(room_id).await?;
        self.hub.broadcast(
            room_id,
            &ServerMsg::PlayerJoined {
                room_id: room_id.to_string(),
                nickname: nickname.to_string(),
                player_count: players.len(),
                max_players,
                players,
            },
        );
        Ok(())
    }

    async fn handle_burst(&self, room_id: &str, nickname: &str) -> Result<(), GameError> {
        let lost_cards = self.store.clear_field(room_id, nickname).await?;
        self.hub.broadcast(
            room_id,
            &ServerMsg::Burst {
                player: nickname.to_string(),
                lost_cards: lost_cards.clone(),
            },
        );
        info!(%room_id, player = nickname, ?lost_cards, "burst");

        if self.store.deck_count(room_id).await? == 0 {
            return self.end_game(room_id).await;
        }
        self.advance_turn(room_id, nickname).await
    }

    /// Opponents whose field currently holds the drawn value.
    async fn find_steal_targets(
        &self,
        room_id: &str,
        current_nickname: &str,
        card: Card,
    ) -> Result<Vec<String>, GameError> {
        let mut targets = Vec::new();
        for nickname in self.store.nicknames(room_id).await? {
            if nickname == current_nickname {
                continue;
            }
            if self.store.field(room_id, &nickname).await?.contains(&card) {
                targets.push(nickname);
            }
        }
        Ok(targets)
    }

    /// Starting phase: Score when the player still has field cards from
    /// an earlier turn, Draw otherwise.
    async fn start_turn(&self, room_id: &str, nickname: &str) -> Result<(), GameError> {
        let field = self.store.field(room_id, nickname).await?;
        let phase = if field.is_empty() {
            GamePhase::Draw
        } else {
            GamePhase::Score
        };
        self.store.set_turn(room_id, nickname, phase, None).await?;
        self.hub.broadcast(
            room_id,
            &ServerMsg::TurnChanged {
                current_player: nickname.to_string(),
            },
        );
        self.broadcast_game_state(room_id).await
    }

    async fn advance_turn(&self, room_id: &str, current_nickname: &str) -> Result<(), GameError> {
        let players = self.store.nicknames(room_id).await?;
        let next = next_player(&players, current_nickname)
            .unwrap_or_else(|| current_nickname.to_string());
        self.start_turn(room_id, &next).await
    }

    /// Deck exhausted: rank by score descending, ties broken by join
    /// order (stable sort over the join-ordered member list).
    async fn end_game(&self, room_id: &str) -> Result<(), GameError> {
        self.store
            .set_room_status(room_id, RoomStatus::Finished)
            .await?;

        let players = self.store.nicknames(room_id).await?;
        let scores = self.store.all_scores(room_id).await?;
        let ordered: Vec<(String, u32)> = players
            .iter()
            .map(|n| (n.clone(), scores.get(n).copied().unwrap_or(0)))
            .collect();
        let rankings = rank_players(&ordered);
        let winner = rankings
            .first()
            .map(|r| r.player.clone())
            .unwrap_or_default();

        self.hub.broadcast(
            room_id,
            &ServerMsg::GameEnded {
                winner: winner.clone(),
                rankings,
            },
        );
        info!(%room_id, winner, "game ended");
        Ok(())
    }

    /// Full snapshot so every client can re-render from scratch. A
    /// missing turn record (room never started) is a no-op.
    async fn broadcast_game_state(&self, room_id: &str) -> Result<(), GameError> {
        let Some(turn) = self.store.turn(room_id).await? else {
            return Ok(());
        };
        let fields = self.store.all_fields(room_id).await?;
        let scores = self.store.all_scores(room_id).await?;
        let deck_count = self.store.deck_count(room_id).await?;
        self.hub.broadcast(
            room_id,
            &ServerMsg::GameState {
                fields,
                deck_count,
                scores,
                current_player: turn.current_nickname,
                phase: turn.phase,
            },
        );
        Ok(())
    }
}
