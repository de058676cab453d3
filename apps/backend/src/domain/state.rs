//! Room, turn, and ranking records shared by the engine and the store.

use serde::Serialize;

use crate::domain::cards::Card;

/// Room lifecycle. A room is Waiting until the host starts the game,
/// Playing until the deck runs out, then Finished until it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(RoomStatus::Waiting),
            "playing" => Some(RoomStatus::Playing),
            "finished" => Some(RoomStatus::Finished),
            _ => None,
        }
    }
}

/// Phase of the current player's turn.
///
/// Score: uncommitted field cards must be banked or risked.
/// Draw: the field is empty and a draw is the only move.
/// Drawn: at least one draw happened; draw again or end the turn.
/// Steal: the drawn card matches an opponent's field; pick or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Score,
    Draw,
    Drawn,
    Steal,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Score => "score",
            GamePhase::Draw => "draw",
            GamePhase::Drawn => "drawn",
            GamePhase::Steal => "steal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "score" => Some(GamePhase::Score),
            "draw" => Some(GamePhase::Draw),
            "drawn" => Some(GamePhase::Drawn),
            "steal" => Some(GamePhase::Steal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: String,
    pub status: RoomStatus,
    pub max_players: u8,
    pub host_player_id: String,
}

/// The singleton turn record of an active room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInfo {
    pub current_nickname: String,
    pub phase: GamePhase,
    /// Present iff `phase == Steal`: the value that may be stolen.
    pub drawn_card: Option<Card>,
}

/// Lobby listing entry for a Waiting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub player_count: usize,
    pub max_players: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRanking {
    pub player: String,
    pub score: u32,
}

/// Rank players by score descending. `scores` must be in join order;
/// the sort is stable, so equal scores rank in join order.
pub fn rank_players(scores: &[(String, u32)]) -> Vec<PlayerRanking> {
    let mut rankings: Vec<PlayerRanking> = scores
        .iter()
        .map(|(player, score)| PlayerRanking {
            player: player.clone(),
            score: *score,
        })
        .collect();
    rankings.sort_by(|a, b| b.score.cmp(&a.score));
    rankings
}

/// Next member in join order, wrapping. Falls back to the first member
/// when the current player is no longer listed, and to `None` when the
/// room has no members left.
pub fn next_player(players: &[String], current: &str) -> Option<String> {
    if players.is_empty() {
        return None;
    }
    match players.iter().position(|n| n == current) {
        Some(idx) => Some(players[(idx + 1) % players.len()].clone()),
        None => Some(players[0].clone()),
    }
}
