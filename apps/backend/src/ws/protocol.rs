//! Wire protocol: typed client actions and server events.
//!
//! Every frame is a JSON envelope `{"type": ..., "payload": {...}}`.
//! Inbound frames decode into the closed [`ClientAction`] set before
//! they reach the engine; unknown tags and malformed payloads are
//! typed errors and never terminate the connection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::cards::Card;
use crate::domain::errors::GameError;
use crate::domain::rules;
use crate::domain::state::{GamePhase, PlayerRanking};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    CreateRoom { nickname: String, max_players: u8 },
    JoinRoom { room_id: String, nickname: String },
    StartGame,
    ScoreCards,
    DrawCard,
    StealCard { target_player: String, card_number: Card },
    SkipSteal,
    EndTurn,
    LeaveRoom,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct CreateRoomPayload {
    nickname: String,
    max_players: u8,
}

#[derive(Deserialize)]
struct JoinRoomPayload {
    room_id: String,
    nickname: String,
}

#[derive(Deserialize)]
struct StealCardPayload {
    target_player: String,
    card_number: Card,
}

fn decode_payload<T: serde::de::DeserializeOwned>(kind: &str, payload: Value) -> Result<T, GameError> {
    serde_json::from_value(payload).map_err(|err| GameError::Validation {
        detail: format!("invalid '{kind}' payload: {err}"),
    })
}

fn validate_nickname(nickname: &str) -> Result<(), GameError> {
    if rules::nickname_is_valid(nickname) {
        Ok(())
    } else {
        Err(GameError::Validation {
            detail: format!(
                "nickname must be {}-{} characters",
                rules::NICKNAME_MIN_CHARS,
                rules::NICKNAME_MAX_CHARS
            ),
        })
    }
}

impl ClientAction {
    /// Decode one raw text frame.
    pub fn parse(raw: &str) -> Result<Self, GameError> {
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|err| GameError::Validation {
                detail: format!("invalid message envelope: {err}"),
            })?;
        Self::from_envelope(envelope)
    }

    fn from_envelope(envelope: Envelope) -> Result<Self, GameError> {
        let Envelope { kind, payload } = envelope;
        match kind.as_str() {
            "create_room" => {
                let p: CreateRoomPayload = decode_payload(&kind, payload)?;
                validate_nickname(&p.nickname)?;
                if !rules::max_players_is_valid(p.max_players) {
                    return Err(GameError::Validation {
                        detail: format!(
                            "max_players must be between {} and {}",
                            rules::MIN_PLAYERS,
                            rules::MAX_PLAYERS
                        ),
                    });
                }
                Ok(Self::CreateRoom {
                    nickname: p.nickname,
                    max_players: p.max_players,
                })
            }
            "join_room" => {
                let p: JoinRoomPayload = decode_payload(&kind, payload)?;
                validate_nickname(&p.nickname)?;
                if p.room_id.is_empty() {
                    return Err(GameError::Validation {
                        detail: "room_id must not be empty".to_string(),
                    });
                }
                Ok(Self::JoinRoom {
                    room_id: p.room_id,
                    nickname: p.nickname,
                })
            }
            "start_game" => Ok(Self::StartGame),
            "score_cards" => Ok(Self::ScoreCards),
            "draw_card" => Ok(Self::DrawCard),
            "steal_card" => {
                let p: StealCardPayload = decode_payload(&kind, payload)?;
                Ok(Self::StealCard {
                    target_player: p.target_player,
                    card_number: p.card_number,
                })
            }
            "skip_steal" => Ok(Self::SkipSteal),
            "end_turn" => Ok(Self::EndTurn),
            "leave_room" => Ok(Self::LeaveRoom),
            other => Err(GameError::UnknownEvent {
                event: other.to_string(),
            }),
        }
    }
}

/// Outbound event, serialized as `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMsg {
    RoomCreated {
        room_id: String,
    },
    PlayerJoined {
        room_id: String,
        nickname: String,
        player_count: usize,
        max_players: u8,
        players: Vec<String>,
    },
    GameStarted {
        players: Vec<String>,
        deck_count: usize,
        first_player: String,
    },
    CardDrawn {
        player: String,
        card: Card,
        field: Vec<Card>,
    },
    CardsScored {
        player: String,
        cards: Vec<Card>,
        score: u32,
    },
    Burst {
        player: String,
        lost_cards: Vec<Card>,
    },
    CardStolen {
        from_player: String,
        to_player: String,
        card: Card,
    },
    TurnChanged {
        current_player: String,
    },
    GameState {
        fields: BTreeMap<String, Vec<Card>>,
        deck_count: usize,
        scores: BTreeMap<String, u32>,
        current_player: String,
        phase: GamePhase,
    },
    GameEnded {
        winner: String,
        rankings: Vec<PlayerRanking>,
    },
    Error {
        message: String,
        code: String,
    },
}

impl ServerMsg {
    pub fn from_game_error(err: &GameError) -> Self {
        Self::Error {
            message: err.client_message(),
            code: err.code().to_string(),
        }
    }
}
