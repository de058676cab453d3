//! Typed game-rule violations.
//!
//! Every variant maps to a stable SCREAMING_SNAKE_CASE code sent to the
//! offending connection as an `error` event. These are recoverable:
//! they never close a socket and never touch room state.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("room '{room_id}' was not found")]
    RoomNotFound { room_id: String },

    #[error("the game has already started")]
    GameAlreadyStarted,

    #[error("the room is full")]
    RoomFull,

    #[error("nickname '{nickname}' is already taken")]
    NicknameTaken { nickname: String },

    #[error("only the host can start the game")]
    NotHost,

    #[error("at least 2 players are required to start")]
    NotEnoughPlayers,

    #[error("the game has not started")]
    GameNotStarted,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("invalid phase: {detail}")]
    InvalidPhase { detail: String },

    #[error("cannot steal: {detail}")]
    CannotSteal { detail: String },

    #[error("unknown event '{event}'")]
    UnknownEvent { event: String },

    #[error("invalid payload: {detail}")]
    Validation { detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound { .. } => "ROOM_NOT_FOUND",
            GameError::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            GameError::RoomFull => "ROOM_FULL",
            GameError::NicknameTaken { .. } => "NICKNAME_TAKEN",
            GameError::NotHost => "NOT_HOST",
            GameError::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            GameError::GameNotStarted => "GAME_NOT_STARTED",
            GameError::NotYourTurn => "NOT_YOUR_TURN",
            GameError::InvalidPhase { .. } => "INVALID_PHASE",
            GameError::CannotSteal { .. } => "CANNOT_STEAL",
            GameError::UnknownEvent { .. } => "UNKNOWN_EVENT",
            GameError::Validation { .. } => "VALIDATION_ERROR",
            GameError::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show the offending client. Store failures are
    /// masked; their detail goes to the log, not the wire.
    pub fn client_message(&self) -> String {
        match self {
            GameError::Store(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}
