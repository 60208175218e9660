//! Error taxonomy for game operations and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Everything a game operation can refuse with.
///
/// Rule-level errors never mutate session state; the two documented
/// exceptions (three-sixes forfeit, timeout skip) are not errors at all
/// and are reported through outcome structs instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    // not found
    #[error("game not found")]
    RoomNotFound,
    #[error("player not found")]
    PlayerNotFound,

    // validation
    #[error("name must be 1-30 characters")]
    InvalidName,
    #[error("id must be 1-64 characters of letters, digits, '_' or '-'")]
    InvalidIdentifier,
    #[error("max_players must be between 2 and 6")]
    InvalidMaxPlayers,
    #[error("game code must be 8 digits")]
    InvalidCode,
    #[error("chat message must be 1-500 characters")]
    InvalidChat,

    // membership
    #[error("game is full")]
    RoomFull,
    #[error("player already in game")]
    PlayerExists,
    #[error("player is not a bot")]
    NotABot,

    // lifecycle state
    #[error("game already started")]
    GameAlreadyStarted,
    #[error("game is paused")]
    GamePaused,
    #[error("game is not paused")]
    GameNotPaused,
    #[error("game is not in playing state")]
    NotPlaying,
    #[error("game has not ended")]
    NotEnded,
    #[error("not all players are ready")]
    PlayersNotReady,
    #[error("need at least 2 players to start")]
    NotEnoughPlayers,

    // turn state
    #[error("not your turn")]
    NotYourTurn,
    #[error("roll the dice first")]
    MustRollFirst,
    #[error("already rolled this turn")]
    AlreadyRolled,

    // permissions
    #[error("only the host may do that")]
    NotHost,
    #[error("host cannot kick themselves")]
    CannotKickSelf,

    // rules
    #[error("invalid move")]
    IllegalMove,
    #[error("a valid move is available")]
    MovesAvailable,
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound | GameError::PlayerNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
