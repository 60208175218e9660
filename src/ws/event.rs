//! Push event vocabulary.
//!
//! Every frame on the wire is `{"type": ..., "data": {...}, "timestamp":
//! ...}`. Game events embed the post-operation snapshot under
//! `data.game`, so every subscriber always holds the authoritative state.

use serde::Serialize;
use time::OffsetDateTime;

use crate::game::model;
use crate::game::snapshot::Snapshot;

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Event {
    pub fn now(kind: EventKind) -> Self {
        Event {
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Reply to a client-level `{"type":"ping"}`.
    pub fn pong() -> Self {
        Event::now(EventKind::Pong {})
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    PlayerJoined {
        game: Snapshot,
        player_id: String,
    },
    PlayerLeft {
        game: Snapshot,
        player_id: String,
    },
    PlayerKicked {
        game: Snapshot,
        player_id: String,
    },
    PlayerReady {
        game: Snapshot,
        player_id: String,
        ready: bool,
    },
    GameStarted {
        game: Snapshot,
    },
    GamePaused {
        game: Snapshot,
        paused_by: String,
    },
    GameResumed {
        game: Snapshot,
        resumed_by: String,
    },
    DiceRolled {
        game: Snapshot,
        player_id: String,
        roll: u8,
        three_sixes: bool,
        valid_moves: Vec<u8>,
    },
    PieceMoved {
        game: Snapshot,
        player_id: String,
        piece_id: u8,
        captured: bool,
    },
    TurnSkipped {
        game: Snapshot,
        player_id: String,
    },
    TurnTimeout {
        game: Snapshot,
        player_id: String,
    },
    GameEnded {
        game: Snapshot,
        winner: String,
    },
    ChatMessage {
        game: Snapshot,
        message: model::ChatMessage,
    },
    SpectatorJoined {
        game: Snapshot,
        spectator_id: String,
    },
    Rematch {
        game: Snapshot,
    },
    PlayerConnected {
        game: Snapshot,
        player_id: String,
        connected_players: Vec<String>,
    },
    PlayerDisconnected {
        game: Snapshot,
        player_id: String,
        connected_players: Vec<String>,
    },
    Pong {},
}
