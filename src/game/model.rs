//! Core entities: pieces, players, spectators, session lifecycle.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::board::PlayerColor;
use crate::game::rules;

/// One of a player's four tokens.
///
/// Position encoding: -1 at home, `0..track_len` on the main track,
/// [`rules::STRETCH_POS`] while in the home stretch (the stretch index is
/// authoritative there) and `100 + id` once finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: u8,
    pub position: i32,
    /// Home-stretch index, 0 when not in the stretch, 6 when finished.
    pub stretch: u8,
    pub at_home: bool,
    pub on_safe: bool,
    pub finished: bool,
    /// Set once the piece has crossed its own start cell on the ring.
    pub lapped: bool,
}

impl Piece {
    pub fn new(id: u8) -> Self {
        Piece {
            id,
            position: rules::HOME_POS,
            stretch: 0,
            at_home: true,
            on_safe: false,
            finished: false,
            lapped: false,
        }
    }

    /// Captured: back to the start, everything reset.
    pub fn send_home(&mut self) {
        self.position = rules::HOME_POS;
        self.stretch = 0;
        self.at_home = true;
        self.on_safe = false;
        self.finished = false;
        self.lapped = false;
    }

    /// True when the piece sits on a main-track cell.
    pub fn on_track(&self) -> bool {
        !self.at_home && !self.finished && self.stretch == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: PlayerColor,
    pub pieces: Vec<Piece>,
    /// Turn-order index; contiguous 0..N-1 within a room.
    pub order: usize,
    pub ready: bool,
    pub host: bool,
    pub bot: bool,
}

impl Player {
    pub fn new(id: String, name: String, color: PlayerColor, order: usize) -> Self {
        Player {
            id,
            name,
            color,
            pieces: (0..4).map(Piece::new).collect(),
            order,
            ready: false,
            host: false,
            bot: false,
        }
    }
}

/// Chat-only participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectator {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Waiting,
    Playing,
    Paused,
    Ended,
}

/// Append-only record of one applied move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub player_id: String,
    pub piece_id: u8,
    pub roll: u8,
    pub from_pos: i32,
    pub to_pos: i32,
    pub was_from_home: bool,
    pub was_capture: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_player_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub is_spectator: bool,
}
