//! Wire-facing view of a session.
//!
//! The snapshot is what `GET /api/game/state` returns and what every push
//! event embeds. Maps are keyed through `BTreeMap` so a document
//! serializes identically after a deserialize round trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::VariantKind;
use crate::game::model::{Player, SessionState, Spectator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub code: String,
    pub state: SessionState,
    pub max_players: u8,
    pub variant: VariantKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_roll: Option<u8>,
    pub has_rolled: bool,
    pub consecutive_sixes: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub host_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_by: Option<String>,
    pub capture_grants_extra_turn: bool,
    pub players: BTreeMap<String, Player>,
    pub spectators: BTreeMap<String, Spectator>,
}

/// Aggregate figures for `/api/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_rooms: usize,
    pub waiting: usize,
    pub playing: usize,
    pub ended: usize,
    pub total_players: usize,
}
