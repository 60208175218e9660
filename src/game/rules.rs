//! Pure rule evaluation over piece snapshots.
//!
//! Nothing in here mutates a session; the session applies what these
//! functions compute.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{BoardVariant, PlayerColor};
use crate::game::model::{Piece, Player};

/// Position value of a piece waiting at home.
pub const HOME_POS: i32 = -1;
/// Position sentinel while a piece is in its home stretch.
pub const STRETCH_POS: i32 = 99;
/// Finished pieces park at `FINISHED_BASE + piece id`.
pub const FINISHED_BASE: i32 = 100;
/// Stretch index at which a piece finishes.
pub const STRETCH_LEN: u8 = 6;

/// Who may turn off the ring into their home stretch.
///
/// The permissive rule treats every on-track piece as lap-eligible, which
/// is how the game has always behaved. `AfterLap` additionally requires
/// the piece to have crossed its own start cell since leaving home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StretchEntryRule {
    #[default]
    Permissive,
    AfterLap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    StayOnTrack,
    EnterStretch,
    AdvanceStretch,
    Finish,
    Illegal,
}

/// Result of advancing one piece by one roll.
#[derive(Debug, Clone, Copy)]
pub struct Advance {
    pub to_pos: i32,
    pub to_stretch: u8,
    pub kind: MoveKind,
}

impl Advance {
    fn illegal() -> Self {
        Advance {
            to_pos: HOME_POS,
            to_stretch: 0,
            kind: MoveKind::Illegal,
        }
    }
}

fn lap_eligible(rule: StretchEntryRule, piece: &Piece) -> bool {
    match rule {
        StretchEntryRule::Permissive => true,
        StretchEntryRule::AfterLap => piece.lapped,
    }
}

/// Compute where `piece` lands when moved by `roll`.
///
/// Handles both stretch movement (exact roll to finish, overshoot is
/// illegal) and ring movement (possibly turning into the stretch). Pieces
/// at home are not advanced here; leaving home is its own operation.
pub fn advance(
    variant: &BoardVariant,
    color: PlayerColor,
    piece: &Piece,
    roll: u8,
    rule: StretchEntryRule,
) -> Advance {
    if piece.stretch > 0 {
        let idx = piece.stretch + roll;
        if idx > STRETCH_LEN {
            return Advance::illegal();
        }
        if idx == STRETCH_LEN {
            return Advance {
                to_pos: FINISHED_BASE + i32::from(piece.id),
                to_stretch: STRETCH_LEN,
                kind: MoveKind::Finish,
            };
        }
        return Advance {
            to_pos: STRETCH_POS,
            to_stretch: idx,
            kind: MoveKind::AdvanceStretch,
        };
    }

    let len = variant.track_len;
    let entry = variant.stretch_entry(color);
    let steps_to_entry = (entry - piece.position).rem_euclid(len);
    if lap_eligible(rule, piece) && i32::from(roll) > steps_to_entry {
        let idx = i32::from(roll) - steps_to_entry;
        if idx > i32::from(STRETCH_LEN) {
            return Advance::illegal();
        }
        if idx == i32::from(STRETCH_LEN) {
            return Advance {
                to_pos: FINISHED_BASE + i32::from(piece.id),
                to_stretch: STRETCH_LEN,
                kind: MoveKind::Finish,
            };
        }
        return Advance {
            to_pos: STRETCH_POS,
            to_stretch: idx as u8,
            kind: MoveKind::EnterStretch,
        };
    }

    Advance {
        to_pos: (piece.position + i32::from(roll)) % len,
        to_stretch: 0,
        kind: MoveKind::StayOnTrack,
    }
}

/// Piece ids the given player may legally move with this roll.
pub fn legal_moves(
    variant: &BoardVariant,
    color: PlayerColor,
    pieces: &[Piece],
    roll: u8,
    rule: StretchEntryRule,
) -> Vec<u8> {
    pieces
        .iter()
        .filter(|p| !p.finished)
        .filter(|p| {
            if p.at_home {
                roll == 6
            } else {
                advance(variant, color, p, roll, rule).kind != MoveKind::Illegal
            }
        })
        .map(|p| p.id)
        .collect()
}

/// Opponent pieces captured by landing on `target_cell`.
///
/// Safe cells shelter everything on them; pieces at home, finished or in
/// their stretch cannot be captured.
pub fn captures(
    variant: &BoardVariant,
    mover_id: &str,
    target_cell: i32,
    players: &BTreeMap<String, Player>,
) -> Vec<(String, u8)> {
    if variant.is_safe(target_cell) {
        return Vec::new();
    }
    players
        .iter()
        .filter(|(id, _)| id.as_str() != mover_id)
        .flat_map(|(id, player)| {
            player
                .pieces
                .iter()
                .filter(|p| p.on_track() && p.position == target_cell)
                .map(move |p| (id.clone(), p.id))
        })
        .collect()
}

/// Whether a forward move from `from` to `to` passes over or lands on
/// `cell` (all on the ring).
pub fn crosses_cell(from: i32, to: i32, cell: i32, len: i32) -> bool {
    let to_cell = (cell - from).rem_euclid(len);
    let to_dest = (to - from).rem_euclid(len);
    to_cell != 0 && to_cell <= to_dest
}
