//! Static board geometry for the two supported variants.
//!
//! A variant descriptor carries everything the rules need to know about a
//! board: ring length, color palette, start cells, home-stretch entry
//! cells and the safe-cell set. Sessions hold a reference to one
//! descriptor and never hard-code geometry.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Color of a player's pieces. Palette order is also color-assignment
/// order when players join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Classic 52-cell ring, up to 4 players.
    Standard,
    /// 72-cell ring for 5-6 player rooms.
    Extended,
}

/// Board geometry descriptor. All geometry reads route through this.
#[derive(Debug)]
pub struct BoardVariant {
    pub kind: VariantKind,
    /// Number of cells on the shared main track.
    pub track_len: i32,
    pub palette: &'static [PlayerColor],
    starts: &'static [i32],
}

static STANDARD: BoardVariant = BoardVariant {
    kind: VariantKind::Standard,
    track_len: 52,
    palette: &[
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Yellow,
    ],
    starts: &[0, 13, 26, 39],
};

static EXTENDED: BoardVariant = BoardVariant {
    kind: VariantKind::Extended,
    track_len: 72,
    palette: &[
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Yellow,
        PlayerColor::Purple,
        PlayerColor::Orange,
    ],
    starts: &[0, 12, 24, 36, 48, 60],
};

// Safe cells: every start cell plus the marked cell 8 past it.
static STANDARD_SAFE: Lazy<HashSet<i32>> = Lazy::new(|| safe_cells(&STANDARD));
static EXTENDED_SAFE: Lazy<HashSet<i32>> = Lazy::new(|| safe_cells(&EXTENDED));

fn safe_cells(variant: &BoardVariant) -> HashSet<i32> {
    variant
        .starts
        .iter()
        .flat_map(|&s| [s, (s + 8) % variant.track_len])
        .collect()
}

impl BoardVariant {
    /// Descriptor for a room of the given size.
    pub fn for_players(max_players: u8) -> &'static BoardVariant {
        if max_players > 4 {
            &EXTENDED
        } else {
            &STANDARD
        }
    }

    fn color_index(&self, color: PlayerColor) -> usize {
        self.palette
            .iter()
            .position(|&c| c == color)
            .unwrap_or_default()
    }

    /// Cell a piece of this color lands on when leaving home.
    pub fn start_cell(&self, color: PlayerColor) -> i32 {
        self.starts[self.color_index(color)]
    }

    /// Last main-track cell before this color's home stretch.
    pub fn stretch_entry(&self, color: PlayerColor) -> i32 {
        (self.start_cell(color) + self.track_len - 2) % self.track_len
    }

    /// Whether pieces on this cell are immune from capture.
    pub fn is_safe(&self, cell: i32) -> bool {
        match self.kind {
            VariantKind::Standard => STANDARD_SAFE.contains(&cell),
            VariantKind::Extended => EXTENDED_SAFE.contains(&cell),
        }
    }
}
