//! Room code generation.

use rand::{rngs::OsRng, Rng};

/// Generate a fresh 8-digit decimal room code.
///
/// Drawn from OS entropy; the registry retries on the (rare) collision
/// with a live room.
pub fn new_game_code() -> String {
    let mut rng = OsRng;
    format!("{:08}", rng.gen_range(10_000_000u32..=99_999_999))
}
