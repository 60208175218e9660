//! Dice rolls from OS entropy.

use std::collections::VecDeque;

use rand::{rngs::OsRng, RngCore};

/// Where a session's rolls come from.
///
/// `Crypto` is the production source. `Scripted` replays a fixed queue so
/// tests can steer the game into specific situations (forced sixes,
/// exact finishing rolls); once the queue runs dry it falls back to the
/// crypto source.
#[derive(Debug)]
pub enum DiceSource {
    Crypto,
    Scripted(VecDeque<u8>),
}

impl DiceSource {
    pub fn scripted<I: IntoIterator<Item = u8>>(rolls: I) -> Self {
        DiceSource::Scripted(rolls.into_iter().collect())
    }

    pub fn roll(&mut self) -> u8 {
        match self {
            DiceSource::Crypto => crypto_roll(),
            DiceSource::Scripted(queue) => queue.pop_front().unwrap_or_else(crypto_roll),
        }
    }
}

impl Default for DiceSource {
    fn default() -> Self {
        DiceSource::Crypto
    }
}

/// Uniform roll in [1,6] from OS entropy.
///
/// Rejection sampling: 252 is the largest multiple of 6 that fits a byte,
/// so bytes >= 252 are redrawn to avoid modulo bias.
fn crypto_roll() -> u8 {
    let mut rng = OsRng;
    let mut buf = [0u8; 1];
    loop {
        rng.fill_bytes(&mut buf);
        if buf[0] < 252 {
            return buf[0] % 6 + 1;
        }
    }
}
