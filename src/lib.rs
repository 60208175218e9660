//! Authoritative session server for Ludo-family board games.
//!
//! Rooms are identified by 8-digit codes, joined over HTTP and observed
//! over a WebSocket push channel. The server owns all rules: dice, piece
//! movement, captures, home-stretch entry and the turn clock. Background
//! drivers play bot turns, skip stalled turns and sweep abandoned rooms.

pub mod board;
pub mod config;
pub mod dice;
pub mod driver;
pub mod error;
pub mod game;
pub mod http;
pub mod telemetry;
pub mod util;
pub mod ws;
