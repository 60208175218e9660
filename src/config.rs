//! Configuration utilities (ports, timeouts, env vars)

use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Socket address to bind the server to.
///
/// Reads the `PORT` env var or defaults to 8080, binds to 0.0.0.0.
pub fn server_addr() -> SocketAddr {
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8080);
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Wall-clock limit for a single turn before the timeout driver skips it.
///
/// Override with `TURN_LIMIT_SECS`.
pub fn turn_limit() -> Duration {
    let secs = env::var("TURN_LIMIT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

/// Cadence of the bot auto-play loop.
pub const BOT_TICK: Duration = Duration::from_secs(1);

/// Pause between a bot's roll and its move, so humans can follow along.
pub const BOT_MOVE_DELAY: Duration = Duration::from_millis(500);

/// Cadence of the turn-timeout loop.
pub const TIMEOUT_TICK: Duration = Duration::from_secs(5);

/// Cadence of the abandoned-room sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Rooms idle this long in `waiting` or `ended` are swept.
pub const IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Rooms older than this are swept regardless of activity.
pub const MAX_SESSION_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Rooms with zero players are swept once older than this.
pub const EMPTY_ROOM_TTL: Duration = Duration::from_secs(5 * 60);
