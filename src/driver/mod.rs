//! Background loops: bot auto-play, turn timeouts, room sweeping.

pub mod bots;
pub mod sweep;
pub mod timeout;
