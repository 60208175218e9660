//! Registry of live game sessions.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config;
use crate::error::GameError;
use crate::game::model::SessionState;
use crate::game::session::GameSession;
use crate::game::snapshot::RegistryStats;
use crate::util::id::new_game_code;

/// A session behind its room lock. Mutations take the write half, pure
/// reads the read half; broadcasting always happens after the guard is
/// dropped.
pub type SharedSession = RwLock<GameSession>;

#[derive(Default)]
pub struct GameRegistry {
    games: DashMap<String, Arc<SharedSession>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under a fresh code, with the host already seated.
    pub fn create(
        &self,
        host_id: String,
        host_name: String,
        max_players: u8,
    ) -> (String, Arc<SharedSession>) {
        loop {
            let code = new_game_code();
            match self.games.entry(code.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => continue,
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    let session = Arc::new(RwLock::new(GameSession::new(
                        code.clone(),
                        host_id,
                        host_name,
                        max_players,
                    )));
                    slot.insert(session.clone());
                    info!(%code, max_players, "room created");
                    return (code, session);
                }
            }
        }
    }

    pub fn get(&self, code: &str) -> Result<Arc<SharedSession>, GameError> {
        self.games
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or(GameError::RoomNotFound)
    }

    pub fn remove(&self, code: &str) {
        if self.games.remove(code).is_some() {
            info!(%code, "room removed");
        }
    }

    /// Snapshot of the current rooms, for the background drivers.
    pub fn all(&self) -> Vec<(String, Arc<SharedSession>)> {
        self.games
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Drop abandoned rooms. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Sweep against an explicit clock so tests can move time forward.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.games.retain(|code, session| {
            let game = session.read();
            let age = now.saturating_duration_since(game.created_at());
            let idle = now.saturating_duration_since(game.last_activity());
            let state = game.state();

            let stale_idle = matches!(state, SessionState::Waiting | SessionState::Ended)
                && idle > config::IDLE_TTL;
            let over_age = age > config::MAX_SESSION_AGE;
            let empty = game.player_count() == 0 && age > config::EMPTY_ROOM_TTL;

            let expired = stale_idle || over_age || empty;
            if expired {
                removed += 1;
                debug!(%code, ?state, ?age, ?idle, "sweeping room");
            }
            !expired
        });
        if removed > 0 {
            info!(removed, remaining = self.games.len(), "sweep finished");
        }
        removed
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.games.iter() {
            let game = entry.value().read();
            stats.total_rooms += 1;
            stats.total_players += game.player_count();
            match game.state() {
                SessionState::Waiting => stats.waiting += 1,
                SessionState::Playing | SessionState::Paused => stats.playing += 1,
                SessionState::Ended => stats.ended += 1,
            }
        }
        stats
    }
}
