//! Turn-timeout loop.
//!
//! Candidates are found under the read lock; the actual skip re-verifies
//! the elapsed-time predicate under the write lock, so a turn that
//! advanced between observation and action is left alone.

use std::sync::Arc;

use tracing::info;

use crate::config;
use crate::game::model::SessionState;
use crate::game::registry::GameRegistry;
use crate::ws::event::{Event, EventKind};
use crate::ws::hub::EventHub;

pub async fn run(registry: Arc<GameRegistry>, hub: Arc<EventHub>) {
    let mut tick = tokio::time::interval(config::TIMEOUT_TICK);
    loop {
        tick.tick().await;
        let limit = config::turn_limit();
        for (code, session) in registry.all() {
            let overdue = {
                let game = session.read();
                game.state() == SessionState::Playing && game.turn_elapsed() > limit
            };
            if !overdue {
                continue;
            }
            let skipped = {
                let mut game = session.write();
                game.force_skip(limit).map(|player| (player, game.snapshot()))
            };
            if let Some((player_id, snapshot)) = skipped {
                info!(%code, %player_id, "turn timed out");
                hub.broadcast(
                    &code,
                    &Event::now(EventKind::TurnTimeout {
                        game: snapshot,
                        player_id,
                    }),
                );
            }
        }
    }
}
