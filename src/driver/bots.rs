//! Bot auto-play loop.
//!
//! Ticks about once a second, finds rooms where the turn belongs to a
//! bot, and plays it: roll, a short pacing pause, then a uniformly random
//! valid move (or a skip). Every lock is re-checked after the pause;
//! timeouts or human actions may have moved the game on.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::config;
use crate::game::model::SessionState;
use crate::game::registry::{GameRegistry, SharedSession};
use crate::ws::event::{Event, EventKind};
use crate::ws::hub::EventHub;

pub async fn run(registry: Arc<GameRegistry>, hub: Arc<EventHub>) {
    let mut tick = tokio::time::interval(config::BOT_TICK);
    loop {
        tick.tick().await;
        for (code, session) in registry.all() {
            play_bot_turn(&code, &session, &hub).await;
        }
    }
}

async fn play_bot_turn(code: &str, session: &Arc<SharedSession>, hub: &EventHub) {
    let bot_id = {
        let game = session.read();
        if game.state() != SessionState::Playing {
            return;
        }
        match game.current_turn() {
            Some(id) if game.is_bot(id) => id.to_string(),
            _ => return,
        }
    };

    // Roll, unless a previous tick already did and the move failed since.
    let rolled = {
        let mut game = session.write();
        if game.state() != SessionState::Playing || game.current_turn() != Some(bot_id.as_str()) {
            return;
        }
        if game.has_rolled() {
            None
        } else {
            match game.roll_dice(&bot_id) {
                Ok(outcome) => {
                    let snapshot = game.snapshot();
                    Some((outcome, snapshot))
                }
                Err(err) => {
                    debug!(%code, bot = %bot_id, %err, "bot roll refused");
                    return;
                }
            }
        }
    };
    if let Some((outcome, snapshot)) = rolled {
        let forfeited = outcome.three_sixes;
        hub.broadcast(
            code,
            &Event::now(EventKind::DiceRolled {
                game: snapshot,
                player_id: bot_id.clone(),
                roll: outcome.roll,
                three_sixes: outcome.three_sixes,
                valid_moves: outcome.valid_moves,
            }),
        );
        if forfeited {
            return;
        }
    }

    // Pacing pause so humans can see the roll before the move.
    tokio::time::sleep(config::BOT_MOVE_DELAY).await;

    let events = {
        let mut game = session.write();
        if game.state() != SessionState::Playing
            || game.current_turn() != Some(bot_id.as_str())
            || !game.has_rolled()
        {
            return;
        }
        let moves = game.list_valid_moves(&bot_id);
        if moves.is_empty() {
            match game.skip_turn(&bot_id) {
                Ok(()) => vec![Event::now(EventKind::TurnSkipped {
                    game: game.snapshot(),
                    player_id: bot_id.clone(),
                })],
                Err(err) => {
                    debug!(%code, bot = %bot_id, %err, "bot skip refused");
                    return;
                }
            }
        } else {
            let piece = moves
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(moves[0]);
            match game.move_piece(&bot_id, piece) {
                Ok(outcome) => {
                    let snapshot = game.snapshot();
                    let mut events = vec![Event::now(EventKind::PieceMoved {
                        game: snapshot.clone(),
                        player_id: bot_id.clone(),
                        piece_id: piece,
                        captured: outcome.captured,
                    })];
                    if outcome.won {
                        events.push(Event::now(EventKind::GameEnded {
                            game: snapshot,
                            winner: bot_id.clone(),
                        }));
                    }
                    events
                }
                Err(err) => {
                    debug!(%code, bot = %bot_id, piece, %err, "bot move refused");
                    return;
                }
            }
        }
    };
    for event in &events {
        hub.broadcast(code, event);
    }
}
