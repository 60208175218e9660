//! HTTP command surface.
//!
//! Thin adapter: validate the body, run the session operation under the
//! room lock, capture the snapshot while still inside, drop the guard,
//! then broadcast. Rule errors map straight to HTTP via `GameError`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::GameError;
use crate::game::model::{ChatMessage, MoveRecord};
use crate::game::registry::GameRegistry;
use crate::game::snapshot::{RegistryStats, Snapshot};
use crate::util::validate;
use crate::ws::connection::ws_handler;
use crate::ws::event::{Event, EventKind};
use crate::ws::hub::EventHub;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
    pub hub: Arc<EventHub>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            registry: Arc::new(GameRegistry::new()),
            hub: Arc::new(EventHub::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/game/create", post(create_game))
        .route("/api/game/join", post(join_game))
        .route("/api/game/start", post(start_game))
        .route("/api/game/ready", post(set_ready))
        .route("/api/game/kick", post(kick_player))
        .route("/api/game/leave", post(leave_game))
        .route("/api/game/pause", post(pause_game))
        .route("/api/game/resume", post(resume_game))
        .route("/api/game/roll", post(roll_dice))
        .route("/api/game/move", post(move_piece))
        .route("/api/game/skip", post(skip_turn))
        .route("/api/game/rematch", post(rematch))
        .route("/api/game/chat", post(send_chat))
        .route("/api/game/spectate", post(spectate))
        .route("/api/game/bot/add", post(add_bot))
        .route("/api/game/bot/remove", post(remove_bot))
        .route("/api/game/state", get(game_state))
        .route("/api/game/history", get(move_history))
        .route("/api/game/chat/history", get(chat_history))
        .route("/ws", get(ws_handler))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn stats(State(state): State<AppState>) -> Json<RegistryStats> {
    Json(state.registry.stats())
}

#[derive(Debug, Serialize)]
struct Ack {
    ok: bool,
}

impl Ack {
    fn ok() -> Json<Ack> {
        Json(Ack { ok: true })
    }
}

#[derive(Debug, Deserialize)]
struct CreateGameRequest {
    host_id: String,
    host_name: String,
    max_players: u8,
}

#[derive(Debug, Serialize)]
struct CreateGameResponse {
    code: String,
    max_players: u8,
}

async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, GameError> {
    validate::ident(&req.host_id)?;
    let name = validate::name(&req.host_name)?;
    validate::max_players(req.max_players)?;
    let (code, _) = state.registry.create(req.host_id, name, req.max_players);
    Ok(Json(CreateGameResponse {
        code,
        max_players: req.max_players,
    }))
}

#[derive(Debug, Deserialize)]
struct JoinGameRequest {
    code: String,
    player_id: String,
    player_name: String,
}

async fn join_game(
    State(state): State<AppState>,
    Json(req): Json<JoinGameRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    validate::ident(&req.player_id)?;
    let name = validate::name(&req.player_name)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.join(req.player_id.clone(), name)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PlayerJoined {
            game: snapshot.clone(),
            player_id: req.player_id,
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct HostActionRequest {
    code: String,
    host_id: String,
}

async fn start_game(
    State(state): State<AppState>,
    Json(req): Json<HostActionRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.start(&req.host_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::GameStarted {
            game: snapshot.clone(),
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct ReadyRequest {
    code: String,
    player_id: String,
    ready: bool,
}

async fn set_ready(
    State(state): State<AppState>,
    Json(req): Json<ReadyRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.set_ready(&req.player_id, req.ready)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PlayerReady {
            game: snapshot.clone(),
            player_id: req.player_id,
            ready: req.ready,
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct KickRequest {
    code: String,
    host_id: String,
    player_to_kick: String,
}

async fn kick_player(
    State(state): State<AppState>,
    Json(req): Json<KickRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.kick(&req.host_id, &req.player_to_kick)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PlayerKicked {
            game: snapshot.clone(),
            player_id: req.player_to_kick,
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct PlayerActionRequest {
    code: String,
    player_id: String,
}

async fn leave_game(
    State(state): State<AppState>,
    Json(req): Json<PlayerActionRequest>,
) -> Result<Json<Ack>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.leave(&req.player_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PlayerLeft {
            game: snapshot,
            player_id: req.player_id,
        }),
    );
    Ok(Ack::ok())
}

async fn pause_game(
    State(state): State<AppState>,
    Json(req): Json<PlayerActionRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.pause(&req.player_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::GamePaused {
            game: snapshot.clone(),
            paused_by: req.player_id,
        }),
    );
    Ok(Json(snapshot))
}

async fn resume_game(
    State(state): State<AppState>,
    Json(req): Json<PlayerActionRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.resume(&req.player_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::GameResumed {
            game: snapshot.clone(),
            resumed_by: req.player_id,
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
struct RollResponse {
    roll: u8,
    valid_moves: Vec<u8>,
    three_sixes: bool,
}

async fn roll_dice(
    State(state): State<AppState>,
    Json(req): Json<PlayerActionRequest>,
) -> Result<Json<RollResponse>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let (snapshot, outcome) = {
        let mut game = session.write();
        let outcome = game.roll_dice(&req.player_id)?;
        (game.snapshot(), outcome)
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::DiceRolled {
            game: snapshot,
            player_id: req.player_id,
            roll: outcome.roll,
            three_sixes: outcome.three_sixes,
            valid_moves: outcome.valid_moves.clone(),
        }),
    );
    Ok(Json(RollResponse {
        roll: outcome.roll,
        valid_moves: outcome.valid_moves,
        three_sixes: outcome.three_sixes,
    }))
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    code: String,
    player_id: String,
    piece_id: u8,
}

async fn move_piece(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let (snapshot, outcome) = {
        let mut game = session.write();
        let outcome = game.move_piece(&req.player_id, req.piece_id)?;
        (game.snapshot(), outcome)
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PieceMoved {
            game: snapshot.clone(),
            player_id: req.player_id.clone(),
            piece_id: req.piece_id,
            captured: outcome.captured,
        }),
    );
    if outcome.won {
        state.hub.broadcast(
            &req.code,
            &Event::now(EventKind::GameEnded {
                game: snapshot.clone(),
                winner: req.player_id,
            }),
        );
    }
    Ok(Json(snapshot))
}

async fn skip_turn(
    State(state): State<AppState>,
    Json(req): Json<PlayerActionRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.skip_turn(&req.player_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::TurnSkipped {
            game: snapshot.clone(),
            player_id: req.player_id,
        }),
    );
    Ok(Json(snapshot))
}

async fn rematch(
    State(state): State<AppState>,
    Json(req): Json<HostActionRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.rematch(&req.host_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::Rematch {
            game: snapshot.clone(),
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    code: String,
    player_id: String,
    message: String,
}

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Ack>, GameError> {
    validate::code(&req.code)?;
    let text = validate::chat(&req.message)?;
    let session = state.registry.get(&req.code)?;
    let (snapshot, message) = {
        let mut game = session.write();
        let message = game.send_chat(&req.player_id, text)?;
        (game.snapshot(), message)
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::ChatMessage {
            game: snapshot,
            message,
        }),
    );
    Ok(Ack::ok())
}

#[derive(Debug, Deserialize)]
struct SpectateRequest {
    code: String,
    spectator_id: String,
    spectator_name: String,
}

async fn spectate(
    State(state): State<AppState>,
    Json(req): Json<SpectateRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    validate::ident(&req.spectator_id)?;
    let name = validate::name(&req.spectator_name)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.spectate(req.spectator_id.clone(), name)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::SpectatorJoined {
            game: snapshot.clone(),
            spectator_id: req.spectator_id,
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
struct BotAddedResponse {
    bot_id: String,
    game: Snapshot,
}

async fn add_bot(
    State(state): State<AppState>,
    Json(req): Json<HostActionRequest>,
) -> Result<Json<BotAddedResponse>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let (snapshot, bot_id) = {
        let mut game = session.write();
        let bot_id = game.add_bot(&req.host_id)?;
        (game.snapshot(), bot_id)
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PlayerJoined {
            game: snapshot.clone(),
            player_id: bot_id.clone(),
        }),
    );
    Ok(Json(BotAddedResponse {
        bot_id,
        game: snapshot,
    }))
}

#[derive(Debug, Deserialize)]
struct RemoveBotRequest {
    code: String,
    host_id: String,
    bot_id: String,
}

async fn remove_bot(
    State(state): State<AppState>,
    Json(req): Json<RemoveBotRequest>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&req.code)?;
    let session = state.registry.get(&req.code)?;
    let snapshot = {
        let mut game = session.write();
        game.remove_bot(&req.host_id, &req.bot_id)?;
        game.snapshot()
    };
    state.hub.broadcast(
        &req.code,
        &Event::now(EventKind::PlayerLeft {
            game: snapshot.clone(),
            player_id: req.bot_id,
        }),
    );
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct CodeQuery {
    code: String,
}

async fn game_state(
    State(state): State<AppState>,
    Query(CodeQuery { code }): Query<CodeQuery>,
) -> Result<Json<Snapshot>, GameError> {
    validate::code(&code)?;
    let session = state.registry.get(&code)?;
    let snapshot = session.read().snapshot();
    Ok(Json(snapshot))
}

async fn move_history(
    State(state): State<AppState>,
    Query(CodeQuery { code }): Query<CodeQuery>,
) -> Result<Json<Vec<MoveRecord>>, GameError> {
    validate::code(&code)?;
    let session = state.registry.get(&code)?;
    let moves = session.read().move_history();
    Ok(Json(moves))
}

/// Most recent 100 chat messages.
async fn chat_history(
    State(state): State<AppState>,
    Query(CodeQuery { code }): Query<CodeQuery>,
) -> Result<Json<Vec<ChatMessage>>, GameError> {
    validate::code(&code)?;
    let session = state.registry.get(&code)?;
    let chat = session.read().chat_tail(100);
    Ok(Json(chat))
}
