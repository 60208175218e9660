//! WebSocket connection lifecycle management.
//!
//! One reader and one writer task per subscriber, with the same liveness
//! budget on both sides: the writer pings every 54 s and gives a frame
//! 10 s to go out; the reader expects some frame (usually the pong)
//! within 60 s. Either side failing tears the subscription down.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::http::routes::AppState;
use crate::ws::event::{Event, EventKind};
use crate::ws::hub::{EventHub, Subscription};

/// Time allowed for a single outbound frame.
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
/// Time allowed between inbound frames before the peer is presumed dead.
const READ_DEADLINE: Duration = Duration::from_secs(60);
/// Ping cadence; must stay under `READ_DEADLINE`.
const PING_PERIOD: Duration = Duration::from_secs(54);

#[derive(Deserialize)]
pub struct WsParams {
    pub code: String,
    pub player_id: String,
}

/// Frames the reader understands; everything else is ignored.
#[derive(Deserialize)]
struct Inbound {
    #[serde(rename = "type")]
    kind: String,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(WsParams { code, player_id }): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Ok(session) = state.registry.get(&code) else {
        return (StatusCode::NOT_FOUND, "game not found").into_response();
    };
    if !session.read().is_participant(&player_id) {
        return (StatusCode::FORBIDDEN, "player not in game").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(state, socket, code, player_id))
}

async fn handle_socket(state: AppState, socket: WebSocket, code: String, player_id: String) {
    let subscription = state.hub.subscribe(&code, &player_id);
    let sub_id = subscription.id;
    info!(%code, %player_id, "push channel open");

    announce_presence(&state, &code, &player_id, true);

    let (ws_tx, ws_rx) = socket.split();
    let writer = tokio::spawn(write_pump(ws_tx, subscription));
    read_pump(ws_rx, &state.hub, &code, sub_id).await;

    state.hub.unsubscribe(&code, sub_id);
    announce_presence(&state, &code, &player_id, false);
    let _ = writer.await;
    info!(%code, %player_id, "push channel closed");
}

/// Broadcast a presence-change event carrying the current snapshot. The
/// room may already be gone (swept); then there is nobody to tell.
fn announce_presence(state: &AppState, code: &str, player_id: &str, connected: bool) {
    let Ok(session) = state.registry.get(code) else {
        return;
    };
    let snapshot = session.read().snapshot();
    let connected_players = state.hub.connected_players(code);
    let kind = if connected {
        EventKind::PlayerConnected {
            game: snapshot,
            player_id: player_id.to_string(),
            connected_players,
        }
    } else {
        EventKind::PlayerDisconnected {
            game: snapshot,
            player_id: player_id.to_string(),
            connected_players,
        }
    };
    state.hub.broadcast(code, &Event::now(kind));
}

/// Drain the subscription queue onto the socket, pinging on idle.
async fn write_pump(mut ws_tx: SplitSink<WebSocket, Message>, mut subscription: Subscription) {
    let start = tokio::time::Instant::now() + PING_PERIOD;
    let mut ping = tokio::time::interval_at(start, PING_PERIOD);
    loop {
        tokio::select! {
            frame = subscription.rx.recv() => {
                let Some(frame) = frame else { break };
                match timeout(WRITE_DEADLINE, ws_tx.send(Message::Text(frame))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
            _ = ping.tick() => {
                match timeout(WRITE_DEADLINE, ws_tx.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
        }
    }
    // Closing the sink unblocks the reader on the other half.
    let _ = ws_tx.close().await;
}

/// Consume inbound frames under the read deadline. Only client-level
/// `{"type":"ping"}` means anything; the reply goes through the
/// subscriber's own queue so ordering with broadcasts is preserved.
async fn read_pump(mut ws_rx: SplitStream<WebSocket>, hub: &EventHub, code: &str, sub_id: u64) {
    loop {
        let message = match timeout(READ_DEADLINE, ws_rx.next()).await {
            Ok(Some(Ok(message))) => message,
            Ok(Some(Err(_))) | Ok(None) => break,
            Err(_) => {
                debug!(%code, subscriber = sub_id, "read deadline expired");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                if let Ok(inbound) = serde_json::from_str::<Inbound>(&text) {
                    if inbound.kind == "ping" {
                        if let Ok(frame) = serde_json::to_string(&Event::pong()) {
                            hub.send_to(code, sub_id, frame);
                        }
                    }
                }
            }
            Message::Close(_) => break,
            // Protocol pings are answered by the stack; pongs just refresh
            // the deadline by arriving.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }
}
