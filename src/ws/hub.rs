//! Broadcast fabric: per-room subscriber sets.
//!
//! Each subscriber owns a bounded outbound queue. Broadcasting serializes
//! an event once and `try_send`s the frame to every subscriber of the
//! room; a full or closed queue evicts the subscriber on the spot, so one
//! stalled socket never blocks the room.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ws::event::Event;

/// Outbound frames buffered per subscriber before eviction.
pub const SUBSCRIBER_BUFFER: usize = 256;

struct Subscriber {
    player_id: String,
    tx: mpsc::Sender<String>,
}

/// A live subscription handed to the connection task. Dropping the hub's
/// sender (eviction or unsubscribe) closes `rx` and ends the writer.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<String>,
}

#[derive(Default)]
pub struct EventHub {
    rooms: DashMap<String, HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, code: &str, player_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.rooms.entry(code.to_string()).or_default().insert(
            id,
            Subscriber {
                player_id: player_id.to_string(),
                tx,
            },
        );
        debug!(%code, %player_id, subscriber = id, "subscribed");
        Subscription { id, rx }
    }

    /// Idempotent: unknown ids and already-evicted subscribers are fine.
    pub fn unsubscribe(&self, code: &str, id: u64) {
        let mut empty = false;
        if let Some(mut subs) = self.rooms.get_mut(code) {
            subs.remove(&id);
            empty = subs.is_empty();
        }
        if empty {
            self.rooms.remove_if(code, |_, subs| subs.is_empty());
        }
    }

    /// Serialize `event` once and deliver it to every live subscriber of
    /// the room. Subscribers whose queue is full or closed are evicted.
    pub fn broadcast(&self, code: &str, event: &Event) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%code, %err, "failed to serialize event");
                return;
            }
        };
        let Some(mut subs) = self.rooms.get_mut(code) else {
            return;
        };
        let mut dead = Vec::new();
        for (&id, sub) in subs.iter() {
            if sub.tx.try_send(frame.clone()).is_err() {
                dead.push(id);
            }
        }
        for id in dead {
            if let Some(sub) = subs.remove(&id) {
                warn!(%code, player_id = %sub.player_id, subscriber = id, "evicting slow subscriber");
            }
        }
    }

    /// Deliver one frame to a single subscriber (pong replies).
    pub fn send_to(&self, code: &str, id: u64, frame: String) {
        if let Some(subs) = self.rooms.get(code) {
            if let Some(sub) = subs.get(&id) {
                let _ = sub.tx.try_send(frame);
            }
        }
    }

    /// Participant ids with at least one live subscription to the room.
    pub fn connected_players(&self, code: &str) -> Vec<String> {
        let Some(subs) = self.rooms.get(code) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = subs.values().map(|s| s.player_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn subscriber_count(&self, code: &str) -> usize {
        self.rooms.get(code).map(|subs| subs.len()).unwrap_or(0)
    }
}
