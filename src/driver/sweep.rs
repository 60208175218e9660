//! Periodic sweep of abandoned rooms.

use std::sync::Arc;

use crate::config;
use crate::game::registry::GameRegistry;

pub async fn run(registry: Arc<GameRegistry>) {
    let mut tick = tokio::time::interval(config::SWEEP_INTERVAL);
    loop {
        tick.tick().await;
        registry.sweep();
    }
}
