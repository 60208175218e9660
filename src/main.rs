use tokio::net::TcpListener;
use tracing::info;

use ludo_server::http::routes::AppState;
use ludo_server::{config, driver, http, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let state = AppState::new();
    tokio::spawn(driver::bots::run(state.registry.clone(), state.hub.clone()));
    tokio::spawn(driver::timeout::run(
        state.registry.clone(),
        state.hub.clone(),
    ));
    tokio::spawn(driver::sweep::run(state.registry.clone()));

    let app = http::routes::router(state);
    let addr = config::server_addr();
    info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
