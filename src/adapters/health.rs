//! Liveness listener: a fixed 200 OK so an external orchestrator can confirm
//! the process has an open port. Unrelated to bot health.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub fn router() -> Router {
    Router::new().route("/", get(|| async { "OK" }))
}

pub async fn serve(port: u16) {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind liveness listener");
    info!(port, "liveness listener up");
    axum::serve(listener, router())
        .await
        .expect("Liveness listener failed");
}
