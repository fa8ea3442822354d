pub mod adapters;
mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod ports;
pub mod push;
pub mod state;
pub mod store;
#[cfg(test)]
mod testing;
pub mod types;

pub use app::{app, build_state};
pub use push::generate_vapid_credentials;

use crate::error::ServeError;
use crate::store::JsonEmployeeStore;

/// Runs the HTTP surface and the daily inactivity scheduler until the server
/// stops.
pub async fn serve(config: config::AppConfig) -> Result<(), ServeError> {
    let store = match config.employees.as_deref() {
        Some(path) => JsonEmployeeStore::open(path)?,
        None => {
            tracing::warn!("no employee file configured; using an empty in-memory store");
            JsonEmployeeStore::in_memory()
        }
    };
    let sender = push::sender_from_config(&config);
    let bind = config.bind;
    let state = build_state(config, store, sender);
    let scheduler = state.scheduler.start();

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "listening");
    let result = axum::serve(listener, app(state)).await;
    scheduler.stop();
    result.map_err(ServeError::from)
}
