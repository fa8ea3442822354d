use crate::adapters::{ConfiguredSender, TokioTimeProvider};
use crate::config;
use crate::push::{Dispatcher, InactivityScheduler, SubscriptionRegistry};
use crate::state;
use crate::store::JsonEmployeeStore;

use axum::Router;
use axum::routing::{get, post};

mod push;

pub fn build_state(
    config: config::AppConfig,
    store: JsonEmployeeStore,
    sender: ConfiguredSender,
) -> state::AppState {
    let registry = SubscriptionRegistry::new(store);
    let dispatcher = Dispatcher::new(registry.clone(), sender);
    let scheduler = InactivityScheduler::new(TokioTimeProvider, dispatcher, config.scan.clone());
    state::AppState {
        config,
        registry,
        scheduler,
    }
}

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/push/subscribe", post(push::push_subscribe))
        .route("/api/debug/push/schedule", get(push::push_schedule_debug))
        .route("/api/debug/push/scan", post(push::push_scan))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
