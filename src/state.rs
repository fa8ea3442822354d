use crate::adapters::{ConfiguredSender, TokioTimeProvider};
use crate::config::AppConfig;
use crate::push::{InactivityScheduler, SubscriptionRegistry};
use crate::store::JsonEmployeeStore;

pub type AppScheduler = InactivityScheduler<TokioTimeProvider, JsonEmployeeStore, ConfiguredSender>;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: SubscriptionRegistry<JsonEmployeeStore>,
    pub scheduler: AppScheduler,
}
