use crate::error::{RegistryError, ScanError};
use crate::push as push_service;
use crate::push::{Registration, ScanReport, SchedulerStatus};
use crate::state;
use crate::types::push::Subscription;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &'static str) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => Ok(Json(PublicKeyResponse {
            public_key: vapid.public_key,
        })),
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured.",
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) employee_id: String,
    pub(crate) subscription: Subscription,
}

#[derive(Serialize)]
pub(crate) struct SubscribeResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    let subscription = request.subscription;
    if request.employee_id.trim().is_empty()
        || subscription.endpoint.trim().is_empty()
        || subscription.keys.p256dh.trim().is_empty()
        || subscription.keys.auth.trim().is_empty()
    {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "employee_id, endpoint, p256dh, and auth are required.",
        ));
    }

    match state
        .registry
        .register(&request.employee_id, subscription)
        .await
    {
        Ok(Registration::Added) => Ok((
            StatusCode::CREATED,
            Json(SubscribeResponse { status: "added" }),
        )),
        Ok(Registration::AlreadyPresent) => Ok((
            StatusCode::OK,
            Json(SubscribeResponse {
                status: "unchanged",
            }),
        )),
        Err(RegistryError::NotFound(_)) => {
            Err(api_error(StatusCode::NOT_FOUND, "Employee not found."))
        }
        Err(err @ RegistryError::Store(_)) => {
            tracing::error!(employee_id = %request.employee_id, error = %err, "subscribe failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store subscription.",
            ))
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ScheduleDebugResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) server_time: OffsetDateTime,
    pub(crate) inactivity_window: String,
    pub(crate) scheduler: SchedulerStatus,
}

pub(crate) async fn push_schedule_debug(
    State(state): State<state::AppState>,
) -> Json<ScheduleDebugResponse> {
    Json(ScheduleDebugResponse {
        server_time: OffsetDateTime::now_utc(),
        inactivity_window: format!("{:?}", state.scheduler.config().window),
        scheduler: state.scheduler.status(),
    })
}

pub(crate) async fn push_scan(
    State(state): State<state::AppState>,
) -> Result<Json<ScanReport>, ApiError> {
    match state.scheduler.run_once().await {
        Ok(report) => Ok(Json(report)),
        Err(ScanError::AlreadyRunning) => Err(api_error(
            StatusCode::CONFLICT,
            "An inactivity scan is already running.",
        )),
        Err(ScanError::Fetch(_)) => Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Failed to fetch employees.",
        )),
    }
}
