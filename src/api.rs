//! HTTP surface: axum router, handlers, and the translation of the
//! service error taxonomy into status codes at this boundary only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::{
    chat::{ChatRequest, ChatResponse},
    error::ServiceError,
    hours::{RegisterBillableHoursRequest, RegisterLeaveHoursRequest},
    orchestrator::ChatService,
    registration::HourRegistrationService,
};

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub hours: HourRegistrationService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat/history/:session_id", get(chat_history))
        .route("/api/chat/health", get(chat_health))
        .route("/api/hours/leave", post(register_leave_hours))
        .route("/api/hours/billable", post(register_billable_hours))
        .route("/api/hours/leave/:employee_id", get(leave_hours))
        .route("/api/hours/billable/:employee_id", get(billable_hours))
        .route(
            "/api/hours/leave/:employee_id/total/:year",
            get(total_leave_hours),
        )
        .route(
            "/api/hours/billable/:employee_id/total/:year",
            get(total_billable_hours),
        )
        .route("/api/hours/health", get(hours_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Problem-detail-shaped error response. Internal failures are logged in
/// full here and surfaced as a generic message.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match &self.0 {
            ServiceError::Validation(msg) => {
                warn!("validation failed: {msg}");
                (
                    StatusCode::BAD_REQUEST,
                    "Validation failed",
                    msg.clone(),
                )
            }
            ServiceError::NotFound(msg) => {
                warn!("not found: {msg}");
                (StatusCode::NOT_FOUND, "Not Found", msg.clone())
            }
            ServiceError::Provider(msg) => {
                error!("provider failure: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Chat Service Error",
                    "Unable to process chat request. Please try again.".to_string(),
                )
            }
            ServiceError::Persistence(e) => {
                error!("persistence failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "An unexpected error occurred. Please try again later.".to_string(),
                )
            }
        };

        let body = json!({
            "title": title,
            "detail": detail,
            "timestamp": Utc::now(),
        });

        (status, Json(body)).into_response()
    }
}

fn validate_employee_id(employee_id: &str) -> Result<(), ApiError> {
    let ok = !employee_id.is_empty()
        && employee_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ServiceError::validation("Invalid employee ID format").into())
    }
}

fn validate_year(year: i32) -> Result<(), ApiError> {
    if (2020..=2030).contains(&year) {
        Ok(())
    } else {
        Err(ServiceError::validation("Year must be between 2020 and 2030").into())
    }
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.chat.chat(request).await?;
    Ok(Json(response))
}

async fn chat_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.chat.history(&session_id).await?;
    Ok(Json(history))
}

async fn register_leave_hours(
    State(state): State<AppState>,
    Json(request): Json<RegisterLeaveHoursRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.hours.register_leave_hours(request).await?;
    Ok(Json(response))
}

async fn register_billable_hours(
    State(state): State<AppState>,
    Json(request): Json<RegisterBillableHoursRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.hours.register_billable_hours(request).await?;
    Ok(Json(response))
}

async fn leave_hours(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_employee_id(&employee_id)?;
    let records = state.hours.leave_hours_by_employee(&employee_id).await?;
    Ok(Json(records))
}

async fn billable_hours(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_employee_id(&employee_id)?;
    let records = state.hours.billable_hours_by_employee(&employee_id).await?;
    Ok(Json(records))
}

async fn total_leave_hours(
    State(state): State<AppState>,
    Path((employee_id, year)): Path<(String, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    validate_employee_id(&employee_id)?;
    validate_year(year)?;
    let total = state
        .hours
        .total_leave_hours_for_year(&employee_id, year)
        .await?;
    Ok(Json(json!({
        "employeeId": employee_id,
        "year": year,
        "totalLeaveHours": total,
    })))
}

async fn total_billable_hours(
    State(state): State<AppState>,
    Path((employee_id, year)): Path<(String, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    validate_employee_id(&employee_id)?;
    validate_year(year)?;
    let total = state
        .hours
        .total_billable_hours_for_year(&employee_id, year)
        .await?;
    Ok(Json(json!({
        "employeeId": employee_id,
        "year": year,
        "totalBillableHours": total,
    })))
}

async fn chat_health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "service": "chat",
        "timestamp": Utc::now().timestamp_millis(),
    }))
}

async fn hours_health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "service": "hours",
        "timestamp": Utc::now().timestamp_millis(),
    }))
}
