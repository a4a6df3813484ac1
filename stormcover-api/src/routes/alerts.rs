use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use stormcover_shared::errors::{AppError, AppResult, ErrorCode};
use stormcover_shared::types::ApiResponse;

use crate::models::{AtRiskUser, CityHazardGroup, NotificationLog};
use crate::services::{delivery_service, notification_service};
use crate::AppState;

const DEFAULT_SUBJECT: &str = "Urgent: Weather Hazard Alert";
const DEFAULT_BODY: &str =
    "<p>Warning: We detected a weather hazard in your area that your current coverage does not include.</p>";

/// GET /alerts
/// Current city hazard groups: per city, the users missing coverage for
/// the active hazards.
pub async fn list_active_groups(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<CityHazardGroup>>> {
    let groups = notification_service::active_city_hazard_groups(
        state.weather_records.as_ref(),
        state.users.as_ref(),
        state.config.risk_threshold_percent,
    );

    Json(ApiResponse::ok(groups))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBatchRequest {
    pub users: Vec<AtRiskUser>,
    pub email_subject: String,
    pub email_body_html: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBatchResponse {
    pub log_id: String,
    pub log_recorded: bool,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub records_flagged: usize,
}

/// POST /alerts/send
/// Dispatch one batch: alert emails, the batch log, and the sent-state
/// flip are three independent best-effort steps; a failure in one is
/// reported but never stops the others.
pub async fn send_notifications(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendBatchRequest>,
) -> AppResult<Json<ApiResponse<SendBatchResponse>>> {
    let selected: Vec<AtRiskUser> = request
        .users
        .into_iter()
        .filter(|u| u.is_selected)
        .collect();

    if selected.is_empty() {
        return Err(AppError::new(
            ErrorCode::NoUsersSelected,
            "no users selected for notification",
        ));
    }

    let sent_at = Utc::now();

    let (emails_sent, emails_failed) = delivery_service::send_alert_emails(
        state.email.as_ref(),
        &selected,
        &request.email_subject,
        &request.email_body_html,
    )
    .await;

    let log = delivery_service::build_notification_log(
        &selected,
        &request.email_subject,
        &request.email_body_html,
        sent_at,
    );
    let log_recorded = delivery_service::record_log(state.notification_logs.as_ref(), &log);

    let records_flagged =
        delivery_service::mark_records_notified(state.weather_records.as_ref(), &selected, sent_at);

    Ok(Json(ApiResponse::ok(SendBatchResponse {
        log_id: log.id,
        log_recorded,
        emails_sent,
        emails_failed,
        records_flagged,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupParams {
    pub prediction_id: String,
    pub city: String,
}

/// GET /alerts/group?predictionId=..&city=..
/// One city's hazard group rebuilt from a specific weather record,
/// including records already marked sent.
pub async fn city_group(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GroupParams>,
) -> AppResult<Json<ApiResponse<CityHazardGroup>>> {
    match notification_service::city_hazard_group_for_resend(
        state.weather_records.as_ref(),
        state.users.as_ref(),
        &params.prediction_id,
        &params.city,
        state.config.risk_threshold_percent,
    ) {
        Some(group) => Ok(Json(ApiResponse::ok(group))),
        None => Err(AppError::new(
            ErrorCode::WeatherRecordNotFound,
            "no hazard group for that prediction and city",
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct ResendParams {
    pub city: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendResponse {
    /// True when the view was rebuilt from the log; false when the log
    /// was gone and the current active groups are shown instead.
    pub reconstructed: bool,
    pub email_subject: String,
    pub email_body_html: String,
    pub groups: Vec<CityHazardGroup>,
}

/// GET /alerts/resend/{log_id}?city=..
/// Rebuild a past batch's recipient view for re-review. Falls back to
/// the current active groups when the log no longer exists.
pub async fn resend_view(
    State(state): State<Arc<AppState>>,
    Path(log_id): Path<String>,
    Query(params): Query<ResendParams>,
) -> Json<ApiResponse<ResendResponse>> {
    let threshold = state.config.risk_threshold_percent;

    match notification_service::reconstruct_batch(
        state.weather_records.as_ref(),
        state.notification_logs.as_ref(),
        state.users.as_ref(),
        &log_id,
        &params.city,
        threshold,
    ) {
        Some(view) => Json(ApiResponse::ok(ResendResponse {
            reconstructed: true,
            email_subject: view.email_subject,
            email_body_html: view.email_body_html,
            groups: view.groups,
        })),
        None => {
            let groups = notification_service::active_city_hazard_groups(
                state.weather_records.as_ref(),
                state.users.as_ref(),
                threshold,
            );
            Json(ApiResponse::ok_with_message(
                ResendResponse {
                    reconstructed: false,
                    email_subject: DEFAULT_SUBJECT.into(),
                    email_body_html: DEFAULT_BODY.into(),
                    groups,
                },
                "notification log not found, showing current active hazards",
            ))
        }
    }
}

/// GET /alerts/history
/// Past batches, newest first. A store failure degrades to an empty
/// list.
pub async fn sent_history(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<NotificationLog>>> {
    let logs = match state.notification_logs.list_recent() {
        Ok(logs) => logs,
        Err(e) => {
            tracing::error!(error = %e, "failed to list notification logs");
            Vec::new()
        }
    };

    Json(ApiResponse::ok(logs))
}
