//! Notification history handlers.

use axum::Json;
use axum::extract::{Query, State};

use crate::dto::request::{HistoryQuery, MarkReadBody};
use crate::dto::response::{ApiResponse, MessageResponse, NotificationResponse};
use crate::error::ApiError;
use crate::extractors::{AuthAccount, ValidatedJson};
use crate::state::AppState;

/// GET /notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthAccount,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationResponse>>>, ApiError> {
    let records = state
        .accounts
        .list_notifications(&auth.key, query.limit)
        .await?;
    Ok(Json(ApiResponse::ok(
        records.into_iter().map(NotificationResponse::from).collect(),
    )))
}

/// POST /notifications/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthAccount,
    ValidatedJson(body): ValidatedJson<MarkReadBody>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .accounts
        .mark_notification_read(&auth.key, body.id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Marked as read"))))
}
