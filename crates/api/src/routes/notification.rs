//! # In-app notification routes

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use tic_core::common::Page;

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::server::AppState;
use crate::types::{ApiResponse, NotificationResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    #[serde(default)]
    pub unread_only: bool,
    /// Return only `{count}`
    #[serde(default)]
    pub count_only: bool,
}

/// Inbox page, or just the matching count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<NotificationResponse>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MarkReadRequest {
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer_jwt" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications or count", body = ApiResponse<NotificationListResponse>)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ApiResponse<NotificationListResponse>>, ApiError> {
    let count = state
        .notifications
        .count_notifications(&user.email, query.unread_only)
        .await?;
    if query.count_only {
        return Ok(Json(ApiResponse::ok(NotificationListResponse {
            count,
            notifications: None,
        })));
    }

    let page = Page::new(query.limit, query.offset, 20);
    let rows = state
        .notifications
        .list_notifications(&user.email, query.unread_only, page)
        .await?;
    Ok(Json(ApiResponse::ok(NotificationListResponse {
        count,
        notifications: Some(rows.into_iter().map(Into::into).collect()),
    })))
}

/// Mark notifications as read
///
/// Pass `ids` for specific rows or `all: true` for the whole inbox.
#[utoipa::path(
    patch,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer_jwt" = [])),
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Rows updated", body = ApiResponse<MarkReadResponse>),
        (status = 400, description = "Neither ids nor all given")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<ApiResponse<MarkReadResponse>>, ApiError> {
    let updated = if req.all {
        state.notifications.mark_read(&user.email, None).await?
    } else {
        match req.ids {
            Some(ids) if !ids.is_empty() => {
                state.notifications.mark_read(&user.email, Some(&ids)).await?
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "Provide notification ids or set all to true".into(),
                ));
            }
        }
    };
    Ok(Json(ApiResponse::ok(MarkReadResponse { updated })))
}
