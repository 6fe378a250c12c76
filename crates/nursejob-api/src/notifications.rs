use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use nursejob_types::api::{Claims, MarkAllReadResponse};

use crate::state::{AppState, status_for};

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let notifications = state
        .chat
        .list_notifications(&claims.sub)
        .await
        .map_err(status_for)?;

    Ok(Json(notifications))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let updated = state
        .chat
        .mark_all_notifications_read(&claims.sub)
        .await
        .map_err(status_for)?;

    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    require_owner(&state, &notification_id, &claims).await?;

    state
        .chat
        .mark_notification_read(&notification_id)
        .await
        .map_err(status_for)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    require_owner(&state, &notification_id, &claims).await?;

    state
        .chat
        .delete_notification(&notification_id)
        .await
        .map_err(status_for)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn require_owner(state: &AppState, notification_id: &str, claims: &Claims) -> Result<(), StatusCode> {
    let notification = state
        .chat
        .get_notification(notification_id)
        .await
        .map_err(status_for)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if notification.user_id != claims.sub {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}
