use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use nursejob_types::api::{Claims, SendMessageRequest};

use crate::state::{AppState, status_for};
use crate::conversations::participant_conversation;

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    participant_conversation(&state, &conversation_id, &claims).await?;

    let message = state
        .chat
        .send_message(&conversation_id, &claims.sub, &claims.name, &req.text)
        .await
        .map_err(status_for)?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    participant_conversation(&state, &conversation_id, &claims).await?;

    let messages = state
        .chat
        .list_messages(&conversation_id)
        .await
        .map_err(status_for)?;

    Ok(Json(messages))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    participant_conversation(&state, &conversation_id, &claims).await?;

    state
        .chat
        .mark_conversation_as_read(&conversation_id, &claims.sub)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
