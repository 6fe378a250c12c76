use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use nursejob_chat::NewConversation;
use nursejob_types::api::{Claims, OpenConversationRequest, OpenConversationResponse, UnreadCountResponse};
use nursejob_types::models::Conversation;

use crate::state::{AppState, status_for};

/// Open the conversation between the caller and another user, or return the
/// existing one for the same job scope.
pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenConversationRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let conversation_id = state
        .chat
        .get_or_create_conversation(NewConversation {
            user_id: claims.sub,
            user_name: claims.name,
            other_user_id: req.other_user_id,
            other_user_name: req.other_user_name,
            job_id: req.job_id,
            job_title: req.job_title,
            facility_name: req.facility_name,
        })
        .await
        .map_err(status_for)?;

    Ok(Json(OpenConversationResponse { conversation_id }))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let conversations = state
        .chat
        .list_conversations(&claims.sub)
        .await
        .map_err(status_for)?;

    Ok(Json(conversations))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let unread_count = state
        .chat
        .get_unread_count(&claims.sub)
        .await
        .map_err(status_for)?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

/// Load a conversation the caller takes part in: 404 if it does not exist,
/// 403 if the caller is not a participant.
pub(crate) async fn participant_conversation(
    state: &AppState,
    conversation_id: &str,
    claims: &Claims,
) -> Result<Conversation, StatusCode> {
    let conversation = state
        .chat
        .get_conversation(conversation_id)
        .await
        .map_err(status_for)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if !conversation.has_participant(&claims.sub) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(conversation)
}
