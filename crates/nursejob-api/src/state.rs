use std::sync::Arc;

use axum::http::StatusCode;
use tracing::error;

use nursejob_chat::{ChatError, ChatService};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub chat: ChatService,
    pub jwt_secret: String,
}

/// Map a service error onto the response status, logging server-side faults.
pub fn status_for(err: ChatError) -> StatusCode {
    match err {
        ChatError::InvalidParticipants | ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
        ChatError::NotFound(..) => StatusCode::NOT_FOUND,
        ChatError::Store(_) | ChatError::Join(_) => {
            error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
