pub mod connection;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::warn;

use nursejob_chat::ChatService;
use nursejob_types::api::Claims;

#[derive(Clone)]
pub struct GatewayState {
    pub chat: ChatService,
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: String,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state)
}

/// The JWT is validated before the upgrade, so connections start out
/// authenticated.
async fn ws_upgrade(
    State(state): State<GatewayState>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let claims = authenticate(&query.token, &state.jwt_secret).ok_or_else(|| {
        warn!("Gateway upgrade rejected: invalid token");
        StatusCode::UNAUTHORIZED
    })?;

    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.chat, claims.sub, claims.name)
    }))
}

fn authenticate(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}
