mod config;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nursejob_api::AppStateInner;
use nursejob_chat::ChatService;
use nursejob_gateway::GatewayState;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nursejob=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_dev_secret() {
        warn!("NURSEJOB_JWT_SECRET not set, using the development secret");
    }

    // Init database
    let db = Arc::new(nursejob_db::Database::open(&config.db_path)?);
    let chat = ChatService::new(db);

    let api_state = Arc::new(AppStateInner {
        chat: chat.clone(),
        jwt_secret: config.jwt_secret.clone(),
    });
    let gateway_state = GatewayState {
        chat,
        jwt_secret: config.jwt_secret.clone(),
    };

    let app = Router::new()
        .merge(nursejob_api::router(api_state))
        .merge(nursejob_gateway::router(gateway_state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("nursejob server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
