//! Application route configuration.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{any, get},
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::repository::StoreError;
use super::AppState;

/// Create the application router with the user routes mounted under `web_base`
pub fn create_router(state: AppState, web_base: &str) -> Router {
    let users = Router::new()
        .route("/get_user_by_uuid/:uuid", any(handlers::get_user_by_uuid))
        .route("/get_user_by_email/:email", any(handlers::get_user_by_email))
        .route("/get_total_users", any(handlers::get_total_users))
        .route("/count_users", any(handlers::count_users))
        .route("/post_user", any(handlers::post_user))
        .route("/post_users", any(handlers::post_users))
        .route("/update_user/:uuid", any(handlers::update_user))
        .route("/delete_user/:uuid", any(handlers::delete_user))
        .route("/drop_collection", any(handlers::drop_collection));

    // Nesting at the root is not supported by axum
    let router = if web_base.is_empty() {
        Router::new().merge(users)
    } else {
        Router::new().nest(web_base, users)
    };

    router
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint with store connectivity check
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ping = tokio::time::timeout(state.store_timeout, state.repository.ping())
        .await
        .unwrap_or(Err(StoreError::Timeout));

    match ping {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
